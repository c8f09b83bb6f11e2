// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use std::{borrow::Cow, fmt};

use asn1_rs::Oid;
use thiserror::Error;
use x509_parser::{certificate::X509Certificate, extensions::ParsedExtension, prelude::FromDer};

use crate::{
    asn1::oids::SHA256_OID,
    container::{IssuerSerial, SignerIdentifier},
    hash::{sha256, DigestAlgorithm},
    raw_signature::{validator_for_sig_and_hash_algs, RawSignatureValidationError},
};

/// Describes errors that can occur while decoding a certificate.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum CertificateError {
    /// The certificate could not be parsed.
    #[error("unable to parse certificate: {0}")]
    Malformed(String),

    /// The certificate was followed by unexpected data.
    #[error("certificate has {0} trailing bytes")]
    TrailingData(usize),
}

/// Content-addressed identifier of a certificate encoding (SHA-256 of the
/// DER bytes).
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TokenId([u8; 32]);

/// Content-addressed identifier of a public key (SHA-256 of the DER
/// `SubjectPublicKeyInfo`).
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct KeyId([u8; 32]);

fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&sha256(data));
    out
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", hex::encode_upper(self.0))
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl KeyId {
    /// Computes the identifier of a DER `SubjectPublicKeyInfo`.
    pub fn of_public_key(public_key: &[u8]) -> Self {
        Self(sha256_array(public_key))
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PK-{}", hex::encode_upper(self.0))
    }
}

/// A parsed X.509 certificate.
///
/// Identity is structural: two tokens are equal when their encodings are.
/// The fields this crate needs are copied out of the parsed certificate so
/// the token owns its data.
#[derive(Clone)]
pub struct CertificateToken {
    encoded: Vec<u8>,
    id: TokenId,
    key_id: KeyId,
    subject: Vec<u8>,
    subject_name: String,
    issuer: Vec<u8>,
    serial: Vec<u8>,
    public_key: Vec<u8>,
    not_before: i64,
    not_after: i64,
    subject_key_identifier: Option<Vec<u8>>,
    signature_algorithm: Oid<'static>,
    tbs_certificate: Vec<u8>,
    signature_value: Vec<u8>,
}

impl CertificateToken {
    /// Parses a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        let (rem, cert) = X509Certificate::from_der(der)
            .map_err(|e| CertificateError::Malformed(e.to_string()))?;

        if !rem.is_empty() {
            return Err(CertificateError::TrailingData(rem.len()));
        }

        let subject_key_identifier = cert.extensions().iter().find_map(|ext| {
            match ext.parsed_extension() {
                ParsedExtension::SubjectKeyIdentifier(ki) => Some(ki.0.to_vec()),
                _ => None,
            }
        });

        let public_key = cert.public_key().raw.to_vec();

        Ok(Self {
            encoded: der.to_vec(),
            id: TokenId(sha256_array(der)),
            key_id: KeyId::of_public_key(&public_key),
            subject: cert.subject().as_raw().to_vec(),
            subject_name: cert.subject().to_string(),
            issuer: cert.issuer().as_raw().to_vec(),
            serial: cert.raw_serial().to_vec(),
            public_key,
            not_before: cert.validity().not_before.timestamp(),
            not_after: cert.validity().not_after.timestamp(),
            subject_key_identifier,
            signature_algorithm: Oid::new(Cow::Owned(
                cert.signature_algorithm.algorithm.as_bytes().to_vec(),
            )),
            tbs_certificate: cert.tbs_certificate.as_ref().to_vec(),
            signature_value: cert.signature_value.as_ref().to_vec(),
        })
    }

    /// DER encoding of the certificate.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// Identifier derived from the encoding.
    pub fn id(&self) -> TokenId {
        self.id
    }

    /// Identifier derived from the public key.
    pub fn key_id(&self) -> KeyId {
        self.key_id
    }

    /// DER encoding of the subject name.
    pub fn subject(&self) -> &[u8] {
        &self.subject
    }

    /// Human-readable subject name.
    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    /// DER encoding of the issuer name.
    pub fn issuer(&self) -> &[u8] {
        &self.issuer
    }

    /// Content octets of the serial number.
    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    /// DER `SubjectPublicKeyInfo`.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Start of the validity period, in seconds since the Unix epoch.
    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    /// End of the validity period, in seconds since the Unix epoch.
    pub fn not_after(&self) -> i64 {
        self.not_after
    }

    /// Returns true if `time` lies within the validity period.
    pub fn is_valid_at(&self, time: i64) -> bool {
        self.not_before <= time && time <= self.not_after
    }

    /// Subject key identifier extension, if present.
    pub fn subject_key_identifier(&self) -> Option<&[u8]> {
        self.subject_key_identifier.as_deref()
    }

    /// Issuer name and serial number of this certificate.
    pub fn issuer_serial(&self) -> IssuerSerial {
        IssuerSerial {
            issuer: self.issuer.clone(),
            serial: self.serial.clone(),
        }
    }

    /// Digest of the encoding with the given algorithm.
    pub fn digest(&self, alg: DigestAlgorithm) -> Vec<u8> {
        alg.digest(&self.encoded)
    }

    /// Returns true if the subject and issuer names are the same and the
    /// certificate verifies with its own key.
    pub fn is_self_signed(&self) -> bool {
        self.subject == self.issuer && self.is_signed_by(self).is_ok()
    }

    /// Returns true if `issuer`'s subject name matches this certificate's
    /// issuer name.
    pub fn names_issuer(&self, issuer: &CertificateToken) -> bool {
        self.issuer == issuer.subject
    }

    /// Verifies this certificate's signature with `issuer`'s public key.
    pub fn is_signed_by(&self, issuer: &CertificateToken) -> Result<(), RawSignatureValidationError> {
        let validator = validator_for_sig_and_hash_algs(&self.signature_algorithm, &SHA256_OID)
            .ok_or(RawSignatureValidationError::UnsupportedAlgorithm)?;

        validator.validate(&self.signature_value, &self.tbs_certificate, &issuer.public_key)
    }

    /// Returns true if this certificate is the one a CMS `sid` designates.
    pub fn matches_signer_identifier(&self, sid: &SignerIdentifier) -> bool {
        match sid {
            SignerIdentifier::IssuerAndSerialNumber(issuer_serial) => {
                self.matches_issuer_serial(issuer_serial)
            }
            SignerIdentifier::SubjectKeyIdentifier(ski) => {
                self.subject_key_identifier() == Some(ski.as_slice())
            }
        }
    }

    /// Returns true if the issuer name and serial number equal `issuer_serial`.
    ///
    /// Serial numbers are compared ignoring leading zero octets.
    pub fn matches_issuer_serial(&self, issuer_serial: &IssuerSerial) -> bool {
        fn trim(serial: &[u8]) -> &[u8] {
            let first = serial.iter().position(|b| *b != 0).unwrap_or(serial.len());
            &serial[first..]
        }
        self.issuer == issuer_serial.issuer && trim(&self.serial) == trim(&issuer_serial.serial)
    }
}

impl PartialEq for CertificateToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CertificateToken {}

impl fmt::Debug for CertificateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateToken")
            .field("id", &self.id)
            .field("subject", &self.subject_name)
            .finish()
    }
}
