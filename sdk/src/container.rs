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

//! Typed view of a CMS `SignedData` structure carrying CAdES signatures.
//!
//! The codec layer decodes a container into these types and re-encodes
//! them afterwards. Fields that take part in hash computations keep their
//! exact DER encodings; the remaining fields are typed projections the
//! codec extracts for convenience (signing time, signing certificate
//! references).

use std::{collections::HashSet, fmt};

use asn1_rs::Oid;
use serde::{Deserialize, Serialize};

use crate::{
    asn1::{self, attributes, oids, Asn1Error},
    hash::{sha256, DigestAlgorithm},
};

/// The CAdES baseline levels, in increasing order of guarantees.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum SignatureLevel {
    /// Basic signature
    B,

    /// Signature with a signature time stamp
    T,

    /// Signature with long-term validation material
    Lt,

    /// Signature with archive time stamps
    Lta,
}

impl fmt::Display for SignatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::B => "CAdES-BASELINE-B",
            Self::T => "CAdES-BASELINE-T",
            Self::Lt => "CAdES-BASELINE-LT",
            Self::Lta => "CAdES-BASELINE-LTA",
        };
        f.write_str(name)
    }
}

/// Stable identifier of a signer entry.
///
/// Derived from the signature value, so it survives re-encoding of the
/// container and the addition of unsigned attributes.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct SignerId(String);

impl SignerId {
    /// Computes the identifier of the signer entry with this signature value.
    pub fn from_signature(signature: &[u8]) -> Self {
        Self(format!("S-{}", hex::encode_upper(sha256(signature))))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A CMS attribute: a type and one or more DER-encoded values.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Attribute {
    /// Attribute type
    #[serde(with = "serde_oid")]
    pub attr_type: Oid<'static>,

    /// DER encoding of each attribute value, in encounter order
    pub values: Vec<Vec<u8>>,
}

impl Attribute {
    /// Creates an attribute with a single value.
    pub fn new(attr_type: Oid<'static>, value: Vec<u8>) -> Self {
        Self {
            attr_type,
            values: vec![value],
        }
    }

    /// Returns the DER encoding of `Attribute ::= SEQUENCE { attrType,
    /// attrValues SET OF AttributeValue }`.
    pub fn to_der(&self) -> Result<Vec<u8>, Asn1Error> {
        asn1::encode_sequence(&[
            asn1::encode_oid(&self.attr_type)?,
            asn1::encode_set_of(&self.values)?,
        ])
    }

    /// Returns the DER encoding of the attribute type.
    pub fn type_der(&self) -> Result<Vec<u8>, Asn1Error> {
        asn1::encode_oid(&self.attr_type)
    }

    /// Returns the first value, if any.
    pub fn first_value(&self) -> Option<&[u8]> {
        self.values.first().map(Vec::as_slice)
    }
}

/// An issuer name and serial number pair.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct IssuerSerial {
    /// DER encoding of the issuer's distinguished name
    pub issuer: Vec<u8>,

    /// Content octets of the serial number `INTEGER`
    pub serial: Vec<u8>,
}

/// The `sid` field of a `SignerInfo`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum SignerIdentifier {
    /// `issuerAndSerialNumber`
    IssuerAndSerialNumber(IssuerSerial),

    /// `[0] subjectKeyIdentifier`
    SubjectKeyIdentifier(Vec<u8>),
}

impl SignerIdentifier {
    /// Returns the DER encoding of this identifier as it appears inside a
    /// `SignerInfo`.
    pub fn to_der(&self) -> Result<Vec<u8>, Asn1Error> {
        match self {
            Self::IssuerAndSerialNumber(issuer_serial) => asn1::encode_sequence(&[
                issuer_serial.issuer.clone(),
                asn1::encode_integer(&issuer_serial.serial)?,
            ]),
            Self::SubjectKeyIdentifier(ski) => {
                asn1::encode_tlv(asn1_rs::Class::ContextSpecific, false, asn1_rs::Tag(0), ski)
            }
        }
    }
}

/// One certificate reference from a `signing-certificate` or
/// `signing-certificate-v2` attribute.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CertificateReference {
    /// Algorithm of `digest` (SHA-1 for `signing-certificate`)
    pub digest_algorithm: DigestAlgorithm,

    /// Digest of the referenced certificate's encoding
    pub digest: Vec<u8>,

    /// Optional `issuerSerial` of the referenced certificate
    pub issuer_serial: Option<IssuerSerial>,
}

/// One `SignerInfo` of a `SignedData`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SignerEntry {
    /// DER encoding of the `version` field
    pub version: Vec<u8>,

    /// `sid` field
    pub sid: SignerIdentifier,

    /// Digest algorithm
    pub digest_algorithm: DigestAlgorithm,

    /// DER encoding of the `digestAlgorithm` field
    pub digest_algorithm_der: Vec<u8>,

    /// DER encoding of the `signedAttrs` field, with its `[0]` tag, if
    /// present
    pub signed_attributes: Option<Vec<u8>>,

    /// DER encoding of the `signatureAlgorithm` field
    pub signature_algorithm_der: Vec<u8>,

    /// Raw signature value
    pub signature: Vec<u8>,

    /// Unsigned attributes, in encounter order
    pub unsigned_attributes: Vec<Attribute>,

    /// `signing-time` attribute value as seconds since the Unix epoch
    pub signing_time: Option<i64>,

    /// Certificates referenced by the `signing-certificate(-v2)` attribute;
    /// the first one identifies the signer
    pub signing_certificate_references: Vec<CertificateReference>,

    /// Counter-signatures found in the unsigned attributes
    pub counter_signatures: Vec<SignerEntry>,
}

impl SignerEntry {
    /// Returns this entry's identifier.
    pub fn id(&self) -> SignerId {
        SignerId::from_signature(&self.signature)
    }

    /// Returns the signature algorithm OID.
    pub fn signature_algorithm_oid(&self) -> Result<Oid<'static>, Asn1Error> {
        asn1::algorithm_identifier_oid(&self.signature_algorithm_der)
    }

    /// Returns the bytes the signature value was computed over.
    ///
    /// With signed attributes present that is their `SET OF` encoding;
    /// otherwise it is the signed content itself.
    pub fn signed_bytes<'a>(&self, content: Option<&'a [u8]>) -> Option<std::borrow::Cow<'a, [u8]>> {
        match &self.signed_attributes {
            Some(signed_attrs) => Some(asn1::signed_attributes_as_set(signed_attrs).into()),
            None => content.map(Into::into),
        }
    }

    /// Returns the unsigned attributes of the given type.
    pub fn unsigned_attributes_of(&self, attr_type: &Oid<'_>) -> impl Iterator<Item = &Attribute> + '_ {
        let attr_type = attr_type.to_owned();
        self.unsigned_attributes
            .iter()
            .filter(move |attr| attr.attr_type == attr_type)
    }

    /// Returns true if the entry carries a `signature-time-stamp`.
    pub fn has_signature_timestamp(&self) -> bool {
        self.unsigned_attributes_of(&oids::SIGNATURE_TIMESTAMP_OID)
            .next()
            .is_some()
    }

    /// Returns true if the entry carries an `archive-time-stamp-v2` or
    /// `archive-time-stamp-v3`.
    pub fn has_archive_timestamp(&self) -> bool {
        self.unsigned_attributes
            .iter()
            .any(|attr| oids::is_archive_timestamp(&attr.attr_type))
    }

    /// Returns the level this entry reaches judging by its unsigned
    /// attributes alone.
    ///
    /// Whether validation material is complete (`LT`) depends on the chain
    /// and cannot be decided here; entries with a signature time stamp but
    /// no archive time stamp are reported as `T`.
    pub fn attribute_level(&self) -> SignatureLevel {
        if self.has_archive_timestamp() {
            SignatureLevel::Lta
        } else if self.has_signature_timestamp() {
            SignatureLevel::T
        } else {
            SignatureLevel::B
        }
    }
}

/// Kind of a revocation object embedded in `SignedData.crls`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum RevocationKind {
    /// `CertificateList`
    Crl,

    /// `OCSPResponse` stored as `other` with `id-ri-ocsp-response`
    OcspResponse,

    /// `BasicOCSPResponse` stored as `other` with `id-pkix-ocsp-basic`
    BasicOcspResponse,
}

/// One `RevocationInfoChoice` of `SignedData.crls`, kept in its exact
/// encoding.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct RevocationInfoChoice {
    /// Kind of revocation object
    pub kind: RevocationKind,

    /// Complete DER encoding of the choice (`CertificateList` or
    /// `[1] OtherRevocationInfoFormat`)
    pub encoded: Vec<u8>,
}

impl RevocationInfoChoice {
    /// Wraps a DER `CertificateList`.
    pub fn from_crl(crl: Vec<u8>) -> Self {
        Self {
            kind: RevocationKind::Crl,
            encoded: crl,
        }
    }

    /// Wraps a DER `OCSPResponse` as `other [1]` with `id-ri-ocsp-response`.
    pub fn from_ocsp_response(ocsp_response: &[u8]) -> Result<Self, Asn1Error> {
        Ok(Self {
            kind: RevocationKind::OcspResponse,
            encoded: attributes::other_revocation_info(&oids::ID_RI_OCSP_RESPONSE_OID, ocsp_response)?,
        })
    }

    /// Classifies an encoded `RevocationInfoChoice`.
    pub fn from_encoded(encoded: Vec<u8>) -> Result<Self, Asn1Error> {
        let (kind, _) = attributes::decode_revocation_info_choice(&encoded)?;
        Ok(Self { kind, encoded })
    }

    /// Returns the wrapped revocation object (`CertificateList`,
    /// `OCSPResponse` or `BasicOCSPResponse`).
    pub fn inner(&self) -> Result<Vec<u8>, Asn1Error> {
        attributes::decode_revocation_info_choice(&self.encoded).map(|(_, inner)| inner)
    }
}

/// Decoded view of a CMS `SignedData`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CmsSignedContainer {
    /// `encapContentInfo.eContentType`
    #[serde(with = "serde_oid")]
    pub content_type: Oid<'static>,

    /// The signed content, whether encapsulated or supplied separately for
    /// a detached signature
    pub content: Option<Vec<u8>>,

    /// DER `AlgorithmIdentifier`s of `SignedData.digestAlgorithms`
    pub digest_algorithms: Vec<Vec<u8>>,

    /// DER encodings of `SignedData.certificates`, in encounter order
    pub certificates: Vec<Vec<u8>>,

    /// `SignedData.crls`, in encounter order
    pub revocations: Vec<RevocationInfoChoice>,

    /// Top-level signer entries
    pub signers: Vec<SignerEntry>,
}

impl CmsSignedContainer {
    /// Returns the top-level signer entry with the given identifier.
    pub fn signer(&self, id: &SignerId) -> Option<&SignerEntry> {
        self.signers.iter().find(|entry| entry.id() == *id)
    }

    /// Returns the position of the top-level signer entry with the given
    /// identifier.
    pub fn signer_index(&self, id: &SignerId) -> Option<usize> {
        self.signers.iter().position(|entry| entry.id() == *id)
    }

    /// Returns every signer entry, including counter-signatures, in
    /// depth-first order.
    ///
    /// Entries whose identifier was already visited are skipped, so a
    /// malformed structure that repeats a signature cannot loop.
    pub fn all_signer_entries(&self) -> Vec<&SignerEntry> {
        let mut visited: HashSet<SignerId> = HashSet::new();
        let mut output = Vec::new();
        let mut stack: Vec<&SignerEntry> = self.signers.iter().rev().collect();

        while let Some(entry) = stack.pop() {
            if !visited.insert(entry.id()) {
                continue;
            }
            output.push(entry);
            stack.extend(entry.counter_signatures.iter().rev());
        }

        output
    }

    /// Returns true if a counter-signature (not a top-level entry) has the
    /// given identifier.
    pub fn is_counter_signature(&self, id: &SignerId) -> bool {
        self.signer(id).is_none() && self.all_signer_entries().iter().any(|e| e.id() == *id)
    }

    /// Appends a certificate unless an identical encoding is already
    /// present. Returns true if it was added.
    pub fn add_certificate(&mut self, certificate: &[u8]) -> bool {
        if self.certificates.iter().any(|c| c == certificate) {
            return false;
        }
        self.certificates.push(certificate.to_vec());
        true
    }

    /// Appends a revocation object unless an identical encoding is already
    /// present. Returns true if it was added.
    pub fn add_revocation(&mut self, revocation: RevocationInfoChoice) -> bool {
        if self.revocations.iter().any(|r| r.encoded == revocation.encoded) {
            return false;
        }
        self.revocations.push(revocation);
        true
    }

    /// Adds `algorithm` to `SignedData.digestAlgorithms` if it is missing.
    pub fn add_digest_algorithm(&mut self, algorithm: DigestAlgorithm) -> Result<(), Asn1Error> {
        let present = self.digest_algorithms.iter().any(|der| {
            DigestAlgorithm::from_algorithm_identifier_der(der).is_ok_and(|alg| alg == algorithm)
        });
        if !present {
            self.digest_algorithms
                .push(algorithm.algorithm_identifier_der()?);
        }
        Ok(())
    }
}

mod serde_oid {
    use std::str::FromStr;

    use asn1_rs::Oid;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(oid: &Oid<'static>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&oid.to_id_string())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Oid<'static>, D::Error> {
        let dotted = String::deserialize(d)?;
        Oid::from_str(&dotted).map_err(|e| D::Error::custom(format!("invalid OID {dotted}: {e:?}")))
    }
}
