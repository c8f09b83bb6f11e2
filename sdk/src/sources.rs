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

//! Collaborators that supply certificates and revocation data which are not
//! already embedded in a signature.
//!
//! Network retrieval (AIA, OCSP, CRL distribution points) belongs to the
//! implementations of these traits, not to this crate.

use std::collections::HashMap;

use crate::certificate::{CertificateError, CertificateToken};

/// A `CertificateSource` can find certificates that may have issued a given
/// certificate.
pub trait CertificateSource {
    /// Returns certificates that may have issued `token`.
    ///
    /// Candidates are not required to verify; the chain assembler checks
    /// signatures itself.
    fn issuer_candidates(&self, token: &CertificateToken) -> Vec<CertificateToken>;
}

/// Proof of the revocation status of one certificate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RevocationData {
    /// DER `CertificateList`
    Crl(Vec<u8>),

    /// DER `OCSPResponse`
    OcspResponse(Vec<u8>),
}

/// A revocation datum plus the certificates needed to validate it (for
/// example an OCSP responder certificate).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RevocationToken {
    /// The revocation datum
    pub data: RevocationData,

    /// DER certificates of the revocation issuer
    pub certificates: Vec<Vec<u8>>,
}

impl RevocationToken {
    /// Wraps a DER `CertificateList`.
    pub fn crl(crl: Vec<u8>) -> Self {
        Self {
            data: RevocationData::Crl(crl),
            certificates: Vec::new(),
        }
    }

    /// Wraps a DER `OCSPResponse`.
    pub fn ocsp_response(ocsp_response: Vec<u8>) -> Self {
        Self {
            data: RevocationData::OcspResponse(ocsp_response),
            certificates: Vec::new(),
        }
    }

    /// Adds the certificates of the revocation issuer.
    pub fn with_certificates(mut self, certificates: Vec<Vec<u8>>) -> Self {
        self.certificates = certificates;
        self
    }
}

/// A `RevocationSource` can prove the revocation status of a certificate.
pub trait RevocationSource {
    /// Returns a CRL or OCSP response covering `token` as issued by `issuer`,
    /// or `None` when no such datum can be obtained.
    fn revocation_status(
        &self,
        token: &CertificateToken,
        issuer: &CertificateToken,
    ) -> Option<RevocationToken>;
}

/// A [`CertificateSource`] backed by a fixed list of certificates, matched
/// by subject name.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCertificateSource {
    by_subject: HashMap<Vec<u8>, Vec<CertificateToken>>,
}

impl InMemoryCertificateSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a certificate.
    pub fn add(&mut self, token: CertificateToken) {
        let entry = self.by_subject.entry(token.subject().to_vec()).or_default();
        if !entry.contains(&token) {
            entry.push(token);
        }
    }

    /// Parses and adds a DER certificate.
    pub fn add_der(&mut self, der: &[u8]) -> Result<(), CertificateError> {
        self.add(CertificateToken::from_der(der)?);
        Ok(())
    }
}

impl CertificateSource for InMemoryCertificateSource {
    fn issuer_candidates(&self, token: &CertificateToken) -> Vec<CertificateToken> {
        self.by_subject
            .get(token.issuer())
            .cloned()
            .unwrap_or_default()
    }
}

/// A [`RevocationSource`] that never finds anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRevocationSource;

impl RevocationSource for NoRevocationSource {
    fn revocation_status(&self, _: &CertificateToken, _: &CertificateToken) -> Option<RevocationToken> {
        None
    }
}
