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

use std::{collections::HashSet, io::BufRead};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use x509_parser::pem::Pem;

use super::{CertificateToken, KeyId, TrustPredicate};
use crate::hash::sha256;

/// A `CertificateTrustPolicy` is configured with trust anchors and
/// privately-accepted end-entity certificates. It is the trust predicate a
/// [`CertificateEntityPool`](super::CertificateEntityPool) consults.
///
/// Anchors are matched by public key, so a re-issued anchor certificate
/// with the same key is trusted as well.
#[derive(Clone, Debug, Default)]
pub struct CertificateTrustPolicy {
    /// Trust anchors (root X.509 certificates) in DER format.
    trust_anchor_ders: Vec<Vec<u8>>,

    /// Public keys of the trust anchors.
    trust_anchor_keys: HashSet<KeyId>,

    /// Base-64 encoded SHA-256 hash of end-entity certificates in DER format.
    end_entity_cert_set: HashSet<String>,
}

impl CertificateTrustPolicy {
    /// Create a new certificate acceptance policy with no trust anchors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add trust anchors (root X.509 certificates) in PEM format.
    ///
    /// The function can be called multiple times to add multiple trust
    /// anchors.
    pub fn add_trust_anchors(
        &mut self,
        trust_anchor_pems: &[u8],
    ) -> Result<(), InvalidCertificateError> {
        for maybe_pem in Pem::iter_from_buffer(trust_anchor_pems) {
            // NOTE: `contents` holds the decoded DER certificate.
            match maybe_pem {
                Ok(pem) => self.add_trust_anchor_der(&pem.contents)?,
                Err(e) => {
                    return Err(InvalidCertificateError(e.to_string()));
                }
            }
        }

        Ok(())
    }

    /// Add one DER-encoded trust anchor.
    pub fn add_trust_anchor_der(&mut self, der: &[u8]) -> Result<(), InvalidCertificateError> {
        let token =
            CertificateToken::from_der(der).map_err(|e| InvalidCertificateError(e.to_string()))?;

        self.trust_anchor_keys.insert(token.key_id());
        self.trust_anchor_ders.push(der.to_vec());
        Ok(())
    }

    /// Add individual end-entity credentials that shall be accepted
    /// regardless of how they chain.
    ///
    /// Reads zero or more X.509 certificates in PEM format. Standalone lines
    /// outside of PEM blocks are accepted too if they contain a Base-64
    /// encoded SHA-256 hash of a certificate's DER encoding.
    ///
    /// Lines that match neither format are ignored.
    pub fn add_end_entity_credentials(
        &mut self,
        end_entity_cert_pems: &[u8],
    ) -> Result<(), InvalidCertificateError> {
        let mut inside_pem_block = false;

        for line in end_entity_cert_pems.lines().map_while(Result::ok) {
            if line.contains("-----BEGIN") {
                inside_pem_block = true;
            }
            if line.contains("-----END") {
                inside_pem_block = false;
            }
            if !inside_pem_block && line.len() == 44 && STANDARD.decode(&line).is_ok() {
                self.end_entity_cert_set.insert(line);
            }
        }

        for maybe_pem in Pem::iter_from_buffer(end_entity_cert_pems) {
            match maybe_pem {
                Ok(pem) => {
                    self.end_entity_cert_set
                        .insert(base64_sha256_cert_der(&pem.contents));
                }
                Err(e) => {
                    return Err(InvalidCertificateError(e.to_string()));
                }
            }
        }

        Ok(())
    }

    /// Remove all trust anchors and private credentials.
    pub fn clear(&mut self) {
        self.trust_anchor_ders.clear();
        self.trust_anchor_keys.clear();
        self.end_entity_cert_set.clear();
    }

    /// Return an iterator over the trust anchors, in DER format.
    pub fn trust_anchor_ders(&self) -> impl Iterator<Item = &'_ Vec<u8>> {
        self.trust_anchor_ders.iter()
    }
}

impl TrustPredicate for CertificateTrustPolicy {
    fn is_trust_anchor(&self, token: &CertificateToken) -> bool {
        self.trust_anchor_keys.contains(&token.key_id())
    }

    fn is_trusted(&self, token: &CertificateToken) -> bool {
        self.is_trust_anchor(token)
            || self
                .end_entity_cert_set
                .contains(&base64_sha256_cert_der(token.encoded()))
    }
}

fn base64_sha256_cert_der(cert_der: &[u8]) -> String {
    STANDARD.encode(sha256(cert_der))
}

/// This error can occur when adding certificates to a
/// [`CertificateTrustPolicy`].
#[derive(Debug, Eq, Error, PartialEq)]
#[error("Unable to parse certificate list: {0}")]
pub struct InvalidCertificateError(pub(crate) String);
