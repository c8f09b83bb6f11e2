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

//! Identification of the certificate whose key produced a signature.

use std::sync::Arc;

use log::debug;

use crate::{
    certificate::{CertificateEntityPool, CertificateToken},
    container::{CertificateReference, SignerEntry},
    raw_signature::validator_for_sig_and_hash_algs,
};

/// What a [`SigningCertificateCandidate`] stands for.
#[derive(Clone, Debug)]
pub enum CandidateIdentity {
    /// A certificate from the pool
    Token(Arc<CertificateToken>),

    /// A declared reference for which no certificate was found
    Reference(CertificateReference),
}

/// One possible signing certificate and how well it matches the entry.
#[derive(Clone, Debug)]
pub struct SigningCertificateCandidate {
    /// The certificate, or the bare reference when none is known
    pub identity: CandidateIdentity,

    /// The declared reference digest equals the certificate's digest
    pub digest_matches: bool,

    /// The declared issuer and serial number equal the certificate's
    pub issuer_serial_matches: bool,

    /// The `sid` of the signer entry designates the certificate
    pub signer_identifier_matches: bool,

    /// The signature value verifies with the certificate's public key
    pub signature_matches: bool,
}

impl SigningCertificateCandidate {
    /// The certificate, if this candidate has one.
    pub fn token(&self) -> Option<&Arc<CertificateToken>> {
        match &self.identity {
            CandidateIdentity::Token(token) => Some(token),
            CandidateIdentity::Reference(_) => None,
        }
    }

    fn matches_reference(&self) -> bool {
        self.digest_matches || self.issuer_serial_matches
    }

    fn matches_identifier(&self) -> bool {
        self.matches_reference() || self.signer_identifier_matches
    }
}

/// Ranked candidates plus the one selected.
#[derive(Clone, Debug, Default)]
pub struct SigningCertificateResolution {
    /// All candidates, in pool order
    pub candidates: Vec<SigningCertificateCandidate>,

    /// Index of the selected candidate in `candidates`
    pub selected: Option<usize>,

    /// Per-candidate reasons for rejection
    pub errors: Vec<String>,
}

impl SigningCertificateResolution {
    /// The selected candidate.
    pub fn selected(&self) -> Option<&SigningCertificateCandidate> {
        self.selected.and_then(|i| self.candidates.get(i))
    }

    /// The certificate of the selected candidate, if its signature
    /// verifies.
    pub fn verified_certificate(&self) -> Option<&Arc<CertificateToken>> {
        self.selected()
            .filter(|c| c.signature_matches)
            .and_then(SigningCertificateCandidate::token)
    }
}

/// Selects, among the certificates of a pool, the one whose key produced a
/// signer entry's signature.
///
/// The resolver never fails: when nothing matches, the resolution has no
/// selection and lists why each candidate was rejected.
pub struct SigningCertificateResolver<'a> {
    pool: &'a CertificateEntityPool,
}

impl<'a> SigningCertificateResolver<'a> {
    /// Creates a resolver drawing candidates from `pool`.
    pub fn new(pool: &'a CertificateEntityPool) -> Self {
        Self { pool }
    }

    /// Builds and ranks the candidates for `entry`.
    ///
    /// `content` is the signed content; it is needed only when the entry
    /// has no signed attributes.
    pub fn resolve(&self, entry: &SignerEntry, content: Option<&[u8]>) -> SigningCertificateResolution {
        let mut resolution = SigningCertificateResolution {
            candidates: self.candidates(entry),
            ..Default::default()
        };

        let signed_bytes = entry.signed_bytes(content);
        let validator = match (entry.signature_algorithm_oid(), signed_bytes.as_ref()) {
            (Ok(sig_alg), Some(_)) => {
                let validator =
                    validator_for_sig_and_hash_algs(&sig_alg, &entry.digest_algorithm.oid());
                if validator.is_none() {
                    resolution
                        .errors
                        .push(format!("unsupported signature algorithm {}", sig_alg.to_id_string()));
                }
                validator
            }
            (Err(e), _) => {
                resolution
                    .errors
                    .push(format!("unreadable signature algorithm: {e}"));
                None
            }
            (_, None) => {
                resolution
                    .errors
                    .push("signed content is not available".to_string());
                None
            }
        };

        if let (Some(validator), Some(signed_bytes)) = (validator, signed_bytes) {
            for candidate in resolution.candidates.iter_mut() {
                let Some(token) = candidate.token().cloned() else {
                    continue;
                };

                match validator.validate(&entry.signature, &signed_bytes, token.public_key()) {
                    Ok(()) => candidate.signature_matches = true,
                    Err(e) => resolution
                        .errors
                        .push(format!("{}: {e}", token.subject_name())),
                }
            }
        }

        resolution.selected = select(&resolution.candidates);

        if resolution.candidates.is_empty() {
            resolution
                .errors
                .push("no candidate for the signing certificate".to_string());
        }

        debug!(
            "signing certificate of {}: {} candidates, selected {:?}",
            entry.id(),
            resolution.candidates.len(),
            resolution.selected
        );

        resolution
    }

    fn candidates(&self, entry: &SignerEntry) -> Vec<SigningCertificateCandidate> {
        let snapshot = self.pool.snapshot();

        let Some(reference) = entry.signing_certificate_references.first() else {
            // no declared reference: every known certificate is a candidate
            return snapshot
                .tokens()
                .map(|token| SigningCertificateCandidate {
                    identity: CandidateIdentity::Token(token.clone()),
                    digest_matches: false,
                    issuer_serial_matches: false,
                    signer_identifier_matches: token.matches_signer_identifier(&entry.sid),
                    signature_matches: false,
                })
                .collect();
        };

        let mut candidates: Vec<SigningCertificateCandidate> = snapshot
            .tokens()
            .map(|token| SigningCertificateCandidate {
                identity: CandidateIdentity::Token(token.clone()),
                digest_matches: token.digest(reference.digest_algorithm) == reference.digest,
                issuer_serial_matches: reference
                    .issuer_serial
                    .as_ref()
                    .is_some_and(|is| token.matches_issuer_serial(is)),
                signer_identifier_matches: token.matches_signer_identifier(&entry.sid),
                signature_matches: false,
            })
            .filter(SigningCertificateCandidate::matches_identifier)
            .collect();

        if candidates.is_empty() {
            candidates.push(SigningCertificateCandidate {
                identity: CandidateIdentity::Reference(reference.clone()),
                digest_matches: false,
                issuer_serial_matches: false,
                signer_identifier_matches: false,
                signature_matches: false,
            });
        }

        candidates
    }
}

fn select(candidates: &[SigningCertificateCandidate]) -> Option<usize> {
    candidates
        .iter()
        .position(|c| c.signature_matches && c.matches_reference())
        .or_else(|| candidates.iter().position(|c| c.signature_matches))
        .or_else(|| candidates.iter().position(|c| c.matches_identifier()))
}
