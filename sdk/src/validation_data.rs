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

//! Collection of the certificates and revocation data needed to validate a
//! signing chain later on, and the decision where to embed them.

use std::collections::HashSet;

use cades_status_tracker::{log_item, validation_codes, StatusTracker};
use log::warn;

use crate::{
    asn1::{attributes, oids, Asn1Error},
    certificate::{CertificateChain, CertificateEntityPool},
    codec::{CmsCodec, TimeStampToken},
    container::{CmsSignedContainer, RevocationKind, SignerEntry},
    hash::sha256,
    sources::{RevocationData, RevocationSource},
};

/// Certificates, CRLs and OCSP responses without duplicates.
///
/// Membership is decided by digest equality. OCSP responses are compared
/// by their `BasicOCSPResponse`, so an `OCSPResponse` and the basic
/// response it wraps count as the same datum.
#[derive(Clone, Debug, Default)]
pub struct ValidationDataSet {
    certificates: Vec<Vec<u8>>,
    crls: Vec<Vec<u8>>,
    ocsp_responses: Vec<Vec<u8>>,
    digests: HashSet<Vec<u8>>,
}

impl ValidationDataSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects what a container already embeds in `SignedData.certificates`
    /// and `SignedData.crls`.
    pub fn from_container(container: &CmsSignedContainer) -> Self {
        let mut set = Self::new();
        set.add_container(container);
        set
    }

    /// Collects what a time stamp token embeds, in its `SignedData` and in
    /// the validation data attributes of its signer.
    pub fn from_time_stamp_token(token: &TimeStampToken, log: &mut StatusTracker) -> Self {
        let mut set = Self::from_container(&token.signed_data);
        if let Some(signer) = token.signer() {
            set.add_signer_attributes(signer, log);
        }
        set
    }

    fn add_container(&mut self, container: &CmsSignedContainer) {
        for certificate in &container.certificates {
            self.add_certificate(certificate);
        }

        for revocation in &container.revocations {
            let Ok(inner) = revocation.inner() else {
                continue;
            };
            if revocation.kind == RevocationKind::Crl {
                self.add_crl(&inner);
            } else {
                self.add_ocsp_response(&inner);
            }
        }
    }

    /// Adds the content of `certificate-values` and `revocation-values`
    /// attributes of `entry`.
    ///
    /// An attribute value that cannot be decoded contributes nothing and is
    /// logged with `validationData.malformed`.
    pub fn add_signer_attributes(&mut self, entry: &SignerEntry, log: &mut StatusTracker) {
        for attr in entry.unsigned_attributes_of(&oids::CERTIFICATE_VALUES_OID) {
            for value in &attr.values {
                match attributes::decode_certificate_values(value) {
                    Ok(certificates) => {
                        for certificate in certificates {
                            self.add_certificate(&certificate);
                        }
                    }
                    Err(e) => malformed(log, entry, "certificate-values", e),
                }
            }
        }

        for attr in entry.unsigned_attributes_of(&oids::REVOCATION_VALUES_OID) {
            for value in &attr.values {
                match attributes::decode_revocation_values(value) {
                    Ok((crls, ocsps)) => {
                        for crl in crls {
                            self.add_crl(&crl);
                        }
                        for ocsp in ocsps {
                            self.add_ocsp_response(&ocsp);
                        }
                    }
                    Err(e) => malformed(log, entry, "revocation-values", e),
                }
            }
        }
    }

    /// Adds a DER certificate. Returns true if it was not present yet.
    pub fn add_certificate(&mut self, certificate: &[u8]) -> bool {
        if self.digests.insert(sha256(certificate)) {
            self.certificates.push(certificate.to_vec());
            true
        } else {
            false
        }
    }

    /// Adds a DER `CertificateList`. Returns true if it was not present yet.
    pub fn add_crl(&mut self, crl: &[u8]) -> bool {
        if self.digests.insert(sha256(crl)) {
            self.crls.push(crl.to_vec());
            true
        } else {
            false
        }
    }

    /// Adds a DER `OCSPResponse` (or `BasicOCSPResponse`). Returns true if
    /// it was not present yet.
    pub fn add_ocsp_response(&mut self, ocsp_response: &[u8]) -> bool {
        if self.digests.insert(ocsp_key(ocsp_response)) {
            self.ocsp_responses.push(ocsp_response.to_vec());
            true
        } else {
            false
        }
    }

    /// Adds a revocation datum. Returns true if it was not present yet.
    pub fn add_revocation(&mut self, revocation: &RevocationData) -> bool {
        match revocation {
            RevocationData::Crl(crl) => self.add_crl(crl),
            RevocationData::OcspResponse(ocsp) => self.add_ocsp_response(ocsp),
        }
    }

    /// Adds every member of `other`.
    pub fn merge(&mut self, other: &ValidationDataSet) {
        for certificate in &other.certificates {
            self.add_certificate(certificate);
        }
        for crl in &other.crls {
            self.add_crl(crl);
        }
        for ocsp in &other.ocsp_responses {
            self.add_ocsp_response(ocsp);
        }
    }

    /// Returns the members of this set that `existing` does not contain.
    pub fn exclude_already_present(&self, existing: &ValidationDataSet) -> ValidationDataSet {
        let mut remaining = ValidationDataSet::new();

        for certificate in &self.certificates {
            if !existing.digests.contains(&sha256(certificate)) {
                remaining.add_certificate(certificate);
            }
        }
        for crl in &self.crls {
            if !existing.digests.contains(&sha256(crl)) {
                remaining.add_crl(crl);
            }
        }
        for ocsp in &self.ocsp_responses {
            if !existing.digests.contains(&ocsp_key(ocsp)) {
                remaining.add_ocsp_response(ocsp);
            }
        }

        remaining
    }

    /// DER certificates, in insertion order.
    pub fn certificates(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    /// DER CRLs, in insertion order.
    pub fn crls(&self) -> &[Vec<u8>] {
        &self.crls
    }

    /// DER OCSP responses, in insertion order.
    pub fn ocsp_responses(&self) -> &[Vec<u8>] {
        &self.ocsp_responses
    }

    /// Returns true if the set holds this certificate, CRL or OCSP response.
    pub fn contains(&self, encoded: &[u8]) -> bool {
        self.digests.contains(&sha256(encoded)) || self.digests.contains(&ocsp_key(encoded))
    }

    /// Total number of members.
    pub fn len(&self) -> usize {
        self.certificates.len() + self.crls.len() + self.ocsp_responses.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn malformed(log: &mut StatusTracker, entry: &SignerEntry, attribute: &str, e: Asn1Error) {
    warn!("unreadable {attribute} attribute in {}: {e}", entry.id());
    log_item!(
        entry.id().to_string(),
        format!("{attribute} attribute cannot be decoded"),
        "ValidationDataSet::add_signer_attributes"
    )
    .validation_status(validation_codes::VALIDATION_DATA_MALFORMED)
    .failure_no_throw(log, e);
}

fn ocsp_key(ocsp: &[u8]) -> Vec<u8> {
    match attributes::basic_ocsp_response(ocsp) {
        Ok(basic) => sha256(&basic),
        Err(_) => sha256(ocsp),
    }
}

/// Gathers validation data for resolved certificate chains.
pub struct ValidationDataResolver<'a> {
    pool: &'a CertificateEntityPool,
    revocation_source: &'a dyn RevocationSource,
    exclude_trust_anchors: bool,
}

impl<'a> ValidationDataResolver<'a> {
    /// Creates a resolver.
    ///
    /// With `exclude_trust_anchors`, certificates the pool considers trust
    /// anchors are neither collected nor checked for revocation.
    pub fn new(
        pool: &'a CertificateEntityPool,
        revocation_source: &'a dyn RevocationSource,
        exclude_trust_anchors: bool,
    ) -> Self {
        Self {
            pool,
            revocation_source,
            exclude_trust_anchors,
        }
    }

    /// Collects every certificate of `chain` and the revocation status of
    /// each one that is not self-signed.
    ///
    /// Collection is best-effort: a missing revocation datum is logged to
    /// `log` with `revocation.unavailable` and the set is simply smaller.
    pub fn collect(&self, chain: &CertificateChain, log: &mut StatusTracker) -> ValidationDataSet {
        let mut set = ValidationDataSet::new();

        for token in chain.tokens() {
            if self.exclude_trust_anchors && self.pool.is_trust_anchor(token) {
                continue;
            }

            set.add_certificate(token.encoded());

            if token.is_self_signed() {
                continue;
            }

            let Some(issuer) = chain.issuer_of(token) else {
                warn!("no issuer to check revocation of {}", token.subject_name());
                log_item!(
                    token.subject_name().to_string(),
                    "issuer unknown, revocation status not collected",
                    "ValidationDataResolver::collect"
                )
                .validation_status(validation_codes::REVOCATION_UNAVAILABLE)
                .failure_no_throw(log, "issuer not found");
                continue;
            };

            match self.revocation_source.revocation_status(token, issuer) {
                Some(revocation) => {
                    set.add_revocation(&revocation.data);
                    for certificate in &revocation.certificates {
                        set.add_certificate(certificate);
                    }
                }
                None => {
                    warn!("revocation data unavailable for {}", token.subject_name());
                    log_item!(
                        token.subject_name().to_string(),
                        "revocation data unavailable",
                        "ValidationDataResolver::collect"
                    )
                    .validation_status(validation_codes::REVOCATION_UNAVAILABLE)
                    .failure_no_throw(log, "no CRL or OCSP response");
                }
            }
        }

        set
    }
}

/// Where the validation data of a signer entry must be written.
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationDataDestination {
    /// `SignedData.certificates` and `SignedData.crls` of the signature
    /// container
    Root,

    /// The signer of the most recent archive time stamp of the entry
    NestedArchiveTimestamp {
        /// Index of the attribute in the entry's unsigned attributes
        attribute_index: usize,

        /// Index of the value in that attribute
        value_index: usize,

        /// The decoded token
        token: Box<TimeStampToken>,
    },
}

/// Decides where validation data for `entry` goes.
///
/// When the entry carries archive time stamps, the most recent one (latest
/// `genTime`, later position on ties) receives the data so the coverage of
/// earlier time stamps is preserved. A token that cannot be decoded is
/// logged with `timeStamp.malformed` and skipped.
pub fn destination_for(
    entry: &SignerEntry,
    codec: &dyn CmsCodec,
    log: &mut StatusTracker,
) -> ValidationDataDestination {
    let mut latest: Option<(usize, usize, TimeStampToken)> = None;

    for (attribute_index, attr) in entry.unsigned_attributes.iter().enumerate() {
        if !oids::is_archive_timestamp(&attr.attr_type) {
            continue;
        }

        for (value_index, value) in attr.values.iter().enumerate() {
            match codec.decode_time_stamp_token(value) {
                Ok(token) => {
                    let newer = latest
                        .as_ref()
                        .map_or(true, |(_, _, current)| token.gen_time >= current.gen_time);
                    if newer {
                        latest = Some((attribute_index, value_index, token));
                    }
                }
                Err(e) => {
                    warn!("unable to decode archive time stamp of {}: {e}", entry.id());
                    log_item!(
                        entry.id().to_string(),
                        "archive time stamp cannot be decoded",
                        "destination_for"
                    )
                    .validation_status(validation_codes::TIMESTAMP_MALFORMED)
                    .failure_no_throw(log, e);
                }
            }
        }
    }

    match latest {
        Some((attribute_index, value_index, token)) => {
            ValidationDataDestination::NestedArchiveTimestamp {
                attribute_index,
                value_index,
                token: Box::new(token),
            }
        }
        None => ValidationDataDestination::Root,
    }
}
