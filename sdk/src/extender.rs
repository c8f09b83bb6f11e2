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

//! The B → T → LT → LTA state machine.

use std::{collections::HashSet, sync::Arc};

use cades_status_tracker::{log_item, validation_codes, StatusTracker};
use log::{debug, warn};

use crate::{
    asn1::{self, attributes, oids, Asn1Error},
    certificate::{
        CertificateChain, CertificateChainAssembler, CertificateEntityPool, CertificateToken,
        TokenId, TrustPredicate,
    },
    codec::{CmsCodec, TimeStampToken},
    container::{Attribute, CmsSignedContainer, RevocationInfoChoice, SignatureLevel, SignerEntry, SignerId},
    hash::DigestAlgorithm,
    hash_index::ArchiveHashIndexBuilder,
    settings::ExtensionSettings,
    signing_certificate::SigningCertificateResolver,
    sources::{CertificateSource, RevocationSource},
    time_stamp::{TimeStampError, TimeStampProvider},
    validation_data::{destination_for, ValidationDataDestination, ValidationDataResolver, ValidationDataSet},
    Error, Result,
};

/// Raises signer entries of a [`CmsSignedContainer`] to a higher CAdES
/// baseline level.
///
/// Each transition has preconditions that are checked before anything is
/// added:
///
/// | from → to | adds |
/// |-----------|------|
/// | B → T | a `signature-time-stamp` over the signature value |
/// | T → LT | the certificates and revocation data of the signing chain (and of the time stamp authorities) |
/// | LT → LTA | an `archive-time-stamp-v3` carrying an `ats-hash-index` |
///
/// Extending to a level implies every lower one. T and LT are idempotent;
/// LTA always appends a new archive time stamp, which is how archive time
/// stamps are renewed.
///
/// The extender keeps a [`CertificateEntityPool`] across calls, so
/// certificates seen in one container help resolve chains in the next.
pub struct SignatureLevelExtender<'a> {
    settings: ExtensionSettings,
    pool: CertificateEntityPool,
    time_stamp_provider: &'a dyn TimeStampProvider,
    certificate_source: &'a dyn CertificateSource,
    revocation_source: &'a dyn RevocationSource,
    codec: &'a dyn CmsCodec,
}

// What the preconditions established about one entry.
struct EntryContext {
    id: SignerId,
    chain: CertificateChain,
}

impl<'a> SignatureLevelExtender<'a> {
    /// Creates an extender. Trust is evaluated with the policy described by
    /// `settings.trust`.
    pub fn new(
        settings: ExtensionSettings,
        time_stamp_provider: &'a dyn TimeStampProvider,
        certificate_source: &'a dyn CertificateSource,
        revocation_source: &'a dyn RevocationSource,
        codec: &'a dyn CmsCodec,
    ) -> Result<Self> {
        let trust = settings.trust_policy()?;
        Ok(Self {
            settings,
            pool: CertificateEntityPool::new(Arc::new(trust)),
            time_stamp_provider,
            certificate_source,
            revocation_source,
            codec,
        })
    }

    /// Replaces the trust predicate. Certificates already in the pool are
    /// dropped.
    pub fn with_trust_predicate(mut self, trust: Arc<dyn TrustPredicate>) -> Self {
        self.pool = CertificateEntityPool::new(trust);
        self
    }

    /// The certificate pool shared by all extensions of this extender.
    pub fn pool(&self) -> &CertificateEntityPool {
        &self.pool
    }

    /// Extends the entries `entry_ids` of `container` to `target` and
    /// returns the extended container. An empty `entry_ids` selects every
    /// top-level signer entry.
    ///
    /// Fatal conditions (no entries, an unknown entry, a signature that does
    /// not verify, a chain that cannot be built, a failing time stamp
    /// authority) abort the whole call and leave `container` untouched.
    /// Degraded conditions are recorded in `log`.
    pub fn extend(
        &self,
        container: &CmsSignedContainer,
        target: SignatureLevel,
        entry_ids: &[SignerId],
        log: &mut StatusTracker,
    ) -> Result<CmsSignedContainer> {
        if container.signers.is_empty() {
            return Err(Error::NoSignerEntries);
        }

        if target == SignatureLevel::B {
            return Err(Error::UnsupportedLevel(target));
        }

        let ids = self.select_entries(container, entry_ids, log)?;

        for certificate in &container.certificates {
            if let Err(e) = self.pool.add_der(certificate) {
                warn!("skipping undecodable certificate: {e}");
                log_item!("SignedData.certificates", "certificate cannot be decoded", "extend")
                    .validation_status(validation_codes::CERTIFICATE_MALFORMED)
                    .failure(log, Error::Certificate(e))?;
            }
        }

        // every precondition is checked before the first time stamp is
        // requested
        let contexts = ids
            .into_iter()
            .map(|id| self.check_preconditions(container, id, target, log))
            .collect::<Result<Vec<_>>>()?;

        let mut extended = container.clone();

        for context in &contexts {
            extended = self.extend_to_t(extended, context, log)?;

            if target >= SignatureLevel::Lt {
                extended = self.extend_to_lt(extended, context, log)?;
            }

            if target == SignatureLevel::Lta {
                extended = self.extend_to_lta(extended, context, log)?;
            }
        }

        Ok(extended)
    }

    fn select_entries(
        &self,
        container: &CmsSignedContainer,
        entry_ids: &[SignerId],
        log: &mut StatusTracker,
    ) -> Result<Vec<SignerId>> {
        if entry_ids.is_empty() {
            return Ok(container.signers.iter().map(SignerEntry::id).collect());
        }

        let mut ids = Vec::with_capacity(entry_ids.len());
        for id in entry_ids {
            if container.signer(id).is_some() {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            } else if container.is_counter_signature(id) {
                warn!("counter-signature {id} is not extended");
                log_item!(id.to_string(), "counter-signatures are not extended", "extend")
                    .validation_status(validation_codes::SIGNER_ENTRY_UNSUPPORTED)
                    .failure_no_throw(log, "counter-signature");
            } else {
                return Err(Error::SignerEntryNotFound(id.clone()));
            }
        }

        Ok(ids)
    }

    fn check_preconditions(
        &self,
        container: &CmsSignedContainer,
        id: SignerId,
        target: SignatureLevel,
        log: &mut StatusTracker,
    ) -> Result<EntryContext> {
        let entry = container
            .signer(&id)
            .ok_or_else(|| Error::SignerEntryNotFound(id.clone()))?;
        let label = id.to_string();

        let resolution =
            SigningCertificateResolver::new(&self.pool).resolve(entry, container.content.as_deref());

        let Some(signing_certificate) = resolution.verified_certificate().cloned() else {
            log_item!(label.clone(), "no certificate verifies the signature", "extend")
                .validation_status(validation_codes::SIGNING_CERTIFICATE_NOT_FOUND)
                .failure_no_throw(log, resolution.errors.join("; "));

            return Err(Error::InvalidSignature {
                id,
                reason: resolution.errors.join("; "),
            });
        };

        log_item!(
            label.clone(),
            format!("signed by {}", signing_certificate.subject_name()),
            "extend"
        )
        .validation_status(validation_codes::SIGNING_CERTIFICATE_IDENTIFIED)
        .success(log);

        if let (Some(content), Some(declared)) =
            (container.content.as_deref(), message_digest(entry)?)
        {
            if entry.digest_algorithm.digest(content) != declared {
                return Err(Error::InvalidSignature {
                    id,
                    reason: "message-digest does not match the signed content".to_string(),
                });
            }
        }

        let chain = self.assemble_chain(&signing_certificate)?;

        if !chain.tokens().iter().any(|token| self.pool.is_trusted(token)) {
            warn!("chain of {label} does not reach a trust anchor");
            let root = chain
                .root()
                .map(|root| root.subject_name().to_string())
                .unwrap_or_default();

            // validation data is only worth embedding for a trusted chain
            if target >= SignatureLevel::Lt {
                log_item!(label.clone(), "certificate chain is not trusted", "extend")
                    .validation_status(validation_codes::CERTIFICATE_CHAIN_UNTRUSTED)
                    .failure_no_throw(log, &root);
                return Err(Error::UntrustedChain { id, root });
            }

            log_item!(label.clone(), "certificate chain is not trusted", "extend")
                .validation_status(validation_codes::CERTIFICATE_CHAIN_UNTRUSTED)
                .failure(log, Error::UntrustedChain { id: id.clone(), root })?;
        }

        // a signature time stamp already attests the chain was usable when it
        // was produced; the certificates may have expired since
        if entry.has_signature_timestamp() {
            debug!("{label} already time-stamped, validity at signing time not rechecked");
            return Ok(EntryContext { id, chain });
        }

        let time = entry
            .signing_time
            .unwrap_or_else(|| chrono::Utc::now().timestamp());

        if let Some(invalid) = chain.tokens().iter().find(|token| !token.is_valid_at(time)) {
            return Err(Error::CertificateNotValidAtSigningTime {
                subject: invalid.subject_name().to_string(),
                time,
            });
        }

        Ok(EntryContext { id, chain })
    }

    // B → T
    fn extend_to_t(
        &self,
        mut container: CmsSignedContainer,
        context: &EntryContext,
        log: &mut StatusTracker,
    ) -> Result<CmsSignedContainer> {
        let index = signer_index(&container, &context.id)?;
        let entry = &container.signers[index];

        if entry.has_signature_timestamp() {
            log_item!(context.id.to_string(), "signature time stamp present", "extend_to_t")
                .validation_status(validation_codes::LEVEL_ALREADY_REACHED)
                .informational(log);
            return Ok(container);
        }

        let algorithm = self.settings.time_stamp.signature_digest_algorithm;
        let digest = algorithm.digest(&entry.signature);
        let (encoded, _) = self.request_time_stamp(algorithm, &digest)?;

        container.signers[index]
            .unsigned_attributes
            .push(Attribute::new(oids::SIGNATURE_TIMESTAMP_OID, encoded));

        debug!("added signature time stamp to {}", context.id);
        Ok(container)
    }

    // T → LT
    fn extend_to_lt(
        &self,
        mut container: CmsSignedContainer,
        context: &EntryContext,
        log: &mut StatusTracker,
    ) -> Result<CmsSignedContainer> {
        let index = signer_index(&container, &context.id)?;
        let label = context.id.to_string();

        let resolver = ValidationDataResolver::new(
            &self.pool,
            self.revocation_source,
            self.settings.validation_data.exclude_trust_anchors,
        );

        let mut required = resolver.collect(&context.chain, log);
        if self.settings.validation_data.include_timestamp_chains {
            required.merge(&self.time_stamp_validation_data(
                &container.signers[index],
                &resolver,
                log,
            ));
        }

        let destination = destination_for(&container.signers[index], self.codec, log);

        let mut present = ValidationDataSet::from_container(&container);
        present.add_signer_attributes(&container.signers[index], log);
        if let ValidationDataDestination::NestedArchiveTimestamp { token, .. } = &destination {
            present.merge(&ValidationDataSet::from_time_stamp_token(token, log));
        }

        let missing = required.exclude_already_present(&present);
        if missing.is_empty() {
            log_item!(label, "validation data complete", "extend_to_lt")
                .validation_status(validation_codes::LEVEL_ALREADY_REACHED)
                .informational(log);
            return Ok(container);
        }

        if let ValidationDataDestination::NestedArchiveTimestamp {
            attribute_index,
            value_index,
            token,
        } = destination
        {
            match self.nest_validation_data(*token, &missing) {
                Ok(encoded) => {
                    if let Some(value) = container.signers[index]
                        .unsigned_attributes
                        .get_mut(attribute_index)
                        .and_then(|attr| attr.values.get_mut(value_index))
                    {
                        *value = encoded;

                        log_item!(
                            label,
                            format!("{} validation data items added to the latest archive time stamp", missing.len()),
                            "extend_to_lt"
                        )
                        .validation_status(validation_codes::VALIDATION_DATA_NESTED)
                        .success(log);
                        return Ok(container);
                    }
                }
                Err(e) => {
                    warn!("unable to rewrite archive time stamp of {label}: {e}");
                    log_item!(label.clone(), "archive time stamp cannot be rewritten", "extend_to_lt")
                        .validation_status(validation_codes::TIMESTAMP_MALFORMED)
                        .failure(log, e)?;
                }
            }
        }

        for certificate in missing.certificates() {
            container.add_certificate(certificate);
        }
        for crl in missing.crls() {
            container.add_revocation(RevocationInfoChoice::from_crl(crl.clone()));
        }
        for ocsp in missing.ocsp_responses() {
            container.add_revocation(RevocationInfoChoice::from_ocsp_response(ocsp)?);
        }

        log_item!(
            label,
            format!("{} validation data items added", missing.len()),
            "extend_to_lt"
        )
        .validation_status(validation_codes::VALIDATION_DATA_ADDED)
        .success(log);

        Ok(container)
    }

    // LT → LTA
    fn extend_to_lta(
        &self,
        mut container: CmsSignedContainer,
        context: &EntryContext,
        log: &mut StatusTracker,
    ) -> Result<CmsSignedContainer> {
        let index = signer_index(&container, &context.id)?;
        let algorithm = self.settings.time_stamp.archive_digest_algorithm;

        container.add_digest_algorithm(algorithm)?;

        let builder = ArchiveHashIndexBuilder::new(algorithm, self.settings.hash_index.version)
            .with_lax_matching(self.settings.hash_index.lax_matching);

        let entry = &container.signers[index];
        let table = builder.build(&container, entry)?;
        let hash_index = builder.attribute(&table)?;
        let hash_index_value = hash_index
            .first_value()
            .ok_or_else(|| Error::InternalError("empty hash index attribute".into()))?;

        let imprint = builder.message_imprint(&container, entry, hash_index_value)?;
        let (_, mut token) = self.request_time_stamp(algorithm, &imprint)?;

        token
            .signer_mut()
            .ok_or_else(|| TimeStampError::DecodeError("time stamp token has no signer".into()))?
            .unsigned_attributes
            .push(hash_index);

        let status = builder.verify(&container, entry, &token, None, log);
        if !status.valid || !status.message_imprint_matches {
            return Err(Error::InternalError(format!(
                "archive time stamp does not cover the signature: {}",
                status.errors.join("; ")
            )));
        }

        let encoded = self.codec.encode_time_stamp_token(&token)?;
        container.signers[index]
            .unsigned_attributes
            .push(Attribute::new(oids::ARCHIVE_TIMESTAMP_V3_OID, encoded));

        debug!("added archive time stamp to {}", context.id);
        Ok(container)
    }

    fn request_time_stamp(
        &self,
        algorithm: DigestAlgorithm,
        digest: &[u8],
    ) -> Result<(Vec<u8>, TimeStampToken)> {
        let encoded = self
            .time_stamp_provider
            .send_time_stamp_request(algorithm, digest)
            .unwrap_or(Err(TimeStampError::NotConfigured))?;

        let token = self.codec.decode_time_stamp_token(&encoded)?;
        if token.message_imprint_algorithm != algorithm || token.message_imprint != digest {
            return Err(TimeStampError::InvalidData.into());
        }

        Ok((encoded, token))
    }

    fn assemble_chain(&self, leaf: &Arc<CertificateToken>) -> Result<CertificateChain> {
        let tokens = self.issuer_closure(leaf);
        Ok(CertificateChainAssembler::new(&self.pool).assemble(&tokens, Some(leaf.as_ref()))?)
    }

    // `leaf` plus every certificate that may be above it, from the pool and
    // the certificate source
    fn issuer_closure(&self, leaf: &CertificateToken) -> Vec<CertificateToken> {
        let mut seen: HashSet<TokenId> = HashSet::from([leaf.id()]);
        let mut tokens = vec![leaf.clone()];
        let mut next = 0;

        while let Some(current) = tokens.get(next).cloned() {
            next += 1;
            if current.is_self_signed() {
                continue;
            }

            let snapshot = self.pool.snapshot();
            let known = snapshot
                .tokens()
                .filter(|candidate| current.names_issuer(candidate))
                .map(|candidate| candidate.as_ref().clone());

            let candidates: Vec<CertificateToken> = known
                .chain(self.certificate_source.issuer_candidates(&current))
                .collect();

            for candidate in candidates {
                if seen.insert(candidate.id()) {
                    tokens.push(candidate);
                }
            }
        }

        tokens
    }

    // chains and revocation data of the authorities that produced the
    // entry's time stamps
    fn time_stamp_validation_data(
        &self,
        entry: &SignerEntry,
        resolver: &ValidationDataResolver<'_>,
        log: &mut StatusTracker,
    ) -> ValidationDataSet {
        let mut set = ValidationDataSet::new();

        let values = entry
            .unsigned_attributes
            .iter()
            .filter(|attr| oids::is_timestamp(&attr.attr_type))
            .flat_map(|attr| attr.values.iter());

        for value in values {
            let token = match self.codec.decode_time_stamp_token(value) {
                Ok(token) => token,
                Err(e) => {
                    log_item!(entry.id().to_string(), "time stamp cannot be decoded", "extend_to_lt")
                        .validation_status(validation_codes::TIMESTAMP_MALFORMED)
                        .failure_no_throw(log, e);
                    continue;
                }
            };

            for certificate in token.certificates() {
                if let Err(e) = self.pool.add_der(certificate) {
                    warn!("skipping undecodable time stamp certificate: {e}");
                }
            }

            // the token's own signature is not checked here
            let tsa_certificate = token.signer().and_then(|signer| {
                let resolution = SigningCertificateResolver::new(&self.pool)
                    .resolve(signer, token.signed_data.content.as_deref());
                resolution
                    .selected()
                    .and_then(|candidate| candidate.token().cloned())
            });

            let chain = match tsa_certificate {
                Some(tsa) => self.assemble_chain(&tsa),
                None => Err(Error::InternalError("signer certificate not found".into())),
            };

            match chain {
                Ok(chain) => set.merge(&resolver.collect(&chain, log)),
                Err(e) => {
                    warn!("unable to resolve time stamp authority chain: {e}");
                    log_item!(
                        entry.id().to_string(),
                        "time stamp authority chain not resolved",
                        "extend_to_lt"
                    )
                    .validation_status(validation_codes::TIMESTAMP_CHAIN_UNRESOLVED)
                    .failure_no_throw(log, e.to_string());
                }
            }
        }

        set
    }

    // Adds `missing` to the validation data attributes of the token's signer
    // and re-encodes the token.
    fn nest_validation_data(
        &self,
        mut token: TimeStampToken,
        missing: &ValidationDataSet,
    ) -> Result<Vec<u8>> {
        let signer = token
            .signer_mut()
            .ok_or_else(|| TimeStampError::DecodeError("time stamp token has no signer".into()))?;

        let mut certificates = Vec::new();
        for attr in signer.unsigned_attributes_of(&oids::CERTIFICATE_VALUES_OID) {
            for value in &attr.values {
                certificates.extend(attributes::decode_certificate_values(value)?);
            }
        }
        for certificate in missing.certificates() {
            if !certificates.contains(certificate) {
                certificates.push(certificate.clone());
            }
        }

        let mut crls = Vec::new();
        let mut basic_ocsps = Vec::new();
        for attr in signer.unsigned_attributes_of(&oids::REVOCATION_VALUES_OID) {
            for value in &attr.values {
                let (c, o) = attributes::decode_revocation_values(value)?;
                crls.extend(c);
                basic_ocsps.extend(o);
            }
        }
        for crl in missing.crls() {
            if !crls.contains(crl) {
                crls.push(crl.clone());
            }
        }
        for ocsp in missing.ocsp_responses() {
            let basic = attributes::basic_ocsp_response(ocsp).unwrap_or_else(|_| ocsp.clone());
            if !basic_ocsps.contains(&basic) {
                basic_ocsps.push(basic);
            }
        }

        if !certificates.is_empty() {
            replace_attribute(
                signer,
                Attribute::new(
                    oids::CERTIFICATE_VALUES_OID,
                    attributes::encode_certificate_values(&certificates)?,
                ),
            );
        }
        if !crls.is_empty() || !basic_ocsps.is_empty() {
            replace_attribute(
                signer,
                Attribute::new(
                    oids::REVOCATION_VALUES_OID,
                    attributes::encode_revocation_values(&crls, &basic_ocsps)?,
                ),
            );
        }

        Ok(self.codec.encode_time_stamp_token(&token)?)
    }
}

fn signer_index(container: &CmsSignedContainer, id: &SignerId) -> Result<usize> {
    container
        .signer_index(id)
        .ok_or_else(|| Error::SignerEntryNotFound(id.clone()))
}

// Replaces the first attribute of the same type in place, or appends.
fn replace_attribute(entry: &mut SignerEntry, attribute: Attribute) {
    match entry
        .unsigned_attributes
        .iter_mut()
        .find(|attr| attr.attr_type == attribute.attr_type)
    {
        Some(existing) => *existing = attribute,
        None => entry.unsigned_attributes.push(attribute),
    }
}

/// Returns the value of the `message-digest` signed attribute.
fn message_digest(entry: &SignerEntry) -> std::result::Result<Option<Vec<u8>>, Asn1Error> {
    let Some(signed_attributes) = &entry.signed_attributes else {
        return Ok(None);
    };

    let as_set = asn1::signed_attributes_as_set(signed_attributes);
    for attribute in asn1::set_elements(&as_set)? {
        let fields = asn1::sequence_elements(attribute.raw)?;
        let [attr_type, values] = fields.as_slice() else {
            continue;
        };

        if asn1::oid_from_element(attr_type)? != oids::MESSAGE_DIGEST_OID {
            continue;
        }

        if let Some(value) = asn1::set_elements(values.raw)?.first() {
            return Ok(Some(asn1::octet_string_from_element(value)?.to_vec()));
        }
    }

    Ok(None)
}
