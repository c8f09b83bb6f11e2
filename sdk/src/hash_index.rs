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

//! The `ats-hash-index` attribute binding an archive time stamp to the
//! certificates, revocation data and unsigned attributes present when it
//! was produced, and the archive time stamp message imprint built on it.

use asn1_rs::Oid;
use cades_status_tracker::{log_item, validation_codes, StatusTracker};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    asn1::{self, oids, Asn1Error},
    codec::TimeStampToken,
    container::{Attribute, CmsSignedContainer, RevocationInfoChoice, SignerEntry},
    hash::DigestAlgorithm,
    validation_data::ValidationDataSet,
    Error, Result,
};

/// The three generations of the hash index attribute.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AtsHashIndexVersion {
    /// `id-aa-ATSHashIndex` (ETSI TS 101 733). Attribute digests cover
    /// complete attributes; `certificate-values` and `revocation-values`
    /// are left out.
    Legacy,

    /// `id-aa-ATSHashIndex-v2`. Attribute digests cover complete attributes.
    V2,

    /// `id-aa-ATSHashIndex-v3`. One attribute digest per attribute value.
    #[default]
    V3,
}

impl AtsHashIndexVersion {
    /// The attribute type of this version.
    pub fn oid(&self) -> Oid<'static> {
        match self {
            Self::Legacy => oids::ATS_HASH_INDEX_OID,
            Self::V2 => oids::ATS_HASH_INDEX_V2_OID,
            Self::V3 => oids::ATS_HASH_INDEX_V3_OID,
        }
    }

    /// Finds the version whose attribute type is `oid`.
    pub fn from_oid(oid: &Oid) -> Option<Self> {
        if *oid == oids::ATS_HASH_INDEX_V3_OID {
            Some(Self::V3)
        } else if *oid == oids::ATS_HASH_INDEX_V2_OID {
            Some(Self::V2)
        } else if *oid == oids::ATS_HASH_INDEX_OID {
            Some(Self::Legacy)
        } else {
            None
        }
    }
}

/// Decoded value of an `ats-hash-index` attribute:
///
/// ```text
/// ATSHashIndex ::= SEQUENCE {
///     hashIndAlgorithm       AlgorithmIdentifier DEFAULT {algorithm id-sha256},
///     certificatesHashIndex  SEQUENCE OF OCTET STRING,
///     crlsHashIndex          SEQUENCE OF OCTET STRING,
///     unsignedAttrsHashIndex SEQUENCE OF OCTET STRING }
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HashIndexTable {
    /// Algorithm of every digest in the table
    pub algorithm: DigestAlgorithm,

    /// One digest per `SignedData.certificates` entry
    pub certificate_digests: Vec<Vec<u8>>,

    /// One digest per `SignedData.crls` entry
    pub revocation_digests: Vec<Vec<u8>>,

    /// Digests of the unsigned attributes of the signer entry
    pub attribute_digests: Vec<Vec<u8>>,
}

impl HashIndexTable {
    /// Encodes the table. The algorithm identifier is omitted when it is
    /// the default (SHA-256).
    pub fn to_der(&self) -> std::result::Result<Vec<u8>, Asn1Error> {
        let mut fields = Vec::with_capacity(4);
        if self.algorithm != DigestAlgorithm::Sha256 {
            fields.push(self.algorithm.algorithm_identifier_der()?);
        }
        fields.push(encode_digest_list(&self.certificate_digests)?);
        fields.push(encode_digest_list(&self.revocation_digests)?);
        fields.push(encode_digest_list(&self.attribute_digests)?);
        asn1::encode_sequence(&fields)
    }

    /// Decodes a table. The leading algorithm identifier is optional; a bare
    /// OID in its place is accepted too.
    pub fn from_der(der: &[u8]) -> std::result::Result<Self, Asn1Error> {
        let fields = asn1::sequence_elements(der)?;

        let (algorithm, lists) = match fields.as_slice() {
            [alg, lists @ ..] if lists.len() == 3 => {
                (DigestAlgorithm::from_algorithm_identifier_der(alg.raw)?, lists)
            }
            lists if lists.len() == 3 => (DigestAlgorithm::Sha256, lists),
            _ => {
                return Err(Asn1Error::Malformed(format!(
                    "ATSHashIndex has {} fields",
                    fields.len()
                )))
            }
        };

        Ok(Self {
            algorithm,
            certificate_digests: decode_digest_list(lists[0].raw)?,
            revocation_digests: decode_digest_list(lists[1].raw)?,
            attribute_digests: decode_digest_list(lists[2].raw)?,
        })
    }
}

fn encode_digest_list(digests: &[Vec<u8>]) -> std::result::Result<Vec<u8>, Asn1Error> {
    let encoded = digests
        .iter()
        .map(|d| asn1::encode_octet_string(d))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    asn1::encode_sequence(&encoded)
}

fn decode_digest_list(der: &[u8]) -> std::result::Result<Vec<Vec<u8>>, Asn1Error> {
    asn1::sequence_elements(der)?
        .iter()
        .map(|element| asn1::octet_string_from_element(element).map(<[u8]>::to_vec))
        .collect()
}

/// Outcome of checking an archive time stamp's hash index against the
/// current state of a signature.
///
/// A failed check is not an error: the status is handed to whoever decides
/// the level of the signature.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ArchiveHashIndexStatus {
    /// True if every declared digest was matched
    pub valid: bool,

    /// Version of the hash index found in the time stamp
    pub version: Option<AtsHashIndexVersion>,

    /// Declared certificate digests without a match
    pub unmatched_certificates: Vec<Vec<u8>>,

    /// Declared revocation digests without a match
    pub unmatched_revocations: Vec<Vec<u8>>,

    /// Declared attribute digests without a match
    pub unmatched_attributes: Vec<Vec<u8>>,

    /// Digests only found through the lax fallback
    pub lax_matches: usize,

    /// True if the time stamp's message imprint equals the recomputed one
    pub message_imprint_matches: bool,

    /// Reasons the check failed
    pub errors: Vec<String>,
}

/// Builds and verifies hash index tables and archive time stamp imprints.
#[derive(Clone, Debug)]
pub struct ArchiveHashIndexBuilder {
    algorithm: DigestAlgorithm,
    version: AtsHashIndexVersion,
    lax_matching: bool,
}

impl Default for ArchiveHashIndexBuilder {
    fn default() -> Self {
        Self::new(DigestAlgorithm::Sha256, AtsHashIndexVersion::V3)
    }
}

impl ArchiveHashIndexBuilder {
    /// Creates a builder producing tables of `version` with digests of
    /// `algorithm`.
    pub fn new(algorithm: DigestAlgorithm, version: AtsHashIndexVersion) -> Self {
        Self {
            algorithm,
            version,
            lax_matching: false,
        }
    }

    /// Allows declared digests to be matched against validation data that
    /// is known but not embedded where the hash index says it should be.
    ///
    /// This weakens tamper evidence and is off by default.
    pub fn with_lax_matching(mut self, lax_matching: bool) -> Self {
        self.lax_matching = lax_matching;
        self
    }

    /// Digest algorithm of the tables this builder produces.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Builds the table over the current certificates and revocation data of
    /// `container` and the current unsigned attributes of `entry`.
    ///
    /// No table is produced when the signed content is not available, since
    /// no archive time stamp could be computed over it.
    pub fn build(&self, container: &CmsSignedContainer, entry: &SignerEntry) -> Result<HashIndexTable> {
        if container.content.is_none() {
            return Err(Error::MissingSignedContent);
        }

        let table = HashIndexTable {
            algorithm: self.algorithm,
            certificate_digests: certificate_digests(self.algorithm, container),
            revocation_digests: revocation_digests(self.algorithm, &container.revocations),
            attribute_digests: attribute_digests(self.algorithm, self.version, entry)?,
        };

        debug!(
            "hash index for {}: {} certificates, {} revocations, {} attributes",
            entry.id(),
            table.certificate_digests.len(),
            table.revocation_digests.len(),
            table.attribute_digests.len()
        );

        Ok(table)
    }

    /// Wraps a table as an unsigned attribute of this builder's version.
    pub fn attribute(&self, table: &HashIndexTable) -> std::result::Result<Attribute, Asn1Error> {
        Ok(Attribute::new(self.version.oid(), table.to_der()?))
    }

    /// Computes the archive time stamp message imprint over `entry` and the
    /// encoded hash index value, with this builder's algorithm.
    pub fn message_imprint(
        &self,
        container: &CmsSignedContainer,
        entry: &SignerEntry,
        hash_index: &[u8],
    ) -> Result<Vec<u8>> {
        archive_message_imprint(self.algorithm, container, entry, hash_index)
    }

    /// Checks the hash index carried by the archive time stamp `token`
    /// against the current state of `entry` and `container`.
    ///
    /// With lax matching enabled, declared certificate and revocation
    /// digests that are not found in the container may still be matched
    /// against `known`. The outcome is also recorded in `log`.
    pub fn verify(
        &self,
        container: &CmsSignedContainer,
        entry: &SignerEntry,
        token: &TimeStampToken,
        known: Option<&ValidationDataSet>,
        log: &mut StatusTracker,
    ) -> ArchiveHashIndexStatus {
        let mut status = ArchiveHashIndexStatus::default();
        let label = entry.id().to_string();

        let Some((version, value)) = hash_index_of(token) else {
            status.errors.push("time stamp carries no hash index".to_string());
            record_malformed(log, &label, &status);
            return status;
        };
        status.version = Some(version);

        let table = match HashIndexTable::from_der(value) {
            Ok(table) => table,
            Err(e) => {
                status.errors.push(format!("unreadable hash index: {e}"));
                record_malformed(log, &label, &status);
                return status;
            }
        };

        let alg = table.algorithm;

        status.unmatched_certificates = consume(
            &table.certificate_digests,
            certificate_digests(alg, container),
        );
        status.unmatched_revocations = consume(
            &table.revocation_digests,
            revocation_digests(alg, &container.revocations),
        );
        status.unmatched_attributes = match attribute_digests(alg, version, entry) {
            Ok(current) => consume(&table.attribute_digests, current),
            Err(e) => {
                status.errors.push(format!("unable to digest attributes: {e}"));
                table.attribute_digests.clone()
            }
        };

        if self.lax_matching {
            if let Some(known) = known {
                status.lax_matches = lax_match(alg, known, &mut status);
            }
        }

        match archive_message_imprint(alg, container, entry, value) {
            Ok(imprint) => {
                status.message_imprint_matches = token.message_imprint_algorithm == alg
                    && token.message_imprint == imprint;
            }
            Err(e) => status.errors.push(format!("unable to compute imprint: {e}")),
        }

        status.valid = status.errors.is_empty()
            && status.unmatched_certificates.is_empty()
            && status.unmatched_revocations.is_empty()
            && status.unmatched_attributes.is_empty();

        record(log, &label, &status);
        status
    }
}

/// Returns the version and encoded value of the hash index attribute in the
/// signer of an archive time stamp token.
pub fn hash_index_of(token: &TimeStampToken) -> Option<(AtsHashIndexVersion, &[u8])> {
    token.signer()?.unsigned_attributes.iter().find_map(|attr| {
        let version = AtsHashIndexVersion::from_oid(&attr.attr_type)?;
        attr.first_value().map(|value| (version, value))
    })
}

/// Computes `digest(eContentType ∥ digest(content) ∥ version ∥ sid ∥
/// digestAlgorithm ∥ signedAttrs ∥ signatureAlgorithm ∥ signature ∥
/// hashIndex)` with every field in its DER encoding.
///
/// The order of the fields is fixed by ETSI EN 319 122-1 and must not
/// change.
pub fn archive_message_imprint(
    alg: DigestAlgorithm,
    container: &CmsSignedContainer,
    entry: &SignerEntry,
    hash_index: &[u8],
) -> Result<Vec<u8>> {
    let content = container
        .content
        .as_deref()
        .ok_or(Error::MissingSignedContent)?;

    let content_type = asn1::encode_oid(&container.content_type)?;
    let content_digest = alg.digest(content);
    let sid = entry.sid.to_der()?;
    let signature = asn1::encode_octet_string(&entry.signature)?;
    let signed_attributes = entry.signed_attributes.as_deref().unwrap_or_default();

    Ok(alg.digest_parts([
        content_type.as_slice(),
        content_digest.as_slice(),
        entry.version.as_slice(),
        sid.as_slice(),
        entry.digest_algorithm_der.as_slice(),
        signed_attributes,
        entry.signature_algorithm_der.as_slice(),
        signature.as_slice(),
        hash_index,
    ]))
}

fn certificate_digests(alg: DigestAlgorithm, container: &CmsSignedContainer) -> Vec<Vec<u8>> {
    container.certificates.iter().map(|c| alg.digest(c)).collect()
}

fn revocation_digests(alg: DigestAlgorithm, revocations: &[RevocationInfoChoice]) -> Vec<Vec<u8>> {
    revocations.iter().map(|r| alg.digest(&r.encoded)).collect()
}

fn attribute_digests(
    alg: DigestAlgorithm,
    version: AtsHashIndexVersion,
    entry: &SignerEntry,
) -> std::result::Result<Vec<Vec<u8>>, Asn1Error> {
    let mut digests = Vec::new();

    for attr in &entry.unsigned_attributes {
        match version {
            AtsHashIndexVersion::V3 => {
                let attr_type = attr.type_der()?;
                for value in &attr.values {
                    digests.push(alg.digest_parts([attr_type.as_slice(), value.as_slice()]));
                }
            }
            AtsHashIndexVersion::V2 => digests.push(alg.digest(&attr.to_der()?)),
            AtsHashIndexVersion::Legacy => {
                if attr.attr_type == oids::CERTIFICATE_VALUES_OID
                    || attr.attr_type == oids::REVOCATION_VALUES_OID
                {
                    continue;
                }
                digests.push(alg.digest(&attr.to_der()?));
            }
        }
    }

    Ok(digests)
}

/// Removes from `declared` one occurrence of every digest in `current` and
/// returns what is left.
fn consume<I>(declared: &[Vec<u8>], current: I) -> Vec<Vec<u8>>
where
    I: IntoIterator<Item = Vec<u8>>,
{
    let mut remaining = declared.to_vec();
    for digest in current {
        if let Some(pos) = remaining.iter().position(|d| *d == digest) {
            remaining.remove(pos);
        }
    }
    remaining
}

fn lax_match(alg: DigestAlgorithm, known: &ValidationDataSet, status: &mut ArchiveHashIndexStatus) -> usize {
    let before = status.unmatched_certificates.len() + status.unmatched_revocations.len();

    status.unmatched_certificates = consume(
        &status.unmatched_certificates,
        known.certificates().iter().map(|c| alg.digest(c)),
    );

    let mut revocations: Vec<Vec<u8>> = Vec::new();
    for crl in known.crls() {
        revocations.push(alg.digest(crl));
    }
    for ocsp in known.ocsp_responses() {
        revocations.push(alg.digest(ocsp));
        if let Ok(choice) = RevocationInfoChoice::from_ocsp_response(ocsp) {
            revocations.push(alg.digest(&choice.encoded));
        }
    }
    status.unmatched_revocations = consume(&status.unmatched_revocations, revocations);

    before - status.unmatched_certificates.len() - status.unmatched_revocations.len()
}

fn record(log: &mut StatusTracker, label: &str, status: &ArchiveHashIndexStatus) {
    if status.valid {
        log_item!(label.to_string(), "hash index matches", "ArchiveHashIndexBuilder::verify")
            .validation_status(validation_codes::ATS_HASH_INDEX_VALID)
            .success(log);
    } else {
        warn!("hash index mismatch for {label}");
        log_item!(label.to_string(), "hash index does not match", "ArchiveHashIndexBuilder::verify")
            .validation_status(validation_codes::ATS_HASH_INDEX_MISMATCH)
            .failure_no_throw(
                log,
                format!(
                    "{} certificate, {} revocation and {} attribute digests unmatched",
                    status.unmatched_certificates.len(),
                    status.unmatched_revocations.len(),
                    status.unmatched_attributes.len()
                ),
            );
    }

    if status.lax_matches > 0 {
        log_item!(
            label.to_string(),
            format!("{} digests matched outside the container", status.lax_matches),
            "ArchiveHashIndexBuilder::verify"
        )
        .validation_status(validation_codes::ATS_HASH_INDEX_LAX_MATCH)
        .informational(log);
    }

    if status.message_imprint_matches {
        log_item!(label.to_string(), "message imprint matches", "ArchiveHashIndexBuilder::verify")
            .validation_status(validation_codes::ATS_MESSAGE_IMPRINT_MATCH)
            .success(log);
    } else {
        log_item!(
            label.to_string(),
            "message imprint does not match",
            "ArchiveHashIndexBuilder::verify"
        )
        .validation_status(validation_codes::ATS_MESSAGE_IMPRINT_MISMATCH)
        .failure_no_throw(log, status.errors.join("; "));
    }
}

fn record_malformed(log: &mut StatusTracker, label: &str, status: &ArchiveHashIndexStatus) {
    warn!("malformed hash index for {label}");
    log_item!(label.to_string(), "hash index is malformed", "ArchiveHashIndexBuilder::verify")
        .validation_status(validation_codes::ATS_HASH_INDEX_MALFORMED)
        .failure_no_throw(log, status.errors.join("; "));
}
