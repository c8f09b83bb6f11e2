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

use cades_status_tracker::{validation_codes, StatusTracker};

use crate::{
    asn1::{attributes, oids},
    codec::TimeStampToken,
    container::{Attribute, CmsSignedContainer, RevocationInfoChoice, SignerEntry},
    hash::DigestAlgorithm,
    hash_index::{hash_index_of, ArchiveHashIndexBuilder, AtsHashIndexVersion, HashIndexTable},
    tests::support::*,
    validation_data::ValidationDataSet,
    Error,
};

fn lt_container() -> CmsSignedContainer {
    let tsa = FakeTsa::new();
    let mut entry = signer_a();
    entry.unsigned_attributes.push(Attribute::new(
        oids::SIGNATURE_TIMESTAMP_OID,
        serde_json::to_vec(&tsa.token(DigestAlgorithm::Sha256, &[1; 32])).unwrap(),
    ));

    let mut container = container(&[LEAF_A, CA_A, TSA], vec![entry]);
    container.add_revocation(RevocationInfoChoice::from_crl(fake_crl(&cert(LEAF_A))));
    container
}

// what the extender does for LTA, without a container update
fn archive_token(builder: &ArchiveHashIndexBuilder, container: &CmsSignedContainer) -> TimeStampToken {
    let entry = &container.signers[0];
    let table = builder.build(container, entry).unwrap();
    let attribute = builder.attribute(&table).unwrap();
    let imprint = builder
        .message_imprint(container, entry, attribute.first_value().unwrap())
        .unwrap();

    let mut token = FakeTsa::new().token(builder.algorithm(), &imprint);
    token.signer_mut().unwrap().unsigned_attributes.push(attribute);
    token
}

fn verify(
    builder: &ArchiveHashIndexBuilder,
    container: &CmsSignedContainer,
    token: &TimeStampToken,
    known: Option<&ValidationDataSet>,
) -> (crate::hash_index::ArchiveHashIndexStatus, StatusTracker) {
    let mut log = StatusTracker::default();
    let status = builder.verify(container, &container.signers[0], token, known, &mut log);
    (status, log)
}

#[test]
fn table_covers_the_current_state() {
    let container = lt_container();
    let builder = ArchiveHashIndexBuilder::default();

    let table = builder.build(&container, &container.signers[0]).unwrap();

    assert_eq!(table.algorithm, DigestAlgorithm::Sha256);
    assert_eq!(table.certificate_digests.len(), 3);
    assert_eq!(table.certificate_digests[0], DigestAlgorithm::Sha256.digest(LEAF_A));
    assert_eq!(table.revocation_digests.len(), 1);
    assert_eq!(table.attribute_digests.len(), 1);

    let signature_time_stamp = &container.signers[0].unsigned_attributes[0];
    assert_eq!(
        table.attribute_digests[0],
        DigestAlgorithm::Sha256.digest_parts([
            signature_time_stamp.type_der().unwrap().as_slice(),
            signature_time_stamp.values[0].as_slice(),
        ])
    );

    let attribute = builder.attribute(&table).unwrap();
    assert_eq!(attribute.attr_type, oids::ATS_HASH_INDEX_V3_OID);
    assert_eq!(HashIndexTable::from_der(attribute.first_value().unwrap()).unwrap(), table);
}

#[test]
fn verifies_a_fresh_archive_time_stamp() {
    let container = lt_container();
    let builder = ArchiveHashIndexBuilder::new(DigestAlgorithm::Sha384, AtsHashIndexVersion::V3);
    let token = archive_token(&builder, &container);

    let (status, log) = verify(&builder, &container, &token, None);

    assert!(status.valid, "{:?}", status.errors);
    assert!(status.message_imprint_matches);
    assert_eq!(status.version, Some(AtsHashIndexVersion::V3));
    assert!(log.has_status(validation_codes::ATS_HASH_INDEX_VALID));
    assert!(log.has_status(validation_codes::ATS_MESSAGE_IMPRINT_MATCH));

    let (version, value) = hash_index_of(&token).unwrap();
    assert_eq!(version, AtsHashIndexVersion::V3);
    assert_eq!(HashIndexTable::from_der(value).unwrap().algorithm, DigestAlgorithm::Sha384);
}

#[test]
fn additions_after_the_time_stamp_are_allowed() {
    let mut container = lt_container();
    let builder = ArchiveHashIndexBuilder::default();
    let token = archive_token(&builder, &container);

    container.add_certificate(ROOT_A);
    container.add_revocation(RevocationInfoChoice::from_crl(fake_crl(&cert(CA_A))));
    container.signers[0]
        .unsigned_attributes
        .push(Attribute::new(oids::ARCHIVE_TIMESTAMP_V3_OID, b"later".to_vec()));

    let (status, _) = verify(&builder, &container, &token, None);
    assert!(status.valid);
    assert!(status.message_imprint_matches);
}

#[test]
fn removed_certificate_is_a_mismatch() {
    let mut container = lt_container();
    let builder = ArchiveHashIndexBuilder::default();
    let token = archive_token(&builder, &container);

    container.certificates.retain(|c| c.as_slice() != CA_A);

    let (status, log) = verify(&builder, &container, &token, None);

    assert!(!status.valid);
    assert_eq!(status.unmatched_certificates, vec![DigestAlgorithm::Sha256.digest(CA_A)]);
    assert!(status.unmatched_revocations.is_empty());
    // the imprint does not cover SignedData.certificates
    assert!(status.message_imprint_matches);
    assert!(log.has_status(validation_codes::ATS_HASH_INDEX_MISMATCH));
}

#[test]
fn duplicate_certificates_are_matched_one_by_one() {
    let mut container = lt_container();
    container.certificates.push(CA_A.to_vec());

    let builder = ArchiveHashIndexBuilder::default();
    let token = archive_token(&builder, &container);

    let pos = container.certificates.iter().rposition(|c| c.as_slice() == CA_A).unwrap();
    container.certificates.remove(pos);

    let (status, _) = verify(&builder, &container, &token, None);
    assert_eq!(status.unmatched_certificates.len(), 1);
}

#[test]
fn lax_matching_uses_known_validation_data() {
    let mut container = lt_container();
    let builder = ArchiveHashIndexBuilder::default().with_lax_matching(true);
    let token = archive_token(&builder, &container);

    let crl = fake_crl(&cert(LEAF_A));
    container.certificates.retain(|c| c.as_slice() != CA_A);
    container.revocations.clear();

    let mut known = ValidationDataSet::new();
    known.add_certificate(CA_A);
    known.add_crl(&crl);

    let (status, log) = verify(&builder, &container, &token, Some(&known));
    assert!(status.valid);
    assert_eq!(status.lax_matches, 2);
    assert!(log.has_status(validation_codes::ATS_HASH_INDEX_LAX_MATCH));

    // strict matching ignores what is only known
    let strict = ArchiveHashIndexBuilder::default();
    let (status, _) = verify(&strict, &container, &token, Some(&known));
    assert!(!status.valid);
    assert_eq!(status.lax_matches, 0);
}

#[test]
fn lax_matching_finds_wrapped_ocsp_responses() {
    let leaf = cert(LEAF_A);
    let ocsp = fake_ocsp_response(&leaf);

    let mut container = lt_container();
    container.add_revocation(RevocationInfoChoice::from_ocsp_response(&ocsp).unwrap());

    let builder = ArchiveHashIndexBuilder::default().with_lax_matching(true);
    let token = archive_token(&builder, &container);

    container
        .revocations
        .retain(|r| r.kind != crate::container::RevocationKind::OcspResponse);

    let mut known = ValidationDataSet::new();
    known.add_ocsp_response(&ocsp);

    let (status, _) = verify(&builder, &container, &token, Some(&known));
    assert!(status.valid);
    assert_eq!(status.lax_matches, 1);
}

fn entry_with_values() -> SignerEntry {
    let mut entry = signer_a();
    entry.unsigned_attributes.push(Attribute::new(oids::SIGNATURE_TIMESTAMP_OID, vec![0x30, 0x00]));
    entry.unsigned_attributes.push(Attribute::new(
        oids::CERTIFICATE_VALUES_OID,
        attributes::encode_certificate_values(&[CA_A]).unwrap(),
    ));
    entry.unsigned_attributes.push(Attribute::new(
        oids::REVOCATION_VALUES_OID,
        attributes::encode_revocation_values::<Vec<u8>>(&[fake_crl(&cert(CA_A))], &[]).unwrap(),
    ));
    entry.unsigned_attributes.push(Attribute {
        attr_type: oids::ARCHIVE_TIMESTAMP_V3_OID,
        values: vec![vec![0x30, 0x00], vec![0x30, 0x01, 0x00]],
    });
    entry
}

#[test]
fn attribute_digests_per_version() {
    let entry = entry_with_values();
    let container = container(&[LEAF_A], vec![entry.clone()]);

    let count = |version| {
        ArchiveHashIndexBuilder::new(DigestAlgorithm::Sha256, version)
            .build(&container, &entry)
            .unwrap()
            .attribute_digests
            .len()
    };

    // one per value
    assert_eq!(count(AtsHashIndexVersion::V3), 5);
    // one per attribute
    assert_eq!(count(AtsHashIndexVersion::V2), 4);
    // validation data values are not covered
    assert_eq!(count(AtsHashIndexVersion::Legacy), 2);

    let legacy = ArchiveHashIndexBuilder::new(DigestAlgorithm::Sha256, AtsHashIndexVersion::Legacy)
        .build(&container, &entry)
        .unwrap();
    assert_eq!(
        legacy.attribute_digests[0],
        DigestAlgorithm::Sha256.digest(&entry.unsigned_attributes[0].to_der().unwrap())
    );
}

#[test]
fn legacy_and_v2_verify() {
    for version in [AtsHashIndexVersion::Legacy, AtsHashIndexVersion::V2] {
        let container = container(&[LEAF_A], vec![entry_with_values()]);
        let builder = ArchiveHashIndexBuilder::new(DigestAlgorithm::Sha256, version);
        let token = archive_token(&builder, &container);

        let (status, _) = verify(&builder, &container, &token, None);
        assert!(status.valid, "{version:?}");
        assert_eq!(status.version, Some(version));
        assert!(status.message_imprint_matches);
    }
}

#[test]
fn imprint_mismatch() {
    let container = lt_container();
    let builder = ArchiveHashIndexBuilder::default();
    let mut token = archive_token(&builder, &container);
    token.message_imprint = vec![0; 32];

    let (status, log) = verify(&builder, &container, &token, None);

    assert!(status.valid);
    assert!(!status.message_imprint_matches);
    assert!(log.has_status(validation_codes::ATS_MESSAGE_IMPRINT_MISMATCH));
}

#[test]
fn imprint_covers_the_signature() {
    let container = lt_container();
    let builder = ArchiveHashIndexBuilder::default();
    let token = archive_token(&builder, &container);

    let mut altered = container.clone();
    altered.signers[0].signature[0] ^= 1;

    let (status, _) = verify(&builder, &altered, &token, None);
    assert!(!status.message_imprint_matches);
}

#[test]
fn imprint_depends_on_the_hash_index() {
    let container = lt_container();
    let entry = &container.signers[0];
    let builder = ArchiveHashIndexBuilder::default();

    let a = builder.message_imprint(&container, entry, &[0x30, 0x00]).unwrap();
    let b = builder.message_imprint(&container, entry, &[0x30, 0x00]).unwrap();
    let c = builder.message_imprint(&container, entry, &[0x30, 0x01, 0x00]).unwrap();

    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn missing_hash_index_is_malformed() {
    let container = lt_container();
    let builder = ArchiveHashIndexBuilder::default();
    let token = FakeTsa::new().token(DigestAlgorithm::Sha256, &[0; 32]);

    let (status, log) = verify(&builder, &container, &token, None);

    assert!(!status.valid);
    assert_eq!(status.version, None);
    assert!(log.has_status(validation_codes::ATS_HASH_INDEX_MALFORMED));
}

#[test]
fn unreadable_hash_index_is_malformed() {
    let container = lt_container();
    let builder = ArchiveHashIndexBuilder::default();
    let mut token = FakeTsa::new().token(DigestAlgorithm::Sha256, &[0; 32]);
    token
        .signer_mut()
        .unwrap()
        .unsigned_attributes
        .push(Attribute::new(oids::ATS_HASH_INDEX_V3_OID, vec![0x04, 0x00]));

    let (status, log) = verify(&builder, &container, &token, None);

    assert!(!status.valid);
    assert_eq!(status.version, Some(AtsHashIndexVersion::V3));
    assert!(log.has_status(validation_codes::ATS_HASH_INDEX_MALFORMED));
}

#[test]
fn detached_content_is_required() {
    let mut container = lt_container();
    container.content = None;

    let builder = ArchiveHashIndexBuilder::default();
    assert!(matches!(
        builder.build(&container, &container.signers[0]),
        Err(Error::MissingSignedContent)
    ));
    assert!(matches!(
        builder.message_imprint(&container, &container.signers[0], &[0x30, 0x00]),
        Err(Error::MissingSignedContent)
    ));
}

#[test]
fn lost_content_invalidates_the_status() {
    let mut container = lt_container();
    let builder = ArchiveHashIndexBuilder::default();
    let token = archive_token(&builder, &container);

    // every digest list still matches, only the imprint cannot be recomputed
    container.content = None;
    let (status, log) = verify(&builder, &container, &token, None);

    assert!(status.unmatched_certificates.is_empty());
    assert!(status.unmatched_revocations.is_empty());
    assert!(status.unmatched_attributes.is_empty());
    assert!(!status.errors.is_empty());
    assert!(!status.valid);
    assert!(!status.message_imprint_matches);
    assert!(log.has_status(validation_codes::ATS_HASH_INDEX_MISMATCH));
}
