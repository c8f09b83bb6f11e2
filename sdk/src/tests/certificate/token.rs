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

use crate::{
    certificate::{CertificateError, CertificateToken},
    container::{IssuerSerial, SignerIdentifier},
    hash::{sha256, DigestAlgorithm},
    tests::support::*,
};

#[test]
fn parses_fixture_fields() {
    let leaf = cert(LEAF_A);

    assert_eq!(leaf.encoded(), LEAF_A);
    assert!(leaf.subject_name().contains("Signer A"));
    assert_eq!(leaf.issuer(), cert(CA_A).subject());
    assert_eq!(leaf.serial(), &[3]);
    assert!(leaf.is_valid_at(SIGNING_TIME));
    assert!(!leaf.is_valid_at(0));
    assert_eq!(leaf.digest(DigestAlgorithm::Sha256), sha256(LEAF_A));
}

#[test]
fn rejects_garbage_and_trailing_data() {
    assert!(matches!(
        CertificateToken::from_der(b"not a certificate"),
        Err(CertificateError::Malformed(_))
    ));

    let mut padded = LEAF_A.to_vec();
    padded.extend_from_slice(&[0, 0]);
    assert_eq!(
        CertificateToken::from_der(&padded).unwrap_err(),
        CertificateError::TrailingData(2)
    );
}

#[test]
fn identity_is_structural() {
    assert_eq!(cert(LEAF_A), cert(LEAF_A));
    assert_ne!(cert(LEAF_A), cert(LEAF_A_REISSUED));

    // same key, different encodings
    assert_eq!(cert(LEAF_A).key_id(), cert(LEAF_A_REISSUED).key_id());
    assert_ne!(cert(LEAF_A).id(), cert(LEAF_A_REISSUED).id());
    assert_ne!(cert(LEAF_A).key_id(), cert(LEAF_B).key_id());
}

#[test]
fn issuer_relations() {
    let root = cert(ROOT_A);
    let ca = cert(CA_A);
    let leaf = cert(LEAF_A);

    assert!(root.is_self_signed());
    assert!(!ca.is_self_signed());

    assert!(leaf.names_issuer(&ca));
    assert!(leaf.is_signed_by(&ca).is_ok());
    assert!(ca.is_signed_by(&root).is_ok());
    assert!(leaf.is_signed_by(&root).is_err());
    assert!(cert(LEAF_B).is_signed_by(&cert(ROOT_B)).is_ok());
}

#[test]
fn bridges_are_not_self_signed() {
    let bridge_1 = cert(BRIDGE_1);
    let bridge_2 = cert(BRIDGE_2);

    assert!(!bridge_1.is_self_signed());
    assert!(bridge_1.is_signed_by(&bridge_2).is_ok());
    assert!(bridge_2.is_signed_by(&bridge_1).is_ok());
}

#[test]
fn signer_identifier_matching() {
    let leaf = cert(LEAF_A);

    assert!(leaf.matches_signer_identifier(&SignerIdentifier::IssuerAndSerialNumber(
        leaf.issuer_serial()
    )));
    assert!(!cert(LEAF_A_REISSUED).matches_signer_identifier(
        &SignerIdentifier::IssuerAndSerialNumber(leaf.issuer_serial())
    ));

    // leading zero octets of the serial number are not significant
    let padded = IssuerSerial {
        issuer: leaf.issuer().to_vec(),
        serial: vec![0, 3],
    };
    assert!(leaf.matches_issuer_serial(&padded));

    match leaf.subject_key_identifier() {
        Some(ski) => assert!(leaf.matches_signer_identifier(
            &SignerIdentifier::SubjectKeyIdentifier(ski.to_vec())
        )),
        None => assert!(!leaf.matches_signer_identifier(
            &SignerIdentifier::SubjectKeyIdentifier(vec![1, 2, 3])
        )),
    }
}
