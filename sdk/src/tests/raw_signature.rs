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
    asn1::oids::*,
    raw_signature::{validator_for_sig_and_hash_algs, RawSignatureValidationError},
};

const SAMPLE_DATA: &[u8] = b"some sample content to sign";

#[test]
fn ed25519() {
    let signature = include_bytes!("fixtures/raw_signature/ed25519.raw_sig");
    let pub_key = include_bytes!("fixtures/raw_signature/ed25519.pub_key");

    let validator = validator_for_sig_and_hash_algs(&ED25519_OID, &SHA512_OID).unwrap();

    validator.validate(signature, SAMPLE_DATA, pub_key).unwrap();
}

#[test]
fn es256() {
    let signature = include_bytes!("fixtures/raw_signature/es256.raw_sig");
    let pub_key = include_bytes!("fixtures/raw_signature/es256.pub_key");

    let validator = validator_for_sig_and_hash_algs(&ECDSA_WITH_SHA256_OID, &SHA256_OID).unwrap();

    validator.validate(signature, SAMPLE_DATA, pub_key).unwrap();
}

#[test]
fn es384() {
    let signature = include_bytes!("fixtures/raw_signature/es384.raw_sig");
    let pub_key = include_bytes!("fixtures/raw_signature/es384.pub_key");

    let validator = validator_for_sig_and_hash_algs(&ECDSA_WITH_SHA384_OID, &SHA384_OID).unwrap();

    validator.validate(signature, SAMPLE_DATA, pub_key).unwrap();
}

#[test]
fn es256_from_key_type() {
    // CMS signer infos often name the key type and leave the hash to
    // the digest algorithm
    let signature = include_bytes!("fixtures/raw_signature/es256.raw_sig");
    let pub_key = include_bytes!("fixtures/raw_signature/es256.pub_key");

    let validator = validator_for_sig_and_hash_algs(&EC_PUBLICKEY_OID, &SHA256_OID).unwrap();

    validator.validate(signature, SAMPLE_DATA, pub_key).unwrap();
}

#[test]
fn rs256() {
    let signature = include_bytes!("fixtures/raw_signature/rs256.raw_sig");
    let pub_key = include_bytes!("fixtures/raw_signature/rs256.pub_key");

    let validator =
        validator_for_sig_and_hash_algs(&SHA256_WITH_RSAENCRYPTION_OID, &SHA256_OID).unwrap();

    validator.validate(signature, SAMPLE_DATA, pub_key).unwrap();
}

#[test]
fn rs256_from_key_type() {
    let signature = include_bytes!("fixtures/raw_signature/rs256.raw_sig");
    let pub_key = include_bytes!("fixtures/raw_signature/rs256.pub_key");

    let validator = validator_for_sig_and_hash_algs(&RSA_OID, &SHA256_OID).unwrap();

    validator.validate(signature, SAMPLE_DATA, pub_key).unwrap();
}

#[test]
fn bad_signature() {
    let mut signature = include_bytes!("fixtures/raw_signature/ed25519.raw_sig").to_vec();
    assert_ne!(signature[10], 10);
    signature[10] = 10;

    let pub_key = include_bytes!("fixtures/raw_signature/ed25519.pub_key");

    let validator = validator_for_sig_and_hash_algs(&ED25519_OID, &SHA512_OID).unwrap();

    assert_eq!(
        validator.validate(&signature, SAMPLE_DATA, pub_key).unwrap_err(),
        RawSignatureValidationError::SignatureMismatch
    );
}

#[test]
fn bad_data() {
    let signature = include_bytes!("fixtures/raw_signature/es256.raw_sig");
    let pub_key = include_bytes!("fixtures/raw_signature/es256.pub_key");

    let mut data = SAMPLE_DATA.to_vec();
    data[5] = 10;

    let validator = validator_for_sig_and_hash_algs(&ECDSA_WITH_SHA256_OID, &SHA256_OID).unwrap();

    assert_eq!(
        validator.validate(signature, &data, pub_key).unwrap_err(),
        RawSignatureValidationError::SignatureMismatch
    );
}

#[test]
fn wrong_key() {
    let signature = include_bytes!("fixtures/raw_signature/ed25519.raw_sig");
    let pub_key = include_bytes!("fixtures/raw_signature/es256.pub_key");

    let validator = validator_for_sig_and_hash_algs(&ED25519_OID, &SHA512_OID).unwrap();

    assert!(validator.validate(signature, SAMPLE_DATA, pub_key).is_err());
}

#[test]
fn unsupported_algorithm() {
    assert!(validator_for_sig_and_hash_algs(&SHA256_OID, &SHA256_OID).is_none());
}
