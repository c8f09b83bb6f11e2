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

//! Fixtures and hand-written collaborators shared by the unit tests.

use std::{cell::Cell, collections::HashMap};

use asn1_rs::{Class, Tag};

use crate::{
    asn1::{self, oids},
    certificate::CertificateToken,
    codec::{CmsCodec, CodecError, TimeStampToken},
    container::{CertificateReference, CmsSignedContainer, SignerEntry, SignerIdentifier},
    hash::{sha256, DigestAlgorithm},
    sources::{RevocationSource, RevocationToken},
    time_stamp::{TimeStampError, TimeStampProvider},
};

pub(crate) const ROOT_A: &[u8] = include_bytes!("fixtures/certs/root_a.der");
pub(crate) const CA_A: &[u8] = include_bytes!("fixtures/certs/ca_a.der");
pub(crate) const LEAF_A: &[u8] = include_bytes!("fixtures/certs/leaf_a.der");
pub(crate) const LEAF_A_REISSUED: &[u8] = include_bytes!("fixtures/certs/leaf_a_reissued.der");
pub(crate) const LEAF_A_EXPIRED: &[u8] = include_bytes!("fixtures/certs/leaf_a_expired.der");
pub(crate) const TSA: &[u8] = include_bytes!("fixtures/certs/tsa.der");
pub(crate) const ROOT_B: &[u8] = include_bytes!("fixtures/certs/root_b.der");
pub(crate) const LEAF_B: &[u8] = include_bytes!("fixtures/certs/leaf_b.der");
pub(crate) const BRIDGE_1: &[u8] = include_bytes!("fixtures/certs/bridge_1.der");
pub(crate) const BRIDGE_2: &[u8] = include_bytes!("fixtures/certs/bridge_2.der");
pub(crate) const TRUST_ANCHORS: &str = include_str!("fixtures/certs/trust_anchors.pem");

pub(crate) const CONTENT: &[u8] = include_bytes!("fixtures/signer/content.bin");
pub(crate) const LEAF_A_SIGNED_ATTRS: &[u8] = include_bytes!("fixtures/signer/leaf_a.signed_attrs");
pub(crate) const LEAF_A_SIG: &[u8] = include_bytes!("fixtures/signer/leaf_a.sig");
pub(crate) const LEAF_B_SIGNED_ATTRS: &[u8] = include_bytes!("fixtures/signer/leaf_b.signed_attrs");
pub(crate) const LEAF_B_SIG: &[u8] = include_bytes!("fixtures/signer/leaf_b.sig");

/// `signing-time` of the fixture signatures (2026-06-01T12:00:00Z).
pub(crate) const SIGNING_TIME: i64 = 1_780_315_200;

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn cert(der: &[u8]) -> CertificateToken {
    CertificateToken::from_der(der).unwrap()
}

fn ed25519_algorithm() -> Vec<u8> {
    asn1::encode_sequence(&[asn1::encode_oid(&oids::ED25519_OID).unwrap()]).unwrap()
}

/// A signer entry over [`CONTENT`] whose signing certificate reference
/// designates `certificate`.
pub(crate) fn signer_entry(certificate: &[u8], signed_attrs: &[u8], signature: &[u8]) -> SignerEntry {
    let token = cert(certificate);

    SignerEntry {
        version: asn1::encode_unsigned(1).unwrap(),
        sid: SignerIdentifier::IssuerAndSerialNumber(token.issuer_serial()),
        digest_algorithm: DigestAlgorithm::Sha256,
        digest_algorithm_der: DigestAlgorithm::Sha256.algorithm_identifier_der().unwrap(),
        signed_attributes: Some(signed_attrs.to_vec()),
        signature_algorithm_der: ed25519_algorithm(),
        signature: signature.to_vec(),
        unsigned_attributes: Vec::new(),
        signing_time: Some(SIGNING_TIME),
        signing_certificate_references: vec![CertificateReference {
            digest_algorithm: DigestAlgorithm::Sha256,
            digest: sha256(certificate),
            issuer_serial: None,
        }],
        counter_signatures: Vec::new(),
    }
}

pub(crate) fn signer_a() -> SignerEntry {
    signer_entry(LEAF_A, LEAF_A_SIGNED_ATTRS, LEAF_A_SIG)
}

pub(crate) fn signer_b() -> SignerEntry {
    signer_entry(LEAF_B, LEAF_B_SIGNED_ATTRS, LEAF_B_SIG)
}

pub(crate) fn container(certificates: &[&[u8]], signers: Vec<SignerEntry>) -> CmsSignedContainer {
    CmsSignedContainer {
        content_type: oids::ID_DATA_OID,
        content: Some(CONTENT.to_vec()),
        digest_algorithms: vec![DigestAlgorithm::Sha256.algorithm_identifier_der().unwrap()],
        certificates: certificates.iter().map(|c| c.to_vec()).collect(),
        revocations: Vec::new(),
        signers,
    }
}

/// Encodes tokens as JSON instead of DER.
pub(crate) struct JsonCodec;

impl CmsCodec for JsonCodec {
    fn decode_time_stamp_token(&self, encoded: &[u8]) -> Result<TimeStampToken, CodecError> {
        serde_json::from_slice(encoded).map_err(|e| CodecError::Decoding(e.to_string()))
    }

    fn encode_time_stamp_token(&self, token: &TimeStampToken) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(token).map_err(|e| CodecError::Encoding(e.to_string()))
    }
}

/// Issues tokens signed (in name only) by the `tsa.der` certificate, one
/// second apart.
pub(crate) struct FakeTsa {
    next_gen_time: Cell<i64>,
    pub(crate) requests: Cell<usize>,
}

impl FakeTsa {
    pub(crate) fn new() -> Self {
        Self::starting_at(SIGNING_TIME + 60)
    }

    pub(crate) fn starting_at(gen_time: i64) -> Self {
        Self {
            next_gen_time: Cell::new(gen_time),
            requests: Cell::new(0),
        }
    }

    pub(crate) fn token(&self, algorithm: DigestAlgorithm, digest: &[u8]) -> TimeStampToken {
        let gen_time = self.next_gen_time.get();
        self.next_gen_time.set(gen_time + 1);

        let tst_info = format!("tst-info {gen_time} {}", hex::encode(digest)).into_bytes();

        let mut signer = signer_entry(TSA, &[], &sha256(&tst_info));
        signer.signed_attributes = None;
        signer.signing_time = None;
        signer.signing_certificate_references.clear();

        TimeStampToken {
            gen_time,
            message_imprint_algorithm: algorithm,
            message_imprint: digest.to_vec(),
            signed_data: CmsSignedContainer {
                content_type: oids::ID_CT_TST_INFO_OID,
                content: Some(tst_info),
                digest_algorithms: vec![algorithm.algorithm_identifier_der().unwrap()],
                certificates: vec![TSA.to_vec()],
                revocations: Vec::new(),
                signers: vec![signer],
            },
        }
    }
}

impl TimeStampProvider for FakeTsa {
    fn send_time_stamp_request(
        &self,
        algorithm: DigestAlgorithm,
        digest: &[u8],
    ) -> Option<Result<Vec<u8>, TimeStampError>> {
        self.requests.set(self.requests.get() + 1);
        Some(
            JsonCodec
                .encode_time_stamp_token(&self.token(algorithm, digest))
                .map_err(|e| TimeStampError::InternalError(e.to_string())),
        )
    }
}

/// A time stamp authority that cannot be reached.
pub(crate) struct UnreachableTsa;

impl TimeStampProvider for UnreachableTsa {
    fn send_time_stamp_request(
        &self,
        _: DigestAlgorithm,
        _: &[u8],
    ) -> Option<Result<Vec<u8>, TimeStampError>> {
        Some(Err(TimeStampError::HttpConnectionError(
            "connection refused".to_string(),
        )))
    }
}

/// Answers every revocation query with a CRL or an OCSP response naming the
/// certificate, except for certificates listed in `unavailable`.
#[derive(Default)]
pub(crate) struct FakeRevocationSource {
    pub(crate) ocsp: bool,
    pub(crate) unavailable: Vec<Vec<u8>>,
    pub(crate) responder_certificates: HashMap<Vec<u8>, Vec<Vec<u8>>>,
}

impl FakeRevocationSource {
    pub(crate) fn crls() -> Self {
        Self::default()
    }

    pub(crate) fn ocsp() -> Self {
        Self {
            ocsp: true,
            ..Default::default()
        }
    }
}

pub(crate) fn fake_crl(token: &CertificateToken) -> Vec<u8> {
    asn1::encode_sequence(&[token.issuer().to_vec(), asn1::encode_integer(token.serial()).unwrap()])
        .unwrap()
}

pub(crate) fn fake_basic_ocsp_response(token: &CertificateToken) -> Vec<u8> {
    asn1::encode_sequence(&[asn1::encode_integer(token.serial()).unwrap()]).unwrap()
}

pub(crate) fn fake_ocsp_response(token: &CertificateToken) -> Vec<u8> {
    let response_bytes = asn1::encode_sequence(&[
        asn1::encode_oid(&oids::ID_PKIX_OCSP_BASIC_OID).unwrap(),
        asn1::encode_octet_string(&fake_basic_ocsp_response(token)).unwrap(),
    ])
    .unwrap();

    asn1::encode_sequence(&[
        asn1::encode_tlv(Class::Universal, false, Tag::Enumerated, &[0]).unwrap(),
        asn1::encode_context(0, &[response_bytes]).unwrap(),
    ])
    .unwrap()
}

impl RevocationSource for FakeRevocationSource {
    fn revocation_status(
        &self,
        token: &CertificateToken,
        _issuer: &CertificateToken,
    ) -> Option<RevocationToken> {
        if self.unavailable.iter().any(|der| der == token.encoded()) {
            return None;
        }

        let revocation = if self.ocsp {
            RevocationToken::ocsp_response(fake_ocsp_response(token))
        } else {
            RevocationToken::crl(fake_crl(token))
        };

        Some(match self.responder_certificates.get(token.encoded()) {
            Some(certificates) => revocation.with_certificates(certificates.clone()),
            None => revocation,
        })
    }
}
