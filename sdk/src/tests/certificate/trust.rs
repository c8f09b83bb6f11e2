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
    certificate::{CertificateEntityPool, CertificateTrustPolicy, TrustPredicate},
    hash::sha256,
    tests::support::*,
};

#[test]
fn trust_anchors_from_pem() {
    let mut policy = CertificateTrustPolicy::new();
    policy.add_trust_anchors(TRUST_ANCHORS.as_bytes()).unwrap();

    assert_eq!(policy.trust_anchor_ders().count(), 1);
    assert!(policy.is_trust_anchor(&cert(ROOT_A)));
    assert!(!policy.is_trust_anchor(&cert(CA_A)));
    assert!(!policy.is_trusted(&cert(LEAF_A)));
}

#[test]
fn end_entity_by_hash() {
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    let mut policy = CertificateTrustPolicy::new();
    let allowed = format!("# accepted signers\n{}\n", STANDARD.encode(sha256(LEAF_B)));
    policy.add_end_entity_credentials(allowed.as_bytes()).unwrap();

    assert!(policy.is_trusted(&cert(LEAF_B)));
    assert!(!policy.is_trust_anchor(&cert(LEAF_B)));
    assert!(!policy.is_trusted(&cert(LEAF_A)));
}

#[test]
fn clear_removes_everything() {
    let mut policy = CertificateTrustPolicy::new();
    policy.add_trust_anchor_der(ROOT_B).unwrap();
    assert!(policy.is_trust_anchor(&cert(ROOT_B)));

    policy.clear();
    assert!(!policy.is_trust_anchor(&cert(ROOT_B)));
    assert_eq!(policy.trust_anchor_ders().count(), 0);
}

#[test]
fn bad_pem() {
    let mut policy = CertificateTrustPolicy::new();
    let bad = "-----BEGIN CERTIFICATE-----\nnot base64 at all!\n-----END CERTIFICATE-----\n";

    assert!(policy.add_trust_anchors(bad.as_bytes()).is_err());
    assert!(policy.add_trust_anchor_der(b"junk").is_err());
}

#[test]
fn pool_consults_the_policy() {
    let mut policy = CertificateTrustPolicy::new();
    policy.add_trust_anchor_der(ROOT_B).unwrap();
    let pool = CertificateEntityPool::new(std::sync::Arc::new(policy));

    assert!(pool.is_trust_anchor(&cert(ROOT_B)));
    assert!(!pool.is_trust_anchor(&cert(ROOT_A)));
}
