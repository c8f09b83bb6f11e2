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

use std::{sync::Arc, thread};

use crate::{
    certificate::{CertificateEntityPool, CertificateTrustPolicy},
    tests::support::*,
};

fn trusted_pool() -> CertificateEntityPool {
    let mut policy = CertificateTrustPolicy::new();
    policy.add_trust_anchors(TRUST_ANCHORS.as_bytes()).unwrap();
    CertificateEntityPool::new(Arc::new(policy))
}

#[test]
fn groups_by_public_key() {
    let pool = CertificateEntityPool::default();

    let a = pool.add(cert(LEAF_A));
    let reissued = pool.add(cert(LEAF_A_REISSUED));
    let expired = pool.add(cert(LEAF_A_EXPIRED));
    let b = pool.add(cert(LEAF_B));

    assert_eq!(a, reissued);
    assert_eq!(a, expired);
    assert_ne!(a, b);

    let group = pool.group(a).unwrap();
    assert_eq!(group.tokens().len(), 3);
    assert_eq!(group.key_id(), cert(LEAF_A).key_id());
    assert_eq!(pool.by_public_key(cert(LEAF_A).public_key()).len(), 3);
}

#[test]
fn adding_twice_is_a_no_op() {
    let pool = CertificateEntityPool::default();

    let first = pool.add_der(CA_A).unwrap();
    let second = pool.add_der(CA_A).unwrap();

    assert_eq!(first, second);
    assert_eq!(pool.snapshot().len(), 1);
    assert!(pool.add_der(b"junk").is_err());
}

#[test]
fn snapshots_are_stable() {
    let pool = CertificateEntityPool::default();
    pool.add(cert(ROOT_A));

    let before = pool.snapshot();
    pool.add(cert(CA_A));

    assert_eq!(before.len(), 1);
    assert_eq!(pool.snapshot().len(), 2);
    assert!(before.group_of(&cert(CA_A)).is_none());
}

#[test]
fn concurrent_additions() {
    let pool = CertificateEntityPool::default();
    let fixtures: [&[u8]; 6] = [ROOT_A, CA_A, LEAF_A, LEAF_A_REISSUED, ROOT_B, LEAF_B];

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for der in fixtures {
                    pool.add_der(der).unwrap();
                }
            });
        }
    });

    let snapshot = pool.snapshot();
    assert_eq!(snapshot.len(), 6);
    assert_eq!(
        snapshot.group_of(&cert(LEAF_A)),
        snapshot.group_of(&cert(LEAF_A_REISSUED))
    );
}

#[test]
fn trust_is_shared_by_the_key_group() {
    let pool = trusted_pool();

    assert!(pool.is_trust_anchor(&cert(ROOT_A)));
    assert!(pool.is_trusted(&cert(ROOT_A)));
    assert!(!pool.is_trusted(&cert(CA_A)));
    assert!(!pool.is_trusted(&cert(ROOT_B)));

    assert!(!CertificateEntityPool::untrusted().is_trusted(&cert(ROOT_A)));
}
