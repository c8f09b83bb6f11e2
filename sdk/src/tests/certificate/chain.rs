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
    certificate::{CertificateChainAssembler, CertificateEntityPool, CertificateToken, ChainError},
    tests::support::*,
};

fn tokens(ders: &[&[u8]]) -> Vec<CertificateToken> {
    ders.iter().map(|der| cert(der)).collect()
}

fn subjects(chain: &crate::certificate::CertificateChain) -> Vec<Vec<u8>> {
    chain.tokens().iter().map(|t| t.encoded().to_vec()).collect()
}

#[test]
fn orders_leaf_to_root() {
    let pool = CertificateEntityPool::default();
    let chain = CertificateChainAssembler::new(&pool)
        .assemble(&tokens(&[ROOT_A, LEAF_A, CA_A]), None)
        .unwrap();

    assert_eq!(subjects(&chain), vec![LEAF_A.to_vec(), CA_A.to_vec(), ROOT_A.to_vec()]);
    assert!(chain.is_complete());
    assert_eq!(chain.issuer_of(&cert(LEAF_A)).unwrap().encoded(), CA_A);
    assert!(chain.issuer_of(&cert(ROOT_A)).is_none());

    // the pool learned every certificate
    assert_eq!(pool.snapshot().len(), 3);
}

#[test]
fn input_order_does_not_matter() {
    let pool = CertificateEntityPool::default();
    let assembler = CertificateChainAssembler::new(&pool);

    let orders: [&[&[u8]]; 3] = [
        &[LEAF_A, CA_A, ROOT_A],
        &[ROOT_A, CA_A, LEAF_A],
        &[CA_A, ROOT_A, LEAF_A],
    ];

    let chains: Vec<_> = orders
        .iter()
        .map(|order| subjects(&assembler.assemble(&tokens(order), None).unwrap()))
        .collect();

    assert!(chains.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn incomplete_chain() {
    let pool = CertificateEntityPool::default();
    let chain = CertificateChainAssembler::new(&pool)
        .assemble(&tokens(&[LEAF_A, CA_A]), None)
        .unwrap();

    assert_eq!(chain.len(), 2);
    assert!(!chain.is_complete());
}

#[test]
fn single_certificate() {
    let pool = CertificateEntityPool::default();
    let chain = CertificateChainAssembler::new(&pool)
        .assemble(&tokens(&[LEAF_B]), None)
        .unwrap();

    assert_eq!(chain.len(), 1);
    assert_eq!(chain.leaf().unwrap().encoded(), LEAF_B);
}

#[test]
fn empty_input() {
    let pool = CertificateEntityPool::default();
    assert_eq!(
        CertificateChainAssembler::new(&pool).assemble(&[], None).unwrap_err(),
        ChainError::Empty
    );
}

#[test]
fn two_leaves_are_ambiguous() {
    let pool = CertificateEntityPool::default();
    let assembler = CertificateChainAssembler::new(&pool);
    let set = tokens(&[LEAF_A, CA_A, ROOT_A, LEAF_B, ROOT_B]);

    match assembler.assemble(&set, None) {
        Err(ChainError::AmbiguousChain { leaves }) => assert_eq!(leaves.len(), 2),
        other => panic!("unexpected result: {other:?}"),
    }

    let chain = assembler.assemble(&set, Some(&cert(LEAF_B))).unwrap();
    assert_eq!(subjects(&chain), vec![LEAF_B.to_vec(), ROOT_B.to_vec()]);

    let chains = assembler.assemble_all(&set).unwrap();
    assert_eq!(chains.len(), 2);
    assert_eq!(chains[0].leaf().unwrap().encoded(), LEAF_A);
    assert_eq!(chains[1].leaf().unwrap().encoded(), LEAF_B);
}

#[test]
fn reissued_leaf_is_not_ambiguous() {
    let pool = CertificateEntityPool::default();
    let assembler = CertificateChainAssembler::new(&pool);
    let set = tokens(&[LEAF_A, LEAF_A_REISSUED, CA_A, ROOT_A]);

    let chain = assembler.assemble(&set, None).unwrap();
    assert_eq!(chain.len(), 3);
    assert_eq!(chain.leaf().unwrap().encoded(), LEAF_A);

    // the hint picks the representative of the leaf group
    let chain = assembler.assemble(&set, Some(&cert(LEAF_A_REISSUED))).unwrap();
    assert_eq!(chain.leaf().unwrap().encoded(), LEAF_A_REISSUED);
    assert_eq!(chain.root().unwrap().encoded(), ROOT_A);
}

#[test]
fn cross_signed_bridges_have_no_leaf() {
    let pool = CertificateEntityPool::default();
    assert_eq!(
        CertificateChainAssembler::new(&pool)
            .assemble(&tokens(&[BRIDGE_1, BRIDGE_2]), None)
            .unwrap_err(),
        ChainError::NoLeaf
    );
}

#[test]
fn duplicates_are_ignored() {
    let pool = CertificateEntityPool::default();
    let chain = CertificateChainAssembler::new(&pool)
        .assemble(&tokens(&[LEAF_A, CA_A, LEAF_A, CA_A, ROOT_A]), None)
        .unwrap();

    assert_eq!(chain.len(), 3);
}
