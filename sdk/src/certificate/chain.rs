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

use std::{collections::HashSet, sync::Arc};

use log::debug;
use thiserror::Error;

use super::{CertificateEntityPool, CertificateToken, GroupId};

/// Describes why a certificate chain could not be assembled.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum ChainError {
    /// No certificate was supplied.
    #[error("no certificates to build a chain from")]
    Empty,

    /// Every certificate issues another one (for example a set of bridge
    /// certificates cross-signing each other), so there is no leaf.
    #[error("no leaf certificate: every certificate issues another one")]
    NoLeaf,

    /// More than one leaf exists and none of them was designated.
    #[error("ambiguous certificate chain: {} candidate leaves ({})", leaves.len(), leaves.join("; "))]
    AmbiguousChain {
        /// Subject names of the candidate leaves
        leaves: Vec<String>,
    },
}

/// An ordered chain of certificates, leaf first.
///
/// Each element is signed by the public key of the element that follows
/// it. A chain never repeats a public key.
#[derive(Clone, Debug)]
pub struct CertificateChain {
    tokens: Vec<Arc<CertificateToken>>,
}

impl CertificateChain {
    /// The end-entity certificate.
    pub fn leaf(&self) -> Option<&Arc<CertificateToken>> {
        self.tokens.first()
    }

    /// The last certificate of the chain.
    pub fn root(&self) -> Option<&Arc<CertificateToken>> {
        self.tokens.last()
    }

    /// The certificates, leaf first.
    pub fn tokens(&self) -> &[Arc<CertificateToken>] {
        &self.tokens
    }

    /// Number of certificates.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns the certificate following `token` in the chain, which is its
    /// issuer.
    pub fn issuer_of(&self, token: &CertificateToken) -> Option<&Arc<CertificateToken>> {
        let pos = self.tokens.iter().position(|t| t.id() == token.id())?;
        self.tokens.get(pos + 1)
    }

    /// Returns true if the chain ends with a self-signed certificate.
    pub fn is_complete(&self) -> bool {
        self.root().is_some_and(|root| root.is_self_signed())
    }
}

/// Orders an unordered set of certificates into leaf-to-root chains.
///
/// Tokens are added to the pool while assembling, so issuer relations are
/// decided per public-key group: a re-issued certificate for the same key
/// never counts as a separate leaf or as its own issuer.
pub struct CertificateChainAssembler<'a> {
    pool: &'a CertificateEntityPool,
}

impl<'a> CertificateChainAssembler<'a> {
    /// Creates an assembler working on `pool`.
    pub fn new(pool: &'a CertificateEntityPool) -> Self {
        Self { pool }
    }

    /// Assembles the chain of the single leaf found in `tokens`.
    ///
    /// When several leaves exist, `hint` picks one of them (compared by
    /// public key); without a matching hint the set is reported as
    /// ambiguous.
    pub fn assemble(
        &self,
        tokens: &[CertificateToken],
        hint: Option<&CertificateToken>,
    ) -> Result<CertificateChain, ChainError> {
        let graph = IssuerGraph::build(self.pool, tokens)?;

        if graph.tokens.len() == 1 {
            return Ok(CertificateChain {
                tokens: graph.tokens,
            });
        }

        let leaf_groups = graph.leaf_groups();

        let leaf_group = match leaf_groups.as_slice() {
            [] => return Err(ChainError::NoLeaf),
            [only] => *only,
            many => {
                let hinted = hint.and_then(|hint| {
                    many.iter()
                        .copied()
                        .find(|g| graph.group_has_key(*g, hint))
                });

                match hinted {
                    Some(g) => g,
                    None => {
                        return Err(ChainError::AmbiguousChain {
                            leaves: many
                                .iter()
                                .filter_map(|g| graph.representative(*g, None))
                                .map(|i| graph.tokens[i].subject_name().to_string())
                                .collect(),
                        })
                    }
                }
            }
        };

        let leaf = graph
            .representative(leaf_group, hint)
            .ok_or(ChainError::NoLeaf)?;

        Ok(graph.walk(leaf))
    }

    /// Assembles one chain per leaf found in `tokens`, in encounter order of
    /// the leaves.
    pub fn assemble_all(&self, tokens: &[CertificateToken]) -> Result<Vec<CertificateChain>, ChainError> {
        let graph = IssuerGraph::build(self.pool, tokens)?;

        if graph.tokens.len() == 1 {
            return Ok(vec![CertificateChain {
                tokens: graph.tokens,
            }]);
        }

        let leaf_groups = graph.leaf_groups();
        if leaf_groups.is_empty() {
            return Err(ChainError::NoLeaf);
        }

        Ok(leaf_groups
            .into_iter()
            .filter_map(|g| graph.representative(g, None))
            .map(|leaf| graph.walk(leaf))
            .collect())
    }
}

struct IssuerGraph {
    tokens: Vec<Arc<CertificateToken>>,
    groups: Vec<GroupId>,
    issuer: Vec<Option<usize>>,
}

impl IssuerGraph {
    fn build(pool: &CertificateEntityPool, input: &[CertificateToken]) -> Result<Self, ChainError> {
        let mut seen = HashSet::new();
        let mut tokens = Vec::new();
        let mut groups = Vec::new();

        for token in input {
            if seen.insert(token.id()) {
                groups.push(pool.add(token.clone()));
                tokens.push(Arc::new(token.clone()));
            }
        }

        if tokens.is_empty() {
            return Err(ChainError::Empty);
        }

        let mut graph = Self {
            tokens,
            groups,
            issuer: Vec::new(),
        };

        graph.issuer = (0..graph.tokens.len())
            .map(|i| graph.find_issuer(i))
            .collect();

        Ok(graph)
    }

    fn find_issuer(&self, i: usize) -> Option<usize> {
        let subject = &self.tokens[i];

        let others = || {
            (0..self.tokens.len()).filter(move |j| self.groups[*j] != self.groups[i])
        };

        // try issuers with a matching name first
        let by_name = others().filter(|j| subject.names_issuer(&self.tokens[*j]));
        let rest = others().filter(|j| !subject.names_issuer(&self.tokens[*j]));

        let found = by_name
            .chain(rest)
            .find(|j| subject.is_signed_by(&self.tokens[*j]).is_ok());

        if found.is_none() {
            debug!("no issuer found for {}", subject.subject_name());
        }
        found
    }

    /// Groups whose key signs no certificate of another group, in encounter
    /// order.
    fn leaf_groups(&self) -> Vec<GroupId> {
        let issuing: HashSet<GroupId> = self
            .issuer
            .iter()
            .flatten()
            .map(|j| self.groups[*j])
            .collect();

        let mut seen = HashSet::new();
        self.groups
            .iter()
            .copied()
            .filter(|g| !issuing.contains(g) && seen.insert(*g))
            .collect()
    }

    fn group_has_key(&self, group: GroupId, token: &CertificateToken) -> bool {
        self.tokens
            .iter()
            .zip(self.groups.iter())
            .any(|(t, g)| *g == group && t.key_id() == token.key_id())
    }

    /// Index of the certificate standing for `group`: the hint itself when
    /// it is part of the set, else the first certificate of the group.
    fn representative(&self, group: GroupId, hint: Option<&CertificateToken>) -> Option<usize> {
        let members = || (0..self.tokens.len()).filter(move |i| self.groups[*i] == group);

        hint.and_then(|hint| members().find(|i| self.tokens[*i].id() == hint.id()))
            .or_else(|| members().next())
    }

    fn walk(&self, leaf: usize) -> CertificateChain {
        let mut visited = HashSet::new();
        visited.insert(self.groups[leaf]);

        let mut chain = vec![self.tokens[leaf].clone()];
        let mut current = leaf;

        while !self.tokens[current].is_self_signed() {
            let Some(next) = self.issuer[current] else {
                break;
            };
            if !visited.insert(self.groups[next]) {
                break;
            }
            chain.push(self.tokens[next].clone());
            current = next;
        }

        CertificateChain { tokens: chain }
    }
}
