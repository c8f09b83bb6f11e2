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

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use super::{CertificateError, CertificateToken, KeyId, TokenId};

/// A `TrustPredicate` decides whether a certificate is trusted without
/// further chain verification.
pub trait TrustPredicate: Send + Sync {
    /// Returns true if `token` is a configured trust anchor.
    fn is_trust_anchor(&self, token: &CertificateToken) -> bool;

    /// Returns true if `token` is trusted, either as a trust anchor or by
    /// some other rule (for example a privately accepted end-entity
    /// certificate).
    fn is_trusted(&self, token: &CertificateToken) -> bool {
        self.is_trust_anchor(token)
    }
}

/// Stable handle of a [`CertificateEquivalenceGroup`] inside one pool.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct GroupId(usize);

/// All certificates of a pool that share one public key.
#[derive(Clone, Debug)]
pub struct CertificateEquivalenceGroup {
    id: GroupId,
    key_id: KeyId,
    tokens: Vec<Arc<CertificateToken>>,
}

impl CertificateEquivalenceGroup {
    /// Handle of this group.
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Identifier of the shared public key.
    pub fn key_id(&self) -> KeyId {
        self.key_id
    }

    /// Member certificates, in the order they were added.
    pub fn tokens(&self) -> &[Arc<CertificateToken>] {
        &self.tokens
    }
}

/// Immutable view of a pool's content at one point in time.
#[derive(Clone, Debug, Default)]
pub struct PoolSnapshot {
    groups: Vec<CertificateEquivalenceGroup>,
    by_key: HashMap<KeyId, GroupId>,
    by_token: HashMap<TokenId, GroupId>,
}

impl PoolSnapshot {
    /// Returns the group with this handle.
    pub fn group(&self, id: GroupId) -> Option<&CertificateEquivalenceGroup> {
        self.groups.get(id.0)
    }

    /// Returns the group a certificate belongs to, if it was added.
    pub fn group_of(&self, token: &CertificateToken) -> Option<GroupId> {
        self.by_token.get(&token.id()).copied()
    }

    /// Returns every certificate with this DER `SubjectPublicKeyInfo`.
    pub fn by_public_key(&self, public_key: &[u8]) -> Vec<Arc<CertificateToken>> {
        let key_id = KeyId::of_public_key(public_key);
        self.by_key
            .get(&key_id)
            .and_then(|id| self.group(*id))
            .map(|group| group.tokens.clone())
            .unwrap_or_default()
    }

    /// Returns every certificate in the pool, group by group.
    pub fn tokens(&self) -> impl Iterator<Item = &Arc<CertificateToken>> {
        self.groups.iter().flat_map(|group| group.tokens.iter())
    }

    /// Number of distinct certificate encodings.
    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    /// Returns true if the pool holds no certificate.
    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }

    fn add(&mut self, token: CertificateToken) -> GroupId {
        if let Some(id) = self.by_token.get(&token.id()) {
            return *id;
        }

        let key_id = token.key_id();
        let token_id = token.id();

        let id = match self.by_key.get(&key_id) {
            Some(id) => *id,
            None => {
                let id = GroupId(self.groups.len());
                self.groups.push(CertificateEquivalenceGroup {
                    id,
                    key_id,
                    tokens: Vec::new(),
                });
                self.by_key.insert(key_id, id);
                id
            }
        };

        if let Some(group) = self.groups.get_mut(id.0) {
            group.tokens.push(Arc::new(token));
        }
        self.by_token.insert(token_id, id);
        id
    }
}

/// Deduplicates certificates by public key and answers trust questions.
///
/// Additions are serialized internally, so one pool can be filled from
/// several threads. Readers take a [`PoolSnapshot`] and work on it without
/// holding any lock.
pub struct CertificateEntityPool {
    state: RwLock<Arc<PoolSnapshot>>,
    trust: Option<Arc<dyn TrustPredicate>>,
}

impl CertificateEntityPool {
    /// Creates an empty pool that evaluates trust with `trust`.
    pub fn new(trust: Arc<dyn TrustPredicate>) -> Self {
        Self {
            state: RwLock::new(Arc::new(PoolSnapshot::default())),
            trust: Some(trust),
        }
    }

    /// Creates an empty pool that trusts nothing.
    pub fn untrusted() -> Self {
        Self {
            state: RwLock::new(Arc::new(PoolSnapshot::default())),
            trust: None,
        }
    }

    /// Adds a certificate and returns its group.
    ///
    /// Certificates with byte-identical public keys always land in the same
    /// group. Adding an encoding that is already present is a no-op.
    pub fn add(&self, token: CertificateToken) -> GroupId {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut state).add(token)
    }

    /// Parses and adds a DER certificate.
    pub fn add_der(&self, der: &[u8]) -> Result<GroupId, CertificateError> {
        Ok(self.add(CertificateToken::from_der(der)?))
    }

    /// Returns the current content of the pool.
    pub fn snapshot(&self) -> Arc<PoolSnapshot> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns every certificate with this DER `SubjectPublicKeyInfo`.
    pub fn by_public_key(&self, public_key: &[u8]) -> Vec<Arc<CertificateToken>> {
        self.snapshot().by_public_key(public_key)
    }

    /// Returns a copy of the group with this handle.
    pub fn group(&self, id: GroupId) -> Option<CertificateEquivalenceGroup> {
        self.snapshot().group(id).cloned()
    }

    /// Returns true if the trust predicate accepts `token` or any other
    /// certificate of its public-key group.
    pub fn is_trusted(&self, token: &CertificateToken) -> bool {
        self.group_matches(token, |trust, member| trust.is_trusted(member))
    }

    /// Returns true if `token`, or a certificate sharing its public key, is a
    /// trust anchor.
    pub fn is_trust_anchor(&self, token: &CertificateToken) -> bool {
        self.group_matches(token, |trust, member| trust.is_trust_anchor(member))
    }

    fn group_matches<F>(&self, token: &CertificateToken, check: F) -> bool
    where
        F: Fn(&dyn TrustPredicate, &CertificateToken) -> bool,
    {
        let Some(trust) = self.trust.as_deref() else {
            return false;
        };

        if check(trust, token) {
            return true;
        }

        let snapshot = self.snapshot();
        snapshot
            .by_public_key(token.public_key())
            .iter()
            .any(|member| check(trust, member))
    }
}

impl Default for CertificateEntityPool {
    fn default() -> Self {
        Self::untrusted()
    }
}
