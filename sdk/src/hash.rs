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

//! Digest algorithms used for time stamp imprints, hash indexes and
//! certificate references.

use std::fmt;

use asn1_rs::Oid;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::asn1::{self, oids, Asn1Error};

/// A digest algorithm supported by this crate.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-1. Accepted when reading legacy structures only.
    Sha1,

    /// SHA-256
    #[default]
    Sha256,

    /// SHA-384
    Sha384,

    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Computes the digest of `data`.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// Computes the digest of the concatenation of `parts`.
    pub fn digest_parts<'a, I>(&self, parts: I) -> Vec<u8>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        fn digest_with<'a, D: Digest>(parts: impl IntoIterator<Item = &'a [u8]>) -> Vec<u8> {
            let mut hasher = D::new();
            for part in parts {
                hasher.update(part);
            }
            hasher.finalize().to_vec()
        }

        match self {
            Self::Sha1 => digest_with::<Sha1>(parts),
            Self::Sha256 => digest_with::<Sha256>(parts),
            Self::Sha384 => digest_with::<Sha384>(parts),
            Self::Sha512 => digest_with::<Sha512>(parts),
        }
    }

    /// Returns the object identifier of this algorithm.
    pub fn oid(&self) -> Oid<'static> {
        match self {
            Self::Sha1 => oids::SHA1_OID,
            Self::Sha256 => oids::SHA256_OID,
            Self::Sha384 => oids::SHA384_OID,
            Self::Sha512 => oids::SHA512_OID,
        }
    }

    /// Finds the algorithm identified by `oid`, if supported.
    pub fn from_oid(oid: &Oid) -> Option<Self> {
        if *oid == oids::SHA1_OID {
            Some(Self::Sha1)
        } else if *oid == oids::SHA256_OID {
            Some(Self::Sha256)
        } else if *oid == oids::SHA384_OID {
            Some(Self::Sha384)
        } else if *oid == oids::SHA512_OID {
            Some(Self::Sha512)
        } else {
            None
        }
    }

    /// Returns the length in bytes of a digest produced by this algorithm.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Encodes this algorithm as a DER `AlgorithmIdentifier` with absent
    /// parameters.
    pub fn algorithm_identifier_der(&self) -> Result<Vec<u8>, Asn1Error> {
        asn1::encode_sequence(&[asn1::encode_oid(&self.oid())?])
    }

    /// Decodes a DER `AlgorithmIdentifier`, ignoring any parameters.
    pub fn from_algorithm_identifier_der(der: &[u8]) -> Result<Self, Asn1Error> {
        let oid = asn1::algorithm_identifier_oid(der)?;
        Self::from_oid(&oid).ok_or_else(|| Asn1Error::UnsupportedAlgorithm(oid.to_id_string()))
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        };
        f.write_str(name)
    }
}

/// Given a byte slice, return the SHA-256 hash of that content.
pub fn sha256(data: &[u8]) -> Vec<u8> {
    DigestAlgorithm::Sha256.digest(data)
}
