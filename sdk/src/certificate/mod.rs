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

//! Certificate identity, public-key deduplication, chain assembly and
//! trust.

mod chain;
pub use chain::{CertificateChain, CertificateChainAssembler, ChainError};

mod pool;
pub use pool::{
    CertificateEntityPool, CertificateEquivalenceGroup, GroupId, PoolSnapshot, TrustPredicate,
};

mod token;
pub use token::{CertificateError, CertificateToken, KeyId, TokenId};

mod trust;
pub use trust::{CertificateTrustPolicy, InvalidCertificateError};
