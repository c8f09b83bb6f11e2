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

use thiserror::Error;

use crate::{container::SignatureLevel, SignerId};

/// `Error` enumerates the conditions that abort a signature extension.
///
/// Conditions that only degrade a result (an unavailable revocation datum,
/// a hash index mismatch found during verification) are recorded in a
/// [`StatusTracker`](cades_status_tracker::StatusTracker) instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // --- extension preconditions ---
    /// The container holds no signer entries.
    #[error("the container has no signer entries")]
    NoSignerEntries,

    /// The requested level cannot be produced by this extender.
    #[error("extension to {0} is not supported")]
    UnsupportedLevel(SignatureLevel),

    /// A requested signer entry identifier was not found.
    #[error("signer entry not found: {0}")]
    SignerEntryNotFound(SignerId),

    /// The signature of an entry being escalated does not verify.
    #[error("signature of {id} is not valid: {reason}")]
    InvalidSignature {
        /// The signer entry
        id: SignerId,

        /// Accumulated per-candidate reasons
        reason: String,
    },

    /// The signing chain reaches no trust anchor, so no validation data can
    /// be embedded for it.
    #[error("certificate chain of {id} is not trusted (ends at {root})")]
    UntrustedChain {
        /// The signer entry
        id: SignerId,

        /// Subject of the last certificate of the chain
        root: String,
    },

    /// A certificate of the signing chain is outside its validity period at
    /// signing time.
    #[error("certificate {subject} is not valid at {time}")]
    CertificateNotValidAtSigningTime {
        /// Subject of the offending certificate
        subject: String,

        /// Signing time, in seconds since the Unix epoch
        time: i64,
    },

    /// The signed content is needed to compute an archive time stamp imprint
    /// but is not available.
    #[error("the signed content is not available")]
    MissingSignedContent,

    // --- component errors ---
    /// The certificate chain could not be resolved.
    #[error(transparent)]
    Chain(#[from] crate::certificate::ChainError),

    /// A certificate could not be decoded.
    #[error(transparent)]
    Certificate(#[from] crate::certificate::CertificateError),

    /// The time stamp authority failed.
    #[error(transparent)]
    TimeStamp(#[from] crate::time_stamp::TimeStampError),

    /// The time stamp token codec failed.
    #[error(transparent)]
    Codec(#[from] crate::codec::CodecError),

    /// A DER structure could not be encoded or decoded.
    #[error(transparent)]
    Asn1(#[from] crate::asn1::Asn1Error),

    // --- configuration ---
    /// Settings could not be parsed or are inconsistent.
    #[error("invalid settings: {0}")]
    BadSettings(String),

    /// The configuration format is not supported.
    #[error("unsupported settings format: {0}")]
    UnsupportedSettingsFormat(String),

    /// A settings value was not found.
    #[error("settings value not found: {0}")]
    SettingsValueNotFound(String),

    /// Unexpected internal error.
    #[error("internal error: {0}")]
    InternalError(String),
}

/// A specialized `Result` type for extension operations.
pub type Result<T> = std::result::Result<T, Error>;
