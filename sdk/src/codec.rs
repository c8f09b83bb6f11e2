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

//! The boundary to the CMS binary codec.
//!
//! Encoding and decoding complete CMS structures is delegated to an
//! implementation of [`CmsCodec`]. This crate uses it to look inside the
//! time stamp tokens a time stamp authority returns and to rewrite tokens
//! that are already embedded in a signature.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    container::{CmsSignedContainer, SignerEntry},
    hash::DigestAlgorithm,
};

/// Describes errors reported by a [`CmsCodec`].
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum CodecError {
    /// The input could not be decoded.
    #[error("unable to decode CMS structure: {0}")]
    Decoding(String),

    /// The value could not be encoded.
    #[error("unable to encode CMS structure: {0}")]
    Encoding(String),
}

/// Decoded view of an RFC 3161 time stamp token.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TimeStampToken {
    /// `TSTInfo.genTime`, in seconds since the Unix epoch
    pub gen_time: i64,

    /// Algorithm of the message imprint
    pub message_imprint_algorithm: DigestAlgorithm,

    /// Hashed message of the message imprint
    pub message_imprint: Vec<u8>,

    /// The token's `SignedData`, with the TSA's signer entry
    pub signed_data: CmsSignedContainer,
}

impl TimeStampToken {
    /// The signer entry of the time stamp authority.
    pub fn signer(&self) -> Option<&SignerEntry> {
        self.signed_data.signers.first()
    }

    /// Mutable access to the signer entry of the time stamp authority.
    pub fn signer_mut(&mut self) -> Option<&mut SignerEntry> {
        self.signed_data.signers.first_mut()
    }

    /// DER certificates embedded in the token.
    pub fn certificates(&self) -> &[Vec<u8>] {
        &self.signed_data.certificates
    }
}

/// A `CmsCodec` converts time stamp tokens between their DER encoding
/// (`ContentInfo` wrapping `SignedData`) and [`TimeStampToken`].
///
/// Implementations must keep the encodings of fields that are not changed
/// byte-identical, so re-encoding a decoded token reproduces its input.
pub trait CmsCodec {
    /// Decodes a DER time stamp token.
    fn decode_time_stamp_token(&self, encoded: &[u8]) -> Result<TimeStampToken, CodecError>;

    /// Encodes a time stamp token to DER.
    fn encode_time_stamp_token(&self, token: &TimeStampToken) -> Result<Vec<u8>, CodecError>;
}
