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

use asn1_rs::{Class, Tag};
use chrono::NaiveDateTime;
use rand::{thread_rng, Rng};

use crate::{
    asn1::{self, oids, DerElement},
    hash::DigestAlgorithm,
    time_stamp::TimeStampError,
};

/// An RFC 3161 `TimeStampReq` for a digest computed by the caller.
///
/// ```text
/// TimeStampReq ::= SEQUENCE {
///     version        INTEGER { v1(1) },
///     messageImprint MessageImprint,
///     reqPolicy      TSAPolicyId OPTIONAL,
///     nonce          INTEGER OPTIONAL,
///     certReq        BOOLEAN DEFAULT FALSE,
///     extensions     [0] IMPLICIT Extensions OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimeStampRequest {
    /// Algorithm `digest` was computed with
    pub algorithm: DigestAlgorithm,

    /// The digest to be time stamped
    pub digest: Vec<u8>,

    /// Random nonce the service must echo
    pub nonce: u64,
}

impl TimeStampRequest {
    /// Creates a request with a fresh random nonce.
    pub fn new(algorithm: DigestAlgorithm, digest: &[u8]) -> Result<Self, TimeStampError> {
        if digest.len() != algorithm.output_len() {
            return Err(TimeStampError::InvalidData);
        }

        let mut random = [0u8; 8];
        thread_rng().try_fill(&mut random).map_err(|_| {
            TimeStampError::InternalError("Unable to generate random number".to_string())
        })?;

        Ok(Self {
            algorithm,
            digest: digest.to_vec(),
            nonce: u64::from_le_bytes(random),
        })
    }

    /// DER encoding of the request, with `certReq` set so the authority
    /// includes its certificate in the token.
    pub fn to_der(&self) -> Result<Vec<u8>, TimeStampError> {
        let message_imprint = asn1::encode_sequence(&[
            self.algorithm.algorithm_identifier_der()?,
            asn1::encode_octet_string(&self.digest)?,
        ])?;

        Ok(asn1::encode_sequence(&[
            asn1::encode_unsigned(1)?,
            message_imprint,
            asn1::encode_unsigned(self.nonce)?,
            asn1::encode_tlv(Class::Universal, false, Tag::Boolean, &[0xff])?,
        ])?)
    }
}

/// A decoded RFC 3161 `TimeStampResp`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimeStampResponse {
    /// `PKIStatus` value
    pub status: u8,

    /// `TimeStampToken` (a CMS `ContentInfo`), present when granted
    pub token: Option<Vec<u8>>,
}

impl TimeStampResponse {
    /// Decodes a `TimeStampResp`.
    pub fn from_der(der: &[u8]) -> Result<Self, TimeStampError> {
        let fields = asn1::sequence_elements(der)?;
        let status_info = fields
            .first()
            .ok_or_else(|| TimeStampError::DecodeError("empty TimeStampResp".to_string()))?;

        let status = asn1::sequence_elements(status_info.raw)?
            .first()
            .filter(|e| e.is_universal(Tag::Integer))
            .and_then(|e| small_unsigned(e.content))
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| TimeStampError::DecodeError("invalid PKIStatus".to_string()))?;

        Ok(Self {
            status,
            token: fields.get(1).map(|e| e.raw.to_vec()),
        })
    }

    /// Returns `true` if the request was granted, with or without
    /// modifications.
    pub fn is_success(&self) -> bool {
        matches!(self.status, 0 | 1)
    }

    /// Decodes the `TSTInfo` of the embedded token, if there is one.
    pub fn tst_info(&self) -> Result<Option<TstInfo>, TimeStampError> {
        self.token.as_deref().map(TstInfo::from_token).transpose()
    }

    /// Checks the response against the request it answers and returns the
    /// time stamp token.
    pub fn into_token(self, request: &TimeStampRequest) -> Result<Vec<u8>, TimeStampError> {
        if !self.is_success() {
            return Err(TimeStampError::Rejected(self.status));
        }

        let tst_info = self
            .tst_info()?
            .ok_or_else(|| TimeStampError::DecodeError("granted without token".to_string()))?;

        if tst_info.nonce != Some(request.nonce) {
            return Err(TimeStampError::NonceMismatch);
        }

        if tst_info.message_imprint_algorithm != request.algorithm
            || tst_info.message_imprint != request.digest
        {
            return Err(TimeStampError::InvalidData);
        }

        self.token
            .ok_or_else(|| TimeStampError::DecodeError("granted without token".to_string()))
    }
}

/// The fields of a `TSTInfo` this crate reads.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TstInfo {
    /// Algorithm of the message imprint
    pub message_imprint_algorithm: DigestAlgorithm,

    /// Digest the authority attested to
    pub message_imprint: Vec<u8>,

    /// `genTime`, in seconds since the Unix epoch
    pub gen_time: i64,

    /// Nonce echoed by the authority
    pub nonce: Option<u64>,
}

impl TstInfo {
    /// Extracts the `TSTInfo` from a `TimeStampToken`.
    pub fn from_token(token: &[u8]) -> Result<Self, TimeStampError> {
        let content_info = asn1::sequence_elements(token)?;
        match content_info.as_slice() {
            [content_type, content] if content.is_context(0) => {
                if asn1::oid_from_element(content_type)? != oids::ID_SIGNED_DATA_OID {
                    return Err(TimeStampError::DecodeError(
                        "Invalid OID for signed data".to_string(),
                    ));
                }

                let signed_data = asn1::sequence_elements(content.content)?;
                let encap_raw = signed_data
                    .get(2)
                    .ok_or_else(|| {
                        TimeStampError::DecodeError("SignedData without content".to_string())
                    })?
                    .raw;
                let encap = asn1::sequence_elements(encap_raw)?;

                let [e_content_type, e_content] = encap.as_slice() else {
                    return Err(TimeStampError::DecodeError("detached TSTInfo".to_string()));
                };

                if asn1::oid_from_element(e_content_type)? != oids::ID_CT_TST_INFO_OID {
                    return Err(TimeStampError::DecodeError(
                        "content is not a TSTInfo".to_string(),
                    ));
                }

                let octets = asn1::parse_single(e_content.content)?;
                Self::from_der(asn1::octet_string_from_element(&octets)?)
            }
            _ => Err(TimeStampError::DecodeError("time stamp invalid".to_string())),
        }
    }

    /// Decodes a DER `TSTInfo`.
    pub fn from_der(der: &[u8]) -> Result<Self, TimeStampError> {
        let fields = asn1::sequence_elements(der)?;

        // version, policy, messageImprint, serialNumber, genTime
        let [_, _, imprint, _, gen_time, rest @ ..] = fields.as_slice() else {
            return Err(TimeStampError::DecodeError("truncated TSTInfo".to_string()));
        };

        let imprint = asn1::sequence_elements(imprint.raw)?;
        let [algorithm, digest] = imprint.as_slice() else {
            return Err(TimeStampError::DecodeError("invalid MessageImprint".to_string()));
        };

        let nonce = rest
            .iter()
            .find(|e| e.is_universal(Tag::Integer))
            .map(|e| small_unsigned(e.content).ok_or(TimeStampError::NonceMismatch))
            .transpose()?;

        Ok(Self {
            message_imprint_algorithm: DigestAlgorithm::from_algorithm_identifier_der(
                algorithm.raw,
            )?,
            message_imprint: asn1::octet_string_from_element(digest)?.to_vec(),
            gen_time: generalized_time(gen_time)?,
            nonce,
        })
    }
}

fn small_unsigned(content: &[u8]) -> Option<u64> {
    let content = match content {
        [0, rest @ ..] if !rest.is_empty() => rest,
        [first, ..] if first & 0x80 != 0 => return None,
        _ => content,
    };
    if content.len() > 8 {
        return None;
    }
    Some(content.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

fn generalized_time(element: &DerElement<'_>) -> Result<i64, TimeStampError> {
    if !element.is_universal(Tag::GeneralizedTime) {
        return Err(TimeStampError::DecodeError("invalid genTime".to_string()));
    }

    let text = std::str::from_utf8(element.content)
        .map_err(|e| TimeStampError::DecodeError(e.to_string()))?;

    NaiveDateTime::parse_from_str(text.trim_end_matches('Z'), "%Y%m%d%H%M%S%.f")
        .map(|t| t.and_utc().timestamp())
        .map_err(|e| TimeStampError::DecodeError(format!("invalid genTime {text}: {e}")))
}
