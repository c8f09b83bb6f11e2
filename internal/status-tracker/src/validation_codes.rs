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

//! Status codes recorded while extending or verifying a CAdES signature.
//!
//! Codes follow a `subject.condition` naming pattern. Only the codes in the
//! failure section describe conditions that degrade a signature's level.

// -- success codes --

/// The archive time stamp's hash index matches the current state of the
/// signature.
pub const ATS_HASH_INDEX_VALID: &str = "atsHashIndex.valid";

/// The archive time stamp's message imprint matches the recomputed imprint.
pub const ATS_MESSAGE_IMPRINT_MATCH: &str = "atsHashIndex.messageImprint.match";

/// The signing certificate was identified and its key verified the signature.
pub const SIGNING_CERTIFICATE_IDENTIFIED: &str = "signingCertificate.identified";

/// Validation data was added to the signature.
pub const VALIDATION_DATA_ADDED: &str = "validationData.added";

// -- informational codes --

/// A hash-index digest was only found outside the signed container.
pub const ATS_HASH_INDEX_LAX_MATCH: &str = "atsHashIndex.laxMatch";

/// The signer entry already satisfies the requested level.
pub const LEVEL_ALREADY_REACHED: &str = "signatureLevel.alreadyReached";

/// The certificate chain does not reach a configured trust anchor.
pub const CERTIFICATE_CHAIN_UNTRUSTED: &str = "certificateChain.untrusted";

/// Validation data was placed inside an existing archive time stamp.
pub const VALIDATION_DATA_NESTED: &str = "validationData.nested";

// -- failure codes --

/// One or more hash-index digests could not be matched against the current
/// state of the signature.
pub const ATS_HASH_INDEX_MISMATCH: &str = "atsHashIndex.mismatch";

/// The hash-index attribute is missing or cannot be decoded.
pub const ATS_HASH_INDEX_MALFORMED: &str = "atsHashIndex.malformed";

/// The archive time stamp's message imprint does not match the recomputed
/// imprint.
pub const ATS_MESSAGE_IMPRINT_MISMATCH: &str = "atsHashIndex.messageImprint.mismatch";

/// No revocation data could be obtained for a certificate.
pub const REVOCATION_UNAVAILABLE: &str = "revocation.unavailable";

/// A time stamp token embedded in the signature could not be decoded.
pub const TIMESTAMP_MALFORMED: &str = "timeStamp.malformed";

/// No candidate certificate verified the signature.
pub const SIGNING_CERTIFICATE_NOT_FOUND: &str = "signingCertificate.notFound";

/// A certificate in a source could not be decoded.
pub const CERTIFICATE_MALFORMED: &str = "certificate.malformed";

/// The certificate chain of a time stamp could not be resolved.
pub const TIMESTAMP_CHAIN_UNRESOLVED: &str = "timeStamp.chain.unresolved";

/// The requested signer entry cannot be extended.
pub const SIGNER_ENTRY_UNSUPPORTED: &str = "signerEntry.unsupported";

/// A `certificate-values` or `revocation-values` attribute could not be
/// decoded.
pub const VALIDATION_DATA_MALFORMED: &str = "validationData.malformed";
