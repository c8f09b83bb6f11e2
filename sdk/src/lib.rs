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

#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg, doc_cfg_hide))]

pub mod asn1;
pub mod certificate;
pub mod codec;
pub mod container;
pub mod hash;
pub mod hash_index;
pub mod raw_signature;
pub mod settings;
pub mod signing_certificate;
pub mod sources;
pub mod time_stamp;
pub mod validation_data;

mod error;
pub use error::{Error, Result};

mod extender;
pub use container::{CmsSignedContainer, SignatureLevel, SignerEntry, SignerId};
pub use extender::SignatureLevelExtender;
pub use settings::ExtensionSettings;

#[cfg(test)]
pub(crate) mod tests;
