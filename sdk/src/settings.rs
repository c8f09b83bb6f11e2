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

//! Process-wide extension settings.
//!
//! Defaults are loaded lazily on first use. Values can be replaced from a
//! TOML or JSON document with [`load_settings`] or set one at a time by
//! path. [`ExtensionSettings`] is the plain snapshot the extender reads.

use std::cell::RefCell;

use config::{Config, FileFormat};
use serde::{Deserialize, Serialize};

use crate::{
    certificate::CertificateTrustPolicy, hash::DigestAlgorithm, hash_index::AtsHashIndexVersion,
    Error, Result,
};

const MAJOR_VERSION: usize = 1;
const MINOR_VERSION: usize = 0;

thread_local!(
    static SETTINGS: RefCell<Config> =
        RefCell::new(Config::try_from(&Settings::default()).unwrap_or_default());
);

// checks user supplied configuration before it is committed
pub(crate) trait SettingsValidate {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Trust anchors and privately accepted end-entity certificates.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Trust {
    /// PEM bundle of trust anchors
    pub trust_anchors: Option<String>,

    /// PEM end-entity certificates or base64 SHA-256 hashes of them
    pub allowed_list: Option<String>,
}

impl Trust {
    /// Builds the trust policy these settings describe.
    pub fn trust_policy(&self) -> Result<CertificateTrustPolicy> {
        let mut policy = CertificateTrustPolicy::new();

        if let Some(anchors) = &self.trust_anchors {
            policy
                .add_trust_anchors(anchors.as_bytes())
                .map_err(|e| Error::BadSettings(format!("trust.trust_anchors: {e}")))?;
        }

        if let Some(allowed) = &self.allowed_list {
            policy
                .add_end_entity_credentials(allowed.as_bytes())
                .map_err(|e| Error::BadSettings(format!("trust.allowed_list: {e}")))?;
        }

        Ok(policy)
    }
}

impl SettingsValidate for Trust {
    fn validate(&self) -> Result<()> {
        self.trust_policy().map(|_| ())
    }
}

/// Time stamp requests.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TimeStamp {
    /// Digest algorithm of signature time stamp imprints
    pub signature_digest_algorithm: DigestAlgorithm,

    /// Digest algorithm of archive time stamp imprints and hash indexes
    pub archive_digest_algorithm: DigestAlgorithm,

    /// RFC 3161 endpoint for the built-in HTTP provider
    pub url: Option<String>,
}

impl Default for TimeStamp {
    fn default() -> Self {
        Self {
            signature_digest_algorithm: DigestAlgorithm::Sha256,
            archive_digest_algorithm: DigestAlgorithm::Sha256,
            url: None,
        }
    }
}

impl SettingsValidate for TimeStamp {
    fn validate(&self) -> Result<()> {
        if self.signature_digest_algorithm == DigestAlgorithm::Sha1
            || self.archive_digest_algorithm == DigestAlgorithm::Sha1
        {
            return Err(Error::BadSettings(
                "SHA-1 cannot be used for new time stamps".into(),
            ));
        }
        Ok(())
    }
}

/// Hash index production and checking.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct HashIndex {
    /// Version of the hash index attribute written by LTA extension
    pub version: AtsHashIndexVersion,

    /// Accept hash index digests found only among known validation data
    pub lax_matching: bool,
}

impl SettingsValidate for HashIndex {}

/// Validation data collection.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ValidationData {
    /// Leave trust anchors out of the collected certificates
    pub exclude_trust_anchors: bool,

    /// Also collect the chains of time stamp authorities
    pub include_timestamp_chains: bool,
}

impl Default for ValidationData {
    fn default() -> Self {
        Self {
            exclude_trust_anchors: true,
            include_timestamp_chains: true,
        }
    }
}

impl SettingsValidate for ValidationData {}

/// Settings for the whole crate. There is one configuration per thread;
/// default values are used until something is loaded.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    /// Major version of the settings format
    pub version_major: usize,

    /// Minor version of the settings format
    pub version_minor: usize,

    /// Trust configuration
    #[serde(default)]
    pub trust: Trust,

    /// Time stamp configuration
    #[serde(default)]
    pub time_stamp: TimeStamp,

    /// Hash index configuration
    #[serde(default)]
    pub hash_index: HashIndex,

    /// Validation data configuration
    #[serde(default)]
    pub validation_data: ValidationData,
}

impl Settings {
    /// Parses settings in `format` (`toml` or `json`) and merges them over
    /// the current settings, which are replaced only if the result is valid.
    pub fn from_string(settings_str: &str, format: &str) -> Result<Self> {
        let f = match format.to_lowercase().as_str() {
            "json" => FileFormat::Json,
            "toml" => FileFormat::Toml,
            _ => return Err(Error::UnsupportedSettingsFormat(format.to_string())),
        };

        let new_config = Config::builder()
            .add_source(config::File::from_str(settings_str, f))
            .build()
            .map_err(|e| Error::BadSettings(format!("could not parse configuration: {e}")))?;

        let update_config = SETTINGS.with_borrow(|current_settings| {
            Config::builder()
                .add_source(current_settings.clone())
                .add_source(new_config)
                .build() // merge overrides, allows for partial changes
        });

        match update_config {
            Ok(update_config) => {
                let settings = update_config
                    .clone()
                    .try_deserialize::<Settings>()
                    .map_err(|e| Error::BadSettings(e.to_string()))?;

                settings.validate()?;

                SETTINGS.set(update_config);

                Ok(settings)
            }
            Err(e) => Err(Error::InternalError(format!(
                "could not update configuration: {e}"
            ))),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            version_major: MAJOR_VERSION,
            version_minor: MINOR_VERSION,
            trust: Default::default(),
            time_stamp: Default::default(),
            hash_index: Default::default(),
            validation_data: Default::default(),
        }
    }
}

impl SettingsValidate for Settings {
    fn validate(&self) -> Result<()> {
        if self.version_major > MAJOR_VERSION {
            return Err(Error::BadSettings("settings version too new".into()));
        }
        self.trust.validate()?;
        self.time_stamp.validate()?;
        self.hash_index.validate()?;
        self.validation_data.validate()
    }
}

/// What [`SignatureLevelExtender`](crate::SignatureLevelExtender) reads.
///
/// Usually taken from the current [`Settings`] with
/// [`ExtensionSettings::from_current`], but it can be built by hand.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtensionSettings {
    /// Trust anchors and allowed end-entity certificates
    pub trust: Trust,

    /// Time stamp algorithms and endpoint
    pub time_stamp: TimeStamp,

    /// Hash index version and matching policy
    pub hash_index: HashIndex,

    /// Validation data collection policy
    pub validation_data: ValidationData,
}

impl ExtensionSettings {
    /// Snapshot of the current thread's settings.
    pub fn from_current() -> Result<Self> {
        let settings = get_settings()
            .ok_or_else(|| Error::InternalError("could not get current settings".into()))?;
        Ok(Self::from(settings))
    }

    /// Builds the trust policy these settings describe.
    pub fn trust_policy(&self) -> Result<CertificateTrustPolicy> {
        self.trust.trust_policy()
    }
}

impl From<Settings> for ExtensionSettings {
    fn from(settings: Settings) -> Self {
        Self {
            trust: settings.trust,
            time_stamp: settings.time_stamp,
            hash_index: settings.hash_index,
            validation_data: settings.validation_data,
        }
    }
}

/// Returns a snapshot of the current settings, or `None` if they cannot be
/// deserialized.
pub fn get_settings() -> Option<Settings> {
    SETTINGS.with_borrow(|config| config.clone().try_deserialize::<Settings>().ok())
}

/// Loads settings from a TOML document, merging them over the current ones.
pub fn load_settings(toml: &str) -> Result<()> {
    Settings::from_string(toml, "toml").map(|_| ())
}

/// Loads settings from a JSON document, merging them over the current ones.
pub fn load_settings_from_json(json: &str) -> Result<()> {
    Settings::from_string(json, "json").map(|_| ())
}

// Set a Settings value by path reference. The path is the nested names of the
// Settings objects separated by "." notation, e.g. "hash_index.lax_matching".
#[allow(unused)]
pub(crate) fn set_settings_value<T: Into<config::Value>>(value_path: &str, value: T) -> Result<()> {
    let c = SETTINGS.take();

    let update_config = Config::builder()
        .add_source(c.clone())
        .set_override(value_path, value);

    if let Ok(updated) = update_config {
        let update_config = match updated.build() {
            Ok(config) => config,
            Err(e) => {
                SETTINGS.set(c);
                return Err(Error::InternalError(format!(
                    "could not update configuration: {e}"
                )));
            }
        };

        let settings = match update_config.clone().try_deserialize::<Settings>() {
            Ok(settings) => settings,
            Err(e) => {
                SETTINGS.set(c);
                return Err(Error::BadSettings(e.to_string()));
            }
        };

        if let Err(e) = settings.validate() {
            SETTINGS.set(c);
            return Err(e);
        }

        SETTINGS.set(update_config);

        Ok(())
    } else {
        SETTINGS.set(c);
        Err(Error::InternalError("could not save settings".into()))
    }
}

// Get a Settings value by path reference, e.g. "time_stamp.url".
#[allow(unused)]
pub(crate) fn get_settings_value<'de, T: serde::de::Deserialize<'de>>(
    value_path: &str,
) -> Result<T> {
    SETTINGS.with_borrow(|current_settings| {
        current_settings
            .get::<T>(value_path)
            .map_err(|_| Error::SettingsValueNotFound(value_path.to_string()))
    })
}

/// Sets settings back to the default values.
pub fn reset_default_settings() -> Result<()> {
    if let Ok(default_settings) = Config::try_from(&Settings::default()) {
        SETTINGS.set(default_settings);
        Ok(())
    } else {
        Err(Error::InternalError("could not save settings".into()))
    }
}
