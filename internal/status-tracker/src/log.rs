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

use std::{borrow::Cow, fmt::Debug};

use crate::StatusTracker;

/// Detailed information about an error or other noteworthy condition.
///
/// Use the [`log_item`](crate::log_item) macro to create a `LogItem`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogItem {
    /// Signer entry identifier or other descriptive label
    pub label: Cow<'static, str>,

    /// Description of the condition
    pub description: Cow<'static, str>,

    /// Source file where the condition was detected
    pub file: Cow<'static, str>,

    /// Function where the condition was detected
    pub function: Cow<'static, str>,

    /// Source line number where the condition was detected
    pub line: u32,

    /// Error code as string
    pub err_val: Option<Cow<'static, str>>,

    /// Validation status code (see [`validation_codes`](crate::validation_codes))
    pub validation_status: Option<Cow<'static, str>>,
}

impl LogItem {
    /// Creates a new `LogItem` with explicit source location.
    ///
    /// Prefer the [`log_item`](crate::log_item) macro, which fills in the
    /// file and line for you.
    pub fn new<S1, S2, S3, S4>(label: S1, description: S2, function: S3, file: S4, line: u32) -> Self
    where
        S1: Into<Cow<'static, str>>,
        S2: Into<Cow<'static, str>>,
        S3: Into<Cow<'static, str>>,
        S4: Into<Cow<'static, str>>,
    {
        LogItem {
            label: label.into(),
            description: description.into(),
            file: file.into(),
            function: function.into(),
            line,
            err_val: None,
            validation_status: None,
        }
    }

    /// Captures the description from the value (typically an `Error` enum) as
    /// additional information for this `LogItem` struct.
    ///
    /// IMPORTANT: This is implemented using the [`Debug`](std::fmt::Debug)
    /// trait.
    ///
    /// ## Example
    ///
    /// ```
    /// # use cades_status_tracker::log_item;
    /// let log = log_item!("S-01", "no revocation data", "collect").error("timeout");
    ///
    /// assert_eq!(log.err_val.as_deref(), Some("\"timeout\""));
    /// ```
    pub fn error<E: Debug>(self, err: E) -> Self {
        LogItem {
            err_val: Some(format!("{err:?}").into()),
            ..self
        }
    }

    /// Adds a validation status code.
    ///
    /// ## Example
    ///
    /// ```
    /// # use cades_status_tracker::{log_item, validation_codes::ATS_HASH_INDEX_VALID};
    /// let log = log_item!("S-01", "hash index matches", "verify")
    ///     .validation_status(ATS_HASH_INDEX_VALID);
    ///
    /// assert_eq!(log.validation_status.as_deref(), Some("atsHashIndex.valid"));
    /// ```
    pub fn validation_status(self, status: &'static str) -> Self {
        LogItem {
            validation_status: Some(status.into()),
            ..self
        }
    }

    /// Records this item as a success in the given tracker.
    pub fn success(self, tracker: &mut StatusTracker) {
        tracker.add_non_error(self);
    }

    /// Records this item as informational in the given tracker.
    pub fn informational(self, tracker: &mut StatusTracker) {
        tracker.add_non_error(self);
    }

    /// Records this item as a failure in the given tracker.
    ///
    /// Returns `Err(err)` if the tracker is configured to stop on the first
    /// error.
    pub fn failure<E: Debug>(self, tracker: &mut StatusTracker, err: E) -> Result<(), E> {
        tracker.add_error(self.error(&err), err)
    }

    /// Records this item as a failure without ever returning an error.
    ///
    /// Use for conditions that degrade a result but must not abort the
    /// surrounding operation.
    pub fn failure_no_throw<E: Debug>(self, tracker: &mut StatusTracker, err: E) {
        tracker.add_non_error(self.error(err));
    }
}

/// Creates a [`LogItem`] struct that is annotated with the source file and line
/// number where the log condition was discovered.
///
/// Takes three parameters, each of which may be a `'static str` or `String`:
///
/// * `label`: name of the object this `LogItem` references (typically a
///   signer entry identifier)
/// * `description`: human-readable reason for this `LogItem` to have been
///   generated
/// * `function`: name of the function generating this `LogItem`
///
/// ## Example
///
/// ```
/// # use std::borrow::Cow;
/// # use cades_status_tracker::{log_item, LogItem};
/// let log = log_item!("test1", "test item 1", "test func");
///
/// assert_eq!(log.label, Cow::Borrowed("test1"));
/// assert_eq!(log.file, Cow::Borrowed(file!()));
/// assert!(log.err_val.is_none());
/// ```
#[macro_export]
macro_rules! log_item {
    ($label:expr, $description:expr, $function:expr) => {{
        $crate::LogItem::new($label, $description, $function, file!(), line!())
    }};
}
