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

use crate::{
    hash::DigestAlgorithm,
    time_stamp::{TimeStampError, TimeStampRequest},
};

/// A `TimeStampProvider` implementation can contact a [RFC 3161] time stamp
/// service and return a time stamp token over a digest.
///
/// [RFC 3161]: https://datatracker.ietf.org/doc/html/rfc3161
pub trait TimeStampProvider {
    /// Return the URL for time stamp service.
    fn time_stamp_service_url(&self) -> Option<String> {
        None
    }

    /// Additional request headers to pass to the time stamp service.
    ///
    /// IMPORTANT: You should not include the "Content-type" header here.
    /// That is provided by default.
    fn time_stamp_request_headers(&self) -> Option<Vec<(String, String)>> {
        None
    }

    /// Generate the request for the time stamp service.
    fn time_stamp_request_body(
        &self,
        algorithm: DigestAlgorithm,
        digest: &[u8],
    ) -> Result<TimeStampRequest, TimeStampError> {
        TimeStampRequest::new(algorithm, digest)
    }

    /// Request a [RFC 3161] time stamp token over `digest`, which was
    /// computed with `algorithm`.
    ///
    /// The default implementation will send the request to the URL
    /// provided by [`Self::time_stamp_service_url()`], if any, and returns
    /// `None` when there is no such URL.
    ///
    /// [RFC 3161]: https://datatracker.ietf.org/doc/html/rfc3161
    #[allow(unused_variables)] // unused without `http_time_stamp`
    fn send_time_stamp_request(
        &self,
        algorithm: DigestAlgorithm,
        digest: &[u8],
    ) -> Option<Result<Vec<u8>, TimeStampError>> {
        #[cfg(feature = "http_time_stamp")]
        if let Some(url) = self.time_stamp_service_url() {
            let headers = self.time_stamp_request_headers();
            return Some(
                self.time_stamp_request_body(algorithm, digest)
                    .and_then(|request| {
                        super::http_request::default_rfc3161_request(&url, headers, &request)
                    }),
            );
        }

        None
    }
}

/// Sends requests to a fixed RFC 3161 endpoint over HTTP.
#[derive(Clone, Debug, Default)]
pub struct HttpTimeStampProvider {
    url: Option<String>,
    headers: Vec<(String, String)>,
}

impl HttpTimeStampProvider {
    /// Creates a provider for the service at `url`.
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: Some(url.into()),
            headers: Vec::new(),
        }
    }

    /// Creates a provider from an optional URL, as found in settings.
    /// Without a URL no request is ever sent.
    pub fn from_url(url: Option<&str>) -> Self {
        Self {
            url: url.map(str::to_owned),
            headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request (for example an API key).
    pub fn with_header<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl TimeStampProvider for HttpTimeStampProvider {
    fn time_stamp_service_url(&self) -> Option<String> {
        self.url.clone()
    }

    fn time_stamp_request_headers(&self) -> Option<Vec<(String, String)>> {
        if self.headers.is_empty() {
            None
        } else {
            Some(self.headers.clone())
        }
    }
}
