// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Strings read as `true` by [`RemoteConfigValue::as_bool`], compared
/// case-insensitively.
const TRUTHY: [&str; 6] = ["1", "true", "t", "yes", "y", "on"];

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// Neither fetched nor defaulted; the value is empty.
    Static,
    /// Set in-app through `set_defaults`.
    Default,
    /// Fetched from the backend and activated.
    Remote,
}

impl Display for ValueSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueSource::Static => "static",
            ValueSource::Default => "default",
            ValueSource::Remote => "remote",
        };
        write!(f, "{}", name)
    }
}

/// A configuration value and its source.
///
/// Values are stored as strings and converted on read. Conversions never
/// fail: a value that does not parse reads as the type's zero value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfigValue {
    value: String,
    source: ValueSource,
}

impl RemoteConfigValue {
    pub fn new(value: impl Into<String>, source: ValueSource) -> Self {
        Self {
            value: value.into(),
            source,
        }
    }

    /// The empty value returned for unknown keys.
    pub fn missing() -> Self {
        Self::new(String::new(), ValueSource::Static)
    }

    pub fn source(&self) -> ValueSource {
        self.source
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn as_bool(&self) -> bool {
        let value = self.value.trim();
        TRUTHY.iter().any(|truthy| value.eq_ignore_ascii_case(truthy))
    }

    pub fn as_int(&self) -> i64 {
        let value = self.value.trim();
        value
            .parse::<i64>()
            .ok()
            .or_else(|| value.parse::<f64>().ok().filter(|n| n.is_finite()).map(|n| n as i64))
            .unwrap_or(0)
    }

    pub fn as_double(&self) -> f64 {
        self.value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| !n.is_nan())
            .unwrap_or(0.0)
    }
}

impl Display for RemoteConfigValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Outcome of the most recent fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStatus {
    NoFetchYet,
    Success,
    Failure,
    Throttle,
}
