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
use std::time::Duration;

use crate::error::{Error, Result};

/// Host the HTTP backend talks to unless overridden
pub const DEFAULT_ENDPOINT: &str = "https://firebaseremoteconfig.googleapis.com";

/// Namespace holding client templates
pub const DEFAULT_NAMESPACE: &str = "firebase";

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_MINIMUM_FETCH_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);

/// Identity of the app fetching configuration.
///
/// # Examples
///
/// ```
/// use cloud_bindings::remote_config::RemoteConfigOptions;
///
/// let options = RemoteConfigOptions::new("my-project", "1:1234:web:abcd", "api-key")
///     .with_app_instance_id("device-1");
/// assert_eq!(options.namespace, "firebase");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteConfigOptions {
    pub project_id: String,
    pub app_id: String,
    pub api_key: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Stable per-installation identifier sent with every fetch
    #[serde(default)]
    pub app_instance_id: Option<String>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl RemoteConfigOptions {
    pub fn new(
        project_id: impl Into<String>,
        app_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            app_id: app_id.into(),
            api_key: api_key.into(),
            namespace: default_namespace(),
            endpoint: default_endpoint(),
            app_instance_id: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_app_instance_id(mut self, app_instance_id: impl Into<String>) -> Self {
        self.app_instance_id = Some(app_instance_id.into());
        self
    }

    /// Check that every identifier needed for a fetch is present.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("project_id", &self.project_id),
            ("app_id", &self.app_id),
            ("api_key", &self.api_key),
            ("namespace", &self.namespace),
            ("endpoint", &self.endpoint),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(Error::Config(format!(
                "Remote config requires '{}' option",
                name
            ))),
            None => Ok(()),
        }
    }
}

/// Client-side fetch policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteConfigSettings {
    /// Upper bound on a single fetch round trip
    pub fetch_timeout: Duration,
    /// Fetches within this long of the last successful one are served from cache
    pub minimum_fetch_interval: Duration,
}

impl Default for RemoteConfigSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            minimum_fetch_interval: DEFAULT_MINIMUM_FETCH_INTERVAL,
        }
    }
}

impl RemoteConfigSettings {
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn with_minimum_fetch_interval(mut self, minimum_fetch_interval: Duration) -> Self {
        self.minimum_fetch_interval = minimum_fetch_interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout.is_zero() {
            return Err(Error::InvalidArgument(
                "fetch_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
