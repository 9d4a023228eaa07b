// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Storage backend type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Process-local in-memory store
    Memory,
    /// Local filesystem storage
    Local,
    /// Google Cloud Storage
    Gcs,
}

/// Option keys consumed by the connection and retry builders
pub(crate) const CONNECTION_OPTION_KEYS: [&str; 6] = [
    "timeout",
    "connect_timeout",
    "max_retries",
    "retry_timeout",
    "pool_idle_timeout",
    "pool_max_idle_per_host",
];

/// Configuration for a storage backend
///
/// Backend-specific settings live in a flat option map, which keeps the
/// configuration serializable and lets new keys be added without changing
/// the shape.
///
/// # Examples
///
/// ## In-memory
/// ```
/// use cloud_bindings::storage::StorageConfig;
///
/// let config = StorageConfig::memory()
///     .with_option("bucket", "demo-bucket")
///     .with_option("download_base_url", "http://127.0.0.1:9199");
/// ```
///
/// ## Local filesystem
/// ```
/// use cloud_bindings::storage::StorageConfig;
///
/// let config = StorageConfig::local()
///     .with_option("path", "/tmp/data");
/// ```
///
/// ## GCS
/// ```
/// use cloud_bindings::storage::StorageConfig;
///
/// let config = StorageConfig::gcs()
///     .with_option("bucket", "my-bucket")
///     .with_option("service_account_key_path", "/path/to/key.json");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend type
    #[serde(rename = "type")]
    pub storage_type: StorageType,

    /// Backend-specific configuration options
    ///
    /// Common options:
    /// - bucket: Bucket name references resolve against
    /// - download_base_url: Host that serves download URLs
    /// - proxy: HTTP proxy for plain downloads
    ///
    /// GCS:
    /// - service_account_key_path: Path to service account JSON key file
    /// - service_account_key: Service account key as JSON string
    ///
    /// Local:
    /// - path: Base path
    ///
    /// Connection (GCS): timeout, connect_timeout, max_retries, retry_timeout,
    /// pool_idle_timeout, pool_max_idle_per_host
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl StorageConfig {
    /// Create a configuration for a backend named by string.
    ///
    /// # Errors
    ///
    /// `Config` if the name is not one of "memory", "local", "gcs" (or "gcp").
    pub fn new(storage_type: impl Into<String>) -> Result<Self> {
        let storage_type_str = storage_type.into();
        let storage_type = match storage_type_str.to_lowercase().as_str() {
            "memory" => StorageType::Memory,
            "local" => StorageType::Local,
            "gcs" | "gcp" => StorageType::Gcs,
            _ => {
                return Err(Error::Config(format!(
                    "Unknown storage type: {}",
                    storage_type_str
                )))
            }
        };

        Ok(Self {
            storage_type,
            options: Self::default_options(),
        })
    }

    pub fn memory() -> Self {
        Self {
            storage_type: StorageType::Memory,
            options: Self::default_options(),
        }
    }

    pub fn local() -> Self {
        Self {
            storage_type: StorageType::Local,
            options: Self::default_options(),
        }
    }

    pub fn gcs() -> Self {
        Self {
            storage_type: StorageType::Gcs,
            options: Self::default_options(),
        }
    }

    /// Default timeout, retry, and connection pool settings.
    pub fn default_options() -> HashMap<String, String> {
        [
            ("timeout", "1200"),
            ("connect_timeout", "30"),
            ("max_retries", "20"),
            ("retry_timeout", "1200"),
            ("pool_idle_timeout", "15"),
            ("pool_max_idle_per_host", "5"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    /// Add a configuration option (for method chaining).
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Add multiple configuration options (for method chaining).
    pub fn with_options(mut self, options: HashMap<String, String>) -> Self {
        self.options.extend(options);
        self
    }

    pub fn get_option(&self, key: &str) -> Option<&String> {
        self.options.get(key)
    }

    /// The storage type as a string ("memory", "local" or "gcs").
    pub fn storage_type_str(&self) -> &str {
        match self.storage_type {
            StorageType::Memory => "memory",
            StorageType::Local => "local",
            StorageType::Gcs => "gcs",
        }
    }
}
