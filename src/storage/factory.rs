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

use std::sync::Arc;
use tracing::info;

use super::client::Storage;
use super::config::StorageConfig;
use super::object_store::ObjectStoreBackend;
use crate::error::Result;
use crate::http::HttpDownloader;

/// Factory for creating storage clients
pub struct StorageFactory;

impl StorageFactory {
    /// Create a storage client from a configuration.
    ///
    /// The client is backed by an `object_store` implementation for the
    /// configured type and downloads object content over HTTP, through the
    /// `proxy` option when one is set.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * Required configuration options are missing
    /// * The backing store cannot be initialized
    /// * The proxy URL is invalid
    pub async fn from_config(config: StorageConfig) -> Result<Storage> {
        let downloader = match config.get_option("proxy") {
            #[cfg(not(target_arch = "wasm32"))]
            Some(proxy) => HttpDownloader::with_proxy(proxy)?,
            _ => HttpDownloader::new(),
        };
        let backend = ObjectStoreBackend::new(config).await?;
        let storage = Storage::new(Arc::new(backend), Arc::new(downloader));
        info!("Storage client ready bucket={}", storage.bucket());
        Ok(storage)
    }
}
