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

//! # Cloud Bindings
//!
//! Platform-abstracted client bindings for cloud object storage and remote
//! configuration.
//!
//! The crate does not implement a storage engine or a config service. It
//! forwards calls to a backend and translates between the backend's data
//! shapes and the public ones defined here.
//!
//! ## Features
//!
//! - **Object references**: path- or URL-bound handles with navigation
//!   (`parent`, `root`, `child`) that never touch the network
//! - **Transfer tasks**: uploads and file downloads run as cancellable tasks
//!   with observable progress
//! - **Uploads from three sources**: raw bytes, blobs and encoded strings
//!   (raw, base64, base64url, data URL), each with an MD5 integrity hash
//! - **Backends**: in-memory, local filesystem and Google Cloud Storage via
//!   `object_store`
//! - **Remote config**: defaults, fetch and activate, typed reads, and
//!   throttle reporting
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cloud_bindings::{ListOptions, StorageConfig, StorageFactory};
//!
//! # async fn example() -> cloud_bindings::Result<()> {
//! let config = StorageConfig::memory().with_option("bucket", "demo-bucket");
//! let storage = StorageFactory::from_config(config).await?;
//!
//! let reference = storage.reference(Some("images/cat.png"));
//! let metadata = reference.put_data(vec![1u8, 2, 3], None)?.await?;
//! println!("uploaded {} bytes, md5 {:?}", metadata.size, metadata.md5_hash);
//!
//! let page = reference.parent().unwrap().list(ListOptions::new()).await?;
//! println!("{} objects", page.items.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Remote config
//!
//! ```rust,no_run
//! use cloud_bindings::remote_config::{RemoteConfig, RemoteConfigOptions};
//!
//! # async fn example() -> cloud_bindings::Result<()> {
//! let options = RemoteConfigOptions::new("my-project", "1:1234:web:abcd", "api-key");
//! let config = RemoteConfig::from_options(options);
//! config.set_defaults([("welcome_message", "Hello")]);
//!
//! match config.fetch_and_activate().await {
//!     Ok(_) => {}
//!     Err(cloud_bindings::Error::FetchThrottled(throttled)) => {
//!         println!("throttled: {}", throttled);
//!     }
//!     Err(e) => return Err(e),
//! }
//! println!("{}", config.get_string("welcome_message"));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod remote_config;
pub mod storage;
pub mod util;

// Re-export commonly used types
pub use error::{Error, FetchThrottled, Result};
pub use http::{Downloader, HttpDownloader};
pub use remote_config::{RemoteConfig, RemoteConfigOptions, RemoteConfigSettings};
pub use storage::{
    Blob, Capabilities, FullMetadata, ListOptions, ListResult, PutStringFormat, Reference,
    SettableMetadata, Storage, StorageBackend, StorageConfig, StorageFactory, TaskSnapshot,
    TaskState,
};
