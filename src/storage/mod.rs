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

//! Cloud object storage bindings
//!
//! A [`Storage`] client hands out [`Reference`]s to objects in one bucket.
//! References are cheap, bind without touching the network, and forward
//! every operation to a [`StorageBackend`] after translating public shapes
//! into the backend's own.
//!
//! The default backend wraps the `object_store` crate (in-memory, local
//! filesystem or GCS) and is built from a [`StorageConfig`] by
//! [`StorageFactory`].

pub mod backend;
pub mod client;
pub mod config;
pub mod encoding;
pub mod factory;
pub mod hash;
pub mod list;
pub mod location;
pub mod metadata;
pub mod native;
pub mod object_store;
pub mod reference;
pub mod source;
pub mod task;

// Public exports
pub use backend::{Capabilities, StorageBackend};
pub use client::Storage;
pub use config::{StorageConfig, StorageType};
pub use factory::StorageFactory;
pub use list::{ListOptions, ListResult};
pub use location::{Binding, ObjectLocation};
pub use metadata::{FullMetadata, SettableMetadata};
pub use self::object_store::ObjectStoreBackend;
pub use reference::Reference;
pub use source::{Blob, PutStringFormat};
pub use task::{DownloadTask, TaskSnapshot, TaskState, UploadTask};
