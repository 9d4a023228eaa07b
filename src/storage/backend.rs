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

use async_trait::async_trait;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use url::Url;

use super::location::{ObjectHandle, ObjectLocation};
use super::native::{ListRequest, ListResponse, MetadataPatch, ObjectResource, UploadRequest};
use super::task::TaskHandle;
use crate::error::Result;

/// What a backend can do beyond the common operation set.
///
/// Callers check these before invoking the optional operations; a reference
/// rejects an operation the backend does not advertise before any backend
/// call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Uploads from opaque binary blobs.
    pub blobs: bool,
    /// Uploads from and downloads to local files.
    pub files: bool,
}

impl Capabilities {
    /// Browser-hosted targets: blobs, no local filesystem.
    pub const WEB: Capabilities = Capabilities {
        blobs: true,
        files: false,
    };

    /// Native targets: local filesystem, no blob primitive.
    pub const NATIVE: Capabilities = Capabilities {
        blobs: false,
        files: true,
    };

    /// Everything.
    pub const FULL: Capabilities = Capabilities {
        blobs: true,
        files: true,
    };
}

/// Storage backend the bindings forward to.
///
/// Implementations own the transport, durability and pagination behaviour;
/// the reference layer only translates shapes and forwards calls.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Bucket this backend serves.
    fn bucket(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// Bind a path relative to the bucket root. Never fails and never
    /// performs I/O.
    fn resolve_path(&self, path: &str) -> ObjectHandle {
        ObjectHandle::from_path(self.bucket(), path)
    }

    /// Bind an absolute `gs://` or `http(s)://` URL. Never fails and never
    /// performs I/O; an unusable URL yields a handle whose operations fail.
    fn resolve_url(&self, url: &str) -> ObjectHandle {
        ObjectHandle::from_url(url)
    }

    /// Delete the object.
    ///
    /// # Errors
    ///
    /// * `NotFound` if the object does not exist
    /// * `PermissionDenied` per backend rules
    /// * `Unavailable` on transient network failure
    async fn delete(&self, location: &ObjectLocation) -> Result<()>;

    /// Issue an absolute download URL for the object.
    async fn download_url(&self, location: &ObjectLocation) -> Result<Url>;

    /// Fetch the object's full resource.
    async fn metadata(&self, location: &ObjectLocation) -> Result<ObjectResource>;

    /// Apply a metadata patch and return the updated resource.
    async fn update_metadata(
        &self,
        location: &ObjectLocation,
        patch: MetadataPatch,
    ) -> Result<ObjectResource>;

    /// Fetch one page of the delimited listing under `location`.
    ///
    /// Object names ending in the delimiter or containing two consecutive
    /// delimiters are never returned.
    async fn list(&self, location: &ObjectLocation, request: ListRequest) -> Result<ListResponse>;

    /// Start an upload and return its pending handle without waiting for it.
    fn start_upload(
        &self,
        location: &ObjectLocation,
        request: UploadRequest,
    ) -> TaskHandle<ObjectResource>;
}

impl Debug for dyn StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "StorageBackend(bucket={}, capabilities={:?})",
            self.bucket(),
            self.capabilities()
        )
    }
}
