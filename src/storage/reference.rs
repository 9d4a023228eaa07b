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

use bytes::Bytes;
use std::fmt::{Debug, Display, Formatter};
use tracing::{debug, info};

use super::client::Storage;
use super::list::{
    from_list_response, to_list_request, ListOptions, ListResult, DEFAULT_LIST_PAGE_SIZE,
};
use super::location::{is_absolute_url, Binding, ObjectHandle, ObjectLocation};
use super::metadata::{
    from_resource, to_metadata_patch, to_upload_metadata, FullMetadata, SettableMetadata,
};
use super::native::{ListRequest, UploadRequest};
use super::source::{Blob, PutStringFormat, UploadSource};
use super::task::UploadTask;
use crate::error::{Error, Result};

#[cfg(not(target_arch = "wasm32"))]
use super::task::{DownloadTask, TaskHandle};
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};

/// Default `get_data` limit: 10 MiB.
pub const DEFAULT_MAX_DOWNLOAD_SIZE: u64 = 10 * 1024 * 1024;

/// Handle to one path in the storage namespace.
///
/// A reference is bound once, at construction, and holds no transfer state.
/// Reads, deletes and listings await the backend; uploads return an
/// [`UploadTask`] right away.
#[derive(Clone)]
pub struct Reference {
    storage: Storage,
    handle: ObjectHandle,
}

impl Reference {
    /// Bind `path` on `storage`. `None` is the bucket root.
    pub fn new(storage: Storage, path: Option<&str>) -> Self {
        let handle = match path {
            None => storage.backend().resolve_path(""),
            Some(p) if is_absolute_url(p) => storage.backend().resolve_url(p),
            Some(p) => storage.backend().resolve_path(p),
        };
        Self::from_handle(storage, handle)
    }

    pub(crate) fn from_handle(storage: Storage, handle: ObjectHandle) -> Self {
        Self { storage, handle }
    }

    pub(crate) fn from_location(storage: Storage, location: ObjectLocation) -> Self {
        Self::from_handle(storage, ObjectHandle::from_location(location))
    }

    /// Which entry point the path was resolved through.
    pub fn binding(&self) -> Binding {
        self.handle.binding()
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Object path within the bucket, or the unresolved input for an invalid URL.
    pub fn full_path(&self) -> &str {
        match self.handle.location() {
            Ok(location) => location.path(),
            Err(_) => self.handle.raw(),
        }
    }

    pub fn name(&self) -> &str {
        self.handle
            .location()
            .map(ObjectLocation::name)
            .unwrap_or_default()
    }

    pub fn bucket(&self) -> &str {
        self.handle
            .location()
            .map(ObjectLocation::bucket)
            .unwrap_or_default()
    }

    /// The enclosing reference, `None` at the root.
    pub fn parent(&self) -> Option<Reference> {
        let parent = self.handle.location().ok()?.parent()?;
        Some(Self::from_location(self.storage.clone(), parent))
    }

    pub fn root(&self) -> Reference {
        match self.handle.location() {
            Ok(location) => Self::from_location(self.storage.clone(), location.root()),
            Err(_) => self.storage.reference(None),
        }
    }

    /// Reference to `path` below this one.
    pub fn child(&self, path: &str) -> Reference {
        match self.handle.location() {
            Ok(location) => Self::from_location(self.storage.clone(), location.child(path)),
            Err(_) => self.clone(),
        }
    }

    fn location(&self) -> Result<&ObjectLocation> {
        self.handle.location()
    }

    /// Delete the object.
    ///
    /// # Errors
    ///
    /// `NotFound` if the object does not exist, `PermissionDenied` per backend
    /// rules, `Unavailable` on transient network failure.
    pub async fn delete(&self) -> Result<()> {
        let location = self.location()?;
        self.storage.backend().delete(location).await?;
        debug!("Deleted object location={}", location);
        Ok(())
    }

    /// Absolute URL the object can be fetched from with a plain GET.
    pub async fn get_download_url(&self) -> Result<String> {
        let location = self.location()?;
        let url = self.storage.backend().download_url(location).await?;
        Ok(url.to_string())
    }

    pub async fn get_metadata(&self) -> Result<FullMetadata> {
        let location = self.location()?;
        let resource = self.storage.backend().metadata(location).await?;
        Ok(from_resource(resource))
    }

    /// Fetch a single page of children. Does not follow continuation tokens.
    pub async fn list(&self, options: ListOptions) -> Result<ListResult> {
        options.validate()?;
        let location = self.location()?;
        let response = self
            .storage
            .backend()
            .list(location, to_list_request(&options))
            .await?;
        debug!(
            "Listed page location={} items={} prefixes={} has_more={}",
            location,
            response.items.len(),
            response.prefixes.len(),
            response.next_page_token.is_some()
        );
        Ok(from_list_response(&self.storage, location, response))
    }

    /// Fetch every page and aggregate the children into one result.
    ///
    /// The result is not guaranteed to be consistent if objects are added or
    /// removed while the listing is in progress.
    pub async fn list_all(&self) -> Result<ListResult> {
        let location = self.location()?;
        let mut aggregated = ListResult::default();
        let mut page_token = None;
        let mut pages = 0usize;

        loop {
            let request = ListRequest {
                max_results: Some(DEFAULT_LIST_PAGE_SIZE),
                page_token: page_token.take(),
                ..Default::default()
            };
            let response = self.storage.backend().list(location, request).await?;
            let page = from_list_response(&self.storage, location, response);
            pages += 1;

            aggregated.items.extend(page.items);
            aggregated.prefixes.extend(page.prefixes);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(
            "Listed all location={} pages={} items={} prefixes={}",
            location,
            pages,
            aggregated.items.len(),
            aggregated.prefixes.len()
        );
        Ok(aggregated)
    }

    /// Download the object's bytes.
    ///
    /// When `max_size` is non-zero the object's declared size is checked
    /// first and `Ok(None)` is returned, without downloading, if it is larger.
    /// Zero disables the check.
    pub async fn get_data(&self, max_size: u64) -> Result<Option<Bytes>> {
        let location = self.location()?;
        let backend = self.storage.backend();

        if max_size > 0 {
            let size = from_resource(backend.metadata(location).await?).size;
            if size > max_size {
                info!(
                    "Skipping download location={} size={} max_size={}",
                    location, size, max_size
                );
                return Ok(None);
            }
        }

        let url = backend.download_url(location).await?;
        let data = self.storage.downloader().download(&url).await?;
        Ok(Some(data))
    }

    /// Upload raw bytes.
    ///
    /// The transfer runs on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// `Unsupported` when called outside a Tokio runtime.
    pub fn put_data(
        &self,
        data: impl Into<Bytes>,
        metadata: Option<SettableMetadata>,
    ) -> Result<UploadTask> {
        self.put(UploadSource::Bytes(data.into()), metadata)
    }

    /// Upload an opaque blob.
    ///
    /// # Errors
    ///
    /// `Unsupported`, before anything is sent, when the backend has no blob
    /// support or when called outside a Tokio runtime.
    pub fn put_blob(&self, blob: Blob, metadata: Option<SettableMetadata>) -> Result<UploadTask> {
        if !self.storage.capabilities().blobs {
            return Err(Error::Unsupported(
                "put_blob is not available on this platform".to_string(),
            ));
        }
        self.put(UploadSource::Blob(blob), metadata)
    }

    /// Upload a string the backend decodes according to `format`.
    ///
    /// For [`PutStringFormat::DataUrl`] the MIME type embedded in the URL is
    /// used when `metadata` sets no content type. Like [`Self::put_data`]
    /// this fails with `Unsupported` outside a Tokio runtime.
    pub fn put_string(
        &self,
        text: impl Into<String>,
        format: PutStringFormat,
        metadata: Option<SettableMetadata>,
    ) -> Result<UploadTask> {
        let source = UploadSource::Text {
            value: text.into(),
            format,
        };
        self.put(source, metadata)
    }

    fn put(&self, source: UploadSource, metadata: Option<SettableMetadata>) -> Result<UploadTask> {
        let location = self.location()?;
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(Error::Unsupported(
                "uploads must be started from within a Tokio runtime".to_string(),
            ));
        }
        let mut upload_metadata = to_upload_metadata(metadata.as_ref(), source.md5_hash());
        if upload_metadata.content_type.is_none() {
            upload_metadata.content_type = source.implied_content_type();
        }

        info!(
            "Starting upload location={} size_hint={}",
            location,
            source.size_hint()
        );
        let request = UploadRequest {
            body: source.into_body(),
            metadata: upload_metadata,
        };
        let handle = self.storage.backend().start_upload(location, request);
        Ok(UploadTask::new(handle))
    }

    /// Apply the set fields of `metadata` and return the updated metadata.
    pub async fn update_metadata(&self, metadata: SettableMetadata) -> Result<FullMetadata> {
        let location = self.location()?;
        let resource = self
            .storage
            .backend()
            .update_metadata(location, to_metadata_patch(&metadata))
            .await?;
        Ok(from_resource(resource))
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn require_files(&self, operation: &str) -> Result<()> {
        if self.storage.capabilities().files {
            Ok(())
        } else {
            Err(Error::Unsupported(format!(
                "{} requires local filesystem access",
                operation
            )))
        }
    }

    /// Upload the contents of a local file.
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn put_file(
        &self,
        path: impl AsRef<Path>,
        metadata: Option<SettableMetadata>,
    ) -> Result<UploadTask> {
        self.require_files("put_file")?;
        self.location()?;
        let data = tokio::fs::read(path.as_ref()).await?;
        self.put(UploadSource::Bytes(Bytes::from(data)), metadata)
    }

    /// Download the object into a local file.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn write_to_file(&self, path: impl Into<PathBuf>) -> Result<DownloadTask> {
        self.require_files("write_to_file")?;
        let location = self.location()?.clone();
        let storage = self.storage.clone();
        let path = path.into();

        let handle = TaskHandle::spawn(0, move |progress| async move {
            let backend = storage.backend();
            let size = from_resource(backend.metadata(&location).await?).size;
            progress.set_total(size);

            let url = backend.download_url(&location).await?;
            let data = storage.downloader().download(&url).await?;
            tokio::fs::write(&path, &data).await?;
            progress.advance(data.len() as u64);

            info!(
                "Wrote object location={} path={} bytes={}",
                location,
                path.display(),
                data.len()
            );
            Ok(data.len() as u64)
        });
        Ok(DownloadTask::new(handle))
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.handle.location() {
            Ok(location) => write!(f, "{}", location),
            Err(_) => write!(f, "{}", self.handle.raw()),
        }
    }
}

impl Debug for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Reference({}, binding={:?})", self, self.handle.binding())
    }
}
