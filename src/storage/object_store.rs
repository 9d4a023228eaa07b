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
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bytes::Bytes;
use chrono::Utc;
use object_store::{
    gcp::GoogleCloudStorageBuilder, local::LocalFileSystem, memory::InMemory, path::Path,
    Attribute, AttributeValue, Attributes, ClientOptions, GetOptions, GetResult, ObjectMeta,
    ObjectStore, ObjectStoreExt, PutOptions, PutPayload, RetryConfig,
};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::backend::{Capabilities, StorageBackend};
use super::config::{StorageConfig, StorageType, CONNECTION_OPTION_KEYS};
use super::encoding::decode_string;
use super::list::DEFAULT_LIST_PAGE_SIZE;
use super::location::{ObjectLocation, DELIMITER};
use super::native::{
    ListItem, ListRequest, ListResponse, MetadataPatch, ObjectResource, UploadBody,
    UploadMetadata, UploadRequest,
};
use super::task::TaskHandle;
use crate::error::{Error, Result};
use crate::util::retry::retry_with_max_retries;

/// Bucket name used when a memory or local backend is configured without one
pub const DEFAULT_BUCKET: &str = "default";

/// Host serving download URLs for GCS buckets unless overridden
pub const DEFAULT_DOWNLOAD_HOST: &str = "https://firebasestorage.googleapis.com";

// Reserved attribute keys, never surfaced as custom metadata.
const HASH_KEY: &str = "x-md5-hash";
const CREATED_KEY: &str = "x-time-created";
const METAGENERATION_KEY: &str = "x-metageneration";

/// Characters left unescaped in an object name inside a download URL
const OBJECT_NAME: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Storage backend over any `object_store` implementation
pub struct ObjectStoreBackend {
    pub config: StorageConfig,
    pub store: Arc<dyn ObjectStore>,
    bucket: String,
    download_base: Option<Url>,
    capabilities: Capabilities,
    persist_attributes: bool,
}

impl ObjectStoreBackend {
    /// Create a backend from configuration.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * Required configuration options are missing for the storage type
    /// * The object store cannot be built
    /// * `download_base_url` is not a valid URL
    pub async fn new(config: StorageConfig) -> Result<Self> {
        let (store, bucket) = Self::build_store(&config)?;

        let download_base = match config.get_option("download_base_url") {
            Some(base) => Some(Url::parse(base)?),
            None if config.storage_type == StorageType::Gcs => {
                Some(Url::parse(DEFAULT_DOWNLOAD_HOST)?)
            }
            None => None,
        };
        let persist_attributes = config.storage_type != StorageType::Local;

        info!(
            "Created storage backend type={} bucket={}",
            config.storage_type_str(),
            bucket
        );

        Ok(Self {
            config,
            store: Arc::from(store),
            bucket,
            download_base,
            capabilities: Self::default_capabilities(),
            persist_attributes,
        })
    }

    /// Wrap an existing store. Attributes are assumed to be persisted.
    pub fn from_store(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            config: StorageConfig::memory(),
            store,
            bucket: bucket.into(),
            download_base: None,
            capabilities: Self::default_capabilities(),
            persist_attributes: true,
        }
    }

    /// Advertise a reduced (or extended) capability set.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_download_base_url(mut self, base: Url) -> Self {
        self.download_base = Some(base);
        self
    }

    fn default_capabilities() -> Capabilities {
        Capabilities {
            blobs: true,
            files: cfg!(not(target_arch = "wasm32")),
        }
    }

    fn build_store(config: &StorageConfig) -> Result<(Box<dyn ObjectStore>, String)> {
        match config.storage_type {
            StorageType::Memory => Ok((Box::new(InMemory::new()), Self::bucket_or_default(config))),
            StorageType::Local => Self::build_local_store(config),
            StorageType::Gcs => Self::build_gcs_store(config),
        }
    }

    fn bucket_or_default(config: &StorageConfig) -> String {
        config
            .get_option("bucket")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BUCKET.to_string())
    }

    /// Build a local filesystem store rooted at the `path` option.
    fn build_local_store(config: &StorageConfig) -> Result<(Box<dyn ObjectStore>, String)> {
        let path = config
            .get_option("path")
            .ok_or_else(|| Error::Config("Local storage requires 'path' option".to_string()))?;
        let base_path = PathBuf::from(path);

        let canonical_path = base_path.canonicalize().map_err(|e| {
            Error::Config(format!(
                "Failed to resolve path '{}': {} (path must exist)",
                path, e
            ))
        })?;

        if !canonical_path.is_dir() {
            return Err(Error::Config(format!(
                "Base path is not a directory: {}",
                canonical_path.display()
            )));
        }

        let store = LocalFileSystem::new_with_prefix(&canonical_path)
            .map_err(|e| Error::Config(format!("Failed to create local store: {}", e)))?;

        Ok((Box::new(store), Self::bucket_or_default(config)))
    }

    fn build_connection_options(config: &StorageConfig) -> ClientOptions {
        let mut client_options = ClientOptions::default();
        if let Some(timeout_str) = config.get_option("timeout") {
            if timeout_str == "0" || timeout_str == "disabled" {
                client_options = client_options.with_timeout_disabled();
            } else if let Ok(sec) = timeout_str.parse::<u64>() {
                client_options = client_options.with_timeout(Duration::from_secs(sec))
            }
        };
        if let Some(connect_timeout_str) = config.get_option("connect_timeout") {
            if connect_timeout_str == "0" || connect_timeout_str == "disabled" {
                client_options = client_options.with_connect_timeout_disabled();
            } else if let Ok(sec) = connect_timeout_str.parse::<u64>() {
                client_options = client_options.with_connect_timeout(Duration::from_secs(sec))
            }
        }
        if let Some(pool_idle_timeout_str) = config.get_option("pool_idle_timeout") {
            if let Ok(sec) = pool_idle_timeout_str.parse::<u64>() {
                client_options = client_options.with_pool_idle_timeout(Duration::from_secs(sec))
            }
        }
        if let Some(pool_max_idle_per_host_str) = config.get_option("pool_max_idle_per_host") {
            if let Ok(max_idle) = pool_max_idle_per_host_str.parse::<usize>() {
                client_options = client_options.with_pool_max_idle_per_host(max_idle)
            }
        }
        client_options
    }

    fn build_retry_options(config: &StorageConfig) -> RetryConfig {
        let default_retry_config = RetryConfig::default();
        let max_retries = config
            .get_option("max_retries")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(default_retry_config.max_retries);
        let retry_timeout = config
            .get_option("retry_timeout")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(default_retry_config.retry_timeout);
        RetryConfig {
            backoff: Default::default(),
            max_retries,
            retry_timeout,
        }
    }

    /// Max retries for listing (defaults to 10 if not specified).
    fn get_max_retries(config: &StorageConfig) -> usize {
        config
            .get_option("max_retries")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(10)
    }

    /// Build a GCS store for the `bucket` option.
    fn build_gcs_store(config: &StorageConfig) -> Result<(Box<dyn ObjectStore>, String)> {
        let mut builder = GoogleCloudStorageBuilder::new()
            .with_client_options(Self::build_connection_options(config))
            .with_retry(Self::build_retry_options(config));
        let mut bucket: Option<&String> = None;

        for (key, value) in &config.options {
            match key.as_str() {
                "bucket" => {
                    bucket = Some(value);
                    builder = builder.with_bucket_name(value);
                }
                "service_account_key_path" => builder = builder.with_service_account_path(value),
                "service_account_key" => builder = builder.with_service_account_key(value),
                "download_base_url" | "proxy" => (),
                k if CONNECTION_OPTION_KEYS.contains(&k) => (),
                _ => {
                    tracing::warn!("Unknown GCS option: {}", key);
                }
            }
        }

        let bucket = bucket
            .cloned()
            .ok_or_else(|| Error::Config("GCS storage requires 'bucket' option".to_string()))?;

        let store = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create GCS store: {}", e)))?;

        Ok((Box::new(store), bucket))
    }

    /// Object path for `location`, rejecting buckets this backend does not serve.
    fn object_path(&self, location: &ObjectLocation) -> Result<Path> {
        if location.bucket() != self.bucket {
            return Err(Error::InvalidUrl(format!(
                "bucket '{}' is not served by this backend (bucket '{}')",
                location.bucket(),
                self.bucket
            )));
        }
        if location.is_root() {
            return Err(Error::InvalidArgument(
                "operation requires an object path, not the bucket root".to_string(),
            ));
        }
        Ok(Path::from_iter(location.path().split(DELIMITER)))
    }

    fn prefix_path(&self, location: &ObjectLocation) -> Result<Option<Path>> {
        if location.is_root() {
            if location.bucket() != self.bucket {
                return Err(Error::InvalidUrl(format!(
                    "bucket '{}' is not served by this backend (bucket '{}')",
                    location.bucket(),
                    self.bucket
                )));
            }
            return Ok(None);
        }
        self.object_path(location).map(Some)
    }
}

async fn head(store: &dyn ObjectStore, path: &Path) -> Result<GetResult> {
    let options = GetOptions {
        head: true,
        ..Default::default()
    };
    Ok(store.get_opts(path, options).await?)
}

async fn fetch_resource(store: &dyn ObjectStore, bucket: &str, path: &Path) -> Result<ObjectResource> {
    let result = head(store, path).await?;
    Ok(resource_from_parts(bucket, &result.meta, &result.attributes))
}

/// Object name as callers spelled it. Store paths keep each segment
/// percent-escaped, so the segments are decoded again here.
fn object_name(path: &Path) -> String {
    path.parts()
        .map(|part| percent_decode_str(part.as_ref()).decode_utf8_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Object metadata and stored attributes in the backend resource shape.
fn resource_from_parts(bucket: &str, meta: &ObjectMeta, attributes: &Attributes) -> ObjectResource {
    let mut resource = ObjectResource {
        bucket: bucket.to_string(),
        name: object_name(&meta.location),
        size: meta.size.to_string(),
        generation: meta.version.clone().or_else(|| meta.e_tag.clone()),
        metageneration: Some("1".to_string()),
        time_created: Some(meta.last_modified.to_rfc3339()),
        updated: Some(meta.last_modified.to_rfc3339()),
        ..Default::default()
    };

    let mut custom = HashMap::new();
    for (attribute, value) in attributes.iter() {
        let value: &str = value.as_ref();
        let value = value.to_string();
        match attribute {
            Attribute::ContentType => resource.content_type = Some(value),
            Attribute::CacheControl => resource.cache_control = Some(value),
            Attribute::ContentDisposition => resource.content_disposition = Some(value),
            Attribute::ContentEncoding => resource.content_encoding = Some(value),
            Attribute::ContentLanguage => resource.content_language = Some(value),
            Attribute::Metadata(key) => match &**key {
                HASH_KEY => resource.md5_hash = Some(value),
                CREATED_KEY => resource.time_created = Some(value),
                METAGENERATION_KEY => resource.metageneration = Some(value),
                _ => {
                    custom.insert(key.to_string(), value);
                }
            },
            _ => (),
        }
    }
    if !custom.is_empty() {
        resource.metadata = Some(custom);
    }
    resource
}

fn metadata_key(key: impl Into<String>) -> Attribute {
    Attribute::Metadata(Cow::Owned(key.into()))
}

fn upload_attributes(metadata: &UploadMetadata, time_created: String) -> Attributes {
    let mut attributes = Attributes::new();
    let fields = [
        (Attribute::ContentType, &metadata.content_type),
        (Attribute::CacheControl, &metadata.cache_control),
        (Attribute::ContentDisposition, &metadata.content_disposition),
        (Attribute::ContentEncoding, &metadata.content_encoding),
        (Attribute::ContentLanguage, &metadata.content_language),
        (metadata_key(HASH_KEY), &metadata.md5_hash),
    ];
    for (attribute, value) in fields {
        if let Some(value) = value {
            attributes.insert(attribute, AttributeValue::from(value.clone()));
        }
    }
    for (key, value) in metadata.metadata.iter().flatten() {
        attributes.insert(metadata_key(key.clone()), AttributeValue::from(value.clone()));
    }
    attributes.insert(metadata_key(CREATED_KEY), AttributeValue::from(time_created));
    attributes.insert(metadata_key(METAGENERATION_KEY), AttributeValue::from("1"));
    attributes
}

/// Merge a patch into stored attributes. An empty custom value removes the key.
fn apply_patch(attributes: &mut Attributes, patch: MetadataPatch) {
    let fields = [
        (Attribute::ContentType, patch.content_type),
        (Attribute::CacheControl, patch.cache_control),
        (Attribute::ContentDisposition, patch.content_disposition),
        (Attribute::ContentEncoding, patch.content_encoding),
        (Attribute::ContentLanguage, patch.content_language),
    ];
    for (attribute, value) in fields {
        if let Some(value) = value {
            attributes.insert(attribute, AttributeValue::from(value));
        }
    }
    for (key, value) in patch.metadata.into_iter().flatten() {
        if value.is_empty() {
            attributes.remove(&metadata_key(key));
        } else {
            attributes.insert(metadata_key(key), AttributeValue::from(value));
        }
    }

    let next = attributes
        .get(&metadata_key(METAGENERATION_KEY))
        .and_then(|value| {
            let value: &str = value.as_ref();
            value.parse::<u64>().ok()
        })
        .unwrap_or(1)
        + 1;
    attributes.insert(
        metadata_key(METAGENERATION_KEY),
        AttributeValue::from(next.to_string()),
    );
}

/// Names the namespace cannot represent as objects.
fn is_listable_name(name: &str) -> bool {
    !name.ends_with('/') && !name.contains("//")
}

fn encode_page_token(last_name: &str) -> String {
    URL_SAFE_NO_PAD.encode(last_name)
}

fn decode_page_token(token: &str) -> Result<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| Error::InvalidArgument(format!("invalid page token '{}'", token)))?;
    String::from_utf8(bytes)
        .map_err(|_| Error::InvalidArgument(format!("invalid page token '{}'", token)))
}

/// Cut one page out of a sorted listing.
///
/// Prefixes and objects share the page budget and are ordered by name; the
/// continuation token encodes the last name returned.
fn paginate(bucket: &str, mut entries: Vec<(String, bool)>, request: &ListRequest) -> Result<ListResponse> {
    entries.sort();

    let start_after = request
        .page_token
        .as_deref()
        .map(decode_page_token)
        .transpose()?;
    let page_size = request.max_results.unwrap_or(DEFAULT_LIST_PAGE_SIZE).max(1) as usize;

    let mut remaining = entries
        .into_iter()
        .filter(|(name, _)| start_after.as_ref().map_or(true, |after| name > after))
        .peekable();

    let mut response = ListResponse::default();
    let mut last_name = None;
    for (name, is_prefix) in remaining.by_ref().take(page_size) {
        if is_prefix {
            response.prefixes.push(name.clone());
        } else {
            response.items.push(ListItem {
                bucket: bucket.to_string(),
                name: name.clone(),
            });
        }
        last_name = Some(name);
    }

    if remaining.peek().is_some() {
        response.next_page_token = last_name.as_deref().map(encode_page_token);
    }
    Ok(response)
}

fn download_url_for(base: &Url, bucket: &str, name: &str) -> Result<Url> {
    let url = format!(
        "{}/v0/b/{}/o/{}?alt=media",
        base.as_str().trim_end_matches('/'),
        utf8_percent_encode(bucket, OBJECT_NAME),
        utf8_percent_encode(name, OBJECT_NAME)
    );
    Ok(Url::parse(&url)?)
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn delete(&self, location: &ObjectLocation) -> Result<()> {
        let path = self.object_path(location)?;
        // Stores treat deletes as idempotent; a missing object must still fail.
        head(self.store.as_ref(), &path).await?;
        self.store.delete(&path).await?;
        Ok(())
    }

    async fn download_url(&self, location: &ObjectLocation) -> Result<Url> {
        let path = self.object_path(location)?;
        let base = self.download_base.as_ref().ok_or_else(|| {
            Error::Unsupported(
                "download URLs require the 'download_base_url' option".to_string(),
            )
        })?;
        head(self.store.as_ref(), &path).await?;
        download_url_for(base, &self.bucket, location.path())
    }

    async fn metadata(&self, location: &ObjectLocation) -> Result<ObjectResource> {
        let path = self.object_path(location)?;
        fetch_resource(self.store.as_ref(), &self.bucket, &path).await
    }

    async fn update_metadata(
        &self,
        location: &ObjectLocation,
        patch: MetadataPatch,
    ) -> Result<ObjectResource> {
        let path = self.object_path(location)?;
        if !self.persist_attributes {
            return Err(Error::Unsupported(format!(
                "metadata updates are not supported by the {} store",
                self.config.storage_type_str()
            )));
        }

        let current = self.store.get_opts(&path, GetOptions::default()).await?;
        let mut attributes = current.attributes.clone();
        let data: Bytes = current.bytes().await?;

        apply_patch(&mut attributes, patch);
        let options = PutOptions {
            attributes,
            ..Default::default()
        };
        self.store
            .put_opts(&path, PutPayload::from(data), options)
            .await?;
        debug!("Updated metadata path={}", path);

        fetch_resource(self.store.as_ref(), &self.bucket, &path).await
    }

    async fn list(&self, location: &ObjectLocation, request: ListRequest) -> Result<ListResponse> {
        let prefix = self.prefix_path(location)?;
        let store = Arc::clone(&self.store);
        let max_retries = Self::get_max_retries(&self.config);

        let listing = retry_with_max_retries(
            max_retries,
            &format!("list({})", location),
            || async { store.list_with_delimiter(prefix.as_ref()).await },
        )
        .await?;

        let entries: Vec<(String, bool)> = listing
            .common_prefixes
            .iter()
            .map(|prefix| (format!("{}/", object_name(prefix)), true))
            .chain(
                listing
                    .objects
                    .iter()
                    .map(|meta| object_name(&meta.location))
                    .filter(|name| is_listable_name(name))
                    .map(|name| (name, false)),
            )
            .collect();

        paginate(&self.bucket, entries, &request)
    }

    fn start_upload(
        &self,
        location: &ObjectLocation,
        request: UploadRequest,
    ) -> TaskHandle<ObjectResource> {
        let path = match self.object_path(location) {
            Ok(path) => path,
            Err(e) => return TaskHandle::failed(e),
        };
        let store = Arc::clone(&self.store);
        let bucket = self.bucket.clone();
        let persist_attributes = self.persist_attributes;
        let size_hint = match &request.body {
            UploadBody::Bytes(data) | UploadBody::Blob(data) => data.len() as u64,
            UploadBody::String { value, .. } => value.len() as u64,
        };

        TaskHandle::spawn(size_hint, move |progress| async move {
            let (data, embedded_type) = match request.body {
                UploadBody::Bytes(data) | UploadBody::Blob(data) => (data, None),
                UploadBody::String { value, format } => {
                    let decoded = decode_string(&value, format)?;
                    (decoded.bytes, decoded.content_type)
                }
            };
            let len = data.len() as u64;
            progress.set_total(len);

            let mut metadata = request.metadata;
            if metadata.content_type.is_none() {
                metadata.content_type = embedded_type;
            }
            let attributes = if persist_attributes {
                upload_attributes(&metadata, Utc::now().to_rfc3339())
            } else {
                Attributes::new()
            };
            let options = PutOptions {
                attributes,
                ..Default::default()
            };

            store.put_opts(&path, PutPayload::from(data), options).await?;
            progress.advance(len);
            info!("Uploaded object path={} bytes={}", path, len);

            fetch_resource(store.as_ref(), &bucket, &path).await
        })
    }
}

impl Debug for ObjectStoreBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "StorageBackend(type=object_store, store={}, bucket={}, config={:?})",
            self.config.storage_type_str(),
            self.bucket,
            self.config
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::hash::md5_base64;
    use tempfile::TempDir;

    fn memory_backend() -> ObjectStoreBackend {
        ObjectStoreBackend::from_store(Arc::new(InMemory::new()), "test-bucket")
    }

    fn upload(metadata: UploadMetadata, data: &'static [u8]) -> UploadRequest {
        UploadRequest {
            body: UploadBody::Bytes(Bytes::from_static(data)),
            metadata,
        }
    }

    fn at(path: &str) -> ObjectLocation {
        ObjectLocation::new("test-bucket", path)
    }

    #[tokio::test]
    async fn test_upload_then_metadata() {
        let backend = memory_backend();
        let metadata = UploadMetadata {
            content_type: Some("text/plain".to_string()),
            md5_hash: Some(md5_base64(b"hello")),
            metadata: Some(HashMap::from([("owner".to_string(), "ana".to_string())])),
            ..Default::default()
        };

        let resource = backend
            .start_upload(&at("docs/a.txt"), upload(metadata, b"hello"))
            .await
            .unwrap();

        assert_eq!(resource.name, "docs/a.txt");
        assert_eq!(resource.size, "5");
        assert_eq!(resource.content_type.as_deref(), Some("text/plain"));
        assert_eq!(resource.md5_hash, Some(md5_base64(b"hello")));
        assert_eq!(resource.metageneration.as_deref(), Some("1"));
        assert_eq!(
            resource.metadata.unwrap().get("owner").map(String::as_str),
            Some("ana")
        );

        let fetched = backend.metadata(&at("docs/a.txt")).await.unwrap();
        assert_eq!(fetched.md5_hash, Some(md5_base64(b"hello")));
    }

    #[tokio::test]
    async fn test_upload_string_body_is_decoded() {
        let backend = memory_backend();
        let request = UploadRequest {
            body: UploadBody::String {
                value: "data:text/csv;base64,YSxiCg==".to_string(),
                format: "data_url",
            },
            metadata: UploadMetadata::default(),
        };

        let resource = backend.start_upload(&at("t.csv"), request).await.unwrap();

        assert_eq!(resource.size, "4");
        assert_eq!(resource.content_type.as_deref(), Some("text/csv"));
    }

    #[tokio::test]
    async fn test_upload_to_foreign_bucket_fails() {
        let backend = memory_backend();
        let location = ObjectLocation::new("other-bucket", "a.txt");

        let result = backend
            .start_upload(&location, upload(UploadMetadata::default(), b"x"))
            .await;

        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = memory_backend();
        backend
            .start_upload(&at("a.txt"), upload(UploadMetadata::default(), b"x"))
            .await
            .unwrap();

        backend.delete(&at("a.txt")).await.unwrap();

        assert!(matches!(
            backend.delete(&at("a.txt")).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            backend.metadata(&at("a.txt")).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_download_url() {
        let backend = memory_backend()
            .with_download_base_url(Url::parse("http://127.0.0.1:9199/").unwrap());
        backend
            .start_upload(&at("a b/c.txt"), upload(UploadMetadata::default(), b"x"))
            .await
            .unwrap();

        let url = backend.download_url(&at("a b/c.txt")).await.unwrap();

        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9199/v0/b/test-bucket/o/a%20b%2Fc.txt?alt=media"
        );
        assert!(matches!(
            backend.download_url(&at("missing.txt")).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_download_url_without_base() {
        let backend = memory_backend();
        backend
            .start_upload(&at("a.txt"), upload(UploadMetadata::default(), b"x"))
            .await
            .unwrap();

        assert!(matches!(
            backend.download_url(&at("a.txt")).await,
            Err(Error::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_update_metadata_merges() {
        let backend = memory_backend();
        let metadata = UploadMetadata {
            content_type: Some("text/plain".to_string()),
            metadata: Some(HashMap::from([
                ("keep".to_string(), "1".to_string()),
                ("drop".to_string(), "2".to_string()),
            ])),
            ..Default::default()
        };
        backend
            .start_upload(&at("a.txt"), upload(metadata, b"x"))
            .await
            .unwrap();

        let patch = MetadataPatch {
            cache_control: Some("no-cache".to_string()),
            metadata: Some(HashMap::from([
                ("drop".to_string(), String::new()),
                ("new".to_string(), "3".to_string()),
            ])),
            ..Default::default()
        };
        let updated = backend.update_metadata(&at("a.txt"), patch).await.unwrap();

        assert_eq!(updated.content_type.as_deref(), Some("text/plain"));
        assert_eq!(updated.cache_control.as_deref(), Some("no-cache"));
        assert_eq!(updated.metageneration.as_deref(), Some("2"));
        let custom = updated.metadata.unwrap();
        assert_eq!(custom.len(), 2);
        assert_eq!(custom["keep"], "1");
        assert_eq!(custom["new"], "3");
    }

    #[tokio::test]
    async fn test_list_pages() {
        let backend = memory_backend();
        for name in ["d/e.txt", "d/a.txt", "d/c.txt", "d/sub/x.txt", "d/b.txt"] {
            backend
                .start_upload(&at(name), upload(UploadMetadata::default(), b"x"))
                .await
                .unwrap();
        }

        let mut names = Vec::new();
        let mut prefixes = Vec::new();
        let mut page_token = None;
        let mut pages = 0;
        loop {
            let request = ListRequest {
                max_results: Some(2),
                page_token: page_token.take(),
                ..Default::default()
            };
            let page = backend.list(&at("d"), request).await.unwrap();
            assert!(page.items.len() + page.prefixes.len() <= 2);
            names.extend(page.items.into_iter().map(|item| item.name));
            prefixes.extend(page.prefixes);
            pages += 1;
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(names, ["d/a.txt", "d/b.txt", "d/c.txt", "d/e.txt"]);
        assert_eq!(prefixes, ["d/sub/"]);
    }

    #[tokio::test]
    async fn test_names_needing_escapes_round_trip() {
        let backend = memory_backend()
            .with_download_base_url(Url::parse("http://127.0.0.1:9199").unwrap());
        for name in ["dir/report#1.txt", "dir/100%.txt", "dir/[draft] a*b?.txt"] {
            let resource = backend
                .start_upload(&at(name), upload(UploadMetadata::default(), b"x"))
                .await
                .unwrap();
            assert_eq!(resource.name, name);
        }

        let page = backend.list(&at("dir"), ListRequest::default()).await.unwrap();
        let names: Vec<String> = page.items.into_iter().map(|item| item.name).collect();
        assert_eq!(names, ["dir/100%.txt", "dir/[draft] a*b?.txt", "dir/report#1.txt"]);

        for name in &names {
            let fetched = backend.metadata(&at(name)).await.unwrap();
            assert_eq!(&fetched.name, name);
        }

        let url = backend.download_url(&at("dir/report#1.txt")).await.unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9199/v0/b/test-bucket/o/dir%2Freport%231.txt?alt=media"
        );
    }

    #[tokio::test]
    async fn test_escaped_prefix_is_reported_decoded() {
        let backend = memory_backend();
        backend
            .start_upload(&at("a#b/inner.txt"), upload(UploadMetadata::default(), b"x"))
            .await
            .unwrap();

        let root = backend
            .list(&ObjectLocation::new("test-bucket", ""), ListRequest::default())
            .await
            .unwrap();
        assert_eq!(root.prefixes, ["a#b/"]);

        let nested = backend.list(&at("a#b"), ListRequest::default()).await.unwrap();
        assert_eq!(nested.items[0].name, "a#b/inner.txt");
    }

    #[tokio::test]
    async fn test_list_root_and_bad_token() {
        let backend = memory_backend();
        backend
            .start_upload(&at("top.txt"), upload(UploadMetadata::default(), b"x"))
            .await
            .unwrap();

        let page = backend
            .list(&ObjectLocation::new("test-bucket", ""), ListRequest::default())
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.next_page_token.is_none());

        let request = ListRequest {
            page_token: Some("***".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            backend.list(&at("d"), request).await,
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_listable_names() {
        assert!(is_listable_name("a/b.txt"));
        assert!(!is_listable_name("a/"));
        assert!(!is_listable_name("a//b"));
    }

    #[tokio::test]
    async fn test_local_backend() {
        let temp_dir = TempDir::new().unwrap();
        let config =
            StorageConfig::local().with_option("path", temp_dir.path().to_str().unwrap());
        let backend = ObjectStoreBackend::new(config).await.unwrap();
        let location = ObjectLocation::new(DEFAULT_BUCKET, "notes/a.txt");

        let resource = backend
            .start_upload(&location, upload(UploadMetadata::default(), b"local"))
            .await
            .unwrap();

        assert_eq!(resource.size, "5");
        assert!(temp_dir.path().join("notes").join("a.txt").exists());
        assert!(matches!(
            backend
                .update_metadata(&location, MetadataPatch::default())
                .await,
            Err(Error::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_local_backend_missing_path() {
        let result = ObjectStoreBackend::new(StorageConfig::local()).await;
        assert!(matches!(result, Err(Error::Config(_))));

        let config = StorageConfig::local().with_option("path", "/definitely/not/here");
        let result = ObjectStoreBackend::new(config).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_build_retry_options() {
        let config = StorageConfig::gcs()
            .with_option("max_retries", "3")
            .with_option("retry_timeout", "60");
        let retry = ObjectStoreBackend::build_retry_options(&config);

        assert_eq!(retry.max_retries, 3);
        assert_eq!(retry.retry_timeout, Duration::from_secs(60));
        assert_eq!(ObjectStoreBackend::get_max_retries(&config), 3);
        assert_eq!(
            ObjectStoreBackend::get_max_retries(&StorageConfig {
                storage_type: StorageType::Gcs,
                options: HashMap::new(),
            }),
            10
        );
    }
}
