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

//! Public metadata shapes and their translation to and from backend resources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::native::{MetadataPatch, ObjectResource, UploadMetadata};

/// Writable subset of object metadata.
///
/// The content hash is never part of this shape; it is always computed
/// locally at upload time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettableMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_metadata: Option<HashMap<String, String>>,
}

impl SettableMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }

    pub fn with_content_disposition(mut self, content_disposition: impl Into<String>) -> Self {
        self.content_disposition = Some(content_disposition.into());
        self
    }

    pub fn with_content_encoding(mut self, content_encoding: impl Into<String>) -> Self {
        self.content_encoding = Some(content_encoding.into());
        self
    }

    pub fn with_content_language(mut self, content_language: impl Into<String>) -> Self {
        self.content_language = Some(content_language.into());
        self
    }

    /// Add one custom key/value pair.
    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Full metadata of a stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullMetadata {
    pub bucket: String,
    pub full_path: String,
    pub name: String,
    pub size: u64,
    pub generation: Option<String>,
    pub metageneration: Option<String>,
    pub md5_hash: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_type: Option<String>,
    pub custom_metadata: HashMap<String, String>,
    pub time_created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

/// Settable metadata plus the locally computed hash, in the backend upload shape.
pub fn to_upload_metadata(metadata: Option<&SettableMetadata>, md5_hash: String) -> UploadMetadata {
    let metadata = metadata.cloned().unwrap_or_default();
    UploadMetadata {
        content_type: metadata.content_type,
        cache_control: metadata.cache_control,
        content_disposition: metadata.content_disposition,
        content_encoding: metadata.content_encoding,
        content_language: metadata.content_language,
        md5_hash: Some(md5_hash),
        metadata: metadata.custom_metadata,
    }
}

/// Settable metadata in the backend update shape.
pub fn to_metadata_patch(metadata: &SettableMetadata) -> MetadataPatch {
    MetadataPatch {
        content_type: metadata.content_type.clone(),
        cache_control: metadata.cache_control.clone(),
        content_disposition: metadata.content_disposition.clone(),
        content_encoding: metadata.content_encoding.clone(),
        content_language: metadata.content_language.clone(),
        metadata: metadata.custom_metadata.clone(),
    }
}

/// Backend resource in the public read shape.
///
/// A size that does not parse is reported as zero and unparseable timestamps
/// as absent.
pub fn from_resource(resource: ObjectResource) -> FullMetadata {
    let name = resource
        .name
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();

    FullMetadata {
        bucket: resource.bucket,
        name,
        size: resource.size.parse().unwrap_or(0),
        generation: resource.generation,
        metageneration: resource.metageneration,
        md5_hash: resource.md5_hash,
        cache_control: resource.cache_control,
        content_disposition: resource.content_disposition,
        content_encoding: resource.content_encoding,
        content_language: resource.content_language,
        content_type: resource.content_type,
        custom_metadata: resource.metadata.unwrap_or_default(),
        time_created: resource.time_created.as_deref().and_then(parse_timestamp),
        updated: resource.updated.as_deref().and_then(parse_timestamp),
        full_path: resource.name,
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
