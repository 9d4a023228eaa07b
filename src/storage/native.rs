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

//! Backend-native data shapes.
//!
//! These mirror the JSON resources exchanged with the storage service: sizes
//! and generations are decimal strings, timestamps are RFC 3339 strings and
//! unset fields are omitted. Public shapes live in [`super::metadata`] and
//! [`super::list`]; the translation between the two is done there.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Full object resource as reported by the backend.
///
/// Unknown fields in a payload are dropped on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectResource {
    pub bucket: String,
    pub name: String,
    #[serde(default)]
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metageneration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

/// Metadata sent alongside an upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

/// Partial update of an object's writable metadata. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

/// One page request against a prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub delimiter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            delimiter: "/".to_string(),
            max_results: None,
            page_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub bucket: String,
    pub name: String,
}

/// One page of a delimited listing.
///
/// `prefixes` carry a trailing delimiter the way the service reports them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub items: Vec<ListItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Payload handed to the backend for an upload.
#[derive(Debug, Clone)]
pub enum UploadBody {
    Bytes(Bytes),
    Blob(Bytes),
    /// Text the backend decodes according to the format token.
    String { value: String, format: &'static str },
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub body: UploadBody,
    pub metadata: UploadMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_resource_drops_unknown_fields() {
        let json = r#"{
            "bucket": "b",
            "name": "a/b.txt",
            "size": "12",
            "md5Hash": "abc==",
            "kind": "storage#object",
            "selfLink": "https://example.com"
        }"#;
        let resource: ObjectResource = serde_json::from_str(json).unwrap();
        assert_eq!(resource.name, "a/b.txt");
        assert_eq!(resource.size, "12");
        assert_eq!(resource.md5_hash.as_deref(), Some("abc=="));
        assert!(resource.content_type.is_none());
    }

    #[test]
    fn test_upload_metadata_omits_unset_fields() {
        let metadata = UploadMetadata {
            content_type: Some("image/png".to_string()),
            md5_hash: Some("hash".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"contentType":"image/png","md5Hash":"hash"}"#);
    }

    #[test]
    fn test_list_response_deserialization() {
        let json = r#"{"prefixes":["a/"],"items":[{"bucket":"b","name":"x.txt"}],"nextPageToken":"t"}"#;
        let page: ListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.prefixes, vec!["a/".to_string()]);
        assert_eq!(page.items[0].name, "x.txt");
        assert_eq!(page.next_page_token.as_deref(), Some("t"));
    }

    #[test]
    fn test_list_request_default_delimiter() {
        let request = ListRequest::default();
        assert_eq!(request.delimiter, "/");
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"delimiter":"/"}"#
        );
    }
}
