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

//! Upload sources: raw bytes, opaque blobs and encoded strings.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::encoding::{
    parse_data_url, FORMAT_BASE64, FORMAT_BASE64URL, FORMAT_DATA_URL, FORMAT_RAW,
};
use super::hash::md5_base64;
use super::native::UploadBody;

/// How the text passed to `put_string` is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PutStringFormat {
    /// Plain text, stored as its UTF-8 bytes.
    Raw,
    /// Standard base64.
    Base64,
    /// URL-safe base64.
    Base64Url,
    /// A `data:` URL carrying its own MIME type.
    DataUrl,
}

impl PutStringFormat {
    /// Token understood by backends.
    pub fn token(self) -> &'static str {
        match self {
            PutStringFormat::Raw => FORMAT_RAW,
            PutStringFormat::Base64 => FORMAT_BASE64,
            PutStringFormat::Base64Url => FORMAT_BASE64URL,
            PutStringFormat::DataUrl => FORMAT_DATA_URL,
        }
    }
}

/// Opaque binary handle, optionally typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    data: Bytes,
    mime_type: Option<String>,
}

impl Blob {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }
}

/// Anything that can be uploaded through a reference.
#[derive(Debug, Clone)]
pub enum UploadSource {
    Bytes(Bytes),
    Blob(Blob),
    Text {
        value: String,
        format: PutStringFormat,
    },
}

impl UploadSource {
    /// Integrity hash computed locally before the upload starts.
    ///
    /// Text is hashed over its own bytes, not over the decoded payload.
    pub fn md5_hash(&self) -> String {
        match self {
            UploadSource::Bytes(bytes) => md5_base64(bytes),
            UploadSource::Blob(blob) => md5_base64(blob.bytes()),
            UploadSource::Text { value, .. } => md5_base64(value.as_bytes()),
        }
    }

    /// Content type implied by the source itself, used when the caller set none.
    pub fn implied_content_type(&self) -> Option<String> {
        match self {
            UploadSource::Bytes(_) => None,
            UploadSource::Blob(blob) => blob.mime_type().map(str::to_string),
            UploadSource::Text {
                value,
                format: PutStringFormat::DataUrl,
            } => parse_data_url(value)
                .ok()
                .and_then(|data_url| data_url.mime_type.map(str::to_string)),
            UploadSource::Text { .. } => None,
        }
    }

    /// Size known before the backend decodes anything, used as the initial task total.
    pub fn size_hint(&self) -> u64 {
        match self {
            UploadSource::Bytes(bytes) => bytes.len() as u64,
            UploadSource::Blob(blob) => blob.size() as u64,
            UploadSource::Text { value, .. } => value.len() as u64,
        }
    }

    pub(crate) fn into_body(self) -> UploadBody {
        match self {
            UploadSource::Bytes(bytes) => UploadBody::Bytes(bytes),
            UploadSource::Blob(blob) => UploadBody::Blob(blob.data),
            UploadSource::Text { value, format } => UploadBody::String {
                value,
                format: format.token(),
            },
        }
    }
}
