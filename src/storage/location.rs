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

//! Object identity: bucket + path, and how a path string is bound to it.
//!
//! Binding never touches the network. A string that cannot be resolved still
//! produces an [`ObjectHandle`]; the failure is reported when an operation is
//! invoked on it.

use percent_encoding::percent_decode_str;
use regex::Regex;
use std::fmt::{Display, Formatter};
use std::sync::LazyLock;
use url::Url;

use crate::error::{Error, Result};

/// Path delimiter of the storage namespace
pub const DELIMITER: char = '/';

const ABSOLUTE_URL_PREFIXES: [&str; 3] = ["gs://", "http://", "https://"];

static VERSIONED_OBJECT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/v[A-Za-z0-9_]+/b/([^/]+)/o(?:/(.*))?$").expect("valid regex")
});

static BUCKET_OBJECT_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([^/]+)/o(?:/(.*))?$").expect("valid regex"));

static CLOUD_STORAGE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([^/]+)(?:/(.*))?$").expect("valid regex"));

/// Whether `path` is a fully-qualified URL rather than a namespace path.
pub fn is_absolute_url(path: &str) -> bool {
    ABSOLUTE_URL_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// Drop empty segments so that `a//b/` and `/a/b` both become `a/b`.
pub fn normalize_path(path: &str) -> String {
    path.split(DELIMITER)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// A bucket and a normalized object path. The empty path is the bucket root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    bucket: String,
    path: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, path: &str) -> Self {
        Self {
            bucket: bucket.into(),
            path: normalize_path(path),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Last path segment, empty at the root.
    pub fn name(&self) -> &str {
        self.path
            .rsplit(DELIMITER)
            .next()
            .unwrap_or_default()
    }

    pub fn parent(&self) -> Option<ObjectLocation> {
        if self.is_root() {
            return None;
        }
        let parent = match self.path.rfind(DELIMITER) {
            Some(idx) => &self.path[..idx],
            None => "",
        };
        Some(ObjectLocation::new(self.bucket.clone(), parent))
    }

    pub fn child(&self, child_path: &str) -> ObjectLocation {
        let joined = format!("{}/{}", self.path, child_path);
        ObjectLocation::new(self.bucket.clone(), &joined)
    }

    pub fn root(&self) -> ObjectLocation {
        ObjectLocation::new(self.bucket.clone(), "")
    }
}

impl Display for ObjectLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.path)
    }
}

/// Which entry point a handle was resolved through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Relative to the storage root of the backend.
    Path,
    /// Resolved from an absolute `gs://` or `http(s)://` URL.
    Url,
}

/// Backend-native handle bound to one location at construction time.
#[derive(Debug, Clone)]
pub struct ObjectHandle {
    binding: Binding,
    raw: String,
    location: std::result::Result<ObjectLocation, String>,
}

impl ObjectHandle {
    /// Bind `path` relative to the root of `bucket`.
    pub fn from_path(bucket: &str, path: &str) -> Self {
        Self {
            binding: Binding::Path,
            raw: path.to_string(),
            location: Ok(ObjectLocation::new(bucket, path)),
        }
    }

    /// Bind an absolute URL. An unparseable URL yields an invalid handle.
    pub fn from_url(url: &str) -> Self {
        Self {
            binding: Binding::Url,
            raw: url.to_string(),
            location: parse_url(url),
        }
    }

    pub fn from_location(location: ObjectLocation) -> Self {
        Self {
            binding: Binding::Path,
            raw: location.path().to_string(),
            location: Ok(location),
        }
    }

    pub fn binding(&self) -> Binding {
        self.binding
    }

    /// The string this handle was bound from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn location(&self) -> Result<&ObjectLocation> {
        self.location
            .as_ref()
            .map_err(|reason| Error::InvalidUrl(format!("{} ({})", self.raw, reason)))
    }
}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        match (&self.location, &other.location) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

/// Resolve a `gs://` or `http(s)://` URL into a location.
pub fn parse_url(url: &str) -> std::result::Result<ObjectLocation, String> {
    if let Some(rest) = url.strip_prefix("gs://") {
        let (bucket, path) = rest.split_once(DELIMITER).unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err("missing bucket name".to_string());
        }
        return Ok(ObjectLocation::new(bucket, path));
    }

    let parsed = Url::parse(url).map_err(|e| e.to_string())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", parsed.scheme()));
    }
    let host = parsed.host_str().unwrap_or_default();
    let raw_path = parsed.path();

    let captures = VERSIONED_OBJECT_PATH
        .captures(raw_path)
        .or_else(|| BUCKET_OBJECT_PATH.captures(raw_path))
        .or_else(|| {
            if host == "storage.googleapis.com" || host.ends_with(".storage.googleapis.com") {
                CLOUD_STORAGE_PATH.captures(raw_path)
            } else {
                None
            }
        })
        .ok_or_else(|| format!("'{}' is not a storage object URL", url))?;

    let bucket = decode_component(captures.get(1).map_or("", |m| m.as_str()))?;
    let path = decode_component(captures.get(2).map_or("", |m| m.as_str()))?;
    Ok(ObjectLocation::new(bucket, &path))
}

fn decode_component(component: &str) -> std::result::Result<String, String> {
    percent_decode_str(component)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| format!("invalid percent-encoding: {}", e))
}
