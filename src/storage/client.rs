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

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use super::backend::{Capabilities, StorageBackend};
use super::reference::Reference;
use crate::http::Downloader;

/// Root of a storage namespace: the injected backend plus the HTTP client
/// used for plain downloads. Cheap to clone.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn StorageBackend>,
    downloader: Arc<dyn Downloader>,
}

impl Storage {
    pub fn new(backend: Arc<dyn StorageBackend>, downloader: Arc<dyn Downloader>) -> Self {
        Self {
            backend,
            downloader,
        }
    }

    pub fn bucket(&self) -> &str {
        self.backend.bucket()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.backend.capabilities()
    }

    /// Reference to `path`, or to the bucket root when `path` is `None`.
    ///
    /// Absolute `gs://` and `http(s)://` URLs are resolved through the
    /// backend's URL entry point, everything else relative to the root.
    pub fn reference(&self, path: Option<&str>) -> Reference {
        Reference::new(self.clone(), path)
    }

    /// Reference resolved from an absolute URL, whatever its shape.
    pub fn reference_from_url(&self, url: &str) -> Reference {
        Reference::from_handle(self.clone(), self.backend.resolve_url(url))
    }

    pub(crate) fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub(crate) fn downloader(&self) -> &Arc<dyn Downloader> {
        &self.downloader
    }
}

impl Debug for Storage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Storage(backend={:?})", self.backend)
    }
}
