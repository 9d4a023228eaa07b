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
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::error::Result;

/// Template state reported by the backend for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateState {
    /// New entries are included in the response.
    Update,
    /// The template matches the ETag sent with the request.
    NoChange,
    /// No template is published for the namespace.
    NoTemplate,
    /// A template is published but holds no entries for this client.
    EmptyConfig,
}

/// What the façade asks the backend for.
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    /// ETag of the last fetched template, if any
    pub etag: Option<String>,
    pub timeout: Duration,
}

/// Backend-native fetch result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub state: TemplateState,
    #[serde(default)]
    pub entries: Option<HashMap<String, String>>,
    #[serde(default)]
    pub template_version: Option<String>,
    /// Carried in a response header rather than the body
    #[serde(skip)]
    pub etag: Option<String>,
}

impl FetchResponse {
    pub fn no_change(etag: Option<String>) -> Self {
        Self {
            state: TemplateState::NoChange,
            entries: None,
            template_version: None,
            etag,
        }
    }
}

/// Remote-config service the façade forwards to.
///
/// Throttling is reported as [`crate::Error::FetchThrottled`]; the façade
/// records it and passes it through to the caller unchanged.
#[async_trait]
pub trait RemoteConfigBackend: Send + Sync {
    /// Validate configuration and prepare for fetching. Called once.
    async fn ensure_initialized(&self) -> Result<()>;

    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse>;
}

impl Debug for dyn RemoteConfigBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "RemoteConfigBackend")
    }
}
