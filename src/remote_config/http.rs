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
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, ETAG, IF_NONE_MATCH, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use super::backend::{FetchRequest, FetchResponse, RemoteConfigBackend};
use super::config::RemoteConfigOptions;
use crate::error::{Error, FetchThrottled, Result};

const SDK_VERSION: &str = concat!("rust-", env!("CARGO_PKG_VERSION"));

/// Request body of the fetch endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchBody<'a> {
    sdk_version: &'a str,
    app_instance_id: &'a str,
    app_id: &'a str,
}

/// [`RemoteConfigBackend`] speaking the REST fetch protocol.
#[derive(Debug, Clone)]
pub struct HttpRemoteConfigBackend {
    client: Client,
    options: RemoteConfigOptions,
}

impl HttpRemoteConfigBackend {
    pub fn new(options: RemoteConfigOptions) -> Self {
        Self::with_client(options, Client::new())
    }

    pub fn with_client(options: RemoteConfigOptions, client: Client) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &RemoteConfigOptions {
        &self.options
    }

    /// `{endpoint}/v1/projects/{project}/namespaces/{namespace}:fetch?key={api_key}`
    pub fn fetch_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/v1/projects/{}/namespaces/{}:fetch",
            self.options.endpoint.trim_end_matches('/'),
            self.options.project_id,
            self.options.namespace
        ))?;
        url.query_pairs_mut()
            .append_pair("key", &self.options.api_key);
        Ok(url)
    }
}

/// Parse a `Retry-After` value, either delay seconds or an HTTP date.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<i64>() {
        return Some(now + chrono::Duration::seconds(seconds.max(0)));
    }
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

fn header_str(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Classify a non-success, non-throttle status.
fn status_error(status: StatusCode, body: String) -> Error {
    let message = format!("fetch failed with HTTP {}: {}", status.as_u16(), body.trim());
    match status.as_u16() {
        401 | 403 => Error::PermissionDenied(message),
        404 => Error::NotFound(message),
        400 => Error::InvalidArgument(message),
        408 | 500..=599 => Error::Unavailable(message),
        code => Error::unknown(format!("http-{}", code), message),
    }
}

#[async_trait]
impl RemoteConfigBackend for HttpRemoteConfigBackend {
    async fn ensure_initialized(&self) -> Result<()> {
        self.options.validate()?;
        let url = self.fetch_url()?;
        info!(
            "Remote config ready project={} namespace={} host={}",
            self.options.project_id,
            self.options.namespace,
            url.host_str().unwrap_or_default()
        );
        Ok(())
    }

    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        let body = FetchBody {
            sdk_version: SDK_VERSION,
            app_instance_id: self.options.app_instance_id.as_deref().unwrap_or_default(),
            app_id: &self.options.app_id,
        };
        let mut http_request = self
            .client
            .post(self.fetch_url()?)
            .timeout(request.timeout)
            .json(&body);
        http_request = http_request.header(IF_NONE_MATCH, request.etag.as_deref().unwrap_or("*"));

        let response = http_request.send().await?;
        let status = response.status();
        let etag = header_str(response.headers(), ETAG);
        debug!("Fetch response status={} etag={:?}", status, etag);

        match status {
            StatusCode::NOT_MODIFIED => Ok(FetchResponse::no_change(etag)),
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                let throttle_end = header_str(response.headers(), RETRY_AFTER)
                    .and_then(|value| parse_retry_after(&value, Utc::now()));
                warn!("Fetch throttled status={} until={:?}", status, throttle_end);
                let message = format!("fetch throttled with HTTP {}", status.as_u16());
                Err(FetchThrottled::new(throttle_end, message).into())
            }
            status if status.is_success() => {
                let mut fetched: FetchResponse = response.json().await?;
                fetched.etag = etag;
                Ok(fetched)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(status_error(status, body))
            }
        }
    }
}
