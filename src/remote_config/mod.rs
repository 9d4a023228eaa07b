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

//! Remote configuration bindings
//!
//! [`RemoteConfig`] keeps in-app defaults, the last fetched template and the
//! active template, and answers typed reads from them. Fetching is delegated
//! to a [`RemoteConfigBackend`]; throttling reported by the backend surfaces
//! as [`crate::Error::FetchThrottled`] and is remembered until the window
//! closes.

pub mod backend;
pub mod config;
pub mod http;
pub mod value;

pub use backend::{FetchRequest, FetchResponse, RemoteConfigBackend, TemplateState};
pub use config::{RemoteConfigOptions, RemoteConfigSettings};
pub use http::HttpRemoteConfigBackend;
pub use value::{FetchStatus, RemoteConfigValue, ValueSource};

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{Error, FetchThrottled, Result};

/// A template as fetched from the backend.
#[derive(Debug, Clone, Default)]
struct Template {
    entries: HashMap<String, String>,
    etag: Option<String>,
    version: Option<String>,
}

impl Template {
    /// Same values and version. The etag only steers conditional fetches.
    fn same_values(&self, other: &Template) -> bool {
        self.entries == other.entries && self.version == other.version
    }
}

#[derive(Debug, Default)]
struct State {
    settings: RemoteConfigSettings,
    defaults: HashMap<String, String>,
    fetched: Option<Template>,
    active: Option<Template>,
    last_fetch_time: Option<DateTime<Utc>>,
    last_fetch_status: Option<FetchStatus>,
    throttle_end: Option<DateTime<Utc>>,
}

/// Remote-config client over an injected backend.
///
/// Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct RemoteConfig {
    backend: Arc<dyn RemoteConfigBackend>,
    initialized: Arc<OnceCell<()>>,
    state: Arc<RwLock<State>>,
}

impl RemoteConfig {
    pub fn new(backend: Arc<dyn RemoteConfigBackend>) -> Self {
        Self {
            backend,
            initialized: Arc::new(OnceCell::new()),
            state: Arc::new(RwLock::new(State::default())),
        }
    }

    /// Client talking to the REST fetch endpoint.
    pub fn from_options(options: RemoteConfigOptions) -> Self {
        Self::new(Arc::new(HttpRemoteConfigBackend::new(options)))
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Initialize the backend. Later calls return immediately once this succeeds.
    pub async fn ensure_initialized(&self) -> Result<()> {
        self.initialized
            .get_or_try_init(|| self.backend.ensure_initialized())
            .await?;
        Ok(())
    }

    /// Fetch the latest template without activating it.
    ///
    /// Served from cache when the last successful fetch is younger than the
    /// minimum fetch interval.
    ///
    /// # Errors
    ///
    /// `FetchThrottled` while a throttle window reported by the backend is
    /// open, and whatever the backend reports otherwise.
    pub async fn fetch(&self) -> Result<()> {
        self.ensure_initialized().await?;
        let now = Utc::now();

        let request = {
            let mut state = self.write();
            if let Some(end) = state.throttle_end.filter(|end| *end > now) {
                state.last_fetch_status = Some(FetchStatus::Throttle);
                return Err(FetchThrottled::new(Some(end), "fetch throttled by a previous response").into());
            }
            if let (Some(_), Some(last)) = (&state.fetched, state.last_fetch_time) {
                let interval = chrono::Duration::from_std(state.settings.minimum_fetch_interval)
                    .unwrap_or(chrono::Duration::MAX);
                if now.signed_duration_since(last) < interval {
                    debug!("Serving cached fetch last_fetch_time={}", last.to_rfc3339());
                    return Ok(());
                }
            }
            FetchRequest {
                etag: state.fetched.as_ref().and_then(|t| t.etag.clone()),
                timeout: state.settings.fetch_timeout,
            }
        };

        let result = self.backend.fetch(request).await;

        let mut state = self.write();
        match result {
            Ok(response) => {
                let previous = state.fetched.take().unwrap_or_default();
                let template = match response.state {
                    TemplateState::NoChange => Template {
                        etag: response.etag.or(previous.etag),
                        ..previous
                    },
                    TemplateState::Update | TemplateState::NoTemplate | TemplateState::EmptyConfig => {
                        Template {
                            entries: response.entries.unwrap_or_default(),
                            etag: response.etag,
                            version: response.template_version,
                        }
                    }
                };
                info!(
                    "Fetched remote config state={:?} entries={} version={:?}",
                    response.state,
                    template.entries.len(),
                    template.version
                );
                state.fetched = Some(template);
                state.last_fetch_time = Some(now);
                state.last_fetch_status = Some(FetchStatus::Success);
                state.throttle_end = None;
                Ok(())
            }
            Err(Error::FetchThrottled(throttled)) => {
                warn!("Remote config fetch throttled: {}", throttled);
                state.last_fetch_status = Some(FetchStatus::Throttle);
                state.throttle_end = throttled.throttle_end;
                Err(Error::FetchThrottled(throttled))
            }
            Err(e) => {
                warn!("Remote config fetch failed code={} error={}", e.code(), e);
                state.last_fetch_status = Some(FetchStatus::Failure);
                Err(e)
            }
        }
    }

    /// Make the last fetched template active.
    ///
    /// Returns `false` when nothing was fetched or the fetched template is
    /// already active.
    pub async fn activate(&self) -> Result<bool> {
        self.ensure_initialized().await?;
        let mut guard = self.write();
        let state = &mut *guard;
        match &state.fetched {
            Some(fetched) if !state.active.as_ref().is_some_and(|a| a.same_values(fetched)) => {
                state.active = Some(fetched.clone());
                debug!("Activated remote config version={:?}", fetched.version);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub async fn fetch_and_activate(&self) -> Result<bool> {
        self.fetch().await?;
        self.activate().await
    }

    /// Replace the fetch policy.
    pub fn set_config_settings(&self, settings: RemoteConfigSettings) -> Result<()> {
        settings.validate()?;
        self.write().settings = settings;
        Ok(())
    }

    pub fn settings(&self) -> RemoteConfigSettings {
        self.read().settings
    }

    /// Replace the in-app defaults.
    pub fn set_defaults<I, K, V>(&self, defaults: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.write().defaults = defaults
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
    }

    /// Replace the in-app defaults from a JSON object of scalars.
    ///
    /// Strings are taken as-is; numbers and booleans use their JSON text.
    pub fn set_defaults_json(&self, defaults: &serde_json::Value) -> Result<()> {
        let object = defaults.as_object().ok_or_else(|| {
            Error::InvalidArgument("defaults must be a JSON object".to_string())
        })?;
        let mut converted = HashMap::with_capacity(object.len());
        for (key, value) in object {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Bool(_) | serde_json::Value::Number(_) => value.to_string(),
                other => {
                    return Err(Error::InvalidArgument(format!(
                        "default for '{}' must be a string, number or boolean, got {}",
                        key, other
                    )))
                }
            };
            converted.insert(key.clone(), value);
        }
        self.set_defaults(converted);
        Ok(())
    }

    /// Every key with an active or default value.
    pub fn get_all(&self) -> HashMap<String, RemoteConfigValue> {
        let state = self.read();
        let mut all: HashMap<String, RemoteConfigValue> = state
            .defaults
            .iter()
            .map(|(k, v)| (k.clone(), RemoteConfigValue::new(v.clone(), ValueSource::Default)))
            .collect();
        for (k, v) in state.active.iter().flat_map(|t| t.entries.iter()) {
            all.insert(k.clone(), RemoteConfigValue::new(v.clone(), ValueSource::Remote));
        }
        all
    }

    /// Active value for `key`, else its default, else an empty static value.
    pub fn get_value(&self, key: &str) -> RemoteConfigValue {
        let state = self.read();
        if let Some(value) = state.active.as_ref().and_then(|t| t.entries.get(key)) {
            return RemoteConfigValue::new(value.clone(), ValueSource::Remote);
        }
        match state.defaults.get(key) {
            Some(value) => RemoteConfigValue::new(value.clone(), ValueSource::Default),
            None => RemoteConfigValue::missing(),
        }
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get_value(key).as_bool()
    }

    pub fn get_int(&self, key: &str) -> i64 {
        self.get_value(key).as_int()
    }

    pub fn get_double(&self, key: &str) -> f64 {
        self.get_value(key).as_double()
    }

    pub fn get_string(&self, key: &str) -> String {
        self.get_value(key).as_str().to_string()
    }

    /// Time of the last successful fetch.
    pub fn last_fetch_time(&self) -> Option<DateTime<Utc>> {
        self.read().last_fetch_time
    }

    pub fn last_fetch_status(&self) -> FetchStatus {
        self.read().last_fetch_status.unwrap_or(FetchStatus::NoFetchYet)
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RemoteConfig(status={:?}, initialized={})",
            self.last_fetch_status(),
            self.initialized.initialized()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays queued responses and records requests.
    #[derive(Default)]
    struct ScriptedBackend {
        responses: Mutex<VecDeque<Result<FetchResponse>>>,
        requests: Mutex<Vec<FetchRequest>>,
        inits: AtomicUsize,
    }

    impl ScriptedBackend {
        fn with(responses: Vec<Result<FetchResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                ..Default::default()
            })
        }

        fn fetches(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RemoteConfigBackend for ScriptedBackend {
        async fn ensure_initialized(&self) -> Result<()> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Unavailable("no scripted response".to_string())))
        }
    }

    fn update(entries: &[(&str, &str)], etag: &str) -> Result<FetchResponse> {
        Ok(FetchResponse {
            state: TemplateState::Update,
            entries: Some(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            template_version: Some("1".to_string()),
            etag: Some(etag.to_string()),
        })
    }

    fn no_cache(config: &RemoteConfig) {
        config
            .set_config_settings(
                RemoteConfigSettings::default().with_minimum_fetch_interval(Duration::ZERO),
            )
            .unwrap();
    }

    #[tokio::test]
    async fn test_values_before_fetch() {
        let config = RemoteConfig::new(ScriptedBackend::with(vec![]));
        config.set_defaults([("welcome", "hi"), ("enabled", "yes")]);

        assert_eq!(config.last_fetch_status(), FetchStatus::NoFetchYet);
        assert!(config.last_fetch_time().is_none());
        assert_eq!(config.get_string("welcome"), "hi");
        assert!(config.get_bool("enabled"));
        assert_eq!(config.get_value("welcome").source(), ValueSource::Default);
        assert_eq!(config.get_value("unknown"), RemoteConfigValue::missing());
    }

    #[tokio::test]
    async fn test_fetch_and_activate() {
        let backend = ScriptedBackend::with(vec![update(&[("welcome", "hello"), ("limit", "5")], "e1")]);
        let config = RemoteConfig::new(backend.clone());
        config.set_defaults([("welcome", "hi"), ("color", "blue")]);

        assert!(config.fetch_and_activate().await.unwrap());

        assert_eq!(config.last_fetch_status(), FetchStatus::Success);
        assert!(config.last_fetch_time().is_some());
        assert_eq!(config.get_string("welcome"), "hello");
        assert_eq!(config.get_int("limit"), 5);
        assert_eq!(config.get_value("color").source(), ValueSource::Default);

        let all = config.get_all();
        assert_eq!(all.len(), 3);
        assert_eq!(all["welcome"].source(), ValueSource::Remote);
        assert_eq!(backend.inits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_does_not_activate() {
        let config = RemoteConfig::new(ScriptedBackend::with(vec![update(&[("k", "remote")], "e1")]));
        config.set_defaults([("k", "default")]);

        config.fetch().await.unwrap();
        assert_eq!(config.get_string("k"), "default");

        assert!(config.activate().await.unwrap());
        assert_eq!(config.get_string("k"), "remote");
        assert!(!config.activate().await.unwrap());
    }

    #[tokio::test]
    async fn test_activate_without_fetch() {
        let config = RemoteConfig::new(ScriptedBackend::with(vec![]));

        assert!(!config.activate().await.unwrap());
    }

    #[tokio::test]
    async fn test_minimum_fetch_interval_serves_cache() {
        let backend = ScriptedBackend::with(vec![update(&[("k", "1")], "e1")]);
        let config = RemoteConfig::new(backend.clone());

        config.fetch().await.unwrap();
        config.fetch().await.unwrap();

        assert_eq!(backend.fetches(), 1);
        assert_eq!(config.last_fetch_status(), FetchStatus::Success);
    }

    #[tokio::test]
    async fn test_no_change_keeps_template_and_sends_etag() {
        let backend = ScriptedBackend::with(vec![
            update(&[("k", "1")], "e1"),
            Ok(FetchResponse::no_change(None)),
        ]);
        let config = RemoteConfig::new(backend.clone());
        no_cache(&config);

        assert!(config.fetch_and_activate().await.unwrap());
        assert!(!config.fetch_and_activate().await.unwrap());

        assert_eq!(config.get_string("k"), "1");
        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests[0].etag, None);
        assert_eq!(requests[1].etag.as_deref(), Some("e1"));
        assert_eq!(requests[1].timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_new_etag_alone_does_not_activate() {
        let backend = ScriptedBackend::with(vec![
            update(&[("k", "1")], "e1"),
            Ok(FetchResponse::no_change(Some("e2".to_string()))),
            update(&[("k", "1")], "e3"),
        ]);
        let config = RemoteConfig::new(backend.clone());
        no_cache(&config);

        assert!(config.fetch_and_activate().await.unwrap());
        assert!(!config.fetch_and_activate().await.unwrap());
        assert!(!config.fetch_and_activate().await.unwrap());

        assert_eq!(config.get_string("k"), "1");
        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests[2].etag.as_deref(), Some("e2"));
    }

    #[tokio::test]
    async fn test_throttle_is_passed_through_and_remembered() {
        let end = Utc::now() + chrono::Duration::minutes(5);
        let backend = ScriptedBackend::with(vec![Err(FetchThrottled::new(Some(end), "429").into())]);
        let config = RemoteConfig::new(backend.clone());
        no_cache(&config);

        match config.fetch().await {
            Err(Error::FetchThrottled(throttled)) => {
                assert_eq!(throttled.throttle_end, Some(end));
                assert!(throttled.retry_after(Utc::now()).unwrap() > Duration::from_secs(200));
            }
            other => panic!("Expected FetchThrottled, got {:?}", other),
        }
        assert_eq!(config.last_fetch_status(), FetchStatus::Throttle);

        // The window is still open, so the backend is not called again.
        assert!(matches!(config.fetch().await, Err(Error::FetchThrottled(_))));
        assert_eq!(backend.fetches(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_status() {
        let config = RemoteConfig::new(ScriptedBackend::with(vec![Err(Error::Unavailable(
            "offline".to_string(),
        ))]));

        assert!(matches!(config.fetch().await, Err(Error::Unavailable(_))));
        assert_eq!(config.last_fetch_status(), FetchStatus::Failure);
        assert!(config.last_fetch_time().is_none());
    }

    #[tokio::test]
    async fn test_settings() {
        let config = RemoteConfig::new(ScriptedBackend::with(vec![]));
        assert_eq!(config.settings(), RemoteConfigSettings::default());

        let settings = RemoteConfigSettings::default().with_fetch_timeout(Duration::from_secs(5));
        config.set_config_settings(settings).unwrap();
        assert_eq!(config.settings().fetch_timeout, Duration::from_secs(5));

        let invalid = RemoteConfigSettings::default().with_fetch_timeout(Duration::ZERO);
        assert!(config.set_config_settings(invalid).is_err());
        assert_eq!(config.settings(), settings);
    }

    #[tokio::test]
    async fn test_set_defaults_json() {
        let config = RemoteConfig::new(ScriptedBackend::with(vec![]));

        config
            .set_defaults_json(&serde_json::json!({"flag": true, "ratio": 0.5, "name": "x"}))
            .unwrap();

        assert!(config.get_bool("flag"));
        assert_eq!(config.get_double("ratio"), 0.5);
        assert_eq!(config.get_string("name"), "x");
        assert!(matches!(
            config.set_defaults_json(&serde_json::json!({"nested": {"a": 1}})),
            Err(Error::InvalidArgument(_))
        ));
        assert!(config.set_defaults_json(&serde_json::json!([1, 2])).is_err());
    }
}
