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

//! Error types shared by the storage and remote-config bindings.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::fmt::{Display, Formatter};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to callers of the bindings.
///
/// Backend failures are classified into one of these kinds and re-surfaced
/// with the backend's message preserved.
#[derive(Error, Debug)]
pub enum Error {
    /// The object does not exist.
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The backend rejected the caller's credentials or rules.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Transient network or service failure.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The current platform or backend cannot perform the operation.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// The transfer task was cancelled before it completed.
    #[error("Operation canceled: {0}")]
    Canceled(String),

    /// A caller-supplied argument failed local validation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A reference was bound to a URL that the backend cannot serve.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The backend could not be constructed from its configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A remote-config fetch was rate limited.
    #[error(transparent)]
    FetchThrottled(#[from] FetchThrottled),

    /// Backend error not otherwise classified.
    #[error("Unknown error ({code}): {message}")]
    Unknown { code: String, message: String },
}

/// Result type for all bindings operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an [`Error::Unknown`] from a backend code and message.
    pub fn unknown(code: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Unknown {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Machine-readable token identifying the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "object-not-found",
            Error::PermissionDenied(_) => "unauthorized",
            Error::Unavailable(_) => "unavailable",
            Error::Unsupported(_) => "unsupported",
            Error::Canceled(_) => "canceled",
            Error::InvalidArgument(_) => "invalid-argument",
            Error::InvalidUrl(_) => "invalid-url",
            Error::Config(_) => "invalid-config",
            Error::FetchThrottled(_) => "throttled",
            Error::Unknown { .. } => "unknown",
        }
    }

    /// Whether the failure is transient on the backend side.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Unavailable(_) | Error::FetchThrottled(_))
    }
}

/// Signal that a remote-config fetch was throttled by the backend.
///
/// Carried through the error taxonomy unmodified; `throttle_end` is the
/// earliest instant at which the backend will accept another fetch, when the
/// backend reported one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchThrottled {
    pub throttle_end: Option<DateTime<Utc>>,
    pub message: String,
}

impl FetchThrottled {
    pub fn new(throttle_end: Option<DateTime<Utc>>, message: impl Into<String>) -> Self {
        Self {
            throttle_end,
            message: message.into(),
        }
    }

    /// Time left until the throttle window closes, measured from `now`.
    ///
    /// Returns `None` when the backend gave no end time, and a zero duration
    /// once the window has already passed.
    pub fn retry_after(&self, now: DateTime<Utc>) -> Option<Duration> {
        let end = self.throttle_end?;
        Some((end - now).to_std().unwrap_or(Duration::ZERO))
    }
}

impl Display for FetchThrottled {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.throttle_end {
            Some(end) => write!(
                f,
                "Fetch throttled until {}: {}",
                end.to_rfc3339(),
                self.message
            ),
            None => write!(f, "Fetch throttled: {}", self.message),
        }
    }
}

impl std::error::Error for FetchThrottled {}

impl From<object_store::Error> for Error {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => Error::NotFound(path),
            object_store::Error::PermissionDenied { path, .. }
            | object_store::Error::Unauthenticated { path, .. } => Error::PermissionDenied(path),
            object_store::Error::NotSupported { .. }
            | object_store::Error::NotImplemented { .. } => Error::Unsupported(err.to_string()),
            object_store::Error::InvalidPath { .. } => Error::InvalidArgument(err.to_string()),
            object_store::Error::Generic { store, source } => {
                let message = error_chain(&*source);
                let transport_failure = source
                    .downcast_ref::<reqwest::Error>()
                    .is_some_and(|e| e.is_connect() || e.is_timeout());
                if transport_failure || is_transient_message(&message) {
                    Error::Unavailable(message)
                } else {
                    Error::unknown(store, message)
                }
            }
            other => Error::unknown("object_store", other.to_string()),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return Error::Unavailable(err.to_string());
        }
        match err.status().map(|s| s.as_u16()) {
            Some(404) => Error::NotFound(err.to_string()),
            Some(401) | Some(403) => Error::PermissionDenied(err.to_string()),
            Some(408) | Some(429) | Some(500..=599) => Error::Unavailable(err.to_string()),
            Some(status) => Error::unknown(format!("http-{}", status), err.to_string()),
            None => Error::unknown("http", err.to_string()),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::InvalidArgument(format!("invalid base64 payload: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::unknown("invalid-response", err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Error::PermissionDenied(err.to_string()),
            _ => Error::unknown("io", err.to_string()),
        }
    }
}

/// Server-side failure wording, matched case-insensitively.
const SERVER_FAILURE_MARKERS: [&str; 7] = [
    "server error",
    "service unavailable",
    "bad gateway",
    "gateway timeout",
    "too many requests",
    "error sending request",
    "connection refused",
];

/// A 5xx status reported after the client gave up retrying.
static RETRIES_EXHAUSTED_5XX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bretries\b.*\b5\d\d\b").expect("valid regex"));

/// `err` followed by every error in its source chain.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Connection-level failures the retry helper treats as retryable.
pub(crate) fn is_connection_error_message(message: &str) -> bool {
    message.contains("ConnectionReset")
        || message.contains("BrokenPipe")
        || message.contains("Interrupted")
        || message.contains("TimedOut")
        || message.contains("timed out")
}

/// Failures that may succeed if repeated later: connection errors, and
/// server errors left over once the store's own retries ran out.
pub(crate) fn is_transient_message(message: &str) -> bool {
    if is_connection_error_message(message) {
        return true;
    }
    let lowered = message.to_lowercase();
    SERVER_FAILURE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
        || RETRIES_EXHAUSTED_5XX.is_match(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::NotFound("a".into()).code(), "object-not-found");
        assert_eq!(Error::PermissionDenied("a".into()).code(), "unauthorized");
        assert_eq!(Error::Unavailable("a".into()).code(), "unavailable");
        assert_eq!(Error::Unsupported("a".into()).code(), "unsupported");
        assert_eq!(Error::Canceled("a".into()).code(), "canceled");
        assert_eq!(Error::unknown("x", "y").code(), "unknown");
    }

    #[test]
    fn test_unknown_display_keeps_backend_code() {
        let error = Error::unknown("storage/quota-exceeded", "Quota exceeded");
        assert_eq!(
            error.to_string(),
            "Unknown error (storage/quota-exceeded): Quota exceeded"
        );
    }

    #[test]
    fn test_object_store_not_found_conversion() {
        let err = object_store::Error::NotFound {
            path: "images/cat.png".to_string(),
            source: "missing".into(),
        };
        match Error::from(err) {
            Error::NotFound(path) => assert_eq!(path, "images/cat.png"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_object_store_permission_conversion() {
        let err = object_store::Error::PermissionDenied {
            path: "secret".to_string(),
            source: "denied".into(),
        };
        assert!(matches!(Error::from(err), Error::PermissionDenied(_)));
    }

    #[test]
    fn test_object_store_generic_timeout_is_unavailable() {
        let err = object_store::Error::Generic {
            store: "GCS",
            source: "operation timed out".into(),
        };
        let converted = Error::from(err);
        assert!(matches!(converted, Error::Unavailable(_)));
        assert!(converted.is_transient());
    }

    #[test]
    fn test_object_store_retries_exhausted_is_unavailable() {
        let err = object_store::Error::Generic {
            store: "GCS",
            source: "Error performing GET https://storage.googleapis.com/b/o in 2.1s, \
                     after 10 retries, max_retries: 10, retry_timeout: 180s - \
                     Server returned non-2xx status code: 503 Service Unavailable"
                .into(),
        };
        let converted = Error::from(err);
        assert!(matches!(converted, Error::Unavailable(_)));
        assert_eq!(converted.code(), "unavailable");
    }

    #[test]
    fn test_object_store_connection_failure_is_unavailable() {
        let err = object_store::Error::Generic {
            store: "GCS",
            source: "error sending request for url (https://storage.googleapis.com/b)".into(),
        };
        assert!(matches!(Error::from(err), Error::Unavailable(_)));
    }

    #[test]
    fn test_transient_message_classification() {
        assert!(is_transient_message("after 3 retries: HTTP status 502"));
        assert!(is_transient_message("tcp connect error: Connection refused (os error 111)"));
        assert!(is_transient_message("Server error, body contains Error"));
        assert!(!is_transient_message("Object at location file_503.txt not found"));
        assert!(!is_connection_error_message("503 Service Unavailable"));
    }

    #[test]
    fn test_object_store_generic_other_is_unknown() {
        let err = object_store::Error::Generic {
            store: "GCS",
            source: "bad things".into(),
        };
        match Error::from(err) {
            Error::Unknown { code, message } => {
                assert_eq!(code, "GCS");
                assert_eq!(message, "bad things");
            }
            other => panic!("Expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "File not found").into();
        assert!(matches!(err, Error::NotFound(_)));

        let err: Error = io::Error::other("boom").into();
        assert!(matches!(err, Error::Unknown { .. }));
    }

    #[test]
    fn test_url_parse_error_conversion() {
        let err: Error = url::ParseError::EmptyHost.into();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn test_throttle_passes_through_unmodified() {
        let end = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let signal = FetchThrottled::new(Some(end), "too many fetches");
        let err: Error = signal.clone().into();

        match err {
            Error::FetchThrottled(inner) => assert_eq!(inner, signal),
            other => panic!("Expected FetchThrottled, got {:?}", other),
        }
    }

    #[test]
    fn test_throttle_retry_after() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let signal = FetchThrottled::new(Some(now + chrono::Duration::seconds(90)), "slow down");
        assert_eq!(signal.retry_after(now), Some(Duration::from_secs(90)));

        let later = now + chrono::Duration::seconds(120);
        assert_eq!(signal.retry_after(later), Some(Duration::ZERO));

        let unknown = FetchThrottled::new(None, "slow down");
        assert_eq!(unknown.retry_after(now), None);
    }

    #[test]
    fn test_throttle_display() {
        let signal = FetchThrottled::new(None, "quota");
        assert_eq!(signal.to_string(), "Fetch throttled: quota");
    }
}
