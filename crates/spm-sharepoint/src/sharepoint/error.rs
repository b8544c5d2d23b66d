//! Error types for the SharePoint integration.
//!
//! All public API surfaces in this crate return `SharePointResult<T>`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Convenience alias.
pub type SharePointResult<T> = Result<T, SharePointError>;

/// Error codes specific to SharePoint operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SharePointErrorCode {
    /// Missing or contradictory configuration (credentials, site URL).
    Configuration,
    /// Authentication handshake or token error.
    AuthFailed,
    /// Access token expired and could not be renewed.
    TokenExpired,
    /// The identity lacks rights on the site or item (HTTP 403).
    InsufficientPermissions,
    /// File, folder or recycle-bin item not found (HTTP 404).
    NotFound,
    /// Conflict (name already taken, item locked).
    Conflict,
    /// Throttled (HTTP 429).
    RateLimited,
    /// Bad request / invalid parameter.
    InvalidRequest,
    /// A file operation was attempted before a folder context was bound.
    NoFolderContext,
    /// Reading a local file failed.
    LocalIo,
    /// Network / connectivity error.
    NetworkError,
    /// (De)serialization error.
    SerializationError,
    /// Catch-all internal error.
    InternalError,
}

impl fmt::Display for SharePointErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Structured error returned by every public function.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("[{code:?}] {message}{}", service_suffix(.service_error_code))]
pub struct SharePointError {
    pub code: SharePointErrorCode,
    pub message: String,
    pub status: Option<u16>,
    /// Code reported by the service itself, e.g.
    /// `-2147024894, System.IO.FileNotFoundException`.
    pub service_error_code: Option<String>,
}

/// Service codes SharePoint returns (with HTTP 400) when the target name is
/// taken: `SPException` file exists and `ERROR_ALREADY_EXISTS`.
const ALREADY_EXISTS_CODES: &[&str] = &["-2130575257", "-2147024713"];

fn is_already_exists(service_code: &str) -> bool {
    let number = service_code.split(',').next().unwrap_or_default().trim();
    ALREADY_EXISTS_CODES.contains(&number)
}

fn service_suffix(code: &Option<String>) -> String {
    match code {
        Some(c) => format!(" (service: {})", c),
        None => String::new(),
    }
}

impl SharePointError {
    /// Create from a code + message.
    pub fn new(code: SharePointErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            status: None,
            service_error_code: None,
        }
    }

    /// Shortcut: configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::new(SharePointErrorCode::Configuration, msg)
    }

    /// Shortcut: auth failure.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(SharePointErrorCode::AuthFailed, msg)
    }

    /// Shortcut: no folder context bound.
    pub fn no_folder_context() -> Self {
        Self::new(
            SharePointErrorCode::NoFolderContext,
            "No folder context set; call set_folder_ctx first",
        )
    }

    /// Shortcut: network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::new(SharePointErrorCode::NetworkError, msg)
    }

    /// Shortcut: internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(SharePointErrorCode::InternalError, msg)
    }

    /// Shortcut: not found.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(SharePointErrorCode::NotFound, msg)
    }

    /// Shortcut: conflict.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(SharePointErrorCode::Conflict, msg)
    }

    /// Build an error from a SharePoint REST error response body.
    pub fn from_rest_response(status: u16, body: &str) -> Self {
        let code = match status {
            401 => SharePointErrorCode::AuthFailed,
            403 => SharePointErrorCode::InsufficientPermissions,
            404 => SharePointErrorCode::NotFound,
            409 | 423 => SharePointErrorCode::Conflict,
            429 => SharePointErrorCode::RateLimited,
            _ if status >= 500 => SharePointErrorCode::InternalError,
            _ => SharePointErrorCode::InvalidRequest,
        };

        let (service_code, service_msg) = Self::parse_rest_error_body(body);
        let code = match service_code.as_deref() {
            Some(c) if is_already_exists(c) => SharePointErrorCode::Conflict,
            _ => code,
        };

        Self {
            code,
            message: service_msg
                .unwrap_or_else(|| format!("SharePoint REST error (HTTP {})", status)),
            status: Some(status),
            service_error_code: service_code,
        }
    }

    /// Extract the service error from either envelope:
    /// `{ "odata.error": { "code": "...", "message": { "value": "..." } } }`
    /// (nometadata / minimalmetadata) or `{ "error": { ... } }` (verbose).
    fn parse_rest_error_body(body: &str) -> (Option<String>, Option<String>) {
        let Ok(v) = serde_json::from_str::<serde_json::Value>(body) else {
            return (None, None);
        };
        let err = if v["odata.error"].is_object() {
            &v["odata.error"]
        } else {
            &v["error"]
        };
        let code = err["code"].as_str().map(String::from);
        let msg = err["message"]["value"]
            .as_str()
            .or_else(|| err["message"].as_str())
            .map(String::from);
        (code, msg)
    }

    /// Whether the service reported the target as missing.
    pub fn is_not_found(&self) -> bool {
        self.code == SharePointErrorCode::NotFound
    }
}

impl From<reqwest::Error> for SharePointError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {}", err))
        } else {
            Self::internal(format!("HTTP error: {}", err))
        }
    }
}

impl From<serde_json::Error> for SharePointError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(
            SharePointErrorCode::SerializationError,
            format!("JSON error: {}", err),
        )
    }
}

impl From<url::ParseError> for SharePointError {
    fn from(err: url::ParseError) -> Self {
        Self::configuration(format!("URL parse error: {}", err))
    }
}

impl From<std::io::Error> for SharePointError {
    fn from(err: std::io::Error) -> Self {
        Self::new(SharePointErrorCode::LocalIo, format!("Local I/O error: {}", err))
    }
}

impl From<quick_xml::Error> for SharePointError {
    fn from(err: quick_xml::Error) -> Self {
        Self::new(
            SharePointErrorCode::SerializationError,
            format!("XML error: {}", err),
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
