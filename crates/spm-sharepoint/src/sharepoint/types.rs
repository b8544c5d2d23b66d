//! Shared types for the SharePoint document-library integration.
//!
//! Models cover configuration, credentials, authentication grants, remote
//! files and folders, the bound folder context, recycle-bin items, and the
//! per-item reports returned by batch operations.

use crate::sharepoint::error::{SharePointError, SharePointResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════
//  Configuration
// ═══════════════════════════════════════════════════════════════════════

/// Configuration for a SharePoint site connection.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SharePointConfig {
    /// Absolute site URL, e.g. `https://contoso.sharepoint.com/sites/Team`.
    pub site_url: String,
    /// Server-relative base used to address libraries.  Defaults to the
    /// path of `site_url` (e.g. `/sites/Team`).
    pub relative_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Timeout in seconds for HTTP calls.  Default: 60.
    pub timeout_sec: u64,
    /// Security token service used by the user-credential flow.
    pub sts_url: String,
    /// Azure ACS base used by the client-credential flow.
    pub acs_url: String,
}

impl Default for SharePointConfig {
    fn default() -> Self {
        Self {
            site_url: String::new(),
            relative_url: None,
            username: None,
            password: None,
            client_id: None,
            client_secret: None,
            timeout_sec: 60,
            sts_url: "https://login.microsoftonline.com/extSTS.srf".into(),
            acs_url: "https://accounts.accesscontrol.windows.net".into(),
        }
    }
}

impl fmt::Debug for SharePointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharePointConfig")
            .field("site_url", &self.site_url)
            .field("relative_url", &self.relative_url)
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .field("timeout_sec", &self.timeout_sec)
            .field("sts_url", &self.sts_url)
            .field("acs_url", &self.acs_url)
            .finish_non_exhaustive()
    }
}

impl SharePointConfig {
    /// Validate the credential fields and return the single pair in use.
    pub fn credentials(&self) -> SharePointResult<Credentials> {
        Credentials::from_parts(
            self.username.as_deref(),
            self.password.as_deref(),
            self.client_id.as_deref(),
            self.client_secret.as_deref(),
        )
    }

    /// Parsed, trailing-slash-free site URL.
    pub fn site(&self) -> SharePointResult<url::Url> {
        let trimmed = self.site_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(SharePointError::configuration("site_url is required"));
        }
        let url = url::Url::parse(trimmed)?;
        if url.host_str().is_none() {
            return Err(SharePointError::configuration(format!(
                "site_url has no host: {}",
                trimmed
            )));
        }
        Ok(url)
    }

    /// Base server-relative URL for folder addressing.
    pub fn base_relative_url(&self) -> SharePointResult<String> {
        match self.relative_url.as_deref() {
            Some(r) => Ok(r.trim_end_matches('/').to_string()),
            None => Ok(self.site()?.path().trim_end_matches('/').to_string()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Credentials / Authentication
// ═══════════════════════════════════════════════════════════════════════

/// The single credential pair a session authenticates with.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Resource-owner username + password (SAML federation).
    User { username: String, password: String },
    /// App-only client id + secret (ACS).
    Client {
        client_id: String,
        client_secret: String,
    },
}

impl Credentials {
    /// Build from optional fields.  Exactly one complete pair must be
    /// present; an empty string counts as absent.
    pub fn from_parts(
        username: Option<&str>,
        password: Option<&str>,
        client_id: Option<&str>,
        client_secret: Option<&str>,
    ) -> SharePointResult<Self> {
        fn present(v: Option<&str>) -> Option<&str> {
            v.filter(|s| !s.is_empty())
        }
        let user = (present(username), present(password));
        let client = (present(client_id), present(client_secret));

        let user_any = user.0.is_some() || user.1.is_some();
        let client_any = client.0.is_some() || client.1.is_some();

        match (user, client) {
            _ if user_any && client_any => Err(SharePointError::configuration(
                "Provide either username and password or client ID and secret, not both.",
            )),
            ((Some(u), Some(p)), _) => Ok(Self::User {
                username: u.to_string(),
                password: p.to_string(),
            }),
            (_, (Some(id), Some(secret))) => Ok(Self::Client {
                client_id: id.to_string(),
                client_secret: secret.to_string(),
            }),
            _ if user_any || client_any => Err(SharePointError::configuration(
                "Incomplete credentials: both halves of the pair are required.",
            )),
            _ => Err(SharePointError::configuration(
                "Provide either username and password or client ID and secret.",
            )),
        }
    }

    pub fn kind(&self) -> CredentialKind {
        match self {
            Self::User { .. } => CredentialKind::User,
            Self::Client { .. } => CredentialKind::Client,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User { username, .. } => f
                .debug_struct("User")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Client { client_id, .. } => f
                .debug_struct("Client")
                .field("client_id", client_id)
                .field("client_secret", &"***")
                .finish(),
        }
    }
}

/// Which credential mode a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CredentialKind {
    User,
    Client,
}

/// How authenticated requests are decorated.
#[derive(Clone)]
pub enum AuthHandle {
    /// `Authorization: Bearer …` (app-only).
    Bearer(String),
    /// `Cookie: FedAuth=…; rtFa=…` (user federation).  POSTs also need a
    /// form digest.
    Cookies { fed_auth: String, rt_fa: String },
}

impl AuthHandle {
    pub fn needs_form_digest(&self) -> bool {
        matches!(self, Self::Cookies { .. })
    }

    pub fn cookie_header(&self) -> Option<String> {
        match self {
            Self::Cookies { fed_auth, rt_fa } => {
                Some(format!("FedAuth={}; rtFa={}", fed_auth, rt_fa))
            }
            Self::Bearer(_) => None,
        }
    }
}

impl fmt::Debug for AuthHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => write!(f, "Bearer(***)"),
            Self::Cookies { .. } => write!(f, "Cookies(***)"),
        }
    }
}

/// Result of an authentication handshake.
#[derive(Debug, Clone)]
pub struct AuthGrant {
    pub handle: AuthHandle,
    /// `None` when the service does not announce an expiry (cookies).
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthGrant {
    /// Whether the grant has expired (with 60-second grace).
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Utc::now() >= at - chrono::Duration::seconds(60),
            None => false,
        }
    }
}

/// `WWW-Authenticate` challenge returned by `/_vti_bin/client.svc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmChallenge {
    /// Tenant id.
    pub realm: String,
    /// SharePoint principal id (`00000003-0000-0ff1-ce00-000000000000`).
    pub principal_id: String,
}

/// Request digest required by cookie-authenticated POSTs.
#[derive(Debug, Clone)]
pub struct FormDigest {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl FormDigest {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at - chrono::Duration::seconds(30)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Files & Folders
// ═══════════════════════════════════════════════════════════════════════

/// A file in a document library (`SP.File`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteFile {
    pub name: String,
    pub server_relative_url: String,
    #[serde(default, deserialize_with = "de_lenient_u64")]
    pub length: u64,
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub time_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_last_modified: Option<DateTime<Utc>>,
}

/// A folder in a document library (`SP.Folder`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteFolder {
    pub name: String,
    pub server_relative_url: String,
    #[serde(default, deserialize_with = "de_lenient_u64")]
    pub item_count: u64,
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub time_last_modified: Option<DateTime<Utc>>,
}

/// The library/folder every file operation implicitly targets.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderContext {
    pub library_name: String,
    pub folder_name: String,
    /// `{base}/{library}/{folder}` as sent to the service.
    pub server_relative_url: String,
    pub folder: RemoteFolder,
}

// ═══════════════════════════════════════════════════════════════════════
//  Recycle bin
// ═══════════════════════════════════════════════════════════════════════

/// `SP.RecycleBinItemType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum RecycleBinItemType {
    File,
    FileVersion,
    ListItem,
    List,
    Folder,
    FolderWithLists,
    Attachment,
    ListItemVersion,
    CascadeParent,
    Web,
    Other(i32),
}

impl From<i32> for RecycleBinItemType {
    fn from(v: i32) -> Self {
        match v {
            1 => Self::File,
            2 => Self::FileVersion,
            3 => Self::ListItem,
            4 => Self::List,
            5 => Self::Folder,
            6 => Self::FolderWithLists,
            7 => Self::Attachment,
            8 => Self::ListItemVersion,
            9 => Self::CascadeParent,
            10 => Self::Web,
            other => Self::Other(other),
        }
    }
}

impl From<RecycleBinItemType> for i32 {
    fn from(t: RecycleBinItemType) -> Self {
        match t {
            RecycleBinItemType::File => 1,
            RecycleBinItemType::FileVersion => 2,
            RecycleBinItemType::ListItem => 3,
            RecycleBinItemType::List => 4,
            RecycleBinItemType::Folder => 5,
            RecycleBinItemType::FolderWithLists => 6,
            RecycleBinItemType::Attachment => 7,
            RecycleBinItemType::ListItemVersion => 8,
            RecycleBinItemType::CascadeParent => 9,
            RecycleBinItemType::Web => 10,
            RecycleBinItemType::Other(v) => v,
        }
    }
}

/// An entry of the site recycle bin (`SP.RecycleBinItem`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecycleBinItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub dir_name: String,
    #[serde(default)]
    pub leaf_name: String,
    pub deleted_date: DateTime<Utc>,
    pub item_type: RecycleBinItemType,
    #[serde(default, deserialize_with = "de_lenient_u64")]
    pub size: u64,
    #[serde(default)]
    pub deleted_by_name: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
//  Reports
// ═══════════════════════════════════════════════════════════════════════

/// One failed item of a batch.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    /// The local path, file name, or recycle-bin title that failed.
    pub item: String,
    pub error: SharePointError,
}

/// Per-item outcome of a batch helper.
#[derive(Debug, Clone)]
pub struct BatchReport<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<BatchFailure>,
}

impl<T> BatchReport<T> {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn record(&mut self, item: impl Into<String>, outcome: SharePointResult<T>) {
        match outcome {
            Ok(v) => self.succeeded.push(v),
            Err(error) => self.failed.push(BatchFailure {
                item: item.into(),
                error,
            }),
        }
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of `recover_data`.
pub type RestoreReport = BatchReport<RecycleBinItem>;

impl RestoreReport {
    pub fn restored_count(&self) -> usize {
        self.succeeded.len()
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Serde helpers
// ═══════════════════════════════════════════════════════════════════════

/// OData serialises `Edm.Int64` as a JSON string; accept both forms.
fn de_lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    match v {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("not an unsigned integer: {}", n))),
        serde_json::Value::String(s) => s.parse().map_err(serde::de::Error::custom),
        serde_json::Value::Null => Ok(0),
        other => Err(serde::de::Error::custom(format!(
            "expected number or string, got {}",
            other
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
