//! The authenticated connection to one SharePoint site.
//!
//! A `Session` is created once (credentials validated, handshake done) and
//! shared by reference with every consumer; there is no hidden global
//! instance.

use crate::sharepoint::api_client::SharePointApiClient;
use crate::sharepoint::error::SharePointResult;
use crate::sharepoint::remote::DocumentLibrary;
use crate::sharepoint::rest::SharePointRestLibrary;
use crate::sharepoint::types::{CredentialKind, Credentials, SharePointConfig};
use chrono::{DateTime, Utc};
use log::info;
use std::sync::Arc;

/// Handle passed to file managers and other consumers.
pub type SharedSession = Arc<Session>;

/// One authenticated handle to a site.
pub struct Session {
    site_url: String,
    credential_kind: CredentialKind,
    library: Arc<dyn DocumentLibrary>,
    connected_at: DateTime<Utc>,
}

impl Session {
    /// Validate credentials, then authenticate against the site.
    ///
    /// Fails with a `Configuration` error, without touching the network,
    /// when both or neither credential pairs are configured.
    pub async fn connect(config: &SharePointConfig) -> SharePointResult<Self> {
        let credentials = config.credentials()?;
        let site_url = config.site()?.as_str().trim_end_matches('/').to_string();

        let client = SharePointApiClient::connect(config, &credentials).await?;
        let library: Arc<dyn DocumentLibrary> = Arc::new(SharePointRestLibrary::new(client));

        info!("Connected to {} ({:?} credentials)", site_url, credentials.kind());
        Ok(Self {
            site_url,
            credential_kind: credentials.kind(),
            library,
            connected_at: Utc::now(),
        })
    }

    /// Wrap an already-authenticated library implementation.
    pub fn from_library(
        site_url: impl Into<String>,
        credentials: &Credentials,
        library: Arc<dyn DocumentLibrary>,
    ) -> Self {
        Self {
            site_url: site_url.into(),
            credential_kind: credentials.kind(),
            library,
            connected_at: Utc::now(),
        }
    }

    pub fn shared(self) -> SharedSession {
        Arc::new(self)
    }

    /// The authenticated remote handle.
    pub fn library(&self) -> &dyn DocumentLibrary {
        self.library.as_ref()
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    pub fn credential_kind(&self) -> CredentialKind {
        self.credential_kind
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("site_url", &self.site_url)
            .field("credential_kind", &self.credential_kind)
            .field("connected_at", &self.connected_at)
            .finish_non_exhaustive()
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
