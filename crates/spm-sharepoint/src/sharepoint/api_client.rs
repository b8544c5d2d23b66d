//! HTTP client for the SharePoint REST API.
//!
//! Wraps `reqwest::Client` with credential injection (bearer token or
//! FedAuth cookies), form-digest handling for cookie-authenticated POSTs,
//! transparent re-authentication of expired bearer grants, and JSON
//! envelope parsing.  Requests are sent exactly once.

use crate::sharepoint::auth;
use crate::sharepoint::error::{SharePointError, SharePointResult};
use crate::sharepoint::types::{AuthGrant, AuthHandle, Credentials, FormDigest, SharePointConfig};
use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

const JSON_NOMETADATA: &str = "application/json;odata=nometadata";

/// Low-level SharePoint REST client bound to one site.
pub struct SharePointApiClient {
    inner: reqwest::Client,
    site_url: String,
    config: SharePointConfig,
    credentials: Credentials,
    grant: RwLock<AuthGrant>,
    digest: Mutex<Option<FormDigest>>,
}

impl SharePointApiClient {
    /// Build the HTTP client and authenticate once.
    pub async fn connect(
        config: &SharePointConfig,
        credentials: &Credentials,
    ) -> SharePointResult<Self> {
        let site_url = config.site()?.as_str().trim_end_matches('/').to_string();
        let inner = Self::build_http(config)?;
        let grant = auth::authenticate(&inner, config, credentials).await?;
        Ok(Self {
            inner,
            site_url,
            config: config.clone(),
            credentials: credentials.clone(),
            grant: RwLock::new(grant),
            digest: Mutex::new(None),
        })
    }

    fn build_http(config: &SharePointConfig) -> SharePointResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_NOMETADATA));

        reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .default_headers(headers)
            .build()
            .map_err(|e| SharePointError::internal(format!("Failed to create HTTP client: {}", e)))
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    /// Full URL for a REST endpoint path.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("https://") || path.starts_with("http://") {
            path.to_string()
        } else {
            format!("{}/{}", self.site_url, path.trim_start_matches('/'))
        }
    }

    /// GET and parse JSON.
    pub async fn get(&self, path: &str) -> SharePointResult<serde_json::Value> {
        let url = self.url(path);
        debug!("GET {}", url);
        let req = self.authorize(self.inner.get(&url), false).await?;
        let resp = req.send().await?;
        Self::handle_response(resp).await
    }

    /// POST a JSON body (or nothing) and parse the JSON reply.
    pub async fn post(
        &self,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> SharePointResult<serde_json::Value> {
        let url = self.url(path);
        debug!("POST {}", url);
        let mut req = self
            .inner
            .post(&url)
            .header(CONTENT_TYPE, JSON_NOMETADATA);
        req = match body {
            Some(b) => req.body(serde_json::to_vec(b)?),
            None => req.body(""),
        };
        let resp = self.authorize(req, true).await?.send().await?;
        Self::handle_response(resp).await
    }

    /// POST raw bytes (file uploads).
    pub async fn post_bytes(
        &self,
        path: &str,
        data: Vec<u8>,
    ) -> SharePointResult<serde_json::Value> {
        let url = self.url(path);
        debug!("POST (bytes) {} ({} bytes)", url, data.len());
        let req = self
            .inner
            .post(&url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data);
        let resp = self.authorize(req, true).await?.send().await?;
        Self::handle_response(resp).await
    }

    // ─── Internal ────────────────────────────────────────────────────

    /// Current grant, re-authenticating first if a bearer token expired.
    async fn current_handle(&self) -> SharePointResult<AuthHandle> {
        {
            let grant = self.grant.read().await;
            if !grant.is_expired() {
                return Ok(grant.handle.clone());
            }
        }

        let mut grant = self.grant.write().await;
        if grant.is_expired() {
            *grant = auth::authenticate(&self.inner, &self.config, &self.credentials).await?;
            self.digest.lock().await.take();
            info!("Re-authenticated {}", self.site_url);
        }
        Ok(grant.handle.clone())
    }

    async fn form_digest(&self, handle: &AuthHandle) -> SharePointResult<String> {
        let mut slot = self.digest.lock().await;
        if let Some(d) = slot.as_ref().filter(|d| !d.is_expired()) {
            return Ok(d.value.clone());
        }
        let fresh = auth::fetch_form_digest(&self.inner, &self.site_url, handle).await?;
        let value = fresh.value.clone();
        *slot = Some(fresh);
        Ok(value)
    }

    async fn authorize(
        &self,
        req: reqwest::RequestBuilder,
        mutating: bool,
    ) -> SharePointResult<reqwest::RequestBuilder> {
        let handle = self.current_handle().await?;
        let req = match &handle {
            AuthHandle::Bearer(token) => req.bearer_auth(token),
            AuthHandle::Cookies { .. } => {
                let cookie = handle.cookie_header().unwrap_or_default();
                let req = req.header(COOKIE, cookie);
                if mutating {
                    let digest = self.form_digest(&handle).await?;
                    req.header("X-RequestDigest", digest)
                } else {
                    req
                }
            }
        };
        Ok(req)
    }

    async fn handle_response(resp: reqwest::Response) -> SharePointResult<serde_json::Value> {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();

        debug!("Response status={} body_len={}", status, body.len());

        if status >= 400 {
            return Err(SharePointError::from_rest_response(status, &body));
        }

        // 204 No Content
        if body.is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_str(&body).map_err(SharePointError::from)
    }
}

impl std::fmt::Debug for SharePointApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharePointApiClient")
            .field("site_url", &self.site_url)
            .field("credentials", &self.credentials.kind())
            .finish_non_exhaustive()
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sharepoint::types::CredentialKind;

    fn offline_client(handle: AuthHandle) -> SharePointApiClient {
        let config = SharePointConfig {
            site_url: "https://contoso.sharepoint.com/sites/Team".into(),
            ..Default::default()
        };
        SharePointApiClient {
            inner: SharePointApiClient::build_http(&config).unwrap(),
            site_url: "https://contoso.sharepoint.com/sites/Team".into(),
            credentials: Credentials::Client {
                client_id: "id".into(),
                client_secret: "secret".into(),
            },
            config,
            grant: RwLock::new(AuthGrant {
                handle,
                expires_at: None,
            }),
            digest: Mutex::new(None),
        }
    }

    #[test]
    fn test_url_building() {
        let client = offline_client(AuthHandle::Bearer("tok".into()));
        assert_eq!(
            client.url("/_api/web"),
            "https://contoso.sharepoint.com/sites/Team/_api/web"
        );
        assert_eq!(
            client.url("_api/site/RecycleBin"),
            "https://contoso.sharepoint.com/sites/Team/_api/site/RecycleBin"
        );
        assert_eq!(
            client.url("https://other.host/x"),
            "https://other.host/x"
        );
    }

    #[tokio::test]
    async fn test_bearer_authorization_header() {
        let client = offline_client(AuthHandle::Bearer("tok".into()));
        let req = client
            .authorize(client.inner.get("https://contoso.sharepoint.com/_api/web"), false)
            .await
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(req.headers()["authorization"], "Bearer tok");
    }

    #[tokio::test]
    async fn test_cookie_authorization_on_reads() {
        let client = offline_client(AuthHandle::Cookies {
            fed_auth: "f".into(),
            rt_fa: "r".into(),
        });
        let req = client
            .authorize(client.inner.get("https://contoso.sharepoint.com/_api/web"), false)
            .await
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(req.headers()["cookie"], "FedAuth=f; rtFa=r");
        assert!(req.headers().get("x-requestdigest").is_none());
    }

    #[tokio::test]
    async fn test_cached_digest_is_reused() {
        let client = offline_client(AuthHandle::Cookies {
            fed_auth: "f".into(),
            rt_fa: "r".into(),
        });
        *client.digest.lock().await = Some(FormDigest {
            value: "0xCAFE".into(),
            expires_at: chrono::Utc::now() + chrono::Duration::seconds(600),
        });
        let req = client
            .authorize(client.inner.post("https://contoso.sharepoint.com/_api/x"), true)
            .await
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(req.headers()["x-requestdigest"], "0xCAFE");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let client = offline_client(AuthHandle::Bearer("tok".into()));
        let s = format!("{:?}", client);
        assert!(s.contains(&format!("{:?}", CredentialKind::Client)));
        assert!(!s.contains("secret"));
        assert!(!s.contains("tok"));
    }
}
