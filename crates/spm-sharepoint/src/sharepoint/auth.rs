//! Authentication against SharePoint Online.
//!
//! Implements the two credential modes a session can be built with:
//!
//! - **User credentials** via SAML federation: a WS-Trust
//!   `RequestSecurityToken` is posted to the security token service, the
//!   returned `BinarySecurityToken` is exchanged at
//!   `{origin}/_forms/default.aspx?wa=wsignin1.0` for the `FedAuth` / `rtFa`
//!   cookies.  Cookie-authenticated POSTs also need a form digest from
//!   `/_api/contextinfo`.
//! - **Client credentials** via app-only ACS: the tenant realm is discovered
//!   from the `WWW-Authenticate` challenge of `/_vti_bin/client.svc`, then a
//!   bearer token is requested from `{acs}/{realm}/tokens/OAuth/2`.

use crate::sharepoint::error::{SharePointError, SharePointResult};
use crate::sharepoint::types::{
    AuthGrant, AuthHandle, Credentials, FormDigest, RealmChallenge, SharePointConfig,
};
use chrono::{DateTime, Utc};
use log::{debug, info};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE, SET_COOKIE, WWW_AUTHENTICATE};
use std::time::Duration;

/// Principal id of SharePoint Online in Azure ACS.
pub const SHAREPOINT_PRINCIPAL_ID: &str = "00000003-0000-0ff1-ce00-000000000000";

const JSON_NOMETADATA: &str = "application/json;odata=nometadata";

// ═══════════════════════════════════════════════════════════════════════
//  Public API
// ═══════════════════════════════════════════════════════════════════════

/// Run the handshake matching `credentials`.
pub async fn authenticate(
    http: &reqwest::Client,
    config: &SharePointConfig,
    credentials: &Credentials,
) -> SharePointResult<AuthGrant> {
    let site = config.site()?;
    match credentials {
        Credentials::User { username, password } => {
            let grant = user_credentials_grant(config, &site, username, password).await?;
            info!("Authenticated {} with user credentials", site);
            Ok(grant)
        }
        Credentials::Client {
            client_id,
            client_secret,
        } => {
            let challenge = discover_realm(http, &site).await?;
            let grant =
                client_credentials_grant(http, config, &site, &challenge, client_id, client_secret)
                    .await?;
            info!("Authenticated {} with client credentials", site);
            Ok(grant)
        }
    }
}

/// Request a form digest for cookie-authenticated POSTs.
pub async fn fetch_form_digest(
    http: &reqwest::Client,
    site_url: &str,
    handle: &AuthHandle,
) -> SharePointResult<FormDigest> {
    let url = format!("{}/_api/contextinfo", site_url.trim_end_matches('/'));
    let mut req = http
        .post(&url)
        .header(ACCEPT, JSON_NOMETADATA)
        .header(CONTENT_TYPE, JSON_NOMETADATA)
        .body("");
    if let Some(cookie) = handle.cookie_header() {
        req = req.header(reqwest::header::COOKIE, cookie);
    }
    let resp = req.send().await?;

    let status = resp.status().as_u16();
    let body = resp.text().await?;
    if status != 200 {
        return Err(SharePointError::from_rest_response(status, &body));
    }

    parse_context_info(&body)
}

// ═══════════════════════════════════════════════════════════════════════
//  User credentials (SAML)
// ═══════════════════════════════════════════════════════════════════════

async fn user_credentials_grant(
    config: &SharePointConfig,
    site: &url::Url,
    username: &str,
    password: &str,
) -> SharePointResult<AuthGrant> {
    let origin = site_origin(site);

    // The sign-in endpoint answers with a redirect; the cookies live on the
    // redirect response itself.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_sec))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| SharePointError::internal(format!("Failed to create HTTP client: {}", e)))?;

    let envelope = build_rst_envelope(&config.sts_url, username, password, &format!("{}/", origin));
    let resp = http
        .post(&config.sts_url)
        .header(CONTENT_TYPE, "application/soap+xml; charset=utf-8")
        .body(envelope)
        .send()
        .await?;
    let body = resp.text().await?;
    let token = parse_binary_security_token(&body)?;
    debug!("Received security token from {}", config.sts_url);

    let sign_in = format!("{}/_forms/default.aspx?wa=wsignin1.0", origin);
    let resp = http
        .post(&sign_in)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(token)
        .send()
        .await?;

    let status = resp.status().as_u16();
    if status >= 400 {
        let body = resp.text().await.unwrap_or_default();
        return Err(SharePointError::from_rest_response(status, &body));
    }

    let (fed_auth, rt_fa) = extract_auth_cookies(resp.headers())?;
    Ok(AuthGrant {
        handle: AuthHandle::Cookies { fed_auth, rt_fa },
        expires_at: None,
    })
}

/// WS-Trust 1.3 issue request for a SAML 1.0 assertion.
fn build_rst_envelope(sts_url: &str, username: &str, password: &str, endpoint: &str) -> String {
    use quick_xml::escape::escape;
    format!(
        r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:a="http://www.w3.org/2005/08/addressing" xmlns:u="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd">
  <s:Header>
    <a:Action s:mustUnderstand="1">http://schemas.xmlsoap.org/ws/2005/02/trust/RST/Issue</a:Action>
    <a:ReplyTo><a:Address>http://www.w3.org/2005/08/addressing/anonymous</a:Address></a:ReplyTo>
    <a:To s:mustUnderstand="1">{sts}</a:To>
    <o:Security s:mustUnderstand="1" xmlns:o="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd">
      <o:UsernameToken>
        <o:Username>{user}</o:Username>
        <o:Password>{pass}</o:Password>
      </o:UsernameToken>
    </o:Security>
  </s:Header>
  <s:Body>
    <t:RequestSecurityToken xmlns:t="http://schemas.xmlsoap.org/ws/2005/02/trust">
      <wsp:AppliesTo xmlns:wsp="http://schemas.xmlsoap.org/ws/2004/09/policy">
        <a:EndpointReference><a:Address>{endpoint}</a:Address></a:EndpointReference>
      </wsp:AppliesTo>
      <t:KeyType>http://schemas.xmlsoap.org/ws/2005/05/identity/NoProofKey</t:KeyType>
      <t:RequestType>http://schemas.xmlsoap.org/ws/2005/02/trust/Issue</t:RequestType>
      <t:TokenType>urn:oasis:names:tc:SAML:1.0:assertion</t:TokenType>
    </t:RequestSecurityToken>
  </s:Body>
</s:Envelope>"#,
        sts = escape(sts_url),
        user = escape(username),
        pass = escape(password),
        endpoint = escape(endpoint),
    )
}

/// Pull the `BinarySecurityToken` out of an STS response, or surface the
/// SOAP fault text.
fn parse_binary_security_token(xml: &str) -> SharePointResult<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut current: Vec<u8> = Vec::new();
    let mut fault_detail: Option<String> = None;
    let mut fault_reason: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => current = e.local_name().as_ref().to_vec(),
            Event::End(_) => current.clear(),
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                match current.as_slice() {
                    b"BinarySecurityToken" => return Ok(text),
                    b"text" if fault_detail.is_none() => fault_detail = Some(text),
                    b"Text" if fault_reason.is_none() => fault_reason = Some(text),
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(SharePointError::auth(
        fault_detail
            .or(fault_reason)
            .unwrap_or_else(|| "No BinarySecurityToken in STS response".into()),
    ))
}

/// Collect the `FedAuth` and `rtFa` cookies from `Set-Cookie` headers.
fn extract_auth_cookies(headers: &HeaderMap) -> SharePointResult<(String, String)> {
    let mut fed_auth = None;
    let mut rt_fa = None;

    for value in headers.get_all(SET_COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        let pair = raw.split(';').next().unwrap_or_default();
        match pair.split_once('=') {
            Some(("FedAuth", v)) => fed_auth = Some(v.to_string()),
            Some(("rtFa", v)) => rt_fa = Some(v.to_string()),
            _ => {}
        }
    }

    match (fed_auth, rt_fa) {
        (Some(f), Some(r)) => Ok((f, r)),
        _ => Err(SharePointError::auth(
            "Sign-in response did not set FedAuth / rtFa cookies",
        )),
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Client credentials (ACS app-only)
// ═══════════════════════════════════════════════════════════════════════

/// Probe `/_vti_bin/client.svc` with an empty bearer to learn the realm.
async fn discover_realm(
    http: &reqwest::Client,
    site: &url::Url,
) -> SharePointResult<RealmChallenge> {
    let url = format!("{}/_vti_bin/client.svc", site.as_str().trim_end_matches('/'));
    let resp = http.get(&url).header(AUTHORIZATION, "Bearer").send().await?;

    let header = resp
        .headers()
        .get(WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    parse_realm_challenge(&header).ok_or_else(|| {
        SharePointError::auth(format!(
            "Could not discover tenant realm from {} (HTTP {})",
            url,
            resp.status().as_u16()
        ))
    })
}

async fn client_credentials_grant(
    http: &reqwest::Client,
    config: &SharePointConfig,
    site: &url::Url,
    challenge: &RealmChallenge,
    client_id: &str,
    client_secret: &str,
) -> SharePointResult<AuthGrant> {
    let host = site
        .host_str()
        .ok_or_else(|| SharePointError::configuration("site_url has no host"))?;
    let token_url = format!(
        "{}/{}/tokens/OAuth/2",
        config.acs_url.trim_end_matches('/'),
        challenge.realm
    );

    let principal = format!("{}@{}", client_id, challenge.realm);
    let resource = format!("{}/{}@{}", challenge.principal_id, host, challenge.realm);
    let params = [
        ("grant_type", "client_credentials"),
        ("client_id", principal.as_str()),
        ("client_secret", client_secret),
        ("resource", resource.as_str()),
    ];

    let resp = http.post(&token_url).form(&params).send().await?;
    let status = resp.status().as_u16();
    let body = resp.text().await?;

    if status != 200 {
        return Err(SharePointError::from_rest_response(status, &body));
    }

    parse_token_response(&body)
}

// ═══════════════════════════════════════════════════════════════════════
//  Internal helpers
// ═══════════════════════════════════════════════════════════════════════

fn site_origin(site: &url::Url) -> String {
    site.origin().ascii_serialization()
}

/// Value of `key="…"` inside a `WWW-Authenticate` challenge.
fn challenge_param(header: &str, key: &str) -> Option<String> {
    let needle = format!("{}=\"", key);
    let mut search_from = 0;
    while let Some(pos) = header[search_from..].find(&needle) {
        let start = search_from + pos;
        let boundary = header[..start]
            .chars()
            .next_back()
            .map_or(true, |c| c == ' ' || c == ',');
        let value_start = start + needle.len();
        if boundary {
            let end = header[value_start..].find('"')?;
            return Some(header[value_start..value_start + end].to_string());
        }
        search_from = value_start;
    }
    None
}

fn parse_realm_challenge(header: &str) -> Option<RealmChallenge> {
    let realm = challenge_param(header, "realm").filter(|r| !r.is_empty())?;
    let principal_id = challenge_param(header, "client_id")
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| SHAREPOINT_PRINCIPAL_ID.to_string());
    Some(RealmChallenge {
        realm,
        principal_id,
    })
}

fn parse_token_response(body: &str) -> SharePointResult<AuthGrant> {
    let v: serde_json::Value = serde_json::from_str(body)?;

    let access_token = v["access_token"]
        .as_str()
        .ok_or_else(|| SharePointError::auth("No access_token in response"))?
        .to_string();

    // ACS sends `expires_in` as a string.
    let expires_in = v["expires_in"]
        .as_i64()
        .or_else(|| v["expires_in"].as_str().and_then(|s| s.parse().ok()))
        .unwrap_or(3600);

    debug!("Parsed token, expires in {}s", expires_in);

    let expires_at = expiry_after(expires_in).ok_or_else(|| {
        SharePointError::auth(format!("Token expiry out of range: {}", expires_in))
    })?;
    Ok(AuthGrant {
        handle: AuthHandle::Bearer(access_token),
        expires_at: Some(expires_at),
    })
}

fn parse_context_info(body: &str) -> SharePointResult<FormDigest> {
    let v: serde_json::Value = serde_json::from_str(body)?;
    // nometadata is flat; verbose nests under d.GetContextWebInformation.
    let info = if v["FormDigestValue"].is_string() {
        &v
    } else {
        &v["d"]["GetContextWebInformation"]
    };

    let value = info["FormDigestValue"]
        .as_str()
        .ok_or_else(|| SharePointError::auth("No FormDigestValue in contextinfo response"))?
        .to_string();
    let timeout = info["FormDigestTimeoutSeconds"].as_i64().unwrap_or(1800);
    let expires_at = expiry_after(timeout).ok_or_else(|| {
        SharePointError::auth(format!("Form digest timeout out of range: {}", timeout))
    })?;

    Ok(FormDigest { value, expires_at })
}

/// `now + seconds`; `None` when the value does not fit a timestamp.
fn expiry_after(seconds: i64) -> Option<DateTime<Utc>> {
    chrono::Duration::try_seconds(seconds).and_then(|d| Utc::now().checked_add_signed(d))
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
