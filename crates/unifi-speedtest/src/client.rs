// Speedtest client orchestration
//
// Composes detection, session management, request construction, response
// normalization, and the result cache behind one fetch operation. The
// client spawns no background tasks; it is driven entirely by the caller's
// polling loop.

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, SET_COOKIE};
use secrecy::ExposeSecret;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{ControllerKind, Credentials};
use crate::cache::{CACHE_TTL, ResultCache};
use crate::detect::{classify_unreachable, detect_controller_kind};
use crate::error::Error;
use crate::model::SpeedtestResult;
use crate::normalize::normalize;
use crate::report::{ArchiveQuery, archive_url};
use crate::session::{SessionStore, extract_csrf_token};
use crate::transport::TransportConfig;

/// Default lookback window for `fetch_speedtest`, in epoch millis.
const DEFAULT_LOOKBACK_MS: i64 = 24 * 60 * 60 * 1000;

/// Client for one UniFi gateway's archived speedtest results.
///
/// Construction probes the gateway root once to classify the controller
/// family; the classification is never re-evaluated, so a firmware upgrade
/// that changes the family mid-session requires a new client. Session and
/// cache state live in locked stores owned by this instance -- one client
/// per gateway.
pub struct SpeedtestClient {
    http: reqwest::Client,
    credentials: Credentials,
    kind: ControllerKind,
    session: SessionStore,
    cache: ResultCache,
}

impl SpeedtestClient {
    /// Connect to a gateway: build the transport (adding a cookie jar if
    /// the config lacks one -- session auth requires cookies) and detect
    /// the controller family.
    pub async fn connect(
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        let kind = detect_controller_kind(&http, &credentials.base_url).await?;
        debug!(?kind, version = %credentials.version, "speedtest client ready");
        Ok(Self::assemble(http, credentials, kind))
    }

    /// Build a client with a pre-built `reqwest::Client` and a known
    /// controller kind, skipping the root probe.
    pub fn with_client(
        http: reqwest::Client,
        credentials: Credentials,
        kind: ControllerKind,
    ) -> Self {
        Self::assemble(http, credentials, kind)
    }

    fn assemble(http: reqwest::Client, credentials: Credentials, kind: ControllerKind) -> Self {
        Self {
            http,
            credentials,
            kind,
            session: SessionStore::new(),
            cache: ResultCache::new(CACHE_TTL),
        }
    }

    /// The detected controller family.
    pub fn kind(&self) -> ControllerKind {
        self.kind
    }

    // ── Session management ───────────────────────────────────────────

    /// Reuse the cached session when it is still valid; log in otherwise.
    async fn ensure_session(&self) -> Result<(), Error> {
        if self.session.is_valid() {
            debug!("reusing cached authentication session");
            return Ok(());
        }
        debug!("no valid session - performing fresh login");
        self.login().await
    }

    /// Authenticate with the gateway and cache the session.
    ///
    /// The login endpoint differs by family (`/api/auth/login` vs
    /// `/api/login`), as does the cookie carrying the auth token. On UniFi
    /// OS the CSRF token is dug out of the auth token's payload.
    async fn login(&self) -> Result<(), Error> {
        let url = self
            .credentials
            .base_url
            .join(self.kind.login_path())
            .map_err(Error::InvalidUrl)?;
        debug!(%url, "logging in");

        let body = json!({
            "username": self.credentials.username,
            "password": self.credentials.password.expose_secret(),
        });

        let resp = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_unreachable(&e, &self.credentials.base_url))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited);
        }
        if status != StatusCode::OK {
            return Err(Error::LoginFailed {
                status: status.as_u16(),
            });
        }

        let auth_token =
            cookie_value(resp.headers(), self.kind.cookie_name()).ok_or(Error::NoAuthToken)?;

        let csrf_token = match self.kind {
            ControllerKind::IntegratedOs => extract_csrf_token(&auth_token)?,
            ControllerKind::Legacy => None,
        };

        self.session.store(auth_token, csrf_token);
        debug!("login successful");
        Ok(())
    }

    // ── Fetch ────────────────────────────────────────────────────────

    /// Fetch the latest archived speedtest sample, answering from the
    /// result cache when it is still fresh.
    ///
    /// On a miss the lookback window defaults to the last 24 hours and the
    /// result is cached before returning.
    pub async fn fetch_speedtest(&self) -> Result<SpeedtestResult, Error> {
        if let Some(cached) = self.cache.get() {
            debug!("returning cached speedtest result");
            return Ok(cached);
        }

        let end = chrono::Utc::now().timestamp_millis();
        let start = end - DEFAULT_LOOKBACK_MS;

        let result = self.fetch_speedtest_in_range(start, end).await?;
        self.cache.set(result);
        Ok(result)
    }

    /// Fetch the latest sample within `[start, end]` (epoch millis),
    /// bypassing the result cache.
    ///
    /// A 401 invalidates the session and triggers exactly one re-login and
    /// one retried fetch; a second consecutive 401 is terminal. Every other
    /// failure propagates immediately -- the caller retries on its own
    /// schedule.
    pub async fn fetch_speedtest_in_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<SpeedtestResult, Error> {
        self.ensure_session().await?;

        let url = archive_url(&self.credentials.base_url, self.kind, &self.credentials.site)?;
        let query = ArchiveQuery::new(start, end);

        // Bounded retry: at most one re-login per call.
        let mut reauthenticated = false;
        loop {
            let resp = self.send_archive_request(url.clone(), &query).await?;
            let status = resp.status();

            if status == StatusCode::UNAUTHORIZED {
                if reauthenticated {
                    return Err(Error::UnauthorizedRetryExhausted);
                }
                debug!("archive request rejected with 401 - re-authenticating once");
                self.session.invalidate();
                self.login().await?;
                reauthenticated = true;
                continue;
            }

            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::Api {
                    code: None,
                    message: format!("archive request failed (HTTP {status}): {}", snippet(&body)),
                });
            }

            let body = resp.text().await.map_err(Error::Transport)?;
            return normalize(&body);
        }
    }

    /// POST the archive query. The endpoint nominally accepts GET, but the
    /// attribute body forces POST; UniFi OS wants a CSRF header on POST
    /// when one is held (not every controller enforces it).
    async fn send_archive_request(
        &self,
        url: Url,
        query: &ArchiveQuery,
    ) -> Result<reqwest::Response, Error> {
        debug!(%url, "POST archive.speedtest");

        let mut builder = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .json(query);

        if self.kind == ControllerKind::IntegratedOs {
            match self.session.csrf_token() {
                Some(token) => builder = builder.header("x-csrf-token", token),
                None => warn!("no CSRF token available for UniFi OS request"),
            }
        }

        builder
            .send()
            .await
            .map_err(|e| classify_unreachable(&e, &self.credentials.base_url))
    }
}

/// Truncate a body for diagnostics without splitting a UTF-8 character.
fn snippet(body: &str) -> &str {
    const MAX_LEN: usize = 200;
    if body.len() <= MAX_LEN {
        return body;
    }
    let mut end = MAX_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Read a named cookie's value out of `Set-Cookie` response headers.
fn cookie_value(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(cookie_name, _)| cookie_name.trim() == name)
        .map(|(_, value)| value.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cookies(cookies: &[&str]) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        for cookie in cookies {
            headers.append(SET_COOKIE, cookie.parse().expect("valid header value"));
        }
        headers
    }

    #[test]
    fn cookie_value_finds_named_cookie() {
        let headers = headers_with_cookies(&[
            "csrf=ignored; Path=/",
            "TOKEN=abc.def.ghi; Path=/; HttpOnly; Secure",
        ]);
        assert_eq!(
            cookie_value(&headers, "TOKEN").as_deref(),
            Some("abc.def.ghi")
        );
    }

    #[test]
    fn cookie_value_misses_absent_cookie() {
        let headers = headers_with_cookies(&["unifises=xyz; Path=/"]);
        assert_eq!(cookie_value(&headers, "TOKEN"), None);
        assert_eq!(cookie_value(&headers, "unifises").as_deref(), Some("xyz"));
    }

    #[test]
    fn snippet_passes_short_bodies_through() {
        assert_eq!(snippet("short body"), "short body");
    }

    #[test]
    fn snippet_truncates_on_a_char_boundary() {
        // 100 three-byte characters: byte 200 falls inside one of them.
        let body = "€".repeat(100);
        let cut = snippet(&body);
        assert_eq!(cut.len(), 198);
        assert_eq!(cut.chars().count(), 66);
        assert!(cut.chars().all(|c| c == '€'));
    }
}
