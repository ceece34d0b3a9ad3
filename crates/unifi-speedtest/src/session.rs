// Authentication session state
//
// Holds the auth/CSRF tokens behind a reader/writer lock. The gateway does
// not report a session TTL, so logins are assumed good for a fixed 8 hours.
// Also home to the CSRF extraction from the UniFi OS auth token, which is
// JWT-shaped with the CSRF value buried in its payload segment.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::debug;

use crate::error::Error;

/// Fixed client-side session lifetime.
pub(crate) const SESSION_TTL: Duration = Duration::from_secs(8 * 60 * 60);

/// CSRF field names observed across UniFi OS firmware versions, probed
/// in order.
const CSRF_FIELDS: [&str; 4] = ["csrfToken", "csrf_token", "xsrfToken", "token"];

#[derive(Debug)]
struct Session {
    auth_token: String,
    csrf_token: Option<String>,
    expires_at: Instant,
}

/// Locked store for the current session.
///
/// Reads (`is_valid`, `csrf_token`) take a shared lock; writes (`store`,
/// `invalidate`) take an exclusive lock. Guards are never held across an
/// await point.
#[derive(Debug)]
pub(crate) struct SessionStore {
    inner: RwLock<Session>,
}

impl SessionStore {
    /// A new store starts expired; the first fetch performs a fresh login.
    pub(crate) fn new() -> Self {
        Self {
            inner: RwLock::new(Session {
                auth_token: String::new(),
                csrf_token: None,
                expires_at: Instant::now(),
            }),
        }
    }

    /// A session is valid iff it holds a token and has not expired.
    pub(crate) fn is_valid(&self) -> bool {
        self.is_valid_at(Instant::now())
    }

    fn is_valid_at(&self, now: Instant) -> bool {
        let session = self.inner.read().expect("session lock poisoned");
        !session.auth_token.is_empty() && now < session.expires_at
    }

    /// Store a fresh session, valid for [`SESSION_TTL`] from now.
    pub(crate) fn store(&self, auth_token: String, csrf_token: Option<String>) {
        let mut session = self.inner.write().expect("session lock poisoned");
        session.auth_token = auth_token;
        session.csrf_token = csrf_token;
        session.expires_at = Instant::now() + SESSION_TTL;
    }

    /// Clear the tokens and force expiry, after an authorization failure.
    pub(crate) fn invalidate(&self) {
        let mut session = self.inner.write().expect("session lock poisoned");
        session.auth_token.clear();
        session.csrf_token = None;
        session.expires_at = Instant::now();
    }

    pub(crate) fn csrf_token(&self) -> Option<String> {
        self.inner
            .read()
            .expect("session lock poisoned")
            .csrf_token
            .clone()
    }
}

/// Extract the CSRF token embedded in a UniFi OS auth token.
///
/// The token is JWT-shaped (`header.payload.signature`); the payload is a
/// base64url-encoded JSON object. Firmware versions disagree on the field
/// name, so a fixed candidate list is probed in order. Not every version
/// embeds one -- a missing field is normal and yields `Ok(None)`. A token
/// that is not a decodable three-part JWT is malformed and fails the login.
pub(crate) fn extract_csrf_token(auth_token: &str) -> Result<Option<String>, Error> {
    let parts: Vec<&str> = auth_token.split('.').collect();
    if parts.len() != 3 {
        return Err(Error::MalformedAuthToken {
            message: format!("expected 3 token segments, got {}", parts.len()),
        });
    }

    // Padding is stripped up front so both padded and unpadded payloads decode.
    let payload = parts[1].trim_end_matches('=');
    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|err| Error::MalformedAuthToken {
            message: format!("failed to base64-decode token payload: {err}"),
        })?;

    let claims: serde_json::Value =
        serde_json::from_slice(&decoded).map_err(|err| Error::MalformedAuthToken {
            message: format!("token payload is not JSON: {err}"),
        })?;

    for field in CSRF_FIELDS {
        if let Some(token) = claims.get(field).and_then(serde_json::Value::as_str) {
            if !token.is_empty() {
                debug!(field, "extracted CSRF token from auth token payload");
                return Ok(Some(token.to_owned()));
            }
        }
    }

    debug!("no CSRF token in auth token payload; normal for some firmware versions");
    Ok(None)
}
