use thiserror::Error;

/// Why the gateway was unreachable, classified from transport errors so the
/// caller can render an actionable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreachableKind {
    /// Request or connect deadline exceeded.
    Timeout,
    /// The gateway actively refused the connection.
    ConnectionRefused,
    /// DNS resolution failed for the gateway address.
    HostNotFound,
    /// Any other transport-level failure.
    Other,
}

/// Top-level error type for the `unifi-speedtest` crate.
///
/// Covers every failure mode across detection, login, the archive fetch,
/// and response normalization. Callers map these into user-facing
/// diagnostics; nothing is swallowed internally.
#[derive(Debug, Error)]
pub enum Error {
    // ── Reachability ────────────────────────────────────────────────
    /// The gateway could not be reached at all (detection or any call).
    #[error("Gateway unreachable: {message}")]
    NetworkUnreachable {
        kind: UnreachableKind,
        message: String,
    },

    // ── Authentication ──────────────────────────────────────────────
    /// Login returned a non-200, non-429 status.
    #[error("Login failed with HTTP status {status}")]
    LoginFailed { status: u16 },

    /// Login returned HTTP 429.
    #[error("Login rate limited (HTTP 429) -- wait before retrying")]
    RateLimited,

    /// Login succeeded but no auth cookie was present in the response.
    #[error("No authentication token found in login response")]
    NoAuthToken,

    /// The auth token was present but not the three-part JWT shape the
    /// integrated OS issues (its CSRF token lives in the payload segment).
    #[error("Malformed auth token: {message}")]
    MalformedAuthToken { message: String },

    /// The archive fetch got a second consecutive 401 after a re-login.
    #[error("Still unauthorized after re-login -- not retrying again")]
    UnauthorizedRetryExhausted,

    // ── Gateway API ─────────────────────────────────────────────────
    /// Explicit error from the gateway (envelope `rc`/`msg`, v2
    /// `errorCode`/`message`, or an unexpected HTTP status).
    #[error("Gateway API error: {message}")]
    Api { code: Option<i64>, message: String },

    // ── Response data ───────────────────────────────────────────────
    /// No known response schema matched; the raw body is kept for
    /// diagnostics.
    #[error("Unrecognized speedtest response format")]
    UnrecognizedFormat { body: String },

    /// Every sample in the response had zero throughput (placeholder
    /// entries the gateway writes when a scheduled test did not run).
    #[error("No valid speedtest samples in response (all entries have zero throughput)")]
    NoValidSamples,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error not covered by the reachability classifier.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),
}

impl Error {
    /// Returns `true` if this failure is worth retrying on the caller's
    /// next poll without operator intervention.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NetworkUnreachable { .. } | Self::RateLimited => true,
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Returns `true` if the failure happened while establishing or using
    /// the authentication session.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::LoginFailed { .. }
                | Self::RateLimited
                | Self::NoAuthToken
                | Self::MalformedAuthToken { .. }
                | Self::UnauthorizedRetryExhausted
        )
    }
}
