use secrecy::SecretString;
use url::Url;

/// The controller family of a UniFi gateway.
///
/// Determines the login path, the session cookie name, and the path prefix
/// for the management API. Detected once at client construction and assumed
/// stable for the client's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    /// UniFi OS device (UDM, UCG, ...) -- the management API is
    /// reverse-proxied behind the OS layer and POST requests carry a
    /// CSRF token.
    IntegratedOs,
    /// Older standalone controller firmware -- plain cookie session,
    /// no CSRF requirement.
    Legacy,
}

impl ControllerKind {
    /// The login endpoint path.
    pub fn login_path(self) -> &'static str {
        match self {
            Self::IntegratedOs => "/api/auth/login",
            Self::Legacy => "/api/login",
        }
    }

    /// The response cookie carrying the auth token.
    pub fn cookie_name(self) -> &'static str {
        match self {
            Self::IntegratedOs => "TOKEN",
            Self::Legacy => "unifises",
        }
    }

    /// The path prefix for management API endpoints.
    ///
    /// UniFi OS reverse-proxies the management API behind `/proxy/network`;
    /// legacy controllers serve it at the root.
    pub fn api_prefix(self) -> &'static str {
        match self {
            Self::IntegratedOs => "/proxy/network",
            Self::Legacy => "",
        }
    }
}

/// Credentials for one gateway. Immutable for the client's lifetime.
///
/// Owned configuration is passed in at construction; the crate never reads
/// the environment or flags itself.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Controller root, e.g. `https://192.168.1.1`.
    pub base_url: Url,
    pub username: String,
    pub password: SecretString,
    /// Site identifier, usually `"default"`.
    pub site: String,
    /// Controller firmware/version hint, carried for diagnostics only.
    pub version: String,
}
