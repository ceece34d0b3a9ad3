// Controller family detection
//
// One unauthenticated probe of the gateway root at client construction.
// UniFi OS serves its portal at `/` with a 200; legacy controllers redirect
// or reject. The classification is never re-evaluated: a firmware upgrade
// that changes the family mid-session requires a new client.

use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::auth::ControllerKind;
use crate::error::{Error, UnreachableKind};

/// Probe `GET {base}/` and classify the controller family.
///
/// A 200 means the integrated OS portal answered; any other reachable
/// status is a legacy controller. Network-level failures come back as
/// [`Error::NetworkUnreachable`] with a classified kind.
pub async fn detect_controller_kind(
    http: &reqwest::Client,
    base_url: &Url,
) -> Result<ControllerKind, Error> {
    let url = base_url.join("/").map_err(Error::InvalidUrl)?;
    debug!(%url, "probing gateway root");

    let resp = http
        .get(url)
        .send()
        .await
        .map_err(|e| classify_unreachable(&e, base_url))?;

    let kind = if resp.status() == StatusCode::OK {
        ControllerKind::IntegratedOs
    } else {
        ControllerKind::Legacy
    };
    debug!(?kind, status = %resp.status(), "controller family detected");
    Ok(kind)
}

/// Classify a transport failure into an actionable reachability error.
///
/// `reqwest` does not expose refused/DNS failures as typed variants, so the
/// source chain is matched by message content.
pub(crate) fn classify_unreachable(err: &reqwest::Error, base_url: &Url) -> Error {
    let chain = error_chain(err);

    let kind = if err.is_timeout() || chain.contains("deadline exceeded") {
        UnreachableKind::Timeout
    } else if chain.contains("connection refused") {
        UnreachableKind::ConnectionRefused
    } else if chain.contains("dns error")
        || chain.contains("no such host")
        || chain.contains("failed to lookup address")
    {
        UnreachableKind::HostNotFound
    } else {
        UnreachableKind::Other
    };

    let message = match kind {
        UnreachableKind::Timeout => format!(
            "network timeout - cannot reach gateway at {base_url}; check the address and network connectivity"
        ),
        UnreachableKind::ConnectionRefused => format!(
            "connection refused - gateway at {base_url} is not accepting connections; check that it is running and not firewalled"
        ),
        UnreachableKind::HostNotFound => {
            format!("host not found - invalid gateway address {base_url}")
        }
        UnreachableKind::Other => format!("cannot reach gateway at {base_url}: {chain}"),
    };

    Error::NetworkUnreachable { kind, message }
}

/// Flatten an error's source chain into one lowercase string for matching.
fn error_chain(err: &reqwest::Error) -> String {
    use std::error::Error as _;

    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ").to_ascii_lowercase()
}
