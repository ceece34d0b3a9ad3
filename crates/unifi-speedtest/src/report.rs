// Archive-report request construction
//
// The speedtest history lives at a site-scoped legacy endpoint. The
// endpoint nominally accepts GET, but the attribute selection travels in a
// JSON body, and a body forces POST.

use serde::Serialize;
use url::Url;

use crate::auth::ControllerKind;
use crate::error::Error;

/// Attribute selection for the archive report; names are fixed by the
/// legacy API.
const SPEEDTEST_ATTRS: [&str; 4] = ["xput_download", "xput_upload", "latency", "time"];

/// JSON body for `stat/report/archive.speedtest`. `start`/`end` are epoch
/// millis.
#[derive(Debug, Serialize)]
pub(crate) struct ArchiveQuery {
    attrs: [&'static str; 4],
    start: i64,
    end: i64,
}

impl ArchiveQuery {
    pub(crate) fn new(start: i64, end: i64) -> Self {
        Self {
            attrs: SPEEDTEST_ATTRS,
            start,
            end,
        }
    }
}

/// Build the archive-report URL for a site, applying the platform prefix.
///
/// UniFi OS: `{base}/proxy/network/api/s/{site}/stat/report/archive.speedtest`
/// Legacy:   `{base}/api/s/{site}/stat/report/archive.speedtest`
pub(crate) fn archive_url(base_url: &Url, kind: ControllerKind, site: &str) -> Result<Url, Error> {
    let base = base_url.as_str().trim_end_matches('/');
    let prefix = kind.api_prefix();
    let full = format!("{base}{prefix}/api/s/{site}/stat/report/archive.speedtest");
    Url::parse(&full).map_err(Error::InvalidUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://192.168.1.1").expect("valid test URL")
    }

    #[test]
    fn integrated_os_url_is_proxied() {
        let url = archive_url(&base(), ControllerKind::IntegratedOs, "default")
            .expect("valid archive URL");
        assert_eq!(
            url.as_str(),
            "https://192.168.1.1/proxy/network/api/s/default/stat/report/archive.speedtest"
        );
    }

    #[test]
    fn legacy_url_has_no_prefix() {
        let url =
            archive_url(&base(), ControllerKind::Legacy, "default").expect("valid archive URL");
        assert_eq!(
            url.as_str(),
            "https://192.168.1.1/api/s/default/stat/report/archive.speedtest"
        );
    }

    #[test]
    fn query_body_shape() {
        let body = serde_json::to_value(ArchiveQuery::new(1_000, 2_000)).expect("serializable");
        assert_eq!(
            body,
            serde_json::json!({
                "attrs": ["xput_download", "xput_upload", "latency", "time"],
                "start": 1_000,
                "end": 2_000,
            })
        );
    }
}
