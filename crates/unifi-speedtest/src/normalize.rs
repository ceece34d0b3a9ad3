// Response normalization for the archive-speedtest endpoint
//
// Controller family/version combinations return one of three incompatible
// JSON shapes. Each shape is a typed struct tried in a fixed order; an
// attempt either fully parses or leaves the body untouched for the next
// one. Whichever `data` array matches goes through the same selection
// policy.

use serde::Deserialize;
use tracing::debug;

use crate::error::Error;
use crate::model::SpeedtestResult;

/// One raw archive sample. Fields default to zero because older firmware
/// omits attributes it never measured.
#[derive(Debug, Clone, Copy, Deserialize)]
struct RawSample {
    #[serde(default)]
    xput_download: f64,
    #[serde(default)]
    xput_upload: f64,
    #[serde(default)]
    latency: f64,
    #[serde(default)]
    time: i64,
}

/// Standard envelope: `{ meta: { rc, msg }, data: [...] }`.
#[derive(Debug, Deserialize)]
struct MetaEnvelope {
    meta: Meta,
    #[serde(default)]
    data: Vec<RawSample>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    rc: String,
    #[serde(default)]
    msg: Option<String>,
}

/// v2 API shape: `{ errorCode, message, data: [...] }`.
#[derive(Debug, Deserialize)]
struct V2Envelope {
    #[serde(rename = "errorCode", default)]
    error_code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Vec<RawSample>,
}

/// Parse an archive-speedtest body against the known shapes, in order, and
/// select the authoritative sample from whichever matched.
pub(crate) fn normalize(body: &str) -> Result<SpeedtestResult, Error> {
    // 1. Standard meta-wrapped envelope.
    if let Ok(envelope) = serde_json::from_str::<MetaEnvelope>(body) {
        debug!("matched meta-wrapped response shape");
        if envelope.meta.rc != "ok" {
            return Err(Error::Api {
                code: None,
                message: envelope
                    .meta
                    .msg
                    .unwrap_or_else(|| format!("rc={}", envelope.meta.rc)),
            });
        }
        return select_latest(&envelope.data);
    }

    // 2. Bare array; some UniFi OS versions drop the envelope entirely.
    if let Ok(samples) = serde_json::from_str::<Vec<RawSample>>(body) {
        if !samples.is_empty() {
            debug!("matched bare-array response shape");
            return select_latest(&samples);
        }
    }

    // 3. v2 API, error-coded. An empty v2 payload carries no signal that
    //    the shape matched, so it falls through as unrecognized.
    if let Ok(envelope) = serde_json::from_str::<V2Envelope>(body) {
        if envelope.error_code != 0 {
            debug!("matched v2 error-coded response shape");
            return Err(Error::Api {
                code: Some(envelope.error_code),
                message: envelope
                    .message
                    .unwrap_or_else(|| "unknown error from v2 API".to_owned()),
            });
        }
        if !envelope.data.is_empty() {
            debug!("matched v2 response shape");
            return select_latest(&envelope.data);
        }
    }

    Err(Error::UnrecognizedFormat {
        body: body.to_owned(),
    })
}

/// Pick the newest sample that carries real throughput numbers.
///
/// Entries with zero download and zero upload are placeholders the gateway
/// writes when a scheduled test did not run; they are never selected, no
/// matter how recent.
fn select_latest(samples: &[RawSample]) -> Result<SpeedtestResult, Error> {
    samples
        .iter()
        .filter(|s| s.xput_download > 0.0 || s.xput_upload > 0.0)
        .max_by_key(|s| s.time)
        .map(|s| SpeedtestResult {
            download_mbps: s.xput_download,
            upload_mbps: s.xput_upload,
            latency_ms: s.latency,
            timestamp: s.time,
        })
        .ok_or(Error::NoValidSamples)
}
