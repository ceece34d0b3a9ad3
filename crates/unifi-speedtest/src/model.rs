// Normalized speedtest values and display helpers
//
// The gateway reports throughput in Mbps and latency in milliseconds
// regardless of controller family; normalization only reshapes envelopes,
// never units.

use serde::{Deserialize, Serialize};

/// A single normalized speedtest sample from the gateway's archive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedtestResult {
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub latency_ms: f64,
    /// Epoch milliseconds when the gateway ran the test.
    pub timestamp: i64,
}

/// Format a throughput value with an appropriate unit (Mb/s or Gb/s).
pub fn format_speed(mbps: f64) -> String {
    if mbps >= 1000.0 {
        format!("{:.1} Gb/s", mbps / 1000.0)
    } else {
        format!("{mbps:.1} Mb/s")
    }
}

/// Human-readable relative age of a sample timestamp (epoch millis).
pub fn relative_time(timestamp_millis: i64) -> String {
    relative_time_at(timestamp_millis, chrono::Utc::now().timestamp_millis())
}

fn relative_time_at(timestamp_millis: i64, now_millis: i64) -> String {
    let diff = now_millis - timestamp_millis;

    if diff < 60_000 {
        "just now".to_owned()
    } else if diff < 3_600_000 {
        format!("{} minutes ago", diff / 60_000)
    } else if diff < 86_400_000 {
        format!("{} hours ago", diff / 3_600_000)
    } else {
        format!("{} days ago", diff / 86_400_000)
    }
}
