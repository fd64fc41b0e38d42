use serde::{Deserialize, Serialize};

/// A single position report from a positioning source.
///
/// `speed` is only present when the source measured it directly; otherwise
/// the session engine derives speed from consecutive fixes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters (larger = worse).
    pub accuracy: f64,
    /// Reported speed in m/s, if the source supplies one.
    pub speed: Option<f64>,
    /// Capture time in milliseconds (wall clock or monotonic, but the same
    /// basis as the timestamps handed to the engine's other entry points).
    pub timestamp_ms: i64,
}
