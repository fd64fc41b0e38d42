use serde::{Deserialize, Serialize};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::session::SessionMetrics;

/// Flat trip status written to disk for external consumers (widgets,
/// dashboards, shell scripts). One file, overwritten in place.
#[derive(Serialize, Deserialize, Clone)]
pub struct TripStatus {
    pub timestamp: f64,
    pub speed_ms: f64,
    pub speed_kmh: f64,
    pub max_speed_ms: f64,
    pub max_speed_kmh: f64,
    pub trip_distance_m: u64,
    pub trip_distance_km: f64,
    pub avg_speed_kmh: f64,
    pub elapsed_secs: u64,
    pub signal_level: u8,
    pub is_paused: bool,
    pub snapshots_seen: u64,
    pub uptime_seconds: u64,
}

impl TripStatus {
    pub fn new() -> Self {
        Self {
            timestamp: current_timestamp(),
            speed_ms: 0.0,
            speed_kmh: 0.0,
            max_speed_ms: 0.0,
            max_speed_kmh: 0.0,
            trip_distance_m: 0,
            trip_distance_km: 0.0,
            avg_speed_kmh: 0.0,
            elapsed_secs: 0,
            signal_level: 0,
            is_paused: false,
            snapshots_seen: 0,
            uptime_seconds: 0,
        }
    }

    /// Fold a metrics snapshot into the status record.
    pub fn apply(&mut self, metrics: &SessionMetrics) {
        self.timestamp = current_timestamp();
        self.speed_ms = metrics.speed;
        self.speed_kmh = metrics.speed * 3.6;
        self.max_speed_ms = metrics.max_speed;
        self.max_speed_kmh = metrics.max_speed * 3.6;
        self.trip_distance_m = metrics.trip_distance_m;
        self.trip_distance_km = metrics.trip_distance_km;
        self.avg_speed_kmh = metrics.avg_speed_kmh;
        self.elapsed_secs = metrics.elapsed_secs;
        self.signal_level = metrics.signal_level;
        self.is_paused = metrics.is_paused;
    }

    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for TripStatus {
    fn default() -> Self {
        Self::new()
    }
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_snapshot() {
        let metrics = SessionMetrics {
            speed: 10.0,
            max_speed: 12.5,
            trip_distance_m: 1500,
            trip_distance_km: 1.5,
            avg_speed_kmh: 30.0,
            elapsed_secs: 180,
            signal_level: 2,
            is_paused: false,
        };
        let mut status = TripStatus::new();
        status.apply(&metrics);
        assert_eq!(status.speed_kmh, 36.0);
        assert_eq!(status.max_speed_kmh, 45.0);
        assert_eq!(status.trip_distance_m, 1500);
        assert_eq!(status.elapsed_secs, 180);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = std::env::temp_dir().join("speed_tracker_status_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("live_status.json");

        let mut status = TripStatus::new();
        status.snapshots_seen = 42;
        status.save(path.to_str().unwrap()).unwrap();

        let loaded: TripStatus =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.snapshots_seen, 42);
    }
}
