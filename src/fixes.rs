// fixes.rs — Fix producers for the demo binary.
//
// The real acquisition layer (fused provider, permissions, foreground
// service) lives outside this crate; these producers exist so the tracker
// can be exercised end to end without a positioning stack.

use chrono::Utc;
use tokio::sync::mpsc::Sender;
use tokio::time::{interval, Duration};

use crate::types::LocationFix;

/// Synthetic drive: a vehicle heading north from a fixed origin, speeding up
/// and slowing down on a slow sine, with accuracy wobbling between buckets.
/// Every few fixes the reported speed is withheld so the engine exercises
/// its derived-speed path.
pub async fn mock_fix_loop(tx: Sender<LocationFix>, interval_ms: u64) {
    let mut ticker = interval(Duration::from_millis(interval_ms));
    let mut seq = 0u64;
    let mut lat = 48.137_200_f64;
    let lon = 11.575_500_f64;

    loop {
        ticker.tick().await;

        let t = seq as f64;
        let speed_mps = (14.0 + (t * 0.05).sin() * 6.0).max(0.0);
        // Advance latitude by the distance covered in one interval
        lat += speed_mps * (interval_ms as f64 / 1000.0) / 111_195.0;

        let fix = LocationFix {
            latitude: lat,
            longitude: lon,
            accuracy: 4.0 + (t * 0.2).sin().abs() * 20.0,
            speed: if seq % 5 == 0 { None } else { Some(speed_mps) },
            timestamp_ms: Utc::now().timestamp_millis(),
        };

        match tx.try_send(fix) {
            Ok(_) => {
                seq += 1;
                if seq % 30 == 0 {
                    log::debug!("[fixes] {seq} mock fixes produced");
                }
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                log::info!("[fixes] channel closed after {seq} fixes");
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                // Consumer is behind, drop this fix
            }
        }
    }
}
