// session.rs — Speed-tracking session state machine.
//
// Everything in this module is independent of:
//   - tokio / async runtime
//   - the OS positioning subsystem
//   - File I/O, status files, logging sinks
//
// It takes location fixes and clock ticks in, produces metric snapshots and
// lifecycle events out. Every entry point receives its timestamp explicitly,
// so the engine can be driven from a live clock, a replayed log, or a test
// with simulated time without touching the session logic.

use serde::{Deserialize, Serialize};

use crate::geo::haversine_distance_meters;
use crate::types::LocationFix;

/// Signal-level buckets from horizontal accuracy, best (3) to unusable (0).
const SIGNAL_ACCURACY_BOUNDS_M: [f64; 3] = [4.0, 10.0, 50.0];

/// Lifecycle phase of a trip. `Idle` is both the initial state and the
/// terminal state of a finished trip; a new trip starts with `start()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Idle,
    Running,
    Paused,
}

/// Immutable metrics snapshot. Produced fresh on every emission; consumers
/// must not assume identity stability between emissions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    /// Instantaneous speed, m/s.
    pub speed: f64,
    /// Highest speed seen this trip, m/s.
    pub max_speed: f64,
    /// Cumulative trip distance, whole meters.
    pub trip_distance_m: u64,
    /// Cumulative trip distance, kilometers.
    pub trip_distance_km: f64,
    /// Trip average speed, km/h.
    pub avg_speed_kmh: f64,
    /// Active elapsed time, seconds. Excludes paused intervals.
    pub elapsed_secs: u64,
    /// Coarse fix-accuracy classification, 0 (worst) to 3 (best).
    pub signal_level: u8,
    pub is_paused: bool,
}

/// Outbound notifications. Entry points return these instead of invoking a
/// callback, so the driver can dispatch to its subscriber without the engine
/// state being live on the stack.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    Started,
    Stopped,
    Paused,
    Resumed,
    Snapshot(SessionMetrics),
}

/// The session engine. One instance per logical trip owner; the instance is
/// reusable across trips, but `start()` wipes all prior metrics.
///
/// Invalid transitions (`pause()` while Idle, `resume()` while Running, ...)
/// are deliberate no-ops so duplicate driver calls cannot corrupt a trip.
pub struct SessionEngine {
    phase: SessionPhase,

    // Last seen position. (0, 0) doubles as the "unset" sentinel before the
    // first fix, matching the acquisition layer's contract.
    last_lat: f64,
    last_lon: f64,

    // Timestamp basis for derived-speed computation.
    last_speed_sample_ms: i64,

    session_start_ms: i64,
    paused_total_ms: i64,
    pause_started_ms: Option<i64>,

    // Armed on resume: the first derived-speed sample after a pause would
    // span the pause gap and spike, so exactly one derivation is skipped.
    skip_next_derived_speed: bool,

    speed: f64,
    max_speed: f64,
    trip_distance_m: u64,
    avg_speed_kmh: f64,
    elapsed_secs: u64,
    signal_level: u8,
}

impl SessionEngine {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            last_lat: 0.0,
            last_lon: 0.0,
            last_speed_sample_ms: 0,
            session_start_ms: 0,
            paused_total_ms: 0,
            pause_started_ms: None,
            skip_next_derived_speed: false,
            speed: 0.0,
            max_speed: 0.0,
            trip_distance_m: 0,
            avg_speed_kmh: 0.0,
            elapsed_secs: 0,
            signal_level: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Fresh snapshot of the current metrics. Valid in any phase; after
    /// `stop()` this reads the final accumulators of the finished trip.
    pub fn metrics(&self) -> SessionMetrics {
        SessionMetrics {
            speed: self.speed,
            max_speed: self.max_speed,
            trip_distance_m: self.trip_distance_m,
            trip_distance_km: self.trip_distance_m as f64 / 1000.0,
            avg_speed_kmh: self.avg_speed_kmh,
            elapsed_secs: self.elapsed_secs,
            signal_level: self.signal_level,
            is_paused: self.phase == SessionPhase::Paused,
        }
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// Begin a new trip. Valid from any phase; calling while Running resets
    /// and starts over, which is the defined contract.
    pub fn start(&mut self, now_ms: i64) -> Vec<SessionEvent> {
        self.reset();
        self.phase = SessionPhase::Running;
        self.session_start_ms = now_ms;
        vec![SessionEvent::Started]
    }

    /// Running -> Paused. No-op from any other phase.
    pub fn pause(&mut self, now_ms: i64) -> Vec<SessionEvent> {
        if self.phase != SessionPhase::Running {
            return Vec::new();
        }
        self.phase = SessionPhase::Paused;
        self.pause_started_ms = Some(now_ms);
        vec![SessionEvent::Paused]
    }

    /// Paused -> Running. Folds the completed pause interval into the pause
    /// total and suppresses the next derived-speed sample. No-op otherwise.
    pub fn resume(&mut self, now_ms: i64) -> Vec<SessionEvent> {
        if self.phase != SessionPhase::Paused {
            return Vec::new();
        }
        if let Some(started) = self.pause_started_ms.take() {
            self.paused_total_ms += (now_ms - started).max(0);
        }
        self.phase = SessionPhase::Running;
        self.skip_next_derived_speed = true;
        vec![SessionEvent::Resumed]
    }

    /// Running|Paused -> Idle. Accumulators are retained for final reads and
    /// only wiped by the next `start()`. No-op while Idle.
    pub fn stop(&mut self, now_ms: i64) -> Vec<SessionEvent> {
        if self.phase == SessionPhase::Idle {
            return Vec::new();
        }
        // Fold an open pause so a post-stop read matches the frozen value.
        if let Some(started) = self.pause_started_ms.take() {
            self.paused_total_ms += (now_ms - started).max(0);
        }
        self.phase = SessionPhase::Idle;
        vec![SessionEvent::Stopped]
    }

    // ── Periodic tick ────────────────────────────────────────────────────

    /// Advance active elapsed time and emit a snapshot. Expected at ~1 Hz
    /// from the driver while it considers the session alive; cheap no-op in
    /// Idle, frozen (no time advance, no snapshot) while Paused.
    pub fn on_tick(&mut self, now_ms: i64) -> Vec<SessionEvent> {
        if self.phase != SessionPhase::Running {
            return Vec::new();
        }
        let active_ms = (now_ms - self.session_start_ms - self.paused_total_ms).max(0);
        self.elapsed_secs = (active_ms / 1000) as u64;
        vec![SessionEvent::Snapshot(self.metrics())]
    }

    // ── Location fixes ───────────────────────────────────────────────────

    /// Ingest one fix. Signal level is tracked in every phase; position is
    /// tracked outside Running too, but distance/speed accumulators only
    /// move while Running.
    pub fn on_location_fix(&mut self, fix: &LocationFix) {
        self.signal_level = signal_level_for(fix.accuracy);

        // First-fix bootstrap: seed the reference position and the
        // derived-speed timestamp basis, nothing else.
        if self.last_lat == 0.0 && self.last_lon == 0.0 {
            self.last_lat = fix.latitude;
            self.last_lon = fix.longitude;
            self.last_speed_sample_ms = fix.timestamp_ms;
            return;
        }

        if self.phase != SessionPhase::Running {
            self.last_lat = fix.latitude;
            self.last_lon = fix.longitude;
            return;
        }

        if let Some(reported) = fix.speed {
            // Trust the sensor when it measured speed directly.
            self.speed = reported;
        } else if self.skip_next_derived_speed {
            // One fix after resume: deriving here would divide distance by
            // the whole pause gap. Advance the basis and move on.
            self.last_speed_sample_ms = fix.timestamp_ms;
            self.skip_next_derived_speed = false;
        } else {
            let meters =
                haversine_distance_meters(self.last_lat, self.last_lon, fix.latitude, fix.longitude);
            let dt_ms = (fix.timestamp_ms - self.last_speed_sample_ms).max(1);
            self.speed = meters as f64 / dt_ms as f64 * 1000.0;
            self.last_speed_sample_ms = fix.timestamp_ms;
        }
        self.max_speed = self.max_speed.max(self.speed);

        let delta =
            haversine_distance_meters(self.last_lat, self.last_lon, fix.latitude, fix.longitude);
        self.trip_distance_m += delta;
        self.avg_speed_kmh =
            self.trip_distance_m as f64 / self.elapsed_secs.max(1) as f64 * 3.6;

        self.last_lat = fix.latitude;
        self.last_lon = fix.longitude;
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for SessionEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn signal_level_for(accuracy_m: f64) -> u8 {
    // accuracy == 0 falls into the best bucket by construction
    if accuracy_m <= SIGNAL_ACCURACY_BOUNDS_M[0] {
        3
    } else if accuracy_m <= SIGNAL_ACCURACY_BOUNDS_M[1] {
        2
    } else if accuracy_m <= SIGNAL_ACCURACY_BOUNDS_M[2] {
        1
    } else {
        0
    }
}
