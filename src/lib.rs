pub mod fixes;
pub mod geo;
pub mod session;
pub mod status;
pub mod tracker;
pub mod types;

pub use geo::{convert_speed, haversine_distance_meters, SpeedUnit};
pub use session::{SessionEngine, SessionEvent, SessionMetrics, SessionPhase};
pub use tracker::{SessionCommand, SpeedTracker, TrackerConfig};
pub use types::LocationFix;
