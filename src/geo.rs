// geo.rs — Stateless geodesy and unit conversion.
//
// Everything here is a pure function; the session engine is the only caller
// that matters, but the replay and demo binaries use the unit table too.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two lat/lon pairs (degrees in), rounded to
/// whole meters. Symmetric, and zero for identical coordinates.
pub fn haversine_distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> u64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    (EARTH_RADIUS_M * c).round() as u64
}

/// Display units for speeds. The engine works in m/s internally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum SpeedUnit {
    /// m/s (identity)
    #[value(name = "ms")]
    MetersPerSecond,
    /// km/h
    #[value(name = "kmh")]
    KilometersPerHour,
    /// mph
    #[value(name = "mph")]
    MilesPerHour,
    /// min/km running pace
    #[value(name = "pace")]
    MinutesPerKm,
}

impl SpeedUnit {
    pub fn label(&self) -> &'static str {
        match self {
            SpeedUnit::MetersPerSecond => "m/s",
            SpeedUnit::KilometersPerHour => "km/h",
            SpeedUnit::MilesPerHour => "mph",
            SpeedUnit::MinutesPerKm => "min/km",
        }
    }
}

/// Convert a speed in m/s to `unit`.
///
/// Pace at zero speed has no finite value; this returns `f64::INFINITY`
/// rather than panicking, and callers that print pace must guard for it.
pub fn convert_speed(mps: f64, unit: SpeedUnit) -> f64 {
    match unit {
        SpeedUnit::MetersPerSecond => mps,
        SpeedUnit::KilometersPerHour => mps * 3.6,
        SpeedUnit::MilesPerHour => mps * 2.23694,
        SpeedUnit::MinutesPerKm => {
            let kmh = mps * 3.6;
            if kmh == 0.0 {
                f64::INFINITY
            } else {
                60.0 / kmh
            }
        }
    }
}
