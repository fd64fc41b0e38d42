// Deterministic replay of a recorded fix log through the session engine.
//
// Log format: { "fixes": [LocationFix, ...] } as .json or .json.gz. Ticks
// are synthesized from the log's own timeline, so the same log always
// produces the same metrics.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Parser;
use flate2::read::GzDecoder;
use serde::Deserialize;

use speed_tracker_rs::geo::{convert_speed, SpeedUnit};
use speed_tracker_rs::session::SessionEngine;
use speed_tracker_rs::types::LocationFix;

#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(about = "Replay a recorded fix log through the session engine", long_about = None)]
struct Args {
    /// Path to a fix log (*.json or *.json.gz)
    #[arg(long)]
    log: PathBuf,

    /// Synthesized tick cadence in milliseconds of log time
    #[arg(long, default_value = "1000")]
    tick_interval_ms: i64,

    /// Display unit for printed speeds
    #[arg(long, value_enum, default_value = "kmh")]
    unit: SpeedUnit,

    /// Write the final metrics as JSON to this path
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(Deserialize)]
struct FixLog {
    fixes: Vec<LocationFix>,
}

fn load_log(path: &Path) -> Result<FixLog> {
    let file = File::open(path)?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let gz = GzDecoder::new(file);
        let reader = BufReader::new(gz);
        Ok(serde_json::from_reader(reader)?)
    } else {
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let log = load_log(&args.log)?;
    if log.fixes.is_empty() {
        bail!("{} contains no fixes", args.log.display());
    }
    if args.tick_interval_ms <= 0 {
        bail!("tick interval must be positive");
    }

    let start_ms = log.fixes[0].timestamp_ms;
    let end_ms = log.fixes.last().map(|f| f.timestamp_ms).unwrap_or(start_ms);

    let mut engine = SessionEngine::new();
    engine.start(start_ms);

    // Interleave fixes with synthesized ticks in timeline order
    let mut next_tick_ms = start_ms + args.tick_interval_ms;
    for fix in &log.fixes {
        while next_tick_ms <= fix.timestamp_ms {
            engine.on_tick(next_tick_ms);
            next_tick_ms += args.tick_interval_ms;
        }
        engine.on_location_fix(fix);
    }
    engine.on_tick(end_ms);
    engine.stop(end_ms);

    let metrics = engine.metrics();
    println!("Replayed {} fixes from {}", log.fixes.len(), args.log.display());
    println!(
        "  Final speed:   {:.2} {}",
        convert_speed(metrics.speed, args.unit),
        args.unit.label()
    );
    println!(
        "  Max speed:     {:.2} {}",
        convert_speed(metrics.max_speed, args.unit),
        args.unit.label()
    );
    println!(
        "  Trip distance: {} m ({:.3} km)",
        metrics.trip_distance_m, metrics.trip_distance_km
    );
    println!("  Average speed: {:.2} km/h", metrics.avg_speed_kmh);
    println!("  Active time:   {} s", metrics.elapsed_secs);
    println!("  Signal level:  {}", metrics.signal_level);

    if let Some(summary_path) = &args.summary {
        let json = serde_json::to_string_pretty(&metrics)?;
        std::fs::write(summary_path, json)?;
        println!("Summary written to {}", summary_path.display());
    }

    Ok(())
}
