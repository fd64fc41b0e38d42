use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tokio::time::{sleep, Duration};

use speed_tracker_rs::fixes;
use speed_tracker_rs::geo::{convert_speed, SpeedUnit};
use speed_tracker_rs::session::SessionEvent;
use speed_tracker_rs::status::TripStatus;
use speed_tracker_rs::tracker::{SessionCommand, SpeedTracker, TrackerConfig};

#[derive(Parser, Debug)]
#[command(name = "speed_tracker")]
#[command(about = "GPS speed-tracking session engine demo", long_about = None)]
struct Args {
    /// Duration in seconds (0 = continuous)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Snapshot tick interval in milliseconds
    #[arg(long, default_value = "1000")]
    tick_interval_ms: u64,

    /// Mock fix cadence in milliseconds
    #[arg(long, default_value = "1000")]
    fix_interval_ms: u64,

    /// Display unit for printed speeds
    #[arg(long, value_enum, default_value = "kmh")]
    unit: SpeedUnit,

    /// Output directory for the live status file
    #[arg(long, default_value = "speed_tracker_sessions")]
    output_dir: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("[{}] Speed Tracker RS starting", ts_now());
    println!("  Duration: {} seconds (0=continuous)", args.duration);
    println!("  Tick interval: {} ms", args.tick_interval_ms);
    println!("  Display unit: {}", args.unit.label());
    println!("  Output dir: {}", args.output_dir);

    std::fs::create_dir_all(&args.output_dir)?;

    let config = TrackerConfig {
        tick_interval: Duration::from_millis(args.tick_interval_ms),
        ..TrackerConfig::default()
    };
    let (tracker, mut events) = SpeedTracker::spawn(config);

    let _fix_handle = tokio::spawn(fixes::mock_fix_loop(
        tracker.fix_sender(),
        args.fix_interval_ms,
    ));

    tracker.command(SessionCommand::Start).await;

    let start = Utc::now();
    let mut last_status_save = Utc::now();
    let mut status = TripStatus::new();
    let mut last_metrics = None;
    let status_path = format!("{}/live_status.json", args.output_dir);

    loop {
        if args.duration > 0 {
            let elapsed = Utc::now().signed_duration_since(start);
            if elapsed.num_seconds() as u64 >= args.duration {
                println!("[{}] Duration reached, stopping...", ts_now());
                break;
            }
        }

        while let Ok(event) = events.try_recv() {
            match event {
                SessionEvent::Started => println!("[{}] Session started", ts_now()),
                SessionEvent::Stopped => println!("[{}] Session stopped", ts_now()),
                SessionEvent::Paused => println!("[{}] Session paused", ts_now()),
                SessionEvent::Resumed => println!("[{}] Session resumed", ts_now()),
                SessionEvent::Snapshot(metrics) => {
                    status.apply(&metrics);
                    status.snapshots_seen += 1;
                    last_metrics = Some(metrics);
                }
            }
        }

        let now = Utc::now();
        if now.signed_duration_since(last_status_save).num_seconds() >= 2 {
            status.uptime_seconds = now.signed_duration_since(start).num_seconds().max(0) as u64;
            if let Err(e) = status.save(&status_path) {
                log::warn!("status save failed: {e}");
            }
            if let Some(m) = &last_metrics {
                println!(
                    "[{}] {:.1} {} | max {:.1} | {:.3} km | avg {:.1} km/h | {} s | signal {}",
                    ts_now(),
                    convert_speed(m.speed, args.unit),
                    args.unit.label(),
                    convert_speed(m.max_speed, args.unit),
                    m.trip_distance_km,
                    m.avg_speed_kmh,
                    m.elapsed_secs,
                    m.signal_level,
                );
            }
            last_status_save = now;
        }

        sleep(Duration::from_millis(50)).await;
    }

    tracker.command(SessionCommand::Stop).await;

    // Give the tracker a beat to emit Stopped, then drain what is left
    sleep(Duration::from_millis(100)).await;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Snapshot(metrics) = event {
            status.apply(&metrics);
            last_metrics = Some(metrics);
        }
    }

    status.uptime_seconds = Utc::now()
        .signed_duration_since(start)
        .num_seconds()
        .max(0) as u64;
    let final_path = format!("{}/live_status_final.json", args.output_dir);
    status.save(&final_path)?;

    println!("\n=== Final Stats ===");
    if let Some(m) = &last_metrics {
        println!(
            "Speed: {:.2} {}",
            convert_speed(m.speed, args.unit),
            args.unit.label()
        );
        println!(
            "Max speed: {:.2} {}",
            convert_speed(m.max_speed, args.unit),
            args.unit.label()
        );
        println!("Trip distance: {} m ({:.3} km)", m.trip_distance_m, m.trip_distance_km);
        println!("Average speed: {:.2} km/h", m.avg_speed_kmh);
        println!("Active time: {} s", m.elapsed_secs);
    } else {
        println!("No snapshots received");
    }

    Ok(())
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
