// tracker.rs — Single-owner runtime around SessionEngine.
//
// One tokio task owns the engine; commands and fixes arrive over channels
// and are applied in arrival order, and a tokio interval supplies the
// periodic tick. No entry point ever executes concurrently against the
// engine, and event dispatch happens after the engine call has returned.

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::session::{SessionEngine, SessionEvent, SessionPhase};
use crate::types::LocationFix;

const COMMAND_CHANNEL_CAPACITY: usize = 16;
const FIX_CHANNEL_CAPACITY: usize = 100;
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Snapshot emission cadence. Affects how often snapshots appear, not
    /// the correctness of any metric.
    pub tick_interval: Duration,
    /// Hard ceiling on one trip's wall-clock lifetime; the runtime stops
    /// the session when it is exceeded.
    pub max_session: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1000),
            max_session: Duration::from_secs(24 * 3600),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    Start,
    Pause,
    Resume,
    Stop,
}

/// Handle to a running tracker task. Cloneable; dropping every handle (and
/// every fix sender) shuts the task down once its channels drain.
#[derive(Clone)]
pub struct SpeedTracker {
    command_tx: mpsc::Sender<SessionCommand>,
    fix_tx: mpsc::Sender<LocationFix>,
}

impl SpeedTracker {
    /// Spawn the owner task. Returns the handle and the event stream
    /// (lifecycle notifications plus one snapshot per tick while running).
    pub fn spawn(config: TrackerConfig) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (fix_tx, fix_rx) = mpsc::channel(FIX_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        tokio::spawn(tracker_task(config, command_rx, fix_rx, event_tx));

        (Self { command_tx, fix_tx }, event_rx)
    }

    pub async fn command(&self, command: SessionCommand) {
        if self.command_tx.send(command).await.is_err() {
            log::warn!("tracker task gone, {command:?} dropped");
        }
    }

    pub async fn submit_fix(&self, fix: LocationFix) {
        if self.fix_tx.send(fix).await.is_err() {
            log::warn!("tracker task gone, fix dropped");
        }
    }

    /// Sender clone for producer tasks that deliver fixes directly.
    pub fn fix_sender(&self) -> mpsc::Sender<LocationFix> {
        self.fix_tx.clone()
    }
}

async fn tracker_task(
    config: TrackerConfig,
    mut command_rx: mpsc::Receiver<SessionCommand>,
    mut fix_rx: mpsc::Receiver<LocationFix>,
    event_tx: mpsc::Sender<SessionEvent>,
) {
    let mut engine = SessionEngine::new();
    let mut ticker = interval(config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut started_at_ms: Option<i64> = None;
    let max_session_ms = config.max_session.as_millis() as i64;

    loop {
        let events = tokio::select! {
            command = command_rx.recv() => {
                let Some(command) = command else { break };
                let now = now_ms();
                match command {
                    SessionCommand::Start => {
                        started_at_ms = Some(now);
                        engine.start(now)
                    }
                    SessionCommand::Pause => engine.pause(now),
                    SessionCommand::Resume => engine.resume(now),
                    SessionCommand::Stop => {
                        started_at_ms = None;
                        engine.stop(now)
                    }
                }
            }
            fix = fix_rx.recv() => {
                let Some(fix) = fix else { break };
                engine.on_location_fix(&fix);
                Vec::new()
            }
            _ = ticker.tick() => {
                let now = now_ms();
                let mut events = engine.on_tick(now);
                // Session lifetime ceiling (driver policy, not engine logic)
                if engine.phase() != SessionPhase::Idle {
                    if let Some(started) = started_at_ms {
                        if now - started >= max_session_ms {
                            log::warn!("max session duration reached, stopping session");
                            started_at_ms = None;
                            events.extend(engine.stop(now));
                        }
                    }
                }
                events
            }
        };

        for event in events {
            // try_send: a slow subscriber must not stall the owner loop
            if let Err(mpsc::error::TrySendError::Full(event)) = event_tx.try_send(event) {
                log::warn!("event channel full, dropping {event:?}");
            }
        }
    }

    log::info!("tracker task shutting down");
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionMetrics;

    async fn next_event(rx: &mut mpsc::Receiver<SessionEvent>) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    async fn next_snapshot(rx: &mut mpsc::Receiver<SessionEvent>) -> SessionMetrics {
        loop {
            if let SessionEvent::Snapshot(m) = next_event(rx).await {
                return m;
            }
        }
    }

    fn fast_config() -> TrackerConfig {
        TrackerConfig {
            tick_interval: Duration::from_millis(10),
            ..TrackerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_start_emits_started_then_snapshots() {
        let (tracker, mut events) = SpeedTracker::spawn(fast_config());
        tracker.command(SessionCommand::Start).await;
        assert_eq!(next_event(&mut events).await, SessionEvent::Started);

        let snapshot = next_snapshot(&mut events).await;
        assert!(!snapshot.is_paused);
        assert_eq!(snapshot.trip_distance_m, 0);
    }

    #[tokio::test]
    async fn test_fix_flows_into_snapshots() {
        let (tracker, mut events) = SpeedTracker::spawn(fast_config());
        tracker.command(SessionCommand::Start).await;
        assert_eq!(next_event(&mut events).await, SessionEvent::Started);

        let now = now_ms();
        tracker
            .submit_fix(LocationFix {
                latitude: 48.0001,
                longitude: 11.0,
                accuracy: 3.0,
                speed: None,
                timestamp_ms: now,
            })
            .await;
        tracker
            .submit_fix(LocationFix {
                latitude: 48.0011,
                longitude: 11.0,
                accuracy: 3.0,
                speed: None,
                timestamp_ms: now + 1_000,
            })
            .await;

        let mut snapshot = next_snapshot(&mut events).await;
        while snapshot.trip_distance_m == 0 {
            snapshot = next_snapshot(&mut events).await;
        }
        assert_eq!(snapshot.trip_distance_m, 111);
        assert_eq!(snapshot.signal_level, 3);
    }

    #[tokio::test]
    async fn test_pause_suppresses_snapshots() {
        let (tracker, mut events) = SpeedTracker::spawn(fast_config());
        tracker.command(SessionCommand::Start).await;
        assert_eq!(next_event(&mut events).await, SessionEvent::Started);
        let _ = next_snapshot(&mut events).await;

        tracker.command(SessionCommand::Pause).await;
        // Drain until the Paused notification; after it, only Resumed may
        // follow — no snapshots while paused.
        loop {
            match next_event(&mut events).await {
                SessionEvent::Paused => break,
                SessionEvent::Snapshot(_) => continue,
                other => panic!("unexpected event {other:?}"),
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        tracker.command(SessionCommand::Resume).await;
        assert_eq!(next_event(&mut events).await, SessionEvent::Resumed);
    }

    #[tokio::test]
    async fn test_stop_emits_stopped() {
        let (tracker, mut events) = SpeedTracker::spawn(fast_config());
        tracker.command(SessionCommand::Start).await;
        assert_eq!(next_event(&mut events).await, SessionEvent::Started);
        tracker.command(SessionCommand::Stop).await;
        loop {
            match next_event(&mut events).await {
                SessionEvent::Stopped => break,
                SessionEvent::Snapshot(_) => continue,
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_invalid_commands_produce_no_events() {
        let (tracker, mut events) = SpeedTracker::spawn(TrackerConfig {
            // Slow ticks so the channel stays quiet without a session
            tick_interval: Duration::from_secs(60),
            ..TrackerConfig::default()
        });
        tracker.command(SessionCommand::Pause).await;
        tracker.command(SessionCommand::Resume).await;
        tracker.command(SessionCommand::Stop).await;
        let outcome = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;
        assert!(outcome.is_err(), "no events expected for no-op commands");
    }
}
