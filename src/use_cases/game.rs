use super::types::{RoomEvent, RoomUpdate};
use crate::domain::{Outbound, Room, RoomMessage, WorldSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Upper bound on a single simulation step.
const MAX_STEP: Duration = Duration::from_millis(250);

/// Drives one room: fixed-rate ticks, the day/night timer and queued events.
///
/// The task owns the `Room`; all mutations happen on this task.
pub async fn room_task(
    mut room: Room,
    mut input_rx: mpsc::Receiver<RoomEvent>,
    update_tx: broadcast::Sender<RoomUpdate>,
    latest_tx: watch::Sender<Arc<WorldSnapshot>>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let day_night_enabled = room.config().day_night_cycle;
    // A zero period would make `interval` panic; the branch is disabled anyway.
    let day_night_period = room.config().day_night_duration.max(Duration::from_millis(1));
    let mut day_night =
        tokio::time::interval_at(Instant::now() + day_night_period, day_night_period);

    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                // Exit cleanly when the room is removed.
                break;
            }
            _ = day_night.tick(), if day_night_enabled => {
                publish_messages(&update_tx, room.toggle_day_night());
            }
            _ = ticker.tick() => {
                drain_events(&mut room, &mut input_rx, &update_tx, &latest_tx);

                let now = Instant::now();
                let dt = now.duration_since(last_tick).min(MAX_STEP);
                last_tick = now;

                let out = room.tick(dt.as_secs_f32() * 1000.0);
                publish_messages(&update_tx, out);
                publish_patch(&mut room, &update_tx, &latest_tx);
            }
        }
    }

    room.on_dispose();
    info!("room task stopped");
}

fn drain_events(
    room: &mut Room,
    input_rx: &mut mpsc::Receiver<RoomEvent>,
    update_tx: &broadcast::Sender<RoomUpdate>,
    latest_tx: &watch::Sender<Arc<WorldSnapshot>>,
) {
    while let Ok(event) = input_rx.try_recv() {
        match event {
            RoomEvent::Join {
                session_id,
                username,
                clan,
            } => match room.on_join(&session_id, &username, clan) {
                Ok(out) => {
                    info!(session_id = %session_id, username = %username, "player joined");
                    publish_messages(update_tx, out);
                    // Everyone else learns about the newcomer from the patch; the
                    // newcomer gets the full state built on the same baseline.
                    let snapshot = publish_patch(room, update_tx, latest_tx);
                    let _ = update_tx.send(RoomUpdate::Sync {
                        session_id,
                        snapshot,
                    });
                }
                Err(err) => {
                    info!(session_id = %session_id, error = %err, "join rejected");
                    let _ = update_tx.send(RoomUpdate::Message(Outbound::to_session(
                        session_id,
                        RoomMessage::JoinRejected {
                            reason: err.to_string(),
                        },
                    )));
                }
            },
            RoomEvent::Leave { session_id } => {
                if room.on_leave(&session_id) {
                    info!(session_id = %session_id, "player left");
                }
                // A finished match starts over once its last player is gone.
                if room.is_game_over() && room.reset() {
                    publish_patch(room, update_tx, latest_tx);
                }
            }
            RoomEvent::Command {
                session_id,
                command,
            } => {
                let out = room.handle_command(&session_id, command);
                publish_messages(update_tx, out);
            }
        }
    }
}

fn publish_messages(update_tx: &broadcast::Sender<RoomUpdate>, out: Vec<Outbound>) {
    for outbound in out {
        // No receivers just means nobody is connected right now.
        let _ = update_tx.send(RoomUpdate::Message(outbound));
    }
}

fn publish_patch(
    room: &mut Room,
    update_tx: &broadcast::Sender<RoomUpdate>,
    latest_tx: &watch::Sender<Arc<WorldSnapshot>>,
) -> Arc<WorldSnapshot> {
    let (patch, snapshot) = room.publish();
    latest_tx.send_replace(Arc::clone(&snapshot));
    if !patch.is_empty()
        && update_tx.send(RoomUpdate::Patch(Arc::new(patch))).is_err()
        && room.player_count() > 0
    {
        warn!("room has players but no update receivers");
    }
    snapshot
}
