use super::session::RaceSession;
use super::types::{GameEvent, RaceBroadcast};

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct WorldSettings {
    pub tick_interval: Duration,
    pub boost_spawn_interval: Duration,
    /// Artificial latency added to every state broadcast.
    pub output_delay: Duration,
}

/// Wall-clock epoch milliseconds, the time base for laps and boosts.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Queues an event for the world task, optionally after an artificial delay.
///
/// Delayed events are handed to their own task so the caller never waits on the delay.
pub fn submit_event(
    input_tx: &mpsc::Sender<GameEvent>,
    event: GameEvent,
    delay: Duration,
) -> Result<(), mpsc::error::TrySendError<GameEvent>> {
    if delay.is_zero() {
        return input_tx.try_send(event);
    }

    let input_tx = input_tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if input_tx.send(event).await.is_err() {
            debug!("world task gone before delayed input arrived");
        }
    });
    Ok(())
}

/// Owns the race session and serializes ticks, boost spawns and inbound events.
pub async fn world_task(
    mut input_rx: mpsc::Receiver<GameEvent>,
    world_tx: broadcast::Sender<RaceBroadcast>,
    mut session: RaceSession,
    settings: WorldSettings,
) {
    let mut rng = StdRng::from_entropy();

    let mut tick = tokio::time::interval(settings.tick_interval);
    // A late tick is dropped rather than replayed in a burst.
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // First spawn attempt one full period after start.
    let mut spawn = tokio::time::interval_at(
        Instant::now() + settings.boost_spawn_interval,
        settings.boost_spawn_interval,
    );
    spawn.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            event = input_rx.recv() => {
                let Some(event) = event else {
                    info!("input channel closed; world task exiting");
                    break;
                };
                handle_event(&mut session, &world_tx, event);
            }
            _ = tick.tick() => {
                if let Some(update) = session.tick(now_ms()) {
                    publish(&world_tx, RaceBroadcast::State(update), settings.output_delay);
                }
            }
            _ = spawn.tick() => {
                session.try_spawn_boost(now_ms(), &mut rng);
            }
        }
    }
}

fn handle_event(session: &mut RaceSession, world_tx: &broadcast::Sender<RaceBroadcast>, event: GameEvent) {
    match event {
        GameEvent::Setup {
            client_id,
            name,
            car_id,
            reply,
        } => {
            let result = session.join(client_id, name, car_id);
            match &result {
                Ok(car) => {
                    info!(
                        player_id = client_id,
                        name = %car.name,
                        car_id = %car.car_id,
                        players = session.car_count(),
                        "player joined"
                    );
                    let _ = world_tx.send(RaceBroadcast::PlayerJoined(car.clone()));
                }
                Err(e) => {
                    info!(player_id = client_id, players = session.car_count(), reason = %e, "player setup rejected");
                }
            }
            if reply.send(result).is_err() {
                debug!(player_id = client_id, "setup reply dropped; connection already gone");
            }
        }
        GameEvent::Leave { client_id } => {
            if let Some(car) = session.leave(client_id) {
                info!(player_id = client_id, name = %car.name, players = session.car_count(), "player left");
                let _ = world_tx.send(RaceBroadcast::PlayerLeft { id: client_id });
            }
        }
        GameEvent::Input { client_id, controls } => {
            if !session.apply_controls(client_id, controls) {
                debug!(player_id = client_id, "input for unknown car ignored");
            }
        }
        GameEvent::ExistingPlayers { reply } => {
            let _ = reply.send(session.cars_snapshot());
        }
    }
}

fn publish(world_tx: &broadcast::Sender<RaceBroadcast>, msg: RaceBroadcast, delay: Duration) {
    // Sending fails only when no connection is subscribed.
    if delay.is_zero() {
        let _ = world_tx.send(msg);
        return;
    }

    let world_tx = world_tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = world_tx.send(msg);
    });
}

/// Logs the configured artificial latency, if any.
pub fn warn_if_delayed(input_delay: Duration, output_delay: Duration) {
    if !input_delay.is_zero() || !output_delay.is_zero() {
        warn!(
            input_delay_ms = input_delay.as_millis() as u64,
            output_delay_ms = output_delay.as_millis() as u64,
            "artificial latency enabled"
        );
    }
}
