// Framework bootstrap for the race server runtime.

use crate::domain::tuning::{CarTuning, RaceTuning, TrackParams};
use crate::domain::TrackGeometry;
use crate::frameworks::config;
use crate::interface_adapters::net::{broadcast_serializer, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::game::{warn_if_delayed, world_task, WorldSettings};
use crate::use_cases::RaceSession;

use axum::extract::ws::Utf8Bytes;
use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{broadcast, mpsc, watch};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state();

    // The display and the phone controllers connect to the root; `/ws` is kept for tooling.
    let app = Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    tracing::info!(
        %address,
        tick_ms = config::TICK_INTERVAL.as_millis() as u64,
        tick_hz = (1000.0 / config::TICK_INTERVAL.as_millis() as f64).round() as u64,
        max_players = config::MAX_PLAYERS,
        "listening"
    );

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from((config::http_host(), config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Arc<AppState> {
    let input_delay = config::input_delay();
    let output_delay = config::output_delay();
    warn_if_delayed(input_delay, output_delay);

    let track = TrackGeometry::resolve(&TrackParams::default());
    let tuning = RaceTuning {
        car: CarTuning::for_tick_interval(config::TICK_INTERVAL),
        ..RaceTuning::default()
    };
    tracing::debug!(
        finish_x = track.finish.x,
        straight_length = track.straight_length,
        outer_radius = track.outer_radius,
        inner_radius = track.inner_radius,
        "track resolved"
    );

    let (input_tx, input_rx) = mpsc::channel(config::INPUT_CHANNEL_CAPACITY);
    let (world_tx, world_rx) = broadcast::channel(config::WORLD_BROADCAST_CAPACITY);
    let (frames_tx, _) = broadcast::channel(config::WORLD_BROADCAST_CAPACITY);
    let (latest_state_tx, _latest_state_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));

    // Serializer first so the world task never publishes into an unsubscribed channel.
    tokio::spawn(broadcast_serializer(
        world_rx,
        frames_tx.clone(),
        latest_state_tx.clone(),
    ));
    tokio::spawn(world_task(
        input_rx,
        world_tx,
        RaceSession::new(track, tuning, config::MAX_PLAYERS),
        WorldSettings {
            tick_interval: config::TICK_INTERVAL,
            boost_spawn_interval: config::BOOST_SPAWN_INTERVAL,
            output_delay,
        },
    ));

    Arc::new(AppState {
        input_tx,
        frames_tx,
        latest_state_tx,
        input_delay,
    })
}
