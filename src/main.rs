use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use groomquiz::{
    api, bots, broadcast,
    config::HostConfig,
    state::AppState,
    types::{Deck, GameConfig},
    ws,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "groomquiz=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting groomquiz host...");

    let host_config = HostConfig::from_env();
    let game_config = GameConfig::from_env();
    tracing::info!("Game config: {:?}", game_config);

    let deck = match host_config.questions_path.as_deref() {
        Some(path) => match Deck::load(path) {
            Ok(deck) => deck,
            Err(e) => {
                tracing::error!("{}", e);
                return;
            }
        },
        None => {
            tracing::warn!("QUESTIONS_PATH not set, hosting an empty deck");
            Deck::default()
        }
    };

    let state = Arc::new(AppState::with_config(game_config));
    if let Err(e) = state.host_game(deck).await {
        tracing::error!("Failed to open lobby: {}", e);
        return;
    }

    // Countdown display and phase expiry
    broadcast::spawn_phase_ticker(state.clone());

    // Plays every isBot player through the regular dispatch path
    bots::spawn_bot_driver(state.clone());

    let api_routes = Router::new()
        .route("/api/state/export", get(api::export_state))
        .route("/api/state/import", post(api::import_state))
        .route("/api/standings", get(api::standings));

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(api_routes)
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = host_config.bind_addr;
    tracing::info!("Listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
