use std::sync::Arc;

use chatrooms::{
    app, AppConfig, AppState, EventBus, InMemoryRoomRepository, PostgresRoomRepository,
    RoomRepository,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatrooms=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting chat room server");

    let config = AppConfig::from_env();

    let room_repository: Arc<dyn RoomRepository + Send + Sync> = match &config.database_url {
        Some(database_url) => {
            let pool = sqlx::PgPool::connect(database_url).await?;
            info!("Connected to PostgreSQL");
            Arc::new(PostgresRoomRepository::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory room repository");
            Arc::new(InMemoryRoomRepository::new())
        }
    };

    let app_state = AppState::new(
        room_repository,
        config.token_config(),
        EventBus::new(config.event_bus_capacity),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app(app_state)).await?;

    Ok(())
}
