use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Level, info};

use common::storage::FilesystemImageStore;
use server::config::AppConfig;
use server::database::init_db;
use server::state::AppState;
use server::{build_router, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let db = init_db(&config.database.url).await?;
    seed::ensure_indexes(&db).await?;
    seed::seed_tags(&db).await?;

    let media = FilesystemImageStore::new(
        config.storage.media_dir.clone(),
        config.storage.max_image_size,
    )
    .await?;

    let state = AppState {
        db,
        media: Arc::new(media),
        config: config.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            config
                .server
                .cors
                .allow_origins
                .iter()
                .map(|o| o.parse())
                .collect::<Result<Vec<_>, _>>()?,
        ))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
        .max_age(std::time::Duration::from_secs(config.server.cors.max_age));

    let app = build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
