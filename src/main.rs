use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use cinesync_api::{
    config::Config,
    db::{self, Cache},
    movies::MovieCatalog,
    routes,
    services::{
        catalog::{CatalogClient, HttpCatalogClient},
        sync::{SyncEngine, SyncScheduler},
    },
    state::AppState,
    store::{PgProfileStore, ProfileStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let redis_client = db::create_redis_client(&config.redis_url)?;
    let cache = Cache::new(redis_client);

    let movies = Arc::new(MovieCatalog::load(&config.movie_catalog_path)?);
    let store: Arc<dyn ProfileStore> = Arc::new(PgProfileStore::new(pool));
    let catalog: Arc<dyn CatalogClient> = Arc::new(HttpCatalogClient::new(&config)?);

    let engine = Arc::new(SyncEngine::new(Arc::clone(&store), Arc::clone(&catalog)));
    let scheduler = Arc::new(SyncScheduler::new(
        engine,
        Duration::from_secs(config.sync_interval_secs),
    ));

    // Startup sync plus the recurring schedule run in the background; request
    // handling does not wait for the first pass to finish.
    Arc::clone(&scheduler).start();

    let state = AppState::new(store, catalog, movies, cache, Arc::clone(&scheduler));
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(host = %config.host, port = config.port, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
