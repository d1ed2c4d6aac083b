use chaindata_sync::{ AppError, Config, Result };
use chaindata_sync::db::Registry;
use chaindata_sync::feeds::{ CoingeckoPriceFeed, HttpConfigFeed };
use chaindata_sync::metadata::{ Blake2Concat128, FrameMetadataDecoder };
use chaindata_sync::rpc::{ build_client, HttpEvmClient, SubstrateConnector };
use chaindata_sync::scheduler::Scheduler;
use chaindata_sync::services::{ Pipeline, PipelineClients, PipelineSettings };
use migration::MigratorTrait;
use std::sync::Arc;
use tower_http::{ cors::CorsLayer, trace::TraceLayer };
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber
        ::registry()
        .with(
            tracing_subscriber::EnvFilter
                ::try_from_default_env()
                .unwrap_or_else(|_| "chaindata_sync=debug,tower_http=debug".into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| AppError::Config(e.to_string()))?;

    tracing::info!(
        interval_secs = config.sync_interval.as_secs(),
        concurrency = config.probe_concurrency,
        "Starting chaindata-sync"
    );

    // Initialize database connection
    let db = sea_orm::Database::connect(&config.database_url).await.map_err(AppError::Database)?;

    tracing::info!("Database connected successfully");

    // Run migrations
    migration::Migrator::up(&db, None).await.map_err(AppError::Database)?;

    tracing::info!("Migrations completed successfully");

    let registry = Registry::from_connection(db);

    // Outbound clients, all stamped with the client origin
    let rpc_client = build_client(&config.client_origin, config.rpc_timeout)?;
    let feed_client = build_client(&config.client_origin, config.feed_timeout)?;

    let pipeline = Arc::new(
        Pipeline::new(
            registry.clone(),
            PipelineClients {
                config_feed: Arc::new(HttpConfigFeed::new(feed_client.clone(), config.feed_urls.clone())),
                price_feed: Arc::new(CoingeckoPriceFeed::new(feed_client, config.price_feed_url.clone())),
                connector: Arc::new(SubstrateConnector::new(&config.client_origin, config.rpc_timeout)?),
                evm_client: Arc::new(HttpEvmClient::new(rpc_client)),
                decoder: Arc::new(FrameMetadataDecoder),
                hasher: Arc::new(Blake2Concat128),
            },
            PipelineSettings {
                probe_concurrency: config.probe_concurrency,
                rpc_timeout: config.rpc_timeout,
                staleness_threshold: config.staleness_threshold,
                price_currencies: config.price_currencies.clone(),
            }
        )
    );

    // Start sync scheduler
    let scheduler = Scheduler::new(pipeline, config.sync_interval);
    tokio::spawn(async move {
        scheduler.start().await;
    });
    tracing::info!("Sync scheduler started");

    // Build application router
    let app = chaindata_sync::api
        ::router(chaindata_sync::api::AppState::new(registry))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| AppError::Internal(e.to_string()))?;

    axum::serve(listener, app).await.map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(())
}
