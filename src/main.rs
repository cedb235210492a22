use clickflag::{
    AppState, Config, HttpGateway, PersonalCounterStore, SharedCounterStore, SyncScheduler,
    router,
    storage::FileStore,
    sync::SystemClock,
};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::load();

    let personal = PersonalCounterStore::open(Arc::new(FileStore::new(&config.data_dir)));
    let shared = SharedCounterStore::new();
    let gateway = Arc::new(HttpGateway::new(&config.api_base_url, config.fetch_timeout)?);
    let scheduler = Arc::new(SyncScheduler::new(
        shared.clone(),
        gateway.clone(),
        Arc::new(SystemClock),
        config.sync,
    ));
    scheduler.activate();

    let state = AppState::new(personal, shared, gateway, Arc::clone(&scheduler));
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}, syncing with {}", config.api_base_url);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    scheduler.deactivate();
    Ok(())
}
