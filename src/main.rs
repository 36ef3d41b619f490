use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use weathersvc::{
    OpenMeteoClient, PollingWorker, SqliteWeatherStore, VERSION, WeatherFetcher, WeatherStore,
    WeatherSvcConfig, logging, web,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config =
        WeatherSvcConfig::load_from_path(config_path).context("Failed to load configuration")?;

    logging::init(&config.logging).context("Failed to initialize logging")?;
    info!("Weathersvc ver: {}", VERSION);

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let store: Arc<dyn WeatherStore> = Arc::new(
        SqliteWeatherStore::open(&config.storage.database_path)
            .await
            .context("Failed to initialize weather store")?,
    );

    let registry = Arc::new(config.registry()?);
    let fetcher: Arc<dyn WeatherFetcher> =
        Arc::new(OpenMeteoClient::from_config(&config.weather, registry.clone())?);

    let worker = PollingWorker::new(registry, fetcher, store.clone(), config.worker.interval())?;
    let worker_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { worker.run(shutdown).await }
    });

    let served = web::run(&config.server.listen_addr, store, shutdown.clone()).await;
    if let Err(e) = &served {
        error!("Http server failed: {}", e);
    }

    shutdown.cancel();
    worker_handle.await.context("Worker task panicked")?;
    info!("Shutdown complete");

    served.context("Http server failed")
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM
async fn cancel_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Interrupt signal");
    shutdown.cancel();
}
