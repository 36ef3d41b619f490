use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::store::WeatherStore;

/// Bind `addr` and serve the read API until `shutdown` fires.
pub async fn run(
    addr: &str,
    store: Arc<dyn WeatherStore>,
    shutdown: CancellationToken,
) -> crate::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Web server running at http://{}", listener.local_addr()?);
    serve(listener, store, shutdown).await
}

/// Serve the read API on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    store: Arc<dyn WeatherStore>,
    shutdown: CancellationToken,
) -> crate::Result<()> {
    let app = api::router(store).layer(TraceLayer::new_for_http());

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            tracing::info!("Closing http server");
        })
        .await?;
    Ok(())
}
