use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use courierd::engine::Engine;
use courierd::http;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("COURIERD_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    courierd::observability::init(metrics_port);

    let port = std::env::var("COURIERD_PORT").unwrap_or_else(|_| "8080".into());
    let bind = std::env::var("COURIERD_BIND").unwrap_or_else(|_| "0.0.0.0".into());

    let engine = Arc::new(Engine::new());
    let app = http::router(engine);

    let addr = format!("{bind}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("courierd listening on {addr}");
    info!(
        "  metrics: {}",
        metrics_port.map_or("disabled".to_string(), |p| format!(
            "http://0.0.0.0:{p}/metrics"
        ))
    );

    // Graceful shutdown: stop accepting on SIGTERM/ctrl-c, drain in-flight requests
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("courierd stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    info!("shutdown signal received");
}
