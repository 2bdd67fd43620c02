//! push-echo server - Binary Entry Point
//!
//! # Usage
//!
//! ```bash
//! # Start on the default address and path
//! push-echo-server
//!
//! # Custom address and endpoint
//! PUSH_ECHO_ADDR=0.0.0.0:9000 PUSH_ECHO_PATH=/chat push-echo-server
//!
//! # Enable debug logging
//! RUST_LOG=push_echo=debug push-echo-server
//! ```

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::info;
use tracing_subscriber::EnvFilter;

use push_echo::{create_router, AppState, Config, PushResult};

#[tokio::main]
async fn main() -> PushResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("push_echo=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    info!(
        version = push_echo::VERSION,
        addr = %config.bind_addr,
        path = %config.path,
        relay_group = %config.relay_group,
        "push-echo starting"
    );

    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState::from_config(config));
    let handler = Arc::clone(&state.handler);
    let app = create_router(state);

    // Ctrl+C triggers graceful shutdown
    let shutdown = Arc::new(Notify::new());
    let signal = Arc::clone(&shutdown);
    ctrlc::set_handler(move || signal.notify_one())?;

    let listener = TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.notified().await;
            info!("Shutdown requested");
            // Closing every channel lets open streams finish
            handler.shutdown();
        })
        .await?;

    info!("push-echo stopped");
    Ok(())
}
