// src/main.rs

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tucktale::api;
use tucktale::config::CONFIG;
use tucktale::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(&CONFIG.log_level))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Tuck and Tale story engine v{}", env!("CARGO_PKG_VERSION"));
    info!("Story model: {}", CONFIG.story_model);

    let app_state = AppState::new().await?;
    let app = api::router(app_state);

    let bind_address = format!("{}:{}", CONFIG.host, CONFIG.port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on http://{}", bind_address);

    let server_future = axum::serve(listener, app);

    tokio::select! {
        result = server_future => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, stopping");
        }
    }

    Ok(())
}
