//! Web server using Axum.

use std::net::SocketAddr;

use crate::config::Web;
use crate::error::{Error, Result};

use super::router::{create_app_router, AppState};

/// Web server configuration.
pub struct WebServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Web::default().into()
    }
}

impl From<Web> for WebServerConfig {
    fn from(web: Web) -> Self {
        Self {
            port: web.port,
            host: web.host,
        }
    }
}

/// Run the web server until ctrl-c.
pub async fn run_server(config: WebServerConfig, state: AppState) -> Result<()> {
    let app = create_app_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| Error::Web(format!("Invalid address: {}", e)))?;

    tracing::info!("Starting web server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
    }
}
