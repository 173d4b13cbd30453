//! Web server implementation
//!
//! Provides the main server struct and configuration.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::cors::CorsConfig;
use super::routes::{api_routes, AppState};
use super::shutdown::shutdown_signal;
use super::{DEFAULT_BIND, DEFAULT_PORT, DEFAULT_UPLOAD_LIMIT_MB};
use crate::config::Config;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Address to bind to
    pub bind: String,
    /// Maximum upload size in bytes
    pub upload_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            upload_limit: DEFAULT_UPLOAD_LIMIT_MB * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Listener settings from the application config
    pub fn from_config(config: &Config) -> Self {
        Self::default()
            .with_port(config.server.port)
            .with_bind(config.server.bind.clone())
            .with_upload_limit(config.upload_limit_bytes())
    }

    /// Create a new server config with the given port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Create a new server config with the given bind address
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    /// Create a new server config with the given upload limit
    pub fn with_upload_limit(mut self, limit: usize) -> Self {
        self.upload_limit = limit;
        self
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.bind, self.port).parse()
    }
}

/// Build the full application router: API, stored files and the frontend
///
/// Any path that is not an API route and not an existing static asset gets
/// the index page, so client-side routes resolve.
pub fn build_router(state: Arc<AppState>) -> Router {
    let config = state.config.clone();
    let upload_limit = config.upload_limit_bytes();

    let frontend = ServeDir::new(&config.storage.static_dir)
        .append_index_html_on_directories(false)
        .fallback(ServeFile::new(&config.storage.index_file));

    Router::new()
        .nest("/api", api_routes(&config))
        .fallback_service(frontend)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(upload_limit))
                .layer(CorsConfig::from_section(&config.cors).into_layer())
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .with_state(state)
}

/// Web server instance
pub struct WebServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a server from the application config, talking to LibreOffice and CUPS
    pub fn from_config(config: Config) -> Result<Self, crate::printing::PrintError> {
        let server_config = ServerConfig::from_config(&config);
        let state = AppState::from_config(config)?;
        Ok(Self::with_state(server_config, state))
    }

    /// Create a server around prepared state
    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Create storage directories, bind, and serve until a shutdown signal
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.state.store.ensure_dirs()?;

        let addr = self.config.socket_addr()?;
        let router = self.router();

        tracing::info!("Starting server on http://{}", addr);
        tracing::info!(
            "Uploads: {}, conversions: {}, records: {}, print service: {}",
            self.state.store.upload_dir().display(),
            self.state.store.convert_dir().display(),
            self.state.store.index_dir().display(),
            self.state.config.printing.url
        );
        if !self.state.converter.is_available() {
            tracing::warn!(
                "Conversion tool '{}' not found; doc/docx uploads will fail",
                self.state.converter.program()
            );
        }

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                shutdown_signal().await;
            })
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}
