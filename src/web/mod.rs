//! Web server module for printdesk
//!
//! Provides the REST API used by the browser frontend and serves the
//! prebuilt frontend bundle itself.
//!
//! # Endpoints
//!
//! - `GET  /api/printers` - printer names
//! - `GET  /api/printers/{name}/options` - media, quality and color modes
//! - `POST /api/print` - upload a document and submit a print job
//! - `POST /api/preview` - upload a document and get a PDF preview path
//! - `GET  /api/uploads/{file}`, `GET /api/converted/{file}` - stored files
//! - `GET  /api/jobs/{id}` - job status from CUPS
//! - `GET  /api/files`, `GET /api/files/{id}` - upload metadata
//! - `GET  /api/health` - health check
//!
//! Any other path serves a static asset or falls back to the index page.
//!
//! # Usage
//!
//! ```bash
//! printdesk serve --port 5000
//! ```

mod cors;
mod error;
mod routes;
mod server;
mod shutdown;

pub use cors::CorsConfig;
pub use error::{ApiError, CONVERTER_MISSING_MESSAGE};
pub use routes::{api_routes, AppState, JobStatusResponse, PrinterOptionsResponse};
pub use server::{build_router, ServerConfig, WebServer};
pub use shutdown::{shutdown_signal, ShutdownSignal};

/// Default server port
pub const DEFAULT_PORT: u16 = 5000;

/// Default bind address (all interfaces)
pub const DEFAULT_BIND: &str = "0.0.0.0";

/// Default upload limit in MB
pub const DEFAULT_UPLOAD_LIMIT_MB: usize = 100;
