//! printdesk - document upload, preview and printing backend
//!
//! Accepts documents from a browser client, converts office formats to PDF
//! with a headless LibreOffice, and submits print jobs to a CUPS server over
//! IPP. Job status is always read back from CUPS; the only local state is the
//! upload and conversion directories.
//!
//! # Modules
//!
//! - [`config`]: TOML configuration with CLI overrides
//! - [`storage`]: upload/convert directories keyed by opaque ids
//! - [`convert`]: document-to-PDF conversion through an external tool
//! - [`ipp`]: IPP/1.1 request and response encoding
//! - [`printing`]: print service client (CUPS)
//! - [`web`]: HTTP API and static frontend serving

pub mod cli;
pub mod config;
pub mod convert;
pub mod ipp;
pub mod printing;
pub mod storage;
pub mod web;

pub use cli::{Cli, Commands, InfoArgs, ServeArgs};
pub use config::{CliOverrides, Config, ConfigError};
pub use convert::{ConvertError, DocumentConverter, LibreOfficeConverter};
pub use printing::{
    quality_label, CupsClient, JobInfo, JobState, PageRange, PrintError, PrintOptions,
    PrintService, PrinterAttributes,
};
pub use storage::{FileStore, StoreError, UploadRecord};
pub use web::{ApiError, AppState, ServerConfig, WebServer};

/// Process exit codes
pub mod exit_codes {
    /// Clean exit
    pub const SUCCESS: i32 = 0;
    /// Unspecified failure
    pub const GENERAL_ERROR: i32 = 1;
    /// Configuration could not be loaded
    pub const CONFIG_ERROR: i32 = 2;
}
