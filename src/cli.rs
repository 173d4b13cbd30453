//! Command-line interface definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CliOverrides;

/// printdesk - upload, preview and print documents from the browser
#[derive(Debug, Parser)]
#[command(name = "printdesk", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve(ServeArgs),
    /// Show converter, print service and config information
    Info(InfoArgs),
}

/// Arguments for the `serve` subcommand
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Config file (defaults to ./printdesk.toml, then the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Maximum upload size in MB
    #[arg(long)]
    pub upload_limit: Option<usize>,

    /// Directory for uploaded files
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Directory for converted PDFs
    #[arg(long)]
    pub convert_dir: Option<PathBuf>,

    /// Directory holding the prebuilt frontend
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// CUPS server URL
    #[arg(long)]
    pub cups_url: Option<String>,

    /// Fail printer listing instead of returning placeholder printers when CUPS is down
    #[arg(long)]
    pub no_fallback_printers: bool,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl ServeArgs {
    /// Collect the flags that override the config file
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            port: self.port,
            bind: self.bind.clone(),
            upload_limit_mb: self.upload_limit,
            upload_dir: self.upload_dir.clone(),
            convert_dir: self.convert_dir.clone(),
            static_dir: self.static_dir.clone(),
            cups_url: self.cups_url.clone(),
            disable_fallback_printers: self.no_fallback_printers,
        }
    }
}

/// Arguments for the `info` subcommand
#[derive(Debug, Clone, Args)]
pub struct InfoArgs {
    /// Config file to inspect
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// CUPS server URL (overrides config)
    #[arg(long)]
    pub cups_url: Option<String>,
}
