//! printdesk - document upload, preview and printing backend
//!
//! CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use printdesk::{
    exit_codes, Cli, Commands, Config, ConfigError, CupsClient, DocumentConverter, InfoArgs,
    LibreOfficeConverter, PrintService, ServeArgs, WebServer,
};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => run_serve(&args),
        Commands::Info(args) => run_info(&args),
    };

    std::process::exit(match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if e.downcast_ref::<ConfigError>().is_some() {
                exit_codes::CONFIG_ERROR
            } else {
                exit_codes::GENERAL_ERROR
            }
        }
    });
}

// ============ Logging ============

/// Install the global subscriber; `RUST_LOG` wins over the verbosity flag
fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "printdesk=info,tower_http=info",
        1 => "printdesk=debug,tower_http=debug",
        _ => "printdesk=trace,tower_http=trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// ============ Config ============

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load_from_path(path)?),
        None => Ok(Config::load()),
    }
}

// ============ Serve Command ============

fn run_serve(args: &ServeArgs) -> Result<()> {
    init_tracing(args.verbose);

    let config = load_config(args.config.as_deref())?.merge_with_cli(&args.overrides());

    let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    rt.block_on(async {
        let server = WebServer::from_config(config).context("Invalid print service settings")?;
        server
            .run()
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))
    })
}

// ============ Info Command ============

fn run_info(args: &InfoArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(url) = &args.cups_url {
        config.printing.url = url.clone();
    }

    println!("printdesk v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("System Information:");
    println!("  Platform: {}", std::env::consts::OS);
    println!("  Arch: {}", std::env::consts::ARCH);

    println!();
    println!("Conversion Tool:");
    let converter = LibreOfficeConverter::from_config(&config.converter);
    check_tool(converter.program(), "LibreOffice");
    match config.converter.timeout_secs {
        Some(secs) => println!("  Timeout: {}s", secs),
        None => println!("  Timeout: none"),
    }

    println!();
    println!("Print Service:");
    let client = CupsClient::from_config(&config.printing).context("Invalid print service URL")?;
    println!("  URL: {}", client.base_url());
    let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    match rt.block_on(client.printers()) {
        Ok(printers) if printers.is_empty() => println!("  Printers: none"),
        Ok(printers) => {
            println!("  Printers:");
            for (name, attrs) in &printers {
                match &attrs.info {
                    Some(info) => println!(
                        "    {} ({}) - {}",
                        name,
                        printer_state_label(attrs.state),
                        info
                    ),
                    None => println!("    {} ({})", name, printer_state_label(attrs.state)),
                }
            }
        }
        Err(e) => println!("  Status: unreachable ({})", e),
    }

    println!();
    println!("Storage:");
    println!("  Uploads:    {}", config.storage.upload_dir.display());
    println!("  Converted:  {}", config.storage.convert_dir.display());
    println!("  Records:    {}", config.storage.index_dir.display());
    println!("  Frontend:   {}", config.storage.static_dir.display());
    println!("  Extensions: {}", config.storage.allowed_extensions.join(", "));

    println!();
    println!("Config File Locations:");
    for path in Config::search_paths() {
        let marker = if path.is_file() { " (found)" } else { "" };
        println!("  {}{}", path.display(), marker);
    }

    Ok(())
}

/// `printer-state` enum: 3 idle, 4 processing, 5 stopped
fn printer_state_label(state: Option<i32>) -> &'static str {
    match state {
        Some(3) => "idle",
        Some(4) => "processing",
        Some(5) => "stopped",
        _ => "unknown",
    }
}

fn check_tool(cmd: &str, name: &str) {
    match which::which(cmd) {
        Ok(path) => println!("  {}: {} (found)", name, path.display()),
        Err(_) => println!("  {}: {} not found", name, cmd),
    }
}
