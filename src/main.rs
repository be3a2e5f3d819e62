use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::*;
use env_logger::{Builder, Env};
use log::info;

use ferroftp::config::Config;
use ferroftp::server;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "ferroftpd", about = "A small FTP server written in Rust.")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Override the control port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the virtual root directory
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize the logger with a custom format and colors
    let default_level = if args.verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            let timestamp = buf.timestamp().to_string();
            let level = match record.level() {
                log::Level::Error => record.level().to_string().red(),
                log::Level::Warn => record.level().to_string().yellow(),
                log::Level::Info => record.level().to_string().green(),
                log::Level::Debug => record.level().to_string().blue(),
                log::Level::Trace => record.level().to_string().white(),
            };
            writeln!(buf, "[{}] [{}] {}", timestamp, level, record.args())
        })
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.server.bind_port = port;
    }
    if let Some(root) = args.root {
        config.server.chroot_dir = root;
    }

    log_config(&config);
    server::run(config).await
}

fn log_config(config: &Config) {
    info!(
        "  Bind address: {}:{}",
        config.server.bind_host, config.server.bind_port
    );
    info!("  Virtual root: {:?}", config.server.chroot_dir);
    info!(
        "  PASV address: {}",
        config
            .server
            .pasv_address
            .as_deref()
            .unwrap_or("(control connection address)")
    );
    info!("  Data timeout: {}s", config.server.data_timeout_secs);
    info!("  Users: {}", config.users.len());
}
