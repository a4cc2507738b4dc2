//! Command-line arguments

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "geoipd", version, about = "IP geolocation and timezone lookup service")]
pub struct Cli {
    /// Configuration file with server settings
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Network interface to listen on (overrides server.host)
    #[arg(short, long)]
    pub listen: Option<String>,

    /// TCP port to listen on (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// CORS origin, `*` for any (overrides cors.origin)
    #[arg(long)]
    pub cors_origin: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print a sample TOML configuration to stdout
    GenerateConfig,
}
