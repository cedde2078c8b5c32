use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "wishlist",
    about = "Shared wishlists with live reservations and group gifts",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the wishlist server
    Serve(ServeArgs),
    /// Show the effective configuration
    Config,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on, overriding the configuration file
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}
