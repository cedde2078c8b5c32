use std::path::Path;

use anyhow::Context;
use colored::Colorize;

use wishlist_server::{ServerConfig, WishlistServer};

use crate::cli::{Cli, Command, OutputFormat, ServeArgs};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::Config => cmd_config(&config, &cli.format),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if config.tokens.is_empty() {
        tracing::warn!("no bearer tokens configured; only guest claims are possible");
    }
    println!(
        "{} Wishlist server on {}",
        "✓".green().bold(),
        config.bind_addr.to_string().bold()
    );
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(WishlistServer::new(config).serve())?;
    Ok(())
}

fn cmd_config(config: &ServerConfig, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{} = {}", "bind_addr".bold(), config.bind_addr);
            println!(
                "{} = {}",
                "room_channel_capacity".bold(),
                config.room_channel_capacity
            );
            println!(
                "{} = {}",
                "max_guest_name_len".bold(),
                config.max_guest_name_len
            );
            println!(
                "{} = {}",
                "allowed_origins".bold(),
                config.allowed_origins.join(", ").cyan()
            );
            println!("{} = {} configured", "tokens".bold(), config.tokens.len());
        }
        OutputFormat::Json => {
            // Token secrets stay out of the output.
            let mut value = serde_json::to_value(config)?;
            value["tokens"] = serde_json::json!(config.tokens.len());
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}
