//! # cached-server
//!
//! Entry point for a single cache shard process: loads configuration,
//! registers with every configured peer application service, then serves
//! Get/Set/Delete RPCs until the process is killed.

use cachefabric::cache::CacheServer;
use cachefabric::config::{require_port, Config, REGISTRATION_PORT};
use std::path::PathBuf;
use tracing::{error, info};

#[tokio::main]
async fn main() -> cachefabric::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    print_banner();

    let install_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config_file = install_dir.join("config.json");

    let config = match Config::load(&config_file) {
        Ok(config) => config,
        Err(e) => {
            info!(path = %config_file.display(), error = %e, "no config file found, using defaults");
            Config::default()
        }
    };

    let cached_port = require_port("CachedPort", config.cached_port)?;
    let advertise_addr = config.advertise_addr(cached_port);
    let bind_addr = format!("0.0.0.0:{cached_port}");

    print_startup_info(&config, &advertise_addr, &bind_addr);

    if config.nogc {
        info!("NOGC set; no-op on this runtime");
    }

    let server = CacheServer::new(advertise_addr.clone());

    println!();
    println!("╭─────────────────────────────────────────────────────────╮");
    println!("│  cached-server is ready to accept registrations          │");
    println!("│  Listening on: {bind_addr:<42}│");
    println!("│  Advertising as: {advertise_addr:<40}│");
    println!("╰─────────────────────────────────────────────────────────╯");
    println!();

    let result = server.run(&bind_addr, &config.cache_peers).await;
    if let Err(ref e) = result {
        error!(error = %e, "cache server stopped with error");
    } else {
        info!("cache server stopped");
    }
    result
}

fn print_banner() {
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║         cachefabric - sharded cache-aside fabric             ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
}

fn print_startup_info(config: &Config, advertise_addr: &str, bind_addr: &str) {
    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│ STARTUP CONFIGURATION                                        │");
    println!("├─────────────────────────────────────────────────────────────┤");
    println!("│   Cache type:            {:<35} │", format!("{:?}", config.cache_type));
    println!("│   Bind address:          {bind_addr:<35} │");
    println!("│   Advertise address:     {advertise_addr:<35} │");
    println!(
        "│   Registration port:     {:<35} │",
        REGISTRATION_PORT
    );
    println!("│   NOGC:                  {:<35} │", config.nogc);
    println!(
        "│   Peer services:         {:<35} │",
        if config.cache_peers.is_empty() {
            "(none)".to_string()
        } else {
            config.cache_peers.join(", ")
        }
    );
    println!("└─────────────────────────────────────────────────────────────┘");
    println!();
}
