// ABOUTME: Server binary: loads config, opens the database, serves HTTP
// ABOUTME: CLI flags override the port and database URL from the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

//! # HEP Server binary
//!
//! ```bash
//! # Run with environment configuration
//! HEP_JWT_SECRET=... cargo run --bin hep-server
//!
//! # Override the port or database
//! cargo run --bin hep-server -- --port 9090 --database-url sqlite:./data/hep.db
//! ```

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use anyhow::Result;
use hep_server::config::ServerConfig;
use hep_server::{logging, server};

#[derive(Parser)]
#[command(name = "hep-server", about = "HEP exercise platform REST backend")]
struct Args {
    /// HTTP port override
    #[arg(long)]
    port: Option<u16>,

    /// Database URL override
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }

    info!(port = config.http_port, "starting hep-server");
    let resources = Arc::new(server::ServerResources::new(config).await?);
    server::serve(resources).await?;
    Ok(())
}
