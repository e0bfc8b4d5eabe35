//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use tripledger_server::ServerConfig;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    allowed_origins: Vec<String>,
) -> Result<()> {
    println!("🚀 Starting tripledger web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if allowed_origins.is_empty() {
        println!("   CORS: same-origin only");
    } else {
        println!("   CORS: {}", allowed_origins.join(", "));
    }
    println!();

    let db = open_db(db_path)?;
    let config = ServerConfig { allowed_origins };

    tripledger_server::serve_with_config(db, host, port, config)
        .await
        .context("Server failed")
}
