//! Headless TetriNET client (default binary).
//!
//! Reads intents as text commands from stdin (`left`, `drop`, `use 2`,
//! `say hi`, `quit`, ...) and writes JSON lines describing the game to
//! stdout. Logs go to stderr, filtered by `RUST_LOG`.

use std::io;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tetrinet::adapter::{run_client, ClientConfig, Exit, JsonPresenter};
use tetrinet::types::Intent;

const INTENT_BUFFER: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let config = ClientConfig::from_env();
    info!(addr = %config.server_addr(), nick = %config.nick, "starting");

    let (intent_tx, intent_rx) = mpsc::channel::<Intent>(INTENT_BUFFER);
    tokio::spawn(read_intents(intent_tx));

    let presenter = JsonPresenter::new(io::stdout());
    match run_client(config, presenter, intent_rx).await? {
        Exit::Quit => info!("bye"),
        Exit::Disconnected => info!("disconnected"),
    }
    Ok(())
}

/// Forward stdin lines as intents until stdin closes
async fn read_intents(tx: mpsc::Sender<Intent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(%err, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Intent>() {
            Ok(intent) => {
                if tx.send(intent).await.is_err() {
                    break;
                }
            }
            Err(err) => warn!(%err, "ignored input"),
        }
    }
}
