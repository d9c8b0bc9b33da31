mod cli;

use crate::cli::{Command, CLI};
use anyhow::Context;
use clap::Parser;
use serde_json::json;
use shorturl_store::{DeleteOutcome, ResolvedConfig, SingleUserStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = CLI::parse();
    let config = cli.store.resolve().context("loading configuration")?;

    info!(
        base_url = %config.base_url,
        log = ?config.file_storage_path,
        relational = config.database_dsn.is_some(),
        "starting shorturl"
    );

    let store = config.open_store().await.context("opening url store")?;
    let store = match cli.token {
        Some(token) => SingleUserStore::with_token(store, token),
        None => SingleUserStore::new(store),
    };

    let result = run(&store, &config, cli.command).await;
    store.shutdown().await;
    result
}

async fn run(
    store: &SingleUserStore,
    config: &ResolvedConfig,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Put { url } => {
            let (status, key) = store.put(&url).await?;
            print(json!({
                "status": status.http_status(),
                "short_url": key.to_url(&config.base_url),
            }));
        }
        Command::Get { code } => {
            let resolution = store.get(&code).await;
            print(json!({
                "status": resolution.http_status(),
                "original_url": resolution.original_url(),
                "deleted": resolution.is_deleted(),
            }));
        }
        Command::Delete { codes } => {
            let (status, tickets) = store.delete_batch(&codes).await?;
            let mut outcomes = serde_json::Map::new();
            for ticket in tickets {
                let key = ticket.key().to_string();
                let outcome = ticket.wait().await.map(outcome_name);
                outcomes.insert(key, json!(outcome));
            }
            print(json!({
                "status": status.http_status(),
                "outcomes": outcomes,
            }));
        }
        Command::List => {
            print(json!(store.list(&config.base_url).await));
        }
        Command::Stats => {
            print(json!(store.stats().await));
        }
        Command::Ping => {
            store.ping().await.context("relational backend unreachable")?;
            print(json!({ "status": "ok" }));
        }
    }

    Ok(())
}

fn outcome_name(outcome: DeleteOutcome) -> &'static str {
    match outcome {
        DeleteOutcome::Deleted => "deleted",
        DeleteOutcome::AlreadyDeleted => "already_deleted",
        DeleteOutcome::NotFound => "not_found",
        DeleteOutcome::TokenMismatch => "token_mismatch",
    }
}

fn print(value: serde_json::Value) {
    println!("{value}");
}
