//! List command handlers

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use chrono::Utc;
use tokio::sync::oneshot;

use flip_core::{
    spawn_engine, spawn_stream_provider, BindingRegistry, BindingSnapshot, Config, Context,
    EngineCommand, EngineEvent, FlagProvider, HttpRelay, StaticProvider, StreamConfig,
};

use crate::inventory::{self, Lifecycle};
use crate::output::{Output, OutputFormat};

/// How long to wait for the provider to deliver initial flag values
const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// List flag bindings, or the laptop inventory with `--inventory`
pub async fn run(config: &Config, show_inventory: bool, output: &Output) -> Result<()> {
    let snapshot = read_snapshot(config).await?;

    if show_inventory {
        let show_lifecycle = snapshot
            .iter()
            .find(|row| row.flag == inventory::LIFECYCLE_FLAG)
            .map(|row| row.value.is_truthy())
            .unwrap_or(false);
        print_inventory(show_lifecycle, output);
    } else {
        output.print_bindings(&snapshot);
    }

    Ok(())
}

/// Spin up an engine, wait for initial values, and take one snapshot
async fn read_snapshot(config: &Config) -> Result<Vec<BindingSnapshot>> {
    let registry = BindingRegistry::from_bindings(config.bindings.clone());

    let provider: Arc<dyn FlagProvider> = match config.provider.credentials() {
        Some(credentials) => {
            let user_key = config
                .load_or_create_user_key()
                .context("Failed to load user key")?;
            Arc::new(spawn_stream_provider(
                StreamConfig {
                    url: credentials.stream_url,
                    client_key: credentials.client_key,
                    ..StreamConfig::default()
                },
                Context::new(user_key, config.provider.region.clone()),
            ))
        }
        None => Arc::new(StaticProvider::degraded(&registry)),
    };

    let relay = Arc::new(HttpRelay::new()?);
    let mut handle = spawn_engine(registry, provider, relay);

    // A provider that cannot connect leaves the bindings at their defaults.
    let deadline = tokio::time::Instant::now() + READY_TIMEOUT;
    loop {
        match tokio::time::timeout_at(deadline, handle.event_rx.recv()).await {
            Ok(Some(EngineEvent::Ready)) => break,
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => break,
        }
    }

    let (reply_tx, reply_rx) = oneshot::channel();
    handle
        .command_tx
        .send(EngineCommand::Snapshot(reply_tx))
        .await
        .context("Engine stopped before reporting flag values")?;
    let snapshot = reply_rx
        .await
        .context("Engine stopped before reporting flag values")?;

    let _ = handle.command_tx.send(EngineCommand::Shutdown).await;

    Ok(snapshot)
}

/// Print the laptop fleet, with lifecycle status when the gating flag is on
fn print_inventory(show_lifecycle: bool, output: &Output) {
    let fleet = inventory::fleet();
    let today = Utc::now().date_naive();

    match output.format {
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = fleet
                .iter()
                .map(|laptop| {
                    let mut row = serde_json::json!({
                        "id": laptop.id,
                        "name": laptop.name,
                        "brand": laptop.brand,
                        "assigned_to": laptop.assigned_to,
                        "purchased": laptop.purchased,
                    });
                    if show_lifecycle {
                        row["status"] =
                            serde_json::json!(Lifecycle::evaluate(laptop.purchased, today));
                    }
                    row
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows).unwrap());
        }
        OutputFormat::Quiet => {
            for laptop in &fleet {
                println!("{}", laptop.name);
            }
        }
        OutputFormat::Human => {
            let status_header = if show_lifecycle { " Status" } else { "" };
            println!(
                "{:<24} {:<10} {:<16} {:<12}{}",
                "Name", "Brand", "Assigned to", "Purchased", status_header
            );
            for laptop in &fleet {
                let status = if show_lifecycle {
                    format!(" {}", Lifecycle::evaluate(laptop.purchased, today).label())
                } else {
                    String::new()
                };
                // Through a String so the column width applies
                let purchased = laptop.purchased.to_string();
                println!(
                    "{:<24} {:<10} {:<16} {:<12}{}",
                    laptop.name, laptop.brand, laptop.assigned_to, purchased, status
                );
            }
            println!("\n{} laptop(s)", fleet.len());
        }
    }
}
