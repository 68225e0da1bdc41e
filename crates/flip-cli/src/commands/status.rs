//! Status command handler

use std::time::Duration;

use anyhow::Result;

use flip_core::Config;

use crate::output::{Output, OutputFormat};

/// How long the one-shot relay health probe waits for an answer
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Show configuration and relay health
pub async fn run(config: &Config, output: &Output) -> Result<()> {
    let config_path = Config::config_file_path();
    let config_exists = config_path.exists();
    let live = config.provider.credentials().is_some();
    let health = probe_relay(&config.relay.health_url()).await;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "config_path": config_path,
                    "config_exists": config_exists,
                    "data_dir": config.data_dir,
                    "provider": {
                        "mode": if live { "live" } else { "degraded" },
                        "stream_url": config.provider.stream_url,
                        "region": config.provider.region,
                    },
                    "relay": {
                        "url": config.relay.url,
                        "health": health,
                    },
                    "bindings": config.bindings.len(),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", health);
        }
        OutputFormat::Human => {
            println!("Flip Status");
            println!("===========");
            println!();
            println!("Config:");
            println!(
                "  File: {}{}",
                config_path.display(),
                if config_exists {
                    ""
                } else {
                    " (not found, using defaults)"
                }
            );
            println!("  Data dir: {}", config.data_dir.display());
            println!();
            println!("Provider:");
            println!("  Mode: {}", if live { "live" } else { "degraded" });
            println!(
                "  Stream: {}",
                config.provider.stream_url.as_deref().unwrap_or("(not set)")
            );
            println!("  Region: {}", config.provider.region);
            println!();
            println!("Relay:");
            println!("  URL:    {}", config.relay.url);
            println!("  Health: {}", health);
            println!();
            println!("Bindings: {}", config.bindings.len());
        }
    }

    Ok(())
}

/// Probe the relay health endpoint once
async fn probe_relay(health_url: &str) -> String {
    let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return "unavailable".to_string(),
    };

    match client.get(health_url).send().await {
        Ok(response) if response.status().is_success() => "ok".to_string(),
        Ok(response) => format!("error (status {})", response.status().as_u16()),
        Err(_) => "unreachable".to_string(),
    }
}
