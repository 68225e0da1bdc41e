//! Config command handlers

use std::path::Path;

use anyhow::{bail, Context, Result};

use flip_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let key_set = config
        .provider
        .client_key
        .as_deref()
        .map(|k| !k.is_empty())
        .unwrap_or(false);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "provider": {
                        "stream_url": config.provider.stream_url,
                        "client_key_set": key_set,
                        "region": config.provider.region,
                    },
                    "relay": {
                        "url": config.relay.url,
                    },
                    "server": {
                        "listen": config.server.listen_addr(),
                        "triggers": config.server.triggers.len(),
                    },
                    "ui": {
                        "regions": config.ui.regions,
                    },
                    "bindings": config.bindings.len(),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", Config::config_file_path().display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:   {}", config.data_dir.display());
            println!(
                "  stream_url: {}",
                config.provider.stream_url.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  client_key: {}",
                if key_set { "(set)" } else { "(not set)" }
            );
            println!("  region:     {}", config.provider.region);
            println!("  relay_url:  {}", config.relay.url);
            println!("  listen:     {}", config.server.listen_addr());
            println!("  regions:    {}", config.ui.regions.join(", "));
            println!("  bindings:   {}", config.bindings.len());
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Print the config file location
pub fn path(output: &Output) -> Result<()> {
    let path = Config::config_file_path();
    match output.format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "path": path }));
        }
        _ => println!("{}", path.display()),
    }
    Ok(())
}

/// Write a starter config file with the default bindings
pub fn init(output: &Output) -> Result<()> {
    let path = Config::config_file_path();
    if path.exists() {
        bail!(
            "Config file already exists: {}\n\n\
             Edit it directly, or remove it to start over.",
            path.display()
        );
    }

    write_starter(&path)?;
    output.success(&format!("Wrote {}", path.display()));

    Ok(())
}

fn write_starter(path: &Path) -> Result<()> {
    Config::default()
        .save_to_path(path)
        .context("Failed to write config file")
}
