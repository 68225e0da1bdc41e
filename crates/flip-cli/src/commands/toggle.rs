//! Toggle command handler

use anyhow::{bail, Result};

use flip_core::{BindingRegistry, ChangeRelay, Config, FlagValue, HttpRelay};

use crate::output::{Output, OutputFormat};

/// Relay a flag change without starting the dashboard
///
/// Resolves the flag against the configured bindings and posts the
/// desired state to its action endpoint. The flag service remains the
/// source of record, so there is no local state to update here.
pub async fn run(config: &Config, flag: &str, state: &str, output: &Output) -> Result<()> {
    let enabled = parse_state(state)?;

    let registry = BindingRegistry::from_bindings(config.bindings.clone());
    let binding = match registry.resolve(flag) {
        Ok(binding) => binding,
        Err(err) => {
            let known: Vec<&str> = registry.iter().map(|b| b.flag.as_str()).collect();
            bail!("{}\n\nRegistered flags:\n  {}", err, known.join("\n  "));
        }
    };

    let relay = HttpRelay::new()?;
    let desired = FlagValue::Bool(enabled);

    match relay.send(binding, &desired).await {
        Ok(ack) => {
            let message = ack.message.unwrap_or_else(|| {
                format!(
                    "Flag \"{}\" is now {}",
                    flag,
                    if enabled { "enabled" } else { "disabled" }
                )
            });
            match output.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::json!({
                            "success": true,
                            "flag": flag,
                            "value": enabled,
                            "message": message,
                        })
                    );
                }
                OutputFormat::Quiet => {}
                OutputFormat::Human => println!("✓ {}", message),
            }
            Ok(())
        }
        Err(err) => bail!("Error updating \"{}\": {}", flag, err),
    }
}

/// Parse an on/off argument
fn parse_state(state: &str) -> Result<bool> {
    match state {
        "on" | "true" => Ok(true),
        "off" | "false" => Ok(false),
        other => bail!("Invalid state '{}'\n\nExpected one of: on, off", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state() {
        assert!(parse_state("on").unwrap());
        assert!(parse_state("true").unwrap());
        assert!(!parse_state("off").unwrap());
        assert!(!parse_state("false").unwrap());
        assert!(parse_state("maybe").is_err());
    }
}
