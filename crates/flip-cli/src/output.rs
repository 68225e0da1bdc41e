//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use flip_core::BindingSnapshot;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print flag bindings with their current values
    pub fn print_bindings(&self, bindings: &[BindingSnapshot]) {
        match self.format {
            OutputFormat::Human => {
                if bindings.is_empty() {
                    println!("No flag bindings configured.");
                    return;
                }
                for snapshot in bindings {
                    println!(
                        "{} {:<36} = {}",
                        sync_marker(snapshot.pending),
                        snapshot.flag,
                        snapshot.value
                    );
                }
                println!("\n{} binding(s)", bindings.len());
            }
            OutputFormat::Json => {
                let rows: Vec<_> = bindings
                    .iter()
                    .map(|snapshot| {
                        serde_json::json!({
                            "flag": snapshot.flag,
                            "value": snapshot.value,
                            "pending": snapshot.pending,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows).unwrap());
            }
            OutputFormat::Quiet => {
                for snapshot in bindings {
                    println!("{}\t{}", snapshot.flag, snapshot.value);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

}

/// Marker shown next to a binding: confirmed or awaiting the relay
fn sync_marker(pending: bool) -> &'static str {
    if pending {
        "…"
    } else {
        "✓"
    }
}
