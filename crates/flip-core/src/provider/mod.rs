//! Flag value providers
//!
//! A provider is the read side of synchronization: it delivers the
//! current value of every flag and notifies when one changes.
//!
//! Two implementations:
//! - [`StreamProvider`]: WebSocket connection to the flag stream
//!   service, with automatic reconnection
//! - [`StaticProvider`]: fixed in-memory values, used when no stream
//!   credentials are configured and in tests
//!
//! ## Usage
//!
//! ```ignore
//! let provider = spawn_stream_provider(config, context);
//! provider.wait_ready().await;
//! let value = provider.value("release-laptop-life-remaining", &default).await;
//! ```

mod memory;
mod message;
mod stream;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

use crate::flag::{Context, FlagChange, FlagValue};

pub use memory::StaticProvider;
pub use message::{ClientMessage, ServerMessage};
pub use stream::{spawn_stream_provider, StreamConfig, StreamProvider};

/// Provider connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    /// Attempting to connect
    Connecting,
    /// Connected with a full flag set received
    Ready,
    /// Connection lost; last known values still served
    Offline,
    /// No stream credentials; serving fixed values
    Degraded,
}

/// Source of flag values and change notifications
#[async_trait]
pub trait FlagProvider: Send + Sync {
    /// Wait until initial flag values are available
    ///
    /// Returns immediately once the first full flag set has arrived.
    /// Values read before that resolve to the caller's default.
    async fn wait_ready(&self);

    /// Current value for a flag, falling back to the given default
    async fn value(&self, key: &str, default: &FlagValue) -> FlagValue;

    /// Subscribe to change notifications
    ///
    /// Every subscriber sees every change; subscribing is idempotent
    /// with respect to the upstream connection.
    fn subscribe(&self) -> broadcast::Receiver<FlagChange>;

    /// Watch connection status
    fn status(&self) -> watch::Receiver<ProviderStatus>;

    /// Replace the evaluation context
    ///
    /// The provider re-announces itself and receives a fresh flag set
    /// for the new context. Changed values arrive as notifications.
    async fn set_context(&self, context: Context);

    /// Stop any background work
    async fn shutdown(&self);
}
