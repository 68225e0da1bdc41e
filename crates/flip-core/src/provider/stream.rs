//! Streaming flag provider
//!
//! Maintains a long-lived WebSocket connection to the flag stream
//! service. Handles reconnection automatically with exponential backoff
//! and re-identifies after each reconnect so the service replays a full
//! flag set for the current context.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use super::message::{ClientMessage, ServerMessage};
use super::{FlagProvider, ProviderStatus};
use crate::flag::{Context, FlagChange, FlagValue};

/// Commands sent to the stream task
#[derive(Debug, Clone)]
enum StreamCommand {
    /// Re-identify with a new evaluation context
    SetContext(Context),
    /// Shutdown the stream task
    Shutdown,
}

/// Configuration for the stream connection
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// WebSocket URL of the flag stream service
    pub url: String,
    /// Client key sent with the identify message
    pub client_key: String,
    /// Initial reconnect delay
    pub initial_reconnect_delay: Duration,
    /// Maximum reconnect delay
    pub max_reconnect_delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            client_key: String::new(),
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
        }
    }
}

/// Known flag values, replaced by `put` and updated by `patch`
#[derive(Debug, Default)]
struct FlagTable {
    values: HashMap<String, FlagValue>,
}

impl FlagTable {
    /// Replace the table with a fresh flag set
    ///
    /// Returns a change for every key whose value differs from what was
    /// known before. Keys absent from the new set are dropped without a
    /// change notification; lookups fall back to the caller's default.
    fn apply_put(&mut self, flags: HashMap<String, FlagValue>) -> Vec<FlagChange> {
        let mut changes = Vec::new();
        for (key, value) in &flags {
            let previous = self.values.get(key);
            if previous != Some(value) {
                changes.push(FlagChange {
                    key: key.clone(),
                    current: value.clone(),
                    previous: previous.cloned(),
                });
            }
        }
        self.values = flags;
        changes
    }

    /// Update a single flag
    fn apply_patch(&mut self, key: &str, value: FlagValue) -> FlagChange {
        let previous = self.values.insert(key.to_string(), value.clone());
        FlagChange {
            key: key.to_string(),
            current: value,
            previous,
        }
    }

    fn get(&self, key: &str) -> Option<&FlagValue> {
        self.values.get(key)
    }
}

/// Handle to a running stream connection
///
/// Created by [`spawn_stream_provider`]. Dropping the handle does not
/// stop the task; send [`FlagProvider::shutdown`] for that.
pub struct StreamProvider {
    flags: Arc<RwLock<FlagTable>>,
    change_tx: broadcast::Sender<FlagChange>,
    command_tx: mpsc::Sender<StreamCommand>,
    status_rx: watch::Receiver<ProviderStatus>,
    ready_rx: watch::Receiver<bool>,
}

/// Spawn a stream provider task
///
/// The task connects, identifies with the given context and applies
/// incoming flag sets until shut down. It reconnects automatically
/// after connection loss.
pub fn spawn_stream_provider(config: StreamConfig, context: Context) -> StreamProvider {
    let (command_tx, command_rx) = mpsc::channel(16);
    let (change_tx, _) = broadcast::channel(64);
    let (status_tx, status_rx) = watch::channel(ProviderStatus::Connecting);
    let (ready_tx, ready_rx) = watch::channel(false);
    let flags = Arc::new(RwLock::new(FlagTable::default()));

    tokio::spawn(stream_task_loop(
        config,
        context,
        flags.clone(),
        command_rx,
        change_tx.clone(),
        status_tx,
        ready_tx,
    ));

    StreamProvider {
        flags,
        change_tx,
        command_tx,
        status_rx,
        ready_rx,
    }
}

/// Main stream task loop with reconnection
async fn stream_task_loop(
    config: StreamConfig,
    mut context: Context,
    flags: Arc<RwLock<FlagTable>>,
    mut command_rx: mpsc::Receiver<StreamCommand>,
    change_tx: broadcast::Sender<FlagChange>,
    status_tx: watch::Sender<ProviderStatus>,
    ready_tx: watch::Sender<bool>,
) {
    let mut reconnect_delay = config.initial_reconnect_delay;

    loop {
        let _ = status_tx.send(ProviderStatus::Connecting);

        match connect_and_listen(
            &config,
            &mut context,
            &flags,
            &mut command_rx,
            &change_tx,
            &status_tx,
            &ready_tx,
        )
        .await
        {
            Ok(should_shutdown) => {
                if should_shutdown {
                    break;
                }
                // Connection closed normally, reset backoff
                reconnect_delay = config.initial_reconnect_delay;
            }
            Err(e) => {
                warn!(url = %config.url, "stream connection error: {}", e);
            }
        }

        let _ = status_tx.send(ProviderStatus::Offline);

        // Wait before reconnecting, but check for commands
        tokio::select! {
            _ = tokio::time::sleep(reconnect_delay) => {
                // Exponential backoff
                reconnect_delay = (reconnect_delay * 2).min(config.max_reconnect_delay);
            }
            cmd = command_rx.recv() => {
                match cmd {
                    Some(StreamCommand::Shutdown) | None => break,
                    Some(StreamCommand::SetContext(ctx)) => {
                        // The identify after the next connect carries it
                        context = ctx;
                    }
                }
            }
        }
    }

    let _ = status_tx.send(ProviderStatus::Offline);
}

/// Connect and apply stream messages until disconnection or shutdown
async fn connect_and_listen(
    config: &StreamConfig,
    context: &mut Context,
    flags: &Arc<RwLock<FlagTable>>,
    command_rx: &mut mpsc::Receiver<StreamCommand>,
    change_tx: &broadcast::Sender<FlagChange>,
    status_tx: &watch::Sender<ProviderStatus>,
    ready_tx: &watch::Sender<bool>,
) -> Result<bool> {
    // Connect
    let (ws_stream, _) = connect_async(&config.url).await?;
    let (mut write, mut read) = ws_stream.split();

    // Identify; the service answers with a full put for this context
    let identify = ClientMessage::identify(&config.client_key, context.clone());
    write.send(Message::Text(identify.encode())).await?;

    // Main loop: wait for commands or incoming messages
    loop {
        tokio::select! {
            // Check for commands
            cmd = command_rx.recv() => {
                match cmd {
                    Some(StreamCommand::SetContext(ctx)) => {
                        *context = ctx;
                        let identify = ClientMessage::identify(&config.client_key, context.clone());
                        write.send(Message::Text(identify.encode())).await?;
                    }
                    Some(StreamCommand::Shutdown) | None => {
                        write.close().await.ok();
                        return Ok(true); // Signal shutdown
                    }
                }
            }

            // Check for incoming messages
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match ServerMessage::decode(&text) {
                            Ok(ServerMessage::Put { flags: fresh }) => {
                                let changes = flags.write().await.apply_put(fresh);
                                for change in changes {
                                    let _ = change_tx.send(change);
                                }
                                let _ = ready_tx.send(true);
                                let _ = status_tx.send(ProviderStatus::Ready);
                            }
                            Ok(ServerMessage::Patch { key, value }) => {
                                let change = flags.write().await.apply_patch(&key, value);
                                let _ = change_tx.send(change);
                            }
                            Err(e) => {
                                debug!("undecodable stream message: {}", e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        // Connection closed
                        return Ok(false);
                    }
                    Some(Err(e)) => {
                        return Err(e.into());
                    }
                    _ => {}
                }
            }
        }
    }
}

#[async_trait]
impl FlagProvider for StreamProvider {
    async fn wait_ready(&self) {
        let mut ready_rx = self.ready_rx.clone();
        loop {
            if *ready_rx.borrow() {
                return;
            }
            if ready_rx.changed().await.is_err() {
                return;
            }
        }
    }

    async fn value(&self, key: &str, default: &FlagValue) -> FlagValue {
        self.flags
            .read()
            .await
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<FlagChange> {
        self.change_tx.subscribe()
    }

    fn status(&self) -> watch::Receiver<ProviderStatus> {
        self.status_rx.clone()
    }

    async fn set_context(&self, context: Context) {
        let _ = self
            .command_tx
            .send(StreamCommand::SetContext(context))
            .await;
    }

    async fn shutdown(&self) {
        let _ = self.command_tx.send(StreamCommand::Shutdown).await;
    }
}
