//! In-memory flag provider
//!
//! Serves a fixed set of flag values. Used as the degraded-mode
//! fallback when no stream credentials are configured, and as a test
//! double that can push changes on demand.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch, RwLock};

use super::{FlagProvider, ProviderStatus};
use crate::flag::{Context, FlagChange, FlagValue};
use crate::registry::BindingRegistry;

/// Provider backed by an in-memory value table
///
/// Clones share the same table, so a test can keep one clone as a
/// handle and hand another to the engine.
#[derive(Clone)]
pub struct StaticProvider {
    flags: Arc<RwLock<HashMap<String, FlagValue>>>,
    context: Arc<RwLock<Context>>,
    change_tx: broadcast::Sender<FlagChange>,
    status_rx: watch::Receiver<ProviderStatus>,
    // Held so the status watch stays open
    _status_tx: Arc<watch::Sender<ProviderStatus>>,
}

impl StaticProvider {
    /// Provider serving the given values, immediately ready
    pub fn new(values: HashMap<String, FlagValue>) -> Self {
        Self::with_status(values, ProviderStatus::Ready)
    }

    /// Provider serving every registered binding's default value
    ///
    /// Reports [`ProviderStatus::Degraded`] so the UI can show that no
    /// stream connection exists.
    pub fn degraded(registry: &BindingRegistry) -> Self {
        let values = registry
            .iter()
            .map(|b| (b.flag.clone(), b.default.clone()))
            .collect();
        Self::with_status(values, ProviderStatus::Degraded)
    }

    fn with_status(values: HashMap<String, FlagValue>, status: ProviderStatus) -> Self {
        let (change_tx, _) = broadcast::channel(64);
        let (status_tx, status_rx) = watch::channel(status);
        Self {
            flags: Arc::new(RwLock::new(values)),
            context: Arc::new(RwLock::new(Context::default())),
            change_tx,
            status_rx,
            _status_tx: Arc::new(status_tx),
        }
    }

    /// Set a value and notify subscribers, as a remote change would
    pub async fn set_value(&self, key: &str, value: FlagValue) {
        let previous = {
            let mut flags = self.flags.write().await;
            flags.insert(key.to_string(), value.clone())
        };
        let _ = self.change_tx.send(FlagChange {
            key: key.to_string(),
            current: value,
            previous,
        });
    }

    /// The most recently applied evaluation context
    pub async fn current_context(&self) -> Context {
        self.context.read().await.clone()
    }
}

#[async_trait]
impl FlagProvider for StaticProvider {
    async fn wait_ready(&self) {}

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
        *self.context.write().await = context;
    }

    async fn shutdown(&self) {}
}
