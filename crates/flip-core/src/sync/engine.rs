//! Flag synchronization engine
//!
//! A single task owns the displayed state of every binding and
//! serializes everything that can change it: provider change
//! notifications, local toggles, and relay completions. Relay calls run
//! in their own tasks and re-enter the loop as completions tagged with
//! the generation they belong to, so a late response for a superseded
//! or cancelled change is recognized and discarded.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, warn};

use super::state::{BindingSnapshot, LocalState, Origin, RelayOutcome, RemoteOutcome};
use crate::error::RelayResult;
use crate::flag::{Context, FlagValue};
use crate::provider::{FlagProvider, ProviderStatus};
use crate::registry::BindingRegistry;
use crate::relay::{Ack, ChangeRelay};

/// Commands sent to the engine task
#[derive(Debug)]
pub enum EngineCommand {
    /// Apply a local change and relay it
    Toggle { flag: String, desired: FlagValue },
    /// Switch the provider's evaluation context
    SetContext(Context),
    /// Reply with the displayed state of every binding
    Snapshot(oneshot::Sender<Vec<BindingSnapshot>>),
    /// Shutdown the engine task
    Shutdown,
}

/// Events emitted by the engine task
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Initial values have been read from the provider
    Ready,
    /// A binding's displayed value changed
    ValueApplied {
        flag: String,
        value: FlagValue,
        origin: Origin,
    },
    /// A user-facing notice
    Notice(Notice),
    /// Provider connection status changed
    StatusChanged(ProviderStatus),
}

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A message the UI should surface to the user
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Handle to control and observe the engine task
pub struct EngineHandle {
    /// Send commands to the engine task
    pub command_tx: mpsc::Sender<EngineCommand>,
    /// Receive events from the engine task
    pub event_rx: mpsc::Receiver<EngineEvent>,
    /// Watch provider connection status
    pub status_rx: watch::Receiver<ProviderStatus>,
}

/// Result of a relayed change, fed back into the engine loop
#[derive(Debug)]
struct RelayCompletion {
    flag: String,
    generation: u64,
    result: RelayResult<Ack>,
}

/// Spawn the synchronization engine
///
/// Seeds every binding at its default value, waits for the provider to
/// become ready and then applies initial values, emitting
/// [`EngineEvent::Ready`] when done. The task keeps running until a
/// [`EngineCommand::Shutdown`] arrives or the command channel closes.
pub fn spawn_engine(
    registry: BindingRegistry,
    provider: Arc<dyn FlagProvider>,
    relay: Arc<dyn ChangeRelay>,
) -> EngineHandle {
    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::channel(64);
    let initial_status = *provider.status().borrow();
    let (status_tx, status_rx) = watch::channel(initial_status);

    tokio::spawn(engine_task_loop(
        registry, provider, relay, command_rx, event_tx, status_tx,
    ));

    EngineHandle {
        command_tx,
        event_rx,
        status_rx,
    }
}

/// Main engine loop
async fn engine_task_loop(
    registry: BindingRegistry,
    provider: Arc<dyn FlagProvider>,
    relay: Arc<dyn ChangeRelay>,
    mut command_rx: mpsc::Receiver<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
    status_tx: watch::Sender<ProviderStatus>,
) {
    let mut local = LocalState::seeded_from(&registry);
    let mut changes = provider.subscribe();
    let mut provider_status = provider.status();
    let (relay_tx, mut relay_rx) = mpsc::channel::<RelayCompletion>(16);

    let mut ready = false;
    let mut changes_open = true;
    let mut status_open = true;

    loop {
        tokio::select! {
            // Initial read pass once the provider has a full flag set
            _ = provider.wait_ready(), if !ready => {
                ready = true;
                for binding in registry.iter() {
                    let value = provider.value(&binding.flag, &binding.default).await;
                    if let RemoteOutcome::Applied { value, .. } =
                        local.apply_remote(&binding.flag, value)
                    {
                        let _ = event_tx.send(EngineEvent::ValueApplied {
                            flag: binding.flag.clone(),
                            value,
                            origin: Origin::Initial,
                        }).await;
                    }
                }
                let _ = event_tx.send(EngineEvent::Ready).await;
            }

            // Check for commands
            cmd = command_rx.recv() => {
                match cmd {
                    Some(EngineCommand::Toggle { flag, desired }) => {
                        handle_toggle(
                            &registry,
                            &mut local,
                            &relay,
                            &relay_tx,
                            &event_tx,
                            flag,
                            desired,
                        ).await;
                    }
                    Some(EngineCommand::SetContext(context)) => {
                        provider.set_context(context).await;
                    }
                    Some(EngineCommand::Snapshot(reply)) => {
                        let _ = reply.send(local.snapshot());
                    }
                    Some(EngineCommand::Shutdown) | None => {
                        provider.shutdown().await;
                        break;
                    }
                }
            }

            // Remote change notifications
            change = changes.recv(), if changes_open => {
                match change {
                    Ok(change) => {
                        if registry.resolve(&change.key).is_ok() {
                            match local.apply_remote(&change.key, change.current) {
                                RemoteOutcome::Applied { value, cancelled_pending } => {
                                    if cancelled_pending {
                                        debug!(flag = %change.key, "remote update cancelled pending change");
                                    }
                                    let _ = event_tx.send(EngineEvent::ValueApplied {
                                        flag: change.key,
                                        value,
                                        origin: Origin::Remote,
                                    }).await;
                                }
                                RemoteOutcome::Unchanged => {}
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("missed {} change notifications", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        changes_open = false;
                    }
                }
            }

            // Relay completions
            Some(completion) = relay_rx.recv() => {
                handle_completion(&mut local, &event_tx, completion).await;
            }

            // Provider status changes
            changed = provider_status.changed(), if status_open => {
                match changed {
                    Ok(()) => {
                        let status = *provider_status.borrow_and_update();
                        let _ = status_tx.send(status);
                        let _ = event_tx.send(EngineEvent::StatusChanged(status)).await;
                    }
                    Err(_) => {
                        status_open = false;
                    }
                }
            }
        }
    }
}

/// Apply a local change optimistically and relay it
async fn handle_toggle(
    registry: &BindingRegistry,
    local: &mut LocalState,
    relay: &Arc<dyn ChangeRelay>,
    relay_tx: &mpsc::Sender<RelayCompletion>,
    event_tx: &mpsc::Sender<EngineEvent>,
    flag: String,
    desired: FlagValue,
) {
    let binding = match registry.resolve(&flag) {
        Ok(binding) => binding.clone(),
        Err(e) => {
            // Unknown flags surface visibly and never reach the relay
            let _ = event_tx.send(EngineEvent::Notice(Notice::error(e.to_string()))).await;
            return;
        }
    };

    let Some(ticket) = local.begin_local(&flag, desired.clone()) else {
        return;
    };

    let _ = event_tx.send(EngineEvent::ValueApplied {
        flag: flag.clone(),
        value: desired.clone(),
        origin: Origin::Local,
    }).await;

    let relay = relay.clone();
    let relay_tx = relay_tx.clone();
    tokio::spawn(async move {
        let result = relay.send(&binding, &desired).await;
        let _ = relay_tx.send(RelayCompletion {
            flag,
            generation: ticket.generation,
            result,
        }).await;
    });
}

/// Resolve a relay completion against the current state
async fn handle_completion(
    local: &mut LocalState,
    event_tx: &mpsc::Sender<EngineEvent>,
    completion: RelayCompletion,
) {
    let success = completion.result.is_ok();
    match local.complete_relay(&completion.flag, completion.generation, success) {
        RelayOutcome::Confirmed => {
            let text = match local.displayed(&completion.flag) {
                Some(FlagValue::Bool(true)) => {
                    format!("Flag \"{}\" is now enabled", completion.flag)
                }
                Some(FlagValue::Bool(false)) => {
                    format!("Flag \"{}\" is now disabled", completion.flag)
                }
                Some(value) => format!("Flag \"{}\" set to {}", completion.flag, value),
                None => return,
            };
            let _ = event_tx.send(EngineEvent::Notice(Notice::success(text))).await;
        }
        RelayOutcome::RolledBack { restored } => {
            let _ = event_tx.send(EngineEvent::ValueApplied {
                flag: completion.flag.clone(),
                value: restored,
                origin: Origin::Rollback,
            }).await;
            let text = match &completion.result {
                Err(e) => format!("Error updating \"{}\": {}", completion.flag, e),
                Ok(_) => format!("Error updating \"{}\"", completion.flag),
            };
            let _ = event_tx.send(EngineEvent::Notice(Notice::error(text))).await;
        }
        RelayOutcome::Stale => {
            debug!(flag = %completion.flag, "stale relay completion ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::RelayError;
    use crate::provider::StaticProvider;
    use crate::registry::Binding;

    const FLAG: &str = "release-laptop-life-remaining";

    enum Script {
        Reply(RelayResult<Ack>),
        WaitThen(oneshot::Receiver<()>, RelayResult<Ack>),
    }

    /// Relay double that replays scripted responses and records calls
    #[derive(Default)]
    struct ScriptedRelay {
        scripts: Mutex<VecDeque<Script>>,
        calls: Mutex<Vec<(String, FlagValue)>>,
    }

    impl ScriptedRelay {
        fn push_ok(&self) {
            self.scripts
                .lock()
                .unwrap()
                .push_back(Script::Reply(Ok(Ack::default())));
        }

        fn push_err(&self, status: u16) {
            self.scripts
                .lock()
                .unwrap()
                .push_back(Script::Reply(Err(RelayError::Upstream { status })));
        }

        /// Queue a response held back until the returned gate fires
        fn push_gated_ok(&self) -> oneshot::Sender<()> {
            let (gate_tx, gate_rx) = oneshot::channel();
            self.scripts
                .lock()
                .unwrap()
                .push_back(Script::WaitThen(gate_rx, Ok(Ack::default())));
            gate_tx
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChangeRelay for ScriptedRelay {
        async fn send(&self, binding: &Binding, desired: &FlagValue) -> RelayResult<Ack> {
            self.calls
                .lock()
                .unwrap()
                .push((binding.flag.clone(), desired.clone()));
            let script = self.scripts.lock().unwrap().pop_front();
            match script {
                Some(Script::Reply(result)) => result,
                Some(Script::WaitThen(gate, result)) => {
                    let _ = gate.await;
                    result
                }
                None => Ok(Ack::default()),
            }
        }
    }

    fn registry() -> BindingRegistry {
        BindingRegistry::from_bindings([Binding::new(
            FLAG,
            FlagValue::Bool(false),
            "http://localhost:4000/api/toggle",
            "http://localhost:4000/api/toggle",
        )])
    }

    async fn next_event(handle: &mut EngineHandle) -> EngineEvent {
        tokio::time::timeout(Duration::from_secs(2), handle.event_rx.recv())
            .await
            .expect("timed out waiting for engine event")
            .expect("engine event channel closed")
    }

    /// Skip status noise until the next value or notice event
    async fn next_effect(handle: &mut EngineHandle) -> EngineEvent {
        loop {
            match next_event(handle).await {
                EngineEvent::StatusChanged(_) => continue,
                event => return event,
            }
        }
    }

    async fn wait_ready(handle: &mut EngineHandle) -> Vec<EngineEvent> {
        let mut seen = Vec::new();
        loop {
            match next_event(handle).await {
                EngineEvent::Ready => return seen,
                event => seen.push(event),
            }
        }
    }

    async fn snapshot(handle: &EngineHandle) -> Vec<BindingSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        handle
            .command_tx
            .send(EngineCommand::Snapshot(reply_tx))
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(2), reply_rx)
            .await
            .expect("timed out waiting for snapshot")
            .expect("engine dropped snapshot request")
    }

    async fn toggle(handle: &EngineHandle, flag: &str, desired: FlagValue) {
        handle
            .command_tx
            .send(EngineCommand::Toggle {
                flag: flag.to_string(),
                desired,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_initial_sync_applies_provider_values() {
        let mut values = HashMap::new();
        values.insert(FLAG.to_string(), FlagValue::Bool(true));
        let provider = StaticProvider::new(values);
        let relay = Arc::new(ScriptedRelay::default());

        let mut handle = spawn_engine(registry(), Arc::new(provider), relay);

        let before_ready = wait_ready(&mut handle).await;
        assert!(before_ready.contains(&EngineEvent::ValueApplied {
            flag: FLAG.to_string(),
            value: FlagValue::Bool(true),
            origin: Origin::Initial,
        }));

        let snap = snapshot(&handle).await;
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].value, FlagValue::Bool(true));
        assert!(!snap[0].pending);
    }

    #[tokio::test]
    async fn test_toggle_unknown_flag_notices_without_relay() {
        let provider = StaticProvider::new(HashMap::new());
        let relay = Arc::new(ScriptedRelay::default());

        let mut handle = spawn_engine(registry(), Arc::new(provider), relay.clone());
        wait_ready(&mut handle).await;

        toggle(&handle, "release-missing", FlagValue::Bool(true)).await;

        match next_effect(&mut handle).await {
            EngineEvent::Notice(notice) => {
                assert_eq!(notice.level, NoticeLevel::Error);
                assert!(notice.text.contains("No binding registered"));
                assert!(notice.text.contains("release-missing"));
            }
            other => panic!("expected notice, got {:?}", other),
        }
        assert_eq!(relay.call_count(), 0);
    }

    #[tokio::test]
    async fn test_toggle_applies_optimistically_then_confirms() {
        let provider = StaticProvider::new(HashMap::new());
        let relay = Arc::new(ScriptedRelay::default());
        relay.push_ok();

        let mut handle = spawn_engine(registry(), Arc::new(provider), relay.clone());
        wait_ready(&mut handle).await;

        toggle(&handle, FLAG, FlagValue::Bool(true)).await;

        assert_eq!(
            next_effect(&mut handle).await,
            EngineEvent::ValueApplied {
                flag: FLAG.to_string(),
                value: FlagValue::Bool(true),
                origin: Origin::Local,
            }
        );
        match next_effect(&mut handle).await {
            EngineEvent::Notice(notice) => {
                assert_eq!(notice.level, NoticeLevel::Success);
                assert!(notice.text.contains("is now enabled"));
            }
            other => panic!("expected notice, got {:?}", other),
        }

        let snap = snapshot(&handle).await;
        assert_eq!(snap[0].value, FlagValue::Bool(true));
        assert!(!snap[0].pending);
        assert_eq!(relay.call_count(), 1);
    }

    #[tokio::test]
    async fn test_relay_failure_rolls_back_once() {
        let provider = StaticProvider::new(HashMap::new());
        let relay = Arc::new(ScriptedRelay::default());
        relay.push_err(500);

        let mut handle = spawn_engine(registry(), Arc::new(provider), relay);
        wait_ready(&mut handle).await;

        toggle(&handle, FLAG, FlagValue::Bool(true)).await;

        assert_eq!(
            next_effect(&mut handle).await,
            EngineEvent::ValueApplied {
                flag: FLAG.to_string(),
                value: FlagValue::Bool(true),
                origin: Origin::Local,
            }
        );
        assert_eq!(
            next_effect(&mut handle).await,
            EngineEvent::ValueApplied {
                flag: FLAG.to_string(),
                value: FlagValue::Bool(false),
                origin: Origin::Rollback,
            }
        );
        match next_effect(&mut handle).await {
            EngineEvent::Notice(notice) => {
                assert_eq!(notice.level, NoticeLevel::Error);
                assert!(notice.text.contains("Error updating"));
                assert!(notice.text.contains("500"));
            }
            other => panic!("expected notice, got {:?}", other),
        }

        let snap = snapshot(&handle).await;
        assert_eq!(snap[0].value, FlagValue::Bool(false));
        assert!(!snap[0].pending);
        // Exactly one rollback and one notice
        assert!(handle.event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remote_update_wins_over_pending() {
        let mut values = HashMap::new();
        values.insert(FLAG.to_string(), FlagValue::Bool(false));
        let provider = StaticProvider::new(values);
        let remote = provider.clone();
        let relay = Arc::new(ScriptedRelay::default());
        let gate = relay.push_gated_ok();

        let mut handle = spawn_engine(registry(), Arc::new(provider), relay);
        wait_ready(&mut handle).await;

        toggle(&handle, FLAG, FlagValue::Bool(true)).await;
        assert_eq!(
            next_effect(&mut handle).await,
            EngineEvent::ValueApplied {
                flag: FLAG.to_string(),
                value: FlagValue::Bool(true),
                origin: Origin::Local,
            }
        );

        // Remote delivers the opposite value while the relay call hangs
        remote.set_value(FLAG, FlagValue::Bool(false)).await;
        assert_eq!(
            next_effect(&mut handle).await,
            EngineEvent::ValueApplied {
                flag: FLAG.to_string(),
                value: FlagValue::Bool(false),
                origin: Origin::Remote,
            }
        );

        // The pending call resolves late; its result must be discarded
        let _ = gate.send(());
        tokio::time::sleep(Duration::from_millis(100)).await;

        let snap = snapshot(&handle).await;
        assert_eq!(snap[0].value, FlagValue::Bool(false));
        assert!(!snap[0].pending);
        assert!(handle.event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rapid_toggles_last_writer_wins() {
        let provider = StaticProvider::new(HashMap::new());
        let relay = Arc::new(ScriptedRelay::default());
        let gate = relay.push_gated_ok();
        relay.push_ok();

        let mut handle = spawn_engine(registry(), Arc::new(provider), relay);
        wait_ready(&mut handle).await;

        // First toggle hangs in the relay, second supersedes it
        toggle(&handle, FLAG, FlagValue::Bool(true)).await;
        assert_eq!(
            next_effect(&mut handle).await,
            EngineEvent::ValueApplied {
                flag: FLAG.to_string(),
                value: FlagValue::Bool(true),
                origin: Origin::Local,
            }
        );
        toggle(&handle, FLAG, FlagValue::Bool(false)).await;
        assert_eq!(
            next_effect(&mut handle).await,
            EngineEvent::ValueApplied {
                flag: FLAG.to_string(),
                value: FlagValue::Bool(false),
                origin: Origin::Local,
            }
        );

        // Second call confirms the final value
        match next_effect(&mut handle).await {
            EngineEvent::Notice(notice) => {
                assert_eq!(notice.level, NoticeLevel::Success);
                assert!(notice.text.contains("is now disabled"));
            }
            other => panic!("expected notice, got {:?}", other),
        }

        // First call resolves after being superseded; nothing changes
        let _ = gate.send(());
        tokio::time::sleep(Duration::from_millis(100)).await;

        let snap = snapshot(&handle).await;
        assert_eq!(snap[0].value, FlagValue::Bool(false));
        assert!(!snap[0].pending);
        assert!(handle.event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_set_context_forwards_to_provider() {
        let provider = StaticProvider::new(HashMap::new());
        let inspect = provider.clone();
        let relay = Arc::new(ScriptedRelay::default());

        let mut handle = spawn_engine(registry(), Arc::new(provider), relay);
        wait_ready(&mut handle).await;

        handle
            .command_tx
            .send(EngineCommand::SetContext(Context::for_region("Europe")))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(inspect.current_context().await.key, "user-Europe");
    }

    #[tokio::test]
    async fn test_shutdown_stops_engine() {
        let provider = StaticProvider::new(HashMap::new());
        let relay = Arc::new(ScriptedRelay::default());

        let mut handle = spawn_engine(registry(), Arc::new(provider), relay);
        wait_ready(&mut handle).await;

        handle.command_tx.send(EngineCommand::Shutdown).await.unwrap();

        // Event channel closes once the task exits
        let closed = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if handle.event_rx.recv().await.is_none() {
                    return;
                }
            }
        })
        .await;
        assert!(closed.is_ok());
    }
}
