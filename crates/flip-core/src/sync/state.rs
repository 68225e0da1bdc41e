//! Per-binding synchronization state
//!
//! Tracks whether each binding is synced or has an optimistic change in
//! flight, and decides how remote updates, local intent, and relay
//! completions reconcile. Every decision here is synchronous; the engine
//! task drives this from its event loop, so no locking is needed.
//!
//! ## Reconciliation rules
//!
//! - A remote update always wins: it becomes the displayed value and
//!   cancels any pending change, whose eventual relay response is then
//!   ignored.
//! - A local change applies optimistically and records the value to
//!   restore if the relay rejects it.
//! - A second local change supersedes the first (last-writer-wins). The
//!   superseded call's completion no longer matches the current
//!   generation and is discarded. A superseding change keeps the original
//!   rollback target, the last value the remote confirmed.

use std::collections::HashMap;

use crate::flag::FlagValue;
use crate::registry::BindingRegistry;

/// State of one binding
#[derive(Debug, Clone, PartialEq)]
pub enum BindingState {
    /// Displayed value matches the last confirmed remote value
    Synced(FlagValue),
    /// An optimistic change is in flight
    Pending {
        /// Value currently displayed, awaiting confirmation
        desired: FlagValue,
        /// Value to restore if the relay rejects the change
        prior: FlagValue,
        /// Identifies the in-flight relay call
        generation: u64,
    },
}

impl BindingState {
    /// The value the UI should display right now
    pub fn displayed(&self) -> &FlagValue {
        match self {
            BindingState::Synced(value) => value,
            BindingState::Pending { desired, .. } => desired,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, BindingState::Pending { .. })
    }
}

/// Where an applied value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Initial read after provider readiness
    Initial,
    /// Remote change notification
    Remote,
    /// Optimistic local update
    Local,
    /// Restore after a rejected local update
    Rollback,
}

/// Result of applying a remote update
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
    /// Displayed value changed; notify the UI
    Applied {
        value: FlagValue,
        /// A pending change was cancelled by this update
        cancelled_pending: bool,
    },
    /// Value already displayed, nothing to do
    Unchanged,
}

/// Result of a relay completion
#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutcome {
    /// Change confirmed; displayed value stays as is
    Confirmed,
    /// Change rejected; displayed value restored
    RolledBack { restored: FlagValue },
    /// Superseded or already resolved; has no effect on the UI
    Stale,
}

/// A newly recorded pending change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTicket {
    /// Generation the relay completion must present to be applied
    pub generation: u64,
}

/// Snapshot of one binding for display
#[derive(Debug, Clone, PartialEq)]
pub struct BindingSnapshot {
    pub flag: String,
    pub value: FlagValue,
    pub pending: bool,
}

#[derive(Debug)]
struct Entry {
    state: BindingState,
    /// Monotonic per-binding counter; the latest issued generation
    generation: u64,
}

/// Displayed state for every binding, owned by the engine task
///
/// Iteration order of snapshots follows binding registration order.
#[derive(Debug, Default)]
pub struct LocalState {
    entries: HashMap<String, Entry>,
    order: Vec<String>,
}

impl LocalState {
    /// Empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// State seeded with every registered binding at its default value
    pub fn seeded_from(registry: &BindingRegistry) -> Self {
        let mut state = Self::new();
        for binding in registry.iter() {
            state.seed(&binding.flag, binding.default.clone());
        }
        state
    }

    /// Add a binding at its starting value
    pub fn seed(&mut self, flag: &str, value: FlagValue) {
        if !self.entries.contains_key(flag) {
            self.order.push(flag.to_string());
        }
        self.entries.insert(
            flag.to_string(),
            Entry {
                state: BindingState::Synced(value),
                generation: 0,
            },
        );
    }

    /// The value the UI should display for a flag
    pub fn displayed(&self, flag: &str) -> Option<&FlagValue> {
        self.entries.get(flag).map(|e| e.state.displayed())
    }

    pub fn is_pending(&self, flag: &str) -> bool {
        self.entries
            .get(flag)
            .map(|e| e.state.is_pending())
            .unwrap_or(false)
    }

    /// Apply a remote-originated update; the remote always wins
    pub fn apply_remote(&mut self, flag: &str, value: FlagValue) -> RemoteOutcome {
        let Some(entry) = self.entries.get_mut(flag) else {
            return RemoteOutcome::Unchanged;
        };

        let cancelled_pending = entry.state.is_pending();
        let changed = entry.state.displayed() != &value;
        // Bump the generation so any in-flight relay completion is stale
        if cancelled_pending {
            entry.generation += 1;
        }
        entry.state = BindingState::Synced(value.clone());

        if changed {
            RemoteOutcome::Applied {
                value,
                cancelled_pending,
            }
        } else if cancelled_pending {
            // Remote confirmed the optimistic value; the UI already shows
            // it, but the pending marker needs to clear
            RemoteOutcome::Applied {
                value,
                cancelled_pending,
            }
        } else {
            RemoteOutcome::Unchanged
        }
    }

    /// Record an optimistic local change, superseding any pending one
    ///
    /// Returns the ticket the relay completion must match. `None` when
    /// the flag was never seeded, which callers treat as unknown.
    pub fn begin_local(&mut self, flag: &str, desired: FlagValue) -> Option<PendingTicket> {
        let entry = self.entries.get_mut(flag)?;

        entry.generation += 1;
        let prior = match &entry.state {
            BindingState::Synced(value) => value.clone(),
            // Keep the original rollback target; an optimistic value was
            // never confirmed
            BindingState::Pending { prior, .. } => prior.clone(),
        };
        entry.state = BindingState::Pending {
            desired,
            prior,
            generation: entry.generation,
        };

        Some(PendingTicket {
            generation: entry.generation,
        })
    }

    /// Resolve a relay completion for the given generation
    pub fn complete_relay(&mut self, flag: &str, generation: u64, success: bool) -> RelayOutcome {
        let Some(entry) = self.entries.get_mut(flag) else {
            return RelayOutcome::Stale;
        };

        match &entry.state {
            BindingState::Pending {
                desired,
                prior,
                generation: current,
            } if *current == generation => {
                if success {
                    entry.state = BindingState::Synced(desired.clone());
                    RelayOutcome::Confirmed
                } else {
                    let restored = prior.clone();
                    entry.state = BindingState::Synced(restored.clone());
                    RelayOutcome::RolledBack { restored }
                }
            }
            _ => RelayOutcome::Stale,
        }
    }

    /// Snapshot every binding in registration order
    pub fn snapshot(&self) -> Vec<BindingSnapshot> {
        self.order
            .iter()
            .filter_map(|flag| {
                self.entries.get(flag).map(|entry| BindingSnapshot {
                    flag: flag.clone(),
                    value: entry.state.displayed().clone(),
                    pending: entry.state.is_pending(),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
