//! Flag synchronization engine
//!
//! Keeps the displayed value of every binding consistent with the
//! remote flag service while letting local changes apply without
//! waiting for the network.
//!
//! ## Reconciliation
//!
//! 1. Bindings start at their configured defaults
//! 2. Once the provider is ready, initial values replace the defaults
//! 3. Remote changes always win and cancel pending local changes
//! 4. Local changes apply optimistically, roll back if the relay
//!    rejects them, and supersede each other last-writer-wins
//!
//! ## Usage
//!
//! ```ignore
//! let handle = spawn_engine(registry, provider, relay);
//! handle.command_tx.send(EngineCommand::Toggle { flag, desired }).await?;
//! while let Some(event) = handle.event_rx.recv().await { /* ... */ }
//! ```

mod engine;
mod state;

pub use engine::{
    spawn_engine, EngineCommand, EngineEvent, EngineHandle, Notice, NoticeLevel,
};
pub use state::{
    BindingSnapshot, BindingState, LocalState, Origin, PendingTicket, RelayOutcome,
    RemoteOutcome,
};
