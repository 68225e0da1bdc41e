//! Flip Core Library
//!
//! This crate provides the core functionality for Flip, a feature-flag
//! control panel that keeps local toggle state synchronized with a
//! remote flag service.
//!
//! # Architecture
//!
//! - **Registry**: flag-to-endpoint bindings, looked up by flag key
//! - **Provider**: read side, streams flag values and change
//!   notifications from the flag service
//! - **Relay**: write side, posts desired values to per-flag action
//!   endpoints
//! - **Engine**: a single task reconciling remote updates, optimistic
//!   local changes, and relay results
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let registry = BindingRegistry::from_bindings(config.bindings.clone());
//! let provider = Arc::new(StaticProvider::degraded(&registry));
//! let relay = Arc::new(HttpRelay::new()?);
//!
//! let mut handle = spawn_engine(registry, provider, relay);
//! handle.command_tx.send(EngineCommand::Toggle {
//!     flag: "release-laptop-life-remaining".into(),
//!     desired: FlagValue::Bool(true),
//! }).await?;
//! ```
//!
//! # Modules
//!
//! - `registry`: flag bindings and lookup
//! - `flag`: flag values, change notifications, evaluation context
//! - `provider`: stream and in-memory flag providers
//! - `relay`: HTTP change relay
//! - `sync`: synchronization engine and per-binding state
//! - `config`: application configuration

pub mod config;
pub mod error;
pub mod flag;
pub mod provider;
pub mod registry;
pub mod relay;
pub mod sync;

pub use config::Config;
pub use error::{ConfigError, NotFound, RelayError};
pub use flag::{Context, FlagChange, FlagValue};
pub use provider::{
    spawn_stream_provider, FlagProvider, ProviderStatus, StaticProvider, StreamConfig,
    StreamProvider,
};
pub use registry::{Binding, BindingRegistry};
pub use relay::{Ack, ChangeRelay, HttpRelay};
pub use sync::{
    spawn_engine, BindingSnapshot, EngineCommand, EngineEvent, EngineHandle, Notice,
    NoticeLevel, Origin,
};
