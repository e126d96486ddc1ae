//! # pinhub-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `HouseRepository` — house snapshot loader plus room/device writes
//!   - `SwitchRecorder` — persistence sink for observed switches
//!   - `EventPublisher` — the notifier
//!   - `OutputPort` — raw physical on/off lines
//!   - `Clock` — local wall-clock time
//! - Own the **output resource manager** (exclusive pin bindings), the
//!   **device registry** (house tree + one binding per device) and the
//!   **schedule watcher** (periodic reconciliation)
//! - Expose the request-facing use-cases through `HouseService`
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `pinhub-domain` only (plus `tokio` for timers, tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod event_bus;
pub mod output_manager;
pub mod ports;
pub mod registry;
pub mod services;
pub mod watcher;

#[cfg(test)]
mod test_support;
