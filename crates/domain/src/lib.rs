//! # pinhub-domain
//!
//! Pure domain model for the pinhub home controller.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, hardware pins, error conventions, timestamps
//! - Define the **House → Room → Device** tree and its structural invariants
//! - Define **schedule windows** (active weekdays + daily start/stop) and the
//!   pure evaluator deciding whether a device should currently be on
//! - Define **Events** broadcast to observers and **switch records** handed
//!   to persistence
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod pin;
pub mod time;

pub mod device;
pub mod event;
pub mod house;
pub mod room;
pub mod schedule;
pub mod switch_record;
