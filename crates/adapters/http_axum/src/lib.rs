//! # pinhub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **JSON REST API** over the house tree
//!   (`/api/house`, `/api/rooms`, `/api/devices`, …)
//! - Stream controller events to clients as **Server-Sent Events**
//!   (`/api/events/stream`)
//! - Map HTTP requests into `HouseService` calls (driving adapter)
//! - Map [`HubError`](pinhub_domain::error::HubError) into status codes
//!
//! ## Dependency rule
//! Depends on `pinhub-app` (for port traits and services) and `pinhub-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
mod test_support;
