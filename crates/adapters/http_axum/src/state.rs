//! Shared application state for axum handlers.

use std::sync::Arc;

use pinhub_app::event_bus::InProcessEventBus;
use pinhub_app::ports::{Clock, HouseRepository, OutputPort, SwitchRecorder};
use pinhub_app::services::house_service::HouseService;

/// Application state shared across all axum handlers.
///
/// Generic over the store, the output port and the clock to avoid dynamic
/// dispatch. `Clone` is implemented manually so the underlying types do not
/// need to be `Clone`; only the `Arc` is cloned.
pub struct AppState<S, P: OutputPort, C> {
    /// Request-facing façade over the registry, the watcher and the store.
    pub service: Arc<HouseService<S, P, InProcessEventBus, C>>,
}

impl<S, P: OutputPort, C> Clone for AppState<S, P, C> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<S, P, C> AppState<S, P, C>
where
    S: HouseRepository + SwitchRecorder + Send + Sync + 'static,
    P: OutputPort,
    C: Clock,
{
    /// Create a new application state from a running service.
    pub fn new(service: HouseService<S, P, InProcessEventBus, C>) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Create a new application state from a pre-wrapped service.
    ///
    /// Use this when the service must outlive the HTTP server, e.g. to
    /// release pins on shutdown.
    pub fn from_arc(service: Arc<HouseService<S, P, InProcessEventBus, C>>) -> Self {
        Self { service }
    }

    /// The bus SSE clients subscribe to.
    #[must_use]
    pub fn event_bus(&self) -> &InProcessEventBus {
        self.service.publisher()
    }
}
