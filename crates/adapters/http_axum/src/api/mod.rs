//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod devices;
#[allow(clippy::missing_errors_doc)]
pub mod house;
#[allow(clippy::missing_errors_doc)]
pub mod rooms;
pub mod sse;

use axum::Router;
use axum::routing::{get, post, put};

use pinhub_app::ports::{Clock, HouseRepository, OutputPort, SwitchRecorder};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<S, P, C>() -> Router<AppState<S, P, C>>
where
    S: HouseRepository + SwitchRecorder + Send + Sync + 'static,
    P: OutputPort,
    C: Clock,
{
    Router::new()
        .route("/house", get(house::get::<S, P, C>))
        // Rooms
        .route("/rooms", post(rooms::create::<S, P, C>))
        .route(
            "/rooms/{id}",
            get(rooms::get::<S, P, C>).delete(rooms::delete::<S, P, C>),
        )
        // Devices
        .route("/devices", post(devices::create::<S, P, C>))
        .route("/devices/scheduled", get(devices::scheduled::<S, P, C>))
        .route(
            "/devices/{id}",
            get(devices::get::<S, P, C>).delete(devices::delete::<S, P, C>),
        )
        .route("/devices/{id}/state", put(devices::update_state::<S, P, C>))
        .route("/devices/{id}/config", put(devices::configure::<S, P, C>))
        // Events
        .route("/events/stream", get(sse::stream::<S, P, C>))
}
