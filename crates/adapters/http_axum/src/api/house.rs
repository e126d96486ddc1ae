//! JSON REST handler for the house tree.

use axum::Json;
use axum::extract::State;

use pinhub_app::ports::{Clock, HouseRepository, OutputPort, SwitchRecorder};
use pinhub_domain::house::House;

use crate::state::AppState;

/// `GET /api/house` — snapshot of every room and device.
pub async fn get<S, P, C>(State(state): State<AppState<S, P, C>>) -> Json<House>
where
    S: HouseRepository + SwitchRecorder + Send + Sync + 'static,
    P: OutputPort,
    C: Clock,
{
    Json(state.service.house())
}
