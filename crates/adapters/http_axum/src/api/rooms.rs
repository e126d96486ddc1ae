//! JSON REST handlers for rooms.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use pinhub_app::ports::{Clock, HouseRepository, OutputPort, SwitchRecorder};
use pinhub_domain::id::RoomId;
use pinhub_domain::room::Room;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for creating a room.
#[derive(Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<Room>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<Room>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `POST /api/rooms`
pub async fn create<S, P, C>(
    State(state): State<AppState<S, P, C>>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<CreateResponse, ApiError>
where
    S: HouseRepository + SwitchRecorder + Send + Sync + 'static,
    P: OutputPort,
    C: Clock,
{
    let room = state.service.add_room(&req.name).await?;
    Ok(CreateResponse::Created(Json(room)))
}

/// `GET /api/rooms/:id`
pub async fn get<S, P, C>(
    State(state): State<AppState<S, P, C>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    S: HouseRepository + SwitchRecorder + Send + Sync + 'static,
    P: OutputPort,
    C: Clock,
{
    let room = state.service.get_room(RoomId::parse(&id)?)?;
    Ok(GetResponse::Ok(Json(room)))
}

/// `DELETE /api/rooms/:id` — removes the room together with its devices.
pub async fn delete<S, P, C>(
    State(state): State<AppState<S, P, C>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    S: HouseRepository + SwitchRecorder + Send + Sync + 'static,
    P: OutputPort,
    C: Clock,
{
    state.service.remove_room(RoomId::parse(&id)?).await?;
    Ok(DeleteResponse::NoContent)
}
