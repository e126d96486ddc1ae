//! JSON REST handlers for devices.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use pinhub_app::ports::{Clock, HouseRepository, OutputPort, SwitchRecorder};
use pinhub_app::services::house_service::DeviceConfig;
use pinhub_domain::device::{Device, SwitchState};
use pinhub_domain::error::ValidationError;
use pinhub_domain::id::{DeviceId, RoomId};
use pinhub_domain::pin::Pin;
use pinhub_domain::schedule::Schedule;

use crate::error::ApiError;
use crate::state::AppState;

/// Actor recorded when a request does not name one.
const DEFAULT_ACTOR: &str = "api";

fn default_actor() -> String {
    DEFAULT_ACTOR.to_string()
}

/// Request body for creating a device.
#[derive(Deserialize)]
pub struct CreateDeviceRequest {
    pub room_id: String,
    pub name: String,
    pub pin: u8,
}

/// Request body for switching a device.
#[derive(Deserialize)]
pub struct UpdateStateRequest {
    pub state: SwitchState,
    #[serde(default = "default_actor")]
    pub actor: String,
}

/// Request body for configuring a device.
#[derive(Deserialize)]
pub struct ConfigureDeviceRequest {
    pub name: String,
    pub pin: u8,
    #[serde(default)]
    pub is_scheduled: bool,
    pub days: Option<String>,
    pub start_time: Option<String>,
    pub off_time: Option<String>,
    #[serde(default = "default_actor")]
    pub actor: String,
}

impl ConfigureDeviceRequest {
    fn schedule(&self) -> Result<Option<Schedule>, ApiError> {
        if !self.is_scheduled {
            return Ok(None);
        }
        let days = self
            .days
            .as_deref()
            .ok_or(ValidationError::MissingScheduleField("active days"))?;
        let start = self
            .start_time
            .as_deref()
            .ok_or(ValidationError::MissingScheduleField("a start time"))?;
        let off = self
            .off_time
            .as_deref()
            .ok_or(ValidationError::MissingScheduleField("an off time"))?;
        Ok(Some(Schedule::parse(days, start, off)?))
    }
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Device>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get, switch and configure endpoints.
pub enum GetResponse {
    Ok(Json<Device>),
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
    Created(Json<Device>),
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

/// `POST /api/devices`
pub async fn create<S, P, C>(
    State(state): State<AppState<S, P, C>>,
    Json(req): Json<CreateDeviceRequest>,
) -> Result<CreateResponse, ApiError>
where
    S: HouseRepository + SwitchRecorder + Send + Sync + 'static,
    P: OutputPort,
    C: Clock,
{
    let room_id = RoomId::parse(&req.room_id)?;
    let device = state
        .service
        .add_device(room_id, &req.name, Pin::new(req.pin))
        .await?;
    Ok(CreateResponse::Created(Json(device)))
}

/// `GET /api/devices/:id`
pub async fn get<S, P, C>(
    State(state): State<AppState<S, P, C>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    S: HouseRepository + SwitchRecorder + Send + Sync + 'static,
    P: OutputPort,
    C: Clock,
{
    let device = state.service.get_device(DeviceId::parse(&id)?)?;
    Ok(GetResponse::Ok(Json(device)))
}

/// `DELETE /api/devices/:id` — unknown ids are accepted as already gone.
pub async fn delete<S, P, C>(
    State(state): State<AppState<S, P, C>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    S: HouseRepository + SwitchRecorder + Send + Sync + 'static,
    P: OutputPort,
    C: Clock,
{
    state.service.remove_device(DeviceId::parse(&id)?).await?;
    Ok(DeleteResponse::NoContent)
}

/// `PUT /api/devices/:id/state`
pub async fn update_state<S, P, C>(
    State(state): State<AppState<S, P, C>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStateRequest>,
) -> Result<GetResponse, ApiError>
where
    S: HouseRepository + SwitchRecorder + Send + Sync + 'static,
    P: OutputPort,
    C: Clock,
{
    let device = state
        .service
        .switch_device(DeviceId::parse(&id)?, req.state, &req.actor)
        .await?;
    Ok(GetResponse::Ok(Json(device)))
}

/// `PUT /api/devices/:id/config`
pub async fn configure<S, P, C>(
    State(state): State<AppState<S, P, C>>,
    Path(id): Path<String>,
    Json(req): Json<ConfigureDeviceRequest>,
) -> Result<GetResponse, ApiError>
where
    S: HouseRepository + SwitchRecorder + Send + Sync + 'static,
    P: OutputPort,
    C: Clock,
{
    let device_id = DeviceId::parse(&id)?;
    let config = DeviceConfig {
        schedule: req.schedule()?,
        name: req.name,
        pin: Pin::new(req.pin),
        actor: req.actor,
    };
    let device = state.service.configure_device(device_id, config).await?;
    Ok(GetResponse::Ok(Json(device)))
}

/// `GET /api/devices/scheduled`
pub async fn scheduled<S, P, C>(State(state): State<AppState<S, P, C>>) -> ListResponse
where
    S: HouseRepository + SwitchRecorder + Send + Sync + 'static,
    P: OutputPort,
    C: Clock,
{
    ListResponse::Ok(Json(state.service.list_scheduled_devices()))
}
