//! Event — a notification broadcast to observers after a device switched.
//!
//! The JSON shape is stable: `eventType`, `actorId`, `message` and a
//! `payload` carrying `deviceId` plus `newState`.

use serde::{Deserialize, Serialize};

use crate::device::SwitchState;
use crate::id::{DeviceId, EventId};
use crate::schedule::schedule_actor;
use crate::time::{Timestamp, now};

/// What kind of switch produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    /// The schedule watcher changed a device.
    ScheduledSwitch,
    /// A request switched a device directly.
    DeviceSwitched,
}

impl EventType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ScheduledSwitch => "scheduled-switch",
            Self::DeviceSwitched => "device-switched",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchPayload {
    pub device_id: DeviceId,
    pub new_state: SwitchState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub actor_id: String,
    pub message: String,
    pub payload: SwitchPayload,
    pub timestamp: Timestamp,
}

impl Event {
    /// Event emitted when the watcher drives a device.
    #[must_use]
    pub fn scheduled_switch(
        device_id: DeviceId,
        device_name: &str,
        new_state: SwitchState,
        scheduled_by: Option<&str>,
    ) -> Self {
        Self::new(
            EventType::ScheduledSwitch,
            schedule_actor(scheduled_by),
            format!("Scheduled switch: {device_name} turned {new_state}"),
            device_id,
            new_state,
        )
    }

    /// Event emitted when a caller switches a device directly.
    #[must_use]
    pub fn device_switched(
        device_id: DeviceId,
        device_name: &str,
        new_state: SwitchState,
        actor: impl Into<String>,
    ) -> Self {
        Self::new(
            EventType::DeviceSwitched,
            actor.into(),
            format!("{device_name} turned {new_state}"),
            device_id,
            new_state,
        )
    }

    fn new(
        event_type: EventType,
        actor_id: String,
        message: String,
        device_id: DeviceId,
        new_state: SwitchState,
    ) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            actor_id,
            message,
            payload: SwitchPayload {
                device_id,
                new_state,
            },
            timestamp: now(),
        }
    }
}
