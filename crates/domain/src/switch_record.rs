//! Switch records — the audit trail handed to persistence for each transition.

use serde::{Deserialize, Serialize};

use crate::device::SwitchState;
use crate::id::DeviceId;
use crate::time::{Timestamp, now};

/// One observed on/off transition of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchRecord {
    pub device_id: DeviceId,
    pub from: SwitchState,
    pub to: SwitchState,
    pub actor: String,
    pub timestamp: Timestamp,
}

impl SwitchRecord {
    /// Record a transition happening now.
    #[must_use]
    pub fn new(
        device_id: DeviceId,
        from: SwitchState,
        to: SwitchState,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            device_id,
            from,
            to,
            actor: actor.into(),
            timestamp: now(),
        }
    }
}
