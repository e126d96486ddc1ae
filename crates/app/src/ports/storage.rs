//! Storage port — the house snapshot loader and the persistence sinks.

use std::future::Future;
use std::sync::Arc;

use pinhub_domain::device::Device;
use pinhub_domain::error::HubError;
use pinhub_domain::house::House;
use pinhub_domain::id::{DeviceId, RoomId};
use pinhub_domain::room::Room;
use pinhub_domain::switch_record::SwitchRecord;

/// Durable copy of the house tree.
pub trait HouseRepository {
    /// Load the full house snapshot, `None` when the store holds no house.
    fn load_house(&self) -> impl Future<Output = Result<Option<House>, HubError>> + Send;

    /// Persist a new (empty) room.
    fn create_room(&self, room: &Room) -> impl Future<Output = Result<(), HubError>> + Send;

    /// Delete a room and every device in it, returning the number of rooms removed.
    fn delete_room(&self, id: RoomId) -> impl Future<Output = Result<u64, HubError>> + Send;

    /// Persist a newly registered device.
    fn create_device(&self, device: &Device) -> impl Future<Output = Result<(), HubError>> + Send;

    /// Overwrite the stored fields of an existing device.
    fn update_device(&self, device: &Device) -> impl Future<Output = Result<(), HubError>> + Send;

    /// Delete a device, returning the number of rows removed.
    fn delete_device(&self, id: DeviceId) -> impl Future<Output = Result<u64, HubError>> + Send;
}

/// Persistence update sink for observed switches.
pub trait SwitchRecorder {
    /// Record a transition, returning the number of rows touched.
    fn record_switch(
        &self,
        record: SwitchRecord,
    ) -> impl Future<Output = Result<u64, HubError>> + Send;
}

impl<T: HouseRepository + Send + Sync> HouseRepository for Arc<T> {
    fn load_house(&self) -> impl Future<Output = Result<Option<House>, HubError>> + Send {
        (**self).load_house()
    }

    fn create_room(&self, room: &Room) -> impl Future<Output = Result<(), HubError>> + Send {
        (**self).create_room(room)
    }

    fn delete_room(&self, id: RoomId) -> impl Future<Output = Result<u64, HubError>> + Send {
        (**self).delete_room(id)
    }

    fn create_device(&self, device: &Device) -> impl Future<Output = Result<(), HubError>> + Send {
        (**self).create_device(device)
    }

    fn update_device(&self, device: &Device) -> impl Future<Output = Result<(), HubError>> + Send {
        (**self).update_device(device)
    }

    fn delete_device(&self, id: DeviceId) -> impl Future<Output = Result<u64, HubError>> + Send {
        (**self).delete_device(id)
    }
}

impl<T: SwitchRecorder + Send + Sync> SwitchRecorder for Arc<T> {
    fn record_switch(
        &self,
        record: SwitchRecord,
    ) -> impl Future<Output = Result<u64, HubError>> + Send {
        (**self).record_switch(record)
    }
}
