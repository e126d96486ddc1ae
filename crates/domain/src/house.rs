//! House — the root of the device tree.

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::error::{HubError, ValidationError};
use crate::id::{DeviceId, HouseId, RoomId};
use crate::room::Room;

/// The single house managed by a controller, with all of its rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct House {
    pub id: HouseId,
    pub name: String,
    #[serde(default)]
    pub rooms: Vec<Room>,
}

impl House {
    /// Create an empty house.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] when `name` is empty.
    pub fn new(name: impl Into<String>) -> Result<Self, HubError> {
        let house = Self {
            id: HouseId::new(),
            name: name.into(),
            rooms: Vec::new(),
        };
        house.validate()?;
        Ok(house)
    }

    /// Check domain invariants: a name is set and device ids are unique.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] on an empty name or a duplicate device id.
    pub fn validate(&self) -> Result<(), HubError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let mut seen = std::collections::HashSet::new();
        for device in self.devices() {
            if !seen.insert(device.id) {
                return Err(ValidationError::DuplicateDevice(device.id.to_string()).into());
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.iter_mut().find(|r| r.id == id)
    }

    #[must_use]
    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices().find(|d| d.id == id)
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.rooms
            .iter_mut()
            .flat_map(|r| r.devices.iter_mut())
            .find(|d| d.id == id)
    }

    /// Every device across every room.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.rooms.iter().flat_map(|r| r.devices.iter())
    }

    /// Devices that carry a schedule.
    pub fn scheduled_devices(&self) -> impl Iterator<Item = &Device> {
        self.devices().filter(|d| d.is_scheduled())
    }

    /// Point every room at this house and every device at the room holding it.
    pub fn reparent(&mut self) {
        for room in &mut self.rooms {
            room.house_id = self.id;
            for device in &mut room.devices {
                device.room_id = room.id;
            }
        }
    }

    /// Detach a room and return it with its devices.
    pub fn remove_room(&mut self, id: RoomId) -> Option<Room> {
        let idx = self.rooms.iter().position(|r| r.id == id)?;
        Some(self.rooms.remove(idx))
    }

    /// Detach a device from the given room.
    pub fn remove_device(&mut self, room_id: RoomId, device_id: DeviceId) -> Option<Device> {
        self.room_mut(room_id)?.take_device(device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::Pin;

    fn house_with_lamp() -> (House, RoomId, DeviceId) {
        let mut house = House::new("Home").unwrap();
        let lamp = Device::builder().name("Lamp").pin(17).build().unwrap();
        let lamp_id = lamp.id;
        let room = Room::builder()
            .house_id(house.id)
            .name("Kitchen")
            .device(lamp)
            .build()
            .unwrap();
        let room_id = room.id;
        house.rooms.push(room);
        (house, room_id, lamp_id)
    }

    #[test]
    fn should_reject_empty_house_name() {
        assert!(matches!(
            House::new(""),
            Err(HubError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_find_device_across_rooms() {
        let (house, room_id, lamp_id) = house_with_lamp();
        let lamp = house.device(lamp_id).unwrap();
        assert_eq!(lamp.room_id, room_id);
        assert_eq!(lamp.pin, Pin::new(17));
    }

    #[test]
    fn should_reject_duplicate_device_ids() {
        let (mut house, _, lamp_id) = house_with_lamp();
        let copy = house.device(lamp_id).unwrap().clone();
        let other = Room::builder()
            .house_id(house.id)
            .name("Attic")
            .device(copy)
            .build()
            .unwrap();
        house.rooms.push(other);

        assert!(matches!(
            house.validate(),
            Err(HubError::Validation(ValidationError::DuplicateDevice(_)))
        ));
    }

    #[test]
    fn should_point_devices_at_holding_room_when_reparented() {
        let (mut house, room_id, lamp_id) = house_with_lamp();
        house.rooms[0].house_id = HouseId::new();
        house.device_mut(lamp_id).unwrap().room_id = RoomId::new();

        house.reparent();

        assert_eq!(house.rooms[0].house_id, house.id);
        assert_eq!(house.device(lamp_id).unwrap().room_id, room_id);
        assert!(house.remove_device(room_id, lamp_id).is_some());
    }

    #[test]
    fn should_list_only_scheduled_devices() {
        let (mut house, _, lamp_id) = house_with_lamp();
        assert_eq!(house.scheduled_devices().count(), 0);

        house.device_mut(lamp_id).unwrap().schedule =
            Some(crate::schedule::Schedule::parse("Mon", "08:00", "09:00").unwrap());
        assert_eq!(house.scheduled_devices().count(), 1);
    }

    #[test]
    fn should_remove_device_only_from_its_room() {
        let (mut house, room_id, lamp_id) = house_with_lamp();
        assert!(house.remove_device(RoomId::new(), lamp_id).is_none());
        assert!(house.remove_device(room_id, lamp_id).is_some());
        assert!(house.device(lamp_id).is_none());
    }

    #[test]
    fn should_remove_room_with_its_devices() {
        let (mut house, room_id, lamp_id) = house_with_lamp();
        let room = house.remove_room(room_id).unwrap();
        assert_eq!(room.devices.len(), 1);
        assert!(house.device(lamp_id).is_none());
        assert!(house.remove_room(room_id).is_none());
    }
}
