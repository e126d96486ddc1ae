//! Device registry — the in-memory house tree and the pin bindings of its devices.
//!
//! The registry is the only place that acquires or releases output handles.
//! A device is registered exactly when the registry holds a handle for it,
//! so the number of live handles always equals the number of devices.
//!
//! Mutation is serialized through [`SharedRegistry`]; the lock is a plain
//! `std::sync::Mutex` and is never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pinhub_domain::device::{Device, SwitchState};
use pinhub_domain::error::{HubError, LoadError, NotFoundError, ResourceError, ValidationError};
use pinhub_domain::house::House;
use pinhub_domain::id::{DeviceId, RoomId};
use pinhub_domain::pin::Pin;
use pinhub_domain::room::Room;
use pinhub_domain::schedule::Schedule;

use crate::output_manager::{OutputHandle, OutputManager};
use crate::ports::OutputPort;

/// New values for a device being reconfigured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceUpdate {
    pub name: String,
    pub pin: Pin,
    /// `None` takes the device off the schedule.
    pub schedule: Option<Schedule>,
    pub scheduled_by: Option<String>,
}

impl DeviceUpdate {
    /// The update that puts `device` back the way it is now.
    #[must_use]
    pub fn restoring(device: &Device) -> Self {
        Self {
            name: device.name.clone(),
            pin: device.pin,
            schedule: device.schedule,
            scheduled_by: device.scheduled_by.clone(),
        }
    }
}

/// Outcome of [`DeviceRegistry::configure_device`].
#[derive(Debug, Clone)]
pub struct Reconfigured {
    pub previous: Device,
    pub current: Device,
}

/// The house tree plus one output handle per registered device.
pub struct DeviceRegistry<P: OutputPort> {
    outputs: OutputManager<P>,
    house: House,
    handles: HashMap<DeviceId, OutputHandle<P>>,
}

impl<P: OutputPort> DeviceRegistry<P> {
    /// Build the registry from a house snapshot.
    ///
    /// Stale bindings are released first, then every loaded device is bound
    /// to its pin. Any failure aborts the load and releases whatever was
    /// bound so far.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NoHouse`] when `snapshot` is `None`,
    /// [`ResourceError::Cleanup`] when stale bindings cannot be released, or
    /// the acquisition error of the first device that cannot be bound.
    #[tracing::instrument(skip_all)]
    pub fn load(outputs: OutputManager<P>, snapshot: Option<House>) -> Result<Self, HubError> {
        let mut house = snapshot.ok_or(LoadError::NoHouse)?;
        house.validate()?;
        house.reparent();
        outputs.reset()?;

        let mut handles = HashMap::new();
        for device in house.devices() {
            let handle = outputs.acquire(device.pin)?;
            restore_level(&handle, device);
            handles.insert(device.id, handle);
        }
        tracing::info!(
            house = %house.name,
            rooms = house.rooms.len(),
            devices = handles.len(),
            "house loaded"
        );
        Ok(Self {
            outputs,
            house,
            handles,
        })
    }

    #[must_use]
    pub fn house(&self) -> &House {
        &self.house
    }

    /// Number of output handles currently held.
    #[must_use]
    pub fn live_handles(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn outputs(&self) -> &OutputManager<P> {
        &self.outputs
    }

    /// Attach a room, registering any devices it already carries.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty name or a reused id, or the
    /// first device registration error (the room is then detached again).
    pub fn add_room(&mut self, mut room: Room) -> Result<(), HubError> {
        room.validate()?;
        if self.house.room(room.id).is_some() {
            return Err(ValidationError::DuplicateRoom(room.id.to_string()).into());
        }
        room.house_id = self.house.id;
        let devices = std::mem::take(&mut room.devices);
        let room_id = room.id;
        self.house.rooms.push(room);

        for mut device in devices {
            device.room_id = room_id;
            if let Err(err) = self.add_device(device) {
                self.remove_room(room_id);
                return Err(err);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn get_room(&self, id: RoomId) -> Option<&Room> {
        self.house.room(id)
    }

    /// Detach a room, releasing the pins of all of its devices first.
    pub fn remove_room(&mut self, id: RoomId) -> Option<Room> {
        let device_ids: Vec<DeviceId> = self
            .house
            .room(id)?
            .devices
            .iter()
            .map(|d| d.id)
            .collect();
        for device_id in device_ids {
            self.release(device_id);
        }
        self.house.remove_room(id)
    }

    /// Register a device in its room and bind its pin.
    ///
    /// When the device is recorded as on, the line is driven on straight
    /// away. Nothing is mutated if any step fails.
    ///
    /// # Errors
    ///
    /// Returns `RoomNotFound` when the device's room does not exist,
    /// [`ValidationError::DuplicateDevice`] when the id is taken, or the
    /// [`ResourceError`] from binding or driving the pin.
    pub fn add_device(&mut self, device: Device) -> Result<(), HubError> {
        device.validate()?;
        if self.house.room(device.room_id).is_none() {
            return Err(NotFoundError::room(device.room_id).into());
        }
        if self.house.device(device.id).is_some() {
            return Err(ValidationError::DuplicateDevice(device.id.to_string()).into());
        }

        let handle = self.outputs.acquire(device.pin)?;
        if device.status.is_on() {
            handle.set(true)?;
        }

        let device_id = device.id;
        if let Some(room) = self.house.room_mut(device.room_id) {
            room.devices.push(device);
        }
        self.handles.insert(device_id, handle);
        Ok(())
    }

    #[must_use]
    pub fn get_device(&self, id: DeviceId) -> Option<&Device> {
        self.house.device(id)
    }

    /// Detach a device from its room, then release its pin. Absent ids are a no-op.
    pub fn remove_device(&mut self, id: DeviceId) -> Option<Device> {
        let room_id = self.house.device(id)?.room_id;
        let device = self.house.remove_device(room_id, id)?;
        self.release(id);
        Some(device)
    }

    /// Drive a device's line. Does not touch the recorded status.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound`, [`ResourceError::NotInitialized`] when the
    /// device holds no handle, or [`ResourceError::Fault`] from the hardware.
    pub fn switch_device(&self, id: DeviceId, on: bool) -> Result<(), HubError> {
        if self.house.device(id).is_none() {
            return Err(NotFoundError::device(id).into());
        }
        let handle = self
            .handles
            .get(&id)
            .ok_or_else(|| ResourceError::NotInitialized {
                device_id: id.to_string(),
            })?;
        handle.set(on)?;
        Ok(())
    }

    /// Record a new status, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound` when the device does not exist.
    pub fn set_status(&mut self, id: DeviceId, status: SwitchState) -> Result<SwitchState, HubError> {
        let device = self
            .house
            .device_mut(id)
            .ok_or_else(|| NotFoundError::device(id))?;
        Ok(std::mem::replace(&mut device.status, status))
    }

    /// Rename, re-pin, and (re)schedule a device.
    ///
    /// The old pin is released before the new one is acquired. If the new
    /// pin cannot be bound, the old binding is restored and the device is
    /// left untouched. The recorded status is kept as is.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound`, a validation error for the new values, or
    /// the [`ResourceError`] that prevented binding the new pin.
    pub fn configure_device(
        &mut self,
        id: DeviceId,
        update: DeviceUpdate,
    ) -> Result<Reconfigured, HubError> {
        let previous = self
            .house
            .device(id)
            .cloned()
            .ok_or_else(|| NotFoundError::device(id))?;

        let mut current = previous.clone();
        current.name = update.name;
        current.pin = update.pin;
        current.schedule = update.schedule;
        current.scheduled_by = if current.schedule.is_some() {
            update.scheduled_by
        } else {
            None
        };
        current.validate()?;

        self.release(id);
        let handle = match self.outputs.acquire(current.pin) {
            Ok(handle) => handle,
            Err(err) => {
                self.rebind(&previous);
                return Err(err.into());
            }
        };
        restore_level(&handle, &current);
        self.handles.insert(id, handle);

        if let Some(device) = self.house.device_mut(id) {
            *device = current.clone();
        }
        Ok(Reconfigured { previous, current })
    }

    /// Snapshot of every device that carries a schedule.
    #[must_use]
    pub fn list_scheduled_devices(&self) -> Vec<Device> {
        self.house.scheduled_devices().cloned().collect()
    }

    /// Drive every line off and release it.
    pub fn release_all(&mut self) {
        for (device_id, handle) in self.handles.drain() {
            if let Err(err) = handle.set(false) {
                tracing::warn!(%device_id, pin = %handle.pin(), %err, "failed to switch off on release");
            }
        }
    }

    fn release(&mut self, id: DeviceId) {
        if let Some(handle) = self.handles.remove(&id) {
            handle.release();
        }
    }

    fn rebind(&mut self, device: &Device) {
        match self.outputs.acquire(device.pin) {
            Ok(handle) => {
                restore_level(&handle, device);
                self.handles.insert(device.id, handle);
            }
            Err(err) => {
                tracing::error!(
                    device_id = %device.id,
                    pin = %device.pin,
                    %err,
                    "failed to restore previous binding"
                );
            }
        }
    }
}

fn restore_level<P: OutputPort>(handle: &OutputHandle<P>, device: &Device) {
    if !device.status.is_on() {
        return;
    }
    if let Err(err) = handle.set(true) {
        tracing::warn!(
            device_id = %device.id,
            pin = %device.pin,
            %err,
            "failed to restore line level"
        );
    }
}

/// The registry behind its serialization point.
pub struct SharedRegistry<P: OutputPort> {
    inner: Arc<Mutex<DeviceRegistry<P>>>,
}

impl<P: OutputPort> Clone for SharedRegistry<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: OutputPort> SharedRegistry<P> {
    #[must_use]
    pub fn new(registry: DeviceRegistry<P>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Take the lock. Callers must drop the guard before awaiting.
    pub fn lock(&self) -> MutexGuard<'_, DeviceRegistry<P>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
