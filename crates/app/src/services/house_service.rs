//! House service — the request-facing use-cases of the controller.
//!
//! Every operation goes through the registry first (it owns the pins) and
//! then through the store. Additions and reconfigurations are rolled back in
//! memory when the store write fails; removals hit the store first so a
//! failed delete leaves everything in place.

use std::sync::Arc;

use pinhub_domain::device::{Device, SwitchState};
use pinhub_domain::error::{HubError, LoadError, NotFoundError};
use pinhub_domain::event::Event;
use pinhub_domain::house::House;
use pinhub_domain::id::{DeviceId, RoomId};
use pinhub_domain::pin::Pin;
use pinhub_domain::room::Room;
use pinhub_domain::schedule::Schedule;
use pinhub_domain::switch_record::SwitchRecord;

use crate::output_manager::OutputManager;
use crate::ports::{Clock, EventPublisher, HouseRepository, OutputPort, SwitchRecorder};
use crate::registry::{DeviceRegistry, DeviceUpdate, SharedRegistry};
use crate::watcher::{ScheduleWatcher, WatcherConfig};

/// Requested configuration for a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub name: String,
    pub pin: Pin,
    /// `None` takes the device off the schedule.
    pub schedule: Option<Schedule>,
    /// Who is making the change; kept as `scheduled_by` when scheduling.
    pub actor: String,
}

/// Façade over the registry, the watcher, the store and the notifier.
pub struct HouseService<S, P: OutputPort, E, C> {
    store: Arc<S>,
    registry: SharedRegistry<P>,
    watcher: ScheduleWatcher<P, Arc<S>, Arc<E>, C>,
    publisher: Arc<E>,
}

impl<S, P, E, C> HouseService<S, P, E, C>
where
    S: HouseRepository + SwitchRecorder + Send + Sync + 'static,
    P: OutputPort,
    E: EventPublisher + Send + Sync + 'static,
    C: Clock,
{
    /// Load the house, bind every device, and start watching scheduled ones.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the snapshot is missing or cannot be read,
    /// or the resource error that stopped a device from being bound. Both
    /// are fatal: the controller must not serve requests half-initialized.
    #[tracing::instrument(skip_all)]
    pub async fn start(
        store: Arc<S>,
        outputs: OutputManager<P>,
        publisher: Arc<E>,
        clock: C,
        config: WatcherConfig,
    ) -> Result<Self, HubError> {
        let snapshot = store
            .load_house()
            .await
            .map_err(|err| LoadError::Unavailable(Box::new(err)))?;
        let registry = SharedRegistry::new(DeviceRegistry::load(outputs, snapshot)?);
        let watcher = ScheduleWatcher::new(
            registry.clone(),
            Arc::clone(&store),
            Arc::clone(&publisher),
            clock,
            config,
        );

        let scheduled = registry.lock().list_scheduled_devices();
        for device in &scheduled {
            watcher.schedule_device(device.id);
        }
        tracing::info!(scheduled = scheduled.len(), "controller started");

        Ok(Self {
            store,
            registry,
            watcher,
            publisher,
        })
    }

    /// Snapshot of the whole tree.
    #[must_use]
    pub fn house(&self) -> House {
        self.registry.lock().house().clone()
    }

    #[must_use]
    pub fn publisher(&self) -> &Arc<E> {
        &self.publisher
    }

    #[must_use]
    pub fn watcher(&self) -> &ScheduleWatcher<P, Arc<S>, Arc<E>, C> {
        &self.watcher
    }

    /// Create an empty room.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] for an empty name, or the storage error.
    #[tracing::instrument(skip(self))]
    pub async fn add_room(&self, name: &str) -> Result<Room, HubError> {
        let room = {
            let mut registry = self.registry.lock();
            let room = Room::builder()
                .house_id(registry.house().id)
                .name(name.trim())
                .build()?;
            registry.add_room(room.clone())?;
            room
        };

        if let Err(err) = self.store.create_room(&room).await {
            self.registry.lock().remove_room(room.id);
            return Err(err);
        }
        Ok(room)
    }

    /// # Errors
    ///
    /// Returns `RoomNotFound` when no room has this id.
    pub fn get_room(&self, id: RoomId) -> Result<Room, HubError> {
        self.registry
            .lock()
            .get_room(id)
            .cloned()
            .ok_or_else(|| NotFoundError::room(id).into())
    }

    /// Delete a room and all of its devices.
    ///
    /// # Errors
    ///
    /// Returns `RoomNotFound`, or the storage error (nothing is removed then).
    #[tracing::instrument(skip(self))]
    pub async fn remove_room(&self, id: RoomId) -> Result<Room, HubError> {
        self.get_room(id)?;
        self.store.delete_room(id).await?;

        let room = self
            .registry
            .lock()
            .remove_room(id)
            .ok_or_else(|| NotFoundError::room(id))?;
        for device in &room.devices {
            self.watcher.remove_scheduled_device(device.id);
        }
        Ok(room)
    }

    /// Register a new device in a room and bind its pin.
    ///
    /// # Errors
    ///
    /// Returns `RoomNotFound`, a validation error, the [`ResourceError`](pinhub_domain::error::ResourceError)
    /// from binding the pin, or the storage error (the device is unregistered again).
    #[tracing::instrument(skip(self))]
    pub async fn add_device(&self, room_id: RoomId, name: &str, pin: Pin) -> Result<Device, HubError> {
        let device = Device::builder()
            .room_id(room_id)
            .name(name.trim())
            .pin(pin)
            .build()?;
        self.registry.lock().add_device(device.clone())?;

        if let Err(err) = self.store.create_device(&device).await {
            self.registry.lock().remove_device(device.id);
            return Err(err);
        }
        Ok(device)
    }

    /// # Errors
    ///
    /// Returns `DeviceNotFound` when no device has this id.
    pub fn get_device(&self, id: DeviceId) -> Result<Device, HubError> {
        self.registry
            .lock()
            .get_device(id)
            .cloned()
            .ok_or_else(|| NotFoundError::device(id).into())
    }

    /// Delete a device and release its pin. Removing an unknown id is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the storage error (nothing is removed then).
    #[tracing::instrument(skip(self))]
    pub async fn remove_device(&self, id: DeviceId) -> Result<Option<Device>, HubError> {
        if self.registry.lock().get_device(id).is_none() {
            return Ok(None);
        }
        self.store.delete_device(id).await?;

        let removed = self.registry.lock().remove_device(id);
        self.watcher.remove_scheduled_device(id);
        Ok(removed)
    }

    /// Switch a device on request.
    ///
    /// The status is only updated once the line was driven. Persisting and
    /// broadcasting happen afterwards; their failures are logged.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound`, `ResourceNotInitialized`, or `ResourceFault`.
    #[tracing::instrument(skip(self))]
    pub async fn switch_device(
        &self,
        id: DeviceId,
        state: SwitchState,
        actor: &str,
    ) -> Result<Device, HubError> {
        let (previous, device) = {
            let mut registry = self.registry.lock();
            registry.switch_device(id, state.is_on())?;
            let previous = registry.set_status(id, state)?;
            let device = registry
                .get_device(id)
                .cloned()
                .ok_or_else(|| NotFoundError::device(id))?;
            (previous, device)
        };

        let record = SwitchRecord::new(id, previous, state, actor);
        if let Err(err) = self.store.record_switch(record).await {
            tracing::warn!(device_id = %id, %err, "failed to persist switch");
        }
        let event = Event::device_switched(id, &device.name, state, actor);
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(device_id = %id, %err, "failed to broadcast switch");
        }
        Ok(device)
    }

    /// Rename, re-pin, and (re)schedule a device.
    ///
    /// The old pin is released before the new one is bound. The watcher
    /// picks the device up (or drops it) according to the new schedule; the
    /// recorded status is untouched so the next tick reconciles it.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound`, a validation error, the resource error that
    /// prevented binding the new pin, or the storage error (the previous
    /// configuration is restored).
    #[tracing::instrument(skip(self, config), fields(device_name = %config.name, pin = %config.pin))]
    pub async fn configure_device(&self, id: DeviceId, config: DeviceConfig) -> Result<Device, HubError> {
        let update = DeviceUpdate {
            name: config.name.trim().to_string(),
            pin: config.pin,
            schedule: config.schedule,
            scheduled_by: Some(config.actor),
        };
        let outcome = self.registry.lock().configure_device(id, update)?;

        if let Err(err) = self.store.update_device(&outcome.current).await {
            let restore = DeviceUpdate::restoring(&outcome.previous);
            if let Err(revert) = self.registry.lock().configure_device(id, restore) {
                tracing::error!(device_id = %id, err = %revert, "failed to revert configuration");
            }
            return Err(err);
        }

        if outcome.current.is_scheduled() {
            self.watcher.schedule_device(id);
        } else {
            self.watcher.remove_scheduled_device(id);
        }
        Ok(outcome.current)
    }

    /// Snapshot of every scheduled device.
    #[must_use]
    pub fn list_scheduled_devices(&self) -> Vec<Device> {
        self.registry.lock().list_scheduled_devices()
    }

    /// Stop the watcher and release every pin.
    pub fn shutdown(&self) {
        self.watcher.stop();
        self.registry.lock().release_all();
        tracing::info!("controller shut down");
    }
}
