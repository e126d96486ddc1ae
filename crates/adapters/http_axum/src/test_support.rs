//! In-test store and output lines for driving the router.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use pinhub_app::event_bus::InProcessEventBus;
use pinhub_app::output_manager::OutputManager;
use pinhub_app::ports::{HouseRepository, OutputPort, SwitchRecorder, SystemClock};
use pinhub_app::services::house_service::HouseService;
use pinhub_app::watcher::WatcherConfig;
use pinhub_domain::device::Device;
use pinhub_domain::error::{HubError, ResourceError};
use pinhub_domain::house::House;
use pinhub_domain::id::{DeviceId, RoomId};
use pinhub_domain::pin::Pin;
use pinhub_domain::room::Room;
use pinhub_domain::switch_record::SwitchRecord;

use crate::state::AppState;

/// Store that accepts every write and starts with an empty house.
pub struct StubStore;

impl HouseRepository for StubStore {
    async fn load_house(&self) -> Result<Option<House>, HubError> {
        Ok(Some(House::new("Home")?))
    }

    async fn create_room(&self, _room: &Room) -> Result<(), HubError> {
        Ok(())
    }

    async fn delete_room(&self, _id: RoomId) -> Result<u64, HubError> {
        Ok(1)
    }

    async fn create_device(&self, _device: &Device) -> Result<(), HubError> {
        Ok(())
    }

    async fn update_device(&self, _device: &Device) -> Result<(), HubError> {
        Ok(())
    }

    async fn delete_device(&self, _id: DeviceId) -> Result<u64, HubError> {
        Ok(1)
    }
}

impl SwitchRecorder for StubStore {
    async fn record_switch(&self, _record: SwitchRecord) -> Result<u64, HubError> {
        Ok(1)
    }
}

/// Lines 2..=27 that remember their last level.
#[derive(Default)]
pub struct StubLines {
    levels: Mutex<HashMap<Pin, bool>>,
}

impl OutputPort for StubLines {
    fn reset(&self) -> Result<(), ResourceError> {
        Ok(())
    }

    fn open(&self, pin: Pin) -> Result<(), ResourceError> {
        if !(2..=27).contains(&pin.number()) {
            return Err(ResourceError::InvalidPin { pin });
        }
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pin, false);
        Ok(())
    }

    fn write(&self, pin: Pin, on: bool) -> Result<(), ResourceError> {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pin, on);
        Ok(())
    }

    fn close(&self, pin: Pin) {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&pin);
    }
}

pub type TestState = AppState<StubStore, StubLines, SystemClock>;

pub async fn test_state() -> TestState {
    let service = HouseService::start(
        Arc::new(StubStore),
        OutputManager::new(StubLines::default()),
        Arc::new(InProcessEventBus::new(16)),
        SystemClock,
        WatcherConfig::default(),
    )
    .await
    .unwrap();
    AppState::new(service)
}
