//! In-memory stubs and spies for the ports, shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{NaiveDate, NaiveDateTime};

use pinhub_domain::device::Device;
use pinhub_domain::error::{HubError, ResourceError};
use pinhub_domain::event::Event;
use pinhub_domain::house::House;
use pinhub_domain::id::{DeviceId, RoomId};
use pinhub_domain::pin::Pin;
use pinhub_domain::room::Room;
use pinhub_domain::switch_record::SwitchRecord;

use crate::ports::{Clock, EventPublisher, HouseRepository, OutputPort, SwitchRecorder};

fn storage_failure() -> HubError {
    HubError::Storage(Box::new(std::io::Error::other("disk full")))
}

#[derive(Default)]
struct FakeLines {
    open: HashMap<Pin, bool>,
    failing: HashSet<Pin>,
    resets: usize,
    writes: usize,
}

/// Records every line operation; optionally restricted to a pin range.
#[derive(Default)]
pub struct FakePort {
    lines: Mutex<FakeLines>,
    range: Option<RangeInclusive<u8>>,
    fail_reset: AtomicBool,
}

impl FakePort {
    pub fn with_range(range: RangeInclusive<u8>) -> Self {
        Self {
            range: Some(range),
            ..Self::default()
        }
    }

    pub fn is_open(&self, pin: Pin) -> bool {
        self.lines.lock().unwrap().open.contains_key(&pin)
    }

    pub fn level(&self, pin: Pin) -> Option<bool> {
        self.lines.lock().unwrap().open.get(&pin).copied()
    }

    pub fn open_count(&self) -> usize {
        self.lines.lock().unwrap().open.len()
    }

    pub fn reset_count(&self) -> usize {
        self.lines.lock().unwrap().resets
    }

    pub fn write_count(&self) -> usize {
        self.lines.lock().unwrap().writes
    }

    pub fn fail_writes(&self, pin: Pin) {
        self.lines.lock().unwrap().failing.insert(pin);
    }

    pub fn heal(&self, pin: Pin) {
        self.lines.lock().unwrap().failing.remove(&pin);
    }

    pub fn fail_reset(&self) {
        self.fail_reset.store(true, Ordering::SeqCst);
    }
}

impl OutputPort for FakePort {
    fn reset(&self) -> Result<(), ResourceError> {
        if self.fail_reset.load(Ordering::SeqCst) {
            return Err(ResourceError::Cleanup(std::io::Error::other("busy")));
        }
        let mut lines = self.lines.lock().unwrap();
        lines.resets += 1;
        lines.open.clear();
        Ok(())
    }

    fn open(&self, pin: Pin) -> Result<(), ResourceError> {
        if let Some(range) = &self.range
            && !range.contains(&pin.number())
        {
            return Err(ResourceError::InvalidPin { pin });
        }
        self.lines.lock().unwrap().open.insert(pin, false);
        Ok(())
    }

    fn write(&self, pin: Pin, on: bool) -> Result<(), ResourceError> {
        let mut lines = self.lines.lock().unwrap();
        if lines.failing.contains(&pin) {
            return Err(ResourceError::Fault {
                pin,
                source: std::io::Error::other("relay stuck"),
            });
        }
        lines.writes += 1;
        lines.open.insert(pin, on);
        Ok(())
    }

    fn close(&self, pin: Pin) {
        self.lines.lock().unwrap().open.remove(&pin);
    }
}

/// House store kept in memory; can be told to fail every write.
#[derive(Default)]
pub struct InMemoryHouseRepo {
    house: Mutex<Option<House>>,
    switches: Mutex<Vec<SwitchRecord>>,
    failing: AtomicBool,
}

impl InMemoryHouseRepo {
    pub fn with_house(house: House) -> Self {
        Self {
            house: Mutex::new(Some(house)),
            ..Self::default()
        }
    }

    pub fn switches(&self) -> Vec<SwitchRecord> {
        self.switches.lock().unwrap().clone()
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Option<House> {
        self.house.lock().unwrap().clone()
    }

    fn write<T>(&self, f: impl FnOnce(&mut House) -> T) -> Result<T, HubError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(storage_failure());
        }
        let mut guard = self.house.lock().unwrap();
        let house = guard.as_mut().ok_or_else(storage_failure)?;
        Ok(f(house))
    }
}

impl HouseRepository for InMemoryHouseRepo {
    fn load_house(&self) -> impl Future<Output = Result<Option<House>, HubError>> + Send {
        let house = self.snapshot();
        async move { Ok(house) }
    }

    fn create_room(&self, room: &Room) -> impl Future<Output = Result<(), HubError>> + Send {
        let result = self.write(|house| house.rooms.push(room.clone()));
        async move { result }
    }

    fn delete_room(&self, id: RoomId) -> impl Future<Output = Result<u64, HubError>> + Send {
        let result = self.write(|house| u64::from(house.remove_room(id).is_some()));
        async move { result }
    }

    fn create_device(&self, device: &Device) -> impl Future<Output = Result<(), HubError>> + Send {
        let result = self.write(|house| {
            if let Some(room) = house.room_mut(device.room_id) {
                room.devices.push(device.clone());
            }
        });
        async move { result }
    }

    fn update_device(&self, device: &Device) -> impl Future<Output = Result<(), HubError>> + Send {
        let result = self.write(|house| {
            if let Some(stored) = house.device_mut(device.id) {
                *stored = device.clone();
            }
        });
        async move { result }
    }

    fn delete_device(&self, id: DeviceId) -> impl Future<Output = Result<u64, HubError>> + Send {
        let result = self.write(|house| {
            let room_id = house.device(id).map(|d| d.room_id);
            let removed = room_id.and_then(|room_id| house.remove_device(room_id, id));
            u64::from(removed.is_some())
        });
        async move { result }
    }
}

impl SwitchRecorder for InMemoryHouseRepo {
    fn record_switch(
        &self,
        record: SwitchRecord,
    ) -> impl Future<Output = Result<u64, HubError>> + Send {
        let result = self.write(|house| {
            if let Some(device) = house.device_mut(record.device_id) {
                device.status = record.to;
            }
        });
        if result.is_ok() {
            self.switches.lock().unwrap().push(record);
        }
        async move { result.map(|()| 1) }
    }
}

/// Collects recorded switches.
#[derive(Default)]
pub struct SpyRecorder {
    records: Mutex<Vec<SwitchRecord>>,
    failing: AtomicBool,
}

impl SpyRecorder {
    pub fn records(&self) -> Vec<SwitchRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

impl SwitchRecorder for SpyRecorder {
    fn record_switch(
        &self,
        record: SwitchRecord,
    ) -> impl Future<Output = Result<u64, HubError>> + Send {
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(storage_failure())
        } else {
            self.records.lock().unwrap().push(record);
            Ok(1)
        };
        async move { result }
    }
}

/// Collects published events.
#[derive(Default)]
pub struct SpyPublisher {
    events: Mutex<Vec<Event>>,
}

impl SpyPublisher {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl EventPublisher for SpyPublisher {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), HubError>> + Send {
        self.events.lock().unwrap().push(event);
        async { Ok(()) }
    }
}

/// A clock the test moves by hand.
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    /// Start at the given hour and minute on Wednesday 2024-05-15.
    pub fn wednesday_at(hour: u32, minute: u32) -> Self {
        Self {
            now: Mutex::new(wednesday(hour, minute)),
        }
    }

    pub fn set(&self, at: NaiveDateTime) {
        *self.now.lock().unwrap() = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}

pub fn wednesday(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 15)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub fn saturday(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 18)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}
