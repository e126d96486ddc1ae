//! `SQLite` implementation of [`HouseRepository`] and [`SwitchRecorder`].
//!
//! Schedules are stored flattened: `is_scheduled` plus the textual
//! `days_scheduled`, `start_time` and `off_time` columns, all empty when the
//! device is not scheduled.

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use pinhub_app::ports::{HouseRepository, SwitchRecorder};
use pinhub_domain::device::{Device, SwitchState};
use pinhub_domain::error::HubError;
use pinhub_domain::house::House;
use pinhub_domain::id::{DeviceId, HouseId, RoomId};
use pinhub_domain::pin::Pin;
use pinhub_domain::room::Room;
use pinhub_domain::schedule::Schedule;
use pinhub_domain::switch_record::SwitchRecord;

use crate::error::StorageError;

fn decode<E: std::error::Error + Send + Sync + 'static>(err: E) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

/// Wrapper for converting database rows into a domain [`Room`] (without devices).
struct RoomRow(Room);

impl<'r> FromRow<'r, SqliteRow> for RoomRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let house_id: String = row.try_get("house_id")?;
        let name: String = row.try_get("name")?;

        Ok(Self(Room {
            id: RoomId::from_str(&id).map_err(decode)?,
            house_id: HouseId::from_str(&house_id).map_err(decode)?,
            name,
            devices: Vec::new(),
        }))
    }
}

/// Wrapper for converting database rows into a domain [`Device`].
struct DeviceRow(Device);

impl<'r> FromRow<'r, SqliteRow> for DeviceRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let room_id: String = row.try_get("room_id")?;
        let name: String = row.try_get("name")?;
        let pin: i64 = row.try_get("pin")?;
        let status: String = row.try_get("status")?;
        let is_scheduled: bool = row.try_get("is_scheduled")?;
        let days_scheduled: String = row.try_get("days_scheduled")?;
        let start_time: String = row.try_get("start_time")?;
        let off_time: String = row.try_get("off_time")?;
        let scheduled_by: Option<String> = row.try_get("scheduled_by")?;

        let schedule = if is_scheduled {
            Some(Schedule::parse(&days_scheduled, &start_time, &off_time).map_err(decode)?)
        } else {
            None
        };

        Ok(Self(Device {
            id: DeviceId::from_str(&id).map_err(decode)?,
            room_id: RoomId::from_str(&room_id).map_err(decode)?,
            name,
            pin: Pin::new(u8::try_from(pin).map_err(decode)?),
            status: SwitchState::from_str(&status).map_err(decode)?,
            schedule,
            scheduled_by: scheduled_by.filter(|_| is_scheduled),
        }))
    }
}

/// Flattened schedule columns of a device.
struct ScheduleColumns {
    is_scheduled: bool,
    days: String,
    start: String,
    off: String,
}

impl ScheduleColumns {
    fn of(device: &Device) -> Self {
        match &device.schedule {
            Some(schedule) => Self {
                is_scheduled: true,
                days: schedule.days.to_string(),
                start: schedule.start.to_string(),
                off: schedule.stop.to_string(),
            },
            None => Self {
                is_scheduled: false,
                days: String::new(),
                start: String::new(),
                off: String::new(),
            },
        }
    }
}

const SELECT_HOUSE: &str = "SELECT id, name FROM houses ORDER BY created_at, rowid LIMIT 1";
const INSERT_HOUSE: &str = "INSERT INTO houses (id, name, created_at) VALUES (?, ?, ?)";
const SELECT_ROOMS: &str = "SELECT id, house_id, name FROM rooms WHERE house_id = ? ORDER BY rowid";
const SELECT_DEVICES: &str = "SELECT d.* FROM devices d JOIN rooms r ON r.id = d.room_id \
     WHERE r.house_id = ? ORDER BY d.rowid";
const INSERT_ROOM: &str = "INSERT INTO rooms (id, house_id, name) VALUES (?, ?, ?)";
const DELETE_ROOM_DEVICES: &str = "DELETE FROM devices WHERE room_id = ?";
const DELETE_ROOM: &str = "DELETE FROM rooms WHERE id = ?";
const INSERT_DEVICE: &str = "INSERT INTO devices \
     (id, room_id, name, pin, status, is_scheduled, days_scheduled, start_time, off_time, scheduled_by) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
const UPDATE_DEVICE: &str = "UPDATE devices SET room_id = ?, name = ?, pin = ?, is_scheduled = ?, \
     days_scheduled = ?, start_time = ?, off_time = ?, scheduled_by = ? WHERE id = ?";
const DELETE_DEVICE: &str = "DELETE FROM devices WHERE id = ?";
const INSERT_SWITCH: &str = "INSERT INTO switch_history (device_id, from_state, to_state, actor, switched_at) \
     VALUES (?, ?, ?, ?, ?)";
const UPDATE_STATUS: &str = "UPDATE devices SET status = ? WHERE id = ?";

async fn load(pool: &SqlitePool) -> Result<Option<House>, StorageError> {
    let Some(row) = sqlx::query(SELECT_HOUSE).fetch_optional(pool).await? else {
        return Ok(None);
    };
    let id: String = row.try_get("id")?;
    let name: String = row.try_get("name")?;
    let id = HouseId::from_str(&id).map_err(decode)?;

    let rooms: Vec<RoomRow> = sqlx::query_as(SELECT_ROOMS)
        .bind(id.to_string())
        .fetch_all(pool)
        .await?;
    let devices: Vec<DeviceRow> = sqlx::query_as(SELECT_DEVICES)
        .bind(id.to_string())
        .fetch_all(pool)
        .await?;

    let mut rooms: Vec<Room> = rooms.into_iter().map(|r| r.0).collect();
    for DeviceRow(device) in devices {
        if let Some(room) = rooms.iter_mut().find(|r| r.id == device.room_id) {
            room.devices.push(device);
        }
    }
    Ok(Some(House { id, name, rooms }))
}

/// `SQLite`-backed house store.
pub struct SqliteHouseStore {
    pool: SqlitePool,
}

impl SqliteHouseStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Return the stored house, creating an empty one named `name` if the
    /// store holds none.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if a query fails or `name` is empty.
    pub async fn ensure_house(&self, name: &str) -> Result<House, StorageError> {
        if let Some(house) = load(&self.pool).await? {
            return Ok(house);
        }
        let house = House::new(name).map_err(StorageError::InvalidHouse)?;
        sqlx::query(INSERT_HOUSE)
            .bind(house.id.to_string())
            .bind(&house.name)
            .bind(pinhub_domain::time::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        tracing::info!(house_id = %house.id, name = %house.name, "house created");
        Ok(house)
    }
}

impl HouseRepository for SqliteHouseStore {
    fn load_house(&self) -> impl Future<Output = Result<Option<House>, HubError>> + Send {
        let pool = self.pool.clone();
        async move { Ok(load(&pool).await?) }
    }

    fn create_room(&self, room: &Room) -> impl Future<Output = Result<(), HubError>> + Send {
        let pool = self.pool.clone();
        let room = room.clone();
        async move {
            sqlx::query(INSERT_ROOM)
                .bind(room.id.to_string())
                .bind(room.house_id.to_string())
                .bind(&room.name)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }

    fn delete_room(&self, id: RoomId) -> impl Future<Output = Result<u64, HubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let mut tx = pool.begin().await.map_err(StorageError::from)?;
            sqlx::query(DELETE_ROOM_DEVICES)
                .bind(id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
            let result = sqlx::query(DELETE_ROOM)
                .bind(id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
            tx.commit().await.map_err(StorageError::from)?;

            Ok(result.rows_affected())
        }
    }

    fn create_device(&self, device: &Device) -> impl Future<Output = Result<(), HubError>> + Send {
        let pool = self.pool.clone();
        let device = device.clone();
        async move {
            let columns = ScheduleColumns::of(&device);
            sqlx::query(INSERT_DEVICE)
                .bind(device.id.to_string())
                .bind(device.room_id.to_string())
                .bind(&device.name)
                .bind(i64::from(device.pin.number()))
                .bind(device.status.as_str())
                .bind(columns.is_scheduled)
                .bind(columns.days)
                .bind(columns.start)
                .bind(columns.off)
                .bind(&device.scheduled_by)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }

    fn update_device(&self, device: &Device) -> impl Future<Output = Result<(), HubError>> + Send {
        let pool = self.pool.clone();
        let device = device.clone();
        async move {
            let columns = ScheduleColumns::of(&device);
            sqlx::query(UPDATE_DEVICE)
                .bind(device.room_id.to_string())
                .bind(&device.name)
                .bind(i64::from(device.pin.number()))
                .bind(columns.is_scheduled)
                .bind(columns.days)
                .bind(columns.start)
                .bind(columns.off)
                .bind(&device.scheduled_by)
                .bind(device.id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }

    fn delete_device(&self, id: DeviceId) -> impl Future<Output = Result<u64, HubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(DELETE_DEVICE)
                .bind(id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(result.rows_affected())
        }
    }
}

impl SwitchRecorder for SqliteHouseStore {
    /// Append to the switch history and store the new status.
    ///
    /// Returns the number of device rows updated (0 when the device is gone).
    fn record_switch(
        &self,
        record: SwitchRecord,
    ) -> impl Future<Output = Result<u64, HubError>> + Send {
        let pool = self.pool.clone();
        async move {
            let mut tx = pool.begin().await.map_err(StorageError::from)?;
            sqlx::query(INSERT_SWITCH)
                .bind(record.device_id.to_string())
                .bind(record.from.as_str())
                .bind(record.to.as_str())
                .bind(&record.actor)
                .bind(record.timestamp.to_rfc3339())
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
            let result = sqlx::query(UPDATE_STATUS)
                .bind(record.to.as_str())
                .bind(record.device_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
            tx.commit().await.map_err(StorageError::from)?;

            Ok(result.rows_affected())
        }
    }
}
