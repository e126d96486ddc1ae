//! Schedule windows: which weekdays a device runs and between which times.
//!
//! The evaluator [`is_within_window`] is a pure function: the caller
//! supplies the current time of day and weekday, nothing is read from the
//! system clock here.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{HubError, ValidationError};

/// Actor name recorded for switches performed by the watcher.
pub const SCHEDULE_ASSISTANT: &str = "schedule-assistant";

/// Decide whether a device should be on right now.
///
/// - `false` when `today` is not one of `active_days`.
/// - `start < stop`: on while `start <= now < stop`.
/// - `start > stop` (window crosses midnight): on while `now >= start` or `now < stop`.
/// - `start == stop`: the window is empty, never on.
#[must_use]
pub fn is_within_window(
    now: TimeOfDay,
    start: TimeOfDay,
    stop: TimeOfDay,
    active_days: Days,
    today: Weekday,
) -> bool {
    if !active_days.contains(today) {
        return false;
    }
    match start.cmp(&stop) {
        std::cmp::Ordering::Less => start <= now && now < stop,
        std::cmp::Ordering::Greater => now >= start || now < stop,
        std::cmp::Ordering::Equal => false,
    }
}

/// Build the actor string attached to scheduled switches.
#[must_use]
pub fn schedule_actor(scheduled_by: Option<&str>) -> String {
    match scheduled_by {
        Some(user) if !user.is_empty() => format!("{user}|{SCHEDULE_ASSISTANT}"),
        _ => SCHEDULE_ASSISTANT.to_string(),
    }
}

/// A wall-clock time of day, written `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    /// Build from hour and minute.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimeOfDay`] when out of range.
    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, ValidationError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidTimeOfDay(format!("{hour}:{minute}")))
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(value: NaiveTime) -> Self {
        Self(value)
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map(Self)
            .map_err(|_| ValidationError::InvalidTimeOfDay(s.to_string()))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A set of weekdays, stored as a bitmask (bit 0 = Monday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Days(u8);

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

impl Days {
    pub const EMPTY: Self = Self(0);
    pub const ALL: Self = Self(0b111_1111);

    /// Monday through Friday.
    #[must_use]
    pub const fn workdays() -> Self {
        Self(0b001_1111)
    }

    #[must_use]
    pub fn with(self, day: Weekday) -> Self {
        Self(self.0 | Self::bit(day))
    }

    #[must_use]
    pub fn contains(self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the contained days, Monday first.
    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        WEEK.into_iter().filter(move |day| self.contains(*day))
    }

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_monday()
    }
}

impl FromIterator<Weekday> for Days {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

/// Lenient parser: any non-letter separates tokens, tokens are short or
/// long English day names in any case (`"mon,Tue wednesday"`).
impl FromStr for Days {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(|c: char| !c.is_ascii_alphabetic())
            .filter(|token| !token.is_empty())
            .map(|token| {
                Weekday::from_str(token)
                    .map_err(|_| ValidationError::InvalidWeekday(token.to_string()))
            })
            .collect()
    }
}

impl fmt::Display for Days {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, day) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{day}")?;
        }
        Ok(())
    }
}

impl Serialize for Days {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Days {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A weekly on/off window for one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub days: Days,
    pub start: TimeOfDay,
    pub stop: TimeOfDay,
}

impl Schedule {
    /// Build and validate a schedule.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoScheduleDays`] when `days` is empty.
    pub fn new(days: Days, start: TimeOfDay, stop: TimeOfDay) -> Result<Self, HubError> {
        let schedule = Self { days, start, stop };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Parse the textual form used by requests and storage.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when any part fails to parse or `days` is empty.
    pub fn parse(days: &str, start: &str, stop: &str) -> Result<Self, HubError> {
        Self::new(days.parse()?, start.parse()?, stop.parse()?)
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoScheduleDays`] when `days` is empty.
    pub fn validate(&self) -> Result<(), HubError> {
        if self.days.is_empty() {
            return Err(ValidationError::NoScheduleDays.into());
        }
        Ok(())
    }

    /// Whether the window is open at the given local date and time.
    #[must_use]
    pub fn is_active_at(&self, at: NaiveDateTime) -> bool {
        is_within_window(
            TimeOfDay::from(at.time()),
            self.start,
            self.stop,
            self.days,
            at.weekday(),
        )
    }
}
