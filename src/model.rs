use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::EngineError;
use crate::limits::MAX_DURATION_MINUTES;

/// Naive local timestamp. No timezone conversion anywhere in the crate.
pub type Timestamp = NaiveDateTime;

/// Calendar day used to key "this day's" snapshot.
pub type DayKey = NaiveDate;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Span {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Open-interval overlap: spans that only touch at an endpoint don't overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Timestamp) -> bool {
        self.start <= t && t < self.end
    }
}

/// A booking-shaped time range: start plus a positive duration in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: Timestamp,
    pub duration_minutes: u32,
}

impl TimeInterval {
    pub fn new(start: Timestamp, duration_minutes: u32) -> Self {
        debug_assert!(duration_minutes > 0, "TimeInterval duration must be positive");
        Self {
            start,
            duration_minutes,
        }
    }

    /// Boundary constructor: rejects malformed durations before they reach the engine.
    pub fn try_new(start: Timestamp, duration_minutes: i64) -> Result<Self, EngineError> {
        if duration_minutes <= 0 {
            return Err(EngineError::InvalidInput("duration must be positive"));
        }
        if duration_minutes > MAX_DURATION_MINUTES {
            return Err(EngineError::LimitExceeded("duration longer than a day"));
        }
        Ok(Self::new(start, duration_minutes as u32))
    }

    /// Parse `YYYY-MM-DDTHH:MM[:SS]` plus a duration.
    pub fn parse(start: &str, duration_minutes: i64) -> Result<Self, EngineError> {
        let start = parse_timestamp(start)?;
        Self::try_new(start, duration_minutes)
    }

    pub fn end(&self) -> Timestamp {
        self.start + Duration::minutes(self.duration_minutes as i64)
    }

    pub fn span(&self) -> Span {
        Span::new(self.start, self.end())
    }

    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.span().overlaps(&other.span())
    }

    pub fn day(&self) -> DayKey {
        self.start.date()
    }
}

pub fn parse_timestamp(s: &str) -> Result<Timestamp, EngineError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|_| EngineError::InvalidInput("unparseable timestamp"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    Paid,
    Completed,
    NoShow,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Paid => "paid",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::NoShow => "no-show",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Ulid,
    pub client_id: Ulid,
    pub service_id: Ulid,
    pub interval: TimeInterval,
    pub status: AppointmentStatus,
}

impl Appointment {
    pub fn scheduled(client_id: Ulid, service_id: Ulid, interval: TimeInterval) -> Self {
        Self {
            id: Ulid::new(),
            client_id,
            service_id,
            interval,
            status: AppointmentStatus::Scheduled,
        }
    }

    pub fn apply(&mut self, patch: &AppointmentPatch) {
        if let Some(client_id) = patch.client_id {
            self.client_id = client_id;
        }
        if let Some(service_id) = patch.service_id {
            self.service_id = service_id;
        }
        if let Some(interval) = patch.interval {
            self.interval = interval;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

/// Partial update handed to the write sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentPatch {
    pub client_id: Option<Ulid>,
    pub service_id: Option<Ulid>,
    pub interval: Option<TimeInterval>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentPatch {
    pub fn status(status: AppointmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// A manually closed period (lunch break, training, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleBlock {
    pub id: Ulid,
    pub reason: String,
    pub interval: TimeInterval,
}

/// Visible hour range of the day grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DayWindowHours")]
pub struct DayWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

#[derive(Deserialize)]
struct DayWindowHours {
    start_hour: u32,
    end_hour: u32,
}

impl TryFrom<DayWindowHours> for DayWindow {
    type Error = EngineError;

    fn try_from(h: DayWindowHours) -> Result<Self, Self::Error> {
        DayWindow::new(h.start_hour, h.end_hour)
    }
}

impl DayWindow {
    pub fn new(start_hour: u32, end_hour: u32) -> Result<Self, EngineError> {
        if start_hour >= end_hour || end_hour > 24 {
            return Err(EngineError::InvalidInput("day window must satisfy 0 <= start < end <= 24"));
        }
        Ok(Self {
            start_hour,
            end_hour,
        })
    }

    pub fn hours(&self) -> u32 {
        self.end_hour - self.start_hour
    }
}

impl Default for DayWindow {
    fn default() -> Self {
        Self {
            start_hour: 7,
            end_hour: 22,
        }
    }
}

/// Opening hours for one weekday (0 = Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayHours {
    pub weekday: u8,
    pub active: bool,
    #[serde(with = "hhmm")]
    pub open: NaiveTime,
    #[serde(with = "hhmm")]
    pub close: NaiveTime,
}

impl WeekdayHours {
    pub fn parse(weekday: u8, active: bool, open: &str, close: &str) -> Result<Self, EngineError> {
        Ok(Self {
            weekday,
            active,
            open: hhmm::parse(open)?,
            close: hhmm::parse(close)?,
        })
    }

    pub fn closed(weekday: u8) -> Self {
        Self {
            weekday,
            active: false,
            open: NaiveTime::MIN,
            close: NaiveTime::MIN,
        }
    }
}

/// One entry per calendar weekday, indexed Sunday-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<WeekdayHours>", into = "Vec<WeekdayHours>")]
pub struct WeeklySchedule {
    days: [WeekdayHours; 7],
}

impl WeeklySchedule {
    pub fn new(days: Vec<WeekdayHours>) -> Result<Self, EngineError> {
        let days: [WeekdayHours; 7] = days
            .try_into()
            .map_err(|_| EngineError::InvalidInput("weekly schedule needs exactly 7 entries"))?;
        for (idx, day) in days.iter().enumerate() {
            if day.weekday as usize != idx {
                return Err(EngineError::InvalidInput("weekly schedule must be ordered Sunday..Saturday"));
            }
            if day.active && day.open >= day.close {
                return Err(EngineError::InvalidInput("active weekday must open before it closes"));
            }
        }
        Ok(Self { days })
    }

    /// Same opening hours on `weekdays`, closed on the others.
    pub fn uniform(weekdays: &[u8], open: NaiveTime, close: NaiveTime) -> Result<Self, EngineError> {
        let days = (0..7u8)
            .map(|weekday| {
                if weekdays.contains(&weekday) {
                    WeekdayHours {
                        weekday,
                        active: true,
                        open,
                        close,
                    }
                } else {
                    WeekdayHours::closed(weekday)
                }
            })
            .collect();
        Self::new(days)
    }

    pub fn for_date(&self, date: NaiveDate) -> &WeekdayHours {
        &self.days[date.weekday().num_days_from_sunday() as usize]
    }

    pub fn days(&self) -> &[WeekdayHours; 7] {
        &self.days
    }
}

impl TryFrom<Vec<WeekdayHours>> for WeeklySchedule {
    type Error = EngineError;

    fn try_from(days: Vec<WeekdayHours>) -> Result<Self, Self::Error> {
        Self::new(days)
    }
}

impl From<WeeklySchedule> for Vec<WeekdayHours> {
    fn from(schedule: WeeklySchedule) -> Self {
        schedule.days.to_vec()
    }
}

/// Zero-padded `HH:MM` (de)serialization for `NaiveTime`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::engine::EngineError;

    pub fn parse(s: &str) -> Result<NaiveTime, EngineError> {
        NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| EngineError::InvalidInput("expected HH:MM"))
    }

    pub fn serialize<S: Serializer>(t: &NaiveTime, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(de)?;
        parse(&s).map_err(serde::de::Error::custom)
    }
}

// ── Layout types ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    Appointment,
    Block,
}

/// Anything that occupies a lane on the day grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutItem {
    pub id: Ulid,
    pub kind: ItemKind,
    pub interval: TimeInterval,
}

impl From<&Appointment> for LayoutItem {
    fn from(a: &Appointment) -> Self {
        Self {
            id: a.id,
            kind: ItemKind::Appointment,
            interval: a.interval,
        }
    }
}

impl From<&ScheduleBlock> for LayoutItem {
    fn from(b: &ScheduleBlock) -> Self {
        Self {
            id: b.id,
            kind: ItemKind::Block,
            interval: b.interval,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutColumnInfo {
    pub column: usize,
    pub total_columns: usize,
}

/// Renderable placement of one item. Ephemeral: recomputed every pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutDescriptor {
    pub item_id: Ulid,
    pub kind: ItemKind,
    pub column: usize,
    pub total_columns: usize,
    pub top_offset: f64,
    pub height: f64,
    pub left_offset: f64,
    pub width: f64,
}

/// Change notifications published per day by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayEvent {
    AppointmentCreated { id: Ulid },
    AppointmentUpdated { id: Ulid },
    BlockAdded { id: Ulid },
    BlockRemoved { id: Ulid },
}
