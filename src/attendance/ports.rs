//! Boundaries between the attendance engine and the rest of the system.
//!
//! The engine never touches a database or transport directly; it receives
//! these traits at construction time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::model::attendance::{AttendanceEvent, EventKind};
use crate::model::location::LocationPoint;
use crate::model::zone::Zone;

/// Immutable set of active zones as read for one request.
pub type ZoneSnapshot = Arc<[Zone]>;

/// Result of a conditional append.
#[derive(Debug, Clone)]
pub struct AppendOutcome {
    /// `false` when an event of the same kind already existed for that day;
    /// `event` is then the stored one.
    pub created: bool,
    pub event: AttendanceEvent,
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Stores `event` unless the user already has one of the same kind on
    /// `day`. Must be atomic with respect to concurrent callers.
    async fn append_event_if_absent(
        &self,
        event: AttendanceEvent,
        day: NaiveDate,
    ) -> Result<AppendOutcome>;

    /// All events of `user_id` on `day`, oldest first.
    async fn find_events_for_day(&self, user_id: u64, day: NaiveDate)
    -> Result<Vec<AttendanceEvent>>;

    /// Events of `user_id` in `[from, to]`, newest first, at most `limit`.
    async fn find_events_between(
        &self,
        user_id: u64,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<AttendanceEvent>>;
}

/// Append-only trail of reported device locations.
#[async_trait]
pub trait LocationTrail: Send + Sync {
    async fn record_location(&self, point: LocationPoint) -> Result<()>;

    /// Points of `user_id` in `[from, to]`, newest first, at most `limit`.
    async fn find_locations_between(
        &self,
        user_id: u64,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<LocationPoint>>;
}

#[async_trait]
pub trait ZoneProvider: Send + Sync {
    /// Active zones that apply to `department`.
    async fn active_zones(&self, department: Option<&str>) -> Result<ZoneSnapshot>;
}

/// Post-commit notification payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub user_id: u64,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub is_violation: bool,
    pub worked_hours: Option<f64>,
}

#[async_trait]
pub trait EventSink: Send + Sync {
    /// Called inline after each commit, so implementations must hand off and
    /// return promptly rather than wait on a slow transport.
    async fn publish(&self, summary: EventSummary) -> anyhow::Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
