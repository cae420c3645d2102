//! In-memory adapters for the engine ports. Test use only.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::attendance::ports::{
    AppendOutcome, EventRepository, LocationTrail, ZoneProvider, ZoneSnapshot,
};
use crate::error::{AttendanceError, Result};
use crate::model::attendance::{AttendanceEvent, EventKind};
use crate::model::location::LocationPoint;
use crate::model::zone::Zone;

type DayKey = (u64, EventKind, NaiveDate);

#[derive(Clone, Default)]
pub struct InMemoryEventRepository {
    events: Arc<Mutex<HashMap<DayKey, AttendanceEvent>>>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<DayKey, AttendanceEvent>>> {
        self.events
            .lock()
            .map_err(|_| AttendanceError::Storage("event store poisoned".into()))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|events| events.len()).unwrap_or(0)
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn append_event_if_absent(
        &self,
        event: AttendanceEvent,
        day: NaiveDate,
    ) -> Result<AppendOutcome> {
        let mut events = self.lock()?;
        let key = (event.user_id, event.kind, day);

        if let Some(existing) = events.get(&key) {
            return Ok(AppendOutcome {
                created: false,
                event: existing.clone(),
            });
        }

        events.insert(key, event.clone());
        Ok(AppendOutcome {
            created: true,
            event,
        })
    }

    async fn find_events_for_day(
        &self,
        user_id: u64,
        day: NaiveDate,
    ) -> Result<Vec<AttendanceEvent>> {
        let mut found: Vec<_> = self
            .lock()?
            .iter()
            .filter(|((user, _, d), _)| *user == user_id && *d == day)
            .map(|(_, e)| e.clone())
            .collect();
        found.sort_by_key(|e| e.timestamp);
        Ok(found)
    }

    async fn find_events_between(
        &self,
        user_id: u64,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<AttendanceEvent>> {
        let mut found: Vec<_> = self
            .lock()?
            .values()
            .filter(|e| e.user_id == user_id)
            .filter(|e| from.is_none_or(|f| e.timestamp >= f))
            .filter(|e| to.is_none_or(|t| e.timestamp <= t))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        found.truncate(limit as usize);
        Ok(found)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryZoneProvider {
    zones: Arc<Mutex<Vec<Zone>>>,
}

impl InMemoryZoneProvider {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self {
            zones: Arc::new(Mutex::new(zones)),
        }
    }

    /// Swaps in a new zone set; snapshots already handed out are unaffected.
    pub fn replace(&self, zones: Vec<Zone>) {
        if let Ok(mut current) = self.zones.lock() {
            *current = zones;
        }
    }
}

#[async_trait]
impl ZoneProvider for InMemoryZoneProvider {
    async fn active_zones(&self, department: Option<&str>) -> Result<ZoneSnapshot> {
        let zones = self
            .zones
            .lock()
            .map_err(|_| AttendanceError::Storage("zone store poisoned".into()))?;
        Ok(zones
            .iter()
            .filter(|z| z.applies_to(department))
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryLocationTrail {
    points: Arc<Mutex<Vec<LocationPoint>>>,
}

impl InMemoryLocationTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.lock().map(|points| points.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LocationTrail for InMemoryLocationTrail {
    async fn record_location(&self, point: LocationPoint) -> Result<()> {
        self.points
            .lock()
            .map_err(|_| AttendanceError::Storage("location trail poisoned".into()))?
            .push(point);
        Ok(())
    }

    async fn find_locations_between(
        &self,
        user_id: u64,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<LocationPoint>> {
        let mut found: Vec<_> = self
            .points
            .lock()
            .map_err(|_| AttendanceError::Storage("location trail poisoned".into()))?
            .iter()
            .filter(|p| p.user_id == user_id)
            .filter(|p| from.is_none_or(|f| p.timestamp >= f))
            .filter(|p| to.is_none_or(|t| p.timestamp <= t))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        found.truncate(limit as usize);
        Ok(found)
    }
}
