//! Attendance state machine.
//!
//! Per user and calendar day the ledger moves `NoRecord -> CheckedIn ->
//! CheckedOut`. Each transition appends exactly one event; location problems
//! are recorded on the event as a violation instead of rejecting it.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::attendance::ports::{
    Clock, EventRepository, EventSink, EventSummary, LocationTrail, SystemClock, ZoneProvider,
    ZoneSnapshot,
};
use crate::error::{AttendanceError, Result};
use crate::geofence::{Point, ValidationResult, resolve};
use crate::model::attendance::{
    AttendanceEvent, AttendancePolicy, Biometric, DayAttendance, EventKind, worked_hours,
};
use crate::model::location::{LocationPoint, Motion};

/// Where the device says it is, and how sure it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationReading {
    pub location: Point,
    pub accuracy_meters: Option<f64>,
    pub biometric: Option<Biometric>,
}

impl LocationReading {
    pub fn new(
        location: Point,
        accuracy_meters: Option<f64>,
        biometric: Option<Biometric>,
    ) -> Result<Self> {
        if let Some(accuracy) = accuracy_meters {
            if !accuracy.is_finite() || accuracy < 0.0 {
                return Err(AttendanceError::InvalidRequest(format!(
                    "accuracy must be a non-negative number of meters, got {accuracy}"
                )));
            }
        }
        Ok(Self {
            location,
            accuracy_meters,
            biometric,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckIn {
    pub user_id: u64,
    /// Scopes the zone set; `None` sees only unscoped zones.
    pub department: Option<String>,
    pub reading: LocationReading,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOut {
    pub user_id: u64,
    pub department: Option<String>,
    pub reading: LocationReading,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckInOutcome {
    pub attendance: AttendanceEvent,
    pub location_validation: ValidationResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckOutOutcome {
    pub attendance: AttendanceEvent,
    pub worked_hours: f64,
    pub location_validation: ValidationResult,
}

pub struct AttendanceEngine {
    events: Arc<dyn EventRepository>,
    zones: Arc<dyn ZoneProvider>,
    trail: Arc<dyn LocationTrail>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    policy: AttendancePolicy,
}

impl AttendanceEngine {
    pub fn new(
        events: Arc<dyn EventRepository>,
        zones: Arc<dyn ZoneProvider>,
        trail: Arc<dyn LocationTrail>,
        sink: Arc<dyn EventSink>,
        policy: AttendancePolicy,
    ) -> Self {
        Self {
            events,
            zones,
            trail,
            sink,
            clock: Arc::new(SystemClock),
            policy,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &AttendancePolicy {
        &self.policy
    }

    pub fn today(&self) -> NaiveDate {
        self.policy.work_date(self.clock.now())
    }

    pub async fn active_zones(&self, department: Option<&str>) -> Result<ZoneSnapshot> {
        self.zones.active_zones(department).await
    }

    /// Resolves a location against the caller's zone set without recording
    /// anything.
    #[instrument(skip(self))]
    pub async fn validate_location(
        &self,
        location: Point,
        department: Option<&str>,
    ) -> Result<ValidationResult> {
        let zones = self.zones.active_zones(department).await?;
        Ok(resolve(location, &zones))
    }

    #[instrument(name = "attendance_check_in", skip(self, cmd), fields(user_id = cmd.user_id))]
    pub async fn check_in(&self, cmd: CheckIn) -> Result<CheckInOutcome> {
        let now = self.clock.now();
        let day = self.policy.work_date(now);

        let existing = self.events.find_events_for_day(cmd.user_id, day).await?;
        if existing.iter().any(|e| e.kind == EventKind::CheckIn) {
            info!(%day, "Duplicate check-in rejected");
            return Err(AttendanceError::AlreadyCheckedIn);
        }

        let validation = self
            .validate_location(cmd.reading.location, cmd.department.as_deref())
            .await?;
        let event = new_event(cmd.user_id, EventKind::CheckIn, now, &cmd.reading, &validation, None);

        let outcome = self.events.append_event_if_absent(event, day).await?;
        if !outcome.created {
            info!(%day, "Concurrent check-in lost the race");
            return Err(AttendanceError::AlreadyCheckedIn);
        }

        info!(
            event_id = %outcome.event.id,
            zone_id = ?outcome.event.matched_zone_id,
            is_violation = outcome.event.is_violation,
            "Check-in recorded"
        );
        self.leave_trail(cmd.user_id, &cmd.reading, now).await;
        self.notify(&outcome.event, None).await;

        Ok(CheckInOutcome {
            attendance: outcome.event,
            location_validation: validation,
        })
    }

    #[instrument(name = "attendance_check_out", skip(self, cmd), fields(user_id = cmd.user_id))]
    pub async fn check_out(&self, cmd: CheckOut) -> Result<CheckOutOutcome> {
        let now = self.clock.now();
        let day = self.policy.work_date(now);

        let existing = self.events.find_events_for_day(cmd.user_id, day).await?;
        let check_in = existing
            .iter()
            .find(|e| e.kind == EventKind::CheckIn)
            .ok_or(AttendanceError::NoCheckInToday)?;
        if existing.iter().any(|e| e.kind == EventKind::CheckOut) {
            info!(%day, "Duplicate check-out rejected");
            return Err(AttendanceError::AlreadyCheckedOut);
        }

        let hours = worked_hours(check_in.timestamp, now).ok_or_else(|| {
            warn!(
                check_in_at = %check_in.timestamp,
                check_out_at = %now,
                "Check-out precedes check-in"
            );
            AttendanceError::InvalidTimeOrdering
        })?;

        let validation = self
            .validate_location(cmd.reading.location, cmd.department.as_deref())
            .await?;
        let reading = cmd.reading;
        let event = new_event(
            cmd.user_id,
            EventKind::CheckOut,
            now,
            &reading,
            &validation,
            cmd.notes,
        );

        let outcome = self.events.append_event_if_absent(event, day).await?;
        if !outcome.created {
            info!(%day, "Concurrent check-out lost the race");
            return Err(AttendanceError::AlreadyCheckedOut);
        }

        info!(
            event_id = %outcome.event.id,
            worked_hours = hours,
            is_violation = outcome.event.is_violation,
            "Check-out recorded"
        );
        self.leave_trail(cmd.user_id, &reading, now).await;
        self.notify(&outcome.event, Some(hours)).await;

        Ok(CheckOutOutcome {
            attendance: outcome.event,
            worked_hours: hours,
            location_validation: validation,
        })
    }

    /// The derived day view for `user_id`; `date` defaults to today.
    pub async fn day_attendance(
        &self,
        user_id: u64,
        date: Option<NaiveDate>,
    ) -> Result<DayAttendance> {
        let date = date.unwrap_or_else(|| self.today());
        let events = self.events.find_events_for_day(user_id, date).await?;
        Ok(DayAttendance::derive(user_id, date, &events, &self.policy))
    }

    pub async fn history(
        &self,
        user_id: u64,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<AttendanceEvent>> {
        check_range(from, to)?;
        self.events
            .find_events_between(user_id, from, to, limit)
            .await
    }

    /// Appends a tracking point outside the check-in/check-out flow.
    #[instrument(skip(self, reading))]
    pub async fn record_location(
        &self,
        user_id: u64,
        reading: LocationReading,
        motion: Motion,
    ) -> Result<LocationPoint> {
        let point = new_point(user_id, &reading, motion, self.clock.now());
        self.trail.record_location(point.clone()).await?;
        Ok(point)
    }

    pub async fn location_history(
        &self,
        user_id: u64,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<LocationPoint>> {
        check_range(from, to)?;
        self.trail
            .find_locations_between(user_id, from, to, limit)
            .await
    }

    // runs after the commit; failures are logged, not returned
    async fn leave_trail(&self, user_id: u64, reading: &LocationReading, at: DateTime<Utc>) {
        let point = new_point(user_id, reading, Motion::default(), at);
        if let Err(e) = self.trail.record_location(point).await {
            warn!(error = %e, user_id, "Failed to record location trail point");
        }
    }

    async fn notify(&self, event: &AttendanceEvent, worked_hours: Option<f64>) {
        let summary = EventSummary {
            user_id: event.user_id,
            kind: event.kind,
            timestamp: event.timestamp,
            is_violation: event.is_violation,
            worked_hours,
        };

        if let Err(e) = self.sink.publish(summary).await {
            warn!(error = %e, user_id = event.user_id, "Failed to publish attendance update");
        }
    }
}

fn check_range(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Result<()> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(AttendanceError::InvalidRequest(
            "start_date cannot be after end_date".into(),
        )),
        _ => Ok(()),
    }
}

fn new_point(
    user_id: u64,
    reading: &LocationReading,
    motion: Motion,
    timestamp: DateTime<Utc>,
) -> LocationPoint {
    LocationPoint {
        id: Uuid::new_v4().to_string(),
        user_id,
        location: reading.location,
        accuracy_meters: reading.accuracy_meters,
        speed_mps: motion.speed_mps,
        heading_degrees: motion.heading_degrees,
        timestamp,
    }
}

fn new_event(
    user_id: u64,
    kind: EventKind,
    timestamp: DateTime<Utc>,
    reading: &LocationReading,
    validation: &ValidationResult,
    notes: Option<String>,
) -> AttendanceEvent {
    AttendanceEvent {
        id: Uuid::new_v4().to_string(),
        user_id,
        kind,
        timestamp,
        location: reading.location,
        accuracy_meters: reading.accuracy_meters,
        // the resolver only names a zone for an allowed match
        matched_zone_id: validation.matched_zone_id,
        is_within_zone: validation.is_valid,
        is_violation: validation.is_violation(),
        violation_reason: validation.violation_reason.clone(),
        biometric_verified: reading.biometric.is_some_and(|b| b.verified),
        biometric_type: reading.biometric.map(|b| b.biometric_type),
        notes,
    }
}
