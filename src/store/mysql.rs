use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool};
use tracing::{debug, error};

use crate::attendance::ports::{
    AppendOutcome, EventRepository, LocationTrail, ZoneProvider, ZoneSnapshot,
};
use crate::error::{AttendanceError, Result};
use crate::geofence::Point;
use crate::model::attendance::{AttendanceEvent, BiometricType, EventKind};
use crate::model::location::LocationPoint;
use crate::model::zone::{ZoneRecord, load_active_zones};

const EVENT_COLUMNS: &str = r#"
    id, user_id, kind, occurred_at, latitude, longitude, accuracy_meters,
    work_zone_id, is_within_zone, is_violation, violation_reason,
    biometric_verified, biometric_type, notes
"#;

/// `attendance_events` row. `(user_id, kind, work_date)` is UNIQUE.
#[derive(FromRow)]
struct EventRow {
    id: String,
    user_id: u64,
    kind: String,
    occurred_at: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    accuracy_meters: Option<f64>,
    work_zone_id: Option<u64>,
    is_within_zone: bool,
    is_violation: bool,
    violation_reason: Option<String>,
    biometric_verified: bool,
    biometric_type: Option<String>,
    notes: Option<String>,
}

impl TryFrom<EventRow> for AttendanceEvent {
    type Error = AttendanceError;

    fn try_from(row: EventRow) -> Result<Self> {
        let corrupt = |what: &str| {
            AttendanceError::Storage(format!("attendance event {}: bad {what}", row.id))
        };

        let kind = EventKind::from_str(&row.kind).map_err(|_| corrupt("kind"))?;
        let location =
            Point::new(row.latitude, row.longitude).map_err(|_| corrupt("coordinates"))?;
        let biometric_type = row
            .biometric_type
            .as_deref()
            .map(BiometricType::from_str)
            .transpose()
            .map_err(|_| corrupt("biometric type"))?;

        Ok(AttendanceEvent {
            id: row.id,
            user_id: row.user_id,
            kind,
            timestamp: row.occurred_at,
            location,
            accuracy_meters: row.accuracy_meters,
            matched_zone_id: row.work_zone_id,
            is_within_zone: row.is_within_zone,
            is_violation: row.is_violation,
            violation_reason: row.violation_reason,
            biometric_verified: row.biometric_verified,
            biometric_type,
            notes: row.notes,
        })
    }
}

/// Only a UNIQUE clash counts; other integrity errors share SQLSTATE 23000.
fn is_duplicate_key(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn into_events(rows: Vec<EventRow>) -> Result<Vec<AttendanceEvent>> {
    rows.into_iter().map(AttendanceEvent::try_from).collect()
}

#[derive(Clone)]
pub struct MySqlEventRepository {
    pool: MySqlPool,
}

impl MySqlEventRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        user_id: u64,
        kind: EventKind,
        day: NaiveDate,
    ) -> Result<Option<AttendanceEvent>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM attendance_events \
             WHERE user_id = ? AND kind = ? AND work_date = ?"
        );
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(user_id)
            .bind(kind.to_string())
            .bind(day)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceEvent::try_from)
            .transpose()
    }
}

#[async_trait]
impl EventRepository for MySqlEventRepository {
    async fn append_event_if_absent(
        &self,
        event: AttendanceEvent,
        day: NaiveDate,
    ) -> Result<AppendOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_events
                (id, user_id, kind, work_date, occurred_at, latitude, longitude,
                 accuracy_meters, work_zone_id, is_within_zone, is_violation,
                 violation_reason, biometric_verified, biometric_type, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.id)
        .bind(event.user_id)
        .bind(event.kind.to_string())
        .bind(day)
        .bind(event.timestamp)
        .bind(event.location.latitude())
        .bind(event.location.longitude())
        .bind(event.accuracy_meters)
        .bind(event.matched_zone_id)
        .bind(event.is_within_zone)
        .bind(event.is_violation)
        .bind(&event.violation_reason)
        .bind(event.biometric_verified)
        .bind(event.biometric_type.map(|b| b.to_string()))
        .bind(&event.notes)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(AppendOutcome {
                created: true,
                event,
            }),
            Err(e) if is_duplicate_key(&e) => {
                debug!(user_id = event.user_id, kind = %event.kind, %day, "Event already exists");
                let existing = self
                    .find_one(event.user_id, event.kind, day)
                    .await?
                    .ok_or_else(|| {
                        AttendanceError::Storage("duplicate key reported but no row found".into())
                    })?;
                Ok(AppendOutcome {
                    created: false,
                    event: existing,
                })
            }
            Err(e) => {
                error!(error = %e, user_id = event.user_id, "Attendance insert failed");
                Err(e.into())
            }
        }
    }

    async fn find_events_for_day(
        &self,
        user_id: u64,
        day: NaiveDate,
    ) -> Result<Vec<AttendanceEvent>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM attendance_events \
             WHERE user_id = ? AND work_date = ? ORDER BY occurred_at ASC"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(user_id)
            .bind(day)
            .fetch_all(&self.pool)
            .await?;
        into_events(rows)
    }

    async fn find_events_between(
        &self,
        user_id: u64,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<AttendanceEvent>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM attendance_events \
             WHERE user_id = ? \
             AND (? IS NULL OR occurred_at >= ?) \
             AND (? IS NULL OR occurred_at <= ?) \
             ORDER BY occurred_at DESC LIMIT ?"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(user_id)
            .bind(from)
            .bind(from)
            .bind(to)
            .bind(to)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        into_events(rows)
    }
}

/// Reads `work_zones`, which the zone-management side owns.
#[derive(Clone)]
pub struct MySqlZoneProvider {
    pool: MySqlPool,
}

impl MySqlZoneProvider {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ZoneProvider for MySqlZoneProvider {
    async fn active_zones(&self, department: Option<&str>) -> Result<ZoneSnapshot> {
        let records = sqlx::query_as::<_, ZoneRecord>(
            r#"
            SELECT id, name, zone_type, center_lat, center_lng, radius_meters,
                   coordinates, is_restricted, buffer_meters, department, is_active
            FROM work_zones
            WHERE is_active = TRUE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(load_active_zones(records)
            .into_iter()
            .filter(|z| z.applies_to(department))
            .collect())
    }
}

/// `location_history` row.
#[derive(FromRow)]
struct LocationRow {
    id: String,
    user_id: u64,
    latitude: f64,
    longitude: f64,
    accuracy_meters: Option<f64>,
    speed_mps: Option<f64>,
    heading_degrees: Option<f64>,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<LocationRow> for LocationPoint {
    type Error = AttendanceError;

    fn try_from(row: LocationRow) -> Result<Self> {
        let location = Point::new(row.latitude, row.longitude).map_err(|_| {
            AttendanceError::Storage(format!("location {}: bad coordinates", row.id))
        })?;
        Ok(LocationPoint {
            id: row.id,
            user_id: row.user_id,
            location,
            accuracy_meters: row.accuracy_meters,
            speed_mps: row.speed_mps,
            heading_degrees: row.heading_degrees,
            timestamp: row.recorded_at,
        })
    }
}

#[derive(Clone)]
pub struct MySqlLocationTrail {
    pool: MySqlPool,
}

impl MySqlLocationTrail {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationTrail for MySqlLocationTrail {
    async fn record_location(&self, point: LocationPoint) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO location_history
                (id, user_id, latitude, longitude, accuracy_meters, speed_mps,
                 heading_degrees, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&point.id)
        .bind(point.user_id)
        .bind(point.location.latitude())
        .bind(point.location.longitude())
        .bind(point.accuracy_meters)
        .bind(point.speed_mps)
        .bind(point.heading_degrees)
        .bind(point.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_locations_between(
        &self,
        user_id: u64,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<LocationPoint>> {
        let rows = sqlx::query_as::<_, LocationRow>(
            r#"
            SELECT id, user_id, latitude, longitude, accuracy_meters, speed_mps,
                   heading_degrees, recorded_at
            FROM location_history
            WHERE user_id = ?
            AND (? IS NULL OR recorded_at >= ?)
            AND (? IS NULL OR recorded_at <= ?)
            ORDER BY recorded_at DESC LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(from)
        .bind(to)
        .bind(to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LocationPoint::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::fmt;

    fn row() -> EventRow {
        EventRow {
            id: "evt-1".into(),
            user_id: 7,
            kind: "check_in".into(),
            occurred_at: Utc.with_ymd_and_hms(2026, 3, 2, 8, 45, 0).unwrap(),
            latitude: 40.7128,
            longitude: -74.0060,
            accuracy_meters: Some(5.0),
            work_zone_id: Some(1),
            is_within_zone: true,
            is_violation: false,
            violation_reason: None,
            biometric_verified: true,
            biometric_type: Some("face".into()),
            notes: None,
        }
    }

    #[test]
    fn row_converts_to_event() {
        let event = AttendanceEvent::try_from(row()).unwrap();
        assert_eq!(event.kind, EventKind::CheckIn);
        assert_eq!(event.matched_zone_id, Some(1));
        assert_eq!(event.biometric_type, Some(BiometricType::Face));
        assert_eq!(event.location.latitude(), 40.7128);
    }

    #[test]
    fn corrupt_rows_are_storage_errors() {
        let bad_kind = EventRow {
            kind: "lunch_break".into(),
            ..row()
        };
        assert_eq!(
            AttendanceEvent::try_from(bad_kind).unwrap_err(),
            AttendanceError::Storage("attendance event evt-1: bad kind".into())
        );

        let bad_coords = EventRow {
            latitude: 95.0,
            ..row()
        };
        assert_eq!(
            AttendanceEvent::try_from(bad_coords).unwrap_err(),
            AttendanceError::Storage("attendance event evt-1: bad coordinates".into())
        );

        let bad_biometric = EventRow {
            biometric_type: Some("retina".into()),
            ..row()
        };
        assert_eq!(
            AttendanceEvent::try_from(bad_biometric).unwrap_err(),
            AttendanceError::Storage("attendance event evt-1: bad biometric type".into())
        );
    }

    /// MySQL reports both of these as SQLSTATE 23000.
    #[derive(Debug)]
    struct FakeDbError {
        unique: bool,
    }

    impl fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "integrity constraint violation")
        }
    }

    impl std::error::Error for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "integrity constraint violation"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23000"))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            if self.unique {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::ForeignKeyViolation
            }
        }
    }

    #[test]
    fn only_unique_clashes_count_as_duplicates() {
        let unique = sqlx::Error::Database(Box::new(FakeDbError { unique: true }));
        let foreign = sqlx::Error::Database(Box::new(FakeDbError { unique: false }));

        assert!(is_duplicate_key(&unique));
        assert!(!is_duplicate_key(&foreign));
        assert!(!is_duplicate_key(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn location_row_with_bad_coordinates_is_rejected() {
        let row = LocationRow {
            id: "loc-1".into(),
            user_id: 7,
            latitude: 0.0,
            longitude: 200.0,
            accuracy_meters: None,
            speed_mps: Some(1.5),
            heading_degrees: Some(90.0),
            recorded_at: Utc.with_ymd_and_hms(2026, 3, 2, 8, 45, 0).unwrap(),
        };
        assert!(LocationPoint::try_from(row).is_err());
    }
}
