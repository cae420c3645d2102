use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::geofence::Point;
use crate::model::zone::ZoneId;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    CheckIn,
    CheckOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BiometricType {
    Fingerprint,
    Face,
}

/// Biometric attestation reported by the device alongside a check-in/out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Biometric {
    pub biometric_type: BiometricType,
    pub verified: bool,
}

/// One entry of the append-only attendance ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceEvent {
    pub id: String,
    pub user_id: u64,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub location: Point,
    pub accuracy_meters: Option<f64>,
    pub matched_zone_id: Option<ZoneId>,
    pub is_within_zone: bool,
    pub is_violation: bool,
    pub violation_reason: Option<String>,
    pub biometric_verified: bool,
    pub biometric_type: Option<BiometricType>,
    pub notes: Option<String>,
}

/// UTC offsets change in 15-minute multiples.
const DST_SEARCH_STEP_MINUTES: i64 = 15;
const DST_SEARCH_STEPS: i64 = 24 * 60 / DST_SEARCH_STEP_MINUTES;

/// Rules that turn instants into calendar days and a day into a status.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttendancePolicy {
    pub timezone: Tz,
    /// A check-in whose local hour is strictly greater than this is late.
    pub late_cutoff_hour: u32,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            late_cutoff_hour: 9,
        }
    }
}

impl AttendancePolicy {
    pub fn work_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.timezone).date_naive()
    }

    pub fn local_hour(&self, at: DateTime<Utc>) -> u32 {
        at.with_timezone(&self.timezone).hour()
    }

    /// First instant of `date` in the policy timezone. When a DST jump skips
    /// midnight this is the first local time that exists on `date`.
    pub fn day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::default());
        (0..DST_SEARCH_STEPS)
            .map(|step| midnight + chrono::Duration::minutes(step * DST_SEARCH_STEP_MINUTES))
            .find_map(|local| self.timezone.from_local_datetime(&local).earliest())
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }

    /// Last instant of `date` in the policy timezone.
    pub fn day_end(&self, date: NaiveDate) -> DateTime<Utc> {
        match date.succ_opt() {
            Some(next) => self.day_start(next) - chrono::Duration::milliseconds(1),
            None => DateTime::<Utc>::MAX_UTC,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DayStatus {
    Present,
    Late,
    Absent,
    /// Reserved; nothing currently derives it.
    EarlyDeparture,
}

/// A user's day, recomputed from the ledger on every read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayAttendance {
    pub user_id: u64,
    pub date: NaiveDate,
    pub check_in: Option<AttendanceEvent>,
    pub check_out: Option<AttendanceEvent>,
    pub worked_hours: Option<f64>,
    pub status: DayStatus,
}

impl DayAttendance {
    pub fn derive(
        user_id: u64,
        date: NaiveDate,
        events: &[AttendanceEvent],
        policy: &AttendancePolicy,
    ) -> Self {
        let first = |kind: EventKind| {
            events
                .iter()
                .filter(|e| e.kind == kind)
                .min_by_key(|e| e.timestamp)
                .cloned()
        };
        let check_in = first(EventKind::CheckIn);
        let check_out = first(EventKind::CheckOut);

        let worked_hours = match (&check_in, &check_out) {
            (Some(i), Some(o)) => worked_hours(i.timestamp, o.timestamp),
            _ => None,
        };

        let status = match &check_in {
            None => DayStatus::Absent,
            Some(e) if policy.local_hour(e.timestamp) > policy.late_cutoff_hour => DayStatus::Late,
            Some(_) => DayStatus::Present,
        };

        Self {
            user_id,
            date,
            check_in,
            check_out,
            worked_hours,
            status,
        }
    }

    pub fn is_checked_in(&self) -> bool {
        self.check_in.is_some() && self.check_out.is_none()
    }
}

/// Elapsed hours between two instants, `None` when `end` precedes `start`.
pub fn worked_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<f64> {
    let millis = (end - start).num_milliseconds();
    (millis >= 0).then(|| millis as f64 / 3_600_000.0)
}
