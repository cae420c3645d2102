use crate::api::attendance::{CheckInRequest, CheckOutRequest, DayQuery, HistoryQuery};
use crate::api::geofence::ValidateLocationRequest;
use crate::api::location::{LocationHistoryQuery, RecordLocationRequest};
use crate::geofence::ValidationResult;
use crate::model::attendance::{Biometric, BiometricType, EventKind};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Geofence Attendance API",
        version = "1.0.0",
        description = r#"
## Geofence-Aware Attendance

Records daily check-in and check-out events and validates each reported
location against the organization's configured work zones.

### Key Features
- **Attendance**
  - One check-in and one check-out per user per calendar day
  - Worked hours and Present / Late / Absent status derived from the ledger
  - History with date range filtering
- **Geofence**
  - Circular zones with a tolerance buffer and polygon zones
  - Restricted zones that always flag a violation
  - Department-scoped zones
- **Location trail**
  - Every check-in and check-out, plus points posted by the device

Locations outside every allowed zone are still recorded, only flagged.

### Security
All endpoints are protected using **JWT Bearer authentication**.
Reading another user's day requires the **Admin** or **HR** role.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::history,
        crate::api::attendance::user_day,

        crate::api::geofence::list_zones,
        crate::api::geofence::get_zone,
        crate::api::geofence::validate_location,

        crate::api::location::record_location,
        crate::api::location::location_history
    ),
    components(
        schemas(
            CheckInRequest,
            CheckOutRequest,
            HistoryQuery,
            DayQuery,
            ValidateLocationRequest,
            RecordLocationRequest,
            LocationHistoryQuery,
            ValidationResult,
            Biometric,
            BiometricType,
            EventKind
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Check-in, check-out and day status APIs"),
        (name = "Geofence", description = "Work zone lookup and location validation APIs"),
        (name = "Location", description = "Location trail APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
