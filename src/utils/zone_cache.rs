use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::attendance::ports::{ZoneProvider, ZoneSnapshot};
use crate::error::Result;

/// Snapshots are per department key; a handful of departments at most.
const MAX_SNAPSHOTS: u64 = 1_024;

/// Serves active zone snapshots from memory for `ttl` before asking the
/// inner provider again. An edited zone shows up on the next refresh.
pub struct CachedZoneProvider {
    inner: Arc<dyn ZoneProvider>,
    cache: Cache<Option<String>, ZoneSnapshot>,
}

impl CachedZoneProvider {
    pub fn new(inner: Arc<dyn ZoneProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(MAX_SNAPSHOTS)
                .time_to_live(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl ZoneProvider for CachedZoneProvider {
    async fn active_zones(&self, department: Option<&str>) -> Result<ZoneSnapshot> {
        self.cache
            .try_get_with(
                department.map(str::to_owned),
                self.inner.active_zones(department),
            )
            .await
            .map_err(|e| (*e).clone())
    }
}
