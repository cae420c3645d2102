use async_trait::async_trait;
use tracing::info;

use crate::attendance::ports::{EventSink, EventSummary};

/// Publishes attendance updates as structured log records on the
/// `attendance_update` target, where the real-time transport tails them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, summary: EventSummary) -> anyhow::Result<()> {
        let payload = serde_json::to_string(&summary)?;
        info!(
            target: "attendance_update",
            user_id = summary.user_id,
            kind = %summary.kind,
            is_violation = summary.is_violation,
            %payload,
            "attendance-update"
        );
        Ok(())
    }
}
