//! Fakes for engine tests.

use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::attendance::ports::{Clock, EventSink, EventSummary};

/// Clock that only moves when told to.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
pub struct RecordingSink {
    published: Mutex<Vec<EventSummary>>,
}

impl RecordingSink {
    pub fn published(&self) -> Vec<EventSummary> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn publish(&self, summary: EventSummary) -> anyhow::Result<()> {
        self.published.lock().unwrap().push(summary);
        Ok(())
    }
}

pub struct FailingSink;

#[async_trait]
impl EventSink for FailingSink {
    async fn publish(&self, _summary: EventSummary) -> anyhow::Result<()> {
        Err(anyhow!("transport unavailable"))
    }
}
