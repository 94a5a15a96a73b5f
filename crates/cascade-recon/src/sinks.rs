//! # Notification Sinks
//!
//! Outbound notifications for reward events (user-facing "you earned N
//! points" messages). Delivery is fire-and-forget: a sink failure is the
//! sink's problem, never reconciliation's.

use std::sync::Mutex;

/// A reward event worth telling the user about.
#[derive(Debug, Clone, PartialEq)]
pub enum RewardEvent {
    /// An unverified record was matched and credited.
    RecordMatched {
        user_id: String,
        record_id: String,
        points: i64,
        cashback_cents: i64,
    },
    /// A direct sale was recorded with commission and cashback.
    SaleRecorded {
        user_id: String,
        sale_id: String,
        commission_cents: i64,
        cashback_cents: i64,
    },
}

/// Receives reward events. Implementations must not block for long and
/// must not panic; errors are their own to handle.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: RewardEvent);
}

/// A sink that drops every event (the default for batch drivers that
/// only care about the report).
#[derive(Debug, Default)]
pub struct NoOpNotificationSink;

impl NotificationSink for NoOpNotificationSink {
    fn notify(&self, _event: RewardEvent) {}
}

/// A sink that records events in memory, for tests.
#[derive(Debug, Default)]
pub struct RecordingNotificationSink {
    events: Mutex<Vec<RewardEvent>>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far.
    pub fn events(&self) -> Vec<RewardEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn notify(&self, event: RewardEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
