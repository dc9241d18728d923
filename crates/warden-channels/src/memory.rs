use crate::notifier::{Alert, Notifier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use warden_core::WardenResult;

/// An alert together with the time it was received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedAlert {
    #[serde(flatten)]
    pub alert: Alert,
    pub sent_at: DateTime<Utc>,
}

/// Bounded in-memory activity feed.
///
/// Keeps the most recent `capacity` alerts; older ones are dropped first.
pub struct MemoryNotifier {
    capacity: usize,
    alerts: Mutex<VecDeque<RecordedAlert>>,
}

impl MemoryNotifier {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            alerts: Mutex::new(VecDeque::new()),
        }
    }

    /// All retained alerts, oldest first.
    pub fn recent(&self) -> Vec<RecordedAlert> {
        self.alerts.lock().iter().cloned().collect()
    }

    /// Just the texts of the retained alerts, oldest first.
    pub fn texts(&self) -> Vec<String> {
        self.alerts.lock().iter().map(|r| r.alert.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.lock().is_empty()
    }

    pub fn clear(&self) {
        self.alerts.lock().clear();
    }
}

impl Default for MemoryNotifier {
    fn default() -> Self {
        Self::new(200)
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    fn name(&self) -> &str {
        "memory"
    }

    async fn notify(&self, alert: &Alert) -> WardenResult<bool> {
        let mut alerts = self.alerts.lock();
        if alerts.len() == self.capacity {
            alerts.pop_front();
        }
        alerts.push_back(RecordedAlert {
            alert: alert.clone(),
            sent_at: Utc::now(),
        });
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_in_order() {
        let feed = MemoryNotifier::new(10);
        feed.notify(&Alert::info("first")).await.unwrap();
        feed.notify(&Alert::error("second")).await.unwrap();
        assert_eq!(feed.texts(), vec!["first", "second"]);
        assert_eq!(feed.len(), 2);
    }

    #[tokio::test]
    async fn test_evicts_oldest_at_capacity() {
        let feed = MemoryNotifier::new(2);
        for text in ["a", "b", "c"] {
            feed.notify(&Alert::info(text)).await.unwrap();
        }
        assert_eq!(feed.texts(), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_clear() {
        let feed = MemoryNotifier::default();
        feed.notify(&Alert::info("x")).await.unwrap();
        feed.clear();
        assert!(feed.is_empty());
    }
}
