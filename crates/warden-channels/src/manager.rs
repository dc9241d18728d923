use crate::notifier::{Alert, Notifier};
use async_trait::async_trait;
use std::sync::Arc;
use warden_core::{WardenError, WardenResult};

/// Fans an alert out to several notifiers.
///
/// The alert counts as delivered if any notifier delivered it. An error is
/// returned only when every notifier failed.
#[derive(Default)]
pub struct NotifierManager {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotifierManager {
    pub fn new() -> Self {
        Self {
            notifiers: Vec::new(),
        }
    }

    /// Add a notifier to the manager.
    pub fn add(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Builder-style variant of [`NotifierManager::add`].
    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.add(notifier);
        self
    }

    /// List all registered notifier names.
    pub fn names(&self) -> Vec<&str> {
        self.notifiers.iter().map(|n| n.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

#[async_trait]
impl Notifier for NotifierManager {
    fn name(&self) -> &str {
        "manager"
    }

    async fn notify(&self, alert: &Alert) -> WardenResult<bool> {
        let mut delivered = false;
        let mut errors = Vec::new();
        for notifier in &self.notifiers {
            match notifier.notify(alert).await {
                Ok(sent) => delivered |= sent,
                Err(e) => {
                    tracing::warn!(notifier = %notifier.name(), error = %e, "Notifier failed");
                    errors.push(format!("{}: {e}", notifier.name()));
                }
            }
        }

        if !errors.is_empty() && errors.len() == self.notifiers.len() {
            return Err(WardenError::Notification(errors.join("; ")));
        }
        Ok(delivered)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::memory::MemoryNotifier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock notifier that counts calls and can be told to fail.
    struct MockNotifier {
        name: String,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl MockNotifier {
        fn new(name: &str, fail: bool) -> Self {
            Self {
                name: name.to_string(),
                calls: Arc::new(AtomicUsize::new(0)),
                fail,
            }
        }
    }

    #[async_trait]
    impl Notifier for MockNotifier {
        fn name(&self) -> &str {
            &self.name
        }

        async fn notify(&self, _alert: &Alert) -> WardenResult<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(WardenError::Notification("unreachable".into()))
            } else {
                Ok(true)
            }
        }
    }

    #[test]
    fn test_add_and_names() {
        let mgr = NotifierManager::new()
            .with(Arc::new(MockNotifier::new("slack", false)))
            .with(Arc::new(MemoryNotifier::new(5)));
        assert_eq!(mgr.len(), 2);
        assert_eq!(mgr.names(), vec!["slack", "memory"]);
    }

    #[tokio::test]
    async fn test_fan_out_reaches_every_notifier() {
        let m1 = MockNotifier::new("a", false);
        let c1 = m1.calls.clone();
        let m2 = MockNotifier::new("b", false);
        let c2 = m2.calls.clone();
        let mgr = NotifierManager::new().with(Arc::new(m1)).with(Arc::new(m2));

        assert!(mgr.notify(&Alert::info("hi")).await.unwrap());
        assert_eq!(c1.load(Ordering::SeqCst), 1);
        assert_eq!(c2.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_partial_failure_still_delivers() {
        let feed = Arc::new(MemoryNotifier::new(5));
        let mgr = NotifierManager::new()
            .with(Arc::new(MockNotifier::new("down", true)))
            .with(feed.clone());

        assert!(mgr.notify(&Alert::info("hi")).await.unwrap());
        assert_eq!(feed.len(), 1);
    }

    #[tokio::test]
    async fn test_all_failed_is_error() {
        let mgr = NotifierManager::new()
            .with(Arc::new(MockNotifier::new("a", true)))
            .with(Arc::new(MockNotifier::new("b", true)));
        let err = mgr.notify(&Alert::info("hi")).await.unwrap_err();
        assert!(matches!(err, WardenError::Notification(_)));
    }

    #[tokio::test]
    async fn test_empty_manager_delivers_nothing() {
        let mgr = NotifierManager::new();
        assert!(!mgr.notify(&Alert::info("hi")).await.unwrap());
    }
}
