//! Shutdown coordination.

use tokio::sync::watch;

/// Process exit outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => Self::SUCCESS,
            ExitStatus::Failure => Self::FAILURE,
        }
    }
}

/// Latch carrying the exit status of the first completed shutdown.
///
/// Unlike a broadcast, late subscribers still observe the published value.
pub struct Shutdown {
    tx: watch::Sender<Option<ExitStatus>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Subscribe to the exit status.
    pub fn subscribe(&self) -> watch::Receiver<Option<ExitStatus>> {
        self.tx.subscribe()
    }

    /// Publish `status`. Only the first call has an effect.
    pub fn trigger(&self, status: ExitStatus) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(status);
            true
        })
    }

    pub fn status(&self) -> Option<ExitStatus> {
        *self.tx.borrow()
    }

    /// Wait until a status has been published.
    pub async fn wait(&self) -> ExitStatus {
        let mut rx = self.subscribe();
        let status = match rx.wait_for(Option::is_some).await {
            Ok(status) => (*status).unwrap_or(ExitStatus::Failure),
            // Unreachable while `self` holds the sender.
            Err(_) => ExitStatus::Failure,
        };
        status
    }

    /// Get the number of active subscribers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_first_trigger_wins() {
        let shutdown = Shutdown::new();
        assert_eq!(shutdown.status(), None);
        assert!(shutdown.trigger(ExitStatus::Failure));
        assert!(!shutdown.trigger(ExitStatus::Success));
        assert_eq!(shutdown.status(), Some(ExitStatus::Failure));
    }

    #[tokio::test]
    async fn test_wait_after_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger(ExitStatus::Success);
        assert_eq!(shutdown.wait().await, ExitStatus::Success);
    }

    #[tokio::test]
    async fn test_wait_before_trigger() {
        let shutdown = Arc::new(Shutdown::new());
        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.trigger(ExitStatus::Failure);

        assert_eq!(waiter.await.unwrap(), ExitStatus::Failure);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitStatus::Success.code(), 0);
        assert_eq!(ExitStatus::Failure.code(), 1);
    }
}
