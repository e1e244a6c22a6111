/// Recording mailer for tests
///
/// Counts every attempt, keeps every delivered notification, and fails
/// according to a script so retry behaviour can be tested deterministically.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{DeliveryError, Mailer, Notification};

#[derive(Debug, Default)]
pub struct RecordingMailer {
    /// Results returned before falling back to `fail_forever`
    script: Mutex<VecDeque<Result<(), DeliveryError>>>,
    fail_forever: bool,
    attempts: AtomicU32,
    delivered: Mutex<Vec<Notification>>,
}

impl RecordingMailer {
    /// Delivers everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the first `failures` attempts with a transport error
    pub fn failing(failures: usize) -> Self {
        Self::scripted(
            (0..failures)
                .map(|i| Err(DeliveryError::Transport(format!("scripted failure {}", i + 1))))
                .collect(),
        )
    }

    /// Fails every attempt
    pub fn always_failing() -> Self {
        Self {
            fail_forever: true,
            ..Self::default()
        }
    }

    /// Plays back `script`, then delivers
    pub fn scripted(script: Vec<Result<(), DeliveryError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Attempts made so far, successful or not
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Notifications delivered so far
    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let result = match scripted {
            Some(result) => result,
            None if self.fail_forever => {
                Err(DeliveryError::Transport("mail relay unreachable".to_string()))
            }
            None => Ok(()),
        };

        if result.is_ok() {
            self.delivered
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(notification.clone());
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_success() {
        let mailer = RecordingMailer::scripted(vec![Err(DeliveryError::Rejected("503".into()))]);
        let notification = Notification::new("a@x.com", "s", "b");

        assert!(mailer.send(&notification).await.is_err());
        assert!(mailer.send(&notification).await.is_ok());
        assert_eq!(mailer.attempts(), 2);
        assert_eq!(mailer.delivered(), vec![notification]);
    }

    #[tokio::test]
    async fn test_always_failing() {
        let mailer = RecordingMailer::always_failing();
        let notification = Notification::new("a@x.com", "s", "b");

        for _ in 0..3 {
            assert!(mailer.send(&notification).await.is_err());
        }
        assert!(mailer.delivered().is_empty());
    }
}
