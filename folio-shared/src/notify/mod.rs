/// Outbound notifications
///
/// Notifications are fire-and-forget. [`NotificationDispatcher::dispatch`]
/// spawns a delivery task and returns at once; the task outlives the request
/// that started it and retries on its own:
///
/// ```text
/// dispatch(notification)
///   └─> spawned task
///         ├─> acquire in-flight permit
///         ├─> mailer.send()  ── Ok ──> Delivered
///         │        │
///         │       Err ──> sleep(delay) ──> retry, up to max_attempts
///         └─> exhausted ──> error log, Exhausted
/// ```
///
/// Delivery never feeds back into the caller's transaction. Callers that
/// care about the outcome (tests, mostly) can await the returned
/// [`DispatchHandle`]; production callers drop it.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use folio_shared::notify::{LogMailer, Notification, NotificationDispatcher, RetryPolicy};
///
/// # async fn example() {
/// let dispatcher = NotificationDispatcher::new(Arc::new(LogMailer), RetryPolicy::default(), 32);
///
/// let handle = dispatcher.dispatch(Notification::new("a@x.com", "Hello", "Welcome aboard"));
/// let outcome = handle.wait().await;
///
/// dispatcher.shutdown().await;
/// # }
/// ```

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Semaphore};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::models::Profile;

pub mod http;
pub mod mock;

pub use http::{HttpMailer, LogMailer, MailerConfig};
pub use mock::RecordingMailer;

/// Default delivery attempts per notification
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Default cap on concurrently running deliveries
pub const DEFAULT_MAX_IN_FLIGHT: usize = 32;

/// Delivery failures; logged, never returned to workflow callers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Mail endpoint unreachable or timed out
    #[error("Transport error: {0}")]
    Transport(String),

    /// Mail endpoint answered with a failure status
    #[error("Rejected by mail endpoint: {0}")]
    Rejected(String),

    /// Mailer is misconfigured
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Asks a profile owner to complete their profile
    ProfileInvitation,

    /// Tells the inviting admin the profile is done
    ProfileCompleted,

    Other,
}

/// One outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: NotificationKind::Other,
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Invitation sent to the profile's own email
    pub fn profile_invitation(profile: &Profile) -> Self {
        Self {
            kind: NotificationKind::ProfileInvitation,
            ..Self::new(
                profile.email.clone(),
                "Complete your profile",
                format!(
                    "Hi {}, you have been invited to complete your profile. \
                     Sign in with {} to get started.",
                    profile.display_name(),
                    profile.email
                ),
            )
        }
    }

    /// Completion notice sent to the admin who sent the invitation
    pub fn profile_completed(admin_email: &str, profile_id: i64) -> Self {
        Self {
            kind: NotificationKind::ProfileCompleted,
            ..Self::new(
                admin_email,
                "Profile completed",
                format!("Profile {} has been completed and is ready for review.", profile_id),
            )
        }
    }
}

/// Mail transport
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Makes one delivery attempt
    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; never less than 1
    pub max_attempts: u32,

    /// Pause between consecutive attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// A single attempt
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

/// Result of a finished delivery task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    Exhausted { attempts: u32, last_error: DeliveryError },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryOutcome::Delivered { attempts }
            | DeliveryOutcome::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Optional completion signal for a dispatched notification
#[derive(Debug)]
pub struct DispatchHandle {
    notification_id: Uuid,
    outcome: oneshot::Receiver<DeliveryOutcome>,
}

impl DispatchHandle {
    pub fn notification_id(&self) -> Uuid {
        self.notification_id
    }

    /// Waits for the delivery task to finish
    ///
    /// Returns `None` if the task ended without reporting (runtime shut down).
    pub async fn wait(self) -> Option<DeliveryOutcome> {
        self.outcome.await.ok()
    }
}

/// Spawns and tracks delivery tasks
#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
    policy: RetryPolicy,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl NotificationDispatcher {
    /// Creates a dispatcher running at most `max_in_flight` deliveries at once
    pub fn new(mailer: Arc<dyn Mailer>, policy: RetryPolicy, max_in_flight: usize) -> Self {
        Self {
            mailer,
            policy,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            tracker: TaskTracker::new(),
        }
    }

    /// Delivery tasks not yet finished
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Starts delivering `notification` in the background
    ///
    /// Never blocks. Must be called from within a Tokio runtime.
    pub fn dispatch(&self, notification: Notification) -> DispatchHandle {
        let (tx, rx) = oneshot::channel();
        let notification_id = notification.id;

        let mailer = Arc::clone(&self.mailer);
        let permits = Arc::clone(&self.permits);
        let policy = self.policy;

        let span = tracing::info_span!(
            "notification",
            id = %notification_id,
            kind = ?notification.kind,
        );

        self.tracker.spawn(
            async move {
                // The semaphore is never closed, so acquisition only fails on a bug
                let _permit = permits.acquire_owned().await.ok();
                let outcome = deliver(mailer.as_ref(), &notification, policy).await;

                // Receiver dropped means nobody is waiting
                let _ = tx.send(outcome);
            }
            .instrument(span),
        );

        debug!(id = %notification_id, "Notification dispatched");

        DispatchHandle {
            notification_id,
            outcome: rx,
        }
    }

    /// Stops accepting tracked work and waits for in-flight deliveries
    pub async fn shutdown(&self) {
        self.tracker.close();
        info!(in_flight = self.in_flight(), "Waiting for notification deliveries");
        self.tracker.wait().await;
    }
}

/// Delivery loop run inside the spawned task
async fn deliver(
    mailer: &dyn Mailer,
    notification: &Notification,
    policy: RetryPolicy,
) -> DeliveryOutcome {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match mailer.send(notification).await {
            Ok(()) => {
                info!(attempt, recipient = %notification.recipient, "Notification delivered");
                return DeliveryOutcome::Delivered { attempts: attempt };
            }
            Err(e) if attempt >= max_attempts => {
                error!(
                    attempts = attempt,
                    recipient = %notification.recipient,
                    error = %e,
                    "Notification delivery failed, giving up"
                );
                return DeliveryOutcome::Exhausted {
                    attempts: attempt,
                    last_error: e,
                };
            }
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts,
                    error = %e,
                    "Notification delivery failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher(mailer: Arc<RecordingMailer>, policy: RetryPolicy) -> NotificationDispatcher {
        NotificationDispatcher::new(mailer, policy, 4)
    }

    #[test]
    fn test_retry_policy_never_below_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(1)).max_attempts, 1);
        assert_eq!(RetryPolicy::default().max_attempts, 3);
        assert_eq!(RetryPolicy::default().delay, Duration::from_secs(2));
    }

    #[test]
    fn test_notification_builders() {
        let profile = Profile::new(42, "a@x.com").with_name("Ada");
        let invite = Notification::profile_invitation(&profile);
        assert_eq!(invite.kind, NotificationKind::ProfileInvitation);
        assert_eq!(invite.recipient, "a@x.com");
        assert!(invite.body.contains("Ada"));

        let done = Notification::profile_completed("admin@x.com", 42);
        assert_eq!(done.kind, NotificationKind::ProfileCompleted);
        assert_eq!(done.recipient, "admin@x.com");
        assert!(done.body.contains("42"));
    }

    #[tokio::test]
    async fn test_delivers_on_first_attempt() {
        let mailer = Arc::new(RecordingMailer::new());
        let dispatcher = dispatcher(mailer.clone(), RetryPolicy::default());

        let outcome = dispatcher
            .dispatch(Notification::new("a@x.com", "s", "b"))
            .wait()
            .await;

        assert_eq!(outcome, Some(DeliveryOutcome::Delivered { attempts: 1 }));
        assert_eq!(mailer.attempts(), 1);
        assert_eq!(mailer.delivered()[0].recipient, "a@x.com");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_delivers() {
        let mailer = Arc::new(RecordingMailer::failing(2));
        let dispatcher = dispatcher(mailer.clone(), RetryPolicy::new(3, Duration::from_secs(2)));

        let started = tokio::time::Instant::now();
        let outcome = dispatcher
            .dispatch(Notification::new("a@x.com", "s", "b"))
            .wait()
            .await;

        assert_eq!(outcome, Some(DeliveryOutcome::Delivered { attempts: 3 }));
        assert_eq!(mailer.attempts(), 3);
        assert!(started.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_after_max_attempts() {
        let mailer = Arc::new(RecordingMailer::always_failing());
        let dispatcher = dispatcher(
            mailer.clone(),
            RetryPolicy::new(3, Duration::from_millis(500)),
        );

        let outcome = dispatcher
            .dispatch(Notification::new("a@x.com", "s", "b"))
            .wait()
            .await
            .unwrap();

        assert!(!outcome.is_delivered());
        assert_eq!(outcome.attempts(), 3);
        assert!(matches!(
            outcome,
            DeliveryOutcome::Exhausted {
                last_error: DeliveryError::Transport(_),
                ..
            }
        ));
        assert_eq!(mailer.attempts(), 3);
        assert!(mailer.delivered().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_still_delivers() {
        let mailer = Arc::new(RecordingMailer::failing(1));
        let dispatcher = dispatcher(mailer.clone(), RetryPolicy::new(2, Duration::from_secs(1)));

        drop(dispatcher.dispatch(Notification::new("a@x.com", "s", "b")));
        dispatcher.shutdown().await;

        assert_eq!(mailer.attempts(), 2);
        assert_eq!(mailer.delivered().len(), 1);
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_does_not_wait_for_permits() {
        let mailer = Arc::new(RecordingMailer::new());
        let dispatcher = NotificationDispatcher::new(mailer.clone(), RetryPolicy::default(), 1);

        let handles: Vec<_> = (0..5)
            .map(|i| dispatcher.dispatch(Notification::new(format!("u{}@x.com", i), "s", "b")))
            .collect();

        for handle in handles {
            assert!(handle.wait().await.unwrap().is_delivered());
        }
        assert_eq!(mailer.delivered().len(), 5);
    }
}
