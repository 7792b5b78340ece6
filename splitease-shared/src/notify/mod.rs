/// Notification helper
///
/// Every notification the API creates goes through [`Notifier`], which
/// suppresses duplicates and isolates per-recipient failures.
///
/// # De-duplication
///
/// A notification is a duplicate when the recipient already has an *unread*
/// notification with the same kind and the same message sent within the
/// window (5 minutes by default, boundary inclusive). Read notifications
/// never count.
///
/// The window is measured on the store's clock (PostgreSQL's `NOW()` for
/// the pool), the same clock that stamps `sent_at`.
///
/// The check is fail-open: if the lookup fails, the notification is created
/// anyway. Two concurrent creates for the same recipient can both pass the
/// check; nothing at the storage level prevents that.
///
/// # Fan-out
///
/// [`Notifier::fan_out`] renders one template for many recipients. A failure
/// for one recipient is recorded in the [`FanOutReport`] and never aborts the
/// others.
///
/// # Example
///
/// ```no_run
/// use splitease_shared::notify::{NotificationTemplate, Notifier};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let notifier = Notifier::new(pool);
/// let template = NotificationTemplate::MemberJoined {
///     group_id: 4,
///     group_name: "Trip".to_string(),
///     member_name: "Luis".to_string(),
/// };
///
/// let report = notifier.fan_out(&[1, 2, 3], &template).await;
/// println!("{}/{} delivered", report.succeeded, report.total);
/// # Ok(())
/// # }
/// ```

pub mod templates;

pub use templates::{format_currency, NotificationTemplate};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::models::notification::{NewNotification, Notification, NotificationKind};

/// Default de-duplication window in minutes
pub const DEFAULT_DEDUP_MINUTES: i64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Notification store error: {0}")]
    Store(String),
}

/// Storage the helper needs: read a user's unread notifications and insert one.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn list_unread(&self, user_id: i64) -> Result<Vec<Notification>, NotificationError>;

    async fn insert(&self, data: NewNotification) -> Result<Notification, NotificationError>;

    /// Whether an unread notification with this kind and message was sent
    /// within `window`.
    ///
    /// The default measures the window on this process's clock. Stores that
    /// stamp `sent_at` themselves override it to use their own clock.
    async fn has_recent_unread(
        &self,
        user_id: i64,
        kind: NotificationKind,
        message: &str,
        window: Duration,
    ) -> Result<bool, NotificationError> {
        let unread = self.list_unread(user_id).await?;
        Ok(is_duplicate_among(&unread, kind, message, Utc::now(), window))
    }
}

#[async_trait]
impl NotificationStore for PgPool {
    async fn list_unread(&self, user_id: i64) -> Result<Vec<Notification>, NotificationError> {
        Ok(Notification::list_unread(self, user_id).await?)
    }

    // `sent_at` comes from the database's NOW(), so the cutoff does too.
    async fn has_recent_unread(
        &self,
        user_id: i64,
        kind: NotificationKind,
        message: &str,
        window: Duration,
    ) -> Result<bool, NotificationError> {
        Ok(Notification::exists_unread_since(self, user_id, kind, message, window).await?)
    }

    async fn insert(&self, data: NewNotification) -> Result<Notification, NotificationError> {
        Ok(Notification::create(self, data).await?)
    }
}

/// Result of a de-duplicated create
#[derive(Debug, Clone, PartialEq)]
pub enum SafeCreateOutcome {
    Created(Notification),
    Duplicate,
}

impl SafeCreateOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, SafeCreateOutcome::Duplicate)
    }
}

/// One recipient that could not be notified
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanOutFailure {
    pub user_id: i64,
    pub error: String,
}

/// Aggregate outcome of a fan-out
///
/// `succeeded` counts recipients for whom no error occurred, including those
/// whose notification was suppressed as a duplicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FanOutReport {
    pub total: usize,
    pub succeeded: usize,
    pub duplicates: usize,
    pub errors: Vec<FanOutFailure>,
}

/// Outcome of a balance change notification
#[derive(Debug, Clone, PartialEq)]
pub enum BalanceNotice {
    /// Previous and new balance are equal, nothing was sent
    NoChange,
    Sent(SafeCreateOutcome),
}

/// Whether `existing` already holds a notification with this kind and message
/// sent at or after `now - window`.
pub fn is_duplicate_among(
    existing: &[Notification],
    kind: NotificationKind,
    message: &str,
    now: DateTime<Utc>,
    window: Duration,
) -> bool {
    let cutoff = now - window;

    existing
        .iter()
        .filter(|n| !n.read)
        .any(|n| n.kind == kind && n.message == message && n.sent_at >= cutoff)
}

/// Creates notifications with duplicate suppression
#[derive(Debug, Clone)]
pub struct Notifier<S> {
    store: S,
    window: Duration,
}

impl<S: NotificationStore> Notifier<S> {
    /// Notifier with the default 5 minute window.
    pub fn new(store: S) -> Self {
        Self::with_window(store, Duration::minutes(DEFAULT_DEDUP_MINUTES))
    }

    pub fn with_window(store: S, window: Duration) -> Self {
        Self { store, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Checks the recipient's unread notifications for an equal one inside
    /// the window.
    pub async fn check_duplicate(
        &self,
        user_id: i64,
        kind: NotificationKind,
        message: &str,
    ) -> Result<bool, NotificationError> {
        self.store
            .has_recent_unread(user_id, kind, message, self.window)
            .await
    }

    /// Creates a notification unless it is a duplicate.
    ///
    /// A failing duplicate check is logged and the insert proceeds. Only the
    /// insert itself can fail this call.
    pub async fn safe_create(
        &self,
        data: NewNotification,
    ) -> Result<SafeCreateOutcome, NotificationError> {
        match self
            .check_duplicate(data.user_id, data.kind, &data.message)
            .await
        {
            Ok(true) => {
                tracing::debug!(
                    user_id = data.user_id,
                    kind = data.kind.as_str(),
                    "Suppressed duplicate notification"
                );
                return Ok(SafeCreateOutcome::Duplicate);
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(
                    user_id = data.user_id,
                    error = %e,
                    "Duplicate check failed, creating notification anyway"
                );
            }
        }

        let notification = self.store.insert(data).await?;

        tracing::debug!(
            notification_id = notification.id,
            user_id = notification.user_id,
            kind = notification.kind.as_str(),
            "Created notification"
        );

        Ok(SafeCreateOutcome::Created(notification))
    }

    /// Renders `template` for one recipient and creates it.
    pub async fn send(
        &self,
        user_id: i64,
        template: &NotificationTemplate,
    ) -> Result<SafeCreateOutcome, NotificationError> {
        self.safe_create(template.for_user(user_id)).await
    }

    /// Sends `template` to every recipient independently.
    pub async fn fan_out(&self, user_ids: &[i64], template: &NotificationTemplate) -> FanOutReport {
        let results =
            futures::future::join_all(user_ids.iter().map(|&user_id| async move {
                (user_id, self.send(user_id, template).await)
            }))
            .await;

        let mut report = FanOutReport {
            total: user_ids.len(),
            ..Default::default()
        };

        for (user_id, result) in results {
            match result {
                Ok(outcome) => {
                    report.succeeded += 1;
                    if outcome.is_duplicate() {
                        report.duplicates += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "Failed to deliver notification");
                    report.errors.push(FanOutFailure {
                        user_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        if !report.errors.is_empty() {
            tracing::warn!(
                total = report.total,
                failed = report.errors.len(),
                kind = template.kind().as_str(),
                "Notification fan-out partially failed"
            );
        }

        report
    }

    /// Tells `user_id` that their balance in a group moved. Does nothing when
    /// the balance is unchanged.
    pub async fn notify_balance_change(
        &self,
        user_id: i64,
        group_id: i64,
        group_name: &str,
        previous_cents: i64,
        new_cents: i64,
    ) -> Result<BalanceNotice, NotificationError> {
        if previous_cents == new_cents {
            return Ok(BalanceNotice::NoChange);
        }

        let template = NotificationTemplate::BalanceChanged {
            group_id,
            group_name: group_name.to_string(),
            previous_cents,
            new_cents,
        };

        Ok(BalanceNotice::Sent(self.send(user_id, &template).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// In-memory store with switchable failures
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<Notification>>,
        fail_reads: bool,
        fail_inserts_for: HashSet<i64>,
    }

    impl MemoryStore {
        fn seed(&self, user_id: i64, kind: NotificationKind, message: &str, age: Duration, read: bool) {
            let mut rows = self.rows.lock().unwrap();
            let id = rows.len() as i64 + 1;
            rows.push(Notification {
                id,
                user_id,
                kind,
                message: message.to_string(),
                link: None,
                read,
                sent_at: Utc::now() - age,
                read_at: None,
            });
        }

        fn count_for(&self, user_id: i64) -> usize {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .filter(|n| n.user_id == user_id)
                .count()
        }
    }

    #[async_trait]
    impl NotificationStore for MemoryStore {
        async fn list_unread(&self, user_id: i64) -> Result<Vec<Notification>, NotificationError> {
            if self.fail_reads {
                return Err(NotificationError::Store("read failed".to_string()));
            }

            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|n| n.user_id == user_id && !n.read)
                .cloned()
                .collect())
        }

        async fn insert(&self, data: NewNotification) -> Result<Notification, NotificationError> {
            if self.fail_inserts_for.contains(&data.user_id) {
                return Err(NotificationError::Store("insert failed".to_string()));
            }

            let mut rows = self.rows.lock().unwrap();
            let notification = Notification {
                id: rows.len() as i64 + 1,
                user_id: data.user_id,
                kind: data.kind,
                message: data.message,
                link: data.link,
                read: false,
                sent_at: Utc::now(),
                read_at: None,
            };
            rows.push(notification.clone());
            Ok(notification)
        }
    }

    fn new_notification(user_id: i64) -> NewNotification {
        NewNotification {
            user_id,
            kind: NotificationKind::ExpenseAdded,
            message: "Ana agregó el gasto \"Cena\" por $45.00 en \"Trip\"".to_string(),
            link: Some("/groups/4/expenses/12".to_string()),
        }
    }

    fn joined() -> NotificationTemplate {
        NotificationTemplate::MemberJoined {
            group_id: 4,
            group_name: "Trip".to_string(),
            member_name: "Luis".to_string(),
        }
    }

    fn stored(kind: NotificationKind, message: &str, sent_at: DateTime<Utc>, read: bool) -> Notification {
        Notification {
            id: 1,
            user_id: 1,
            kind,
            message: message.to_string(),
            link: None,
            read,
            sent_at,
            read_at: None,
        }
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let now = Utc::now();
        let window = Duration::minutes(5);
        let at_edge = [stored(NotificationKind::Invitation, "hola", now - window, false)];
        let past_edge = [stored(
            NotificationKind::Invitation,
            "hola",
            now - window - Duration::seconds(1),
            false,
        )];

        assert!(is_duplicate_among(&at_edge, NotificationKind::Invitation, "hola", now, window));
        assert!(!is_duplicate_among(&past_edge, NotificationKind::Invitation, "hola", now, window));
    }

    #[test]
    fn test_kind_and_message_must_both_match() {
        let now = Utc::now();
        let window = Duration::minutes(5);
        let existing = [stored(NotificationKind::Invitation, "hola", now, false)];

        assert!(!is_duplicate_among(&existing, NotificationKind::PaymentMade, "hola", now, window));
        assert!(!is_duplicate_among(&existing, NotificationKind::Invitation, "adiós", now, window));
    }

    #[test]
    fn test_read_notifications_never_count() {
        let now = Utc::now();
        let existing = [stored(NotificationKind::Invitation, "hola", now, true)];
        assert!(!is_duplicate_among(
            &existing,
            NotificationKind::Invitation,
            "hola",
            now,
            Duration::minutes(5)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_within_window_is_suppressed() {
        let notifier = Notifier::new(MemoryStore::default());

        let first = notifier.safe_create(new_notification(1)).await.unwrap();
        let second = notifier.safe_create(new_notification(1)).await.unwrap();

        assert!(matches!(first, SafeCreateOutcome::Created(_)));
        assert_eq!(second, SafeCreateOutcome::Duplicate);
        assert_eq!(notifier.store.count_for(1), 1);
    }

    #[tokio::test]
    async fn test_same_message_for_other_user_is_not_duplicate() {
        let notifier = Notifier::new(MemoryStore::default());

        notifier.safe_create(new_notification(1)).await.unwrap();
        let other = notifier.safe_create(new_notification(2)).await.unwrap();

        assert!(!other.is_duplicate());
    }

    #[tokio::test]
    async fn test_old_notification_does_not_block() {
        let store = MemoryStore::default();
        let data = new_notification(1);
        store.seed(1, data.kind, &data.message, Duration::minutes(6), false);

        let notifier = Notifier::new(store);
        let outcome = notifier.safe_create(data).await.unwrap();

        assert!(matches!(outcome, SafeCreateOutcome::Created(_)));
        assert_eq!(notifier.store.count_for(1), 2);
    }

    #[tokio::test]
    async fn test_custom_window() {
        let store = MemoryStore::default();
        let data = new_notification(1);
        store.seed(1, data.kind, &data.message, Duration::minutes(6), false);

        let notifier = Notifier::with_window(store, Duration::minutes(10));
        assert!(notifier
            .check_duplicate(1, data.kind, &data.message)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_failed_check_creates_anyway() {
        let store = MemoryStore {
            fail_reads: true,
            ..Default::default()
        };
        let notifier = Notifier::new(store);

        assert!(notifier
            .check_duplicate(1, NotificationKind::ExpenseAdded, "x")
            .await
            .is_err());

        let outcome = notifier.safe_create(new_notification(1)).await.unwrap();
        assert!(matches!(outcome, SafeCreateOutcome::Created(_)));
        assert_eq!(notifier.store.count_for(1), 1);
    }

    #[tokio::test]
    async fn test_fan_out_isolates_failures() {
        let store = MemoryStore {
            fail_inserts_for: HashSet::from([3]),
            ..Default::default()
        };
        let notifier = Notifier::new(store);

        let report = notifier.fan_out(&[1, 2, 3, 4], &joined()).await;

        assert_eq!(report.total, 4);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.duplicates, 0);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].user_id, 3);
        assert_eq!(notifier.store.count_for(1), 1);
        assert_eq!(notifier.store.count_for(4), 1);
    }

    #[tokio::test]
    async fn test_fan_out_counts_duplicates_as_success() {
        let notifier = Notifier::new(MemoryStore::default());

        notifier.fan_out(&[1, 2], &joined()).await;
        let report = notifier.fan_out(&[1, 2], &joined()).await;

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.duplicates, 2);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn test_fan_out_to_nobody() {
        let notifier = Notifier::new(MemoryStore::default());
        let report = notifier.fan_out(&[], &joined()).await;
        assert_eq!(report, FanOutReport::default());
    }

    #[tokio::test]
    async fn test_unchanged_balance_sends_nothing() {
        let notifier = Notifier::new(MemoryStore::default());

        let notice = notifier
            .notify_balance_change(1, 4, "Trip", 1500, 1500)
            .await
            .unwrap();

        assert_eq!(notice, BalanceNotice::NoChange);
        assert_eq!(notifier.store.count_for(1), 0);
    }

    #[tokio::test]
    async fn test_changed_balance_is_sent() {
        let notifier = Notifier::new(MemoryStore::default());

        let notice = notifier
            .notify_balance_change(1, 4, "Trip", 0, -1500)
            .await
            .unwrap();

        match notice {
            BalanceNotice::Sent(SafeCreateOutcome::Created(n)) => {
                assert_eq!(n.kind, NotificationKind::BalanceChanged);
                assert_eq!(n.link.as_deref(), Some("/groups/4/balances"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
