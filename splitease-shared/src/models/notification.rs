/// Notification model and database operations
///
/// Notifications are created by the notification helper ([`crate::notify`])
/// on behalf of domain events and are exclusively owned by their target user:
/// every query below is scoped by `user_id`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE notification_kind AS ENUM
///     ('invitacion', 'gasto_agregado', 'pago_realizado', 'cambio_saldo');
///
/// CREATE TABLE notifications (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     kind notification_kind NOT NULL,
///     message TEXT NOT NULL,
///     link VARCHAR(255),
///     read BOOLEAN NOT NULL DEFAULT FALSE,
///     sent_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     read_at TIMESTAMPTZ
/// );
/// ```
///
/// # Lifecycle
///
/// Created unread. The only mutation is the unread -> read transition, which
/// stamps `read_at` once. Rows are deleted individually or in bulk (read ones
/// only) by their owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Fixed set of notification kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind")]
pub enum NotificationKind {
    /// Group membership events (joins, welcomes)
    #[sqlx(rename = "invitacion")]
    #[serde(rename = "invitacion")]
    Invitation,

    #[sqlx(rename = "gasto_agregado")]
    #[serde(rename = "gasto_agregado")]
    ExpenseAdded,

    #[sqlx(rename = "pago_realizado")]
    #[serde(rename = "pago_realizado")]
    PaymentMade,

    #[sqlx(rename = "cambio_saldo")]
    #[serde(rename = "cambio_saldo")]
    BalanceChanged,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Invitation => "invitacion",
            NotificationKind::ExpenseAdded => "gasto_agregado",
            NotificationKind::PaymentMade => "pago_realizado",
            NotificationKind::BalanceChanged => "cambio_saldo",
        }
    }
}

/// A stored notification
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub kind: NotificationKind,
    pub message: String,

    /// Client-side path to navigate to, e.g. `/groups/4/expenses/12`
    pub link: Option<String>,

    pub read: bool,
    pub sent_at: DateTime<Utc>,

    /// Set once, when the notification transitions to read
    pub read_at: Option<DateTime<Utc>>,
}

/// Input for inserting a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: i64,
    pub kind: NotificationKind,
    pub message: String,
    pub link: Option<String>,
}

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, message, link, read, sent_at, read_at";

impl Notification {
    pub async fn create(pool: &PgPool, data: NewNotification) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications (user_id, kind, message, link) VALUES ($1, $2, $3, $4) RETURNING {}",
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(data.user_id)
            .bind(data.kind)
            .bind(data.message)
            .bind(data.link)
            .fetch_one(pool)
            .await
    }

    /// Finds a notification owned by `user_id`.
    pub async fn find_for_user(
        pool: &PgPool,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM notifications WHERE id = $1 AND user_id = $2",
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists a user's notifications, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: i64,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {} FROM notifications
            WHERE user_id = $1 AND ($2 = FALSE OR read = FALSE)
            ORDER BY sent_at DESC, id DESC
            LIMIT $3
            "#,
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(unread_only)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Every unread notification of a user, newest first.
    pub async fn list_unread(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM notifications WHERE user_id = $1 AND read = FALSE ORDER BY sent_at DESC, id DESC",
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn count_unread(pool: &PgPool, user_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Marks one notification read.
    ///
    /// `read_at` is only stamped on the unread -> read transition; marking an
    /// already-read notification leaves it untouched. Returns None when the
    /// notification does not exist or belongs to someone else.
    pub async fn mark_read(pool: &PgPool, id: i64, user_id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE notifications
            SET read_at = CASE WHEN read THEN read_at ELSE NOW() END,
                read = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Whether the user has an unread notification of `kind` with exactly
    /// `message`, sent at or after `NOW() - window` on the database clock.
    pub async fn exists_unread_since(
        pool: &PgPool,
        user_id: i64,
        kind: NotificationKind,
        message: &str,
        window: chrono::Duration,
    ) -> Result<bool, sqlx::Error> {
        let window_seconds = window.num_milliseconds() as f64 / 1000.0;

        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM notifications
                WHERE user_id = $1 AND read = FALSE AND kind = $2 AND message = $3
                  AND sent_at >= NOW() - make_interval(secs => $4)
            )
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(message)
        .bind(window_seconds)
        .fetch_one(pool)
        .await
    }

    /// Marks every unread notification of a user read. Returns the count.
    pub async fn mark_all_read(pool: &PgPool, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE, read_at = NOW() WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &PgPool, id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every read notification of a user. Returns the count.
    pub async fn delete_read(pool: &PgPool, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1 AND read = TRUE")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
