/// Group participation model (Group x User join entity)
///
/// # Schema
///
/// ```sql
/// CREATE TYPE participant_role AS ENUM ('administrador', 'miembro');
/// CREATE TYPE participant_status AS ENUM ('activo', 'inactivo');
///
/// CREATE TABLE group_participants (
///     group_id BIGINT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
///     user_id BIGINT NOT NULL REFERENCES users(id),
///     role participant_role NOT NULL DEFAULT 'miembro',
///     status participant_status NOT NULL DEFAULT 'activo',
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (group_id, user_id)
/// );
/// ```
///
/// The primary key allows one row per (group, user), so a user holds at most
/// one active participation per group. Removal is a soft transition
/// `activo -> inactivo`; a later join reactivates the same row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};

/// Role within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "participant_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    /// May remove other participants. The creator always holds this role.
    Administrador,

    Miembro,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantRole::Administrador => "administrador",
            ParticipantRole::Miembro => "miembro",
        }
    }

    pub fn can_remove_others(&self) -> bool {
        matches!(self, ParticipantRole::Administrador)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "participant_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Activo,
    Inactivo,
}

/// A participation row
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Participant {
    #[serde(rename = "id_grupo")]
    pub group_id: i64,

    #[serde(rename = "id_usuario")]
    pub user_id: i64,

    #[serde(rename = "rol")]
    pub role: ParticipantRole,

    #[serde(rename = "estado")]
    pub status: ParticipantStatus,

    #[serde(rename = "fecha_union")]
    pub joined_at: DateTime<Utc>,
}

/// Roster entry: an active participation with the user's name and email
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ParticipantEntry {
    #[serde(rename = "id_usuario")]
    pub user_id: i64,

    #[serde(rename = "nombre")]
    pub name: String,

    pub email: String,

    #[serde(rename = "rol")]
    pub role: ParticipantRole,

    #[serde(rename = "fecha_union")]
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    /// Adds a user to a group as an active participant.
    ///
    /// An existing inactive row for the pair is reactivated with `role`.
    /// Returns None when the user is already an active participant, in which
    /// case nothing changes.
    pub async fn add<'e, E>(
        executor: E,
        group_id: i64,
        user_id: i64,
        role: ParticipantRole,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Participant>(
            r#"
            INSERT INTO group_participants (group_id, user_id, role, status)
            VALUES ($1, $2, $3, 'activo')
            ON CONFLICT (group_id, user_id) DO UPDATE
                SET role = EXCLUDED.role, status = 'activo', joined_at = NOW()
                WHERE group_participants.status = 'inactivo'
            RETURNING group_id, user_id, role, status, joined_at
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(executor)
        .await
    }

    /// Finds the user's active participation in a group.
    pub async fn find_active(
        pool: &PgPool,
        group_id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Participant>(
            r#"
            SELECT group_id, user_id, role, status, joined_at
            FROM group_participants
            WHERE group_id = $1 AND user_id = $2 AND status = 'activo'
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Soft-removes an active participation. Returns false if none matched.
    pub async fn deactivate(pool: &PgPool, group_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE group_participants SET status = 'inactivo'
            WHERE group_id = $1 AND user_id = $2 AND status = 'activo'
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Active roster: administrators first, then members, each tier by name.
    pub async fn list_active(pool: &PgPool, group_id: i64) -> Result<Vec<ParticipantEntry>, sqlx::Error> {
        sqlx::query_as::<_, ParticipantEntry>(
            r#"
            SELECT p.user_id, u.name, u.email, p.role, p.joined_at
            FROM group_participants p
            JOIN users u ON u.id = p.user_id
            WHERE p.group_id = $1 AND p.status = 'activo'
            ORDER BY CASE p.role WHEN 'administrador' THEN 0 ELSE 1 END, u.name ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(pool)
        .await
    }

    /// IDs of every active participant in a group.
    pub async fn active_user_ids(pool: &PgPool, group_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT user_id FROM group_participants
            WHERE group_id = $1 AND status = 'activo'
            ORDER BY user_id
            "#,
        )
        .bind(group_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_as_str() {
        assert_eq!(ParticipantRole::Administrador.as_str(), "administrador");
        assert_eq!(ParticipantRole::Miembro.as_str(), "miembro");
    }

    #[test]
    fn test_only_admins_remove_others() {
        assert!(ParticipantRole::Administrador.can_remove_others());
        assert!(!ParticipantRole::Miembro.can_remove_others());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ParticipantStatus::Inactivo).unwrap(),
            "\"inactivo\""
        );
    }
}
