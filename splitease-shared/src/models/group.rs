/// Group model and database operations
///
/// A group is created by a user, who becomes both its creator and its first
/// participant (see [`crate::models::participant`]). Deleting a group is a
/// soft delete: `status` flips to `inactivo` and every lookup below ignores
/// inactive groups.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE group_status AS ENUM ('activo', 'inactivo');
///
/// CREATE TABLE groups (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(100) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     creator_id BIGINT NOT NULL REFERENCES users(id),
///     invitation_code VARCHAR(32) NOT NULL,
///     status group_status NOT NULL DEFAULT 'activo',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Wire format
///
/// Groups serialize with the field names the web client expects:
/// `id_grupo`, `nombre_grupo`, `descripcion`, `id_creador`, `nombre_creador`,
/// `codigo_invitacion`, `estado`, `fecha_creacion`.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};

/// Length of generated invitation codes
pub const INVITATION_CODE_LENGTH: usize = 20;

/// Soft-delete flag on a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "group_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    Activo,
    Inactivo,
}

/// A group row with its creator's display name attached
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Group {
    #[serde(rename = "id_grupo")]
    pub id: i64,

    #[serde(rename = "nombre_grupo")]
    pub name: String,

    #[serde(rename = "descripcion")]
    pub description: String,

    #[serde(rename = "id_creador")]
    pub creator_id: i64,

    #[serde(rename = "nombre_creador")]
    pub creator_name: String,

    /// Shareable token for self-service joins
    #[serde(rename = "codigo_invitacion")]
    pub invitation_code: String,

    #[serde(rename = "estado")]
    pub status: GroupStatus,

    #[serde(rename = "fecha_creacion")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a group
#[derive(Debug, Clone)]
pub struct CreateGroup {
    pub name: String,
    pub description: String,
    pub creator_id: i64,
    pub invitation_code: String,
}

/// Generates a random alphanumeric invitation code.
///
/// Codes are not checked for uniqueness; with 62^20 possibilities a
/// collision is possible in principle but not handled.
pub fn generate_invitation_code() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..INVITATION_CODE_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

const SELECT_GROUP: &str = r#"
    SELECT g.id, g.name, g.description, g.creator_id, u.name AS creator_name,
           g.invitation_code, g.status, g.created_at
    FROM groups g
    JOIN users u ON u.id = g.creator_id
"#;

impl Group {
    /// Inserts a group row.
    ///
    /// Accepts any executor so the caller can run it inside the same
    /// transaction as the creator's participation insert.
    pub async fn create<'e, E>(executor: E, data: CreateGroup) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Group>(
            r#"
            WITH inserted AS (
                INSERT INTO groups (name, description, creator_id, invitation_code)
                VALUES ($1, $2, $3, $4)
                RETURNING id, name, description, creator_id, invitation_code, status, created_at
            )
            SELECT i.id, i.name, i.description, i.creator_id, u.name AS creator_name,
                   i.invitation_code, i.status, i.created_at
            FROM inserted i
            JOIN users u ON u.id = i.creator_id
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.creator_id)
        .bind(data.invitation_code)
        .fetch_one(executor)
        .await
    }

    /// Finds an active group by ID.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("{} WHERE g.id = $1 AND g.status = 'activo'", SELECT_GROUP);

        sqlx::query_as::<_, Group>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds an active group by exact invitation code match.
    ///
    /// If two active groups share a code the oldest one wins.
    pub async fn find_active_by_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "{} WHERE g.invitation_code = $1 AND g.status = 'activo' ORDER BY g.id LIMIT 1",
            SELECT_GROUP
        );

        sqlx::query_as::<_, Group>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// Lists active groups where the user holds an active participation.
    pub async fn list_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            {}
            JOIN group_participants p ON p.group_id = g.id
            WHERE p.user_id = $1 AND p.status = 'activo' AND g.status = 'activo'
            ORDER BY g.created_at DESC
            "#,
            SELECT_GROUP
        );

        sqlx::query_as::<_, Group>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Renames a group and replaces its description.
    ///
    /// Returns None when no active group matched (zero rows affected).
    pub async fn update(
        pool: &PgPool,
        id: i64,
        name: &str,
        description: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let updated = sqlx::query(
            r#"
            UPDATE groups SET name = $2, description = $3
            WHERE id = $1 AND status = 'activo'
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        Self::find_by_id(pool, id).await
    }

    /// Soft-deletes a group. Returns false when no active group matched.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE groups SET status = 'inactivo' WHERE id = $1 AND status = 'activo'",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invitation_code_shape() {
        let code = generate_invitation_code();
        assert_eq!(code.len(), INVITATION_CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_invitation_codes_differ() {
        assert_ne!(generate_invitation_code(), generate_invitation_code());
    }

    #[test]
    fn test_group_wire_names() {
        let group = Group {
            id: 3,
            name: "Trip".to_string(),
            description: "Beach weekend".to_string(),
            creator_id: 1,
            creator_name: "Ana".to_string(),
            invitation_code: "abcDEF1234567890ghij".to_string(),
            status: GroupStatus::Activo,
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&group).unwrap();
        assert_eq!(value["id_grupo"], 3);
        assert_eq!(value["nombre_grupo"], "Trip");
        assert_eq!(value["codigo_invitacion"], "abcDEF1234567890ghij");
        assert_eq!(value["nombre_creador"], "Ana");
        assert_eq!(value["estado"], "activo");
    }
}
