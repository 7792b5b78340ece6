/// Expense and expense-share models
///
/// An expense is paid by one participant and split among a set of
/// participants. Each participant's portion is an `expense_shares` row that
/// tracks how much of it has been paid back. Amounts are integer cents.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE expenses (
///     id BIGSERIAL PRIMARY KEY,
///     group_id BIGINT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
///     paid_by BIGINT NOT NULL REFERENCES users(id),
///     description VARCHAR(255) NOT NULL,
///     amount_cents BIGINT NOT NULL CHECK (amount_cents > 0),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE expense_shares (
///     expense_id BIGINT NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
///     user_id BIGINT NOT NULL REFERENCES users(id),
///     amount_cents BIGINT NOT NULL,
///     paid_cents BIGINT NOT NULL DEFAULT 0,
///     PRIMARY KEY (expense_id, user_id),
///     CHECK (paid_cents <= amount_cents)
/// );
/// ```
///
/// # Balances
///
/// A participant's net balance in a group is what others still owe them on
/// expenses they paid, minus what they still owe on expenses others paid.
/// Positive means the group owes them money.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

/// An expense with the payer's display name
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Expense {
    pub id: i64,
    pub group_id: i64,
    pub paid_by: i64,
    pub payer_name: String,
    pub description: String,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// One participant's portion of an expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ExpenseShare {
    pub expense_id: i64,
    pub user_id: i64,
    pub name: String,
    pub amount_cents: i64,
    pub paid_cents: i64,
}

impl ExpenseShare {
    pub fn outstanding_cents(&self) -> i64 {
        self.amount_cents - self.paid_cents
    }

    pub fn is_settled(&self) -> bool {
        self.paid_cents >= self.amount_cents
    }
}

/// Net position of one participant in a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Balance {
    pub user_id: i64,
    pub name: String,

    /// Still owed to this user on expenses they paid
    pub owed_to_user_cents: i64,

    /// Still owed by this user on expenses others paid
    pub owed_by_user_cents: i64,

    pub balance_cents: i64,
}

/// Input for recording an expense
#[derive(Debug, Clone)]
pub struct CreateExpense {
    pub group_id: i64,
    pub paid_by: i64,
    pub description: String,
    pub amount_cents: i64,

    /// Users the expense is split among, in order. Must be non-empty.
    pub participant_ids: Vec<i64>,
}

/// Splits `amount_cents` into `parts` shares that sum to the amount.
///
/// Remainder cents go one each to the first shares.
pub fn split_evenly(amount_cents: i64, parts: usize) -> Vec<i64> {
    if parts == 0 {
        return Vec::new();
    }

    let parts_i = parts as i64;
    let base = amount_cents / parts_i;
    let remainder = amount_cents % parts_i;

    (0..parts_i)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

const SELECT_EXPENSE: &str = r#"
    SELECT e.id, e.group_id, e.paid_by, u.name AS payer_name, e.description,
           e.amount_cents, e.created_at
    FROM expenses e
    JOIN users u ON u.id = e.paid_by
"#;

const BALANCE_QUERY: &str = r#"
    SELECT user_id, name, owed_to_user_cents, owed_by_user_cents,
           owed_to_user_cents - owed_by_user_cents AS balance_cents
    FROM (
        SELECT p.user_id, u.name,
            COALESCE((
                SELECT SUM(s.amount_cents - s.paid_cents)
                FROM expense_shares s
                JOIN expenses e ON e.id = s.expense_id
                WHERE e.group_id = p.group_id AND e.paid_by = p.user_id
                  AND s.user_id <> p.user_id
            ), 0)::BIGINT AS owed_to_user_cents,
            COALESCE((
                SELECT SUM(s.amount_cents - s.paid_cents)
                FROM expense_shares s
                JOIN expenses e ON e.id = s.expense_id
                WHERE e.group_id = p.group_id AND s.user_id = p.user_id
                  AND e.paid_by <> p.user_id
            ), 0)::BIGINT AS owed_by_user_cents
        FROM group_participants p
        JOIN users u ON u.id = p.user_id
        WHERE p.group_id = $1 AND p.status = 'activo'
    ) totals
"#;

impl Expense {
    /// Inserts an expense and its evenly split shares in one transaction.
    ///
    /// The payer's own share (if the payer is among the participants) is
    /// recorded as fully paid.
    pub async fn create_with_shares(
        pool: &PgPool,
        data: CreateExpense,
    ) -> Result<(Self, Vec<ExpenseShare>), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let expense_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO expenses (group_id, paid_by, description, amount_cents)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(data.group_id)
        .bind(data.paid_by)
        .bind(&data.description)
        .bind(data.amount_cents)
        .fetch_one(&mut *tx)
        .await?;

        let amounts = split_evenly(data.amount_cents, data.participant_ids.len());
        for (user_id, amount) in data.participant_ids.iter().zip(amounts) {
            let paid = if *user_id == data.paid_by { amount } else { 0 };

            sqlx::query(
                r#"
                INSERT INTO expense_shares (expense_id, user_id, amount_cents, paid_cents)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(expense_id)
            .bind(*user_id)
            .bind(amount)
            .bind(paid)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let expense = Self::find_in_group(pool, data.group_id, expense_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        let shares = ExpenseShare::list(pool, expense_id).await?;

        Ok((expense, shares))
    }

    /// Finds an expense, scoped to the group it belongs to.
    pub async fn find_in_group(
        pool: &PgPool,
        group_id: i64,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("{} WHERE e.group_id = $1 AND e.id = $2", SELECT_EXPENSE);

        sqlx::query_as::<_, Expense>(&query)
            .bind(group_id)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists a group's expenses, newest first.
    pub async fn list_for_group(pool: &PgPool, group_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "{} WHERE e.group_id = $1 ORDER BY e.created_at DESC, e.id DESC",
            SELECT_EXPENSE
        );

        sqlx::query_as::<_, Expense>(&query)
            .bind(group_id)
            .fetch_all(pool)
            .await
    }
}

impl ExpenseShare {
    pub async fn list(pool: &PgPool, expense_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ExpenseShare>(
            r#"
            SELECT s.expense_id, s.user_id, u.name, s.amount_cents, s.paid_cents
            FROM expense_shares s
            JOIN users u ON u.id = s.user_id
            WHERE s.expense_id = $1
            ORDER BY u.name ASC
            "#,
        )
        .bind(expense_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find(
        pool: &PgPool,
        expense_id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ExpenseShare>(
            r#"
            SELECT s.expense_id, s.user_id, u.name, s.amount_cents, s.paid_cents
            FROM expense_shares s
            JOIN users u ON u.id = s.user_id
            WHERE s.expense_id = $1 AND s.user_id = $2
            "#,
        )
        .bind(expense_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Applies a payment toward a share, capped at what is outstanding.
    ///
    /// Returns None when the share does not exist or is already settled.
    pub async fn record_payment(
        pool: &PgPool,
        expense_id: i64,
        user_id: i64,
        amount_cents: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let updated = sqlx::query(
            r#"
            UPDATE expense_shares
            SET paid_cents = LEAST(amount_cents, paid_cents + $3)
            WHERE expense_id = $1 AND user_id = $2 AND paid_cents < amount_cents
            "#,
        )
        .bind(expense_id)
        .bind(user_id)
        .bind(amount_cents)
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        Self::find(pool, expense_id, user_id).await
    }
}

/// Net balances of every active participant in a group, by name.
pub async fn balances_for_group(pool: &PgPool, group_id: i64) -> Result<Vec<Balance>, sqlx::Error> {
    let query = format!("{} ORDER BY name ASC", BALANCE_QUERY);

    sqlx::query_as::<_, Balance>(&query)
        .bind(group_id)
        .fetch_all(pool)
        .await
}

/// Net balance of one participant in a group (0 when not a participant).
pub async fn balance_for_user(pool: &PgPool, group_id: i64, user_id: i64) -> Result<i64, sqlx::Error> {
    let query = format!("{} WHERE user_id = $2", BALANCE_QUERY);

    let balance = sqlx::query_as::<_, Balance>(&query)
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(balance.map(|b| b.balance_cents).unwrap_or(0))
}
