/// Database models for SplitEase
///
/// Each model exposes its queries as associated async functions taking a
/// `&PgPool` (or any executor where a caller needs a transaction).
///
/// # Models
///
/// - `user`: Accounts and profiles
/// - `group`: Groups, invitation codes, soft delete
/// - `participant`: Group membership with role and active/inactive status
/// - `notification`: Per-user notifications with read tracking
/// - `expense`: Expenses, per-participant shares and balances
///
/// # Example
///
/// ```no_run
/// use splitease_shared::models::group::Group;
/// use splitease_shared::models::participant::Participant;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// for group in Group::list_for_user(&pool, 1).await? {
///     let roster = Participant::list_active(&pool, group.id).await?;
///     println!("{}: {} participants", group.name, roster.len());
/// }
/// # Ok(())
/// # }
/// ```

pub mod expense;
pub mod group;
pub mod notification;
pub mod participant;
pub mod user;
