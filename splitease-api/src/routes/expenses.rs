/// Expense, payment and balance endpoints
///
/// All routes require an active participation in the group. Amounts travel
/// as decimal currency units (`12.5`) and are stored as cents.
///
/// # Endpoints
///
/// - `POST /groups/:id/expenses` - Record an expense split evenly
/// - `GET  /groups/:id/expenses`
/// - `GET  /groups/:id/expenses/:expense_id` - Expense with its shares
/// - `POST /groups/:id/expenses/:expense_id/payments` - Pay toward own share
/// - `GET  /groups/:id/balances`

use std::collections::{BTreeSet, HashMap};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::ApiJson,
    routes::parse_id,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use splitease_shared::{
    auth::{authorization::require_active_participant, middleware::AuthContext},
    models::{
        expense::{balances_for_group, Balance, CreateExpense, Expense, ExpenseShare},
        group::Group,
        participant::Participant,
    },
    notify::{BalanceNotice, FanOutReport, NotificationTemplate},
};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    #[validate(length(min = 1, max = 255, message = "Description is required (at most 255 characters)"))]
    pub description: String,

    /// Currency units, e.g. `45.5`
    pub amount: f64,

    /// Users to split among; the whole active roster when absent
    pub participant_ids: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    /// Currency units
    pub amount: f64,
}

#[derive(Debug, Serialize)]
pub struct ExpenseDetail {
    pub expense: Expense,
    pub shares: Vec<ExpenseShare>,
}

#[derive(Debug, Serialize)]
pub struct CreateExpenseResponse {
    pub expense: Expense,
    pub shares: Vec<ExpenseShare>,
    pub notified: FanOutReport,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub share: ExpenseShare,

    /// What was actually applied after capping at the outstanding amount
    pub applied_cents: i64,
}

/// Converts a positive currency amount to cents.
fn to_cents(amount: f64) -> Option<i64> {
    if !amount.is_finite() || amount <= 0.0 || amount > 1e12 {
        return None;
    }

    let cents = (amount * 100.0).round() as i64;
    (cents > 0).then_some(cents)
}

/// Loads the group and checks the caller may act in it.
async fn authorize(state: &AppState, raw_group_id: &str, user_id: i64) -> ApiResult<Group> {
    let group_id = parse_id(raw_group_id, "group")?;

    let group = Group::find_by_id(&state.db, group_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;
    require_active_participant(&state.db, group_id, user_id).await?;

    Ok(group)
}

async fn balance_map(state: &AppState, group_id: i64) -> ApiResult<HashMap<i64, i64>> {
    Ok(balances_for_group(&state.db, group_id)
        .await?
        .into_iter()
        .map(|b| (b.user_id, b.balance_cents))
        .collect())
}

/// Sends a balance change notice to each of `user_ids` whose balance moved.
///
/// Runs after the change is committed, so failures are logged and never
/// reach the client.
async fn announce_balance_changes(
    state: &AppState,
    group: &Group,
    before: &HashMap<i64, i64>,
    user_ids: &BTreeSet<i64>,
) {
    let after = match balance_map(state, group.id).await {
        Ok(after) => after,
        Err(e) => {
            tracing::warn!(group_id = group.id, error = %e, "Could not reload balances, skipping balance notifications");
            return;
        }
    };
    let notifier = state.notifier();

    for &user_id in user_ids {
        let previous = before.get(&user_id).copied().unwrap_or(0);
        let current = after.get(&user_id).copied().unwrap_or(0);

        match notifier
            .notify_balance_change(user_id, group.id, &group.name, previous, current)
            .await
        {
            Ok(BalanceNotice::NoChange) => {
                tracing::debug!(group_id = group.id, user_id, "Balance unchanged");
            }
            Ok(BalanceNotice::Sent(_)) => {}
            Err(e) => {
                tracing::warn!(group_id = group.id, user_id, error = %e, "Balance notification failed");
            }
        }
    }
}

/// Record an expense paid by the caller
///
/// ```text
/// POST /groups/4/expenses
/// { "description": "Cena", "amount": 45.0, "participantIds": [1, 2, 3] }
/// ```
///
/// Every listed participant must be active in the group. The other
/// participants get an expense notification, then everyone whose balance
/// moved gets a balance notification.
pub async fn create_expense(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CreateExpenseRequest>,
) -> ApiResult<(StatusCode, Json<CreateExpenseResponse>)> {
    let group = authorize(&state, &id, auth.user_id).await?;

    let req = CreateExpenseRequest {
        description: req.description.trim().to_string(),
        ..req
    };
    req.validate()?;

    let amount_cents = to_cents(req.amount).ok_or_else(|| {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(
            "amount",
            "Amount must be a positive number",
        )])
    })?;

    let roster = Participant::active_user_ids(&state.db, group.id).await?;

    let participant_ids: Vec<i64> = match req.participant_ids {
        None => roster.clone(),
        Some(ids) => {
            let mut unique = Vec::with_capacity(ids.len());
            for user_id in ids {
                if !roster.contains(&user_id) {
                    return Err(ApiError::BadRequest(format!(
                        "User {} is not an active participant of this group",
                        user_id
                    )));
                }
                if !unique.contains(&user_id) {
                    unique.push(user_id);
                }
            }
            unique
        }
    };

    if participant_ids.is_empty() {
        return Err(ApiError::BadRequest(
            "An expense needs at least one participant".to_string(),
        ));
    }

    let before = balance_map(&state, group.id).await?;

    let (expense, shares) = Expense::create_with_shares(
        &state.db,
        CreateExpense {
            group_id: group.id,
            paid_by: auth.user_id,
            description: req.description,
            amount_cents,
            participant_ids: participant_ids.clone(),
        },
    )
    .await?;

    tracing::info!(
        group_id = group.id,
        expense_id = expense.id,
        amount_cents,
        participants = participant_ids.len(),
        "Expense recorded"
    );

    let others: Vec<i64> = participant_ids
        .iter()
        .copied()
        .filter(|id| *id != auth.user_id)
        .collect();

    let template = NotificationTemplate::ExpenseAdded {
        group_id: group.id,
        group_name: group.name.clone(),
        expense_id: expense.id,
        payer_name: expense.payer_name.clone(),
        description: expense.description.clone(),
        amount_cents,
    };
    let notified = state.notifier().fan_out(&others, &template).await;

    let affected: BTreeSet<i64> = participant_ids
        .iter()
        .copied()
        .chain(std::iter::once(auth.user_id))
        .collect();
    announce_balance_changes(&state, &group, &before, &affected).await;

    Ok((
        StatusCode::CREATED,
        Json(CreateExpenseResponse {
            expense,
            shares,
            notified,
        }),
    ))
}

pub async fn list_expenses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Expense>>> {
    let group = authorize(&state, &id, auth.user_id).await?;

    let expenses = Expense::list_for_group(&state.db, group.id).await?;
    Ok(Json(expenses))
}

pub async fn get_expense(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, expense_id)): Path<(String, String)>,
) -> ApiResult<Json<ExpenseDetail>> {
    let group = authorize(&state, &id, auth.user_id).await?;
    let expense_id = parse_id(&expense_id, "expense")?;

    let expense = Expense::find_in_group(&state.db, group.id, expense_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Expense not found".to_string()))?;
    let shares = ExpenseShare::list(&state.db, expense.id).await?;

    Ok(Json(ExpenseDetail { expense, shares }))
}

/// Pay toward the caller's own share of an expense
///
/// Payments above what is outstanding are capped. The expense's payer is
/// notified (as a partial payment when something remains), then both sides
/// get a balance notification.
pub async fn record_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, expense_id)): Path<(String, String)>,
    ApiJson(req): ApiJson<PaymentRequest>,
) -> ApiResult<Json<PaymentResponse>> {
    let group = authorize(&state, &id, auth.user_id).await?;
    let expense_id = parse_id(&expense_id, "expense")?;

    let amount_cents = to_cents(req.amount).ok_or_else(|| {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(
            "amount",
            "Amount must be a positive number",
        )])
    })?;

    let expense = Expense::find_in_group(&state.db, group.id, expense_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Expense not found".to_string()))?;

    if expense.paid_by == auth.user_id {
        return Err(ApiError::InvalidOperation(
            "You paid this expense; there is nothing to pay back".to_string(),
        ));
    }

    let share = ExpenseShare::find(&state.db, expense.id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::InvalidOperation("You have no share in this expense".to_string()))?;

    if share.is_settled() {
        return Err(ApiError::InvalidOperation(
            "Your share of this expense is already paid".to_string(),
        ));
    }

    let before = balance_map(&state, group.id).await?;

    let updated = ExpenseShare::record_payment(&state.db, expense.id, auth.user_id, amount_cents)
        .await?
        .ok_or_else(|| {
            ApiError::InvalidOperation("Your share of this expense is already paid".to_string())
        })?;

    let applied_cents = updated.paid_cents - share.paid_cents;

    tracing::info!(
        group_id = group.id,
        expense_id = expense.id,
        user_id = auth.user_id,
        applied_cents,
        "Payment recorded"
    );

    let template = NotificationTemplate::PaymentMade {
        group_id: group.id,
        group_name: group.name.clone(),
        expense_id: expense.id,
        debtor_name: auth.name.clone(),
        amount_cents: applied_cents,
        remaining_cents: updated.outstanding_cents(),
    };
    if let Err(e) = state.notifier().send(expense.paid_by, &template).await {
        tracing::warn!(expense_id = expense.id, error = %e, "Payment notification failed");
    }

    let affected = BTreeSet::from([auth.user_id, expense.paid_by]);
    announce_balance_changes(&state, &group, &before, &affected).await;

    Ok(Json(PaymentResponse {
        share: updated,
        applied_cents,
    }))
}

pub async fn list_balances(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Balance>>> {
    let group = authorize(&state, &id, auth.user_id).await?;

    let balances = balances_for_group(&state.db, group.id).await?;
    Ok(Json(balances))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_cents() {
        assert_eq!(to_cents(45.0), Some(4500));
        assert_eq!(to_cents(12.5), Some(1250));
        assert_eq!(to_cents(0.1 + 0.2), Some(30));
        assert_eq!(to_cents(0.0), None);
        assert_eq!(to_cents(-3.0), None);
        assert_eq!(to_cents(0.001), None);
        assert_eq!(to_cents(f64::NAN), None);
    }

    #[test]
    fn test_create_expense_request_camel_case() {
        let req: CreateExpenseRequest = serde_json::from_str(
            r#"{"description":"Cena","amount":45.5,"participantIds":[1,2]}"#,
        )
        .unwrap();

        assert_eq!(req.participant_ids, Some(vec![1, 2]));
        assert!(req.validate().is_ok());
    }

    #[tokio::test]
    async fn test_balance_reload_failure_is_not_an_error() {
        let state = crate::app::test_support::unreachable_state();
        let group = Group {
            id: 4,
            name: "Trip".to_string(),
            description: String::new(),
            creator_id: 1,
            creator_name: "Ana".to_string(),
            invitation_code: "abc".to_string(),
            status: splitease_shared::models::group::GroupStatus::Activo,
            created_at: chrono::Utc::now(),
        };
        let before = HashMap::from([(1, 0), (2, 0)]);

        // Returns normally; the committed expense stands.
        announce_balance_changes(&state, &group, &before, &BTreeSet::from([1, 2])).await;
    }
}
