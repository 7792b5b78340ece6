/// Notification endpoints
///
/// Every query is scoped to the caller: another user's notification is
/// indistinguishable from a missing one (404).
///
/// # Endpoints
///
/// - `GET    /notifications?unread=true&limit=50`
/// - `POST   /notifications` - Create one for yourself (de-duplicated)
/// - `GET    /notifications/unread-count`
/// - `GET    /notifications/stream` - Server-Sent Events
/// - `PUT    /notifications/read-all`
/// - `DELETE /notifications/read` - Delete every read notification
/// - `GET    /notifications/:id`
/// - `PUT    /notifications/:id/read`
/// - `DELETE /notifications/:id`
///
/// # Stream
///
/// ```text
/// : connected
///
/// data: [{"id":12,"user_id":3,"kind":"gasto_agregado",...}]
/// ```
///
/// The stream polls the caller's unread notifications every poll period and
/// sends one `data:` frame with those not yet sent on this connection. A
/// browser `EventSource` cannot set headers, so the token may be passed as
/// `?token=`.

use std::convert::Infallible;
use std::time::Duration;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    routes::parse_id,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use futures::{
    future,
    stream::{self, Stream, StreamExt},
};
use serde::{Deserialize, Serialize};
use splitease_shared::{
    auth::middleware::AuthContext,
    models::notification::{NewNotification, Notification, NotificationKind},
    notify::SafeCreateOutcome,
    stream::poll_unread,
};
use validator::Validate;

/// Default and maximum page size for listing
const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub unread: bool,

    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNotificationRequest {
    pub kind: NotificationKind,

    #[validate(length(min = 1, max = 1000, message = "Message is required (at most 1000 characters)"))]
    pub message: String,

    #[validate(length(max = 255, message = "Link must be at most 255 characters"))]
    pub link: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CreateNotificationResponse {
    Created {
        created: bool,
        notification: Notification,
    },
    Duplicate {
        #[serde(rename = "isDuplicate")]
        is_duplicate: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct BulkResponse {
    /// Rows affected
    pub count: u64,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let notifications =
        Notification::list_for_user(&state.db, auth.user_id, query.unread, limit).await?;

    Ok(Json(notifications))
}

/// Creates a notification for the caller through the de-duplicating helper.
///
/// `201` with the notification, or `200 {"isDuplicate": true}` when an
/// identical unread one was sent within the window.
pub async fn create_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateNotificationRequest>,
) -> ApiResult<(StatusCode, Json<CreateNotificationResponse>)> {
    req.validate()?;

    let outcome = state
        .notifier()
        .safe_create(NewNotification {
            user_id: auth.user_id,
            kind: req.kind,
            message: req.message,
            link: req.link,
        })
        .await?;

    Ok(match outcome {
        SafeCreateOutcome::Created(notification) => (
            StatusCode::CREATED,
            Json(CreateNotificationResponse::Created {
                created: true,
                notification,
            }),
        ),
        SafeCreateOutcome::Duplicate => (
            StatusCode::OK,
            Json(CreateNotificationResponse::Duplicate { is_duplicate: true }),
        ),
    })
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UnreadCountResponse>> {
    let count = Notification::count_unread(&state.db, auth.user_id).await?;
    Ok(Json(UnreadCountResponse { count }))
}

pub async fn get_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Notification>> {
    let id = parse_id(&id, "notification")?;

    let notification = Notification::find_for_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))?;

    Ok(Json(notification))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Notification>> {
    let id = parse_id(&id, "notification")?;

    let notification = Notification::mark_read(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))?;

    Ok(Json(notification))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<BulkResponse>> {
    let count = Notification::mark_all_read(&state.db, auth.user_id).await?;

    tracing::debug!(user_id = auth.user_id, count, "Marked notifications read");

    Ok(Json(BulkResponse { count }))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, "notification")?;

    if !Notification::delete(&state.db, id, auth.user_id).await? {
        return Err(ApiError::NotFound("Notification not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<BulkResponse>> {
    let count = Notification::delete_read(&state.db, auth.user_id).await?;

    tracing::debug!(user_id = auth.user_id, count, "Deleted read notifications");

    Ok(Json(BulkResponse { count }))
}

/// One `data:` event per notification, each carrying the JSON object.
fn notification_events(user_id: i64, batch: Vec<Notification>) -> Vec<Result<Event, Infallible>> {
    batch
        .iter()
        .filter_map(|notification| match Event::default().json_data(notification) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::error!(user_id, notification_id = notification.id, error = %e, "Failed to encode notification");
                None
            }
        })
        .collect()
}

/// Stream unread notifications as Server-Sent Events
///
/// Opens with a `: connected` comment. Afterwards each poll sends one event
/// per notification this connection has not delivered yet. When the client
/// goes away axum drops the stream and with it the poll timer.
pub async fn stream_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!(user_id = auth.user_id, "Notification stream opened");

    let user_id = auth.user_id;
    let connected = stream::once(future::ready(Ok(Event::default().comment("connected"))));

    let updates = poll_unread(state.db.clone(), user_id, state.poll_period())
        .flat_map(move |batch| stream::iter(notification_events(user_id, batch)));

    Sse::new(connected.chain(updates)).keep_alive(KeepAlive::new().interval(Duration::from_secs(25)))
}
