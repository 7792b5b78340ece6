/// Profile endpoints for the authenticated user
///
/// - `GET /users/me`
/// - `PUT /users/me` with `{ "name"?: ..., "photo_url"?: ... }`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
};
use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use splitease_shared::{
    auth::middleware::AuthContext,
    models::user::{User, UserSummary},
};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    /// Reference to an already uploaded photo
    #[validate(length(max = 255, message = "Photo reference must be at most 255 characters"))]
    pub photo_url: Option<String>,
}

pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserSummary>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserSummary::from(&user)))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<UserSummary>> {
    let req = UpdateProfileRequest {
        name: req.name.map(|n| n.trim().to_string()),
        photo_url: req.photo_url,
    };
    req.validate()?;

    let user = User::update_profile(&state.db, auth.user_id, req.name, req.photo_url)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = user.id, "Profile updated");

    Ok(Json(UserSummary::from(&user)))
}
