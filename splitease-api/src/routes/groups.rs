/// Group endpoints
///
/// Groups are visible to their active participants only. Any active
/// participant may rename a group; only administrators remove others; only
/// the creator deletes the group; nobody removes the creator.
///
/// # Endpoints
///
/// - `POST   /groups` - Create a group (caller becomes its administrator)
/// - `GET    /groups` - Groups the caller actively participates in
/// - `POST   /groups/join` - Join with an invitation code
/// - `GET    /groups/:id`
/// - `PUT    /groups/:id`
/// - `DELETE /groups/:id` - Soft delete, creator only
/// - `GET    /groups/:id/participants` - Administrators first, then by name
/// - `DELETE /groups/:id/participants/:user_id` - Soft removal or self-leave
///
/// Existence is checked before membership, so a missing group is a 404 for
/// everyone and an existing one is a 403 for outsiders.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
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
    auth::{
        authorization::{check_participant_removal, require_active_participant, require_creator},
        middleware::AuthContext,
    },
    models::{
        group::{generate_invitation_code, CreateGroup, Group},
        participant::{Participant, ParticipantEntry, ParticipantRole},
    },
    notify::{FanOutReport, NotificationTemplate},
};
use validator::Validate;

/// Create or update request
#[derive(Debug, Deserialize, Validate)]
pub struct GroupRequest {
    #[serde(alias = "nombre_grupo")]
    #[validate(length(min = 1, max = 100, message = "Group name is required (at most 100 characters)"))]
    pub name: String,

    #[serde(default, alias = "descripcion")]
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

impl GroupRequest {
    fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            description: self.description.map(|d| d.trim().to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JoinGroupRequest {
    #[serde(rename = "invitationCode", alias = "codigo_invitacion")]
    pub invitation_code: String,
}

/// Join response
#[derive(Debug, Serialize)]
pub struct JoinGroupResponse {
    pub group: Group,

    pub participant: Participant,

    /// Outcome of announcing the new member to the rest of the group
    pub notified: FanOutReport,
}

async fn find_group(state: &AppState, group_id: i64) -> ApiResult<Group> {
    Group::find_by_id(&state.db, group_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))
}

/// Create a group
///
/// The group row and the creator's administrator participation are inserted
/// in one transaction.
///
/// ```text
/// POST /groups
/// { "name": "Trip", "description": "Beach weekend" }
/// ```
pub async fn create_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<GroupRequest>,
) -> ApiResult<(StatusCode, Json<Group>)> {
    let req = req.normalized();
    req.validate()?;

    let mut tx = state.db.begin().await?;

    let group = Group::create(
        &mut *tx,
        CreateGroup {
            name: req.name,
            description: req.description.unwrap_or_default(),
            creator_id: auth.user_id,
            invitation_code: generate_invitation_code(),
        },
    )
    .await?;

    Participant::add(&mut *tx, group.id, auth.user_id, ParticipantRole::Administrador)
        .await?
        .ok_or_else(|| ApiError::InternalError("Creator participation was not inserted".to_string()))?;

    tx.commit().await?;

    tracing::info!(group_id = group.id, user_id = auth.user_id, "Group created");

    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Group>>> {
    let groups = Group::list_for_user(&state.db, auth.user_id).await?;
    Ok(Json(groups))
}

pub async fn get_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Group>> {
    let group_id = parse_id(&id, "group")?;

    let group = find_group(&state, group_id).await?;
    require_active_participant(&state.db, group_id, auth.user_id).await?;

    Ok(Json(group))
}

/// Update name and description. Any active participant may do this.
pub async fn update_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<GroupRequest>,
) -> ApiResult<Json<Group>> {
    let group_id = parse_id(&id, "group")?;
    let req = req.normalized();
    req.validate()?;

    let current = find_group(&state, group_id).await?;
    require_active_participant(&state.db, group_id, auth.user_id).await?;

    let description = req.description.unwrap_or(current.description);
    let group = Group::update(&state.db, group_id, &req.name, &description)
        .await?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    tracing::info!(group_id, user_id = auth.user_id, "Group updated");

    Ok(Json(group))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let group_id = parse_id(&id, "group")?;

    let group = find_group(&state, group_id).await?;
    require_creator(&group, auth.user_id)?;

    if !Group::delete(&state.db, group_id).await? {
        return Err(ApiError::NotFound("Group not found".to_string()));
    }

    tracing::info!(group_id, user_id = auth.user_id, "Group deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_participants(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ParticipantEntry>>> {
    let group_id = parse_id(&id, "group")?;

    find_group(&state, group_id).await?;
    require_active_participant(&state.db, group_id, auth.user_id).await?;

    let roster = Participant::list_active(&state.db, group_id).await?;
    Ok(Json(roster))
}

/// Remove a participant (soft) or leave the group
///
/// - creator as target: 400, whoever asks
/// - member removing someone else: 403
/// - target not an active participant: 404
pub async fn remove_participant(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, user_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let group_id = parse_id(&id, "group")?;
    let target_user_id = parse_id(&user_id, "user")?;

    let group = find_group(&state, group_id).await?;
    let requester = require_active_participant(&state.db, group_id, auth.user_id).await?;

    check_participant_removal(&requester, target_user_id, group.creator_id)?;

    if !Participant::deactivate(&state.db, group_id, target_user_id).await? {
        return Err(ApiError::NotFound("Participant not found".to_string()));
    }

    tracing::info!(
        group_id,
        target_user_id,
        removed_by = auth.user_id,
        "Participant removed"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Welcomes a new member and tells the rest of the group about them.
///
/// The join is already committed when this runs, so failures are logged and
/// only show up as a smaller report.
async fn welcome_and_announce(state: &AppState, group: &Group, member: &AuthContext) -> FanOutReport {
    let notifier = state.notifier();

    let welcome = NotificationTemplate::WelcomeToGroup {
        group_id: group.id,
        group_name: group.name.clone(),
    };
    if let Err(e) = notifier.send(member.user_id, &welcome).await {
        tracing::warn!(group_id = group.id, user_id = member.user_id, error = %e, "Welcome notification failed");
    }

    let roster = match Participant::active_user_ids(&state.db, group.id).await {
        Ok(roster) => roster,
        Err(e) => {
            tracing::warn!(group_id = group.id, error = %e, "Could not load roster to announce new member");
            return FanOutReport::default();
        }
    };

    let others: Vec<i64> = roster.into_iter().filter(|id| *id != member.user_id).collect();
    let announcement = NotificationTemplate::MemberJoined {
        group_id: group.id,
        group_name: group.name.clone(),
        member_name: member.name.clone(),
    };

    notifier.fan_out(&others, &announcement).await
}

/// Join a group by invitation code
///
/// ```text
/// POST /groups/join
/// { "invitationCode": "aZ3..." }
/// ```
///
/// After the join the new member gets a welcome notification and every other
/// active participant is told about them. Notification failures are logged
/// and do not undo the join.
///
/// # Errors
///
/// - `404 Not Found`: No active group with that code
/// - `409 Conflict`: Already an active participant
pub async fn join_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<JoinGroupRequest>,
) -> ApiResult<Json<JoinGroupResponse>> {
    let code = req.invitation_code.trim();
    if code.is_empty() {
        return Err(ApiError::BadRequest("Invitation code is required".to_string()));
    }

    let group = Group::find_active_by_code(&state.db, code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid invitation code".to_string()))?;

    let already_member = || ApiError::Conflict("Already a member of this group".to_string());

    if Participant::find_active(&state.db, group.id, auth.user_id)
        .await?
        .is_some()
    {
        return Err(already_member());
    }

    let participant = Participant::add(&state.db, group.id, auth.user_id, ParticipantRole::Miembro)
        .await?
        .ok_or_else(already_member)?;

    tracing::info!(group_id = group.id, user_id = auth.user_id, "User joined group");

    let notified = welcome_and_announce(&state, &group, &auth).await;

    Ok(Json(JoinGroupResponse {
        group,
        participant,
        notified,
    }))
}
