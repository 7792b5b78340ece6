/// Group-level authorization checks
///
/// Groups are shared resources: any active participant may read and update
/// them, only administrators may remove other participants, and only the
/// creator may delete the group. The creator can never be removed.
///
/// # Example
///
/// ```no_run
/// use splitease_shared::auth::authorization::require_active_participant;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let participation = require_active_participant(&pool, 4, 12).await?;
/// println!("caller is {}", participation.role.as_str());
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;

use crate::models::group::Group;
use crate::models::participant::Participant;

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("Not an active participant of group {0}")]
    NotParticipant(i64),

    #[error("Only the group creator may perform this action")]
    NotCreator,

    #[error("Only administrators may remove other participants")]
    NotAdministrator,

    #[error("The group creator cannot be removed")]
    CreatorRemoval,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Returns the caller's active participation or `NotParticipant`.
pub async fn require_active_participant(
    pool: &PgPool,
    group_id: i64,
    user_id: i64,
) -> Result<Participant, AuthzError> {
    Participant::find_active(pool, group_id, user_id)
        .await?
        .ok_or(AuthzError::NotParticipant(group_id))
}

pub fn require_creator(group: &Group, user_id: i64) -> Result<(), AuthzError> {
    if group.creator_id != user_id {
        return Err(AuthzError::NotCreator);
    }

    Ok(())
}

/// Decides whether `requester` may remove `target_user_id` from the group.
///
/// The creator check runs first, so removing the creator is refused as
/// `CreatorRemoval` whatever the requester's role. Otherwise administrators
/// may remove anyone and members may only remove themselves.
pub fn check_participant_removal(
    requester: &Participant,
    target_user_id: i64,
    creator_id: i64,
) -> Result<(), AuthzError> {
    if target_user_id == creator_id {
        return Err(AuthzError::CreatorRemoval);
    }

    if requester.user_id != target_user_id && !requester.role.can_remove_others() {
        return Err(AuthzError::NotAdministrator);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::group::GroupStatus;
    use crate::models::participant::{ParticipantRole, ParticipantStatus};
    use chrono::Utc;

    const CREATOR: i64 = 1;

    fn participant(user_id: i64, role: ParticipantRole) -> Participant {
        Participant {
            group_id: 10,
            user_id,
            role,
            status: ParticipantStatus::Activo,
            joined_at: Utc::now(),
        }
    }

    fn group() -> Group {
        Group {
            id: 10,
            name: "Trip".to_string(),
            description: String::new(),
            creator_id: CREATOR,
            creator_name: "Ana".to_string(),
            invitation_code: "code".to_string(),
            status: GroupStatus::Activo,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_creator_cannot_be_removed_by_anyone() {
        let creator = participant(CREATOR, ParticipantRole::Administrador);
        let admin = participant(2, ParticipantRole::Administrador);
        let member = participant(3, ParticipantRole::Miembro);

        for requester in [&creator, &admin, &member] {
            assert!(matches!(
                check_participant_removal(requester, CREATOR, CREATOR),
                Err(AuthzError::CreatorRemoval)
            ));
        }
    }

    #[test]
    fn test_member_cannot_remove_others() {
        let member = participant(3, ParticipantRole::Miembro);
        assert!(matches!(
            check_participant_removal(&member, 4, CREATOR),
            Err(AuthzError::NotAdministrator)
        ));
    }

    #[test]
    fn test_member_can_leave() {
        let member = participant(3, ParticipantRole::Miembro);
        assert!(check_participant_removal(&member, 3, CREATOR).is_ok());
    }

    #[test]
    fn test_admin_can_remove_others() {
        let admin = participant(CREATOR, ParticipantRole::Administrador);
        assert!(check_participant_removal(&admin, 3, CREATOR).is_ok());
    }

    #[test]
    fn test_require_creator() {
        assert!(require_creator(&group(), CREATOR).is_ok());
        assert!(matches!(require_creator(&group(), 2), Err(AuthzError::NotCreator)));
    }
}
