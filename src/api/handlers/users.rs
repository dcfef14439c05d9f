use crate::{
    auth::middleware::CurrentUser,
    db::UserUpdate,
    types::{
        AppError, DirectoryUser, Result, Role, UpdateUserRequest, UserDetails, UserResponse,
        UsersResponse,
    },
    AppState,
};
use axum::{
    extract::{Path, State},
    Json,
};

/// List console users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "All users, active or not", body = UsersResponse),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Admin role required")
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<UsersResponse>> {
    user.require_role(Role::Admin)?;

    let users = state.users.list_users().await?;
    Ok(Json(UsersResponse {
        success: true,
        users: users.iter().map(UserDetails::from).collect(),
    }))
}

/// Change a user's role or active flag
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Empty update or self-demotion"),
        (status = 403, description = "Super admin role required"),
        (status = 404, description = "Unknown user")
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    user.require_role(Role::SuperAdmin)?;

    let update = UserUpdate {
        role: payload.role,
        is_active: payload.is_active,
    };
    check_update(&user.0, &id, &update)?;

    let updated = state
        .users
        .update_user(&id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", id)))?;

    tracing::info!(
        actor = %user.0.id,
        user_id = %updated.id,
        role = %updated.role,
        is_active = updated.is_active,
        "user updated"
    );

    Ok(Json(UserResponse {
        success: true,
        user: UserDetails::from(&updated),
    }))
}

/// Rejects empty updates and a super admin locking themself out.
fn check_update(actor: &DirectoryUser, target_id: &str, update: &UserUpdate) -> Result<()> {
    if update.role.is_none() && update.is_active.is_none() {
        return Err(AppError::Validation(
            "Provide a role or is_active to update".to_string(),
        ));
    }

    if actor.id == target_id {
        let demoted = update.role.is_some_and(|r| r < actor.role);
        let deactivated = update.is_active == Some(false);
        if demoted || deactivated {
            return Err(AppError::Validation(
                "You cannot demote or deactivate your own account".to_string(),
            ));
        }
    }

    Ok(())
}
