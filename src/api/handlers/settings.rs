use crate::{
    auth::middleware::CurrentUser,
    settings::{
        default_settings, ActivityContext, AdminSettingKey, InitializeSettingsResponse,
        SettingActivity, SettingResponse, SettingsListResponse, UpdateSettingRequest,
        UpsertSettingRequest,
    },
    types::{AppError, DirectoryUser, MessageResponse, Result, Role},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::{header::USER_AGENT, HeaderMap},
    Json,
};
use serde_json::Value;

/// Who is acting and from where, for the activity log.
fn activity_context(user: &DirectoryUser, headers: &HeaderMap) -> ActivityContext {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    ActivityContext {
        user_id: user.id.clone(),
        // First hop is the client; the rest are proxies.
        ip_address: header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        user_agent: header(USER_AGENT.as_str())
            .unwrap_or("unknown")
            .to_string(),
    }
}

fn parse_key(raw: &str) -> Result<AdminSettingKey> {
    raw.parse()
}

fn require_value(value: &Value) -> Result<()> {
    if value.is_null() {
        return Err(AppError::Validation("Setting value is required".to_string()));
    }
    Ok(())
}

/// List admin settings, sensitive values masked
#[utoipa::path(
    get,
    path = "/api/v1/settings",
    responses(
        (status = 200, description = "All stored admin settings", body = SettingsListResponse),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Super admin role required")
    ),
    tag = "settings"
)]
pub async fn list_settings(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<SettingsListResponse>> {
    user.require_role(Role::SuperAdmin)?;

    let settings = state.settings.list_admin_settings().await?;
    Ok(Json(SettingsListResponse {
        success: true,
        settings,
    }))
}

/// Create or overwrite a setting
#[utoipa::path(
    post,
    path = "/api/v1/settings",
    request_body = UpsertSettingRequest,
    responses(
        (status = 200, description = "Setting stored", body = SettingResponse),
        (status = 400, description = "Unknown key or missing value"),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Super admin role required")
    ),
    tag = "settings"
)]
pub async fn upsert_setting(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Json(payload): Json<UpsertSettingRequest>,
) -> Result<Json<SettingResponse>> {
    user.require_role(Role::SuperAdmin)?;

    let key = parse_key(&payload.key)?;
    require_value(&payload.value)?;

    let existed = state.settings.get_setting(key).await?.is_some();
    let setting = state
        .settings
        .create_or_update(
            key,
            &payload.value,
            payload.description.as_deref(),
            payload.is_public.unwrap_or(false),
            Some(&user.0.id),
        )
        .await?;

    let activity = if existed {
        SettingActivity::Update
    } else {
        SettingActivity::Create
    };
    state
        .settings
        .log_activity(&activity_context(&user.0, &headers), activity, key.as_str())
        .await;

    tracing::info!(user_id = %user.0.id, key = %key, "admin setting stored");
    Ok(Json(SettingResponse {
        success: true,
        setting,
    }))
}

/// Update an existing setting
#[utoipa::path(
    put,
    path = "/api/v1/settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    request_body = UpdateSettingRequest,
    responses(
        (status = 200, description = "Setting updated", body = SettingResponse),
        (status = 400, description = "Unknown key or missing value"),
        (status = 403, description = "Super admin role required"),
        (status = 404, description = "Setting not stored")
    ),
    tag = "settings"
)]
pub async fn update_setting(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(key): Path<String>,
    Json(payload): Json<UpdateSettingRequest>,
) -> Result<Json<SettingResponse>> {
    user.require_role(Role::SuperAdmin)?;

    let key = parse_key(&key)?;
    require_value(&payload.value)?;

    let setting = state
        .settings
        .update(
            key,
            &payload.value,
            payload.description.as_deref(),
            payload.is_public,
            Some(&user.0.id),
        )
        .await?
        .ok_or_else(|| AppError::SettingNotFound(key.to_string()))?;

    state
        .settings
        .log_activity(
            &activity_context(&user.0, &headers),
            SettingActivity::Update,
            key.as_str(),
        )
        .await;

    Ok(Json(SettingResponse {
        success: true,
        setting,
    }))
}

/// Delete a setting
#[utoipa::path(
    delete,
    path = "/api/v1/settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting deleted", body = MessageResponse),
        (status = 400, description = "Unknown key"),
        (status = 403, description = "Super admin role required"),
        (status = 404, description = "Setting not stored")
    ),
    tag = "settings"
)]
pub async fn delete_setting(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Json<MessageResponse>> {
    user.require_role(Role::SuperAdmin)?;

    let key = parse_key(&key)?;
    if !state.settings.delete(key).await? {
        return Err(AppError::SettingNotFound(key.to_string()));
    }

    state
        .settings
        .log_activity(
            &activity_context(&user.0, &headers),
            SettingActivity::Delete,
            key.as_str(),
        )
        .await;

    Ok(Json(MessageResponse {
        success: true,
        message: format!("Setting {} deleted", key),
    }))
}

/// Write default values for every setting not stored yet
#[utoipa::path(
    post,
    path = "/api/v1/settings/initialize",
    responses(
        (status = 200, description = "Defaults written", body = InitializeSettingsResponse),
        (status = 403, description = "Super admin role required")
    ),
    tag = "settings"
)]
pub async fn initialize_settings(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
) -> Result<Json<InitializeSettingsResponse>> {
    user.require_role(Role::SuperAdmin)?;

    let defaults = default_settings(&state.config.settings);
    let initialized = state.settings.initialize_defaults(&defaults).await?;

    state
        .settings
        .log_activity(
            &activity_context(&user.0, &headers),
            SettingActivity::Initialize,
            "defaults",
        )
        .await;

    Ok(Json(InitializeSettingsResponse {
        success: true,
        message: format!("Initialized {} default settings", initialized.len()),
        initialized,
    }))
}
