use crate::{
    auth::middleware::CurrentUser,
    bedrock::{self, ModelCatalogResponse, ModelFilter},
    types::{Result, Role},
};
use axum::{extract::Query, Json};

/// List Bedrock models available for selection
#[utoipa::path(
    get,
    path = "/api/v1/bedrock/models",
    params(ModelFilter),
    responses(
        (status = 200, description = "Filtered model catalog", body = ModelCatalogResponse),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Super admin role required")
    ),
    tag = "bedrock"
)]
pub async fn list_models(
    user: CurrentUser,
    Query(filter): Query<ModelFilter>,
) -> Result<Json<ModelCatalogResponse>> {
    user.require_role(Role::SuperAdmin)?;

    Ok(Json(bedrock::list_models(&filter)))
}
