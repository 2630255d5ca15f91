// handlers/users.rs - /api/v1/auth/users, administrators only

use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    Json,
};
use tracing::info;

use super::{query_params, ADMINS};
use crate::api::AdvancedResults;
use crate::auth::{ownership, require_role, Action, Principal};
use crate::database::models::UserInput;
use crate::database::{Collection, Document};
use crate::error::ApiError;
use crate::middleware::{json_body, ApiResponse, ApiResult, CollectionResponse};
use crate::state::AppState;

/// GET /api/v1/auth/users - list users
pub async fn list(
    State(state): State<AppState>,
    principal: Principal,
    RawQuery(raw): RawQuery,
) -> Result<CollectionResponse, ApiError> {
    require_role(&principal, ADMINS)?;
    AdvancedResults::new(Collection::Users)
        .run(state.store(), &query_params(raw), &state.config.query)
        .await
}

/// GET /api/v1/auth/users/:id
pub async fn show(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Document> {
    let user = ownership::resolve(state.store(), Collection::Users, &id).await?;
    require_role(&principal, ADMINS)?;
    Ok(ApiResponse::success(Collection::Users.public_view(user.into_document())))
}

/// POST /api/v1/auth/users - create a user with any role
pub async fn create(
    State(state): State<AppState>,
    principal: Principal,
    body: Result<Json<UserInput>, JsonRejection>,
) -> ApiResult<Document> {
    require_role(&principal, ADMINS)?;
    let new_user = json_body(body)?.into_new(true)?;

    let hash = state.passwords.spawn_hash(new_user.password.clone()).await?;
    let created = state.store().create(Collection::Users, new_user.with_password_hash(hash)).await?;
    info!("Admin {} created user {}", principal.id, created.get("id").unwrap_or(&serde_json::Value::Null));
    Ok(ApiResponse::created(Collection::Users.public_view(created)))
}

/// PUT /api/v1/auth/users/:id - change name, email or role
pub async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    body: Result<Json<UserInput>, JsonRejection>,
) -> ApiResult<Document> {
    let authorized = ownership::resolve(state.store(), Collection::Users, &id)
        .await?
        .authorize(&principal, Some(ADMINS), Action::Update)?;

    let changes = json_body(body)?.into_changes(true)?;
    let updated = authorized.update(state.store(), changes).await?;
    Ok(ApiResponse::success(Collection::Users.public_view(updated)))
}

/// DELETE /api/v1/auth/users/:id
pub async fn delete(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let authorized = ownership::resolve(state.store(), Collection::Users, &id)
        .await?
        .authorize(&principal, Some(ADMINS), Action::Delete)?;
    let user = authorized.id();

    authorized.delete(state.store()).await?;
    info!("Admin {} deleted user {}", principal.id, user);
    Ok(ApiResponse::deleted())
}
