// handlers/bootcamps.rs - /api/v1/bootcamps

use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    Json,
};
use tracing::info;

use super::{query_params, PUBLISHERS};
use crate::api::AdvancedResults;
use crate::auth::{ownership, require_role, Action, Principal};
use crate::database::models::BootcampInput;
use crate::database::{Collection, Document};
use crate::error::ApiError;
use crate::filter::{FilterCondition, FilterSpec};
use crate::middleware::{json_body, ApiResponse, ApiResult, CollectionResponse};
use crate::state::AppState;

/// GET /api/v1/bootcamps - list bootcamps (filter, select, sort, paginate)
pub async fn list(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<CollectionResponse, ApiError> {
    AdvancedResults::new(Collection::Bootcamps)
        .run(state.store(), &query_params(raw), &state.config.query)
        .await
}

/// GET /api/v1/bootcamps/:id - single bootcamp
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Document> {
    let resolved = ownership::resolve(state.store(), Collection::Bootcamps, &id).await?;
    Ok(ApiResponse::success(resolved.into_document()))
}

/// POST /api/v1/bootcamps - create a bootcamp owned by the caller
pub async fn create(
    State(state): State<AppState>,
    principal: Principal,
    body: Result<Json<BootcampInput>, JsonRejection>,
) -> ApiResult<Document> {
    require_role(&principal, PUBLISHERS)?;
    let doc = json_body(body)?.into_new(principal.id)?;

    let created = state.store().create(Collection::Bootcamps, doc).await?;
    info!("User {} created bootcamp {}", principal.id, created.get("id").unwrap_or(&serde_json::Value::Null));
    Ok(ApiResponse::created(created))
}

/// PUT /api/v1/bootcamps/:id - update (owner or admin)
pub async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    body: Result<Json<BootcampInput>, JsonRejection>,
) -> ApiResult<Document> {
    let authorized = ownership::resolve(state.store(), Collection::Bootcamps, &id)
        .await?
        .authorize(&principal, Some(PUBLISHERS), Action::Update)?;

    let changes = json_body(body)?.into_changes()?;
    let updated = authorized.update(state.store(), changes).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/bootcamps/:id - delete (owner or admin), with its courses and reviews
pub async fn delete(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let authorized = ownership::resolve(state.store(), Collection::Bootcamps, &id)
        .await?
        .authorize(&principal, Some(PUBLISHERS), Action::Delete)?;
    let bootcamp = authorized.id();

    // children first; the bootcamp only goes once they are gone
    let children = FilterSpec::new().and(FilterCondition::eq("bootcamp", bootcamp.to_string()));
    let courses = state.store().delete_many(Collection::Courses, &children).await?;
    let reviews = state.store().delete_many(Collection::Reviews, &children).await?;
    authorized.delete(state.store()).await?;
    info!(
        "Deleted bootcamp {} with {} courses and {} reviews",
        bootcamp, courses, reviews
    );

    Ok(ApiResponse::deleted())
}
