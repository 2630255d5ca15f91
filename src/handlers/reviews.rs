// handlers/reviews.rs - /api/v1/reviews and /api/v1/bootcamps/:bootcampId/reviews

use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    Json,
};

use super::{query_params, REVIEWERS};
use crate::api::{AdvancedResults, BOOTCAMP_SUMMARY};
use crate::auth::ownership::{self, parse_id};
use crate::auth::{require_role, Action, Principal};
use crate::database::aggregates::{self, Aggregate};
use crate::database::models::ReviewInput;
use crate::database::{Collection, Document};
use crate::error::ApiError;
use crate::filter::FilterCondition;
use crate::middleware::{json_body, ApiResponse, ApiResult, CollectionResponse};
use crate::state::AppState;

/// GET /api/v1/reviews - every review, bootcamp summary populated
pub async fn list(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<CollectionResponse, ApiError> {
    AdvancedResults::new(Collection::Reviews)
        .populate(BOOTCAMP_SUMMARY)
        .run(state.store(), &query_params(raw), &state.config.query)
        .await
}

/// GET /api/v1/bootcamps/:bootcampId/reviews - reviews of one bootcamp
pub async fn list_for_bootcamp(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<CollectionResponse, ApiError> {
    let bootcamp = parse_id(&bootcamp_id)?;
    AdvancedResults::new(Collection::Reviews)
        .scoped(FilterCondition::eq("bootcamp", bootcamp.to_string()))
        .populate(BOOTCAMP_SUMMARY)
        .run(state.store(), &query_params(raw), &state.config.query)
        .await
}

/// GET /api/v1/reviews/:id - single review
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Document> {
    let review = ownership::resolve(state.store(), Collection::Reviews, &id).await?.into_document();
    let review = BOOTCAMP_SUMMARY.apply_one(state.store(), review).await?;
    Ok(ApiResponse::success(review))
}

/// POST /api/v1/bootcamps/:bootcampId/reviews - one review per user per bootcamp
pub async fn create(
    State(state): State<AppState>,
    principal: Principal,
    Path(bootcamp_id): Path<String>,
    body: Result<Json<ReviewInput>, JsonRejection>,
) -> ApiResult<Document> {
    let bootcamp = ownership::resolve(state.store(), Collection::Bootcamps, &bootcamp_id).await?;
    require_role(&principal, REVIEWERS)?;

    let doc = json_body(body)?.into_new(bootcamp.id(), principal.id)?;
    let created = state.store().create(Collection::Reviews, doc).await?;
    aggregates::refresh(state.store(), Aggregate::AverageRating, bootcamp.id()).await;

    Ok(ApiResponse::created(created))
}

/// PUT /api/v1/reviews/:id - update (review author or admin)
pub async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    body: Result<Json<ReviewInput>, JsonRejection>,
) -> ApiResult<Document> {
    let authorized = ownership::resolve(state.store(), Collection::Reviews, &id)
        .await?
        .authorize(&principal, Some(REVIEWERS), Action::Update)?;
    let parent = authorized.parent();

    let changes = json_body(body)?.into_changes()?;
    let updated = authorized.update(state.store(), changes).await?;
    if let Some(bootcamp) = parent {
        aggregates::refresh(state.store(), Aggregate::AverageRating, bootcamp).await;
    }

    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/reviews/:id - delete (review author or admin); ownership is checked first
pub async fn delete(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let authorized = ownership::resolve(state.store(), Collection::Reviews, &id)
        .await?
        .authorize(&principal, Some(REVIEWERS), Action::Delete)?;
    let parent = authorized.parent();

    authorized.delete(state.store()).await?;
    if let Some(bootcamp) = parent {
        aggregates::refresh(state.store(), Aggregate::AverageRating, bootcamp).await;
    }

    Ok(ApiResponse::deleted())
}
