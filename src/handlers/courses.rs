// handlers/courses.rs - /api/v1/courses and /api/v1/bootcamps/:bootcampId/courses

use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    Json,
};

use super::{query_params, PUBLISHERS};
use crate::api::{AdvancedResults, BOOTCAMP_SUMMARY};
use crate::auth::ownership::{self, parse_id};
use crate::auth::{Action, Principal};
use crate::database::aggregates::{self, Aggregate};
use crate::database::models::CourseInput;
use crate::database::{Collection, Document};
use crate::error::ApiError;
use crate::filter::FilterCondition;
use crate::middleware::{json_body, ApiResponse, ApiResult, CollectionResponse};
use crate::state::AppState;

/// GET /api/v1/courses - every course, bootcamp summary populated
pub async fn list(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<CollectionResponse, ApiError> {
    AdvancedResults::new(Collection::Courses)
        .populate(BOOTCAMP_SUMMARY)
        .run(state.store(), &query_params(raw), &state.config.query)
        .await
}

/// GET /api/v1/bootcamps/:bootcampId/courses - courses of one bootcamp
pub async fn list_for_bootcamp(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<CollectionResponse, ApiError> {
    let bootcamp = parse_id(&bootcamp_id)?;
    AdvancedResults::new(Collection::Courses)
        .scoped(FilterCondition::eq("bootcamp", bootcamp.to_string()))
        .run(state.store(), &query_params(raw), &state.config.query)
        .await
}

/// GET /api/v1/courses/:id - single course, bootcamp summary populated
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Document> {
    let course = ownership::resolve(state.store(), Collection::Courses, &id).await?.into_document();
    let course = BOOTCAMP_SUMMARY.apply_one(state.store(), course).await?;
    Ok(ApiResponse::success(course))
}

/// POST /api/v1/bootcamps/:bootcampId/courses - add a course to a bootcamp the caller owns
pub async fn create(
    State(state): State<AppState>,
    principal: Principal,
    Path(bootcamp_id): Path<String>,
    body: Result<Json<CourseInput>, JsonRejection>,
) -> ApiResult<Document> {
    let bootcamp = ownership::resolve(state.store(), Collection::Bootcamps, &bootcamp_id).await?;
    bootcamp.authorize_child(&principal, PUBLISHERS, Collection::Courses)?;

    let doc = json_body(body)?.into_new(bootcamp.id(), principal.id)?;
    let created = state.store().create(Collection::Courses, doc).await?;
    aggregates::refresh(state.store(), Aggregate::AverageCost, bootcamp.id()).await;

    Ok(ApiResponse::created(created))
}

/// PUT /api/v1/courses/:id - update (course owner or admin)
pub async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    body: Result<Json<CourseInput>, JsonRejection>,
) -> ApiResult<Document> {
    let authorized = ownership::resolve(state.store(), Collection::Courses, &id)
        .await?
        .authorize(&principal, Some(PUBLISHERS), Action::Update)?;
    let parent = authorized.parent();

    let changes = json_body(body)?.into_changes()?;
    let updated = authorized.update(state.store(), changes).await?;
    if let Some(bootcamp) = parent {
        aggregates::refresh(state.store(), Aggregate::AverageCost, bootcamp).await;
    }

    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/courses/:id - delete (course owner or admin)
pub async fn delete(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let authorized = ownership::resolve(state.store(), Collection::Courses, &id)
        .await?
        .authorize(&principal, Some(PUBLISHERS), Action::Delete)?;
    let parent = authorized.parent();

    authorized.delete(state.store()).await?;
    if let Some(bootcamp) = parent {
        aggregates::refresh(state.store(), Aggregate::AverageCost, bootcamp).await;
    }

    Ok(ApiResponse::deleted())
}
