// handlers/auth.rs - /api/v1/auth: register, login and the caller's own account

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cookie::time::Duration;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{sign_token, Principal};
use crate::config::SecurityConfig;
use crate::database::models::user::check_password;
use crate::database::models::{UserInput, Validator};
use crate::database::{Collection, Document, FindQuery};
use crate::error::ApiError;
use crate::filter::{FilterCondition, FilterSpec};
use crate::middleware::{json_body, ApiResponse, ApiResult, TOKEN_COOKIE};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// `{"success": true, "token": "..."}` plus the same token as an HttpOnly cookie.
pub struct TokenResponse {
    token: String,
    jar: CookieJar,
}

impl TokenResponse {
    pub fn issue(user_id: Uuid, security: &SecurityConfig) -> Result<Self, ApiError> {
        let token = sign_token(user_id, security)?;
        let days = i64::try_from(security.cookie_expire_days).unwrap_or(i64::MAX / 86_400);
        let cookie = Cookie::build((TOKEN_COOKIE, token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(security.secure_cookie)
            .max_age(Duration::days(days));
        Ok(Self { token, jar: CookieJar::new().add(cookie) })
    }
}

impl IntoResponse for TokenResponse {
    fn into_response(self) -> Response {
        (self.jar, Json(json!({ "success": true, "token": self.token }))).into_response()
    }
}

fn user_id(doc: &Document) -> Result<Uuid, ApiError> {
    doc.get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| ApiError::internal_server_error("Server Error"))
}

async fn find_by_email(state: &AppState, email: &str) -> Result<Option<Document>, ApiError> {
    let query = FindQuery {
        limit: Some(1),
        ..FindQuery::filtered(FilterSpec::new().and(FilterCondition::eq("email", email)))
    };
    Ok(state.store().find(Collection::Users, &query).await?.into_iter().next())
}

async fn current_user(state: &AppState, principal: &Principal) -> Result<Document, ApiError> {
    state
        .store()
        .find_by_id(Collection::Users, principal.id)
        .await?
        .ok_or_else(ApiError::not_authenticated)
}

/// POST /api/v1/auth/register - create a user or publisher account and sign it in
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<UserInput>, JsonRejection>,
) -> Result<TokenResponse, ApiError> {
    let new_user = json_body(body)?.into_new(false)?;

    if let Some(email) = new_user.document.get("email").and_then(Value::as_str) {
        if find_by_email(&state, email).await?.is_some() {
            return Err(ApiError::conflict("User already registered"));
        }
    }

    let hash = state.passwords.spawn_hash(new_user.password.clone()).await?;
    let created = state.store().create(Collection::Users, new_user.with_password_hash(hash)).await?;
    let id = user_id(&created)?;
    info!("Registered user {} as {}", id, created.get("role").unwrap_or(&serde_json::Value::Null));

    TokenResponse::issue(id, &state.config.security)
}

/// POST /api/v1/auth/login - exchange email and password for a token
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginInput>, JsonRejection>,
) -> Result<TokenResponse, ApiError> {
    let input = json_body(body)?;
    let (email, password) = match (input.email.as_deref(), input.password.as_deref()) {
        (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
            (email.trim(), password)
        }
        _ => return Err(ApiError::bad_request("Please provide an email and password")),
    };

    let invalid = || ApiError::unauthorized("Invalid credentials");
    let found = find_by_email(&state, email).await?;
    let hash = found
        .as_ref()
        .and_then(|user| user.get("password"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let (Some(user), Some(hash)) = (found, hash) else {
        state.passwords.spawn_verify_dummy(password.to_string()).await;
        return Err(invalid());
    };
    if !state.passwords.spawn_verify(password.to_string(), hash).await? {
        warn!("Failed login for {}", email);
        return Err(invalid());
    }

    TokenResponse::issue(user_id(&user)?, &state.config.security)
}

/// GET /api/v1/auth/me - the authenticated user
pub async fn me(State(state): State<AppState>, principal: Principal) -> ApiResult<Document> {
    let user = current_user(&state, &principal).await?;
    Ok(ApiResponse::success(Collection::Users.public_view(user)))
}

/// PUT /api/v1/auth/updatedetails - change the caller's name or email
pub async fn update_details(
    State(state): State<AppState>,
    principal: Principal,
    body: Result<Json<UserInput>, JsonRejection>,
) -> ApiResult<Document> {
    let changes = json_body(body)?.into_changes(false)?;
    let updated = state
        .store()
        .update_by_id(Collection::Users, principal.id, changes)
        .await?
        .ok_or_else(ApiError::not_authenticated)?;
    Ok(ApiResponse::success(Collection::Users.public_view(updated)))
}

/// PUT /api/v1/auth/updatepassword - change the caller's password and issue a fresh token
pub async fn update_password(
    State(state): State<AppState>,
    principal: Principal,
    body: Result<Json<PasswordChange>, JsonRejection>,
) -> Result<TokenResponse, ApiError> {
    let input = json_body(body)?;

    let present = |p: &Option<String>| p.as_deref().is_some_and(|p| !p.is_empty());
    let mut v = Validator::new();
    v.check(present(&input.current_password), "Please add the current password");
    v.check(present(&input.new_password), "Please add a new password");
    check_password(&mut v, input.new_password.as_deref().filter(|p| !p.is_empty()));
    let (current, new_password) = v.finish((
        input.current_password.unwrap_or_default(),
        input.new_password.unwrap_or_default(),
    ))?;

    let user = current_user(&state, &principal).await?;
    let hash = user.get("password").and_then(Value::as_str).unwrap_or_default().to_string();
    if !state.passwords.spawn_verify(current, hash).await.unwrap_or(false) {
        return Err(ApiError::unauthorized("Password is incorrect"));
    }

    let mut changes = Document::new();
    changes.insert("password".into(), Value::String(state.passwords.spawn_hash(new_password).await?));
    state
        .store()
        .update_by_id(Collection::Users, principal.id, changes)
        .await?
        .ok_or_else(ApiError::not_authenticated)?;
    info!("User {} changed their password", principal.id);

    TokenResponse::issue(principal.id, &state.config.security)
}
