// handlers/mod.rs - HTTP handlers, one module per resource
//
// Public reads run through advanced results. Every mutation of an existing
// resource goes resolve -> authorize -> commit (see auth::ownership).

pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod health;
pub mod reviews;
pub mod users;

use crate::auth::Role;
use crate::filter::QueryParameters;

/// Roles that may publish bootcamps and courses.
pub const PUBLISHERS: &[Role] = &[Role::Publisher, Role::Admin];

/// Roles that may write reviews.
pub const REVIEWERS: &[Role] = &[Role::User, Role::Admin];

pub const ADMINS: &[Role] = &[Role::Admin];

pub(crate) fn query_params(raw: Option<String>) -> QueryParameters {
    raw.as_deref().map(QueryParameters::parse).unwrap_or_default()
}
