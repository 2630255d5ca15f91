pub mod auth;
pub mod json;
pub mod response;

pub use auth::{authenticate, extract_token, TOKEN_COOKIE};
pub use json::json_body;
pub use response::{ApiResponse, ApiResult, CollectionResponse};
