use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::pagination::PaginationLinks;
use crate::database::Document;

/// Single-entity envelope: `{"success": true, "data": ...}`
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self { data, status_code: None }
    }

    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self { data, status_code: Some(status_code) }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }
}

impl ApiResponse<()> {
    /// Deletion envelope: `{"success": true, "data": null}`
    pub fn deleted() -> Self {
        Self::success(())
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": "Server Error"
                    })),
                )
                    .into_response();
            }
        };

        let envelope = json!({
            "success": true,
            "data": data_value
        });

        (status, Json(envelope)).into_response()
    }
}

/// Collection envelope: `{"success": true, "count": n, "pagination": {...}, "data": [...]}`.
/// `count` is the length of this page, not the total.
#[derive(Debug, Serialize)]
pub struct CollectionResponse {
    pub success: bool,
    pub count: usize,
    pub pagination: PaginationLinks,
    pub data: Vec<Document>,
}

impl CollectionResponse {
    pub fn new(data: Vec<Document>, pagination: PaginationLinks) -> Self {
        Self { success: true, count: data.len(), pagination, data }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl IntoResponse for CollectionResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::pagination::PageRef;

    #[test]
    fn collection_envelope_shape() {
        let mut doc = Document::new();
        doc.insert("name".into(), "Devworks".into());
        let links = PaginationLinks { next: Some(PageRef { page: 2, limit: 1 }), prev: None };
        let body = CollectionResponse::new(vec![doc], links).to_json();
        assert_eq!(
            body,
            json!({
                "success": true,
                "count": 1,
                "pagination": { "next": { "page": 2, "limit": 1 } },
                "data": [{ "name": "Devworks" }]
            })
        );
    }

    #[test]
    fn empty_collection_has_empty_pagination() {
        let body = CollectionResponse::new(vec![], PaginationLinks::default()).to_json();
        assert_eq!(body, json!({ "success": true, "count": 0, "pagination": {}, "data": [] }));
    }

    #[tokio::test]
    async fn deletion_envelope_has_null_data() {
        let response = ApiResponse::deleted().into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "success": true, "data": null }));
    }
}
