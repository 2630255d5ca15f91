mod common;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use bootcamp_api::database::aggregates::Aggregate;
use bootcamp_api::database::{Collection, DatabaseError, Document, FindQuery, MemoryStore, Store};
use bootcamp_api::filter::FilterSpec;
use common::TestApp;

/// Memory store whose bulk review delete always fails.
struct BrokenReviewCleanup(Arc<MemoryStore>);

#[async_trait]
impl Store for BrokenReviewCleanup {
    async fn find(&self, collection: Collection, query: &FindQuery) -> Result<Vec<Document>, DatabaseError> {
        self.0.find(collection, query).await
    }

    async fn count(&self, collection: Collection, filter: &FilterSpec) -> Result<u64, DatabaseError> {
        self.0.count(collection, filter).await
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        self.0.find_by_id(collection, id).await
    }

    async fn create(&self, collection: Collection, doc: Document) -> Result<Document, DatabaseError> {
        self.0.create(collection, doc).await
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        changes: Document,
    ) -> Result<Option<Document>, DatabaseError> {
        self.0.update_by_id(collection, id, changes).await
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        self.0.delete_by_id(collection, id).await
    }

    async fn delete_many(&self, collection: Collection, filter: &FilterSpec) -> Result<u64, DatabaseError> {
        if collection == Collection::Reviews {
            return Err(DatabaseError::QueryError("reviews unavailable".into()));
        }
        self.0.delete_many(collection, filter).await
    }

    async fn refresh_average(&self, aggregate: Aggregate, bootcamp: Uuid) -> Result<Option<f64>, DatabaseError> {
        self.0.refresh_average(aggregate, bootcamp).await
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.0.ping().await
    }
}

#[tokio::test]
async fn publisher_creates_and_public_reads() -> Result<()> {
    let app = TestApp::new();
    let publisher = app.register("Pub", "publisher").await?;

    let res = app
        .request(
            Method::POST,
            "/api/v1/bootcamps",
            Some(&publisher),
            Some(json!({ "name": "Devworks", "description": "Full stack", "careers": ["Web Development"] })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    let bootcamp = &res.body["data"];
    assert_eq!(bootcamp["housing"], false);
    assert_eq!(bootcamp["photo"], "no-photo.jpg");
    let id = common::id_of(bootcamp)?;

    let res = app.get(&format!("/api/v1/bootcamps/{}", id)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["name"], "Devworks");
    Ok(())
}

#[tokio::test]
async fn plain_user_cannot_create() -> Result<()> {
    let app = TestApp::new();
    let user = app.register("Jane", "user").await?;

    let res = app
        .request(
            Method::POST,
            "/api/v1/bootcamps",
            Some(&user),
            Some(json!({ "name": "Devworks", "description": "Full stack" })),
        )
        .await?;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"], "User role user is not authorized to access this route");
    Ok(())
}

#[tokio::test]
async fn create_reports_validation_and_duplicates() -> Result<()> {
    let app = TestApp::new();
    let publisher = app.register("Pub", "publisher").await?;

    let res = app
        .request(Method::POST, "/api/v1/bootcamps", Some(&publisher), Some(json!({ "name": "x".repeat(51) })))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Please add a description,Name can not be more than 50 characters");

    app.create_bootcamp(&publisher, "Devworks").await?;
    let res = app
        .request(
            Method::POST,
            "/api/v1/bootcamps",
            Some(&publisher),
            Some(json!({ "name": "Devworks", "description": "Again" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Duplicate field value entered");
    Ok(())
}

#[tokio::test]
async fn missing_resource_wins_over_authorization() -> Result<()> {
    let app = TestApp::new();
    let user = app.register("Jane", "user").await?;
    let missing = Uuid::new_v4();

    let res = app
        .request(
            Method::PUT,
            &format!("/api/v1/bootcamps/{}", missing),
            Some(&user),
            Some(json!({ "name": "Renamed" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"], format!("No bootcamp with the id of {}", missing));

    let res = app.get("/api/v1/bootcamps/5d713995b721c3bb38c1f5d0").await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"], "Resource with id 5d713995b721c3bb38c1f5d0 not found");
    Ok(())
}

#[tokio::test]
async fn only_the_owner_or_an_admin_updates() -> Result<()> {
    let app = TestApp::new();
    let owner = app.register("Owner", "publisher").await?;
    let other = app.register("Other", "publisher").await?;
    let user = app.register("Jane", "user").await?;
    let admin = app.admin().await?;
    let id = app.create_bootcamp(&owner, "Devworks").await?;
    let uri = format!("/api/v1/bootcamps/{}", id);

    let res = app.request(Method::PUT, &uri, Some(&other), Some(json!({ "phone": "555" }))).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    // role gate is checked before ownership
    let res = app.request(Method::PUT, &uri, Some(&user), Some(json!({ "phone": "555" }))).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.get(&uri).await?;
    assert!(res.body["data"].get("phone").is_none());

    let res = app.request(Method::PUT, &uri, Some(&owner), Some(json!({ "phone": "555" }))).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["phone"], "555");

    let res = app.request(Method::PUT, &uri, Some(&admin), Some(json!({ "housing": true }))).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["housing"], true);
    Ok(())
}

#[tokio::test]
async fn delete_cascades_and_returns_null_data() -> Result<()> {
    let app = TestApp::new();
    let owner = app.register("Owner", "publisher").await?;
    let id = app.create_bootcamp(&owner, "Devworks").await?;
    let course = app.create_course(&owner, &id, "Front End", 8000).await?;

    let res = app.request(Method::DELETE, &format!("/api/v1/bootcamps/{}", id), Some(&owner), None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!({ "success": true, "data": null }));

    let res = app.get(&format!("/api/v1/bootcamps/{}", id)).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    let res = app.get(&format!("/api/v1/courses/{}", course)).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn failed_cascade_keeps_the_bootcamp() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let app = TestApp::with_store(store.clone(), Arc::new(BrokenReviewCleanup(store)));
    let owner = app.register("Owner", "publisher").await?;
    let id = app.create_bootcamp(&owner, "Devworks").await?;

    let res = app.request(Method::DELETE, &format!("/api/v1/bootcamps/{}", id), Some(&owner), None).await?;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);

    let res = app.get(&format!("/api/v1/bootcamps/{}", id)).await?;
    assert_eq!(res.status, StatusCode::OK);
    Ok(())
}
