mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use bootcamp_api::database::{Collection, Document, Store};
use common::TestApp;

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => panic!("not an object"),
    }
}

/// `count` bootcamps named "Camp 00".."Camp NN", created in that order.
async fn seed_bootcamps(app: &TestApp, count: usize) -> Result<()> {
    for i in 0..count {
        let careers = if i % 5 == 0 {
            json!(["Business", "Web Development"])
        } else {
            json!(["Data Science"])
        };
        app.store
            .create(
                Collection::Bootcamps,
                doc(json!({
                    "name": format!("Camp {:02}", i),
                    "description": "A bootcamp",
                    "averageCost": 1000 * (i as u64 + 1),
                    "housing": i % 2 == 0,
                    "careers": careers
                })),
            )
            .await?;
    }
    Ok(())
}

fn names(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|docs| docs.iter().filter_map(|d| d["name"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn middle_page_links_both_ways() -> Result<()> {
    let app = TestApp::new();
    seed_bootcamps(&app, 25).await?;

    let res = app.get("/api/v1/bootcamps?page=2&limit=10").await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["count"], 10);
    assert_eq!(
        res.body["pagination"],
        json!({ "next": { "page": 3, "limit": 10 }, "prev": { "page": 1, "limit": 10 } })
    );
    Ok(())
}

#[tokio::test]
async fn default_order_is_newest_first() -> Result<()> {
    let app = TestApp::new();
    seed_bootcamps(&app, 3).await?;

    let res = app.get("/api/v1/bootcamps").await?;

    assert_eq!(names(&res.body), vec!["Camp 02", "Camp 01", "Camp 00"]);
    assert_eq!(res.body["pagination"], json!({}));
    Ok(())
}

#[tokio::test]
async fn sort_by_field_ascending_and_descending() -> Result<()> {
    let app = TestApp::new();
    seed_bootcamps(&app, 3).await?;

    let asc = app.get("/api/v1/bootcamps?sortBy=name").await?;
    assert_eq!(names(&asc.body), vec!["Camp 00", "Camp 01", "Camp 02"]);

    let desc = app.get("/api/v1/bootcamps?sortBy=-averageCost").await?;
    assert_eq!(names(&desc.body), vec!["Camp 02", "Camp 01", "Camp 00"]);
    Ok(())
}

#[tokio::test]
async fn select_projects_fields_and_keeps_id() -> Result<()> {
    let app = TestApp::new();
    seed_bootcamps(&app, 2).await?;

    let res = app.get("/api/v1/bootcamps?select=name,description").await?;

    for item in res.body["data"].as_array().into_iter().flatten() {
        let mut keys: Vec<&str> = item
            .as_object()
            .map(|o| o.keys().map(String::as_str).collect())
            .unwrap_or_default();
        keys.sort();
        assert_eq!(keys, vec!["description", "id", "name"]);
    }
    Ok(())
}

#[tokio::test]
async fn comparison_operators_narrow_results() -> Result<()> {
    let app = TestApp::new();
    seed_bootcamps(&app, 10).await?;

    let res = app.get("/api/v1/bootcamps?averageCost%5Blte%5D=3000").await?;
    assert_eq!(res.body["count"], 3);

    let res = app.get("/api/v1/bootcamps?averageCost%5Bgt%5D=3000&averageCost%5Blt%5D=6000").await?;
    assert_eq!(res.body["count"], 2);

    let res = app.get("/api/v1/bootcamps?housing=true").await?;
    assert_eq!(res.body["count"], 5);

    let res = app.get("/api/v1/bootcamps?careers%5Bin%5D=Business").await?;
    assert_eq!(names(&res.body), vec!["Camp 05", "Camp 00"]);
    Ok(())
}

#[tokio::test]
async fn count_and_pagination_agree_with_filter() -> Result<()> {
    let app = TestApp::new();
    seed_bootcamps(&app, 25).await?;

    // 13 bootcamps have housing; page 2 of 10 holds the last 3
    let res = app.get("/api/v1/bootcamps?housing=true&page=2&limit=10").await?;

    assert_eq!(res.body["count"], 3);
    assert_eq!(res.body["pagination"], json!({ "prev": { "page": 1, "limit": 10 } }));
    Ok(())
}

#[tokio::test]
async fn unknown_fields_match_nothing() -> Result<()> {
    let app = TestApp::new();
    seed_bootcamps(&app, 4).await?;

    let res = app.get("/api/v1/bootcamps?password%5Bne%5D=x&nonsense=1").await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["count"], 0);

    let res = app.get("/api/v1/bootcamps?averageCost%5Bgte%5D=cheap").await?;
    assert_eq!(res.body["count"], 0);
    Ok(())
}

#[tokio::test]
async fn garbage_paging_falls_back_to_defaults() -> Result<()> {
    let app = TestApp::new();
    seed_bootcamps(&app, 30).await?;

    let res = app.get("/api/v1/bootcamps?page=abc&limit=0").await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["count"], 25);
    assert_eq!(res.body["pagination"], json!({ "next": { "page": 2, "limit": 25 } }));
    Ok(())
}

#[tokio::test]
async fn limit_is_capped_by_configuration() -> Result<()> {
    let mut config = bootcamp_api::config::AppConfig::development();
    config.query.max_limit = 5;
    let app = TestApp::with_config(config);
    seed_bootcamps(&app, 8).await?;

    let res = app.get("/api/v1/bootcamps?limit=100").await?;

    assert_eq!(res.body["count"], 5);
    assert_eq!(res.body["pagination"], json!({ "next": { "page": 2, "limit": 5 } }));
    Ok(())
}
