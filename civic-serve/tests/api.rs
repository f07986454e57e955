//! Integration tests for the civic-serve HTTP API.
//!
//! Each test builds the router around an in-process scheduling provider and
//! text generator and drives it with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use civic_serve::{build_router, AppState};
use libcivicast::generation::MockGenerator;
use libcivicast::provider::MockProvider;
use libcivicast::service::CivicastService;
use libcivicast::{Config, Database, Platform};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    provider: MockProvider,
    _temp_dir: TempDir,
}

async fn test_app(provider: MockProvider) -> TestApp {
    test_app_with(provider, |_| {}).await
}

async fn test_app_with(provider: MockProvider, adjust: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default_config();
    config.database.path = temp_dir.path().join("api.db").to_str().unwrap().to_string();
    config.media.dir = temp_dir.path().join("media").to_str().unwrap().to_string();
    config.media.public_base_url = "https://media.example.org/uploads".to_string();
    config.media.max_bytes = 1024;
    adjust(&mut config);

    let db = Database::new(&config.database.path).await.unwrap();
    let service = CivicastService::with_components(
        config,
        db,
        Arc::new(provider.clone()),
        Arc::new(MockGenerator::well_formed()),
    );
    TestApp {
        router: build_router(Arc::new(AppState::new(service))),
        provider,
        _temp_dir: temp_dir,
    }
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }
}

#[tokio::test]
async fn test_health() {
    let app = test_app(MockProvider::success()).await;
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = test_app(MockProvider::success()).await;
    let (status, body) = app.get("/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_generate_variations_for_park_opening() {
    let app = test_app(MockProvider::success()).await;
    let (status, body) = app
        .post(
            "/generate-variations",
            json!({
                "title": "Park Opens",
                "content": "New playground opens Saturday",
                "platforms": ["twitter"],
                "posts_per_platform": 5
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let variations = body["variations"].as_array().unwrap();
    assert_eq!(variations.len(), 5);
    for v in variations {
        assert_eq!(v["platform"], "twitter");
        assert!(v["text"].as_str().unwrap().chars().count() <= 280);
    }
}

#[tokio::test]
async fn test_generate_without_content_is_400() {
    let app = test_app(MockProvider::success()).await;
    let (status, body) = app.post("/generate-variations", json!({ "title": "Only" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("required"));
}

#[tokio::test]
async fn test_generate_with_oversized_count_is_400() {
    let app = test_app(MockProvider::success()).await;
    let (status, body) = app
        .post(
            "/generate-variations",
            json!({ "content": "Budget hearing", "posts_per_platform": 9_000_000_000_000_000_000u64 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("posts_per_platform"));
}

#[tokio::test]
async fn test_malformed_json_body_is_400() {
    let app = test_app(MockProvider::success()).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/schedule-post")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_schedule_post_publish_now() {
    let app = test_app(MockProvider::success()).await;
    let (status, body) = app
        .post(
            "/schedule-post",
            json!({ "platform": "facebook", "content": "Free swim this Sunday" }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "published");
    assert!(body["published_at"].is_i64());
    assert_eq!(app.provider.create_calls().len(), 1);
}

#[tokio::test]
async fn test_schedule_post_accepts_platform_alias() {
    let app = test_app(MockProvider::success()).await;
    let at = (Utc::now() + Duration::days(1)).to_rfc3339();
    let (status, body) = app
        .post(
            "/schedule-post",
            json!({ "platform": "X", "content": "Road closure tomorrow", "scheduled_for": at }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["platform"], "twitter");
    assert_eq!(body["status"], "scheduled");
}

#[tokio::test]
async fn test_schedule_post_over_limit_is_400_without_external_call() {
    let app = test_app(MockProvider::success()).await;
    let (status, _) = app
        .post(
            "/schedule-post",
            json!({ "platform": "twitter", "content": "x".repeat(300) }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.provider.calls().is_empty());
}

#[tokio::test]
async fn test_schedule_post_upstream_failure_is_500_verbatim() {
    let app = test_app(MockProvider::failing_for(Platform::Linkedin, "Account token expired")).await;
    let (status, body) = app
        .post(
            "/schedule-post",
            json!({ "platform": "linkedin", "content": "Now hiring" }),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Account token expired"));

    let (_, page) = app.get("/posts?statuses=failed").await;
    assert_eq!(page["total"], 1);
}

#[tokio::test]
async fn test_schedule_batch_reports_aggregate() {
    let app = test_app(MockProvider::with_accounts(&[Platform::Twitter])).await;
    let (status, body) = app
        .post(
            "/schedule-batch",
            json!({ "posts": [
                { "platform": "twitter", "content": "one" },
                { "platform": "instagram", "content": "two" },
                { "platform": "twitter", "content": "three" }
            ]}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["succeeded"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["results"][1]["stages"][1], "account_missing");
}

#[tokio::test]
async fn test_published_post_cannot_be_deleted_or_patched() {
    let app = test_app(MockProvider::success()).await;
    let (_, post) = app
        .post("/schedule-post", json!({ "platform": "twitter", "content": "Live" }))
        .await;
    let id = post["id"].as_str().unwrap();
    let calls_before = app.provider.calls().len();

    let (status, body) = app
        .send(Method::DELETE, &format!("/posts/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Cannot delete published posts"));

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/posts/{}", id),
            Some(json!({ "content": "Edited" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.provider.calls().len(), calls_before);

    let (status, fetched) = app.get(&format!("/posts/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["content"], "Live");
}

#[tokio::test]
async fn test_patch_with_stale_version_is_409() {
    let app = test_app(MockProvider::success()).await;
    let (_, post) = app
        .post(
            "/schedule-post",
            json!({ "platform": "facebook", "content": "Draft", "draft": true }),
        )
        .await;
    let id = post["id"].as_str().unwrap();

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/posts/{}", id),
            Some(json!({ "content": "Second", "expected_version": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["version"], 2);
    assert_eq!(body["remote"]["status"], "not_submitted");

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/posts/{}", id),
            Some(json!({ "content": "Third", "expected_version": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_delete_scheduled_post() {
    let app = test_app(MockProvider::success()).await;
    let at = (Utc::now() + Duration::hours(3)).to_rfc3339();
    let (_, post) = app
        .post(
            "/schedule-post",
            json!({ "platform": "linkedin", "content": "Town hall", "scheduled_for": at }),
        )
        .await;
    let id = post["id"].as_str().unwrap();

    let (status, body) = app.send(Method::DELETE, &format!("/posts/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remote"]["status"], "synced");

    let (status, _) = app.get(&format!("/posts/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_posts_filters_and_paginates() {
    let app = test_app(MockProvider::success()).await;
    for (platform, content) in [
        ("twitter", "Bike lanes open"),
        ("facebook", "Bike lanes open downtown"),
        ("linkedin", "Budget approved"),
    ] {
        app.post(
            "/schedule-post",
            json!({ "platform": platform, "content": content }),
        )
        .await;
    }

    let (status, page) = app.get("/posts?search=bike&limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["posts"].as_array().unwrap().len(), 1);

    let (_, page) = app.get("/posts?platforms=li").await;
    assert_eq!(page["total"], 1);

    let (status, _) = app.get("/posts?platforms=myspace").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_and_profiles() {
    let app = test_app(MockProvider::with_accounts(&[Platform::Twitter, Platform::Facebook])).await;
    app.post("/schedule-post", json!({ "platform": "twitter", "content": "hi" }))
        .await;

    let (status, stats) = app.get("/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["published"], 1);

    let (status, body) = app.get("/profiles").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profiles"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_curation_session_workflow() {
    let app = test_app(MockProvider::success()).await;

    let (status, session) = app
        .post(
            "/sessions",
            json!({
                "title": "Park Opens",
                "content": "New playground opens Saturday",
                "platforms": ["twitter", "facebook"],
                "posts_per_platform": 2
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = session["id"].as_str().unwrap().to_string();
    assert_eq!(session["entries"].as_array().unwrap().len(), 4);
    let first_text = session["entries"][0]["text"].clone();

    let (status, more) = app
        .post(
            &format!("/sessions/{}/generate", id),
            json!({ "steering_prompt": "Mention the splash pad" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(more["start"], 4);
    assert_eq!(more["session"]["entries"][0]["text"], first_text);

    let (status, edited) = app
        .send(
            Method::PATCH,
            &format!("/sessions/{}/variations/1", id),
            Some(json!({ "text": "Edited copy for the opening", "link": "https://city.example.gov/parks" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["text"], "Edited copy for the opening");

    let (_, toggled) = app
        .post(&format!("/sessions/{}/variations/1/toggle", id), json!({}))
        .await;
    assert_eq!(toggled["selected"], true);

    let (status, summary) = app
        .post(&format!("/sessions/{}/schedule", id), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["succeeded"], 1);
    assert_eq!(summary["results"][0]["post"]["content"], "Edited copy for the opening");
    assert_eq!(summary["results"][0]["post"]["link"], "https://city.example.gov/parks");

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/sessions/{}/variations/1", id),
            Some(json!({ "text": "Too late" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send(Method::DELETE, &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/sessions/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_schedule_empty_selection_is_400() {
    let app = test_app(MockProvider::success()).await;
    let (_, session) = app
        .post(
            "/sessions",
            json!({ "content": "Leaf pickup starts Monday", "platforms": ["facebook"], "posts_per_platform": 1 }),
        )
        .await;
    let id = session["id"].as_str().unwrap();

    let (status, _) = app
        .post(&format!("/sessions/{}/schedule", id), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.provider.calls().is_empty());
}

#[tokio::test]
async fn test_media_upload() {
    let app = test_app(MockProvider::success()).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/media")
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from(vec![0x89u8, b'P', b'N', b'G']))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["url"]
        .as_str()
        .unwrap()
        .starts_with("https://media.example.org/uploads/"));
    assert_eq!(body["size"], 4);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/media")
        .header(header::CONTENT_TYPE, "application/pdf")
        .body(Body::from(vec![1u8, 2, 3]))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/media")
        .header(header::CONTENT_TYPE, "image/jpeg")
        .body(Body::from(vec![0u8; 2048]))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oldest_session_evicted_beyond_cap() {
    let app = test_app_with(MockProvider::success(), |config| config.server.max_sessions = 2).await;
    let mut ids = Vec::new();
    for _ in 0..3 {
        let (status, body) = app
            .post(
                "/sessions",
                json!({ "content": "Leaf pickup starts Monday", "platforms": ["facebook"], "posts_per_platform": 1 }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(body["id"].as_str().unwrap().to_string());
        // created_at has second resolution
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    }

    let (_, health) = app.get("/health").await;
    assert_eq!(health["open_sessions"], 2);
    let (status, _) = app.get(&format!("/sessions/{}", ids[0])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/sessions/{}", ids[2])).await;
    assert_eq!(status, StatusCode::OK);
}
