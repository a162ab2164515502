//! Server-side modules for the Standup sync server.

pub mod auth;
pub mod config;
pub mod routes;
pub mod storage;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use auth::ApiKeyStore;
pub use config::Config;
pub use storage::WorkItemStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub api_keys: Arc<ApiKeyStore>,
    pub store: WorkItemStore,
}

/// Builds the router: `/health` is public, everything else needs a key.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(routes::health));

    let protected_routes = Router::new()
        .route("/me", get(routes::me))
        .route("/work-items", get(routes::list_work_items))
        .route("/work-items/commit", post(routes::commit_work_items))
        .route("/team/work-items", get(routes::team_work_items))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::config::ApiKeyEntry;
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    async fn app() -> (TempDir, Router) {
        let temp_dir = tempdir().unwrap();
        let store = WorkItemStore::open(&temp_dir.path().join("standup.db"))
            .await
            .unwrap();
        let api_keys = ApiKeyStore::from_entries([
            ApiKeyEntry {
                key: "alice-key".to_string(),
                user_id: "alice".to_string(),
                group_id: "team".to_string(),
            },
            ApiKeyEntry {
                key: "bob-key".to_string(),
                user_id: "bob".to_string(),
                group_id: "team".to_string(),
            },
        ]);
        let state = AppState {
            api_keys: Arc::new(api_keys),
            store,
        };
        (temp_dir, router(state))
    }

    fn get(uri: &str, key: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", key))
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, key: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", key))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn work_item(client_id: &str, minutes: u32) -> Value {
        json!({
            "clientId": client_id,
            "date": "2025-03-14",
            "task": {"kind": "task", "name": "JIRA-1"},
            "description": "review",
            "durationMinutes": minutes,
            "status": "in_progress",
            "createdBy": "alice"
        })
    }

    #[tokio::test]
    async fn test_health_needs_no_auth() {
        let (_dir, app) = app().await;
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_auth_errors() {
        let (_dir, app) = app().await;

        let missing = Request::builder().uri("/me").body(Body::empty()).unwrap();
        let (status, body) = send(&app, missing).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "missing_auth");

        let basic = Request::builder()
            .uri("/me")
            .header(header::AUTHORIZATION, "Basic abc")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, basic).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_auth");

        let (status, body) = send(&app, get("/me", "wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_key");
    }

    #[tokio::test]
    async fn test_me() {
        let (_dir, app) = app().await;
        let (status, body) = send(&app, get("/me", "alice-key")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"userId": "alice", "groupId": "team"}));
    }

    #[tokio::test]
    async fn test_commit_then_load_day() {
        let (_dir, app) = app().await;
        let commit = json!({"added": [work_item("c1", 30)], "updated": [], "deleted": []});

        let (status, body) = send(&app, post_json("/work-items/commit", "alice-key", commit)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["values"][0]["clientId"], "c1");
        let id = body["values"][0]["id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, get("/work-items?date=2025-03-14", "alice-key")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], id.as_str());
        assert_eq!(body[0]["durationMinutes"], 30);

        let (_, body) = send(&app, get("/work-items?date=2025-03-14", "bob-key")).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_resent_add_returns_existing_id() {
        let (_dir, app) = app().await;
        let commit = json!({"added": [work_item("c1", 30)], "updated": [], "deleted": []});

        let (_, first) = send(
            &app,
            post_json("/work-items/commit", "alice-key", commit.clone()),
        )
        .await;
        let (_, second) = send(&app, post_json("/work-items/commit", "alice-key", commit)).await;

        assert_eq!(first["values"][0]["id"], second["values"][0]["id"]);
    }

    #[tokio::test]
    async fn test_invalid_items_are_skipped() {
        let (_dir, app) = app().await;
        let commit = json!({
            "added": [work_item("good", 30), work_item("bad", 1500)],
            "updated": [],
            "deleted": []
        });

        let (status, body) = send(&app, post_json("/work-items/commit", "alice-key", commit)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["values"].as_array().unwrap().len(), 1);
        assert_eq!(body["values"][0]["clientId"], "good");
        assert!(body["message"].as_str().unwrap().contains("bad"));

        let (_, day) = send(&app, get("/work-items?date=2025-03-14", "alice-key")).await;
        let day = day.as_array().unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0]["clientId"], "good");
    }

    #[tokio::test]
    async fn test_invalid_update_leaves_stored_item() {
        let (_dir, app) = app().await;
        let commit = json!({"added": [work_item("c1", 30)], "updated": [], "deleted": []});
        let (_, body) = send(&app, post_json("/work-items/commit", "alice-key", commit)).await;
        let id = body["values"][0]["id"].as_str().unwrap().to_string();

        let mut update = work_item("c1", 2000);
        update["id"] = json!(id);
        let commit = json!({"added": [], "updated": [update], "deleted": []});
        let (_, body) = send(&app, post_json("/work-items/commit", "alice-key", commit)).await;
        assert_eq!(body["ok"], true);

        let (_, day) = send(&app, get("/work-items?date=2025-03-14", "alice-key")).await;
        assert_eq!(day[0]["durationMinutes"], 30);
    }

    #[tokio::test]
    async fn test_team_work_items() {
        let (_dir, app) = app().await;
        for key in ["alice-key", "bob-key"] {
            let commit = json!({"added": [work_item("c1", 60)], "updated": [], "deleted": []});
            send(&app, post_json("/work-items/commit", key, commit)).await;
        }

        let (status, body) = send(&app, get("/team/work-items?date=2025-03-14", "bob-key")).await;

        assert_eq!(status, StatusCode::OK);
        let users: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["createdBy"].as_str().unwrap())
            .collect();
        assert_eq!(users, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_missing_date_is_bad_request() {
        let (_dir, app) = app().await;
        let (status, _) = send(&app, get("/work-items", "alice-key")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
