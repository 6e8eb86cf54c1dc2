use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use gitcdn::api::{handlers::AppState, routes};
use gitcdn::config::{
    AssetConfig, GitHubEndpoints, OAuthConfig, ServerConfig, SessionConfig, Settings,
};
use gitcdn::session::store::{OAUTH_STATE_COOKIE, SESSION_COOKIE};
use gitcdn::session::{CookieCodec, UserSession};
use tower::ServiceExt;

const SECRET: &str = "test-secret";

fn test_settings() -> Settings {
    Settings {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            environment: "development".to_string(),
            max_request_body_size: 10485760,
        },
        oauth: OAuthConfig {
            client_id: Some("client-id".to_string()),
            client_secret: Some("client-secret".to_string()),
        },
        session: SessionConfig {
            secret: Some(SECRET.to_string()),
        },
        assets: AssetConfig {
            root: "assets".to_string(),
        },
        // Nothing in these tests may reach the network; the discard port
        // makes an accidental upstream call fail loudly
        github: GitHubEndpoints {
            api_url: "http://127.0.0.1:9".to_string(),
            oauth_url: "http://127.0.0.1:9".to_string(),
        },
    }
}

fn test_app() -> Router {
    let settings = test_settings();
    let state = AppState::new(settings.clone()).unwrap();
    routes::create_router(state, &settings)
}

fn session(repo: Option<&str>) -> UserSession {
    let now = Utc::now().timestamp_millis();
    UserSession {
        github_token: "gho_test".to_string(),
        username: "octocat".to_string(),
        avatar_url: "https://avatars.githubusercontent.com/u/1".to_string(),
        selected_repo: repo.map(String::from),
        selected_branch: None,
        issued_at: now,
        expires_at: now + 60_000,
    }
}

fn session_cookie(session: &UserSession) -> String {
    let token = CookieCodec::new(Some(SECRET)).encrypt(session).unwrap();
    format!("{SESSION_COOKIE}={token}")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_reports_configuration() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["env"], "development");
    assert_eq!(json["configured"]["oauth"], true);
    assert_eq!(json["configured"]["session_secret"], true);
}

#[tokio::test]
async fn test_assets_requires_session() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/assets")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_requires_session() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_corrupt_session_cookie_is_unauthorized() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::COOKIE, format!("{SESSION_COOKIE}=AA.BB.CC"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_session_is_unauthorized_and_cleared() {
    let mut expired = session(None);
    expired.issued_at = 1000;
    expired.expires_at = 2000;

    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::COOKIE, session_cookie(&expired))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The failing require clears the cookie
    let cleared = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|v| v.to_str().unwrap().starts_with(&format!("{SESSION_COOKIE}=")));
    assert!(cleared);
}

#[tokio::test]
async fn test_me_returns_session_summary() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(
                    header::COOKIE,
                    session_cookie(&session(Some("octocat/site"))),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["username"], "octocat");
    assert_eq!(json["selected_repo"], "octocat/site");
    assert_eq!(json["selected_branch"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_assets_without_selection_is_empty_without_upstream() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/assets")
                .header(header::COOKIE, session_cookie(&session(None)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["current_folder"], "");
    assert_eq!(json["folders"], serde_json::json!([]));
    assert_eq!(json["files"], serde_json::json!([]));
    assert_eq!(json["all_folders"], serde_json::json!([]));
}

#[tokio::test]
async fn test_assets_rejects_traversal_folder() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/assets?folder=a/../b")
                .header(header::COOKIE, session_cookie(&session(None)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_select_repo_validates_names() {
    let app = test_app();
    let cookie = session_cookie(&session(None));

    let bad_repo = Request::builder()
        .uri("/api/select-repo")
        .method("POST")
        .header(header::COOKIE, cookie.clone())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"repo":"not-a-repo"}"#))
        .unwrap();
    let response = app.clone().oneshot(bad_repo).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bad_branch = Request::builder()
        .uri("/api/select-repo")
        .method("POST")
        .header(header::COOKIE, cookie.clone())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"repo":"octocat/site","branch":"a..b"}"#))
        .unwrap();
    let response = app.clone().oneshot(bad_branch).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let ok = Request::builder()
        .uri("/api/select-repo")
        .method("POST")
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"repo":"octocat/site","branch":"main"}"#))
        .unwrap();
    let response = app.oneshot(ok).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Selection re-issues the session cookie with a fresh TTL
    let reissued = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|v| v.to_str().unwrap().starts_with(&format!("{SESSION_COOKIE}=")));
    assert!(reissued);
}

#[tokio::test]
async fn test_logout_clears_cookies() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/logout")
                .method("POST")
                .header(header::COOKIE, session_cookie(&session(None)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn test_auth_url_sets_state_cookie() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/auth/url")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let has_state_cookie = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|v| {
            let v = v.to_str().unwrap();
            v.starts_with(&format!("{OAUTH_STATE_COOKIE}=")) && v.contains("HttpOnly")
        });
    assert!(has_state_cookie);

    let json = body_json(response).await;
    let url = json["url"].as_str().unwrap();
    assert!(url.contains("/login/oauth/authorize"));
    assert!(url.contains("state="));
}

#[tokio::test]
async fn test_auth_url_requires_oauth_config() {
    let mut settings = test_settings();
    settings.oauth.client_id = None;
    settings.oauth.client_secret = None;
    let state = AppState::new(settings.clone()).unwrap();
    let app = routes::create_router(state, &settings);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/url")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_callback_without_state_cookie_fails_in_html() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/auth/callback?code=abc&state=xyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // The popup flow always gets a terminal HTML document
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.contains("postMessage"));
    assert!(text.contains("\"success\":false"));
}

#[tokio::test]
async fn test_callback_with_mismatched_state_fails() {
    let codec = CookieCodec::new(Some(SECRET));
    let stored = gitcdn::session::OAuthState {
        state: "expected".to_string(),
        expires_at: Utc::now().timestamp_millis() + 60_000,
    };
    let token = codec.encrypt(&stored).unwrap();

    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/auth/callback?code=abc&state=different")
                .header(header::COOKIE, format!("{OAUTH_STATE_COOKIE}={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|v| v.to_str().unwrap().starts_with(&format!("{OAUTH_STATE_COOKIE}=")));
    assert!(cleared, "state cookie must be consumed even on mismatch");

    let text = body_text(response).await;
    assert!(text.contains("\"success\":false"));
}

#[tokio::test]
async fn test_move_to_same_folder_is_rejected_without_network() {
    // The bogus GitHub endpoint guarantees this 400 happened before any
    // upstream call
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/assets/move")
                .method("POST")
                .header(
                    header::COOKIE,
                    session_cookie(&session(Some("octocat/site"))),
                )
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"path":"a/logo.png","destination_folder":"a"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_requires_selection() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/upload")
                .method("POST")
                .header(header::COOKIE, session_cookie(&session(None)))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"content":"aGVsbG8="}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_rejects_invalid_base64() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/upload")
                .method("POST")
                .header(
                    header::COOKIE,
                    session_cookie(&session(Some("octocat/site"))),
                )
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"content":"not valid base64!!!"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_asset_rejects_traversal() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/assets?path=../../etc/passwd&sha=abc")
                .method("DELETE")
                .header(
                    header::COOKIE,
                    session_cookie(&session(Some("octocat/site"))),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
