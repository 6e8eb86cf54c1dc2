use axum::http::{header, HeaderValue, Method};
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::time::Duration;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::warn;

use crate::api::handlers::{self, AppState};
use crate::config::Settings;

/// Create the router with all API endpoints
pub fn create_router(state: AppState, settings: &Settings) -> Router {
    let api_routes = Router::new()
        // Health and configuration
        .route("/health", get(handlers::health_check))
        // OAuth handshake
        .route("/auth/url", get(handlers::auth_url))
        .route("/auth/callback", get(handlers::auth_callback))
        // Session
        .route("/me", get(handlers::me))
        .route("/logout", post(handlers::logout))
        // Repository selection
        .route("/repos", get(handlers::list_repos))
        .route("/select-repo", post(handlers::select_repo))
        // Assets
        .route(
            "/assets",
            get(handlers::list_assets).delete(handlers::delete_asset),
        )
        .route("/assets/move", post(handlers::move_asset))
        .route("/assets/:name", delete(handlers::delete_asset_named))
        .route("/upload", post(handlers::upload))
        // Folders
        .route(
            "/folders",
            get(handlers::list_folders)
                .post(handlers::create_folder)
                .delete(handlers::delete_folder),
        )
        .with_state(state);

    // Cookie-authenticated API: CORS is pinned to the app's own origin with
    // credentials allowed, rather than open to any origin
    let cors = match settings
        .server
        .origin()
        .ok()
        .and_then(|origin| origin.parse::<HeaderValue>().ok())
    {
        Some(origin) => CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .allow_origin(origin)
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600)),
        None => {
            warn!("APP_BASE_URL is not a usable CORS origin; cross-origin requests disabled");
            CorsLayer::new()
        }
    };

    Router::new()
        .nest("/api", api_routes)
        .layer(CookieManagerLayer::new())
        .layer(
            // Request body size limit - uploads arrive inline as base64
            RequestBodyLimitLayer::new(settings.server.max_request_body_size),
        )
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(
                // the OAuth callback page carries an inline script
                "default-src 'self'; script-src 'self' 'unsafe-inline'; img-src 'self' data: https:; object-src 'none'; base-uri 'self'",
            ),
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
