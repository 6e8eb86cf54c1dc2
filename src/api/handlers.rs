use axum::{
    extract::{Path, Query, State},
    response::Html,
    Json,
};
use tower_cookies::Cookies;
use tracing::{debug, warn};

use crate::assets::inventory::{self, RepoSelection};
use crate::assets::ops::{self, UploadRequest};
use crate::auth;
use crate::github::GitHubClient;
use crate::session::{CookieCodec, SessionStore, UserSession};
use crate::utils::{sanitize, validation};
use crate::{api::models::*, Error, Result, Settings};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub sessions: SessionStore,
    pub github: GitHubClient,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self> {
        let codec = CookieCodec::new(settings.session.secret.as_deref());
        let sessions = SessionStore::new(codec, settings.server.secure_cookies());
        let github = GitHubClient::new(settings.github.clone())?;

        Ok(Self {
            settings,
            sessions,
            github,
        })
    }

    fn asset_root(&self) -> &str {
        &self.settings.assets.root
    }
}

/// GET /api/health - Service and configuration status
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        env: state.settings.server.environment.clone(),
        configured: ConfiguredFlags {
            oauth: state.settings.oauth.is_configured(),
            session_secret: state.settings.session.secret.is_some(),
        },
    })
}

/// GET /api/auth/url - Mint an OAuth state cookie and return the authorize URL
pub async fn auth_url(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Json<AuthUrlResponse>> {
    if !state.settings.oauth.is_configured() {
        return Err(Error::Config(
            "GitHub OAuth is not configured".to_string(),
        ));
    }

    let oauth_state = auth::mint_state();
    state.sessions.write_state(&cookies, &oauth_state)?;

    let url = auth::authorize_url(&state.settings, &oauth_state)?;
    Ok(Json(AuthUrlResponse { url }))
}

/// GET /api/auth/callback - Complete the handshake and set the session cookie
///
/// Always answers with the terminal HTML page so a popup-style flow can
/// notify its opener, whatever the outcome.
pub async fn auth_callback(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(params): Query<CallbackParams>,
) -> Html<String> {
    let origin = state
        .settings
        .server
        .origin()
        .unwrap_or_else(|_| state.settings.server.base_url.clone());

    match complete_callback(&state, &cookies, &params).await {
        Ok(session) => {
            debug!("OAuth callback succeeded for {}", session.username);
            Html(auth::callback_page(&origin, true, ""))
        }
        Err(e) => {
            warn!("OAuth callback failed: {}", e.log_safe());
            Html(auth::callback_page(&origin, false, &e.log_safe()))
        }
    }
}

async fn complete_callback(
    state: &AppState,
    cookies: &Cookies,
    params: &CallbackParams,
) -> Result<UserSession> {
    // The state cookie is consumed whether or not the values match
    let stored = state
        .sessions
        .take_state(cookies)
        .ok_or_else(|| Error::Validation("Missing or expired OAuth state".to_string()))?;

    let presented = params
        .state
        .as_deref()
        .ok_or_else(|| Error::Validation("Missing state parameter".to_string()))?;
    if stored.state != presented {
        return Err(Error::Validation("OAuth state mismatch".to_string()));
    }

    let code = params
        .code
        .as_deref()
        .ok_or_else(|| Error::Validation("Missing code parameter".to_string()))?;

    let (client_id, client_secret) = match (
        state.settings.oauth.client_id.as_deref(),
        state.settings.oauth.client_secret.as_deref(),
    ) {
        (Some(id), Some(secret)) => (id, secret),
        _ => {
            return Err(Error::Config(
                "GitHub OAuth is not configured".to_string(),
            ))
        }
    };

    let token = state
        .github
        .exchange_code(client_id, client_secret, code)
        .await?;
    let user = state.github.get_user(&token).await?;

    // Re-authenticating keeps the previously selected repo/branch, even when
    // the old session has already expired
    let previous = state.sessions.peek(cookies);

    state.sessions.issue(
        cookies,
        UserSession {
            github_token: token,
            username: user.login,
            avatar_url: user.avatar_url,
            selected_repo: previous.as_ref().and_then(|s| s.selected_repo.clone()),
            selected_branch: previous.as_ref().and_then(|s| s.selected_branch.clone()),
            issued_at: 0,
            expires_at: 0,
        },
    )
}

/// GET /api/me - Current session summary
pub async fn me(State(state): State<AppState>, cookies: Cookies) -> Result<Json<MeResponse>> {
    let session = state.sessions.require(&cookies)?;
    Ok(Json(MeResponse {
        username: session.username,
        avatar_url: session.avatar_url,
        selected_repo: session.selected_repo,
        selected_branch: session.selected_branch,
    }))
}

/// POST /api/logout - Clear session and any stray OAuth-state cookie
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Json<SuccessResponse> {
    state.sessions.clear_session(&cookies);
    state.sessions.clear_state(&cookies);
    Json(SuccessResponse { success: true })
}

/// GET /api/repos - The authenticated user's repositories
pub async fn list_repos(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Json<Vec<RepoSummary>>> {
    let session = state.sessions.require(&cookies)?;

    let repositories = state
        .github
        .list_repositories(&session.github_token)
        .await?;

    Ok(Json(
        repositories
            .into_iter()
            .map(|repo| RepoSummary {
                full_name: repo.full_name,
                name: repo.name,
                is_private: repo.is_private,
                default_branch: repo.default_branch,
            })
            .collect(),
    ))
}

/// POST /api/select-repo - Validate and store the repo/branch selection
pub async fn select_repo(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(params): Json<SelectRepoRequest>,
) -> Result<Json<SuccessResponse>> {
    let mut session = state.sessions.require(&cookies)?;

    validation::validate_repo_full_name(&params.repo)?;
    if let Some(branch) = params.branch.as_deref() {
        validation::validate_branch(branch)?;
    }

    session.selected_repo = Some(params.repo);
    session.selected_branch = params.branch;

    // Selection changes re-issue the session with a fresh TTL
    state.sessions.issue(&cookies, session)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/assets - Listing for one folder of the synthesized hierarchy
pub async fn list_assets(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(params): Query<AssetListParams>,
) -> Result<Json<AssetListResponse>> {
    let session = state.sessions.require(&cookies)?;

    let current_folder = sanitize::normalize_folder(params.folder.as_deref(), state.asset_root())
        .ok_or_else(|| Error::Validation("Invalid folder path".to_string()))?;

    // No repository selected yet: an empty bucket, no upstream call
    if session.selected_repo.is_none() {
        return Ok(Json(AssetListResponse {
            current_folder,
            folders: Vec::new(),
            files: Vec::new(),
            all_folders: Vec::new(),
        }));
    }

    let selection = RepoSelection::from_session(&session)?;
    let inventory = inventory::build_inventory(
        &state.github,
        &session.github_token,
        &selection,
        state.asset_root(),
    )
    .await?;

    let child_parent = if current_folder.is_empty() {
        None
    } else {
        Some(current_folder.as_str())
    };

    let folders = inventory
        .folders
        .iter()
        .filter(|f| f.parent.as_deref() == child_parent)
        .map(|f| FolderSummary {
            name: f.name.clone(),
            path: f.path.clone(),
        })
        .collect();

    let files = inventory
        .files
        .iter()
        .filter(|f| f.folder == current_folder)
        .cloned()
        .collect();

    let all_folders = inventory.folders.iter().map(|f| f.path.clone()).collect();

    Ok(Json(AssetListResponse {
        current_folder,
        folders,
        files,
        all_folders,
    }))
}

/// GET /api/folders - Full folder hierarchy
pub async fn list_folders(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Json<FoldersResponse>> {
    let session = state.sessions.require(&cookies)?;

    if session.selected_repo.is_none() {
        return Ok(Json(FoldersResponse {
            folders: Vec::new(),
        }));
    }

    let selection = RepoSelection::from_session(&session)?;
    let inventory = inventory::build_inventory(
        &state.github,
        &session.github_token,
        &selection,
        state.asset_root(),
    )
    .await?;

    Ok(Json(FoldersResponse {
        folders: inventory.folders,
    }))
}

/// POST /api/folders - Create a folder via its marker blob
pub async fn create_folder(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(params): Json<CreateFolderRequest>,
) -> Result<Json<CreateFolderResponse>> {
    let session = state.sessions.require(&cookies)?;
    let selection = RepoSelection::from_session(&session)?;

    let path = ops::create_folder(
        &state.github,
        &session.github_token,
        &selection,
        state.asset_root(),
        &params.path,
    )
    .await?;

    Ok(Json(CreateFolderResponse {
        success: true,
        path,
    }))
}

/// DELETE /api/folders?path= - Delete every blob under a folder
pub async fn delete_folder(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(params): Query<FolderPathParams>,
) -> Result<Json<SuccessResponse>> {
    let session = state.sessions.require(&cookies)?;
    let selection = RepoSelection::from_session(&session)?;

    ops::delete_folder(
        &state.github,
        &session.github_token,
        &selection,
        state.asset_root(),
        &params.path,
    )
    .await?;

    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/upload - Create or update an asset from inline base64 content
pub async fn upload(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(params): Json<UploadParams>,
) -> Result<Json<UploadResponse>> {
    let session = state.sessions.require(&cookies)?;
    let selection = RepoSelection::from_session(&session)?;

    let location = ops::upload(
        &state.github,
        &session.github_token,
        &selection,
        state.asset_root(),
        &UploadRequest {
            folder: params.folder,
            name: params.name,
            content: params.content,
            message: params.message,
        },
    )
    .await?;

    Ok(Json(UploadResponse {
        success: true,
        name: location.name,
        path: location.path,
        folder: location.folder,
        cdn_url: location.cdn_url,
    }))
}

/// POST /api/assets/move - Relocate an asset to another folder
pub async fn move_asset(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(params): Json<MoveParams>,
) -> Result<Json<MoveResponse>> {
    let session = state.sessions.require(&cookies)?;
    let selection = RepoSelection::from_session(&session)?;

    let location = ops::move_asset(
        &state.github,
        &session.github_token,
        &selection,
        state.asset_root(),
        &params.path,
        params.destination_folder.as_deref(),
    )
    .await?;

    Ok(Json(MoveResponse {
        success: true,
        path: location.path,
        folder: location.folder,
        cdn_url: location.cdn_url,
    }))
}

/// DELETE /api/assets?path=&sha= - Delete one asset by path and sha
pub async fn delete_asset(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(params): Query<DeleteAssetParams>,
) -> Result<Json<SuccessResponse>> {
    let session = state.sessions.require(&cookies)?;
    let selection = RepoSelection::from_session(&session)?;

    ops::delete_asset(
        &state.github,
        &session.github_token,
        &selection,
        state.asset_root(),
        &params.path,
        &params.sha,
    )
    .await?;

    Ok(Json(SuccessResponse { success: true }))
}

/// DELETE /api/assets/:name?sha= - Delete a root-level asset by name
pub async fn delete_asset_named(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(name): Path<String>,
    Query(params): Query<DeleteNamedParams>,
) -> Result<Json<SuccessResponse>> {
    let session = state.sessions.require(&cookies)?;
    let selection = RepoSelection::from_session(&session)?;

    let name = sanitize::sanitize_asset_name(&name)
        .ok_or_else(|| Error::Validation("Invalid asset name".to_string()))?;

    ops::delete_asset(
        &state.github,
        &session.github_token,
        &selection,
        state.asset_root(),
        &name,
        &params.sha,
    )
    .await?;

    Ok(Json(SuccessResponse { success: true }))
}
