use crate::assets::inventory::AssetFile;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub env: String,
    pub configured: ConfiguredFlags,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfiguredFlags {
    pub oauth: bool,
    pub session_secret: bool,
}

/// GET /api/auth/url response
#[derive(Debug, Clone, Serialize)]
pub struct AuthUrlResponse {
    pub url: String,
}

/// OAuth callback query parameters
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Session summary for GET /api/me
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub username: String,
    pub avatar_url: String,
    pub selected_repo: Option<String>,
    pub selected_branch: Option<String>,
}

/// One repository in GET /api/repos
#[derive(Debug, Clone, Serialize)]
pub struct RepoSummary {
    pub full_name: String,
    pub name: String,
    #[serde(rename = "private")]
    pub is_private: bool,
    pub default_branch: String,
}

/// POST /api/select-repo request
#[derive(Debug, Clone, Deserialize)]
pub struct SelectRepoRequest {
    pub repo: String,
    #[serde(default)]
    pub branch: Option<String>,
}

/// Asset listing query parameters
#[derive(Debug, Clone, Deserialize)]
pub struct AssetListParams {
    #[serde(default)]
    pub folder: Option<String>,
}

/// GET /api/assets response
#[derive(Debug, Clone, Serialize)]
pub struct AssetListResponse {
    pub current_folder: String,
    pub folders: Vec<FolderSummary>,
    pub files: Vec<AssetFile>,
    pub all_folders: Vec<String>,
}

/// One folder entry in the asset listing
#[derive(Debug, Clone, Serialize)]
pub struct FolderSummary {
    pub name: String,
    pub path: String,
}

/// GET /api/folders response
#[derive(Debug, Clone, Serialize)]
pub struct FoldersResponse {
    pub folders: Vec<crate::assets::inventory::AssetFolder>,
}

/// POST /api/folders request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFolderRequest {
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateFolderResponse {
    pub success: bool,
    pub path: String,
}

/// DELETE /api/folders query parameters
#[derive(Debug, Clone, Deserialize)]
pub struct FolderPathParams {
    pub path: String,
}

/// POST /api/upload request
#[derive(Debug, Clone, Deserialize)]
pub struct UploadParams {
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub content: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub name: String,
    pub path: String,
    pub folder: String,
    pub cdn_url: String,
}

/// POST /api/assets/move request
#[derive(Debug, Clone, Deserialize)]
pub struct MoveParams {
    pub path: String,
    #[serde(default)]
    pub destination_folder: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoveResponse {
    pub success: bool,
    pub path: String,
    pub folder: String,
    pub cdn_url: String,
}

/// DELETE /api/assets query parameters
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteAssetParams {
    pub path: String,
    pub sha: String,
}

/// DELETE /api/assets/:name query parameters
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteNamedParams {
    pub sha: String,
}

/// Generic mutation acknowledgement
#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}
