//! Mutating operations against the asset root.
//!
//! Folder delete and move are sequences of independent contents-API calls;
//! a failure partway through leaves the repository partially changed and is
//! surfaced to the caller, who retries or cleans up manually.

use crate::assets::inventory::{self, RepoSelection, FOLDER_MARKER};
use crate::error::{Error, Result};
use crate::github::GitHubClient;
use crate::utils::sanitize;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use rand::Rng;
use tracing::{debug, info};

/// Upload request after HTTP decoding, before sanitization
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub folder: Option<String>,
    pub name: Option<String>,
    pub content: String,
    pub message: Option<String>,
}

/// Where an asset ended up, in both relative and CDN terms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLocation {
    pub name: String,
    pub path: String,
    pub folder: String,
    pub cdn_url: String,
}

fn join_relative(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{folder}/{name}")
    }
}

fn repo_path(asset_root: &str, relative: &str) -> String {
    format!("{asset_root}/{relative}")
}

/// Split an optional data-URL wrapper off inline content, returning the
/// declared MIME type (if any) and the bare base64 payload.
fn split_data_url(content: &str) -> (Option<&str>, &str) {
    let Some(rest) = content.strip_prefix("data:") else {
        return (None, content);
    };
    let Some((header, payload)) = rest.split_once(',') else {
        return (None, content);
    };
    let mime = header.split(';').next().filter(|m| !m.is_empty());
    (mime, payload)
}

/// Validate and compact a base64 payload (data-URL payloads and GitHub
/// content responses both carry embedded newlines).
fn clean_base64(payload: &str) -> Result<String> {
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(Error::Validation("content must not be empty".to_string()));
    }
    STANDARD
        .decode(&compact)
        .map_err(|_| Error::Validation("content must be base64-encoded".to_string()))?;
    Ok(compact)
}

fn extension_from_name(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn extension_from_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        "text/plain" => Some("txt"),
        "application/json" => Some("json"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}

/// Resolve the final file name: the caller's name when it survives
/// sanitization, otherwise a synthesized timestamp-plus-random-hex name
/// with a best-effort extension.
fn resolve_name(raw_name: Option<&str>, mime: Option<&str>) -> String {
    if let Some(name) = raw_name.and_then(sanitize::sanitize_asset_name) {
        return name;
    }

    let timestamp = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen();

    let extension = raw_name
        .and_then(extension_from_name)
        .or_else(|| mime.and_then(extension_from_mime).map(str::to_string));

    match extension {
        Some(ext) => format!("{timestamp}-{suffix:08x}.{ext}"),
        None => format!("{timestamp}-{suffix:08x}"),
    }
}

/// Create or update a blob under the asset root from inline base64 content
pub async fn upload(
    client: &GitHubClient,
    token: &str,
    selection: &RepoSelection,
    asset_root: &str,
    request: &UploadRequest,
) -> Result<AssetLocation> {
    let folder = sanitize::normalize_folder(request.folder.as_deref(), asset_root)
        .ok_or_else(|| Error::Validation("Invalid folder path".to_string()))?;

    let (mime, payload) = split_data_url(&request.content);
    let content = clean_base64(payload)?;

    let name = resolve_name(request.name.as_deref(), mime);
    let relative = join_relative(&folder, &name);
    let target = repo_path(asset_root, &relative);

    // An update must carry the current blob sha
    let existing_sha = match client
        .get_content(token, &selection.owner, &selection.repo, &target, &selection.branch)
        .await
    {
        Ok(existing) => Some(existing.sha),
        Err(Error::NotFound(_)) => None,
        Err(e) => return Err(e),
    };

    let message = request
        .message
        .clone()
        .unwrap_or_else(|| format!("Upload {target}"));

    client
        .put_content(
            token,
            &selection.owner,
            &selection.repo,
            &target,
            &selection.branch,
            &content,
            &message,
            existing_sha.as_deref(),
        )
        .await?;

    info!("Uploaded {} to {}/{}", target, selection.owner, selection.repo);

    Ok(AssetLocation {
        cdn_url: inventory::cdn_url(selection, asset_root, &relative),
        name,
        path: relative,
        folder,
    })
}

/// Delete a single blob by its exact relative path and current sha
pub async fn delete_asset(
    client: &GitHubClient,
    token: &str,
    selection: &RepoSelection,
    asset_root: &str,
    path: &str,
    sha: &str,
) -> Result<()> {
    let relative = sanitize::normalize_asset_path(path, asset_root)
        .ok_or_else(|| Error::Validation("Invalid asset path".to_string()))?;
    if sha.trim().is_empty() {
        return Err(Error::Validation("Missing blob sha".to_string()));
    }

    let target = repo_path(asset_root, &relative);
    client
        .delete_content(
            token,
            &selection.owner,
            &selection.repo,
            &target,
            &selection.branch,
            sha,
            &format!("Delete {target}"),
        )
        .await?;

    info!("Deleted {} from {}/{}", target, selection.owner, selection.repo);
    Ok(())
}

/// Create an empty folder by writing its marker blob
pub async fn create_folder(
    client: &GitHubClient,
    token: &str,
    selection: &RepoSelection,
    asset_root: &str,
    path: &str,
) -> Result<String> {
    let folder = sanitize::normalize_folder(Some(path), asset_root)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| Error::Validation("Invalid folder path".to_string()))?;

    let inventory = inventory::build_inventory(client, token, selection, asset_root).await?;
    if inventory.folders.iter().any(|f| f.path == folder) {
        return Err(Error::Conflict(format!("Folder already exists: {folder}")));
    }

    let marker = repo_path(asset_root, &join_relative(&folder, FOLDER_MARKER));
    client
        .put_content(
            token,
            &selection.owner,
            &selection.repo,
            &marker,
            &selection.branch,
            "",
            &format!("Create folder {asset_root}/{folder}"),
            None,
        )
        .await?;

    info!("Created folder {}/{}", asset_root, folder);
    Ok(folder)
}

/// Delete every blob under a folder prefix, one contents call per blob.
///
/// Returns the number of blobs deleted. Not transactional: the first
/// failing delete aborts the sequence and earlier deletes stay deleted.
pub async fn delete_folder(
    client: &GitHubClient,
    token: &str,
    selection: &RepoSelection,
    asset_root: &str,
    path: &str,
) -> Result<usize> {
    let folder = sanitize::normalize_folder(Some(path), asset_root)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| Error::Validation("Invalid folder path".to_string()))?;

    let blobs = inventory::load_blobs(client, token, selection, asset_root).await?;
    let prefix = format!("{folder}/");
    let members: Vec<_> = blobs
        .iter()
        .filter(|blob| blob.relative_path.starts_with(&prefix))
        .collect();

    if members.is_empty() {
        return Err(Error::NotFound(format!("Folder not found: {folder}")));
    }

    debug!("Deleting {} blobs under {}", members.len(), folder);
    for blob in &members {
        client
            .delete_content(
                token,
                &selection.owner,
                &selection.repo,
                &blob.repo_path,
                &selection.branch,
                &blob.sha,
                &format!("Delete {}", blob.repo_path),
            )
            .await?;
    }

    info!(
        "Deleted folder {}/{} ({} blobs)",
        asset_root,
        folder,
        members.len()
    );
    Ok(members.len())
}

/// Move a blob to another folder as copy-then-delete.
///
/// Not an atomic rename: a failure between the write and the delete leaves
/// both copies present, and the stale source must be removed manually.
pub async fn move_asset(
    client: &GitHubClient,
    token: &str,
    selection: &RepoSelection,
    asset_root: &str,
    path: &str,
    destination_folder: Option<&str>,
) -> Result<AssetLocation> {
    let source_relative = sanitize::normalize_asset_path(path, asset_root)
        .ok_or_else(|| Error::Validation("Invalid asset path".to_string()))?;
    let folder = sanitize::normalize_folder(destination_folder, asset_root)
        .ok_or_else(|| Error::Validation("Invalid destination folder".to_string()))?;

    let name = source_relative
        .rsplit_once('/')
        .map(|(_, name)| name)
        .unwrap_or(&source_relative)
        .to_string();
    let target_relative = join_relative(&folder, &name);

    // No-op moves are rejected before any upstream call
    if target_relative == source_relative {
        return Err(Error::Validation(
            "Source and destination are the same".to_string(),
        ));
    }

    let source = repo_path(asset_root, &source_relative);
    let target = repo_path(asset_root, &target_relative);

    if client
        .content_exists(token, &selection.owner, &selection.repo, &target, &selection.branch)
        .await?
    {
        return Err(Error::Conflict(format!(
            "An asset already exists at {target_relative}"
        )));
    }

    let blob = client
        .get_content(token, &selection.owner, &selection.repo, &source, &selection.branch)
        .await?;

    if blob.encoding.as_deref() != Some("base64") {
        return Err(Error::Internal(format!(
            "Unexpected content encoding for {source}"
        )));
    }
    let content = blob
        .content
        .as_deref()
        .map(clean_base64)
        .transpose()?
        .ok_or_else(|| Error::Internal(format!("Missing content for {source}")))?;

    let message = format!("Move {source} -> {target}");
    client
        .put_content(
            token,
            &selection.owner,
            &selection.repo,
            &target,
            &selection.branch,
            &content,
            &message,
            None,
        )
        .await?;

    client
        .delete_content(
            token,
            &selection.owner,
            &selection.repo,
            &source,
            &selection.branch,
            &blob.sha,
            &message,
        )
        .await?;

    info!("Moved {} -> {}", source, target);

    Ok(AssetLocation {
        cdn_url: inventory::cdn_url(selection, asset_root, &target_relative),
        name,
        path: target_relative,
        folder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_data_url() {
        assert_eq!(
            split_data_url("data:image/png;base64,AAAA"),
            (Some("image/png"), "AAAA")
        );
        assert_eq!(split_data_url("AAAA"), (None, "AAAA"));
        // malformed data-URL with no comma passes through untouched
        assert_eq!(split_data_url("data:image/png"), (None, "data:image/png"));
    }

    #[test]
    fn test_clean_base64() {
        assert_eq!(clean_base64("aGVs\nbG8=").unwrap(), "aGVsbG8=");
        assert!(clean_base64("not base64!!!").is_err());
        assert!(clean_base64("").is_err());
        assert!(clean_base64("\n  \n").is_err());
    }

    #[test]
    fn test_extension_from_name() {
        assert_eq!(extension_from_name("logo.PNG"), Some("png".to_string()));
        assert_eq!(extension_from_name("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(extension_from_name("noext"), None);
        assert_eq!(extension_from_name("trailing."), None);
        assert_eq!(extension_from_name("weird.p@g"), None);
    }

    #[test]
    fn test_resolve_name_prefers_sanitized_caller_name() {
        assert_eq!(
            resolve_name(Some("logo.png"), Some("image/png")),
            "logo.png"
        );
    }

    #[test]
    fn test_resolve_name_synthesizes_with_original_extension() {
        let name = resolve_name(Some("../evil.png"), None);
        assert!(name.ends_with(".png"), "got {name}");
        assert!(!name.contains('/'));
        assert!(sanitize::sanitize_asset_name(&name).is_some());
    }

    #[test]
    fn test_resolve_name_falls_back_to_mime() {
        let name = resolve_name(None, Some("image/webp"));
        assert!(name.ends_with(".webp"), "got {name}");
    }

    #[test]
    fn test_resolve_name_without_any_hint() {
        let name = resolve_name(None, None);
        assert!(!name.contains('.'), "got {name}");
        assert!(sanitize::sanitize_asset_name(&name).is_some());
    }

    #[test]
    fn test_join_relative() {
        assert_eq!(join_relative("", "x.png"), "x.png");
        assert_eq!(join_relative("a/b", "x.png"), "a/b/x.png");
    }
}
