//! Folder/file hierarchy synthesized from GitHub's flat blob tree.
//!
//! GitHub's tree object has no native folder concept: folders here are a
//! derived projection over blob path prefixes, with a `.gitkeep` marker blob
//! standing in for otherwise-empty folders.

use crate::error::{Error, Result};
use crate::github::models::TreeEntry;
use crate::github::GitHubClient;
use crate::session::UserSession;
use crate::utils::{sanitize, validation};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// Marker blob that makes an empty folder visible without being an asset.
pub const FOLDER_MARKER: &str = ".gitkeep";

const DEFAULT_BRANCH: &str = "main";

/// The repository and branch a session operates on. Derived from the
/// session on every request, never persisted separately.
#[derive(Debug, Clone)]
pub struct RepoSelection {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl RepoSelection {
    /// Resolve the session's selection. The branch falls back to "main"
    /// when unset or invalid; a missing or malformed repository is an
    /// error because every asset operation needs one.
    pub fn from_session(session: &UserSession) -> Result<Self> {
        let full_name = session
            .selected_repo
            .as_deref()
            .ok_or_else(|| Error::Validation("No repository selected".to_string()))?;
        let (owner, repo) = validation::validate_repo_full_name(full_name)?;

        let branch = session
            .selected_branch
            .as_deref()
            .filter(|b| validation::is_valid_branch(b))
            .unwrap_or(DEFAULT_BRANCH)
            .to_string();

        Ok(Self { owner, repo, branch })
    }
}

/// One tree blob under the asset root, before hierarchy assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetBlobEntry {
    pub repo_path: String,
    pub relative_path: String,
    pub sha: String,
    pub size: u64,
}

/// A file in the synthesized hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetFile {
    pub name: String,
    pub path: String,
    pub folder: String,
    pub sha: String,
    pub size: u64,
    pub download_url: String,
}

/// A folder in the synthesized hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetFolder {
    pub path: String,
    pub name: String,
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Inventory {
    pub files: Vec<AssetFile>,
    pub folders: Vec<AssetFolder>,
}

/// Public delivery URL through the jsDelivr mirror
pub fn cdn_url(selection: &RepoSelection, asset_root: &str, relative_path: &str) -> String {
    format!(
        "https://cdn.jsdelivr.net/gh/{}/{}@{}/{}/{}",
        selection.owner, selection.repo, selection.branch, asset_root, relative_path
    )
}

/// Filter a recursive tree listing down to sanitized blob entries under the
/// asset root. Entries whose relative path fails sanitization are dropped.
pub fn collect_blobs(entries: &[TreeEntry], asset_root: &str) -> Vec<AssetBlobEntry> {
    let prefix = format!("{asset_root}/");

    entries
        .iter()
        .filter(|entry| entry.entry_type == "blob")
        .filter_map(|entry| {
            let raw_relative = entry.path.strip_prefix(&prefix)?;
            let relative_path = sanitize::normalize_asset_path(raw_relative, "")?;
            Some(AssetBlobEntry {
                repo_path: entry.path.clone(),
                relative_path,
                sha: entry.sha.clone(),
                size: entry.size.unwrap_or(0),
            })
        })
        .collect()
}

/// Reconstruct the folder/file hierarchy from a flat blob list.
///
/// Every ancestor of a file's folder appears in the folder set even when it
/// has no direct children; `.gitkeep` blobs contribute their folder but are
/// excluded from the file list. Output is sorted lexicographically by path.
pub fn assemble(
    blobs: &[AssetBlobEntry],
    selection: &RepoSelection,
    asset_root: &str,
) -> Inventory {
    let mut folder_set: BTreeSet<String> = BTreeSet::new();
    let mut files = Vec::new();

    for blob in blobs {
        let (folder, name) = match blob.relative_path.rsplit_once('/') {
            Some((folder, name)) => (folder, name),
            None => ("", blob.relative_path.as_str()),
        };

        insert_with_ancestors(&mut folder_set, folder);

        if name == FOLDER_MARKER {
            continue;
        }

        files.push(AssetFile {
            name: name.to_string(),
            path: blob.relative_path.clone(),
            folder: folder.to_string(),
            sha: blob.sha.clone(),
            size: blob.size,
            download_url: cdn_url(selection, asset_root, &blob.relative_path),
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));

    let folders = folder_set
        .into_iter()
        .map(|path| {
            let (parent, name) = match path.rsplit_once('/') {
                Some((parent, name)) => (Some(parent.to_string()), name.to_string()),
                None => (None, path.clone()),
            };
            AssetFolder { path, name, parent }
        })
        .collect();

    Inventory { files, folders }
}

fn insert_with_ancestors(folder_set: &mut BTreeSet<String>, folder: &str) {
    if folder.is_empty() {
        return;
    }
    let mut end = folder.len();
    loop {
        folder_set.insert(folder[..end].to_string());
        match folder[..end].rfind('/') {
            Some(slash) => end = slash,
            None => break,
        }
    }
}

/// Fetch the sanitized blob list for the selection's branch tip.
///
/// A 404 anywhere along the branch/commit/tree chain means the repository,
/// branch, or asset root does not exist yet and yields an empty list.
pub async fn load_blobs(
    client: &GitHubClient,
    token: &str,
    selection: &RepoSelection,
    asset_root: &str,
) -> Result<Vec<AssetBlobEntry>> {
    let commit_sha = match client
        .get_branch_commit(token, &selection.owner, &selection.repo, &selection.branch)
        .await
    {
        Ok(sha) => sha,
        Err(Error::NotFound(_)) => {
            debug!(
                "Branch {}/{}@{} not found, treating as empty",
                selection.owner, selection.repo, selection.branch
            );
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let commit = client
        .get_commit(token, &selection.owner, &selection.repo, &commit_sha)
        .await?;

    let tree = match client
        .get_tree(token, &selection.owner, &selection.repo, &commit.commit.tree.sha)
        .await
    {
        Ok(tree) => tree,
        Err(Error::NotFound(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    Ok(collect_blobs(&tree.tree, asset_root))
}

/// Build the full inventory for a selection
pub async fn build_inventory(
    client: &GitHubClient,
    token: &str,
    selection: &RepoSelection,
    asset_root: &str,
) -> Result<Inventory> {
    let blobs = load_blobs(client, token, selection, asset_root).await?;
    Ok(assemble(&blobs, selection, asset_root))
}
