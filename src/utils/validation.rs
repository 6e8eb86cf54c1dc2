// Repository and branch name validation
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static REPO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").unwrap());

/// Path-safe branch pattern: must not start with a dot, may contain slash
/// separated segments of letters, digits, dot, dash, underscore.
static BRANCH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._/-]{0,199}$").unwrap());

/// Validate an "owner/name" repository string, returning the two halves.
pub fn validate_repo_full_name(repo: &str) -> Result<(String, String)> {
    match repo.split_once('/') {
        Some((owner, name)) if REPO_RE.is_match(repo) => {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => Err(Error::Validation(format!(
            "Invalid repository name: {repo}. Expected owner/name"
        ))),
    }
}

/// Check whether a branch name is safe to embed in a GitHub API path.
pub fn is_valid_branch(branch: &str) -> bool {
    BRANCH_RE.is_match(branch) && !branch.contains("..") && !branch.ends_with('/')
}

/// Validate a branch name, surfacing the offending field on failure.
pub fn validate_branch(branch: &str) -> Result<()> {
    if is_valid_branch(branch) {
        Ok(())
    } else {
        Err(Error::Validation(format!("Invalid branch name: {branch}")))
    }
}
