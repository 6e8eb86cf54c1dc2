use serde::{Deserialize, Serialize};

/// Authenticated user state, carried entirely inside the encrypted session
/// cookie. There is no server-side session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub github_token: String,
    pub username: String,
    pub avatar_url: String,
    pub selected_repo: Option<String>,
    pub selected_branch: Option<String>,
    /// Epoch milliseconds
    pub issued_at: i64,
    /// Epoch milliseconds; always issued_at + session TTL
    pub expires_at: i64,
}

impl UserSession {
    /// A session is valid only while unexpired and carrying a token.
    pub fn is_valid(&self, now_millis: i64) -> bool {
        !self.github_token.is_empty() && now_millis <= self.expires_at
    }
}

/// One-shot CSRF token for the OAuth handshake, stored in its own
/// short-lived encrypted cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthState {
    pub state: String,
    /// Epoch milliseconds
    pub expires_at: i64,
}

impl OAuthState {
    pub fn is_valid(&self, now_millis: i64) -> bool {
        !self.state.is_empty() && now_millis <= self.expires_at
    }
}
