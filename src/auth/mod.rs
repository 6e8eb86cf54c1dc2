//! GitHub OAuth handshake helpers.
//!
//! The handshake moves `NO_SESSION -> AWAITING_CALLBACK -> AUTHENTICATED`;
//! the state token lives in its own short-lived encrypted cookie and is
//! consumed exactly once by the callback.

use crate::config::Settings;
use crate::error::{Error, Result};
use rand::Rng;
use serde_json::json;
use std::fmt::Write as _;
use url::Url;

const OAUTH_SCOPE: &str = "repo read:user";

/// Random state token for CSRF protection, 32 hex characters
pub fn mint_state() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    let mut state = String::with_capacity(32);
    for byte in bytes {
        let _ = write!(state, "{byte:02x}");
    }
    state
}

/// Redirect URI the identity provider sends the user back to
pub fn redirect_uri(settings: &Settings) -> String {
    format!(
        "{}/api/auth/callback",
        settings.server.base_url.trim_end_matches('/')
    )
}

/// Build the provider authorize URL with the state token embedded
pub fn authorize_url(settings: &Settings, state: &str) -> Result<String> {
    let client_id = settings
        .oauth
        .client_id
        .as_deref()
        .ok_or_else(|| Error::Config("GITHUB_CLIENT_ID is not configured".to_string()))?;

    let url = Url::parse_with_params(
        &format!("{}/login/oauth/authorize", settings.github.oauth_url),
        &[
            ("client_id", client_id),
            ("redirect_uri", &redirect_uri(settings)),
            ("scope", OAUTH_SCOPE),
            ("state", state),
        ],
    )
    .map_err(|e| Error::Internal(format!("Failed to build authorize URL: {e}")))?;

    Ok(url.to_string())
}

/// Terminal HTML document for the callback popup.
///
/// The popup notifies its opener with a message scoped to the exact app
/// origin, then closes itself; the document shape is identical for success
/// and failure so the handshake never surfaces a raw error page.
pub fn callback_page(origin: &str, success: bool, message: &str) -> String {
    // Serialize through JSON, then escape '<' so user-influenced text cannot
    // close the script element
    let payload = json!({
        "type": "gitcdn-auth",
        "success": success,
        "message": message,
    })
    .to_string()
    .replace('<', "\\u003c");
    let origin = json!(origin).to_string().replace('<', "\\u003c");

    let notice = if success {
        "Signed in. You can close this window."
    } else {
        "Sign-in failed. You can close this window."
    };

    format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>GitCDN</title></head>\n<body>\n<p>{notice}</p>\n<script>\n  if (window.opener) {{\n    window.opener.postMessage({payload}, {origin});\n  }}\n  window.close();\n</script>\n</body>\n</html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AssetConfig, GitHubEndpoints, OAuthConfig, ServerConfig, SessionConfig, Settings,
    };

    fn settings() -> Settings {
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
            session: SessionConfig { secret: None },
            assets: AssetConfig {
                root: "assets".to_string(),
            },
            github: GitHubEndpoints {
                api_url: "https://api.github.com".to_string(),
                oauth_url: "https://github.com".to_string(),
            },
        }
    }

    #[test]
    fn test_mint_state_is_hex_and_fresh() {
        let a = mint_state();
        let b = mint_state();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_authorize_url_carries_params() {
        let url = authorize_url(&settings(), "abc123").unwrap();
        assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("state=abc123"));
        assert!(url.contains("scope=repo+read%3Auser"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fapi%2Fauth%2Fcallback"
        ));
    }

    #[test]
    fn test_authorize_url_requires_client_id() {
        let mut settings = settings();
        settings.oauth.client_id = None;
        assert!(matches!(
            authorize_url(&settings, "abc"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_callback_page_scopes_message_to_origin() {
        let page = callback_page("http://localhost:3000", true, "");
        assert!(page.contains("postMessage"));
        assert!(page.contains("\"http://localhost:3000\""));
        assert!(page.contains("\"success\":true"));
    }

    #[test]
    fn test_callback_page_escapes_message_text() {
        let page = callback_page("http://localhost:3000", false, "</script><script>");
        assert!(!page.contains("</script><script>"));
    }
}
