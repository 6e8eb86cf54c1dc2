use crate::error::{Error, Result};
use crate::utils::sanitize;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub oauth: OAuthConfig,
    pub session: SessionConfig,
    pub assets: AssetConfig,
    pub github: GitHubEndpoints,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL of the application, used for the OAuth redirect URI,
    /// the CORS allow-origin, and the callback page's postMessage origin.
    pub base_url: String,
    /// "development" or "production"
    pub environment: String,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Top-level path prefix inside the repository under which all managed
    /// files live.
    pub root: String,
}

/// GitHub endpoint bases, overridable for tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubEndpoints {
    pub api_url: String,
    pub oauth_url: String,
}

impl ServerConfig {
    pub fn secure_cookies(&self) -> bool {
        self.environment == "production"
    }

    /// Origin portion of the configured base URL (scheme://host[:port])
    pub fn origin(&self) -> Result<String> {
        let url = Url::parse(&self.base_url)
            .map_err(|_| Error::Config(format!("Invalid APP_BASE_URL: {}", self.base_url)))?;
        Ok(url.origin().ascii_serialization())
    }
}

impl OAuthConfig {
    pub fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid PORT value".to_string()))?;

        let base_url =
            std::env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let environment =
            std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let max_request_body_size = std::env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| "10485760".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid MAX_REQUEST_BODY_SIZE value".to_string()))?;

        let client_id = std::env::var("GITHUB_CLIENT_ID").ok().filter(|v| !v.is_empty());
        let client_secret = std::env::var("GITHUB_CLIENT_SECRET")
            .ok()
            .filter(|v| !v.is_empty());

        let secret = std::env::var("SESSION_SECRET").ok().filter(|v| !v.is_empty());

        let root = std::env::var("ASSET_ROOT").unwrap_or_else(|_| "assets".to_string());

        let api_url = std::env::var("GITHUB_API_URL")
            .unwrap_or_else(|_| "https://api.github.com".to_string());
        let oauth_url = std::env::var("GITHUB_OAUTH_URL")
            .unwrap_or_else(|_| "https://github.com".to_string());

        Ok(Settings {
            server: ServerConfig {
                host,
                port,
                base_url,
                environment,
                max_request_body_size,
            },
            oauth: OAuthConfig {
                client_id,
                client_secret,
            },
            session: SessionConfig { secret },
            assets: AssetConfig { root },
            github: GitHubEndpoints { api_url, oauth_url },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("Port must be non-zero".to_string()));
        }

        Url::parse(&self.server.base_url)
            .map_err(|_| Error::Config(format!("Invalid APP_BASE_URL: {}", self.server.base_url)))?;

        // The asset root itself must be a valid folder path (relative to the
        // repository root, no traversal)
        match sanitize::normalize_folder(Some(&self.assets.root), "") {
            Some(root) if !root.is_empty() => Ok(()),
            _ => Err(Error::Config(format!(
                "Invalid ASSET_ROOT: {}",
                self.assets.root
            ))),
        }
    }
}
