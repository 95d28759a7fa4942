//! Connection settings for [`super::GithubContentsStore`].

use std::fmt;
use std::time::Duration;

/// Default GitHub REST API root.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default path of the catalogue document inside the repository.
pub const DEFAULT_DOCUMENT_PATH: &str = "data.json";

/// Default user agent for API requests.
pub const DEFAULT_USER_AGENT: &str = "greenmap/0.1";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`super::GithubContentsStore`].
///
/// The token is optional: without one the store reports itself as
/// unconfigured and the catalogue works offline.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use greenmap_data::GithubStoreConfig;
///
/// let config = GithubStoreConfig::new("city-greens", "biysk-map")
///     .with_token("ghp_example")
///     .with_timeout(Duration::from_secs(10));
/// assert_eq!(config.path, "data.json");
/// assert!(!format!("{config:?}").contains("ghp_example"));
/// ```
#[derive(Clone)]
pub struct GithubStoreConfig {
    /// API root, e.g. `https://api.github.com`.
    pub api_base: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Path of the document inside the repository.
    pub path: String,
    /// Personal access token.
    pub token: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl fmt::Debug for GithubStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubStoreConfig")
            .field("api_base", &self.api_base)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("path", &self.path)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl GithubStoreConfig {
    /// Configuration for `owner/repo` with default settings and no token.
    #[must_use]
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_owned(),
            owner: owner.into(),
            repo: repo.into(),
            path: DEFAULT_DOCUMENT_PATH.to_owned(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    /// Set the access token. Empty tokens are treated as absent.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.trim().is_empty()).then_some(token);
        self
    }

    /// Set the document path inside the repository.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Point at a different API root, such as GitHub Enterprise.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
