//! [`RemoteStore`] backed by a file in a GitHub repository.

use async_trait::async_trait;
use greenmap_core::{PutRequest, RemoteDocument, RemoteError, RemoteStore, VersionToken};
use log::{debug, warn};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use thiserror::Error;
use url::Url;

use super::GithubStoreConfig;
use super::contents::{ContentsResponse, ErrorBody, PutContentsRequest};

/// Media type requested from the API.
const GITHUB_JSON: &str = "application/vnd.github+json";

/// Header pinning the REST API version.
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";

/// REST API version the envelopes are written against.
const API_VERSION: &str = "2022-11-28";

/// Errors raised while constructing a [`GithubContentsStore`].
#[derive(Debug, Error)]
pub enum RemoteBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// The API root is not a valid URL.
    #[error("invalid API base URL {url}: {source}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
    /// The API root cannot carry a path, e.g. `mailto:` URLs.
    #[error("API base URL {url} cannot be used as a base")]
    CannotBeABase {
        /// Offending URL.
        url: String,
    },
    /// The document path is empty.
    #[error("document path must not be empty")]
    EmptyPath,
}

/// Catalogue document stored through the GitHub contents API.
///
/// Reads return the file's blob SHA as the version token; writes send it
/// back so GitHub rejects updates based on a stale revision.
///
/// # Examples
///
/// ```
/// use greenmap_core::RemoteStore;
/// use greenmap_data::{GithubContentsStore, GithubStoreConfig};
///
/// let store = GithubContentsStore::new(GithubStoreConfig::new("city-greens", "biysk-map"))?;
/// assert!(!store.is_configured());
/// assert_eq!(
///     store.contents_url().as_str(),
///     "https://api.github.com/repos/city-greens/biysk-map/contents/data.json"
/// );
/// # Ok::<(), greenmap_data::RemoteBuildError>(())
/// ```
#[derive(Debug)]
pub struct GithubContentsStore {
    client: Client,
    config: GithubStoreConfig,
    contents_url: Url,
}

impl GithubContentsStore {
    /// Build a store from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API root is not a usable URL, the document
    /// path is empty, or the HTTP client cannot be built.
    pub fn new(config: GithubStoreConfig) -> Result<Self, RemoteBuildError> {
        let contents_url = build_contents_url(&config)?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(RemoteBuildError::HttpClient)?;
        Ok(Self {
            client,
            config,
            contents_url,
        })
    }

    /// Endpoint of the catalogue document.
    #[must_use]
    pub const fn contents_url(&self) -> &Url {
        &self.contents_url
    }

    /// Settings the store was built with.
    #[must_use]
    pub const fn config(&self) -> &GithubStoreConfig {
        &self.config
    }

    fn authorised(&self, builder: RequestBuilder) -> Result<RequestBuilder, RemoteError> {
        let token = self
            .config
            .token
            .as_deref()
            .ok_or(RemoteError::MissingCredential)?;
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| RemoteError::InvalidCredential)?;
        auth.set_sensitive(true);
        Ok(builder
            .header(AUTHORIZATION, auth)
            .header(ACCEPT, GITHUB_JSON)
            .header(API_VERSION_HEADER, API_VERSION))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, RemoteError> {
        let url = self.contents_url.as_str();
        let response = self
            .authorised(builder)?
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(url, status, &body))
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error) -> RemoteError {
        let url = self.contents_url.to_string();
        if error.is_timeout() {
            return RemoteError::Timeout {
                url,
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        if error.is_decode() {
            return RemoteError::InvalidResponse {
                url,
                message: error.to_string(),
            };
        }
        RemoteError::Network {
            url,
            message: error.to_string(),
        }
    }
}

#[async_trait(?Send)]
impl RemoteStore for GithubContentsStore {
    fn is_configured(&self) -> bool {
        self.config.token.is_some()
    }

    async fn fetch_document(&self) -> Result<RemoteDocument, RemoteError> {
        debug!("fetching {}", self.contents_url);
        let response = self
            .send(self.client.get(self.contents_url.clone()))
            .await?;
        let contents: ContentsResponse = response
            .json()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?;

        if !contents.has_inline_content() {
            return Err(RemoteError::InvalidResponse {
                url: self.contents_url.to_string(),
                message: "document is too large to be returned inline".to_owned(),
            });
        }
        Ok(RemoteDocument {
            version: VersionToken::new(contents.sha),
            encoded_content: contents.content,
        })
    }

    async fn put_document(&self, request: PutRequest) -> Result<(), RemoteError> {
        let body = PutContentsRequest {
            message: &request.message,
            content: &request.encoded_content,
            sha: request.version.as_ref().map(VersionToken::as_str),
        };
        debug!(
            "writing {} (base revision: {})",
            self.contents_url,
            body.sha.unwrap_or("none")
        );
        self.send(self.client.put(self.contents_url.clone()).json(&body))
            .await
            .inspect_err(|err| warn!("GitHub rejected catalogue write: {err}"))?;
        Ok(())
    }
}

fn build_contents_url(config: &GithubStoreConfig) -> Result<Url, RemoteBuildError> {
    let base = config.api_base.trim_end_matches('/');
    let mut url = Url::parse(base).map_err(|source| RemoteBuildError::InvalidUrl {
        url: config.api_base.clone(),
        source,
    })?;

    let path_segments: Vec<&str> = config
        .path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    if path_segments.is_empty() {
        return Err(RemoteBuildError::EmptyPath);
    }

    url.path_segments_mut()
        .map_err(|()| RemoteBuildError::CannotBeABase {
            url: config.api_base.clone(),
        })?
        .pop_if_empty()
        .extend(["repos", config.owner.as_str(), config.repo.as_str(), "contents"])
        .extend(path_segments);
    Ok(url)
}

/// Map a non-success response to a [`RemoteError`], preferring GitHub's own
/// message when the body carries one.
fn status_error(url: &str, status: StatusCode, body: &str) -> RemoteError {
    if status == StatusCode::NOT_FOUND {
        return RemoteError::NotFound {
            url: url.to_owned(),
        };
    }
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|error| error.message)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or_default().to_owned());
    RemoteError::Http {
        url: url.to_owned(),
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn config() -> GithubStoreConfig {
        GithubStoreConfig::new("city-greens", "biysk-map")
    }

    #[rstest]
    #[case("https://api.github.com", "data.json", "https://api.github.com/repos/city-greens/biysk-map/contents/data.json")]
    #[case("https://api.github.com/", "/maps/data.json", "https://api.github.com/repos/city-greens/biysk-map/contents/maps/data.json")]
    #[case("https://ghe.example.com/api/v3", "data.json", "https://ghe.example.com/api/v3/repos/city-greens/biysk-map/contents/data.json")]
    fn builds_contents_url(
        config: GithubStoreConfig,
        #[case] base: &str,
        #[case] path: &str,
        #[case] expected: &str,
    ) {
        let url = build_contents_url(&config.with_api_base(base).with_path(path)).expect("url");
        assert_eq!(url.as_str(), expected);
    }

    #[rstest]
    fn path_segments_are_escaped(config: GithubStoreConfig) {
        let url = build_contents_url(&config.with_path("зелень/data file.json")).expect("url");
        assert!(url.as_str().ends_with("/contents/%D0%B7%D0%B5%D0%BB%D0%B5%D0%BD%D1%8C/data%20file.json"));
    }

    #[rstest]
    #[case("not a url", "data.json")]
    #[case("mailto:someone@example.com", "data.json")]
    #[case("https://api.github.com", "/")]
    fn rejects_unusable_configuration(
        config: GithubStoreConfig,
        #[case] base: &str,
        #[case] path: &str,
    ) {
        let result = GithubContentsStore::new(config.with_api_base(base).with_path(path));
        assert!(result.is_err());
    }

    #[rstest]
    fn configured_only_with_token(config: GithubStoreConfig) {
        let anonymous = GithubContentsStore::new(config.clone()).expect("store");
        let authorised = GithubContentsStore::new(config.with_token("ghp_x")).expect("store");
        assert!(!anonymous.is_configured());
        assert!(authorised.is_configured());
    }

    #[rstest]
    #[tokio::test]
    async fn requests_without_token_fail_before_sending(config: GithubStoreConfig) {
        let store = GithubContentsStore::new(config.with_api_base("http://127.0.0.1:9"))
            .expect("store");
        let err = store.fetch_document().await.expect_err("no token");
        assert_eq!(err, RemoteError::MissingCredential);
    }

    #[rstest]
    #[case("ghp_x\nInjected: header")]
    #[case("ghp_\u{7f}")]
    #[tokio::test]
    async fn unsendable_token_is_reported_as_invalid(
        config: GithubStoreConfig,
        #[case] token: &str,
    ) {
        let store = GithubContentsStore::new(
            config.with_api_base("http://127.0.0.1:9").with_token(token),
        )
        .expect("store");
        assert!(store.is_configured());

        let err = store.fetch_document().await.expect_err("invalid token");

        assert_eq!(err, RemoteError::InvalidCredential);
        assert!(err.to_string().contains("not a valid header value"));
    }

    #[rstest]
    fn not_found_maps_to_missing_document() {
        let err = status_error("u", StatusCode::NOT_FOUND, r#"{"message": "Not Found"}"#);
        assert_eq!(err, RemoteError::NotFound { url: "u".into() });
    }

    #[rstest]
    #[case(StatusCode::CONFLICT, r#"{"message": "data.json does not match abc"}"#, "data.json does not match abc", true)]
    #[case(StatusCode::UNPROCESSABLE_ENTITY, "", "Unprocessable Entity", false)]
    #[case(StatusCode::UNAUTHORIZED, r#"{"message": "Bad credentials"}"#, "Bad credentials", false)]
    fn other_statuses_keep_github_message(
        #[case] status: StatusCode,
        #[case] body: &str,
        #[case] message: &str,
        #[case] conflict: bool,
    ) {
        let err = status_error("u", status, body);
        assert_eq!(
            err,
            RemoteError::Http {
                url: "u".into(),
                status: status.as_u16(),
                message: message.into(),
            }
        );
        assert_eq!(err.is_conflict(), conflict);
    }
}
