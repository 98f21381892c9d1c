//! VK feed client: fetches wall posts and resolves author names.

pub mod types;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use types::Post;

const API_VERSION: &str = "5.131";

/// Display name used when an author lookup fails for any reason.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("vk transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("vk api returned http status {0}")]
    Status(reqwest::StatusCode),
    #[error("vk api error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("malformed vk response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid vk api url: {0}")]
    Url(#[from] url::ParseError),
    #[error("vk response was missing the expected payload")]
    MissingPayload,
}

/// The feed the mirror reads from.
///
/// Abstracted so the pipeline can run against a test double instead of the
/// real VK API.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the most recent `count` wall posts, newest first.
    async fn recent_posts(&self, count: u32) -> Result<Vec<Post>, FetchError>;

    /// Resolve an owner id to a display name. Positive ids are users,
    /// negative ids are groups. Lookup failures are absorbed: the sentinel
    /// [`UNKNOWN_AUTHOR`] comes back instead of an error.
    async fn author_name(&self, owner_id: i64) -> String;
}

/// VK JSON API client.
#[derive(Debug, Clone)]
pub struct VkClient {
    http: reqwest::Client,
    base: Url,
    token: String,
    owner_id: i64,
}

/// VK wraps every method result in `{"response": ...}` or `{"error": ...}`.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    response: Option<T>,
    #[serde(default)]
    error: Option<VkError>,
}

#[derive(Debug, Deserialize)]
struct VkError {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_msg: String,
}

#[derive(Debug, Deserialize)]
struct WallPage {
    #[serde(default)]
    items: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

#[derive(Debug, Deserialize)]
struct GroupRecord {
    #[serde(default)]
    name: String,
}

impl VkClient {
    #[must_use]
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        Self {
            http,
            base: config.vk_api_base.clone(),
            token: config.vk_access_token.clone(),
            owner_id: config.vk_owner_id,
        }
    }

    /// Call a VK method and unwrap the response envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = self.base.join(method)?;

        let response = self
            .http
            .get(url)
            .query(&[
                ("access_token", self.token.as_str()),
                ("v", API_VERSION),
            ])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        let envelope: Envelope<T> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => return Err(FetchError::Status(status)),
            Err(e) => return Err(FetchError::Decode(e)),
        };

        if let Some(error) = envelope.error {
            return Err(FetchError::Api {
                code: error.error_code,
                message: error.error_msg,
            });
        }
        envelope.response.ok_or(FetchError::MissingPayload)
    }

    async fn user_name(&self, user_id: i64) -> Result<String, FetchError> {
        let users: Vec<UserRecord> = self
            .call(
                "users.get",
                &[
                    ("user_ids", user_id.to_string()),
                    ("fields", "first_name,last_name".to_string()),
                ],
            )
            .await?;
        let user = users.first().ok_or(FetchError::MissingPayload)?;
        Ok(format!("{} {}", user.first_name, user.last_name))
    }

    async fn group_name(&self, group_id: i64) -> Result<String, FetchError> {
        let groups: Vec<GroupRecord> = self
            .call("groups.getById", &[("group_id", group_id.to_string())])
            .await?;
        let group = groups.first().ok_or(FetchError::MissingPayload)?;
        Ok(group.name.clone())
    }
}

#[async_trait]
impl FeedSource for VkClient {
    async fn recent_posts(&self, count: u32) -> Result<Vec<Post>, FetchError> {
        let page: WallPage = self
            .call(
                "wall.get",
                &[
                    ("owner_id", self.owner_id.to_string()),
                    ("count", count.to_string()),
                    ("filter", "owner".to_string()),
                ],
            )
            .await?;
        debug!(count = page.items.len(), "Fetched wall page");
        Ok(page.items)
    }

    async fn author_name(&self, owner_id: i64) -> String {
        let result = if owner_id > 0 {
            self.user_name(owner_id).await
        } else {
            self.group_name(-owner_id).await
        };
        match result {
            Ok(name) => name,
            Err(e) => {
                warn!(owner_id, error = %e, "Author lookup failed");
                UNKNOWN_AUTHOR.to_string()
            }
        }
    }
}
