//! Slack Web API sink: look people up by email and DM them.

use async_trait::async_trait;
use policyminder_core::{NotificationSink, NotifyError, RecipientHandle};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_API_URL: &str = "https://slack.com/api";

/// Slack's error code for an email with no matching account.
const USERS_NOT_FOUND: &str = "users_not_found";

#[derive(Error, Debug)]
pub enum SlackError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("slack API error: {0}")]
    Api(String),
}

#[derive(Deserialize)]
struct LookupResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Deserialize)]
struct User {
    id: String,
    #[serde(default)]
    profile: Profile,
}

#[derive(Deserialize, Default)]
struct Profile {
    #[serde(default)]
    first_name: Option<String>,
}

#[derive(Deserialize)]
struct PostResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

/// Bot-token client for the two Web API methods the reminder loop needs.
pub struct SlackClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl SlackClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            token,
        }
    }

    /// Point the client at a different Web API root (no trailing slash).
    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    /// `users.lookupByEmail`. `Ok(None)` when Slack has no such user.
    pub async fn lookup_by_email(&self, email: &str) -> Result<Option<RecipientHandle>, SlackError> {
        let url = format!("{}/users.lookupByEmail", self.api_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("email", email)])
            .send()
            .await?;
        let lookup: LookupResponse = Self::parse(resp).await?;

        match (lookup.ok, lookup.error.as_deref()) {
            (true, _) => {
                let user = lookup
                    .user
                    .ok_or_else(|| SlackError::Api("lookup returned no user".into()))?;
                debug!(email, id = %user.id, "found slack user");
                Ok(Some(RecipientHandle {
                    id: user.id,
                    email: email.to_string(),
                    first_name: user.profile.first_name,
                }))
            }
            (false, Some(USERS_NOT_FOUND)) => Ok(None),
            (false, err) => Err(SlackError::Api(err.unwrap_or("unknown error").to_string())),
        }
    }

    /// `chat.postMessage` to `channel` (a user id opens the bot DM).
    pub async fn post_message(&self, channel: &str, text: &str) -> Result<(), SlackError> {
        let url = format!("{}/chat.postMessage", self.api_url);
        info!(channel, "posting slack message");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&PostMessage { channel, text })
            .send()
            .await?;
        let posted: PostResponse = Self::parse(resp).await?;
        if posted.ok {
            Ok(())
        } else {
            Err(SlackError::Api(
                posted.error.unwrap_or_else(|| "unknown error".into()),
            ))
        }
    }

    async fn parse<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, SlackError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(SlackError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl NotificationSink for SlackClient {
    async fn resolve_recipient(&self, email: &str) -> Result<RecipientHandle, NotifyError> {
        match self.lookup_by_email(email).await {
            Ok(Some(handle)) => Ok(handle),
            Ok(None) => Err(NotifyError::NotFound(email.to_string())),
            Err(e) => Err(NotifyError::Platform(e.to_string())),
        }
    }

    async fn deliver(&self, recipient: &RecipientHandle, text: &str) -> Result<(), NotifyError> {
        self.post_message(&recipient.id, text)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))
    }
}
