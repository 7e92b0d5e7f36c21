//! X API v2 implementation of [`TwitterApi`].

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::OnceLock;
use tokio::sync::RwLock;

use crate::config::TwitterConfig;
use crate::error::{FetchError, PostError};

use super::api::{make_authenticated_request, sanitize_for_logging, RequestError};
use super::models::{Mention, PostedReply, Tweet, User};
use super::parsing::{
    next_token, parse_mentions, parse_posted_reply, parse_tweet, parse_user_response,
};
use super::{oldest_mentions, TwitterApi};

const API_BASE: &str = "https://api.x.com/2";
/// Largest page the mentions endpoint serves.
const MAX_RESULTS_PER_PAGE: usize = 100;

/// Twitter/X API v2 client authenticated with an OAuth 2.0 User Context token.
pub struct XApiClient {
    http: Client,
    config: RwLock<TwitterConfig>,
    /// Id of the authenticated account, known after the first `verify_credentials`.
    user_id: OnceLock<u64>,
}

impl XApiClient {
    pub fn new(config: TwitterConfig) -> Self {
        XApiClient {
            http: Client::new(),
            config: RwLock::new(config),
            user_id: OnceLock::new(),
        }
    }

    async fn get_json(&self, url: &str, operation_name: &str) -> Result<Value, RequestError> {
        let response_text = make_authenticated_request(
            &self.http,
            &self.config,
            |client, auth_header| client.get(url).header("Authorization", auth_header),
            operation_name,
        )
        .await?;
        serde_json::from_str(&response_text).map_err(|e| {
            RequestError::Transient(format!(
                "invalid JSON from '{}': {}",
                operation_name, e
            ))
        })
    }

    async fn own_user_id(&self) -> Result<u64, FetchError> {
        match self.user_id.get() {
            Some(id) => Ok(*id),
            None => Ok(self.verify_credentials().await?.id),
        }
    }
}

#[async_trait]
impl TwitterApi for XApiClient {
    async fn verify_credentials(&self) -> Result<User, FetchError> {
        let url = format!("{}/users/me?user.fields=id,name,username", API_BASE);
        let json = self.get_json(&url, "verify_credentials").await?;
        let user = parse_user_response(&json)
            .ok_or_else(|| FetchError::Fatal("users/me response has no user".to_string()))?;
        let _ = self.user_id.set(user.id);
        Ok(user)
    }

    async fn fetch_mentions_since(
        &self,
        since_id: Option<u64>,
        limit: usize,
    ) -> Result<Vec<Mention>, FetchError> {
        let user_id = self.own_user_id().await?;
        let mut base_url = format!(
            "{}/users/{}/mentions\
             ?expansions=author_id,referenced_tweets.id,entities.mentions.username\
             &tweet.fields=author_id,created_at,referenced_tweets,entities\
             &user.fields=id,name,username",
            API_BASE, user_id
        );
        if let Some(since_id) = since_id {
            base_url.push_str(&format!("&since_id={}", since_id));
        }

        // Follow every page: the newest mentions come first, and the batch
        // has to be the oldest `limit` ones.
        let mut mentions = Vec::new();
        let mut pagination_token: Option<String> = None;
        let mut pages = 0;

        loop {
            let url = match &pagination_token {
                Some(token) => format!(
                    "{}&max_results={}&pagination_token={}",
                    base_url,
                    MAX_RESULTS_PER_PAGE,
                    urlencoding::encode(token)
                ),
                None => format!("{}&max_results={}", base_url, MAX_RESULTS_PER_PAGE),
            };

            let json = self.get_json(&url, "fetch_mentions").await?;
            mentions.extend(parse_mentions(&json));
            pages += 1;

            pagination_token = next_token(&json);
            if pagination_token.is_none() {
                break;
            }
        }

        let pending = mentions.len();
        let mentions = oldest_mentions(mentions, limit);
        debug!(
            "Fetched {} mentions since {:?} in {} pages, keeping {}",
            pending,
            since_id,
            pages,
            mentions.len()
        );
        Ok(mentions)
    }

    async fn fetch_tweet(&self, id: u64) -> Result<Option<Tweet>, FetchError> {
        let url = format!(
            "{}/tweets/{}?expansions=attachments.media_keys&tweet.fields=attachments\
             &media.fields=media_key,type,alt_text",
            API_BASE, id
        );
        match self.get_json(&url, "fetch_tweet").await {
            Ok(json) => {
                let tweet = parse_tweet(&json);
                if tweet.is_none() {
                    info!("Tweet {} is not available", id);
                    debug!(
                        "Lookup response for tweet {}: {}",
                        id,
                        sanitize_for_logging(&json.to_string(), 200)
                    );
                }
                Ok(tweet)
            }
            Err(RequestError::Forbidden(msg))
            | Err(RequestError::NotFound(msg))
            | Err(RequestError::Rejected(msg)) => {
                info!("Tweet {} could not be fetched: {}", id, msg);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn post_reply(
        &self,
        in_reply_to: u64,
        text: &str,
        exclude_user_ids: &[u64],
        suppress_metadata: bool,
    ) -> Result<PostedReply, PostError> {
        let mut reply = json!({ "in_reply_to_tweet_id": in_reply_to.to_string() });
        if suppress_metadata && !exclude_user_ids.is_empty() {
            reply["exclude_reply_user_ids"] = json!(exclude_user_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>());
        }
        let payload = json!({ "text": text, "reply": reply });
        debug!("Reply payload: {}", payload);

        let url = format!("{}/tweets", API_BASE);
        let response_text = make_authenticated_request(
            &self.http,
            &self.config,
            |client, auth_header| {
                client
                    .post(&url)
                    .header("Authorization", auth_header)
                    .header("Content-Type", "application/json")
                    .json(&payload)
            },
            "post_reply",
        )
        .await?;

        let json: Value = serde_json::from_str(&response_text).map_err(|e| {
            PostError::Transient(format!("invalid JSON from post_reply: {}", e))
        })?;
        parse_posted_reply(&json).ok_or_else(|| {
            warn!(
                "Reply to {} was accepted but no id came back: {}",
                in_reply_to,
                sanitize_for_logging(&response_text, 200)
            );
            PostError::Transient("post_reply response has no tweet id".to_string())
        })
    }
}
