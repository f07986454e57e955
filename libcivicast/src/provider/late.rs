//! Client for the LATE social scheduling API

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::instrument;

use super::{
    CreatePostRequest, ProviderResult, PublishTiming, SchedulingProvider, UpdatePostRequest,
};
use crate::config::{read_api_key, SchedulingConfig};
use crate::error::{ConfigError, Result, SchedulingError};
use crate::types::{Platform, PlatformAccount};

pub struct LateClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    timezone: String,
}

impl LateClient {
    /// Build a client, reading the API key from the configured env var
    pub fn from_config(config: &SchedulingConfig) -> Result<Self> {
        let api_key = read_api_key(&config.api_key_env)?;
        Self::new(config, api_key)
    }

    pub fn new(config: &SchedulingConfig, api_key: SecretString) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::InvalidValue(format!("scheduling HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            timezone: config.timezone.clone(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ProviderResult<Value> {
        let response = request
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;
        let data: Value = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body).unwrap_or(Value::String(body))
        };

        if !status.is_success() {
            let message = error_message(&data);
            tracing::error!("LATE API error: {} - {}", status.as_u16(), message);
            return Err(SchedulingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(data)
    }
}

#[async_trait]
impl SchedulingProvider for LateClient {
    fn name(&self) -> &str {
        "late"
    }

    #[instrument(skip(self))]
    async fn list_accounts(&self) -> ProviderResult<Vec<PlatformAccount>> {
        let data = self.send(self.client.get(self.url("/accounts"))).await?;
        let accounts = parse_accounts(&data);
        tracing::debug!("Fetched {} connected accounts", accounts.len());
        Ok(accounts)
    }

    #[instrument(skip(self, request), fields(platform = %request.platform))]
    async fn create_post(&self, request: &CreatePostRequest) -> ProviderResult<Option<String>> {
        let body = create_body(request, &self.timezone);
        let data = self
            .send(self.client.post(self.url("/posts")).json(&body))
            .await?;

        let post_id = extract_post_id(&data);
        if post_id.is_none() {
            tracing::warn!("LATE accepted the post but returned no post id");
        }
        Ok(post_id)
    }

    #[instrument(skip(self, request))]
    async fn update_post(
        &self,
        external_id: &str,
        request: &UpdatePostRequest,
    ) -> ProviderResult<()> {
        let body = update_body(request);
        self.send(
            self.client
                .patch(self.url(&format!("/posts/{}", external_id)))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_post(&self, external_id: &str) -> ProviderResult<()> {
        self.send(
            self.client
                .delete(self.url(&format!("/posts/{}", external_id))),
        )
        .await?;
        Ok(())
    }
}

fn map_transport_error(e: reqwest::Error) -> SchedulingError {
    if e.is_timeout() {
        SchedulingError::Timeout(e.to_string())
    } else {
        SchedulingError::Network(e.to_string())
    }
}

fn error_message(data: &Value) -> String {
    data.get("error")
        .or_else(|| data.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| data.as_str().map(str::to_string))
        .unwrap_or_else(|| "Unknown error".to_string())
}

/// Accounts arrive as a bare array or wrapped in `accounts` or `data`
fn parse_accounts(data: &Value) -> Vec<PlatformAccount> {
    let items = data
        .as_array()
        .or_else(|| data.get("accounts").and_then(Value::as_array))
        .or_else(|| data.get("data").and_then(Value::as_array));

    let Some(items) = items else {
        tracing::warn!("Accounts response had no account list");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let id = item
                .get("_id")
                .or_else(|| item.get("id"))
                .and_then(Value::as_str);
            let platform = item
                .get("platform")
                .and_then(Value::as_str)
                .and_then(|p| p.parse::<Platform>().ok());

            match (id, platform) {
                (Some(id), Some(platform)) => Some(PlatformAccount {
                    external_id: id.to_string(),
                    platform,
                    username: item
                        .get("username")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    display_name: item
                        .get("displayName")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    is_active: item.get("isActive").and_then(Value::as_bool).unwrap_or(true),
                }),
                _ => {
                    tracing::warn!("Skipping account without usable id or platform: {}", item);
                    None
                }
            }
        })
        .collect()
}

fn create_body(request: &CreatePostRequest, timezone: &str) -> Value {
    let mut body = json!({
        "content": request.content,
        "platforms": [{
            "platform": request.platform.as_str(),
            "accountId": request.account_id,
        }],
    });

    if !request.media_urls.is_empty() {
        body["mediaItems"] = request
            .media_urls
            .iter()
            .map(|url| json!({ "type": "image", "url": url }))
            .collect();
    }
    if let Some(link) = &request.link {
        body["link"] = json!(link);
    }
    match request.timing {
        PublishTiming::At(at) => {
            body["scheduledFor"] = json!(at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
            body["timezone"] = json!(timezone);
        }
        PublishTiming::Now => {
            body["publishNow"] = json!(true);
        }
    }
    body
}

fn update_body(request: &UpdatePostRequest) -> Value {
    let mut body = json!({});
    if let Some(text) = &request.content {
        body["text"] = json!(text);
    }
    if let Some(at) = request.scheduled_for {
        body["scheduled_at"] = json!(at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
    }
    if let Some(urls) = &request.media_urls {
        body["media_urls"] = json!(urls);
    }
    if let Some(link) = &request.link {
        body["link"] = json!(link);
    }
    body
}

fn extract_post_id(data: &Value) -> Option<String> {
    let candidates = [
        data.get("id"),
        data.get("post_id"),
        data.get("_id"),
        data.get("post").and_then(|p| p.get("_id").or_else(|| p.get("id"))),
    ];
    candidates.into_iter().flatten().find_map(|v| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
