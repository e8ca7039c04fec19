//! Authenticated REST client
//!
//! Thin wrapper over `reqwest` that injects the bot authorization header,
//! funnels every call through the [`RateLimiter`] and maps responses into
//! the [`HttpError`] taxonomy.

use std::time::Duration;

use parley_common::config::HttpConfig;
use parley_core::{Channel, Message, Snowflake};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::HttpError;
use crate::rate_limit::{RateLimitUpdate, RateLimiter};
use crate::routes::Route;

/// Gateway connection info returned by `GET /gateway/bot`
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayBotInfo {
    pub url: String,
    pub shards: u32,
    pub session_start_limit: SessionStartLimit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionStartLimit {
    pub total: u32,
    pub remaining: u32,
    /// Milliseconds until the start quota refills
    pub reset_after: u64,
}

/// Body for `PATCH /channels/{id}`; absent fields are left untouched remotely
#[derive(Debug, Clone, Default, Serialize)]
pub struct EditChannel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
    max_rate_limit_retries: u32,
}

impl RestClient {
    pub fn new(config: &HttpConfig, token: &str) -> Result<Self, HttpError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bot {token}"))
            .map_err(|_| HttpError::Unauthorized("token is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::new(),
            max_rate_limit_retries: config.max_rate_limit_retries,
        })
    }

    /// Fetch the websocket url and shard count; doubles as the credential
    /// check during client startup
    pub async fn get_gateway_bot(&self) -> Result<GatewayBotInfo, HttpError> {
        self.request(Route::GetGatewayBot, None).await
    }

    pub async fn get_channel(&self, channel_id: Snowflake) -> Result<Channel, HttpError> {
        self.request(Route::GetChannel { channel_id }, None).await
    }

    pub async fn create_message(
        &self,
        channel_id: Snowflake,
        content: &str,
    ) -> Result<Message, HttpError> {
        let body = serde_json::json!({ "content": content });
        self.request(Route::CreateMessage { channel_id }, Some(body))
            .await
    }

    pub async fn edit_channel(
        &self,
        channel_id: Snowflake,
        edit: &EditChannel,
    ) -> Result<Channel, HttpError> {
        let body = serde_json::to_value(edit)?;
        self.request(Route::EditChannel { channel_id }, Some(body))
            .await
    }

    pub async fn delete_channel(&self, channel_id: Snowflake) -> Result<Channel, HttpError> {
        self.request(Route::DeleteChannel { channel_id }, None).await
    }

    /// One rate-limited round-trip, with a single absorbed 429 retry
    ///
    /// Recording the 429 parks the whole bucket, so the retry and any queued
    /// callers on the same bucket wait out the penalty together.
    async fn request<T: DeserializeOwned>(
        &self,
        route: Route,
        body: Option<serde_json::Value>,
    ) -> Result<T, HttpError> {
        let bucket_key = route.bucket_key();
        let url = format!("{}{}", self.base_url, route.path());
        let mut attempts = 0u32;

        loop {
            self.limiter.acquire(&bucket_key).await;

            let mut request = self.http.request(route.method(), &url);
            if let Some(ref body) = body {
                request = request.json(body);
            }
            let response = request.send().await?;
            let status = response.status();
            let update = parse_rate_limit_headers(response.headers());
            self.limiter.record(&bucket_key, &update);

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = update.retry_after.unwrap_or(Duration::from_secs(1));
                if attempts < self.max_rate_limit_retries {
                    attempts += 1;
                    tracing::warn!(
                        bucket = %bucket_key,
                        retry_after = ?retry_after,
                        "rate limited, retrying after penalty"
                    );
                    if update.retry_after.is_none() {
                        // no header to park the bucket on; back off here
                        tokio::time::sleep(retry_after).await;
                    }
                    continue;
                }
                return Err(HttpError::RateLimited { retry_after });
            }

            if status == StatusCode::UNAUTHORIZED {
                return Err(HttpError::Unauthorized(
                    "the provided token was rejected".into(),
                ));
            }

            let text = response.text().await?;
            if !status.is_success() {
                let parsed: ApiErrorBody = serde_json::from_str(&text).unwrap_or(ApiErrorBody {
                    code: None,
                    message: None,
                });
                return Err(HttpError::Api {
                    status: status.as_u16(),
                    code: parsed.code,
                    message: parsed.message.unwrap_or(text),
                });
            }

            return Ok(serde_json::from_str(&text)?);
        }
    }
}

fn parse_rate_limit_headers(headers: &HeaderMap) -> RateLimitUpdate {
    fn parse<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
        headers.get(name)?.to_str().ok()?.parse().ok()
    }

    RateLimitUpdate {
        limit: parse(headers, "x-ratelimit-limit"),
        remaining: parse(headers, "x-ratelimit-remaining"),
        reset_after: parse::<f64>(headers, "x-ratelimit-reset-after")
            .map(Duration::from_secs_f64),
        retry_after: parse::<f64>(headers, "retry-after").map(Duration::from_secs_f64),
        global: parse::<bool>(headers, "x-ratelimit-global").unwrap_or(false),
    }
}
