use crate::error::PollError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Anything that can answer "which homework statuses changed since `since`".
#[async_trait]
pub trait HomeworkSource: Send + Sync {
    async fn fetch(&self, since: i64) -> Result<Value, PollError>;
}

/// Result of checking a decoded API answer.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// `homeworks` is present but empty: nothing changed in the window.
    NoNewStatuses,
    /// Records in the order the API returned them, most recent first.
    Homeworks(Vec<Value>),
}

pub struct ApiClient {
    endpoint: String,
    token: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(endpoint: String, token: String, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            endpoint,
            token,
            client,
        })
    }
}

#[async_trait]
impl HomeworkSource for ApiClient {
    async fn fetch(&self, since: i64) -> Result<Value, PollError> {
        debug!("Попытка запроса к эндпоинту API, from_date={}", since);
        let response = self
            .client
            .get(&self.endpoint)
            .header(AUTHORIZATION, format!("OAuth {}", self.token))
            .query(&[("from_date", since)])
            .send()
            .await
            .map_err(PollError::ApiUnreachable)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(PollError::InvalidResponse(status));
        }

        response.json::<Value>().await.map_err(PollError::InvalidBody)
    }
}

/// Server-reported time of the answer, used as the next `from_date`.
pub fn current_date(raw: &Value) -> Option<i64> {
    raw.get("current_date").and_then(Value::as_i64)
}

pub fn check_response(raw: Value) -> Result<CheckOutcome, PollError> {
    let Value::Object(mut map) = raw else {
        return Err(PollError::NotAMapping);
    };

    match map.remove("homeworks") {
        None | Some(Value::Null) => Err(PollError::MissingHomeworks),
        Some(Value::Array(list)) if list.is_empty() => Ok(CheckOutcome::NoNewStatuses),
        Some(Value::Array(list)) => Ok(CheckOutcome::Homeworks(list)),
        Some(_) => Err(PollError::HomeworksNotAList),
    }
}
