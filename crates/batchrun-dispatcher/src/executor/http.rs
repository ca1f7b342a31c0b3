//! HTTP executor backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use batchrun_core::{ItemError, Method, Target};

use super::{ExecutorError, ItemExecutor};

/// Sends each target as one HTTP request.
///
/// A 2xx response succeeds with `{"status": <code>, "body": <body>}`, where the
/// body is parsed as JSON when possible and kept as a string otherwise.
#[derive(Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    /// Create an executor whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ExecutorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExecutorError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ItemExecutor for HttpExecutor {
    async fn execute(&self, target: &Target) -> Result<Value, ExecutorError> {
        let url = reqwest::Url::parse(&target.endpoint).map_err(|e| ItemError::InvalidTarget {
            message: format!("{}: {e}", target.endpoint),
        })?;

        debug!(method = %target.method, url = %url, "Sending request");

        let mut request = self.client.request(to_reqwest_method(target.method), url);
        for (name, value) in &target.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(payload) = &target.payload {
            request = request.json(payload);
        }

        let response = request.send().await.map_err(classify)?;
        let status = response.status();
        let text = response.text().await.map_err(classify)?;

        if !status.is_success() {
            return Err(ItemError::Status {
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(json!({ "status": status.as_u16(), "body": body }))
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
    }
}

fn classify(err: reqwest::Error) -> ExecutorError {
    let item = if err.is_timeout() {
        ItemError::Timeout
    } else if err.is_builder() {
        ItemError::InvalidTarget {
            message: err.to_string(),
        }
    } else {
        ItemError::transport(err.to_string())
    };
    item.into()
}
