//! HTTP plumbing shared by API-backed adapters.

mod http;

pub use http::ReqwestClient;

use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

use crate::app::{EstuaryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outbound API request, built by an adapter.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: IndexMap<String, String>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        let mut request = Self::new(Method::Post, url);
        request.body = Some(body);
        request
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: IndexMap::new(),
            body: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport seam so adapter logic can be tested without a network.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Interpret a response as JSON, turning transport-level failures into
/// errors that name the status and a body snippet.
pub fn parse_json_response(response: &HttpResponse) -> Result<Value> {
    if !response.is_success() {
        return Err(EstuaryError::Other(format!(
            "request failed with status {}: {}",
            response.status,
            snippet(&response.body)
        )));
    }

    serde_json::from_str(&response.body).map_err(|e| {
        EstuaryError::Parse(format!(
            "response is not valid JSON ({e}): {}",
            snippet(&response.body)
        ))
    })
}

fn snippet(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    &body[..end]
}
