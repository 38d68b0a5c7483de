use async_trait::async_trait;
use tracing::debug;

use crate::app::Result;
use crate::fetcher::{HttpClient, HttpRequest, HttpResponse, Method};

const USER_AGENT: &str = concat!("estuary/", env!("CARGO_PKG_VERSION"));

/// Production [`HttpClient`] backed by a shared reqwest client.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(url = %request.url, "executing request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.timeout(request.timeout).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(status, bytes = body.len(), "response received");
        Ok(HttpResponse { status, body })
    }
}
