use crate::app::ports::{HttpClientPort, HttpGetResult, HttpRequest};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use std::time::Duration;

pub struct ReqwestHttp {
    client: reqwest::Client,
}

impl ReqwestHttp {
    /// Client with an overall per-request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClientPort for ReqwestHttp {
    async fn get(&self, request: &HttpRequest) -> std::result::Result<HttpGetResult, String> {
        let mut builder = self.client.get(&request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(agent) = &request.user_agent {
            builder = builder.header(USER_AGENT, agent.as_str());
        }

        let resp = builder.send().await.map_err(|e| e.to_string())?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = resp.bytes().await.map_err(|e| e.to_string())?.to_vec();
        Ok(HttpGetResult {
            status,
            bytes,
            content_type,
        })
    }
}
