use async_trait::async_trait;

// Fetch-side port. Jobs only ever see this trait, so tests can serve fixtures.
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, request: &HttpRequest) -> Result<HttpGetResult, String>;
}

#[derive(Clone, Debug, Default)]
pub struct HttpRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub user_agent: Option<String>,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
