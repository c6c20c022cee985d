use crate::app::ports::{HttpClientPort, HttpRequest};
use crate::config::RetrySettings;
use crate::error::{JobError, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Fetch a payload, retrying transport errors and non-2xx responses up to
/// `retry.attempts` times. Exhausting the attempts is a fatal transfer error.
pub async fn fetch_bytes(
    http: &dyn HttpClientPort,
    request: &HttpRequest,
    retry: RetrySettings,
) -> Result<Vec<u8>> {
    let attempts = retry.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match http.get(request).await {
            Ok(response) if response.is_success() => {
                debug!(
                    "Fetched {} bytes ({}) from {}",
                    response.bytes.len(),
                    response.content_type,
                    request.url
                );
                return Ok(response.bytes);
            }
            Ok(response) => {
                last_error = format!("HTTP status {}", response.status);
            }
            Err(e) => {
                last_error = e;
            }
        }

        if attempt < attempts {
            warn!(
                "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                attempt,
                attempts,
                request.url,
                last_error,
                retry.delay()
            );
            tokio::time::sleep(retry.delay()).await;
        }
    }

    Err(JobError::Transfer {
        url: request.url.clone(),
        message: last_error,
    })
}

/// Fetch and decode a JSON document. Malformed JSON is a fatal parse error.
pub async fn fetch_json<T: DeserializeOwned>(
    http: &dyn HttpClientPort,
    request: &HttpRequest,
    retry: RetrySettings,
) -> Result<T> {
    let bytes = fetch_bytes(http, request, retry).await?;
    let value = serde_json::from_slice(&bytes)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::HttpGetResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `failures` times with a 503, then answers 200
    struct FlakyHttp {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl HttpClientPort for FlakyHttp {
        async fn get(&self, _request: &HttpRequest) -> std::result::Result<HttpGetResult, String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let status = if call < self.failures { 503 } else { 200 };
            Ok(HttpGetResult {
                status,
                bytes: br#"{"ok":true}"#.to_vec(),
                content_type: "application/json".to_string(),
            })
        }
    }

    fn retry(attempts: u32) -> RetrySettings {
        RetrySettings {
            attempts,
            delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_within_attempts() {
        let http = FlakyHttp {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        let request = HttpRequest::new("http://feed.test/sites.xml");

        let bytes = fetch_bytes(&http, &request, retry(3)).await.unwrap();
        assert_eq!(bytes, br#"{"ok":true}"#.to_vec());
        assert_eq!(http.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_single_attempt_fails_on_bad_status() {
        let http = FlakyHttp {
            failures: 1,
            calls: AtomicU32::new(0),
        };
        let request = HttpRequest::new("http://feed.test/sites.xml");

        let err = fetch_bytes(&http, &request, RetrySettings::none())
            .await
            .unwrap_err();
        match err {
            JobError::Transfer { url, message } => {
                assert_eq!(url, "http://feed.test/sites.xml");
                assert!(message.contains("503"));
            }
            other => panic!("expected transfer error, got {other:?}"),
        }
        assert_eq!(http.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_json_decodes_payload() {
        let http = FlakyHttp {
            failures: 0,
            calls: AtomicU32::new(0),
        };
        let request = HttpRequest::new("http://feed.test/data.json");

        let value: serde_json::Value = fetch_json(&http, &request, retry(1)).await.unwrap();
        assert_eq!(value["ok"], serde_json::Value::Bool(true));
    }
}
