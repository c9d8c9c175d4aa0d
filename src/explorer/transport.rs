use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use super::error::ExplorerError;

/// One GET against the explorer API, returning the decoded JSON body.
///
/// `query` carries every parameter, the API key included.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    fn get(&self, query: Vec<(String, String)>) -> BoxFuture<'static, Result<Value, ExplorerError>>;
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: String, http_client: reqwest::Client) -> Self {
        Self {
            base_url,
            http_client,
        }
    }
}

impl Transport for HttpTransport {
    fn get(&self, query: Vec<(String, String)>) -> BoxFuture<'static, Result<Value, ExplorerError>> {
        let request = self.http_client.get(&self.base_url).query(&query);

        async move {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ExplorerError::HttpStatus {
                    status: status.as_u16(),
                    message: status.canonical_reason().unwrap_or("unknown").to_string(),
                });
            }

            let body = response.json::<Value>().await?;
            Ok(body)
        }
        .boxed()
    }
}
