//! Thin JSON-RPC facade over a full node. The indexer only needs two calls:
//! the current chain tip height and a fully materialized block by height.

pub mod types;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use types::Block;
use url::Url;

/// Errors surfaced by the node client. `Unavailable` covers transient
/// transport and node failures; callers are expected to retry those on their
/// next run rather than treat them as fatal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("node unavailable: {0}")]
    Unavailable(String),
    #[error("node rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed node response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Trait for abstracting the retrieval of chain data from the node.
#[async_trait::async_trait]
pub trait NodeApi: Send + Sync {
    /// Height of the current chain tip.
    async fn current_height(&self) -> Result<u64, Error>;

    /// The block at the given height with all transactions and their
    /// resolved prevouts.
    async fn block_by_height(&self, height: u64) -> Result<Block, Error>;
}

/// `NodeApi` implementation talking JSON-RPC to an `hsd` style node over
/// HTTP. The API key is passed through HTTP basic auth the way the node's
/// own client libraries do it.
pub struct HttpNodeClient {
    client: reqwest::Client,
    url: Url,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl HttpNodeClient {
    pub fn new(client: reqwest::Client, url: Url, api_key: Option<String>) -> Self {
        Self {
            client,
            url,
            api_key,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, Error> {
        let body = serde_json::json!({
            "method": method,
            "params": params,
            "id": 1,
        });
        let mut request = self.client.post(self.url.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.basic_auth("x", Some(key));
        }
        let response = request.send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::Unavailable(format!("HTTP {status}: {text}")));
        }

        let response = serde_json::from_str::<RpcResponse<T>>(&text)?;
        if let Some(error) = response.error {
            return Err(Error::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        response
            .result
            .ok_or_else(|| Error::Unavailable("empty rpc result".to_string()))
    }
}

#[async_trait::async_trait]
impl NodeApi for HttpNodeClient {
    async fn current_height(&self) -> Result<u64, Error> {
        self.execute("getblockcount", serde_json::json!([])).await
    }

    async fn block_by_height(&self, height: u64) -> Result<Block, Error> {
        // true, true: include transactions with resolved input values.
        self.execute("getblockbyheight", serde_json::json!([height, true, true]))
            .await
    }
}
