use async_trait::async_trait;
use codec::Encode;
use color_eyre::{
	eyre::{eyre, WrapErr},
	Result,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_retry::Retry;
use tracing::{debug, warn};

use super::{
	configuration::{RPCConfig, RetryConfig},
	Request, Response, EXECUTE_QUERY_METHOD, METADATA_METHOD,
};
use crate::network::Transport;

/// [`Transport`] over the node's HTTP JSON-RPC endpoint.
pub struct RpcTransport {
	http: reqwest::Client,
	url: String,
	retry_config: RetryConfig,
	next_id: AtomicU64,
}

impl RpcTransport {
	pub fn new(config: &RPCConfig) -> Result<Self> {
		let http = reqwest::Client::builder()
			.timeout(config.request_timeout)
			.build()
			.wrap_err("Failed to build HTTP client")?;
		Ok(Self {
			http,
			url: config.full_node_http.clone(),
			retry_config: config.retry.clone(),
			next_id: AtomicU64::new(1),
		})
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	async fn state_call_once(&self, method: &str, data: &[u8]) -> Result<Vec<u8>> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let request = Request::state_call(id, method, data);
		self.http
			.post(&self.url)
			.json(&request)
			.send()
			.await
			.wrap_err_with(|| format!("Failed to send {method} request to {}", self.url))?
			.error_for_status()?
			.json::<Response>()
			.await
			.wrap_err_with(|| format!("Failed to parse {method} response"))?
			.into_bytes()
	}

	async fn state_call(&self, method: &str, data: &[u8]) -> Result<Vec<u8>> {
		// try and execute the call, use the Retry strategy if needed
		Retry::spawn(self.retry_config.clone(), || async {
			self.state_call_once(method, data).await.map_err(|error| {
				warn!(method, "RPC call failed: {error:#}");
				error
			})
		})
		.await
		.map_err(|error| eyre!("{method} failed after retries: {error:#}"))
	}
}

#[async_trait]
impl Transport for RpcTransport {
	async fn fetch_metadata(&self) -> Result<Vec<u8>> {
		let metadata = self.state_call(METADATA_METHOD, &[]).await?;
		debug!(len = metadata.len(), "Runtime metadata fetched");
		Ok(metadata)
	}

	async fn raw_call(&self, program: &[u8], args: &[u8], gas_limit: Option<u64>) -> Result<Vec<u8>> {
		let data = (program, args, gas_limit).encode();
		self.state_call(EXECUTE_QUERY_METHOD, &data).await
	}
}
