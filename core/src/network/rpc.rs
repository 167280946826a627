//! JSON-RPC transport reaching the PVQ runtime API through `state_call`.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};

use crate::utils::{from_hex, to_hex};

mod client;
pub mod configuration;

pub use client::RpcTransport;

pub const METADATA_METHOD: &str = "PvqApi_metadata";
pub const EXECUTE_QUERY_METHOD: &str = "PvqApi_execute_query";

#[derive(Debug, Serialize)]
struct Request<'a> {
	jsonrpc: &'static str,
	id: u64,
	method: &'static str,
	params: (&'a str, String),
}

impl<'a> Request<'a> {
	fn state_call(id: u64, runtime_method: &'a str, data: &[u8]) -> Self {
		Request {
			jsonrpc: "2.0",
			id,
			method: "state_call",
			params: (runtime_method, to_hex(data)),
		}
	}
}

#[derive(Debug, Deserialize)]
struct RpcError {
	code: i64,
	message: String,
}

#[derive(Debug, Deserialize)]
struct Response {
	result: Option<String>,
	error: Option<RpcError>,
}

impl Response {
	fn into_bytes(self) -> Result<Vec<u8>> {
		if let Some(RpcError { code, message }) = self.error {
			return Err(eyre!("RPC error {code}: {message}"));
		}
		let result = self.result.ok_or_else(|| eyre!("RPC response without result"))?;
		if !result.starts_with("0x") {
			return Err(eyre!("RPC result is not 0x-prefixed hex: {result}"));
		}
		Ok(from_hex(&result)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn state_call_request_shape() {
		let request = Request::state_call(7, METADATA_METHOD, &[]);
		assert_eq!(
			serde_json::to_value(&request).unwrap(),
			json!({
				"jsonrpc": "2.0",
				"id": 7,
				"method": "state_call",
				"params": ["PvqApi_metadata", "0x"],
			})
		);
	}

	#[test]
	fn response_decoding() {
		let response: Response = serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 1, "result": "0x0102" })).unwrap();
		assert_eq!(response.into_bytes().unwrap(), vec![1, 2]);

		let response: Response = serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 1, "result": "0102" })).unwrap();
		assert!(response.into_bytes().is_err());

		let response: Response = serde_json::from_value(json!({
			"jsonrpc": "2.0",
			"id": 1,
			"error": { "code": -32601, "message": "Method not found" },
		}))
		.unwrap();
		let error = response.into_bytes().unwrap_err();
		assert_eq!(error.to_string(), "RPC error -32601: Method not found");
	}
}
