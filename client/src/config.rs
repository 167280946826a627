use pvq_core::{
	network::rpc::configuration::RPCConfig,
	types::{tracing_level_format, ChainProperties, GasLimit},
};
use serde::{Deserialize, Serialize};
use tracing::Level;

/// Representation of a configuration used by this project.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
	#[serde(flatten)]
	pub rpc: RPCConfig,
	/// Log level, default is `INFO`. See `<https://docs.rs/log/0.4.14/log/enum.LevelFilter.html>` for possible log level values. (default: `INFO`).
	#[serde(with = "tracing_level_format")]
	pub log_level: Level,
	/// If set to true, logs are displayed in JSON format, which is used for structured logging. Otherwise, plain text format is used (default: false).
	pub log_format_json: bool,
	/// Gas limit applied to every query, node default when not set (default: None).
	pub gas_limit: Option<GasLimit>,
	/// Chain display hints, used to render account ids as SS58 addresses (default: None).
	pub chain_properties: Option<ChainProperties>,
}

impl Default for RuntimeConfig {
	fn default() -> Self {
		RuntimeConfig {
			rpc: Default::default(),
			log_level: Level::INFO,
			log_format_json: false,
			gas_limit: None,
			chain_properties: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[test]
	fn flattened_fields_and_defaults() {
		let config: RuntimeConfig = serde_json::from_str(
			r#"{
				"full_node_http": "http://node:9944",
				"request_timeout": 2000,
				"log_level": "debug",
				"gas_limit": "0x10",
				"chain_properties": { "ss58_format": 42 }
			}"#,
		)
		.unwrap();
		assert_eq!(config.rpc.full_node_http, "http://node:9944");
		assert_eq!(config.rpc.request_timeout, Duration::from_millis(2000));
		assert_eq!(config.rpc.retry, RPCConfig::default().retry);
		assert_eq!(config.log_level, Level::DEBUG);
		assert!(!config.log_format_json);
		assert_eq!(config.gas_limit, Some(GasLimit(16)));
		assert_eq!(config.chain_properties.and_then(|properties| properties.ss58_format), Some(42));
	}
}
