use crate::types::duration_millis_format;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff, FibonacciBackoff};

pub const LOCAL_ENDPOINT: &str = "http://127.0.0.1:9944";

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct RPCConfig {
	/// HTTP endpoint of the full node serving the PVQ runtime API (default: http://127.0.0.1:9944).
	pub full_node_http: String,
	/// Set the configuration based on which the retries will be orchestrated, max duration [in seconds] between retries and number of tries.
	/// (default:
	/// fibonacci:
	///     base: 1,
	///     max_delay: 10,
	///     retries: 4,
	/// )
	pub retry: RetryConfig,
	/// Timeout of a single HTTP request in milliseconds (default: 30000).
	#[serde(with = "duration_millis_format")]
	pub request_timeout: Duration,
}

impl Default for RPCConfig {
	fn default() -> Self {
		Self {
			full_node_http: LOCAL_ENDPOINT.into(),
			retry: RetryConfig::Fibonacci(FibonacciConfig {
				base: 1,
				max_delay: Duration::from_millis(10000),
				retries: 4,
			}),
			request_timeout: Duration::from_secs(30),
		}
	}
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum RetryConfig {
	#[serde(rename = "exponential")]
	Exponential(ExponentialConfig),

	#[serde(rename = "fibonacci")]
	Fibonacci(FibonacciConfig),
}

impl IntoIterator for RetryConfig {
	type Item = Duration;
	type IntoIter = std::vec::IntoIter<Self::Item>;

	fn into_iter(self) -> Self::IntoIter {
		match self {
			RetryConfig::Exponential(config) => ExponentialBackoff::from_millis(config.base)
				.factor(1000)
				.max_delay(config.max_delay)
				.map(jitter)
				.take(config.retries)
				.collect::<Vec<Duration>>()
				.into_iter(),
			RetryConfig::Fibonacci(config) => FibonacciBackoff::from_millis(config.base)
				.factor(1000)
				.max_delay(config.max_delay)
				.map(jitter)
				.take(config.retries)
				.collect::<Vec<Duration>>()
				.into_iter(),
		}
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExponentialConfig {
	pub base: u64,
	#[serde(with = "duration_millis_format")]
	pub max_delay: Duration,
	pub retries: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FibonacciConfig {
	pub base: u64,
	#[serde(with = "duration_millis_format")]
	pub max_delay: Duration,
	pub retries: usize,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn retry_delays_are_bounded() {
		let retry = RetryConfig::Exponential(ExponentialConfig {
			base: 2,
			max_delay: Duration::from_millis(5000),
			retries: 3,
		});
		let delays = retry.into_iter().collect::<Vec<_>>();
		assert_eq!(delays.len(), 3);
		assert!(delays.iter().all(|delay| *delay <= Duration::from_millis(5000)));
	}

	#[test]
	fn partial_config_falls_back_to_defaults() {
		let config: RPCConfig = serde_json::from_str(r#"{ "full_node_http": "http://node:9933" }"#).unwrap();
		assert_eq!(config.full_node_http, "http://node:9933");
		assert_eq!(config.retry, RPCConfig::default().retry);

		let config: RPCConfig = serde_json::from_str(
			r#"{ "retry": { "type": "exponential", "base": 10, "max_delay": 1000, "retries": 2 }, "request_timeout": 500 }"#,
		)
		.unwrap();
		assert_eq!(config.request_timeout, Duration::from_millis(500));
		assert!(matches!(config.retry, RetryConfig::Exponential(ExponentialConfig { retries: 2, .. })));
	}
}
