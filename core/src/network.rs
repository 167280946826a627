use async_trait::async_trait;
use codec::Decode;
use color_eyre::Result;
use mockall::automock;

use crate::{error::Error, types::ErrorTag};

pub mod rpc;

/// Node side of a query: serves runtime metadata and executes programs.
#[async_trait]
#[automock]
pub trait Transport: Send + Sync {
	/// Returns the host's runtime metadata, length prefixed.
	async fn fetch_metadata(&self) -> Result<Vec<u8>>;

	/// Executes `program` with the encoded call payload `args`.
	///
	/// Returns the SCALE encoded tagged result, see [`QueryResult`].
	async fn raw_call(&self, program: &[u8], args: &[u8], gas_limit: Option<u64>) -> Result<Vec<u8>>;
}

/// Outcome of a query, as reported by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryResult {
	Ok(Vec<u8>),
	Err(ErrorTag),
}

impl QueryResult {
	/// Decodes SCALE `Result<Vec<u8>, PvqError>`. Anything else is an invalid result.
	pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
		let mut input = bytes;
		let result = std::result::Result::<Vec<u8>, ErrorTag>::decode(&mut input)
			.map_err(|error| Error::InvalidResult(format!("{error}: 0x{}", hex::encode(bytes))))?;
		if !input.is_empty() {
			return Err(Error::InvalidResult(format!(
				"{} trailing bytes: 0x{}",
				input.len(),
				hex::encode(bytes)
			)));
		}
		Ok(match result {
			Ok(bytes) => QueryResult::Ok(bytes),
			Err(tag) => QueryResult::Err(tag),
		})
	}
}
