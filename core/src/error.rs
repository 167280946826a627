use crate::{
	types::{ErrorTag, ExtensionId},
	value::CodecError,
};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

type Cause = Box<dyn std::error::Error + Send + Sync>;

/// Longest input echo kept in [`Error::MetadataParse`].
const INPUT_ECHO_LIMIT: usize = 256;

#[derive(Debug, Error)]
pub enum Error {
	#[error("Unable to parse metadata: {cause}, input: {input}")]
	MetadataParse {
		#[source]
		cause: Cause,
		input: String,
	},
	#[error("Expected {expected} parameters, but got {actual}")]
	ArityMismatch { expected: usize, actual: usize },
	#[error("Failed to encode parameter \"{name}\": {source}")]
	ParamEncoding {
		name: String,
		#[source]
		source: CodecError,
	},
	#[error("Entrypoint {0} not found")]
	EntrypointNotFound(String),
	#[error("Extension function not found: {0}")]
	ExtensionNotFound(ExtensionId),
	#[error("Extension function signature mismatch: {actual} !== {expected}")]
	ExtensionSignatureMismatch { expected: String, actual: String },
	#[error("Extensions check failed. Please ensure the required extensions are available")]
	ExtensionCheckFailed(#[source] Option<Box<Error>>),
	#[error("PvqError: {0}")]
	RemoteQuery(ErrorTag),
	#[error("Invalid result: {0}")]
	InvalidResult(String),
	#[error("No return type found for entrypoint {0}")]
	NoReturnType(String),
	#[error("Failed to decode query result: {0}")]
	ResultDecode(#[source] CodecError),
	#[error("Transport failure: {0:#}")]
	Transport(color_eyre::Report),
}

impl Error {
	pub(crate) fn metadata_parse(
		cause: impl Into<Cause>,
		input: impl std::fmt::Display,
	) -> Self {
		let mut input = input.to_string();
		if input.len() > INPUT_ECHO_LIMIT {
			let mut end = INPUT_ECHO_LIMIT;
			while !input.is_char_boundary(end) {
				end -= 1;
			}
			input.truncate(end);
			input.push_str("...");
		}
		Error::MetadataParse {
			cause: cause.into(),
			input,
		}
	}

	/// True when the host was found incompatible with the program's extension requirements.
	/// Transport or metadata failures during the check say nothing about the host.
	pub fn is_incompatible_host(&self) -> bool {
		match self {
			Error::ExtensionNotFound(_) | Error::ExtensionSignatureMismatch { .. } => true,
			Error::ExtensionCheckFailed(None) => true,
			Error::ExtensionCheckFailed(Some(cause)) => cause.is_incompatible_host(),
			_ => false,
		}
	}
}
