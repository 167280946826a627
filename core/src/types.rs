use codec::{Decode, Encode};
use scale_info::PortableRegistry;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::BTreeMap, fmt, str::FromStr};
use strum::{Display, FromRepr};

/// Identifier of a host extension.
pub type ExtensionId = u64;
/// Position of a function inside its extension.
pub type FnIndex = u8;
/// Key into the type lookup table embedded in a metadata document.
pub type TypeId = u32;

/// Output type id reserved for functions without a return value.
pub const NO_RETURN_TYPE_ID: TypeId = 0;

/// One formal parameter of a function.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct FunctionParamMetadata {
	pub name: String,
	#[codec(compact)]
	pub ty: TypeId,
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct FunctionMetadata {
	pub name: String,
	pub inputs: Vec<FunctionParamMetadata>,
	/// Return type id, [`NO_RETURN_TYPE_ID`] for functions returning nothing.
	#[codec(compact)]
	pub output: TypeId,
}

impl FunctionMetadata {
	pub fn return_type(&self) -> Option<TypeId> {
		(self.output != NO_RETURN_TYPE_ID).then_some(self.output)
	}
}

/// Capability group a host may or may not provide.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct ExtensionMetadata {
	pub name: String,
	pub functions: Vec<FunctionMetadata>,
}

/// Declared shape of a guest program.
///
/// Position of an entry in `entrypoints` is its wire-level index.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct ProgramMetadata {
	pub types: PortableRegistry,
	/// Extension functions the program calls: extension id, function index within the
	/// extension, and the function shape the program was built against.
	pub extension_fns: Vec<(ExtensionId, FnIndex, FunctionMetadata)>,
	pub entrypoints: Vec<FunctionMetadata>,
}

/// Extensions actually implemented by a host, as exposed by its runtime API.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct RuntimeMetadata {
	pub types: PortableRegistry,
	pub extensions: BTreeMap<ExtensionId, ExtensionMetadata>,
}

/// Chain specific display hints. Only affects how addresses are rendered.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainProperties {
	pub ss58_format: Option<u16>,
	pub token_decimals: Option<u8>,
	pub token_symbol: Option<String>,
}

/// Failure categories reported by the host when a query does not complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, FromRepr)]
#[repr(u8)]
pub enum PvqError {
	FailedToDecode,
	InvalidPvqProgramFormat,
	QueryExceedsWeightLimit,
	Trap,
	MemoryAccessError,
	HostCallError,
	Other,
}

/// Raw error tag returned by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub struct ErrorTag(pub u8);

impl ErrorTag {
	pub fn known(&self) -> Option<PvqError> {
		PvqError::from_repr(self.0)
	}
}

impl fmt::Display for ErrorTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.known() {
			Some(error) => write!(f, "{error}"),
			None => write!(f, "Unknown({})", self.0),
		}
	}
}

/// Upper bound on the resources a query may consume on the host.
///
/// Parses from integers, decimal strings and `0x`-prefixed hex strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct GasLimit(pub u64);

impl From<u64> for GasLimit {
	fn from(value: u64) -> Self {
		GasLimit(value)
	}
}

impl From<GasLimit> for u64 {
	fn from(value: GasLimit) -> Self {
		value.0
	}
}

impl FromStr for GasLimit {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim().trim_end_matches('n');
		let parsed = match s.strip_prefix("0x") {
			Some(hex) => u64::from_str_radix(hex, 16),
			None => s.parse::<u64>(),
		};
		parsed
			.map(GasLimit)
			.map_err(|error| format!("Invalid gas limit {s:?}: {error}"))
	}
}

impl fmt::Display for GasLimit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl Serialize for GasLimit {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_u64(self.0)
	}
}

impl<'de> Deserialize<'de> for GasLimit {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			Number(u64),
			Text(String),
		}

		match Raw::deserialize(deserializer)? {
			Raw::Number(value) => Ok(GasLimit(value)),
			Raw::Text(value) => value.parse().map_err(de::Error::custom),
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
	/// Host default applies when not set.
	pub gas_limit: Option<GasLimit>,
}

impl QueryOptions {
	pub fn with_gas_limit(gas_limit: impl Into<GasLimit>) -> Self {
		Self {
			gas_limit: Some(gas_limit.into()),
		}
	}
}

pub mod tracing_level_format {
	use serde::{self, Deserialize, Deserializer, Serializer};
	use std::str::FromStr;
	use tracing::Level;

	pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&level.to_string())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value = String::deserialize(deserializer)?;
		Level::from_str(&value).map_err(serde::de::Error::custom)
	}
}

pub mod duration_millis_format {
	use serde::{self, Deserialize, Deserializer, Serializer};
	use std::time::Duration;

	pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_u64(duration.as_millis() as u64)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value = u64::deserialize(deserializer)?;
		Ok(Duration::from_millis(value))
	}
}
