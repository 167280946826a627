//! Metadata parsing.
//!
//! A metadata document arrives as `0x`-hex text or raw bytes (both carrying a compact length
//! prefix), or as an already structured JSON object. Parsing yields the typed document together
//! with the frozen [`TypeRegistry`] built from its embedded type lookup table.

use crate::{
	error::{Error, Result},
	registry::{RegistryBuilder, TypeRegistry},
	schema::MetadataDocument,
	types::ChainProperties,
	utils::{from_hex, to_hex},
};
use codec::Decode;
use serde_json::Value;
use tracing::debug;

#[derive(Clone, Debug, PartialEq)]
pub enum MetadataInput {
	/// `0x`-prefixed hex of the length prefixed record.
	Hex(String),
	/// Length prefixed record.
	Bytes(Vec<u8>),
	/// Plain object shaped like the decoded record, without length prefix.
	Structured(Value),
}

impl From<&str> for MetadataInput {
	fn from(value: &str) -> Self {
		MetadataInput::Hex(value.to_string())
	}
}

impl From<String> for MetadataInput {
	fn from(value: String) -> Self {
		MetadataInput::Hex(value)
	}
}

impl From<Vec<u8>> for MetadataInput {
	fn from(value: Vec<u8>) -> Self {
		MetadataInput::Bytes(value)
	}
}

impl From<&[u8]> for MetadataInput {
	fn from(value: &[u8]) -> Self {
		MetadataInput::Bytes(value.to_vec())
	}
}

impl From<Value> for MetadataInput {
	fn from(value: Value) -> Self {
		MetadataInput::Structured(value)
	}
}

fn strip_length_prefix(bytes: &[u8]) -> std::result::Result<Vec<u8>, codec::Error> {
	let mut input = bytes;
	let record = Vec::<u8>::decode(&mut input)?;
	if !input.is_empty() {
		return Err(codec::Error::from("Trailing bytes after length prefixed record"));
	}
	Ok(record)
}

fn decode_document<M: MetadataDocument>(bytes: &[u8]) -> std::result::Result<M, codec::Error> {
	let record = strip_length_prefix(bytes)?;
	M::decode_scale(&record)
}

/// Parses a metadata document and builds the type registry over its lookup table.
///
/// Every type declared in the lookup table is resolved before returning, so later encode
/// and decode operations against the registry can only fail on values, never on structure.
pub fn parse_metadata<M: MetadataDocument>(
	input: impl Into<MetadataInput>,
	properties: Option<ChainProperties>,
) -> Result<(M, TypeRegistry)> {
	let input = input.into();
	let document = match &input {
		MetadataInput::Hex(text) => {
			let text = text.trim();
			if !text.starts_with("0x") {
				return Err(Error::metadata_parse("Expected 0x-prefixed hex", text));
			}
			let bytes = from_hex(text).map_err(|error| Error::metadata_parse(error, text))?;
			decode_document::<M>(&bytes).map_err(|error| Error::metadata_parse(error, text))?
		},
		MetadataInput::Bytes(bytes) => {
			decode_document::<M>(bytes).map_err(|error| Error::metadata_parse(error, to_hex(bytes)))?
		},
		MetadataInput::Structured(value) => {
			M::from_structured(value.clone()).map_err(|error| Error::metadata_parse(error, value))?
		},
	};

	let registry = RegistryBuilder::new()
		.lookup(document.types().clone())
		.chain_properties(properties)
		.freeze()
		.map_err(|error| match &input {
			MetadataInput::Bytes(bytes) => Error::metadata_parse(error, to_hex(bytes)),
			MetadataInput::Hex(text) => Error::metadata_parse(error, text),
			MetadataInput::Structured(value) => Error::metadata_parse(error, value),
		})?;

	debug!(document = M::NAME, types = registry.len(), "Metadata parsed");
	Ok((document, registry))
}


#[cfg(test)]
mod tests {
	use super::{fixtures::*, *};
	use crate::types::{ProgramMetadata, RuntimeMetadata};

	#[test]
	fn hex_asset_matches_programmatic_fixture() {
		let (metadata, registry) = parse_metadata::<ProgramMetadata>(PROGRAM_METADATA_HEX, None).unwrap();
		assert_eq!(metadata, program_metadata());
		assert_eq!(registry.len(), 6);
		assert_eq!(registry.type_name(2), Some("Vec<[u8;32]>"));
	}

	#[test]
	fn hex_and_structured_forms_agree() {
		let (decoded, _) = parse_metadata::<ProgramMetadata>(PROGRAM_METADATA_HEX, None).unwrap();
		let structured = serde_json::to_value(&decoded).unwrap();
		let (from_object, _) = parse_metadata::<ProgramMetadata>(structured, None).unwrap();
		assert_eq!(decoded, from_object);
	}

	#[test]
	fn bytes_form_is_length_prefixed() {
		let runtime = runtime_metadata::<u32, [u8; 32], u128>(EXT_FUNGIBLES);
		let (parsed, registry) = parse_metadata::<RuntimeMetadata>(prefixed(&runtime), None).unwrap();
		assert_eq!(parsed, runtime);
		assert!(!registry.is_empty());

		// the bare record misses its prefix
		let bare = codec::Encode::encode(&runtime);
		assert!(matches!(
			parse_metadata::<RuntimeMetadata>(bare, None),
			Err(Error::MetadataParse { .. })
		));
	}

	#[test]
	fn invalid_inputs_are_rejected_with_echo() {
		let error = parse_metadata::<ProgramMetadata>("not hex", None).unwrap_err();
		assert!(error.to_string().contains("input: not hex"), "{error}");

		let error = parse_metadata::<ProgramMetadata>("0x0102zz", None).unwrap_err();
		assert!(matches!(error, Error::MetadataParse { .. }));

		let truncated = &PROGRAM_METADATA_HEX.trim()[..40];
		let error = parse_metadata::<ProgramMetadata>(truncated, None).unwrap_err();
		assert!(matches!(error, Error::MetadataParse { .. }));

		let error = parse_metadata::<ProgramMetadata>(serde_json::json!({ "types": [] }), None).unwrap_err();
		assert!(matches!(error, Error::MetadataParse { .. }));
	}

	#[test]
	fn dangling_type_reference_is_a_parse_error() {
		let mut metadata = program_metadata();
		// drop `u8` and `u128`, leaving the element of `[u8; 32]` undeclared
		metadata.types.types.truncate(4);
		assert!(matches!(
			parse_metadata::<ProgramMetadata>(prefixed(&metadata), None),
			Err(Error::MetadataParse { .. })
		));
	}
}
