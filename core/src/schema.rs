//! Shapes of the metadata documents understood by this crate.
//!
//! Every document shape implements [`MetadataDocument`], which ties it to its SCALE decoder and
//! its structured (JSON) decoder. Both decoders are derived on the types in [`crate::types`], so
//! any document can be built from bytes or from a plain object of the same shape.

use crate::types::{ProgramMetadata, RuntimeMetadata};
use codec::Decode;
use scale_info::PortableRegistry;
use serde::de::DeserializeOwned;

pub trait MetadataDocument: Decode + DeserializeOwned + Sized {
	/// Name used in diagnostics.
	const NAME: &'static str;

	/// Type lookup table embedded in the document.
	fn types(&self) -> &PortableRegistry;

	/// Decodes a bare SCALE record, without length prefix. Trailing bytes are rejected.
	fn decode_scale(mut bytes: &[u8]) -> Result<Self, codec::Error> {
		let document = Self::decode(&mut bytes)?;
		if !bytes.is_empty() {
			return Err(codec::Error::from("Trailing bytes after metadata record"));
		}
		Ok(document)
	}

	fn from_structured(value: serde_json::Value) -> Result<Self, serde_json::Error> {
		serde_json::from_value(value)
	}
}

impl MetadataDocument for ProgramMetadata {
	const NAME: &'static str = "ProgramMetadata";

	fn types(&self) -> &PortableRegistry {
		&self.types
	}
}

impl MetadataDocument for RuntimeMetadata {
	const NAME: &'static str = "RuntimeMetadata";

	fn types(&self) -> &PortableRegistry {
		&self.types
	}
}
