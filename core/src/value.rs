//! Type-driven SCALE encoding of JSON values.
//!
//! Values are [`serde_json::Value`]s, encoded and decoded under the [`TypeDescriptor`]s of a
//! frozen [`TypeRegistry`]. Dispatch happens on [`TypeKind`]; single-field composites are
//! transparent, and a compact wrapper is carried down to the integer it wraps.

use crate::{
	registry::{Field, Primitive, TypeDescriptor, TypeKind, TypeRegistry, VariantDescriptor},
	types::TypeId,
};
use codec::{Compact, Decode, Encode, Input};
use serde_json::{Map, Value};
use sp_core::{
	crypto::{AccountId32, Ss58AddressFormat, Ss58Codec},
	U256,
};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
	#[error("Unknown type id {0}")]
	UnknownType(TypeId),
	#[error("Expected {expected}, found {found}")]
	TypeMismatch { expected: String, found: String },
	#[error("Value {value} is out of range for {ty}")]
	OutOfRange { value: String, ty: &'static str },
	#[error("Expected {expected} elements, found {found}")]
	LengthMismatch { expected: usize, found: usize },
	#[error("Missing field {0}")]
	MissingField(String),
	#[error("Unknown variant {0}")]
	UnknownVariant(String),
	#[error("Invalid hex: {0}")]
	Hex(#[from] hex::FromHexError),
	#[error("Invalid SS58 address {0}")]
	Ss58(String),
	#[error("{0} is not supported")]
	Unsupported(&'static str),
	#[error("{0}")]
	Scale(#[from] codec::Error),
	#[error("{0} trailing bytes after value")]
	TrailingBytes(usize),
	#[error("Type {0} wraps itself")]
	RecursiveType(TypeId),
}

fn kind_of(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "bool",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}

fn mismatch(expected: impl Into<String>, value: &Value) -> CodecError {
	CodecError::TypeMismatch {
		expected: expected.into(),
		found: format!("{} {value}", kind_of(value)),
	}
}

fn resolve(registry: &TypeRegistry, ty: TypeId) -> Result<&TypeDescriptor, CodecError> {
	registry.resolve(ty).ok_or(CodecError::UnknownType(ty))
}

fn is_byte(registry: &TypeRegistry, ty: TypeId) -> bool {
	matches!(
		registry.resolve(ty).map(|descriptor| &descriptor.kind),
		Some(TypeKind::Primitive(Primitive::U8))
	)
}

/// Encodes `value` as type `ty`, appending to `out`.
pub fn encode_value(
	registry: &TypeRegistry,
	ty: TypeId,
	value: &Value,
	out: &mut Vec<u8>,
) -> Result<(), CodecError> {
	encode(registry, ty, false, value, out)
}

/// Decodes one value of type `ty` from the front of `input`.
pub fn decode_value(registry: &TypeRegistry, ty: TypeId, input: &mut &[u8]) -> Result<Value, CodecError> {
	decode(registry, ty, false, input)
}

fn encode(
	registry: &TypeRegistry,
	ty: TypeId,
	compact: bool,
	value: &Value,
	out: &mut Vec<u8>,
) -> Result<(), CodecError> {
	let descriptor = resolve(registry, ty)?;
	match &descriptor.kind {
		TypeKind::Primitive(primitive) => encode_primitive(*primitive, compact, value, out),
		TypeKind::Compact(inner) => encode(registry, *inner, true, value, out),
		TypeKind::Composite(fields) => {
			if fields.len() == 1 {
				unwrap_newtypes(registry, ty)?;
			}
			encode_fields(registry, fields, compact, value, out)
		},
		TypeKind::Variant(variants) => encode_variant(registry, descriptor, variants, value, out),
		TypeKind::Array { len, element } => {
			if is_byte(registry, *element) {
				let bytes = bytes_from_value(value, Some(*len as usize))?;
				out.extend_from_slice(&bytes);
				return Ok(());
			}
			let items = value.as_array().ok_or_else(|| mismatch("array", value))?;
			if items.len() != *len as usize {
				return Err(CodecError::LengthMismatch {
					expected: *len as usize,
					found: items.len(),
				});
			}
			items
				.iter()
				.try_for_each(|item| encode(registry, *element, compact, item, out))
		},
		TypeKind::Sequence(element) => {
			if is_byte(registry, *element) {
				bytes_from_value(value, None)?.encode_to(out);
				return Ok(());
			}
			let items = value.as_array().ok_or_else(|| mismatch("array", value))?;
			Compact(items.len() as u32).encode_to(out);
			items
				.iter()
				.try_for_each(|item| encode(registry, *element, compact, item, out))
		},
		TypeKind::Map { key, value: value_ty } => {
			let mut entries = map_entries(registry, *key, value)?
				.into_iter()
				.map(|(key_value, entry)| {
					let mut encoded = Vec::new();
					encode(registry, *key, false, &key_value, &mut encoded)?;
					Ok((key_order(registry, *key, &encoded)?, encoded, entry))
				})
				.collect::<Result<Vec<_>, CodecError>>()?;
			// sorted by key, later duplicates win, as when collecting into a `BTreeMap`
			entries.reverse();
			entries.sort_by(|a, b| a.0.cmp(&b.0));
			entries.dedup_by(|later, earlier| later.0 == earlier.0);

			Compact(entries.len() as u32).encode_to(out);
			for (_, encoded_key, entry) in entries {
				out.extend_from_slice(&encoded_key);
				encode(registry, *value_ty, false, entry, out)?;
			}
			Ok(())
		},
		TypeKind::Tuple(items) => {
			let values = match value {
				Value::Array(values) => values.as_slice(),
				Value::Null if items.is_empty() => &[],
				_ => return Err(mismatch(format!("tuple {}", descriptor.name), value)),
			};
			if values.len() != items.len() {
				return Err(CodecError::LengthMismatch {
					expected: items.len(),
					found: values.len(),
				});
			}
			items
				.iter()
				.zip(values)
				.try_for_each(|(item, value)| encode(registry, *item, compact, value, out))
		},
		TypeKind::BitSequence => Err(CodecError::Unsupported("BitVec")),
	}
}

fn encode_fields(
	registry: &TypeRegistry,
	fields: &[Field],
	compact: bool,
	value: &Value,
	out: &mut Vec<u8>,
) -> Result<(), CodecError> {
	match fields {
		[] => Ok(()),
		[field] => {
			// newtype, optionally spelled out as `{ "field": value }`
			let inner = match (&field.name, value) {
				(Some(name), Value::Object(object)) if object.len() == 1 => {
					object.get(name).unwrap_or(value)
				},
				_ => value,
			};
			encode(registry, field.ty, compact, inner, out)
		},
		_ if fields.iter().all(|field| field.name.is_some()) => {
			let object = value.as_object().ok_or_else(|| mismatch("object", value))?;
			for field in fields {
				let name = field.name.as_deref().unwrap_or_default();
				let field_value = object
					.get(name)
					.ok_or_else(|| CodecError::MissingField(name.to_string()))?;
				encode(registry, field.ty, false, field_value, out)?;
			}
			Ok(())
		},
		_ => {
			let values = value.as_array().ok_or_else(|| mismatch("array", value))?;
			if values.len() != fields.len() {
				return Err(CodecError::LengthMismatch {
					expected: fields.len(),
					found: values.len(),
				});
			}
			fields
				.iter()
				.zip(values)
				.try_for_each(|(field, value)| encode(registry, field.ty, false, value, out))
		},
	}
}

fn find_variant<'a>(variants: &'a [VariantDescriptor], name: &str) -> Result<&'a VariantDescriptor, CodecError> {
	variants
		.iter()
		.find(|variant| variant.name == name)
		.ok_or_else(|| CodecError::UnknownVariant(name.to_string()))
}

fn encode_variant(
	registry: &TypeRegistry,
	descriptor: &TypeDescriptor,
	variants: &[VariantDescriptor],
	value: &Value,
	out: &mut Vec<u8>,
) -> Result<(), CodecError> {
	if descriptor.is_option() {
		if value.is_null() {
			let none = find_variant(variants, "None")?;
			out.push(none.index);
			return Ok(());
		}
		let some = find_variant(variants, "Some")?;
		out.push(some.index);
		return encode_fields(registry, &some.fields, false, value, out);
	}

	match value {
		Value::String(name) => {
			let variant = find_variant(variants, name)?;
			if !variant.fields.is_empty() {
				return Err(mismatch(format!("fields of variant {name}"), value));
			}
			out.push(variant.index);
			Ok(())
		},
		Value::Object(object) if object.len() == 1 => {
			let (name, inner) = object.iter().next().ok_or_else(|| mismatch("variant", value))?;
			let variant = find_variant(variants, name)?;
			out.push(variant.index);
			encode_fields(registry, &variant.fields, false, inner, out)
		},
		_ => Err(mismatch(format!("variant of {}", descriptor.name), value)),
	}
}

/// Peels single-field composites to find what a type finally encodes as.
fn unwrap_newtypes(registry: &TypeRegistry, mut ty: TypeId) -> Result<&TypeDescriptor, CodecError> {
	let mut seen = BTreeSet::new();
	loop {
		if !seen.insert(ty) {
			return Err(CodecError::RecursiveType(ty));
		}
		let descriptor = resolve(registry, ty)?;
		match &descriptor.kind {
			TypeKind::Composite(fields) if fields.len() == 1 => ty = fields[0].ty,
			_ => return Ok(descriptor),
		}
	}
}

/// Bytes of an encoded key that compare like the key itself.
fn key_order(registry: &TypeRegistry, key: TypeId, encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
	let descriptor = unwrap_newtypes(registry, key)?;
	Ok(match &descriptor.kind {
		TypeKind::Primitive(Primitive::Str) => String::decode(&mut &encoded[..])?.into_bytes(),
		TypeKind::Sequence(element) if is_byte(registry, *element) => Vec::<u8>::decode(&mut &encoded[..])?,
		TypeKind::Primitive(
			Primitive::Char |
			Primitive::U16 |
			Primitive::U32 |
			Primitive::U64 |
			Primitive::U128 |
			Primitive::U256,
		) => encoded.iter().rev().copied().collect(),
		TypeKind::Primitive(
			Primitive::I8 | Primitive::I16 | Primitive::I32 | Primitive::I64 | Primitive::I128,
		) => {
			let mut order = encoded.iter().rev().copied().collect::<Vec<_>>();
			if let Some(sign) = order.first_mut() {
				*sign ^= 0x80;
			}
			order
		},
		_ => encoded.to_vec(),
	})
}

/// Object keys are text; they are read back under the key type. Numbers stay strings, which
/// keeps integers wider than 64 bits exact.
fn object_key(kind: &TypeKind, name: &str) -> Value {
	let parsed = match kind {
		TypeKind::Primitive(Primitive::Bool) |
		TypeKind::Composite(_) |
		TypeKind::Tuple(_) |
		TypeKind::Array { .. } |
		TypeKind::Sequence(_) => serde_json::from_str(name).ok(),
		_ => None,
	};
	parsed.unwrap_or_else(|| Value::String(name.to_string()))
}

fn map_entries<'a>(
	registry: &TypeRegistry,
	key: TypeId,
	value: &'a Value,
) -> Result<Vec<(Value, &'a Value)>, CodecError> {
	match value {
		Value::Object(object) => {
			let kind = &unwrap_newtypes(registry, key)?.kind;
			Ok(object
				.iter()
				.map(|(name, entry)| (object_key(kind, name), entry))
				.collect())
		},
		Value::Array(pairs) => pairs
			.iter()
			.map(|pair| match pair.as_array().map(Vec::as_slice) {
				Some([key_value, entry]) => Ok((key_value.clone(), entry)),
				_ => Err(mismatch("[key, value] pair", pair)),
			})
			.collect(),
		_ => Err(mismatch("object or array of pairs", value)),
	}
}

fn bytes_from_value(value: &Value, len: Option<usize>) -> Result<Vec<u8>, CodecError> {
	let bytes = match value {
		Value::String(text) => match text.strip_prefix("0x") {
			Some(hex) => hex::decode(hex)?,
			None if len == Some(32) => {
				let (account, _) = AccountId32::from_ss58check_with_version(text)
					.map_err(|error| CodecError::Ss58(format!("{text}: {error:?}")))?;
				let raw: &[u8] = account.as_ref();
				raw.to_vec()
			},
			None if len.is_none() => text.as_bytes().to_vec(),
			None => return Err(mismatch("0x-prefixed hex", value)),
		},
		Value::Array(items) => items
			.iter()
			.map(|item| {
				item.as_u64()
					.and_then(|byte| u8::try_from(byte).ok())
					.ok_or_else(|| mismatch("byte", item))
			})
			.collect::<Result<Vec<_>, _>>()?,
		_ => return Err(mismatch("bytes", value)),
	};

	match len {
		Some(len) if bytes.len() != len => Err(CodecError::LengthMismatch {
			expected: len,
			found: bytes.len(),
		}),
		_ => Ok(bytes),
	}
}

fn unsigned(value: &Value, ty: &'static str) -> Result<u128, CodecError> {
	match value {
		Value::Number(number) => number.as_u64().map(u128::from).ok_or_else(|| CodecError::OutOfRange {
			value: number.to_string(),
			ty,
		}),
		Value::String(text) => {
			let text = text.trim();
			match text.strip_prefix("0x") {
				Some(hex) => u128::from_str_radix(hex, 16),
				None => text.parse::<u128>(),
			}
			.map_err(|_| mismatch(ty, value))
		},
		_ => Err(mismatch(ty, value)),
	}
}

fn signed(value: &Value, ty: &'static str) -> Result<i128, CodecError> {
	match value {
		Value::Number(number) => number.as_i64().map(i128::from).ok_or_else(|| CodecError::OutOfRange {
			value: number.to_string(),
			ty,
		}),
		Value::String(text) => text.trim().parse::<i128>().map_err(|_| mismatch(ty, value)),
		_ => Err(mismatch(ty, value)),
	}
}

fn narrow<T: TryFrom<N>, N: Copy + ToString>(number: N, ty: &'static str) -> Result<T, CodecError> {
	T::try_from(number).map_err(|_| CodecError::OutOfRange {
		value: number.to_string(),
		ty,
	})
}

fn encode_maybe_compact<T>(compact: bool, value: T, out: &mut Vec<u8>)
where
	T: Encode,
	Compact<T>: Encode,
{
	if compact {
		Compact(value).encode_to(out)
	} else {
		value.encode_to(out)
	}
}

fn encode_primitive(
	primitive: Primitive,
	compact: bool,
	value: &Value,
	out: &mut Vec<u8>,
) -> Result<(), CodecError> {
	let ty = primitive.name();
	let integer = matches!(
		primitive,
		Primitive::U8 | Primitive::U16 | Primitive::U32 | Primitive::U64 | Primitive::U128
	);
	if compact && !integer {
		return Err(CodecError::Unsupported("compact encoding of a non-unsigned type"));
	}

	match primitive {
		Primitive::Bool => value.as_bool().ok_or_else(|| mismatch(ty, value))?.encode_to(out),
		Primitive::Char => {
			let text = value.as_str().ok_or_else(|| mismatch(ty, value))?;
			let mut chars = text.chars();
			match (chars.next(), chars.next()) {
				(Some(c), None) => (c as u32).encode_to(out),
				_ => return Err(mismatch(ty, value)),
			}
		},
		Primitive::Str => value.as_str().ok_or_else(|| mismatch(ty, value))?.encode_to(out),
		Primitive::U8 => encode_maybe_compact::<u8>(compact, narrow::<u8, _>(unsigned(value, ty)?, ty)?, out),
		Primitive::U16 => encode_maybe_compact::<u16>(compact, narrow::<u16, _>(unsigned(value, ty)?, ty)?, out),
		Primitive::U32 => encode_maybe_compact::<u32>(compact, narrow::<u32, _>(unsigned(value, ty)?, ty)?, out),
		Primitive::U64 => encode_maybe_compact::<u64>(compact, narrow::<u64, _>(unsigned(value, ty)?, ty)?, out),
		Primitive::U128 => encode_maybe_compact::<u128>(compact, unsigned(value, ty)?, out),
		Primitive::U256 => {
			let number = match value {
				Value::Number(number) => number.as_u64().map(U256::from),
				Value::String(text) => U256::from_dec_str(text.trim()).ok(),
				_ => None,
			}
			.ok_or_else(|| mismatch(ty, value))?;
			number.encode_to(out)
		},
		Primitive::I8 => narrow::<i8, _>(signed(value, ty)?, ty)?.encode_to(out),
		Primitive::I16 => narrow::<i16, _>(signed(value, ty)?, ty)?.encode_to(out),
		Primitive::I32 => narrow::<i32, _>(signed(value, ty)?, ty)?.encode_to(out),
		Primitive::I64 => narrow::<i64, _>(signed(value, ty)?, ty)?.encode_to(out),
		Primitive::I128 => signed(value, ty)?.encode_to(out),
		Primitive::I256 => return Err(CodecError::Unsupported("i256")),
	}
	Ok(())
}

fn decode(registry: &TypeRegistry, ty: TypeId, compact: bool, input: &mut &[u8]) -> Result<Value, CodecError> {
	let descriptor = resolve(registry, ty)?;
	match &descriptor.kind {
		TypeKind::Primitive(primitive) => decode_primitive(*primitive, compact, input),
		TypeKind::Compact(inner) => decode(registry, *inner, true, input),
		TypeKind::Composite(fields) => {
			if fields.len() == 1 {
				unwrap_newtypes(registry, ty)?;
			}
			if let Some(address) = decode_account(registry, descriptor, input)? {
				return Ok(address);
			}
			decode_fields(registry, fields, compact, input)
		},
		TypeKind::Variant(variants) => {
			let index = u8::decode(input)?;
			let variant = variants
				.iter()
				.find(|variant| variant.index == index)
				.ok_or_else(|| CodecError::UnknownVariant(format!("{}#{index}", descriptor.name)))?;
			if descriptor.is_option() {
				return match variant.name.as_str() {
					"None" => Ok(Value::Null),
					_ => decode_fields(registry, &variant.fields, false, input),
				};
			}
			if variant.fields.is_empty() {
				return Ok(Value::String(variant.name.clone()));
			}
			let inner = decode_fields(registry, &variant.fields, false, input)?;
			Ok(Value::Object(Map::from_iter([(variant.name.clone(), inner)])))
		},
		TypeKind::Array { len, element } => {
			if is_byte(registry, *element) {
				let mut bytes = vec![0u8; *len as usize];
				input.read(&mut bytes)?;
				return Ok(Value::String(format!("0x{}", hex::encode(bytes))));
			}
			(0..*len)
				.map(|_| decode(registry, *element, compact, input))
				.collect::<Result<Vec<_>, _>>()
				.map(Value::Array)
		},
		TypeKind::Sequence(element) => {
			if is_byte(registry, *element) {
				let bytes = Vec::<u8>::decode(input)?;
				return Ok(Value::String(format!("0x{}", hex::encode(bytes))));
			}
			let len = Compact::<u32>::decode(input)?.0;
			(0..len)
				.map(|_| decode(registry, *element, compact, input))
				.collect::<Result<Vec<_>, _>>()
				.map(Value::Array)
		},
		TypeKind::Map { key, value } => {
			let len = Compact::<u32>::decode(input)?.0;
			let mut entries = Vec::new();
			for _ in 0..len {
				let key_value = decode(registry, *key, false, input)?;
				let entry = decode(registry, *value, false, input)?;
				entries.push((key_value, entry));
			}
			if entries
				.iter()
				.all(|(key, _)| matches!(key, Value::String(_) | Value::Number(_)))
			{
				let object = entries
					.into_iter()
					.map(|(key, entry)| match key {
						Value::String(key) => (key, entry),
						key => (key.to_string(), entry),
					})
					.collect::<Map<_, _>>();
				return Ok(Value::Object(object));
			}
			Ok(Value::Array(
				entries
					.into_iter()
					.map(|(key, entry)| Value::Array(vec![key, entry]))
					.collect(),
			))
		},
		TypeKind::Tuple(items) => items
			.iter()
			.map(|item| decode(registry, *item, compact, input))
			.collect::<Result<Vec<_>, _>>()
			.map(Value::Array),
		TypeKind::BitSequence => Err(CodecError::Unsupported("BitVec")),
	}
}

/// Renders `AccountId32` as SS58 when the chain declares an address format.
fn decode_account(
	registry: &TypeRegistry,
	descriptor: &TypeDescriptor,
	input: &mut &[u8],
) -> Result<Option<Value>, CodecError> {
	let Some(format) = registry.properties().and_then(|properties| properties.ss58_format) else {
		return Ok(None);
	};
	if descriptor.ident() != Some("AccountId32") {
		return Ok(None);
	}
	let inner = unwrap_newtypes(registry, descriptor.id)?;
	if !matches!(inner.kind, TypeKind::Array { len: 32, element } if is_byte(registry, element)) {
		return Ok(None);
	}
	let raw = <[u8; 32]>::decode(input)?;
	let address = AccountId32::from(raw).to_ss58check_with_version(Ss58AddressFormat::custom(format));
	Ok(Some(Value::String(address)))
}

fn decode_fields(
	registry: &TypeRegistry,
	fields: &[Field],
	compact: bool,
	input: &mut &[u8],
) -> Result<Value, CodecError> {
	match fields {
		[] => Ok(Value::Null),
		[field] => decode(registry, field.ty, compact, input),
		_ if fields.iter().all(|field| field.name.is_some()) => {
			let mut object = Map::new();
			for field in fields {
				let value = decode(registry, field.ty, false, input)?;
				object.insert(field.name.clone().unwrap_or_default(), value);
			}
			Ok(Value::Object(object))
		},
		_ => fields
			.iter()
			.map(|field| decode(registry, field.ty, false, input))
			.collect::<Result<Vec<_>, _>>()
			.map(Value::Array),
	}
}

fn decode_maybe_compact<T>(compact: bool, input: &mut &[u8]) -> Result<T, CodecError>
where
	T: Decode,
	Compact<T>: Decode,
{
	Ok(if compact {
		Compact::<T>::decode(input)?.0
	} else {
		T::decode(input)?
	})
}

fn wide_unsigned(value: u128) -> Value {
	match u64::try_from(value) {
		Ok(value) => Value::from(value),
		Err(_) => Value::String(value.to_string()),
	}
}

fn wide_signed(value: i128) -> Value {
	match i64::try_from(value) {
		Ok(value) => Value::from(value),
		Err(_) => Value::String(value.to_string()),
	}
}

fn decode_primitive(primitive: Primitive, compact: bool, input: &mut &[u8]) -> Result<Value, CodecError> {
	Ok(match primitive {
		Primitive::Bool => Value::Bool(bool::decode(input)?),
		Primitive::Char => {
			let code = u32::decode(input)?;
			let c = char::from_u32(code).ok_or(CodecError::OutOfRange {
				value: code.to_string(),
				ty: "char",
			})?;
			Value::String(c.to_string())
		},
		Primitive::Str => Value::String(String::decode(input)?),
		Primitive::U8 => Value::from(decode_maybe_compact::<u8>(compact, input)?),
		Primitive::U16 => Value::from(decode_maybe_compact::<u16>(compact, input)?),
		Primitive::U32 => Value::from(decode_maybe_compact::<u32>(compact, input)?),
		Primitive::U64 => Value::from(decode_maybe_compact::<u64>(compact, input)?),
		Primitive::U128 => wide_unsigned(decode_maybe_compact::<u128>(compact, input)?),
		Primitive::U256 => {
			let number = U256::decode(input)?;
			if number <= U256::from(u64::MAX) {
				Value::from(number.low_u64())
			} else {
				Value::String(number.to_string())
			}
		},
		Primitive::I8 => Value::from(i8::decode(input)?),
		Primitive::I16 => Value::from(i16::decode(input)?),
		Primitive::I32 => Value::from(i32::decode(input)?),
		Primitive::I64 => Value::from(i64::decode(input)?),
		Primitive::I128 => wide_signed(i128::decode(input)?),
		Primitive::I256 => return Err(CodecError::Unsupported("i256")),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{registry::RegistryBuilder, types::ChainProperties};
	use codec::Encode;
	use hex_literal::hex;
	use scale_info::{meta_type, PortableRegistry, Registry, TypeDef, TypeInfo};
	use serde_json::json;
	use std::collections::BTreeMap;
	use test_case::test_case;

	const ALICE: [u8; 32] = hex!("d43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d");
	const ALICE_SS58: &str = "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5";

	#[allow(dead_code)]
	#[derive(TypeInfo, Encode)]
	struct AccountId32([u8; 32]);

	#[allow(dead_code)]
	#[derive(TypeInfo, Encode)]
	struct PoolInfo {
		asset: u32,
		#[codec(compact)]
		reserve: u128,
		owner: AccountId32,
	}

	#[allow(dead_code)]
	#[derive(TypeInfo)]
	struct Wrapper(u32);

	#[allow(dead_code)]
	#[derive(TypeInfo, Encode)]
	enum Status {
		Idle,
		Busy(u8),
		Locked { until: u64 },
	}

	fn registry_for<T: TypeInfo + 'static>(properties: Option<ChainProperties>) -> (TypeRegistry, TypeId) {
		let mut registry = Registry::new();
		let id = registry.register_type(&meta_type::<T>()).id;
		let registry = RegistryBuilder::new()
			.lookup(registry.into())
			.chain_properties(properties)
			.freeze()
			.unwrap();
		(registry, id)
	}

	fn encode_as<T: TypeInfo + 'static>(value: Value) -> Result<Vec<u8>, CodecError> {
		let (registry, id) = registry_for::<T>(None);
		registry.encode(id, &value)
	}

	fn decode_as<T: TypeInfo + 'static>(bytes: &[u8]) -> Value {
		let (registry, id) = registry_for::<T>(None);
		registry.decode(id, bytes).unwrap()
	}

	#[test_case(encode_as::<u32>(json!(21)).unwrap() => 21u32.encode() ; "u32 from number")]
	#[test_case(encode_as::<u128>(json!("340282366920938463463374607431768211455")).unwrap() => u128::MAX.encode() ; "u128 from string")]
	#[test_case(encode_as::<i16>(json!(-2)).unwrap() => (-2i16).encode() ; "Signed")]
	#[test_case(encode_as::<bool>(json!(true)).unwrap() => vec![1] ; "Bool")]
	#[test_case(encode_as::<String>(json!("pvq")).unwrap() => "pvq".encode() ; "Text")]
	#[test_case(encode_as::<Compact<u32>>(json!(1)).unwrap() => vec![4] ; "Compact")]
	#[test_case(encode_as::<Vec<u8>>(json!("0x0102")).unwrap() => vec![8, 1, 2] ; "Bytes from hex")]
	#[test_case(encode_as::<Vec<u8>>(json!([1, 2])).unwrap() => vec![8, 1, 2] ; "Bytes from array")]
	#[test_case(encode_as::<[u8; 32]>(json!(ALICE_SS58)).unwrap() => ALICE.to_vec() ; "Address from SS58")]
	#[test_case(encode_as::<Option<u32>>(json!(null)).unwrap() => vec![0] ; "None")]
	#[test_case(encode_as::<Option<u32>>(json!(7)).unwrap() => Some(7u32).encode() ; "Some")]
	#[test_case(encode_as::<(u8, bool)>(json!([1, false])).unwrap() => (1u8, false).encode() ; "Tuple")]
	#[test_case(encode_as::<Status>(json!("Idle")).unwrap() => Status::Idle.encode() ; "Unit variant")]
	#[test_case(encode_as::<Status>(json!({"Busy": 3})).unwrap() => Status::Busy(3).encode() ; "Tuple variant")]
	#[test_case(encode_as::<Status>(json!({"Locked": {"until": 9}})).unwrap() => Status::Locked { until: 9 }.encode() ; "Struct variant")]
	fn encodes(bytes: Vec<u8>) -> Vec<u8> {
		bytes
	}

	#[test]
	fn encodes_named_composite() {
		let value = json!({ "asset": 1, "reserve": 1000, "owner": format!("0x{}", hex::encode(ALICE)) });
		let expected = PoolInfo {
			asset: 1,
			reserve: 1000,
			owner: AccountId32(ALICE),
		}
		.encode();
		assert_eq!(encode_as::<PoolInfo>(value).unwrap(), expected);
	}

	#[test]
	fn encodes_map_in_key_order() {
		let expected = BTreeMap::from([(2u32, 20u64), (10, 100)]).encode();
		assert_eq!(
			encode_as::<BTreeMap<u32, u64>>(json!({"2": 20, "10": 100})).unwrap(),
			expected
		);
		assert_eq!(
			encode_as::<BTreeMap<u32, u64>>(json!([[10, 100], [2, 20]])).unwrap(),
			expected
		);

		let expected = BTreeMap::from([(-300i32, 1u8), (-1, 2), (7, 3)]).encode();
		assert_eq!(
			encode_as::<BTreeMap<i32, u8>>(json!({"7": 3, "-1": 2, "-300": 1})).unwrap(),
			expected
		);

		let expected = BTreeMap::from([("a".to_string(), 1u8), ("ab".to_string(), 2), ("b".to_string(), 3)]).encode();
		assert_eq!(
			encode_as::<BTreeMap<String, u8>>(json!([["b", 3], ["ab", 2], ["a", 1]])).unwrap(),
			expected
		);
	}

	#[test]
	fn later_duplicate_map_keys_win() {
		assert_eq!(
			encode_as::<BTreeMap<u32, u64>>(json!([[1, 10], [1, 11]])).unwrap(),
			BTreeMap::from([(1u32, 11u64)]).encode()
		);
	}

	#[test]
	fn decoded_wide_map_keys_encode_back() {
		let original = BTreeMap::from([(5u128, 2u8), (u128::MAX, 1)]).encode();
		let (registry, id) = registry_for::<BTreeMap<u128, u8>>(None);
		let value = registry.decode(id, &original).unwrap();
		assert_eq!(value, json!({"5": 2, "340282366920938463463374607431768211455": 1}));
		assert_eq!(registry.encode(id, &value).unwrap(), original);
	}

	#[test]
	fn self_wrapping_newtype_is_rejected() {
		let mut registry = Registry::new();
		let id = registry.register_type(&meta_type::<Wrapper>()).id;
		let mut lookup: PortableRegistry = registry.into();
		for portable in &mut lookup.types {
			if let TypeDef::Composite(composite) = &mut portable.ty.type_def {
				for field in &mut composite.fields {
					field.ty.id = id;
				}
			}
		}
		let registry = RegistryBuilder::new().lookup(lookup).freeze().unwrap();

		assert!(matches!(
			registry.encode(id, &json!(1)),
			Err(CodecError::RecursiveType(_))
		));
		assert!(matches!(
			registry.decode(id, &[1, 0, 0, 0]),
			Err(CodecError::RecursiveType(_))
		));
	}

	#[test_case(encode_as::<u8>(json!(256)) ; "Out of range")]
	#[test_case(encode_as::<u32>(json!("abc")) ; "Not a number")]
	#[test_case(encode_as::<u32>(json!(-1)) ; "Negative unsigned")]
	#[test_case(encode_as::<[u8; 32]>(json!("0x0102")) ; "Short array")]
	#[test_case(encode_as::<[u8; 32]>(json!("not-an-address")) ; "Bad address")]
	#[test_case(encode_as::<Status>(json!("Sleeping")) ; "Unknown variant")]
	#[test_case(encode_as::<PoolInfo>(json!({"asset": 1})) ; "Missing field")]
	#[test_case(encode_as::<(u8, bool)>(json!([1])) ; "Short tuple")]
	fn rejects(result: Result<Vec<u8>, CodecError>) {
		assert!(result.is_err(), "unexpectedly encoded: {result:?}");
	}

	#[test]
	fn decodes_values() {
		assert_eq!(decode_as::<u32>(&21u32.encode()), json!(21));
		assert_eq!(decode_as::<u128>(&u128::MAX.encode()), json!(u128::MAX.to_string()));
		assert_eq!(decode_as::<Vec<u8>>(&vec![1u8, 2].encode()), json!("0x0102"));
		assert_eq!(decode_as::<Option<u32>>(&None::<u32>.encode()), json!(null));
		assert_eq!(decode_as::<Option<u32>>(&Some(5u32).encode()), json!(5));
		assert_eq!(decode_as::<Status>(&Status::Busy(3).encode()), json!({"Busy": 3}));
		assert_eq!(
			decode_as::<Status>(&Status::Locked { until: 9 }.encode()),
			json!({"Locked": 9})
		);
		assert_eq!(
			decode_as::<BTreeMap<u32, u64>>(&BTreeMap::from([(1u32, 10u64)]).encode()),
			json!({"1": 10})
		);
	}

	#[test]
	fn decodes_account_as_ss58_with_chain_properties() {
		let properties = ChainProperties {
			ss58_format: Some(0),
			..Default::default()
		};
		let (registry, id) = registry_for::<AccountId32>(Some(properties));
		assert_eq!(registry.decode(id, &ALICE).unwrap(), json!(ALICE_SS58));

		let (registry, id) = registry_for::<AccountId32>(None);
		assert_eq!(
			registry.decode(id, &ALICE).unwrap(),
			json!(format!("0x{}", hex::encode(ALICE)))
		);
	}

	#[test]
	fn decode_rejects_trailing_bytes() {
		let (registry, id) = registry_for::<u8>(None);
		assert!(matches!(
			registry.decode(id, &[1, 2]),
			Err(CodecError::TrailingBytes(1))
		));
	}
}
