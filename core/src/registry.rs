//! Frozen type registry built from a metadata document's type lookup table.
//!
//! Construction is two-phase: a [`RegistryBuilder`] collects the lookup table and the optional
//! chain properties, and [`RegistryBuilder::freeze`] resolves every declared type id into a
//! [`TypeDescriptor`] up front. A [`TypeRegistry`] never exists without its lookup table, and
//! once frozen, type resolution can only fail for ids that were never declared.

use crate::{
	types::{ChainProperties, TypeId},
	value::{self, CodecError},
};
use scale_info::{form::PortableForm, PortableRegistry, Type, TypeDef, TypeDefPrimitive};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
	Bool,
	Char,
	Str,
	U8,
	U16,
	U32,
	U64,
	U128,
	U256,
	I8,
	I16,
	I32,
	I64,
	I128,
	I256,
}

impl Primitive {
	pub fn name(&self) -> &'static str {
		match self {
			Primitive::Bool => "bool",
			Primitive::Char => "char",
			Primitive::Str => "str",
			Primitive::U8 => "u8",
			Primitive::U16 => "u16",
			Primitive::U32 => "u32",
			Primitive::U64 => "u64",
			Primitive::U128 => "u128",
			Primitive::U256 => "u256",
			Primitive::I8 => "i8",
			Primitive::I16 => "i16",
			Primitive::I32 => "i32",
			Primitive::I64 => "i64",
			Primitive::I128 => "i128",
			Primitive::I256 => "i256",
		}
	}
}

impl From<&TypeDefPrimitive> for Primitive {
	fn from(primitive: &TypeDefPrimitive) -> Self {
		match primitive {
			TypeDefPrimitive::Bool => Primitive::Bool,
			TypeDefPrimitive::Char => Primitive::Char,
			TypeDefPrimitive::Str => Primitive::Str,
			TypeDefPrimitive::U8 => Primitive::U8,
			TypeDefPrimitive::U16 => Primitive::U16,
			TypeDefPrimitive::U32 => Primitive::U32,
			TypeDefPrimitive::U64 => Primitive::U64,
			TypeDefPrimitive::U128 => Primitive::U128,
			TypeDefPrimitive::U256 => Primitive::U256,
			TypeDefPrimitive::I8 => Primitive::I8,
			TypeDefPrimitive::I16 => Primitive::I16,
			TypeDefPrimitive::I32 => Primitive::I32,
			TypeDefPrimitive::I64 => Primitive::I64,
			TypeDefPrimitive::I128 => Primitive::I128,
			TypeDefPrimitive::I256 => Primitive::I256,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
	pub name: Option<String>,
	pub ty: TypeId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantDescriptor {
	pub name: String,
	pub index: u8,
	pub fields: Vec<Field>,
}

/// Encoding strategy of a type. Child types are referenced by id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
	Primitive(Primitive),
	Compact(TypeId),
	Array { len: u32, element: TypeId },
	Sequence(TypeId),
	/// `BTreeMap<K, V>`, encoded as a sequence of key/value pairs.
	Map { key: TypeId, value: TypeId },
	Tuple(Vec<TypeId>),
	Composite(Vec<Field>),
	Variant(Vec<VariantDescriptor>),
	BitSequence,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
	pub id: TypeId,
	pub path: Vec<String>,
	/// Rendering used in canonical signatures, e.g. `Vec<[u8;32]>`.
	pub name: String,
	pub kind: TypeKind,
}

impl TypeDescriptor {
	/// Last segment of the type path, if the type has one.
	pub fn ident(&self) -> Option<&str> {
		self.path.last().map(String::as_str)
	}

	pub fn is_option(&self) -> bool {
		self.ident() == Some("Option") && matches!(self.kind, TypeKind::Variant(_))
	}
}

#[derive(Debug, Error)]
pub enum RegistryError {
	#[error("Type lookup table was not attached")]
	MissingLookup,
	#[error("Type {referenced_by} references unknown type {id}")]
	DanglingReference { id: TypeId, referenced_by: TypeId },
}

#[derive(Default)]
pub struct RegistryBuilder {
	lookup: Option<PortableRegistry>,
	properties: Option<ChainProperties>,
}

impl RegistryBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn lookup(mut self, lookup: PortableRegistry) -> Self {
		self.lookup = Some(lookup);
		self
	}

	pub fn chain_properties(mut self, properties: Option<ChainProperties>) -> Self {
		self.properties = properties;
		self
	}

	/// Resolves every declared type and returns the immutable registry.
	pub fn freeze(self) -> Result<TypeRegistry, RegistryError> {
		let lookup = self.lookup.ok_or(RegistryError::MissingLookup)?;

		let mut kinds = BTreeMap::new();
		for portable in &lookup.types {
			let kind = resolve_kind(&lookup, portable.id, &portable.ty)?;
			kinds.insert(portable.id, (portable.ty.path.segments.clone(), kind));
		}

		let mut names = BTreeMap::new();
		for id in kinds.keys() {
			render_name(&lookup, &kinds, *id, &mut names, &mut BTreeSet::new());
		}

		let types = kinds
			.into_iter()
			.map(|(id, (path, kind))| {
				let name = names.remove(&id).unwrap_or_else(|| format!("#{id}"));
				(id, TypeDescriptor { id, path, name, kind })
			})
			.collect::<BTreeMap<_, _>>();

		debug!(types = types.len(), "Type registry frozen");
		Ok(TypeRegistry {
			types,
			properties: self.properties,
		})
	}
}

/// Immutable registry of resolved types, shared by every encode and decode operation against
/// one metadata document.
#[derive(Clone, Debug)]
pub struct TypeRegistry {
	types: BTreeMap<TypeId, TypeDescriptor>,
	properties: Option<ChainProperties>,
}

impl TypeRegistry {
	pub fn resolve(&self, id: TypeId) -> Option<&TypeDescriptor> {
		self.types.get(&id)
	}

	pub fn type_name(&self, id: TypeId) -> Option<&str> {
		self.resolve(id).map(|descriptor| descriptor.name.as_str())
	}

	pub fn properties(&self) -> Option<&ChainProperties> {
		self.properties.as_ref()
	}

	pub fn len(&self) -> usize {
		self.types.len()
	}

	pub fn is_empty(&self) -> bool {
		self.types.is_empty()
	}

	pub fn descriptors(&self) -> impl Iterator<Item = &TypeDescriptor> {
		self.types.values()
	}

	/// Encodes `value` as type `id`.
	pub fn encode(&self, id: TypeId, value: &Value) -> Result<Vec<u8>, CodecError> {
		let mut out = Vec::new();
		value::encode_value(self, id, value, &mut out)?;
		Ok(out)
	}

	/// Decodes the whole of `bytes` as type `id`.
	pub fn decode(&self, id: TypeId, bytes: &[u8]) -> Result<Value, CodecError> {
		let mut input = bytes;
		let value = value::decode_value(self, id, &mut input)?;
		if !input.is_empty() {
			return Err(CodecError::TrailingBytes(input.len()));
		}
		Ok(value)
	}
}

fn check_known(lookup: &PortableRegistry, id: TypeId, referenced_by: TypeId) -> Result<TypeId, RegistryError> {
	lookup
		.resolve(id)
		.map(|_| id)
		.ok_or(RegistryError::DanglingReference { id, referenced_by })
}

fn fields(
	lookup: &PortableRegistry,
	owner: TypeId,
	fields: &[scale_info::Field<PortableForm>],
) -> Result<Vec<Field>, RegistryError> {
	fields
		.iter()
		.map(|field| {
			Ok(Field {
				name: field.name.clone(),
				ty: check_known(lookup, field.ty.id, owner)?,
			})
		})
		.collect()
}

/// Detects `BTreeMap<K, V>`: a composite named `BTreeMap` wrapping `Vec<(K, V)>`.
fn map_entry_types(lookup: &PortableRegistry, ty: &Type<PortableForm>) -> Option<(TypeId, TypeId)> {
	if ty.path.segments.last().map(String::as_str) != Some("BTreeMap") {
		return None;
	}
	let TypeDef::Composite(composite) = &ty.type_def else {
		return None;
	};
	let [field] = composite.fields.as_slice() else {
		return None;
	};
	let TypeDef::Sequence(sequence) = &lookup.resolve(field.ty.id)?.type_def else {
		return None;
	};
	let TypeDef::Tuple(tuple) = &lookup.resolve(sequence.type_param.id)?.type_def else {
		return None;
	};
	match tuple.fields.as_slice() {
		[key, value] => Some((key.id, value.id)),
		_ => None,
	}
}

fn resolve_kind(
	lookup: &PortableRegistry,
	id: TypeId,
	ty: &Type<PortableForm>,
) -> Result<TypeKind, RegistryError> {
	if let Some((key, value)) = map_entry_types(lookup, ty) {
		return Ok(TypeKind::Map {
			key: check_known(lookup, key, id)?,
			value: check_known(lookup, value, id)?,
		});
	}

	Ok(match &ty.type_def {
		TypeDef::Composite(composite) => TypeKind::Composite(fields(lookup, id, &composite.fields)?),
		TypeDef::Variant(variant) => TypeKind::Variant(
			variant
				.variants
				.iter()
				.map(|variant| {
					Ok(VariantDescriptor {
						name: variant.name.clone(),
						index: variant.index,
						fields: fields(lookup, id, &variant.fields)?,
					})
				})
				.collect::<Result<_, RegistryError>>()?,
		),
		TypeDef::Sequence(sequence) => {
			TypeKind::Sequence(check_known(lookup, sequence.type_param.id, id)?)
		},
		TypeDef::Array(array) => TypeKind::Array {
			len: array.len,
			element: check_known(lookup, array.type_param.id, id)?,
		},
		TypeDef::Tuple(tuple) => TypeKind::Tuple(
			tuple
				.fields
				.iter()
				.map(|field| check_known(lookup, field.id, id))
				.collect::<Result<_, _>>()?,
		),
		TypeDef::Primitive(primitive) => TypeKind::Primitive(primitive.into()),
		TypeDef::Compact(compact) => TypeKind::Compact(check_known(lookup, compact.type_param.id, id)?),
		TypeDef::BitSequence(_) => TypeKind::BitSequence,
	})
}

fn render_name(
	lookup: &PortableRegistry,
	kinds: &BTreeMap<TypeId, (Vec<String>, TypeKind)>,
	id: TypeId,
	names: &mut BTreeMap<TypeId, String>,
	visiting: &mut BTreeSet<TypeId>,
) -> String {
	if let Some(name) = names.get(&id) {
		return name.clone();
	}
	let Some((path, kind)) = kinds.get(&id) else {
		return format!("#{id}");
	};
	// recursive types without a path
	if !visiting.insert(id) {
		return format!("#{id}");
	}

	let mut child = |ty: TypeId| render_name(lookup, kinds, ty, names, visiting);
	let name = match (path.last(), kind) {
		(_, TypeKind::Map { key, value }) => format!("BTreeMap<{},{}>", child(*key), child(*value)),
		(Some(ident), _) => {
			let params = lookup
				.resolve(id)
				.map(|ty| {
					ty.type_params
						.iter()
						.filter_map(|param| param.ty.as_ref().map(|ty| ty.id))
						.collect::<Vec<_>>()
				})
				.unwrap_or_default();
			if params.is_empty() {
				ident.clone()
			} else {
				let params = params.into_iter().map(&mut child).collect::<Vec<_>>();
				format!("{ident}<{}>", params.join(","))
			}
		},
		(None, TypeKind::Primitive(primitive)) => primitive.name().to_string(),
		(None, TypeKind::Compact(inner)) => format!("Compact<{}>", child(*inner)),
		(None, TypeKind::Array { len, element }) => format!("[{};{len}]", child(*element)),
		(None, TypeKind::Sequence(element)) => format!("Vec<{}>", child(*element)),
		(None, TypeKind::Tuple(items)) => {
			let items = items.iter().map(|item| child(*item)).collect::<Vec<_>>();
			format!("({})", items.join(","))
		},
		(None, TypeKind::Composite(fields)) => {
			let named = !fields.is_empty() && fields.iter().all(|field| field.name.is_some());
			let rendered = fields
				.iter()
				.map(|field| match (&field.name, named) {
					(Some(name), true) => format!("{name}:{}", child(field.ty)),
					_ => child(field.ty),
				})
				.collect::<Vec<_>>();
			if named {
				format!("{{{}}}", rendered.join(","))
			} else {
				format!("({})", rendered.join(","))
			}
		},
		(None, TypeKind::Variant(variants)) => {
			let rendered = variants
				.iter()
				.map(|variant| {
					if variant.fields.is_empty() {
						variant.name.clone()
					} else {
						let fields = variant.fields.iter().map(|field| child(field.ty)).collect::<Vec<_>>();
						format!("{}({})", variant.name, fields.join(","))
					}
				})
				.collect::<Vec<_>>();
			format!("{{{}}}", rendered.join("|"))
		},
		(None, TypeKind::BitSequence) => "BitVec".to_string(),
	};

	visiting.remove(&id);
	names.insert(id, name.clone());
	name
}
