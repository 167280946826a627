//! Program registry: entrypoints and extension requirements projected from program metadata.

use crate::{
	error::{Error, Result},
	metadata::{parse_metadata, MetadataInput},
	registry::{TypeDescriptor, TypeRegistry},
	types::{ChainProperties, ExtensionId, FnIndex, FunctionMetadata, ProgramMetadata},
};
use convert_case::{Case, Casing};
use serde_json::Value;
use std::{fmt, sync::Arc};
use tracing::debug;

/// Rendering of a missing return type inside canonical signatures.
const VOID: &str = "null";

/// Index byte bounds the number of entrypoints a program can declare.
const MAX_ENTRYPOINTS: usize = u8::MAX as usize + 1;

fn describe(registry: &TypeRegistry, ty: u32) -> Result<TypeDescriptor> {
	registry
		.resolve(ty)
		.cloned()
		.ok_or_else(|| Error::metadata_parse(format!("Type {ty} is not declared"), ty))
}

/// Canonical signature: `name(T1,T2):(R)`, with `null` as `R` for functions returning nothing.
///
/// Argument names are left out, so functions differing only in argument names are compatible.
pub fn function_signature(function: &FunctionMetadata, registry: &TypeRegistry) -> Result<String> {
	let inputs = function
		.inputs
		.iter()
		.map(|input| describe(registry, input.ty).map(|descriptor| descriptor.name))
		.collect::<Result<Vec<_>>>()?;
	let output = match function.return_type() {
		Some(ty) => describe(registry, ty)?.name,
		None => VOID.to_string(),
	};
	Ok(format!("{}({}):({output})", function.name, inputs.join(",")))
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
	pub name: String,
	pub ty: TypeDescriptor,
}

/// One callable of a program.
#[derive(Clone)]
pub struct Entrypoint {
	pub identifier: String,
	/// Position in the declared entrypoints, sent as the first byte of every call.
	pub index: u8,
	pub args: Vec<Param>,
	pub return_type: Option<TypeDescriptor>,
	pub signature: String,
	registry: Arc<TypeRegistry>,
}

impl fmt::Debug for Entrypoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Entrypoint")
			.field("identifier", &self.identifier)
			.field("index", &self.index)
			.field("signature", &self.signature)
			.finish()
	}
}

impl PartialEq for Entrypoint {
	fn eq(&self, other: &Self) -> bool {
		self.index == other.index && self.signature == other.signature
	}
}

impl Entrypoint {
	/// Call-site name, e.g. `sumBalance` for `sum_balance`.
	pub fn call_name(&self) -> String {
		self.identifier.to_case(Case::Camel)
	}

	/// Builds the call payload: the index byte followed by every argument, in declaration order.
	pub fn encode(&self, params: &[Value]) -> Result<Vec<u8>> {
		if params.len() != self.args.len() {
			return Err(Error::ArityMismatch {
				expected: self.args.len(),
				actual: params.len(),
			});
		}

		let mut payload = vec![self.index];
		for (arg, value) in self.args.iter().zip(params) {
			crate::value::encode_value(&self.registry, arg.ty.id, value, &mut payload).map_err(
				|source| Error::ParamEncoding {
					name: arg.name.clone(),
					source,
				},
			)?;
		}
		debug!(entrypoint = %self.identifier, len = payload.len(), "Call encoded");
		Ok(payload)
	}

	/// Decodes the success bytes of a query against the declared return type.
	pub fn decode_result(&self, bytes: &[u8]) -> Result<Value> {
		match &self.return_type {
			Some(ty) => self.registry.decode(ty.id, bytes).map_err(Error::ResultDecode),
			None if bytes.is_empty() => Ok(Value::Null),
			None => Err(Error::NoReturnType(self.identifier.clone())),
		}
	}
}

/// Identifies an entrypoint by declared name, by index, or directly.
#[derive(Clone, Debug)]
pub enum EntrypointRef {
	Name(String),
	Index(usize),
	Entrypoint(Box<Entrypoint>),
}

impl From<&str> for EntrypointRef {
	fn from(name: &str) -> Self {
		EntrypointRef::Name(name.to_string())
	}
}

impl From<String> for EntrypointRef {
	fn from(name: String) -> Self {
		EntrypointRef::Name(name)
	}
}

impl From<usize> for EntrypointRef {
	fn from(index: usize) -> Self {
		EntrypointRef::Index(index)
	}
}

impl From<&Entrypoint> for EntrypointRef {
	fn from(entrypoint: &Entrypoint) -> Self {
		EntrypointRef::Entrypoint(Box::new(entrypoint.clone()))
	}
}

impl fmt::Display for EntrypointRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			EntrypointRef::Name(name) => write!(f, "{name}"),
			EntrypointRef::Index(index) => write!(f, "{index}"),
			EntrypointRef::Entrypoint(entrypoint) => write!(f, "{}", entrypoint.identifier),
		}
	}
}

/// Extension function a program depends on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionRequirement {
	pub id: ExtensionId,
	pub index: FnIndex,
	pub signature: String,
}

/// Immutable projection of one program metadata document.
#[derive(Debug)]
pub struct ProgramRegistry {
	metadata: ProgramMetadata,
	registry: Arc<TypeRegistry>,
	entrypoints: Vec<Entrypoint>,
	extension_requirements: Vec<ExtensionRequirement>,
}

impl ProgramRegistry {
	pub fn new(input: impl Into<MetadataInput>, properties: Option<ChainProperties>) -> Result<Self> {
		let (metadata, registry) = parse_metadata::<ProgramMetadata>(input, properties)?;
		Self::from_metadata(metadata, registry)
	}

	pub fn from_metadata(metadata: ProgramMetadata, registry: TypeRegistry) -> Result<Self> {
		if metadata.entrypoints.len() > MAX_ENTRYPOINTS {
			return Err(Error::metadata_parse(
				format!("At most {MAX_ENTRYPOINTS} entrypoints are supported"),
				metadata.entrypoints.len(),
			));
		}
		let registry = Arc::new(registry);

		let entrypoints = metadata
			.entrypoints
			.iter()
			.enumerate()
			.map(|(index, function)| {
				let args = function
					.inputs
					.iter()
					.map(|input| {
						Ok(Param {
							name: input.name.clone(),
							ty: describe(&registry, input.ty)?,
						})
					})
					.collect::<Result<Vec<_>>>()?;
				let return_type = function
					.return_type()
					.map(|ty| describe(&registry, ty))
					.transpose()?;
				Ok(Entrypoint {
					identifier: function.name.clone(),
					index: index as u8,
					args,
					return_type,
					signature: function_signature(function, &registry)?,
					registry: registry.clone(),
				})
			})
			.collect::<Result<Vec<_>>>()?;

		let extension_requirements = metadata
			.extension_fns
			.iter()
			.map(|(id, index, function)| {
				Ok(ExtensionRequirement {
					id: *id,
					index: *index,
					signature: function_signature(function, &registry)?,
				})
			})
			.collect::<Result<Vec<_>>>()?;

		debug!(
			entrypoints = entrypoints.len(),
			extension_requirements = extension_requirements.len(),
			"Program registry built"
		);
		Ok(ProgramRegistry {
			metadata,
			registry,
			entrypoints,
			extension_requirements,
		})
	}

	pub fn metadata(&self) -> &ProgramMetadata {
		&self.metadata
	}

	pub fn registry(&self) -> &Arc<TypeRegistry> {
		&self.registry
	}

	pub fn entrypoints(&self) -> &[Entrypoint] {
		&self.entrypoints
	}

	pub fn extension_requirements(&self) -> &[ExtensionRequirement] {
		&self.extension_requirements
	}

	/// Out of range indices fail like unknown names.
	pub fn find_entrypoint(&self, entrypoint: impl Into<EntrypointRef>) -> Result<Entrypoint> {
		match entrypoint.into() {
			EntrypointRef::Name(name) => self
				.entrypoints
				.iter()
				.find(|entrypoint| entrypoint.identifier == name)
				.cloned()
				.ok_or(Error::EntrypointNotFound(name)),
			EntrypointRef::Index(index) => self
				.entrypoints
				.get(index)
				.cloned()
				.ok_or_else(|| Error::EntrypointNotFound(index.to_string())),
			EntrypointRef::Entrypoint(entrypoint) => Ok(*entrypoint),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		metadata::fixtures::{function, prefixed, program_metadata, PROGRAM_METADATA_HEX},
		registry::RegistryBuilder,
	};
	use codec::Encode;
	use hex_literal::hex;
	use scale_info::PortableRegistry;
	use proptest::prelude::*;
	use serde_json::json;
	use test_case::test_case;

	const ALICE_SS58: &str = "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5";

	fn program() -> ProgramRegistry {
		ProgramRegistry::new(PROGRAM_METADATA_HEX, None).unwrap()
	}

	#[test]
	fn sum_balance_call_payload() {
		let program = program();
		let entrypoint = program.find_entrypoint("sum_balance").unwrap();
		let payload = entrypoint.encode(&[json!(21), json!([ALICE_SS58])]).unwrap();
		assert_eq!(
			payload,
			hex!("001500000004d43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d")
		);
	}

	#[test]
	fn entrypoints_are_projected_in_order() {
		let program = program();
		let [sum_balance, total_supply] = program.entrypoints() else {
			panic!("unexpected entrypoints: {:?}", program.entrypoints());
		};
		assert_eq!(sum_balance.index, 0);
		assert_eq!(sum_balance.signature, "sum_balance(u32,Vec<[u8;32]>):(u128)");
		assert_eq!(
			sum_balance.args.iter().map(|arg| arg.name.as_str()).collect::<Vec<_>>(),
			["asset", "accounts"]
		);
		assert_eq!(sum_balance.call_name(), "sumBalance");
		assert_eq!(total_supply.index, 1);
		assert_eq!(total_supply.return_type.as_ref().map(|ty| ty.name.as_str()), Some("u128"));
	}

	#[test]
	fn extension_requirements_carry_signatures() {
		assert_eq!(
			program().extension_requirements(),
			[ExtensionRequirement {
				id: crate::metadata::fixtures::EXT_FUNGIBLES,
				index: 1,
				signature: "balance(u32,[u8;32]):(u128)".to_string(),
			}]
		);
	}

	#[test_case(&[] => (2, 0) ; "No parameters")]
	#[test_case(&[json!(1)] => (2, 1) ; "Too few")]
	#[test_case(&[json!(1), json!([]), json!(3)] => (2, 3) ; "Too many")]
	fn arity_is_enforced(params: &[Value]) -> (usize, usize) {
		let entrypoint = program().find_entrypoint("sum_balance").unwrap();
		match entrypoint.encode(params) {
			Err(Error::ArityMismatch { expected, actual }) => (expected, actual),
			other => panic!("unexpected result: {other:?}"),
		}
	}

	#[test]
	fn param_encoding_names_the_argument() {
		let entrypoint = program().find_entrypoint(0usize).unwrap();
		let error = entrypoint.encode(&[json!(1), json!(["0x00"])]).unwrap_err();
		assert!(matches!(&error, Error::ParamEncoding { name, .. } if name == "accounts"), "{error}");
	}

	#[test]
	fn lookup() {
		let program = program();
		for entrypoint in program.entrypoints() {
			assert_eq!(&program.find_entrypoint(entrypoint.identifier.as_str()).unwrap(), entrypoint);
			assert_eq!(&program.find_entrypoint(entrypoint.index as usize).unwrap(), entrypoint);
			assert_eq!(&program.find_entrypoint(entrypoint).unwrap(), entrypoint);
		}
		assert!(matches!(
			program.find_entrypoint("doesNotExist"),
			Err(Error::EntrypointNotFound(name)) if name == "doesNotExist"
		));
		assert!(matches!(program.find_entrypoint(2usize), Err(Error::EntrypointNotFound(_))));
	}

	#[test]
	fn signatures_ignore_argument_names() {
		let metadata = program_metadata();
		let registry = RegistryBuilder::new().lookup(metadata.types).freeze().unwrap();
		let renamed = function("balance", &[("id", 1), ("account", 3)], 5);
		let (_, _, declared) = &metadata.extension_fns[0];
		assert_eq!(
			function_signature(declared, &registry).unwrap(),
			function_signature(&renamed, &registry).unwrap()
		);
		let void = function("ping", &[], 0);
		assert_eq!(function_signature(&void, &registry).unwrap(), "ping():(null)");
	}

	#[test]
	fn result_decoding() {
		let mut metadata = program_metadata();
		metadata.entrypoints.push(function("touch", &[], 0));
		let registry = RegistryBuilder::new().lookup(metadata.types.clone()).freeze().unwrap();
		let program = ProgramRegistry::from_metadata(metadata, registry).unwrap();

		let sum_balance = program.find_entrypoint("sum_balance").unwrap();
		assert_eq!(sum_balance.decode_result(&1000u128.to_le_bytes()).unwrap(), json!(1000));
		assert!(matches!(sum_balance.decode_result(&[1, 2]), Err(Error::ResultDecode(_))));

		let touch = program.find_entrypoint("touch").unwrap();
		assert_eq!(touch.decode_result(&[]).unwrap(), Value::Null);
		assert!(matches!(touch.decode_result(&[1]), Err(Error::NoReturnType(name)) if name == "touch"));
	}

	#[test]
	fn too_many_entrypoints() {
		let mut metadata = program_metadata();
		let extra = metadata.entrypoints[1].clone();
		metadata.entrypoints.resize(MAX_ENTRYPOINTS + 1, extra);
		let registry = RegistryBuilder::new().lookup(metadata.types.clone()).freeze().unwrap();
		assert!(matches!(
			ProgramRegistry::from_metadata(metadata, registry),
			Err(Error::MetadataParse { .. })
		));
	}

	#[test]
	fn metadata_without_extension_functions_is_rejected() {
		#[derive(Encode)]
		struct EntrypointsOnly {
			types: PortableRegistry,
			entrypoints: Vec<FunctionMetadata>,
		}

		let metadata = program_metadata();
		let entrypoints_only = EntrypointsOnly {
			types: metadata.types.clone(),
			entrypoints: metadata.entrypoints.clone(),
		};
		assert!(matches!(
			ProgramRegistry::new(prefixed(&entrypoints_only), None),
			Err(Error::MetadataParse { .. })
		));

		let mut structured = serde_json::to_value(&metadata).unwrap();
		structured.as_object_mut().unwrap().remove("extension_fns");
		assert!(matches!(
			ProgramRegistry::new(structured, None),
			Err(Error::MetadataParse { .. })
		));
	}

	proptest! {
		#[test]
		fn encoding_is_deterministic_and_prefixed(
			asset in any::<u32>(),
			accounts in prop::collection::vec(any::<[u8; 32]>(), 0..4),
		) {
			let program = program();
			let accounts = accounts.iter().map(|account| json!(format!("0x{}", hex::encode(account)))).collect::<Vec<_>>();
			for entrypoint in program.entrypoints() {
				let params = match entrypoint.args.len() {
					2 => vec![json!(asset), Value::Array(accounts.clone())],
					_ => vec![json!(asset)],
				};
				let first = entrypoint.encode(&params).unwrap();
				let second = entrypoint.encode(&params.clone()).unwrap();
				prop_assert_eq!(&first, &second);
				prop_assert_eq!(first[0], entrypoint.index);
			}
		}
	}
}
