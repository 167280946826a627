//! Program client: binds a program to a live host and runs queries.
//!
//! Before the first query, the host's runtime metadata is fetched and every extension function
//! the program depends on is compared by canonical signature. The verdict is memoized for the
//! lifetime of the client, including under concurrent first use.

use crate::{
	error::{Error, Result},
	metadata::parse_metadata,
	network::{QueryResult, Transport},
	program::{function_signature, Entrypoint, EntrypointRef, ProgramRegistry},
	types::{ChainProperties, QueryOptions, RuntimeMetadata},
};
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};
use strum::Display;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum ExtensionsState {
	Unchecked,
	Checking,
	Matched,
	Mismatched,
}

pub struct ProgramClient<T: Transport> {
	program: Vec<u8>,
	registry: Arc<ProgramRegistry>,
	transport: Arc<T>,
	properties: Option<ChainProperties>,
	verdict: OnceCell<bool>,
	check_lock: Mutex<()>,
}

impl<T: Transport> ProgramClient<T> {
	pub fn new(transport: Arc<T>, program: Vec<u8>, registry: Arc<ProgramRegistry>) -> Self {
		Self {
			program,
			registry,
			transport,
			properties: None,
			verdict: OnceCell::new(),
			check_lock: Mutex::new(()),
		}
	}

	/// Chain properties applied when parsing the host's runtime metadata.
	pub fn with_chain_properties(mut self, properties: Option<ChainProperties>) -> Self {
		self.properties = properties;
		self
	}

	pub fn registry(&self) -> &ProgramRegistry {
		&self.registry
	}

	/// Cached verdict, `None` until a check settled it.
	pub fn extensions_matched(&self) -> Option<bool> {
		self.verdict.get().copied()
	}

	pub fn extensions_state(&self) -> ExtensionsState {
		match self.verdict.get() {
			Some(true) => ExtensionsState::Matched,
			Some(false) => ExtensionsState::Mismatched,
			None if self.check_lock.try_lock().is_err() => ExtensionsState::Checking,
			None => ExtensionsState::Unchecked,
		}
	}

	/// Fetches and decodes the host's runtime metadata.
	pub async fn get_metadata(&self) -> Result<RuntimeMetadata> {
		let bytes = self.transport.fetch_metadata().await.map_err(Error::Transport)?;
		let (metadata, _) = parse_metadata::<RuntimeMetadata>(bytes, self.properties.clone())?;
		Ok(metadata)
	}

	/// Checks that the host provides every extension function the program depends on.
	///
	/// A missing extension or a signature mismatch fails the first check and settles the verdict
	/// to `false`; later checks return `Ok(false)` without contacting the host. Transport failures
	/// leave the verdict unsettled.
	pub async fn check_extensions(&self) -> Result<bool> {
		if let Some(matched) = self.verdict.get() {
			return Ok(*matched);
		}

		let _guard = self.check_lock.lock().await;
		// settled while waiting for the lock
		if let Some(matched) = self.verdict.get() {
			return Ok(*matched);
		}

		match self.compare_extensions().await {
			Ok(()) => {
				info!(
					requirements = self.registry.extension_requirements().len(),
					"Extensions matched"
				);
				let _ = self.verdict.set(true);
				Ok(true)
			},
			Err(error @ (Error::ExtensionNotFound(_) | Error::ExtensionSignatureMismatch { .. })) => {
				warn!("Extensions mismatched: {error}");
				let _ = self.verdict.set(false);
				Err(error)
			},
			Err(error) => {
				warn!("Extensions check did not complete: {error}");
				Err(error)
			},
		}
	}

	async fn compare_extensions(&self) -> Result<()> {
		let bytes = self.transport.fetch_metadata().await.map_err(Error::Transport)?;
		let (runtime, registry) = parse_metadata::<RuntimeMetadata>(bytes, self.properties.clone())?;

		for requirement in self.registry.extension_requirements() {
			let extension = runtime
				.extensions
				.get(&requirement.id)
				.ok_or(Error::ExtensionNotFound(requirement.id))?;
			let actual = match extension.functions.get(requirement.index as usize) {
				Some(function) => function_signature(function, &registry)?,
				None => format!("{}#{}: missing", extension.name, requirement.index),
			};
			if actual != requirement.signature {
				return Err(Error::ExtensionSignatureMismatch {
					expected: requirement.signature.clone(),
					actual,
				});
			}
			debug!(extension = %extension.name, signature = %actual, "Extension function matched");
		}
		Ok(())
	}

	/// Runs one query: checks extensions, encodes the call, and decodes the host's answer.
	pub async fn execute_query(
		&self,
		entrypoint: impl Into<EntrypointRef>,
		options: QueryOptions,
		params: &[Value],
	) -> Result<Value> {
		match self.check_extensions().await {
			Ok(true) => {},
			Ok(false) => return Err(Error::ExtensionCheckFailed(None)),
			Err(error) => return Err(Error::ExtensionCheckFailed(Some(Box::new(error)))),
		}

		let entrypoint = self.registry.find_entrypoint(entrypoint)?;
		let args = entrypoint.encode(params)?;
		let gas_limit = options.gas_limit.map(u64::from);
		debug!(entrypoint = %entrypoint.identifier, ?gas_limit, "Executing query");

		let bytes = self
			.transport
			.raw_call(&self.program, &args, gas_limit)
			.await
			.map_err(Error::Transport)?;

		match QueryResult::from_bytes(&bytes)? {
			QueryResult::Ok(bytes) => entrypoint.decode_result(&bytes),
			QueryResult::Err(tag) => Err(Error::RemoteQuery(tag)),
		}
	}

	/// Entrypoints keyed by call-site name, e.g. `sumBalance`.
	pub fn entrypoints(&self) -> BTreeMap<String, BoundEntrypoint<'_, T>> {
		self.registry
			.entrypoints()
			.iter()
			.map(|entrypoint| {
				let bound = BoundEntrypoint {
					client: self,
					entrypoint,
				};
				(entrypoint.call_name(), bound)
			})
			.collect()
	}
}

/// Entrypoint bound to the client that runs it.
pub struct BoundEntrypoint<'a, T: Transport> {
	client: &'a ProgramClient<T>,
	entrypoint: &'a Entrypoint,
}

impl<T: Transport> BoundEntrypoint<'_, T> {
	pub fn entrypoint(&self) -> &Entrypoint {
		self.entrypoint
	}

	pub async fn call(&self, params: &[Value], options: Option<QueryOptions>) -> Result<Value> {
		self.client
			.execute_query(self.entrypoint, options.unwrap_or_default(), params)
			.await
	}
}
