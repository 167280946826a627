#![doc = include_str!("../README.md")]

use crate::{
	cli::{CliOpts, Command},
	config::RuntimeConfig,
};
use clap::Parser;
use color_eyre::{
	eyre::{eyre, WrapErr},
	Result,
};
use pvq_core::{
	metadata::MetadataInput,
	network::rpc::RpcTransport,
	program::{EntrypointRef, ProgramRegistry},
	query::ProgramClient,
	types::QueryOptions,
	utils::{default_subscriber, install_panic_hooks, json_subscriber, to_hex},
};
use serde_json::Value;
use std::{fs, path::Path, sync::Arc};
use tracing::{error, info};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod cli;
mod config;

pub fn load_runtime_config(opts: &CliOpts) -> Result<RuntimeConfig> {
	let mut cfg = if let Some(config_path) = &opts.config {
		fs::metadata(config_path).map_err(|_| eyre!("Provided config file doesn't exist."))?;
		confy::load_path(config_path)
			.wrap_err(format!("Failed to load configuration from {}", config_path))?
	} else {
		RuntimeConfig::default()
	};

	cfg.log_format_json = opts.logs_json || cfg.log_format_json;
	cfg.log_level = opts.verbosity.unwrap_or(cfg.log_level);

	// Flags override the config parameters
	if let Some(url) = &opts.url {
		cfg.rpc.full_node_http = url.clone();
	}

	Ok(cfg)
}

/// Metadata files hold either `0x`-hex text or the structured JSON document.
fn read_metadata(path: &Path) -> Result<MetadataInput> {
	let content = fs::read_to_string(path)
		.wrap_err_with(|| format!("Failed to read metadata file {}", path.display()))?;
	let content = content.trim();
	if content.starts_with("0x") {
		return Ok(MetadataInput::Hex(content.to_string()));
	}
	let value = serde_json::from_str::<Value>(content)
		.wrap_err_with(|| format!("Metadata file {} is neither hex nor JSON", path.display()))?;
	Ok(MetadataInput::Structured(value))
}

fn load_program_registry(path: &Path, cfg: &RuntimeConfig) -> Result<ProgramRegistry> {
	let metadata = read_metadata(path)?;
	ProgramRegistry::new(metadata, cfg.chain_properties.clone())
		.wrap_err_with(|| format!("Invalid program metadata in {}", path.display()))
}

fn load_client(program: &Path, metadata: &Path, cfg: &RuntimeConfig) -> Result<ProgramClient<RpcTransport>> {
	let registry = load_program_registry(metadata, cfg)?;
	let program = fs::read(program)
		.wrap_err_with(|| format!("Failed to read program file {}", program.display()))?;
	let transport = RpcTransport::new(&cfg.rpc)?;
	info!(url = transport.url(), program_len = program.len(), "Connecting to node");
	Ok(
		ProgramClient::new(Arc::new(transport), program, Arc::new(registry))
			.with_chain_properties(cfg.chain_properties.clone()),
	)
}

/// Accepts an index, a declared name or a call-site name.
fn entrypoint_ref(registry: &ProgramRegistry, identifier: &str) -> EntrypointRef {
	if let Ok(index) = identifier.parse::<usize>() {
		return EntrypointRef::Index(index);
	}
	registry
		.entrypoints()
		.iter()
		.find(|entrypoint| entrypoint.call_name() == identifier)
		.map(EntrypointRef::from)
		.unwrap_or_else(|| EntrypointRef::from(identifier))
}

fn print_entrypoints(registry: &ProgramRegistry) {
	for entrypoint in registry.entrypoints() {
		println!(
			"{}\t{}\t{}",
			entrypoint.index,
			entrypoint.call_name(),
			entrypoint.signature
		);
	}
	for requirement in registry.extension_requirements() {
		println!(
			"extension {}#{}\t{}",
			to_hex(&requirement.id.to_be_bytes()),
			requirement.index,
			requirement.signature
		);
	}
}

async fn run(command: Command, cfg: RuntimeConfig) -> Result<()> {
	match command {
		Command::Entrypoints { metadata } => {
			print_entrypoints(&load_program_registry(&metadata, &cfg)?);
		},
		Command::Check { program, metadata } => {
			let client = load_client(&program, &metadata, &cfg)?;
			let matched = client
				.check_extensions()
				.await
				.wrap_err("Extension check failed")?;
			println!("{}", client.extensions_state());
			if !matched {
				return Err(eyre!("Node does not provide the extensions required by the program"));
			}
		},
		Command::Query {
			program,
			metadata,
			gas_limit,
			entrypoint,
			params,
		} => {
			let client = load_client(&program, &metadata, &cfg)?;
			let params = serde_json::from_str::<Vec<Value>>(&params)
				.wrap_err("Parameters must be a JSON array")?;
			let options = QueryOptions {
				gas_limit: gas_limit.or(cfg.gas_limit),
			};
			let entrypoint = entrypoint_ref(client.registry(), &entrypoint);
			let result = client
				.execute_query(entrypoint.clone(), options, &params)
				.await
				.wrap_err_with(|| format!("Query {entrypoint} failed"))?;
			println!("{}", serde_json::to_string_pretty(&result)?);
		},
	}
	Ok(())
}

#[tokio::main]
pub async fn main() -> Result<()> {
	let opts = CliOpts::parse();
	let cfg = load_runtime_config(&opts)?;

	if cfg.log_format_json {
		tracing::subscriber::set_global_default(json_subscriber(cfg.log_level))?;
	} else {
		tracing::subscriber::set_global_default(default_subscriber(cfg.log_level))?;
	};

	// install custom panic hooks
	install_panic_hooks()?;

	if let Err(error) = run(opts.command, cfg).await {
		error!("{error:#}");
		return Err(error.wrap_err("Running PVQ client failed"));
	}
	Ok(())
}
