use clap::{command, Parser, Subcommand};
use pvq_core::types::GasLimit;
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(version)]
pub struct CliOpts {
	/// Path to the toml configuration file
	#[arg(short, long, value_name = "FILE")]
	pub config: Option<String>,
	/// HTTP endpoint of the full node, overrides `full_node_http` from the configuration file
	#[arg(long)]
	pub url: Option<String>,
	/// Log level
	#[arg(long)]
	pub verbosity: Option<Level>,
	/// Set logs format to JSON
	#[arg(long)]
	pub logs_json: bool,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// List the entrypoints and extension requirements of a program
	Entrypoints {
		/// Program metadata, JSON or 0x-prefixed hex
		#[arg(long, value_name = "FILE")]
		metadata: PathBuf,
	},
	/// Check that the node provides every extension the program depends on
	Check {
		/// Compiled guest program
		#[arg(long, value_name = "FILE")]
		program: PathBuf,
		/// Program metadata, JSON or 0x-prefixed hex
		#[arg(long, value_name = "FILE")]
		metadata: PathBuf,
	},
	/// Run one query and print its result as JSON
	Query {
		/// Compiled guest program
		#[arg(long, value_name = "FILE")]
		program: PathBuf,
		/// Program metadata, JSON or 0x-prefixed hex
		#[arg(long, value_name = "FILE")]
		metadata: PathBuf,
		/// Gas limit of the query, overrides `gas_limit` from the configuration file
		#[arg(long)]
		gas_limit: Option<GasLimit>,
		/// Declared name, call-site name or index of the entrypoint
		entrypoint: String,
		/// Parameters as a JSON array
		#[arg(default_value = "[]")]
		params: String,
	},
}
