//! Client library for PVQ guest programs.
//!
//! A guest program ships with a self-describing [`types::ProgramMetadata`] document listing its
//! entrypoints, their argument and return types, and the host extensions it depends on. This
//! crate parses that document, encodes calls into the wire payload the host expects, checks the
//! program's extension requirements against the host's [`types::RuntimeMetadata`] and decodes
//! query results.
//!
//! Data flow:
//!
//! metadata bytes/object -> [`metadata::parse_metadata`] -> [`program::ProgramRegistry`]
//! -> [`query::ProgramClient`] bound to a [`network::Transport`].

pub mod error;
pub mod metadata;
pub mod network;
pub mod program;
pub mod query;
pub mod registry;
pub mod schema;
pub mod types;
pub mod utils;
pub mod value;

pub use error::{Error, Result};
