// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod config;
mod error;
mod extractor;
mod host;
mod join;
mod runtime;
mod schema;
mod signature;
mod types;
mod walker;

pub use config::Config;
pub use error::SchemaError;
pub use extractor::Extractor;
pub use host::{DebugInfo, Identity, ScriptHost};
pub use join::{merge_field, merge_sets, Merge};
pub use runtime::{LuaRuntime, SCANDIR_FILES, SCANDIR_SUBDIRS};
pub use schema::{
    fold_origins, ClassDefinition, Definition, DefinitionKind, FunctionDefinition, Origin, Param,
    Root, TableDefinition,
};
pub use signature::recover_params;
pub use types::{LuaType, PolyType, TypeTag};
pub use walker::{access_path, walk, BuiltinSnapshot, ROOT_PATH};

#[cfg(test)]
mod tests;
