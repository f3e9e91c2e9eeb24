// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// Structural failures raised while building or reconciling a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A name was registered twice during one walk.
    #[error("definition '{0}' is already registered")]
    AlreadyRegistered(String),

    /// Two observations of one name disagree on what kind of entity it is.
    #[error("cannot join '{name}': registered as {existing} but observed as {incoming}")]
    DiscriminantMismatch {
        name: String,
        existing: &'static str,
        incoming: &'static str,
    },

    /// The same declared function carries two different parameter lists inside one source slice,
    /// so the debug line range does not describe the source it points into.
    #[error("function '{name}' declared with parameters ({first}) and ({second}) in the same range")]
    DivergentParameters {
        name: String,
        first: String,
        second: String,
    },

    /// Several differently named functions in one slice and none of them is the requested one.
    #[error("cannot tell which of {candidates:?} defines '{name}'")]
    AmbiguousParameters {
        name: String,
        candidates: Vec<String>,
    },

    /// The slice does not parse as Lua.
    #[error("failed to parse lines {line}-{last} for '{name}': {message}")]
    SourceParse {
        name: String,
        line: u32,
        last: u32,
        message: String,
    },

    /// The debug line range lies outside of the source text.
    #[error("lines {line}-{last} for '{name}' are outside of a {lines} line source")]
    LineRange {
        name: String,
        line: u32,
        last: u32,
        lines: usize,
    },

    /// Script loading or execution failed inside the Lua runtime.
    #[error("lua: {0}")]
    Lua(String),
}

impl From<mlua::Error> for SchemaError {
    fn from(err: mlua::Error) -> Self {
        SchemaError::Lua(err.to_string())
    }
}

impl SchemaError {
    /// Failures that mean the extraction output cannot be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SchemaError::AlreadyRegistered(_)
                | SchemaError::DiscriminantMismatch { .. }
                | SchemaError::DivergentParameters { .. }
        )
    }
}
