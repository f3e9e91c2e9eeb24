// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::rc::Rc;

use anyhow::Result;

use crate::types::LuaType;

/// Reference identity of a runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(usize);

impl Identity {
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> usize {
        self.0
    }
}

/// Where a callable was defined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugInfo {
    pub line: Option<u32>,
    pub last: Option<u32>,
    /// Source file, when the callable came from one.
    pub file: Option<String>,
}

/// Services the schema walker needs from a script engine.
pub trait ScriptHost {
    type Value: Clone;

    /// The root namespace scripts run in.
    fn globals(&self) -> Self::Value;

    /// All key/value pairs of a table, in the engine's iteration order.
    fn entries(&self, table: &Self::Value) -> Result<Vec<(Self::Value, Self::Value)>>;

    /// The key as text when it is a string, `None` for every other key type.
    fn string_key(&self, key: &Self::Value) -> Option<String>;

    fn classify(&self, value: &Self::Value) -> LuaType;

    /// Identity of reference values; `None` for plain values.
    fn identity(&self, value: &Self::Value) -> Option<Identity>;

    /// Definition site of a script-defined callable.
    /// Native callables and non-callables have none.
    fn debug_info(&self, value: &Self::Value) -> Option<DebugInfo>;

    /// Text of a source file named by [`DebugInfo::file`].
    fn source(&self, file: &str) -> Option<Rc<str>>;
}
