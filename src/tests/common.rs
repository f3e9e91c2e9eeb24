// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory object graph used to drive the walker without a Lua state.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::Result;

use crate::host::{DebugInfo, Identity, ScriptHost};
use crate::types::LuaType;

#[derive(Debug, Default)]
pub struct FakeTable {
    entries: RefCell<Vec<(FakeValue, FakeValue)>>,
}

#[derive(Debug, Default)]
pub struct FakeFunction {
    info: Option<DebugInfo>,
}

#[derive(Debug, Clone)]
pub enum FakeValue {
    Boolean(bool),
    Number(f64),
    String(String),
    Table(Rc<FakeTable>),
    Function(Rc<FakeFunction>),
}

impl FakeValue {
    pub fn table() -> FakeValue {
        FakeValue::Table(Rc::default())
    }

    /// A callable provided by the host, without source information.
    pub fn native() -> FakeValue {
        FakeValue::Function(Rc::default())
    }

    /// A callable defined on lines `line..=last` of `file`.
    pub fn script(file: &str, line: u32, last: u32) -> FakeValue {
        FakeValue::Function(Rc::new(FakeFunction {
            info: Some(DebugInfo {
                line: Some(line),
                last: Some(last),
                file: Some(file.to_string()),
            }),
        }))
    }

    pub fn string(s: &str) -> FakeValue {
        FakeValue::String(s.to_string())
    }

    /// Store `value` under a string key. Panics when `self` is not a table.
    pub fn set(&self, key: &str, value: FakeValue) -> &Self {
        self.set_raw(FakeValue::string(key), value)
    }

    pub fn set_raw(&self, key: FakeValue, value: FakeValue) -> &Self {
        match self {
            FakeValue::Table(t) => t.entries.borrow_mut().push((key, value)),
            _ => panic!("not a table"),
        }
        self
    }
}

pub struct FakeHost {
    pub globals: FakeValue,
    pub sources: BTreeMap<String, Rc<str>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            globals: FakeValue::table(),
            sources: BTreeMap::new(),
        }
    }

    pub fn with_source(mut self, file: &str, contents: &str) -> Self {
        self.sources.insert(file.to_string(), contents.into());
        self
    }
}

impl ScriptHost for FakeHost {
    type Value = FakeValue;

    fn globals(&self) -> FakeValue {
        self.globals.clone()
    }

    fn entries(&self, table: &FakeValue) -> Result<Vec<(FakeValue, FakeValue)>> {
        match table {
            FakeValue::Table(t) => Ok(t.entries.borrow().clone()),
            _ => Ok(vec![]),
        }
    }

    fn string_key(&self, key: &FakeValue) -> Option<String> {
        match key {
            FakeValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn classify(&self, value: &FakeValue) -> LuaType {
        match value {
            FakeValue::Boolean(_) => LuaType::Boolean,
            FakeValue::Number(_) => LuaType::Number,
            FakeValue::String(_) => LuaType::String,
            FakeValue::Table(_) => LuaType::Table,
            FakeValue::Function(_) => LuaType::Function,
        }
    }

    fn identity(&self, value: &FakeValue) -> Option<Identity> {
        match value {
            FakeValue::Table(t) => Some(Identity::from_raw(Rc::as_ptr(t) as *const () as usize)),
            FakeValue::Function(f) => {
                Some(Identity::from_raw(Rc::as_ptr(f) as *const () as usize))
            }
            _ => None,
        }
    }

    fn debug_info(&self, value: &FakeValue) -> Option<DebugInfo> {
        match value {
            FakeValue::Function(f) => f.info.clone(),
            _ => None,
        }
    }

    fn source(&self, file: &str) -> Option<Rc<str>> {
        self.sources.get(file).cloned()
    }
}
