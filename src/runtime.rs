// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Result;
use log::{debug, info, warn};
use mlua::{Lua, MultiValue, Table, Value};

use crate::config::Config;
use crate::error::SchemaError;
use crate::host::{DebugInfo, Identity, ScriptHost};
use crate::types::LuaType;

/// `System.ScanDirectory` mode listing files only.
pub const SCANDIR_FILES: i64 = 1;
/// `System.ScanDirectory` mode listing subdirectories only.
pub const SCANDIR_SUBDIRS: i64 = 2;

// Script text, keyed by the file name used as chunk name.
#[derive(Debug, Default)]
struct SourceCache {
    root: PathBuf,
    files: BTreeMap<String, Rc<str>>,
}

impl SourceCache {
    fn read(&mut self, file: &str) -> std::io::Result<Rc<str>> {
        if let Some(text) = self.files.get(file) {
            return Ok(text.clone());
        }
        let text: Rc<str> = std::fs::read_to_string(self.root.join(file))?.into();
        self.files.insert(file.to_string(), text.clone());
        Ok(text)
    }

    fn insert(&mut self, file: &str, text: &str) -> Rc<str> {
        let text: Rc<str> = text.into();
        self.files.insert(file.to_string(), text.clone());
        text
    }
}

fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

fn run_script(
    lua: &Lua,
    env: &Table,
    sources: &RefCell<SourceCache>,
    config: &Config,
    path: &str,
) -> mlua::Result<MultiValue> {
    let path = normalize_path(path);
    if config.is_rejected_path(&path) {
        debug!("rejected script {path}");
        return Ok(MultiValue::new());
    }

    let text = match sources.borrow_mut().read(&path) {
        Ok(text) => text,
        Err(err) => {
            warn!("skipping script {path}: {err}");
            return Ok(MultiValue::new());
        }
    };

    info!("loading {path}");
    lua.load(&*text)
        .set_name(format!("@{path}"))
        .set_environment(env.clone())
        .call(())
}

fn scan_directory(lua: &Lua, config: &Config, path: &str, mode: Option<i64>) -> mlua::Result<Table> {
    let found = lua.create_table()?;
    let path = normalize_path(path);
    if config.is_rejected_path(&path) {
        debug!("rejected directory {path}");
        return Ok(found);
    }

    let entries = match std::fs::read_dir(config.scripts_root.join(&path)) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("cannot scan {path}: {err}");
            return Ok(found);
        }
    };

    let mut names = vec![];
    for entry in entries.flatten() {
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        match mode {
            Some(SCANDIR_FILES) if !is_file => continue,
            Some(SCANDIR_SUBDIRS) if is_file => continue,
            _ => (),
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }

    // Directory order is platform dependent.
    names.sort();
    for (idx, name) in names.into_iter().enumerate() {
        found.raw_set(idx + 1, name)?;
    }
    Ok(found)
}

/// A Lua state whose scripts run inside a private copy of the global table.
pub struct LuaRuntime {
    lua: Lua,
    env: Table,
    sources: Rc<RefCell<SourceCache>>,
}

impl LuaRuntime {
    pub fn new(scripts_root: &Path) -> Result<Self> {
        let lua = Lua::new();
        let env = lua.create_table().map_err(SchemaError::from)?;

        let globals = lua.globals();
        for pair in globals.pairs::<Value, Value>() {
            let (key, value) = pair.map_err(SchemaError::from)?;
            env.raw_set(key, value).map_err(SchemaError::from)?;
        }
        env.raw_set("_G", env.clone()).map_err(SchemaError::from)?;

        Ok(Self {
            lua,
            env,
            sources: Rc::new(RefCell::new(SourceCache {
                root: scripts_root.to_path_buf(),
                files: BTreeMap::new(),
            })),
        })
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// The environment table every script runs in.
    pub fn env(&self) -> &Table {
        &self.env
    }

    pub fn exec(&self, code: &str) -> Result<()> {
        self.lua
            .load(code)
            .set_name("=(luadef)")
            .set_environment(self.env.clone())
            .exec()
            .map_err(SchemaError::from)?;
        Ok(())
    }

    /// Run source text as if it had been loaded from `file`.
    pub fn exec_source(&self, file: &str, contents: &str) -> Result<()> {
        let file = normalize_path(file);
        let text = self.sources.borrow_mut().insert(&file, contents);
        self.lua
            .load(&*text)
            .set_name(format!("@{file}"))
            .set_environment(self.env.clone())
            .exec()
            .map_err(SchemaError::from)?;
        Ok(())
    }

    /// Load a script relative to the scripts root.
    /// Rejected and missing files are skipped.
    pub fn load_script(&self, config: &Config, path: &str) -> Result<()> {
        run_script(&self.lua, &self.env, &self.sources, config, path)
            .map_err(SchemaError::from)?;
        Ok(())
    }

    /// Install `Script.ReloadScript`, `System.ScanDirectory` and the `SCANDIR_*` constants.
    pub fn install_host_api(&self, config: &Config) -> Result<()> {
        let config = Rc::new(config.clone());

        let loader = {
            let env = self.env.clone();
            let sources = self.sources.clone();
            let config = config.clone();
            self.lua
                .create_function(move |lua, path: String| {
                    run_script(lua, &env, &sources, &config, &path)
                })
                .map_err(SchemaError::from)?
        };

        let scanner = {
            let config = config.clone();
            self.lua
                .create_function(move |lua, (path, mode): (String, Option<i64>)| {
                    scan_directory(lua, &config, &path, mode)
                })
                .map_err(SchemaError::from)?
        };

        let script = self.lua.create_table().map_err(SchemaError::from)?;
        script.set("ReloadScript", loader).map_err(SchemaError::from)?;
        self.env.set("Script", script).map_err(SchemaError::from)?;

        let system = self.lua.create_table().map_err(SchemaError::from)?;
        system.set("ScanDirectory", scanner).map_err(SchemaError::from)?;
        self.env.set("System", system).map_err(SchemaError::from)?;

        self.env.set("SCANDIR_FILES", SCANDIR_FILES).map_err(SchemaError::from)?;
        self.env.set("SCANDIR_SUBDIRS", SCANDIR_SUBDIRS).map_err(SchemaError::from)?;
        Ok(())
    }
}

impl ScriptHost for LuaRuntime {
    type Value = Value;

    fn globals(&self) -> Value {
        Value::Table(self.env.clone())
    }

    fn entries(&self, table: &Value) -> Result<Vec<(Value, Value)>> {
        match table {
            Value::Table(t) => Ok(t
                .pairs::<Value, Value>()
                .collect::<mlua::Result<Vec<_>>>()
                .map_err(SchemaError::from)?),
            _ => Ok(vec![]),
        }
    }

    fn string_key(&self, key: &Value) -> Option<String> {
        match key {
            Value::String(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        }
    }

    fn classify(&self, value: &Value) -> LuaType {
        LuaType::from_type_name(value.type_name())
    }

    fn identity(&self, value: &Value) -> Option<Identity> {
        match value {
            Value::Table(_) | Value::Function(_) | Value::Thread(_) | Value::UserData(_) => {
                let ptr = value.to_pointer();
                if ptr.is_null() {
                    None
                } else {
                    Some(Identity::from_raw(ptr as usize))
                }
            }
            _ => None,
        }
    }

    fn debug_info(&self, value: &Value) -> Option<DebugInfo> {
        let Value::Function(function) = value else {
            return None;
        };
        let info = function.info();
        if info.what == "C" {
            return None;
        }
        let file = info
            .source
            .as_deref()
            .and_then(|s| s.strip_prefix('@'))
            .map(str::to_string);
        Some(DebugInfo {
            line: info.line_defined.map(|l| l as u32),
            last: info.last_line_defined.map(|l| l as u32),
            file,
        })
    }

    fn source(&self, file: &str) -> Option<Rc<str>> {
        match self.sources.borrow_mut().read(file) {
            Ok(text) => Some(text),
            Err(err) => {
                warn!("source of {file} is unavailable: {err}");
                None
            }
        }
    }
}
