// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::Result;
use log::info;

use crate::config::Config;
use crate::host::ScriptHost;
use crate::runtime::LuaRuntime;
use crate::schema::Root;
use crate::walker::{walk, BuiltinSnapshot};

/// Runs script content and extracts the schema of what it leaves behind.
pub struct Extractor {
    runtime: LuaRuntime,
    builtins: BuiltinSnapshot<mlua::Value>,
    config: Config,
}

impl Extractor {
    pub fn new(config: Config) -> Result<Self> {
        let runtime = LuaRuntime::new(&config.scripts_root)?;

        // Scripts may patch built-in tables in place, so the snapshot is taken
        // before anything else touches the environment.
        let builtins = BuiltinSnapshot::capture(&runtime, &runtime.globals())?;
        info!("captured {} built-in values", builtins.len());

        if config.host_api {
            runtime.install_host_api(&config)?;
        }

        Ok(Self {
            runtime,
            builtins,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn runtime(&self) -> &LuaRuntime {
        &self.runtime
    }

    /// Load a script relative to the scripts root.
    pub fn load_script(&mut self, path: &str) -> Result<()> {
        self.runtime.load_script(&self.config, path)
    }

    /// Run script text attributed to `file`, so that its functions get parameter names.
    pub fn add_source(&mut self, file: &str, contents: &str) -> Result<()> {
        self.runtime.exec_source(file, contents)
    }

    pub fn exec(&mut self, code: &str) -> Result<()> {
        self.runtime.exec(code)
    }

    /// Load the configured entry scripts, then run the configured init calls.
    pub fn run(&mut self) -> Result<()> {
        for script in self.config.entry_scripts.clone() {
            self.load_script(&script)?;
        }
        for code in self.config.init_calls.clone() {
            self.exec(&code)?;
        }
        Ok(())
    }

    pub fn extract(&self) -> Result<Root> {
        walk(&self.runtime, &self.builtins, &self.config)
    }
}
