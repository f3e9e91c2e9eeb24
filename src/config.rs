// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_NAME_PREFIX: &str = "global-";

/// Extraction settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Directory script and directory paths are resolved against.
    pub scripts_root: PathBuf,
    /// Scripts loaded, in order, by `Extractor::run`.
    pub entry_scripts: Vec<String>,
    /// Lua snippets executed after the entry scripts.
    pub init_calls: Vec<String>,
    /// File path prefixes that are never loaded or scanned.
    pub reject_paths: Vec<String>,
    /// Access path prefixes that are never walked.
    pub reject_globals: Vec<String>,
    pub name_prefix: String,
    pub show_builtins: bool,
    /// Install `Script.ReloadScript` and `System.ScanDirectory`.
    pub host_api: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scripts_root: PathBuf::from("."),
            entry_scripts: vec![],
            init_calls: vec![],
            reject_paths: vec![],
            reject_globals: vec![],
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            show_builtins: false,
            host_api: true,
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read a config file, picking the format from its extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            #[cfg(feature = "yaml")]
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents),
            _ => bail!("Unsupported config file `{}`.", path.display()),
        }
    }

    pub fn is_rejected_path(&self, path: &str) -> bool {
        self.reject_paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    pub fn is_rejected_global(&self, path: &str) -> bool {
        self.reject_globals
            .iter()
            .any(|p| path.starts_with(p.as_str()))
    }

    /// Registry name of an access path.
    pub fn name_of(&self, path: &str) -> String {
        format!("{}{path}", self.name_prefix)
    }
}
