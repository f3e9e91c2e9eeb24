// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::{BTreeSet, HashMap, VecDeque};

use anyhow::Result;
use lazy_static::lazy_static;
use log::{debug, info, warn};

use crate::config::Config;
use crate::host::{Identity, ScriptHost};
use crate::schema::{Definition, Origin, Root};
use crate::signature::recover_params;
use crate::types::{LuaType, TypeTag};

/// Access path of the root namespace.
pub const ROOT_PATH: &str = "_G";

lazy_static! {
    static ref KEYWORDS: BTreeSet<&'static str> = [
        "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if",
        "in", "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
    ]
    .into_iter()
    .collect();
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => (),
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric()) && !KEYWORDS.contains(key)
}

fn quote(key: &str) -> String {
    let mut quoted = String::with_capacity(key.len() + 2);
    quoted.push('"');
    for c in key.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => quoted.push_str(&format!("\\{}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Access path of `key` inside the table reached by `parent`.
/// `None` is the root namespace.
///
/// The root namespace's own `_G` entry is spelled `_G["_G"]` so that a script
/// rebinding `_G` never shares a name with the namespace itself.
pub fn access_path(parent: Option<&str>, key: &str) -> String {
    match (parent, is_identifier(key)) {
        (None, _) if key == ROOT_PATH => format!("{ROOT_PATH}[{}]", quote(key)),
        (None, true) => key.to_string(),
        (None, false) => format!("{ROOT_PATH}[{}]", quote(key)),
        (Some(parent), true) => format!("{parent}.{key}"),
        (Some(parent), false) => format!("{parent}[{}]", quote(key)),
    }
}

/// Every table and function reachable from the environment before any script ran.
///
/// The values are retained so that their identities cannot be reused by
/// values created later.
pub struct BuiltinSnapshot<V> {
    members: HashMap<Identity, V>,
}

impl<V: Clone> BuiltinSnapshot<V> {
    pub fn capture<H: ScriptHost<Value = V>>(host: &H, root: &V) -> Result<Self> {
        let mut members = HashMap::new();
        let mut queue = VecDeque::new();

        if let Some(id) = host.identity(root) {
            members.insert(id, root.clone());
        }
        queue.push_back(root.clone());

        while let Some(table) = queue.pop_front() {
            for (_, value) in host.entries(&table)? {
                let ty = host.classify(&value);
                if !ty.is_expandable() {
                    continue;
                }
                let Some(id) = host.identity(&value) else {
                    continue;
                };
                if members.contains_key(&id) {
                    continue;
                }
                members.insert(id, value.clone());
                if ty == LuaType::Table {
                    queue.push_back(value);
                }
            }
        }

        Ok(Self { members })
    }

    pub fn contains(&self, id: Identity) -> bool {
        self.members.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// A table whose entries are yet to be examined.
struct Pending<V> {
    name: String,
    path: Option<String>,
    table: V,
}

struct Walker<'a, H: ScriptHost> {
    host: &'a H,
    builtins: &'a BuiltinSnapshot<H::Value>,
    config: &'a Config,
    // Identity of every expanded value and the name it was registered under.
    seen: HashMap<Identity, String>,
    queue: VecDeque<Pending<H::Value>>,
    root: Root,
}

impl<'a, H: ScriptHost> Walker<'a, H> {
    fn observe(&mut self, parent: &str, key: &str, tag: TypeTag) {
        if let Some(fields) = self.root.get_mut(parent).and_then(|d| d.fields_mut()) {
            fields.entry(key.to_string()).or_default().insert(tag);
        }
    }

    fn expand(&mut self, pending: Pending<H::Value>) -> Result<()> {
        let mut entries: Vec<(String, H::Value)> = self
            .host
            .entries(&pending.table)?
            .into_iter()
            .filter_map(|(k, v)| self.host.string_key(&k).map(|k| (k, v)))
            .collect();
        // Iteration order of the runtime is not stable across runs.
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, value) in entries {
            let path = access_path(pending.path.as_deref(), &key);
            if self.config.is_rejected_global(&path) {
                debug!("rejected global {path}");
                continue;
            }
            let name = self.config.name_of(&path);
            let ty = self.host.classify(&value);

            let id = if ty.is_expandable() {
                self.host.identity(&value)
            } else {
                None
            };
            if let Some(canonical) = id.and_then(|id| self.seen.get(&id)) {
                let tag = TypeTag::alias(canonical.clone());
                self.observe(&pending.name, &key, tag);
                continue;
            }
            self.observe(&pending.name, &key, TypeTag::alias(name.clone()));

            let builtin = id.map(|id| self.builtins.contains(id)).unwrap_or(false);
            let mut definition = match ty {
                LuaType::Table => {
                    self.queue.push_back(Pending {
                        name: name.clone(),
                        path: Some(path.clone()),
                        table: value.clone(),
                    });
                    Definition::table()
                }
                LuaType::Function if builtin => Definition::function(),
                LuaType::Function => self.script_function(&value, &path)?,
                _ => {
                    self.observe(&pending.name, &key, TypeTag::lua(ty));
                    continue;
                }
            };

            if let Some(id) = id {
                self.seen.insert(id, name.clone());
            }
            if builtin {
                definition.orig.push(Origin::builtin(self.config.show_builtins));
            }
            definition.orig.push(Origin::global(path));
            self.root.register(name, definition)?;
        }
        Ok(())
    }

    fn script_function(&self, value: &H::Value, path: &str) -> Result<Definition> {
        let mut definition = Definition::function();
        let Some(info) = self.host.debug_info(value) else {
            return Ok(definition);
        };
        definition.orig.push(Origin::script(info.line, info.last));

        let Some(file) = info.file else {
            return Ok(definition);
        };
        definition.orig.push(Origin::file(file.as_str()));

        let (Some(line), Some(contents)) = (info.line, self.host.source(&file)) else {
            return Ok(definition);
        };
        match recover_params(&contents, path, line, info.last.unwrap_or(line)) {
            Ok(params) => {
                if let Some(function) = definition.as_function_mut() {
                    function.para = params.into_iter().map(Some).collect();
                }
            }
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => warn!("{file}: {err}"),
        }
        Ok(definition)
    }
}

/// Walk everything reachable from the host's root namespace.
pub fn walk<H: ScriptHost>(
    host: &H,
    builtins: &BuiltinSnapshot<H::Value>,
    config: &Config,
) -> Result<Root> {
    let globals = host.globals();
    let root_name = config.name_of(ROOT_PATH);

    let mut walker = Walker {
        host,
        builtins,
        config,
        seen: HashMap::new(),
        queue: VecDeque::new(),
        root: Root::new(),
    };

    let mut definition = Definition::table();
    definition.orig.push(Origin::builtin(true));
    definition.orig.push(Origin::global(ROOT_PATH));
    walker.root.register(root_name.clone(), definition)?;
    if let Some(id) = host.identity(&globals) {
        walker.seen.insert(id, root_name.clone());
    }
    walker.queue.push_back(Pending {
        name: root_name,
        path: None,
        table: globals,
    });

    while let Some(pending) = walker.queue.pop_front() {
        walker.expand(pending)?;
    }

    info!("walk finished with {} definitions", walker.root.len());
    Ok(walker.root)
}
