// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Schema records produced by an extraction run.
//!
//! Every record family is a closed enum whose variants serialize with a `kind`
//! discriminant so that a persisted document can be read back into the same shape:
//!
//! ```text
//! {
//!   "defs": {
//!     "global-Foo": {
//!       "orig": [ { "kind": "GlobalOrigin", "path": "Foo" } ],
//!       "kind": "TableDefinition",
//!       "flds": {
//!         "bar": { "many": [ { "kind": "AliasType", "name": "global-Foo.bar" } ] }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Sets (type-tag unions) are written as lists, and origin lists are written as-is.
//! Reading a document back re-merges both, see [`Root::from_json_str`].

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::join::{merge_field, Merge};
use crate::types::{PolyType, TypeTag};

/// Provenance of a Definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind")]
pub enum Origin {
    /// Reachable under a fixed access path from the root namespace.
    #[serde(rename = "GlobalOrigin")]
    Global {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },

    /// The file the entity was defined in, in the engine's chunk name notation.
    #[serde(rename = "FileOrigin")]
    File { file: String },

    #[serde(rename = "ScriptOrigin")]
    Script {
        // line defined
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
        // last line defined
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last: Option<u32>,
        // initiating character
        #[serde(default, skip_serializing_if = "Option::is_none")]
        init: Option<u32>,
        // terminating character
        #[serde(default, skip_serializing_if = "Option::is_none")]
        term: Option<u32>,
    },

    /// Provided by the runtime before any script ran.
    #[serde(rename = "BuiltinOrigin")]
    Builtin {
        #[serde(default)]
        show: bool,
    },
}

impl Origin {
    pub fn global(path: impl Into<String>) -> Origin {
        Origin::Global {
            path: Some(path.into()),
        }
    }

    pub fn file(file: impl Into<String>) -> Origin {
        Origin::File { file: file.into() }
    }

    pub fn script(line: Option<u32>, last: Option<u32>) -> Origin {
        Origin::Script {
            line,
            last,
            init: None,
            term: None,
        }
    }

    pub fn builtin(show: bool) -> Origin {
        Origin::Builtin { show }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Origin::Global { .. } => "GlobalOrigin",
            Origin::File { .. } => "FileOrigin",
            Origin::Script { .. } => "ScriptOrigin",
            Origin::Builtin { .. } => "BuiltinOrigin",
        }
    }

    pub fn same_kind(&self, other: &Origin) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }
}

impl Merge for Origin {
    fn merge(&self, other: &Self) -> Option<Self> {
        Some(match (self, other) {
            (Origin::Global { path: a }, Origin::Global { path: b }) => Origin::Global {
                path: merge_field(a, b),
            },
            (Origin::File { file: a }, Origin::File { file: b }) => Origin::File {
                file: merge_field(a, b),
            },
            (
                Origin::Script {
                    line: l1,
                    last: e1,
                    init: i1,
                    term: t1,
                },
                Origin::Script {
                    line: l2,
                    last: e2,
                    init: i2,
                    term: t2,
                },
            ) => Origin::Script {
                line: merge_field(l1, l2),
                last: merge_field(e1, e2),
                init: merge_field(i1, i2),
                term: merge_field(t1, t2),
            },
            (Origin::Builtin { show: a }, Origin::Builtin { show: b }) => Origin::Builtin {
                show: merge_field(a, b),
            },
            _ => return None,
        })
    }
}

/// Fold an origin list so that at most one origin of each kind survives.
/// Kinds keep the order of their first occurrence.
pub fn fold_origins<'a>(origins: impl IntoIterator<Item = &'a Origin>) -> Vec<Origin> {
    let mut folded: Vec<Origin> = Vec::new();
    for origin in origins {
        match folded.iter_mut().find(|o| o.same_kind(origin)) {
            Some(existing) => {
                if let Some(joined) = existing.merge(origin) {
                    *existing = joined;
                }
            }
            None => folded.push(origin.clone()),
        }
    }
    folded
}

/// A positional argument or return value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Param {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<PolyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

impl Merge for Param {
    fn merge(&self, other: &Self) -> Option<Self> {
        Some(Param {
            name: merge_field(&self.name, &other.name),
            ty: merge_field(&self.ty, &other.ty),
            desc: merge_field(&self.desc, &other.desc),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TableDefinition {
    #[serde(default)]
    pub flds: BTreeMap<String, PolyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<TypeTag>,
}

impl Merge for TableDefinition {
    fn merge(&self, other: &Self) -> Option<Self> {
        Some(TableDefinition {
            flds: merge_field(&self.flds, &other.flds),
            meta: merge_field(&self.meta, &other.meta),
        })
    }
}

/// A table that can also be called.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClassDefinition {
    #[serde(default)]
    pub flds: BTreeMap<String, PolyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<TypeTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call: Option<PolyType>,
}

impl Merge for ClassDefinition {
    fn merge(&self, other: &Self) -> Option<Self> {
        Some(ClassDefinition {
            flds: merge_field(&self.flds, &other.flds),
            meta: merge_field(&self.meta, &other.meta),
            call: merge_field(&self.call, &other.call),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FunctionDefinition {
    /// Declared parameter names, in order.
    /// A position whose observations disagree holds `None`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub para: Vec<Option<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Param>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rets: Vec<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call: Option<PolyType>,
}

impl Merge for FunctionDefinition {
    fn merge(&self, other: &Self) -> Option<Self> {
        Some(FunctionDefinition {
            para: merge_field(&self.para, &other.para),
            args: merge_field(&self.args, &other.args),
            rets: merge_field(&self.rets, &other.rets),
            call: merge_field(&self.call, &other.call),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind")]
pub enum DefinitionKind {
    #[serde(rename = "TableDefinition")]
    Table(TableDefinition),
    #[serde(rename = "ClassDefinition")]
    Class(ClassDefinition),
    #[serde(rename = "FunctionDefinition")]
    Function(FunctionDefinition),
}

impl DefinitionKind {
    pub fn name(&self) -> &'static str {
        match self {
            DefinitionKind::Table(_) => "TableDefinition",
            DefinitionKind::Class(_) => "ClassDefinition",
            DefinitionKind::Function(_) => "FunctionDefinition",
        }
    }
}

impl Merge for DefinitionKind {
    fn merge(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (DefinitionKind::Table(a), DefinitionKind::Table(b)) => {
                a.merge(b).map(DefinitionKind::Table)
            }
            (DefinitionKind::Class(a), DefinitionKind::Class(b)) => {
                a.merge(b).map(DefinitionKind::Class)
            }
            (DefinitionKind::Function(a), DefinitionKind::Function(b)) => {
                a.merge(b).map(DefinitionKind::Function)
            }
            _ => None,
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// A named schema entry for one global entity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Definition {
    /// Formatted description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Formatted usage notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,
    /// Checked by hand against the real API.
    #[serde(default, skip_serializing_if = "is_false")]
    pub good: bool,
    #[serde(default)]
    pub orig: Vec<Origin>,
    #[serde(flatten)]
    pub kind: DefinitionKind,
}

impl Definition {
    pub fn new(kind: DefinitionKind) -> Self {
        Self {
            desc: None,
            uses: None,
            good: false,
            orig: vec![],
            kind,
        }
    }

    pub fn table() -> Self {
        Self::new(DefinitionKind::Table(TableDefinition::default()))
    }

    pub fn class() -> Self {
        Self::new(DefinitionKind::Class(ClassDefinition::default()))
    }

    pub fn function() -> Self {
        Self::new(DefinitionKind::Function(FunctionDefinition::default()))
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn fields(&self) -> Option<&BTreeMap<String, PolyType>> {
        match &self.kind {
            DefinitionKind::Table(t) => Some(&t.flds),
            DefinitionKind::Class(c) => Some(&c.flds),
            DefinitionKind::Function(_) => None,
        }
    }

    pub fn fields_mut(&mut self) -> Option<&mut BTreeMap<String, PolyType>> {
        match &mut self.kind {
            DefinitionKind::Table(t) => Some(&mut t.flds),
            DefinitionKind::Class(c) => Some(&mut c.flds),
            DefinitionKind::Function(_) => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionDefinition> {
        match &self.kind {
            DefinitionKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_function_mut(&mut self) -> Option<&mut FunctionDefinition> {
        match &mut self.kind {
            DefinitionKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// The first origin of the requested kind.
    pub fn origin(&self, kind: &str) -> Option<&Origin> {
        self.orig.iter().find(|o| o.kind_name() == kind)
    }

    pub fn global_path(&self) -> Option<&str> {
        self.orig.iter().find_map(|o| match o {
            Origin::Global { path } => path.as_deref(),
            _ => None,
        })
    }

    pub fn is_builtin(&self) -> bool {
        self.orig.iter().any(|o| matches!(o, Origin::Builtin { .. }))
    }

    /// Join a record with itself, leaving one origin per kind.
    pub fn normalize(self) -> Self {
        match self.merge(&self) {
            Some(d) => d,
            None => self,
        }
    }
}

impl Merge for Definition {
    fn merge(&self, other: &Self) -> Option<Self> {
        let kind = self.kind.merge(&other.kind)?;
        Some(Definition {
            desc: merge_field(&self.desc, &other.desc),
            uses: merge_field(&self.uses, &other.uses),
            // Once verified, stays verified.
            good: self.good || other.good,
            // Origins behave as a set keyed by kind rather than as a positional list.
            orig: fold_origins(self.orig.iter().chain(other.orig.iter())),
            kind,
        })
    }
}

/// Registry of every Definition discovered in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Root {
    #[serde(default)]
    pub defs: BTreeMap<String, Definition>,
}

impl Root {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly discovered Definition.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        definition: Definition,
    ) -> Result<(), SchemaError> {
        use std::collections::btree_map::Entry;
        match self.defs.entry(name.into()) {
            Entry::Occupied(e) => Err(SchemaError::AlreadyRegistered(e.key().clone())),
            Entry::Vacant(e) => {
                e.insert(definition);
                Ok(())
            }
        }
    }

    /// Fold another observation of `name` into the registry.
    pub fn absorb(&mut self, name: &str, definition: Definition) -> Result<(), SchemaError> {
        match self.defs.get_mut(name) {
            Some(existing) => match existing.merge(&definition) {
                Some(joined) => *existing = joined,
                None => {
                    return Err(SchemaError::DiscriminantMismatch {
                        name: name.to_string(),
                        existing: existing.kind_name(),
                        incoming: definition.kind_name(),
                    })
                }
            },
            None => {
                self.defs.insert(name.to_string(), definition.normalize());
            }
        }
        Ok(())
    }

    /// Fold every Definition of another registry into this one.
    pub fn absorb_root(&mut self, other: Root) -> Result<(), SchemaError> {
        for (name, definition) in other.defs {
            self.absorb(&name, definition)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.defs.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Definition> {
        self.defs.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Definition)> {
        self.defs.iter()
    }

    pub fn to_json_str(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a persisted document back, restoring set semantics.
    pub fn from_json_str(json: &str) -> Result<Root> {
        let root: Root = serde_json::from_str(json)?;
        Ok(Root {
            defs: root
                .defs
                .into_iter()
                .map(|(name, d)| (name, d.normalize()))
                .collect(),
        })
    }
}
