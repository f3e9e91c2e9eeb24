// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::join::{merge_sets, Merge};

/// Runtime type names reported by the script engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LuaType {
    Nil,
    Boolean,
    Number,
    String,
    Integer,
    LightUserdata,
    Table,
    Userdata,
    Function,
    Thread,
}

impl LuaType {
    /// Map a `type()`-style name onto the vocabulary.
    /// Names the vocabulary does not know about are opaque host objects.
    pub fn from_type_name(name: &str) -> LuaType {
        match name {
            "nil" => LuaType::Nil,
            "boolean" => LuaType::Boolean,
            "number" => LuaType::Number,
            "string" => LuaType::String,
            "integer" => LuaType::Integer,
            "lightuserdata" => LuaType::LightUserdata,
            "table" => LuaType::Table,
            "function" => LuaType::Function,
            "thread" => LuaType::Thread,
            _ => LuaType::Userdata,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LuaType::Nil => "nil",
            LuaType::Boolean => "boolean",
            LuaType::Number => "number",
            LuaType::String => "string",
            LuaType::Integer => "integer",
            LuaType::LightUserdata => "lightuserdata",
            LuaType::Table => "table",
            LuaType::Userdata => "userdata",
            LuaType::Function => "function",
            LuaType::Thread => "thread",
        }
    }

    /// Types whose values have reference identity and may be expanded into a Definition.
    pub fn is_expandable(&self) -> bool {
        matches!(self, LuaType::Table | LuaType::Function)
    }
}

impl fmt::Display for LuaType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A leaf type claim about a slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(tag = "kind")]
pub enum TypeTag {
    /// Exactly this runtime type.
    #[serde(rename = "LuaType")]
    Lua { name: LuaType },
    /// Exactly the Definition registered under `name`.
    #[serde(rename = "AliasType")]
    Alias { name: String },
}

impl TypeTag {
    pub fn lua(ty: LuaType) -> TypeTag {
        TypeTag::Lua { name: ty }
    }

    pub fn alias(name: impl Into<String>) -> TypeTag {
        TypeTag::Alias { name: name.into() }
    }

    /// Two leaves only combine when they make the same claim.
    /// Distinct claims coexist as separate members of a [`PolyType`].
    pub fn combine(&self, other: &TypeTag) -> Option<TypeTag> {
        if self == other {
            Some(self.clone())
        } else {
            None
        }
    }
}

impl Merge for TypeTag {
    fn merge(&self, other: &Self) -> Option<Self> {
        self.combine(other)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeTag::Lua { name } => write!(f, "{name}"),
            TypeTag::Alias { name } => write!(f, "{name}"),
        }
    }
}

/// A union of type tags observed for one slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "PolyTypeRepr")]
pub struct PolyType {
    pub many: BTreeSet<TypeTag>,
}

// Serialization formats have no set type; the members arrive as a list that may
// carry the same logical tag more than once.
#[derive(Deserialize)]
struct PolyTypeRepr {
    #[serde(default)]
    many: Vec<TypeTag>,
}

impl From<PolyTypeRepr> for PolyType {
    fn from(repr: PolyTypeRepr) -> Self {
        repr.many.into_iter().collect()
    }
}

impl FromIterator<TypeTag> for PolyType {
    fn from_iter<I: IntoIterator<Item = TypeTag>>(iter: I) -> Self {
        let many = iter
            .into_iter()
            .fold(BTreeSet::new(), |acc, tag| merge_sets(&acc, [&tag]));
        PolyType { many }
    }
}

impl PolyType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: TypeTag) {
        if !self.many.contains(&tag) {
            self.many = merge_sets(&self.many, [&tag]);
        }
    }

    pub fn contains(&self, tag: &TypeTag) -> bool {
        self.many.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.many.is_empty()
    }

    pub fn len(&self) -> usize {
        self.many.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeTag> {
        self.many.iter()
    }

    /// Names of all Definitions this union refers to.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.many.iter().filter_map(|t| match t {
            TypeTag::Alias { name } => Some(name.as_str()),
            TypeTag::Lua { .. } => None,
        })
    }
}

impl Merge for PolyType {
    fn merge(&self, other: &Self) -> Option<Self> {
        Some(PolyType {
            many: self.many.merge(&other.many)?,
        })
    }
}

impl fmt::Display for PolyType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.many.is_empty() {
            return f.write_str("unknown");
        }
        let parts: Vec<String> = self.many.iter().map(|t| t.to_string()).collect();
        f.write_str(&parts.join("|"))
    }
}
