//! Loot table declarations, as written in `.loot` scripts.
//!
//! Unlike the other kinds these are not kept in a name-unique builder:
//! extensions share their base table's name, and duplicate bases are a
//! loot-compiler diagnostic rather than a fatal error.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LootMode {
    /// Pick one variant by weight.
    Choose,
    /// Roll every part independently against its percentage chance.
    Multi,
}

impl LootMode {
    pub fn name(self) -> &'static str {
        match self {
            LootMode::Choose => "choose",
            LootMode::Multi => "multi",
        }
    }
}

/// Kind of object a table drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LootObject {
    Item,
    Structure,
}

impl LootObject {
    pub const ALL: [LootObject; 2] = [LootObject::Item, LootObject::Structure];

    pub fn name(self) -> &'static str {
        match self {
            LootObject::Item => "item",
            LootObject::Structure => "structure",
        }
    }
}

/// What a variant or part produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LootRef {
    /// Another table of the same object kind.
    Table(String),
    /// `min..=max` of an object.
    Object { name: String, min: u32, max: u32 },
}

impl fmt::Display for LootRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LootRef::Table(name) => write!(f, "*{}", name),
            LootRef::Object { name, min, max } if min == max => write!(f, "{} {}", min, name),
            LootRef::Object { name, min, max } => write!(f, "{}-{} {}", min, max, name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LootEntry {
    /// Weight for `choose`, percentage chance for `multi`.
    pub weight: i32,
    pub target: LootRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LootTableDef {
    pub name: String,
    pub mode: LootMode,
    pub object: LootObject,
    pub extension: bool,
    pub entries: Vec<LootEntry>,
    /// `file:line` of the header, for diagnostics.
    pub origin: Option<String>,
}

impl LootTableDef {
    /// Default weight of an entry without a parenthesised number.
    pub fn default_weight(mode: LootMode) -> i32 {
        match mode {
            LootMode::Choose => 1,
            LootMode::Multi => 100,
        }
    }

    /// `choose_item`, `multi_structure_ext` and so on.
    pub fn header(&self) -> String {
        format!(
            "{}_{}{}",
            self.mode.name(),
            self.object.name(),
            if self.extension { "_ext" } else { "" }
        )
    }
}
