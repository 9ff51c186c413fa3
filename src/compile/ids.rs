//! Deterministic integer ID assignment.

use std::collections::BTreeMap;

use serde_json::{Map, Value as Json};

use crate::builder::{
    AnimGroup, AttachSlot, Block, Extra, Item, Kind, Recipe, Sprite, Structure,
};

/// Bijection between names and IDs `0..len`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMap {
    names: Vec<String>,
    ids: BTreeMap<String, u32>,
}

static EMPTY: IdMap = IdMap {
    names: Vec::new(),
    ids: BTreeMap::new(),
};

impl IdMap {
    /// IDs in list order.
    pub fn from_ordered<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = IdMap::default();
        for name in names {
            let name = name.into();
            map.ids.insert(name.clone(), map.names.len() as u32);
            map.names.push(name);
        }
        map
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in ID order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// `{name: id}` as a JSON object.
    pub fn to_json(&self) -> Json {
        let map: Map<String, Json> = self
            .ids
            .iter()
            .map(|(name, &id)| (name.clone(), Json::from(id)))
            .collect();
        Json::Object(map)
    }
}

/// Things that carry a name and can be ordered by ID.
pub trait Named {
    fn name(&self) -> &str;
}

macro_rules! impl_named {
    ($($ty:ty),*) => {
        $(impl Named for $ty {
            fn name(&self) -> &str {
                &self.name
            }
        })*
    };
}

impl_named!(Block, Structure, Item, Recipe, AnimGroup, Sprite, AttachSlot, Extra);

impl Named for String {
    fn name(&self) -> &str {
        self
    }
}

/// Attach-slot variants: `(variant name, sprite)`.
impl Named for (String, Option<String>) {
    fn name(&self) -> &str {
        &self.0
    }
}

/// Reorder `list` so that position equals ID and return the name map.
///
/// Reserved names come first in their original list order; the rest follow
/// sorted by name.
pub fn assign_ids<T: Named>(list: &mut Vec<T>, reserved: &[&str]) -> IdMap {
    let (special, mut normal): (Vec<T>, Vec<T>) = list
        .drain(..)
        .partition(|item| reserved.contains(&item.name()));
    normal.sort_by(|a, b| a.name().cmp(b.name()));
    list.extend(special);
    list.extend(normal);
    IdMap::from_ordered(list.iter().map(|item| item.name().to_string()))
}

/// Names reserved per kind.
pub fn reserved_names(kind: Kind) -> &'static [&'static str] {
    match kind {
        Kind::Block => &["empty"],
        Kind::Item => &["none"],
        Kind::AttachSlot => &["none"],
        _ => &[],
    }
}

/// The ID maps of every kind.
#[derive(Debug, Clone, Default)]
pub struct IdMaps {
    maps: BTreeMap<Kind, IdMap>,
}

impl IdMaps {
    pub fn insert(&mut self, kind: Kind, map: IdMap) {
        self.maps.insert(kind, map);
    }

    /// The map for `kind`; empty when the kind has none.
    pub fn of(&self, kind: Kind) -> &IdMap {
        self.maps.get(&kind).unwrap_or(&EMPTY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_reserved_first_then_sorted() {
        let mut list = names(&["stone", "empty", "air", "grass"]);
        let ids = assign_ids(&mut list, &["empty"]);
        assert_eq!(list, names(&["empty", "air", "grass", "stone"]));
        assert_eq!(ids.get("empty"), Some(0));
        assert_eq!(ids.get("stone"), Some(3));
        assert_eq!(ids.name(1), Some("air"));
    }

    #[test]
    fn test_reserved_keep_declaration_order() {
        let mut list = names(&["z", "none", "b", "empty"]);
        let ids = assign_ids(&mut list, &["empty", "none"]);
        assert_eq!(ids.names(), &names(&["none", "empty", "b", "z"])[..]);
    }

    #[test]
    fn test_removal_shifts_only_later_ids() {
        let mut before = names(&["empty", "a", "b", "c", "d"]);
        let ids_before = assign_ids(&mut before, &["empty"]);
        let mut after = names(&["empty", "a", "c", "d"]);
        let ids_after = assign_ids(&mut after, &["empty"]);

        assert_eq!(ids_before.get("empty"), ids_after.get("empty"));
        assert_eq!(ids_before.get("a"), ids_after.get("a"));
        assert_eq!(ids_before.get("c").unwrap() - 1, ids_after.get("c").unwrap());
        assert_eq!(ids_before.get("d").unwrap() - 1, ids_after.get("d").unwrap());
    }

    #[test]
    fn test_deterministic() {
        let mut a = names(&["q", "w", "e"]);
        let mut b = names(&["e", "q", "w"]);
        assert_eq!(assign_ids(&mut a, &[]), assign_ids(&mut b, &[]));
    }

    #[test]
    fn test_to_json() {
        let ids = IdMap::from_ordered(["none", "axe"]);
        assert_eq!(ids.to_json(), serde_json::json!({"none": 0, "axe": 1}));
        assert!(IdMaps::default().of(Kind::Block).is_empty());
    }
}
