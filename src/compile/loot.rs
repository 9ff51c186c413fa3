//! Loot-table compiler.
//!
//! For each object kind, base tables get IDs `0..N` in name order. Each base
//! absorbs its extensions (in declaration order), references are resolved,
//! object drops are deduplicated and appended after the tables, and table
//! references are checked for cycles.

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Value as Json};
use tracing::debug;

use crate::builder::{Kind, LootMode, LootObject, LootRef, LootTableDef};
use crate::diagnostics::Diagnostics;
use crate::error::GenError;

use super::ids::{IdMap, IdMaps};

/// One entry of the compiled table array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledLoot {
    /// `(weight, index)` pairs.
    Choose(Vec<(u32, Option<u32>)>),
    /// `(percent chance, index)` pairs.
    Multi(Vec<(u32, Option<u32>)>),
    Object { id: Option<u32>, min: u32, max: u32 },
}

impl CompiledLoot {
    pub fn to_json(&self) -> Json {
        match self {
            CompiledLoot::Choose(variants) => json!({ "choose": pairs(variants) }),
            CompiledLoot::Multi(parts) => json!({ "multi": pairs(parts) }),
            CompiledLoot::Object { id, min, max } => json!({ "object": id, "min": min, "max": max }),
        }
    }
}

fn pairs(entries: &[(u32, Option<u32>)]) -> Json {
    Json::Array(entries.iter().map(|(w, idx)| json!([w, idx])).collect())
}

/// Compiled tables for one object kind. The first `table_ids.len()` entries
/// are the base tables in ID order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LootTables {
    pub table_ids: IdMap,
    pub entries: Vec<CompiledLoot>,
}

impl LootTables {
    pub fn to_json(&self) -> Json {
        Json::Array(self.entries.iter().map(CompiledLoot::to_json).collect())
    }
}

/// Compile the tables of every object kind.
pub fn compile_all(
    defs: &[LootTableDef],
    ids: &IdMaps,
    diagnostics: &mut Diagnostics,
) -> BTreeMap<LootObject, LootTables> {
    LootObject::ALL
        .into_iter()
        .map(|object| {
            let objects = match object {
                LootObject::Item => ids.of(Kind::Item),
                LootObject::Structure => ids.of(Kind::Structure),
            };
            (object, compile(defs, object, objects, diagnostics))
        })
        .collect()
}

/// Compile the tables dropping `object`s.
pub fn compile(
    defs: &[LootTableDef],
    object: LootObject,
    objects: &IdMap,
    diagnostics: &mut Diagnostics,
) -> LootTables {
    let defs: Vec<&LootTableDef> = defs.iter().filter(|d| d.object == object).collect();

    // 1. bases and extensions
    let mut bases: BTreeMap<&str, &LootTableDef> = BTreeMap::new();
    for def in defs.iter().filter(|d| !d.extension) {
        if bases.contains_key(def.name.as_str()) {
            report(
                diagnostics,
                def,
                &GenError::DuplicateName {
                    kind: "loot table",
                    name: def.name.clone(),
                },
            );
            continue;
        }
        bases.insert(&def.name, def);
    }

    // 3. fold extensions in declaration order
    let mut groups: BTreeMap<&str, Vec<&LootTableDef>> =
        bases.iter().map(|(&name, &def)| (name, vec![def])).collect();
    for ext in defs.iter().filter(|d| d.extension) {
        match bases.get(ext.name.as_str()) {
            None => report(
                diagnostics,
                ext,
                &GenError::LootMissingBase {
                    name: ext.name.clone(),
                },
            ),
            Some(base) if base.mode != ext.mode => report(
                diagnostics,
                ext,
                &GenError::LootTypeMismatch {
                    name: ext.name.clone(),
                    expected: base.header(),
                    found: ext.header(),
                },
            ),
            Some(_) => {
                if let Some(group) = groups.get_mut(ext.name.as_str()) {
                    group.push(ext);
                }
            }
        }
    }

    // 2. table IDs in name order
    let table_ids = IdMap::from_ordered(groups.keys().copied());

    let mut entries: Vec<CompiledLoot> = Vec::with_capacity(table_ids.len());
    let mut object_index: HashMap<(Option<u32>, u32, u32), u32> = HashMap::new();
    let mut appended: Vec<CompiledLoot> = Vec::new();
    let mut edges: Vec<Vec<u32>> = vec![Vec::new(); table_ids.len()];

    // 4 + 5. merge and resolve
    for (table_id, (name, group)) in groups.iter().enumerate() {
        let merged = merge_group(group);
        let mut resolved = Vec::with_capacity(merged.len());
        for (weight, target) in merged {
            let index = match &target {
                LootRef::Table(t) => {
                    let id = table_ids.get(t);
                    match id {
                        Some(id) => edges[table_id].push(id),
                        None => report(
                            diagnostics,
                            group[0],
                            &GenError::UnresolvedReference {
                                context: format!("loot table '{}'", name),
                                kind: "loot table",
                                name: t.clone(),
                            },
                        ),
                    }
                    id
                }
                LootRef::Object { name: obj, min, max } => {
                    let id = objects.get(obj);
                    if id.is_none() {
                        report(
                            diagnostics,
                            group[0],
                            &GenError::UnresolvedReference {
                                context: format!("loot table '{}'", name),
                                kind: object.name(),
                                name: obj.clone(),
                            },
                        );
                    }
                    let next = (table_ids.len() + appended.len()) as u32;
                    let index = *object_index.entry((id, *min, *max)).or_insert_with(|| {
                        appended.push(CompiledLoot::Object {
                            id,
                            min: *min,
                            max: *max,
                        });
                        next
                    });
                    Some(index)
                }
            };
            resolved.push((weight, index));
        }
        entries.push(match group[0].mode {
            LootMode::Choose => CompiledLoot::Choose(resolved),
            LootMode::Multi => CompiledLoot::Multi(resolved),
        });
    }
    entries.extend(appended);

    // 6. cycles
    if let Some(cycle) = find_cycle(&edges) {
        let path = cycle
            .iter()
            .filter_map(|&id| table_ids.name(id).map(str::to_string))
            .collect();
        diagnostics.report(&GenError::LootCycle { path });
    }

    debug!(
        object = object.name(),
        tables = table_ids.len(),
        entries = entries.len(),
        "compiled loot tables"
    );
    LootTables { table_ids, entries }
}

/// Combined `(weight, ref)` list of a base and its extensions.
fn merge_group(group: &[&LootTableDef]) -> Vec<(u32, LootRef)> {
    match group[0].mode {
        LootMode::Choose => {
            let mut sums: BTreeMap<&LootRef, i64> = BTreeMap::new();
            for entry in group.iter().flat_map(|def| &def.entries) {
                *sums.entry(&entry.target).or_insert(0) += i64::from(entry.weight);
            }
            sums.into_iter()
                .filter(|&(_, w)| w > 0)
                .map(|(target, w)| (w.min(i64::from(u32::MAX)) as u32, target.clone()))
                .collect()
        }
        LootMode::Multi => group
            .iter()
            .flat_map(|def| &def.entries)
            .map(|entry| (entry.weight.max(0) as u32, entry.target.clone()))
            .collect(),
    }
}

/// Iterative DFS over table-to-table edges. Returns `[t0, t1, …, t0]`.
fn find_cycle(edges: &[Vec<u32>]) -> Option<Vec<u32>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut marks = vec![Mark::New; edges.len()];
    for start in 0..edges.len() {
        if marks[start] != Mark::New {
            continue;
        }
        // (node, next edge to follow)
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        marks[start] = Mark::Active;
        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            top.1 += 1;
            if let Some(&dep) = edges[node].get(next) {
                let dep = dep as usize;
                match marks[dep] {
                    Mark::New => {
                        marks[dep] = Mark::Active;
                        stack.push((dep, 0));
                    }
                    Mark::Active => {
                        let from = stack.iter().position(|&(n, _)| n == dep).unwrap_or(0);
                        let mut cycle: Vec<u32> =
                            stack[from..].iter().map(|&(n, _)| n as u32).collect();
                        cycle.push(dep as u32);
                        return Some(cycle);
                    }
                    Mark::Done => {}
                }
            } else {
                marks[node] = Mark::Done;
                stack.pop();
            }
        }
    }
    None
}

fn report(diagnostics: &mut Diagnostics, def: &LootTableDef, err: &GenError) {
    match &def.origin {
        Some(origin) => diagnostics.report_at(origin.clone(), err),
        None => diagnostics.report(err),
    }
}
