//! Builder scopes.
//!
//! Each entity kind has one top-level [`Builder`]. It owns every prototype
//! added for that kind plus a tree of scopes. A scope holds a template
//! prototype (cloned by `add`) and the prototypes added inside it or any of
//! its descendants. Setters on a scope update its template and all of its
//! members, which gives the fan-out behaviour data modules rely on:
//!
//! ```ignore
//! let mut ores = builders.block.root().prefixed("ore");
//! ores.add_all(["iron", "copper"])?.shape(BlockShape::Solid);
//! // registers "ore/iron" and "ore/copper", both solid
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::error::{GenError, Result};

use super::Kind;

/// A prototype kind stored in a [`Builder`].
pub trait Prototype: Clone + Default + fmt::Debug {
    /// The concrete entity produced by `instantiate`.
    type Output;

    const KIND: Kind;

    fn name(&self) -> &str;

    fn set_name(&mut self, name: String);

    /// Validate the fields and build the concrete entity.
    fn instantiate(&self) -> Result<Self::Output>;
}

/// Handle to a scope inside one builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);
}

#[derive(Debug)]
struct Scope<P> {
    parent: Option<ScopeId>,
    prefix: Option<String>,
    template: P,
    /// (name local to this scope, index into `Builder::protos`)
    members: Vec<(String, usize)>,
}

/// Top-level builder for one kind.
#[derive(Debug)]
pub struct Builder<P> {
    protos: Vec<P>,
    index: HashMap<String, usize>,
    scopes: Vec<Scope<P>>,
}

impl<P: Prototype> Default for Builder<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Prototype> Builder<P> {
    pub fn new() -> Self {
        Self {
            protos: Vec::new(),
            index: HashMap::new(),
            scopes: vec![Scope {
                parent: None,
                prefix: None,
                template: P::default(),
                members: Vec::new(),
            }],
        }
    }

    pub fn root(&mut self) -> ScopeMut<'_, P> {
        self.scope(ScopeId::ROOT)
    }

    /// Re-open a scope created earlier.
    pub fn scope(&mut self, id: ScopeId) -> ScopeMut<'_, P> {
        ScopeMut {
            builder: self,
            id,
            only: None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&P> {
        self.index.get(name).map(|&i| &self.protos[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Prototypes in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &P> {
        self.protos.iter()
    }

    pub fn len(&self) -> usize {
        self.protos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protos.is_empty()
    }

    /// Full names of the prototypes in a scope, in insertion order.
    pub fn member_names(&self, id: ScopeId) -> Vec<String> {
        self.scopes[id.0]
            .members
            .iter()
            .map(|&(_, i)| self.protos[i].name().to_string())
            .collect()
    }

    fn push_scope(&mut self, parent: ScopeId, prefix: Option<String>) -> ScopeId {
        let template = self.scopes[parent.0].template.clone();
        self.scopes.push(Scope {
            parent: Some(parent),
            prefix,
            template,
            members: Vec::new(),
        });
        ScopeId(self.scopes.len() - 1)
    }

    /// Register `proto` under `local` in `scope`, propagating to every
    /// ancestor with their prefixes applied.
    fn register(&mut self, scope: ScopeId, local: &str, mut proto: P) -> Result<usize> {
        let mut chain = Vec::new();
        let mut name = local.to_string();
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let s = &self.scopes[id.0];
            chain.push((id, name.clone()));
            if let Some(prefix) = &s.prefix {
                name = format!("{}/{}", prefix, name);
            }
            cursor = s.parent;
        }

        if self.index.contains_key(&name) {
            return Err(GenError::DuplicateName {
                kind: P::KIND.name(),
                name,
            });
        }

        proto.set_name(name.clone());
        let idx = self.protos.len();
        self.protos.push(proto);
        self.index.insert(name, idx);
        for (id, local) in chain {
            self.scopes[id.0].members.push((local, idx));
        }
        Ok(idx)
    }
}

/// Mutable view of one scope. Setters return `&mut Self` so they chain.
///
/// A view narrowed with [`ScopeMut::member`] only touches that member and
/// leaves the scope's template alone.
pub struct ScopeMut<'a, P> {
    builder: &'a mut Builder<P>,
    id: ScopeId,
    only: Option<usize>,
}

impl<'a, P: Prototype> ScopeMut<'a, P> {
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Fresh empty scope sharing this scope's template.
    pub fn child(&mut self) -> ScopeMut<'_, P> {
        let id = self.builder.push_scope(self.id, None);
        self.builder.scope(id)
    }

    /// Child scope that prepends `prefix/` to every name added inside it.
    pub fn prefixed(&mut self, prefix: &str) -> ScopeMut<'_, P> {
        let id = self.builder.push_scope(self.id, Some(prefix.to_string()));
        self.builder.scope(id)
    }

    /// Add one prototype cloned from the template. The returned scope
    /// contains just the new prototype.
    pub fn add(&mut self, name: &str) -> Result<ScopeMut<'_, P>> {
        self.add_all([name])
    }

    /// Add one prototype per name, all cloned from the template.
    pub fn add_all<I, S>(&mut self, names: I) -> Result<ScopeMut<'_, P>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let child = self.builder.push_scope(self.id, None);
        for name in names {
            let proto = self.builder.scopes[self.id.0].template.clone();
            self.builder.register(child, name.as_ref(), proto)?;
        }
        Ok(self.builder.scope(child))
    }

    /// Add existing prototypes as new children under the given names.
    pub fn from_clone<I>(&mut self, sources: I) -> Result<ScopeMut<'_, P>>
    where
        I: IntoIterator<Item = (String, P)>,
    {
        let child = self.builder.push_scope(self.id, None);
        for (name, proto) in sources {
            self.builder.register(child, &name, proto)?;
        }
        Ok(self.builder.scope(child))
    }

    /// Apply `f` to the template and every member (or only the narrowed
    /// member).
    pub fn set(&mut self, f: impl Fn(&mut P)) -> &mut Self {
        match self.only {
            Some(idx) => f(&mut self.builder.protos[idx]),
            None => {
                let scope = &mut self.builder.scopes[self.id.0];
                f(&mut scope.template);
                let members: Vec<usize> = scope.members.iter().map(|&(_, i)| i).collect();
                for idx in members {
                    f(&mut self.builder.protos[idx]);
                }
            }
        }
        self
    }

    /// Narrow to the member registered here as `local`.
    pub fn member(&mut self, local: &str) -> Result<ScopeMut<'_, P>> {
        let idx = self.builder.scopes[self.id.0]
            .members
            .iter()
            .find(|(name, _)| name == local)
            .map(|&(_, i)| i)
            .ok_or_else(|| GenError::UnresolvedReference {
                context: format!("{} scope", P::KIND.name()),
                kind: P::KIND.name(),
                name: local.to_string(),
            })?;
        Ok(ScopeMut {
            builder: &mut *self.builder,
            id: self.id,
            only: Some(idx),
        })
    }

    /// Prototypes visible through this view.
    pub fn protos(&self) -> Vec<&P> {
        match self.only {
            Some(idx) => vec![&self.builder.protos[idx]],
            None => self.builder.scopes[self.id.0]
                .members
                .iter()
                .map(|&(_, i)| &self.builder.protos[i])
                .collect(),
        }
    }

    pub fn template(&self) -> &P {
        &self.builder.scopes[self.id.0].template
    }
}
