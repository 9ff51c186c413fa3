//! Extras: named JSON values generated after everything else is resolved.

use std::fmt;
use std::rc::Rc;

use serde_json::Value as Json;

use crate::compile::ExtraInput;
use crate::error::Result;

use super::field::Check;
use super::scope::{Prototype, ScopeMut};
use super::Kind;

pub type ExtraFn = Rc<dyn Fn(&ExtraInput<'_>) -> Result<Json>>;

#[derive(Clone)]
pub enum ExtraGen {
    /// The ID map of a kind, as `{name: id}`.
    Ids(Kind),
    /// A fixed value.
    Value(Json),
    /// Rust callback registered by a native data module.
    Native(ExtraFn),
}

impl fmt::Debug for ExtraGen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtraGen::Ids(kind) => write!(f, "Ids({})", kind.name()),
            ExtraGen::Value(v) => write!(f, "Value({})", v),
            ExtraGen::Native(_) => f.write_str("Native(..)"),
        }
    }
}

impl ExtraGen {
    pub fn generate(&self, input: &ExtraInput<'_>) -> Result<Json> {
        match self {
            ExtraGen::Ids(kind) => Ok(input.ids.of(*kind).to_json()),
            ExtraGen::Value(v) => Ok(v.clone()),
            ExtraGen::Native(f) => f(input),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtraProto {
    pub name: String,
    pub generator: Option<ExtraGen>,
}

#[derive(Debug, Clone)]
pub struct Extra {
    pub name: String,
    pub generator: ExtraGen,
}

impl Prototype for ExtraProto {
    type Output = Extra;
    const KIND: Kind = Kind::Extra;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn instantiate(&self) -> Result<Extra> {
        let check = Check::new("extra", &self.name);
        Ok(Extra {
            name: self.name.clone(),
            generator: check.require("generator", &self.generator)?.clone(),
        })
    }
}

impl ScopeMut<'_, ExtraProto> {
    pub fn generator(&mut self, generator: ExtraGen) -> &mut Self {
        self.set(move |p| p.generator = Some(generator.clone()))
    }

    pub fn ids(&mut self, kind: Kind) -> &mut Self {
        self.generator(ExtraGen::Ids(kind))
    }

    pub fn value(&mut self, value: Json) -> &mut Self {
        self.generator(ExtraGen::Value(value))
    }

    pub fn native<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&ExtraInput<'_>) -> Result<Json> + 'static,
    {
        self.generator(ExtraGen::Native(Rc::new(f)))
    }
}
