//! Runtime values of host expressions.

use std::collections::BTreeMap;

use serde_json::Value as Json;

use crate::builder::{Kind, Mesh, Part, ShapeGrid, Visual};
use crate::error::{GenError, Result};
use crate::imaging::{Anim, ImageNode};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Dict(BTreeMap<String, Value>),
    Image(ImageNode),
    Anim(Anim),
    Shape(ShapeGrid),
    Mesh(Mesh),
    Part(Part),
    /// A declared prototype, as `INSTANCES.<kind>.<name>`.
    Proto(Kind, String),
    /// `INSTANCES.<kind>`.
    Builder(Kind),
    /// `INSTANCES`.
    Instances,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Image(_) => "image",
            Value::Anim(_) => "anim",
            Value::Shape(_) => "shape",
            Value::Mesh(_) => "mesh",
            Value::Part(_) => "part",
            Value::Proto(..) => "prototype",
            Value::Builder(_) => "builder",
            Value::Instances => "INSTANCES",
        }
    }

    fn expected(&self, what: &str) -> GenError {
        GenError::eval(format!("expected {}, got {}", what, self.type_name()))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(other.expected("an int")),
        }
    }

    pub fn as_u32(&self) -> Result<u32> {
        let n = self.as_int()?;
        u32::try_from(n).map_err(|_| GenError::eval(format!("{} is out of range", n)))
    }

    pub fn as_u8(&self) -> Result<u8> {
        let n = self.as_int()?;
        u8::try_from(n).map_err(|_| GenError::eval(format!("{} does not fit in 0..=255", n)))
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(other.expected("a bool")),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(other.expected("a string")),
        }
    }

    /// A name: a string, or the name of a prototype reference.
    pub fn as_name(&self) -> Result<&str> {
        match self {
            Value::Str(s) | Value::Proto(_, s) => Ok(s),
            other => Err(other.expected("a name")),
        }
    }

    /// Elements of a list or tuple.
    pub fn as_seq(&self) -> Result<&[Value]> {
        match self {
            Value::List(items) | Value::Tuple(items) => Ok(items),
            other => Err(other.expected("a list")),
        }
    }

    pub fn into_seq(self) -> Result<Vec<Value>> {
        match self {
            Value::List(items) | Value::Tuple(items) => Ok(items),
            other => Err(other.expected("a list")),
        }
    }

    /// A pair of non-negative ints.
    pub fn as_pair(&self) -> Result<(u32, u32)> {
        match self.as_seq()? {
            [a, b] => Ok((a.as_u32()?, b.as_u32()?)),
            items => Err(GenError::eval(format!("expected a pair, got {} items", items.len()))),
        }
    }

    /// A pair of ints, possibly negative.
    pub fn as_offset(&self) -> Result<(i32, i32)> {
        match self.as_seq()? {
            [a, b] => Ok((to_i32(a.as_int()?)?, to_i32(b.as_int()?)?)),
            items => Err(GenError::eval(format!("expected a pair, got {} items", items.len()))),
        }
    }

    pub fn as_triple(&self) -> Result<(i64, i64, i64)> {
        match self.as_seq()? {
            [a, b, c] => Ok((a.as_int()?, b.as_int()?, c.as_int()?)),
            items => Err(GenError::eval(format!("expected a triple, got {} items", items.len()))),
        }
    }

    pub fn as_vertex(&self) -> Result<[i32; 3]> {
        let (x, y, z) = self.as_triple()?;
        Ok([to_i32(x)?, to_i32(y)?, to_i32(z)?])
    }

    pub fn as_image(&self) -> Result<&ImageNode> {
        match self {
            Value::Image(img) => Ok(img),
            other => Err(other.expected("an image")),
        }
    }

    pub fn as_visual(&self) -> Result<Visual> {
        match self {
            Value::Image(img) => Ok(Visual::Image(img.clone())),
            Value::Anim(anim) => Ok(Visual::Anim(anim.clone())),
            other => Err(other.expected("an image or anim")),
        }
    }

    pub fn as_mesh(&self) -> Result<&Mesh> {
        match self {
            Value::Mesh(mesh) => Ok(mesh),
            other => Err(other.expected("a mesh")),
        }
    }

    pub fn as_shape(&self) -> Result<&ShapeGrid> {
        match self {
            Value::Shape(shape) => Ok(shape),
            other => Err(other.expected("a shape")),
        }
    }

    pub fn as_part(&self) -> Result<&Part> {
        match self {
            Value::Part(part) => Ok(part),
            other => Err(other.expected("a part")),
        }
    }

    /// Plain data as JSON. Images and other pipeline values have no JSON
    /// form.
    pub fn to_json(&self) -> Result<Json> {
        Ok(match self {
            Value::None => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::from(*n),
            Value::Str(s) => Json::String(s.clone()),
            Value::List(items) | Value::Tuple(items) => {
                Json::Array(items.iter().map(Value::to_json).collect::<Result<_>>()?)
            }
            Value::Dict(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), v.to_json()?)))
                    .collect::<Result<_>>()?,
            ),
            Value::Proto(_, name) => Json::String(name.clone()),
            other => return Err(other.expected("plain data")),
        })
    }

    /// Truthiness for keyword flags like `oneshot=`.
    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Str(s) => !s.is_empty(),
            Value::List(v) | Value::Tuple(v) => !v.is_empty(),
            Value::Dict(m) => !m.is_empty(),
            _ => true,
        }
    }
}

fn to_i32(n: i64) -> Result<i32> {
    i32::try_from(n).map_err(|_| GenError::eval(format!("{} is out of range", n)))
}

impl From<(u32, u32)> for Value {
    fn from((a, b): (u32, u32)) -> Self {
        Value::Tuple(vec![Value::Int(a.into()), Value::Int(b.into())])
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}
