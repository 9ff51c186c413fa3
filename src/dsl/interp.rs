//! Host-expression evaluation.
//!
//! Only allow-listed builtins and methods can be called. Expressions can
//! read module globals, `INSTANCES` and the current mod's assets; nothing
//! else is reachable.

use std::collections::{BTreeMap, HashMap};

use crate::builder::{BlockShape, Kind, Mesh, Part, ShapeGrid};
use crate::context::ModContext;
use crate::error::{GenError, Result};
use crate::imaging::{Anim, ImageNode};

use super::expr::{Assign, BinOp, Expr, SExpr};
use super::span::Span;
use super::value::Value;

/// Callable builtins.
pub const BUILTINS: &[&str] = &[
    "load", "font", "blank", "anim", "names", "range", "solid", "floor", "empty", "ramp_n",
    "ramp_s", "ramp_e", "ramp_w", "ramp_top", "shape_grid", "cuboid", "quad", "part",
];

const IMAGE_METHODS: &[&str] = &[
    "extract", "chop", "scale", "pad", "stack", "with_unit", "autocrop", "flip",
];

const ANIM_METHODS: &[&str] = &["extract", "scale", "pad", "with_unit", "flip", "flatten"];

/// An evaluation error and where it happened.
#[derive(Debug)]
pub struct Located {
    pub error: GenError,
    pub span: Span,
}

pub type EvalResult<T> = std::result::Result<T, Located>;

pub(super) trait At<T> {
    fn at(self, span: Span) -> EvalResult<T>;
}

impl<T> At<T> for Result<T> {
    fn at(self, span: Span) -> EvalResult<T> {
        self.map_err(|error| Located { error, span })
    }
}

pub type Globals = HashMap<String, Value>;

pub struct Interpreter<'a, 'm> {
    ctx: &'a mut ModContext<'m>,
    globals: &'a Globals,
}

impl<'a, 'm> Interpreter<'a, 'm> {
    pub fn new(ctx: &'a mut ModContext<'m>, globals: &'a Globals) -> Self {
        Self { ctx, globals }
    }

    pub fn eval(&mut self, expr: &SExpr) -> EvalResult<Value> {
        let span = expr.span;
        match &expr.value {
            Expr::None => Ok(Value::None),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Name(name) => self.lookup(name).at(span),
            Expr::Attr(object, attr) => {
                let object = self.eval(object)?;
                self.attribute(object, attr).at(span)
            }
            Expr::Index(object, index) => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                self.index(object, index).at(span)
            }
            Expr::Call {
                callee,
                args,
                kwargs,
            } => {
                let mut evaluated = Args::new(String::new());
                for arg in args {
                    evaluated.pos.push(Some(self.eval(arg)?));
                }
                for (name, arg) in kwargs {
                    let value = self.eval(arg)?;
                    evaluated.kw.insert(name.clone(), value);
                }
                match &callee.value {
                    Expr::Name(name) if !self.globals.contains_key(name) => {
                        evaluated.func = name.clone();
                        self.call_builtin(name, evaluated).at(span)
                    }
                    Expr::Attr(object, method) => {
                        let object = self.eval(object)?;
                        evaluated.func = method.clone();
                        self.call_method(object, method, evaluated).at(span)
                    }
                    _ => {
                        let value = self.eval(callee)?;
                        Err(GenError::eval(format!("{} is not callable", value.type_name())))
                            .at(span)
                    }
                }
            }
            Expr::List(items) => Ok(Value::List(self.eval_all(items)?)),
            Expr::Tuple(items) => Ok(Value::Tuple(self.eval_all(items)?)),
            Expr::Dict(pairs) => {
                let mut map = BTreeMap::new();
                for (key, value) in pairs {
                    let k = self.eval(key)?;
                    let k = k.as_str().at(key.span)?.to_string();
                    map.insert(k, self.eval(value)?);
                }
                Ok(Value::Dict(map))
            }
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, lhs, rhs).at(span)
            }
            Expr::Neg(inner) => match self.eval(inner)? {
                Value::Int(n) => Ok(Value::Int(-n)),
                other => Err(GenError::eval(format!("cannot negate {}", other.type_name()))).at(span),
            },
        }
    }

    fn eval_all(&mut self, items: &[SExpr]) -> EvalResult<Vec<Value>> {
        items.iter().map(|e| self.eval(e)).collect()
    }

    fn lookup(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.globals.get(name) {
            return Ok(value.clone());
        }
        match name {
            "INSTANCES" => Ok(Value::Instances),
            _ if BUILTINS.contains(&name) => {
                Err(GenError::eval(format!("builtin '{}' must be called", name)))
            }
            _ => Err(GenError::eval(format!("name '{}' is not defined", name))),
        }
    }

    fn proto(&mut self, kind: Kind, name: &str) -> Result<Value> {
        if self.ctx.builders().contains(kind, name) {
            Ok(Value::Proto(kind, name.to_string()))
        } else {
            Err(GenError::UnresolvedReference {
                context: "INSTANCES".to_string(),
                kind: kind.name(),
                name: name.to_string(),
            })
        }
    }

    fn attribute(&mut self, object: Value, attr: &str) -> Result<Value> {
        match (&object, attr) {
            (Value::Instances, kind) => Kind::from_name(kind)
                .filter(|k| *k != Kind::LootTable)
                .map(Value::Builder)
                .ok_or_else(|| GenError::eval(format!("INSTANCES has no kind '{}'", kind))),
            (Value::Builder(kind), name) => self.proto(*kind, name),
            (Value::Image(img), "width") => Ok(Value::Int(img.width().into())),
            (Value::Image(img), "height") => Ok(Value::Int(img.height().into())),
            (Value::Image(img), "size") => Ok(img.size().into()),
            (Value::Image(img), "unit") => Ok(img.unit().into()),
            (Value::Anim(anim), "frames") => {
                Ok(Value::List(anim.frames().iter().cloned().map(Value::Image).collect()))
            }
            (Value::Anim(anim), "size") => Ok(anim.frame_size().into()),
            (Value::Anim(anim), "rate") => Ok(Value::Int(anim.rate.into())),
            (Value::Anim(anim), "oneshot") => Ok(Value::Bool(anim.oneshot)),
            (Value::Part(part), "mesh") => Ok(Value::Mesh(part.mesh.clone())),
            _ => Err(GenError::eval(format!(
                "{} has no attribute '{}'",
                object.type_name(),
                attr
            ))),
        }
    }

    fn index(&mut self, object: Value, index: Value) -> Result<Value> {
        match (object, index) {
            (Value::List(items) | Value::Tuple(items), Value::Int(i)) => {
                let len = items.len() as i64;
                let at = if i < 0 { len + i } else { i };
                usize::try_from(at)
                    .ok()
                    .and_then(|at| items.into_iter().nth(at))
                    .ok_or_else(|| GenError::eval(format!("index {} out of range for length {}", i, len)))
            }
            (Value::Dict(mut map), Value::Str(key)) => map
                .remove(&key)
                .ok_or_else(|| GenError::eval(format!("no key '{}'", key))),
            (Value::Builder(kind), Value::Str(name)) => self.proto(kind, &name),
            (object, index) => Err(GenError::eval(format!(
                "cannot index {} with {}",
                object.type_name(),
                index.type_name()
            ))),
        }
    }

    fn call_builtin(&mut self, name: &str, mut args: Args) -> Result<Value> {
        let value = match name {
            "load" => {
                let path = args.required(0, "path")?;
                Value::Image(self.ctx.load(path.as_str()?)?)
            }
            "font" => {
                let path = args.required(0, "path")?;
                Value::Image(self.ctx.load_font(path.as_str()?)?)
            }
            "blank" => {
                let w = args.required(0, "width")?.as_u32()?;
                let h = args.required(1, "height")?.as_u32()?;
                Value::Image(ImageNode::blank(w, h))
            }
            "anim" => self.anim(&mut args)?,
            "names" => {
                let text = args.required(0, "text")?;
                Value::List(
                    text.as_str()?
                        .split(|c: char| c.is_whitespace() || c == ',')
                        .filter(|s| !s.is_empty())
                        .map(Value::from)
                        .collect(),
                )
            }
            "range" => {
                let first = args.required(0, "start")?.as_int()?;
                let (start, end) = match args.optional(1, "end") {
                    Some(end) => (first, end.as_int()?),
                    None => (0, first),
                };
                Value::List((start..end).map(Value::Int).collect())
            }
            "shape_grid" => {
                let size = args.required(0, "size")?.as_triple()?;
                let size = (to_u32(size.0)?, to_u32(size.1)?, to_u32(size.2)?);
                let cells = args
                    .required(1, "cells")?
                    .into_seq()?
                    .iter()
                    .map(|c| shape_named(c.as_str()?))
                    .collect::<Result<Vec<_>>>()?;
                Value::Shape(ShapeGrid::from_cells(size, cells)?)
            }
            "cuboid" => {
                let sx = to_i32(args.required(0, "x")?.as_int()?)?;
                let sy = to_i32(args.required(1, "y")?.as_int()?)?;
                let sz = to_i32(args.required(2, "z")?.as_int()?)?;
                let mesh = Mesh::cuboid(sx, sy, sz);
                Value::Mesh(match args.optional(3, "at") {
                    Some(at) => mesh.translate(at.as_vertex()?),
                    None => mesh,
                })
            }
            "quad" => {
                let a = args.required(0, "a")?.as_vertex()?;
                let b = args.required(1, "b")?.as_vertex()?;
                let c = args.required(2, "c")?.as_vertex()?;
                let d = args.required(3, "d")?.as_vertex()?;
                Value::Mesh(Mesh::quad(a, b, c, d))
            }
            "part" => {
                let mesh = args.required(0, "mesh")?.as_mesh()?.clone();
                let visual = args.required(1, "image")?.as_visual()?;
                Value::Part(match args.optional(2, "base") {
                    Some(base) => Part::with_base(mesh, visual, base.as_offset()?),
                    None => Part::new(mesh, visual),
                })
            }
            shape if BlockShape::from_name(shape).is_some() => {
                let x = args.optional(0, "x").map_or(Ok(1), |v| v.as_u32())?;
                let y = args.optional(1, "y").map_or(Ok(1), |v| v.as_u32())?;
                let z = args.optional(2, "z").map_or(Ok(1), |v| v.as_u32())?;
                Value::Shape(ShapeGrid::filled(shape_named(shape)?, (x, y, z)))
            }
            _ => {
                return Err(GenError::eval(format!(
                    "unknown function '{}'. Available: {}",
                    name,
                    BUILTINS.join(", ")
                )))
            }
        };
        args.finish()?;
        Ok(value)
    }

    /// `anim(frames, rate, oneshot=False)` or
    /// `anim(strip, count, rate, oneshot=False)`.
    fn anim(&mut self, args: &mut Args) -> Result<Value> {
        let first = args.required(0, "frames")?;
        let anim = match first {
            Value::Image(strip) => {
                let count = args.required(1, "count")?.as_u32()?;
                let rate = args.required(2, "rate")?.as_u32()?;
                let oneshot = args.optional(3, "oneshot").is_some_and(|v| v.truthy());
                Anim::from_strip(&strip, count, rate, oneshot)?
            }
            frames => {
                let frames = frames
                    .into_seq()?
                    .iter()
                    .map(|f| f.as_image().cloned())
                    .collect::<Result<Vec<_>>>()?;
                let rate = args.required(1, "rate")?.as_u32()?;
                let oneshot = args.optional(2, "oneshot").is_some_and(|v| v.truthy());
                Anim::new(frames, rate, oneshot)?
            }
        };
        Ok(Value::Anim(anim))
    }

    fn call_method(&mut self, object: Value, method: &str, mut args: Args) -> Result<Value> {
        let value = match object {
            Value::Image(img) => self.image_method(&img, method, &mut args)?,
            Value::Anim(anim) => match method {
                "flatten" => Value::Image(anim.flatten()?),
                m if ANIM_METHODS.contains(&m) => {
                    let op = FrameOp::parse(m, &mut args)?;
                    Value::Anim(anim.map(|frame| op.apply(frame))?)
                }
                _ => return Err(no_method("anim", method, ANIM_METHODS)),
            },
            Value::Mesh(mesh) => match method {
                "translate" => {
                    let x = to_i32(args.required(0, "x")?.as_int()?)?;
                    let y = to_i32(args.required(1, "y")?.as_int()?)?;
                    let z = to_i32(args.required(2, "z")?.as_int()?)?;
                    Value::Mesh(mesh.translate([x, y, z]))
                }
                _ => return Err(no_method("mesh", method, &["translate"])),
            },
            Value::Builder(kind) => match method {
                "names" => Value::List(
                    self.ctx
                        .builders()
                        .names(kind)
                        .into_iter()
                        .map(Value::Str)
                        .collect(),
                ),
                "get" => {
                    let name = args.required(0, "name")?;
                    self.proto(kind, name.as_str()?)?
                }
                _ => return Err(no_method("builder", method, &["names", "get"])),
            },
            other => {
                return Err(GenError::eval(format!(
                    "{} has no method '{}'",
                    other.type_name(),
                    method
                )))
            }
        };
        args.finish()?;
        Ok(value)
    }

    fn image_method(&mut self, img: &ImageNode, method: &str, args: &mut Args) -> Result<Value> {
        Ok(match method {
            "chop" => {
                let positions = match args.required(0, "positions")? {
                    Value::Dict(map) => map
                        .iter()
                        .map(|(k, v)| Ok((k.clone(), v.as_pair()?)))
                        .collect::<Result<BTreeMap<_, _>>>()?,
                    other => return Err(GenError::eval(format!("chop expects a dict, got {}", other.type_name()))),
                };
                let unit = unit_arg(args.optional(1, "unit"))?;
                Value::Dict(
                    img.chop(&positions, unit)?
                        .into_iter()
                        .map(|(k, v)| (k, Value::Image(v)))
                        .collect(),
                )
            }
            "stack" => {
                let mut layers = vec![img.clone()];
                for layer in args.rest(0) {
                    layers.push(layer.as_image()?.clone());
                }
                Value::Image(ImageNode::stack(&layers)?)
            }
            "autocrop" => {
                let (cropped, origin) = img.autocrop(self.ctx.image_cache())?;
                Value::Tuple(vec![Value::Image(cropped), origin.into()])
            }
            m if IMAGE_METHODS.contains(&m) => {
                let op = FrameOp::parse(m, args)?;
                Value::Image(op.apply(img)?)
            }
            _ => return Err(no_method("image", method, IMAGE_METHODS)),
        })
    }
}

/// Execute a `%%%` block into `globals`. Each failing statement is
/// returned; later statements still run.
pub fn exec_block(ctx: &mut ModContext<'_>, globals: &mut Globals, stmts: &[Assign]) -> Vec<Located> {
    let mut errors = Vec::new();
    for stmt in stmts {
        let result = Interpreter::new(ctx, globals).eval(&stmt.value);
        match result {
            Ok(value) => {
                globals.insert(stmt.target.value.clone(), value);
            }
            Err(err) => errors.push(err),
        }
    }
    errors
}

/// Per-frame image operation shared by images and anims.
enum FrameOp {
    Extract((u32, u32), (u32, u32), Option<(u32, u32)>),
    Scale((u32, u32), Option<(u32, u32)>, bool),
    Pad((u32, u32), Option<(u32, u32)>, Option<(u32, u32)>),
    WithUnit((u32, u32)),
    Flip,
}

impl FrameOp {
    fn parse(method: &str, args: &mut Args) -> Result<FrameOp> {
        Ok(match method {
            "extract" => FrameOp::Extract(
                args.required(0, "pos")?.as_pair()?,
                args.required(1, "size")?.as_pair()?,
                unit_arg(args.optional(2, "unit"))?,
            ),
            "scale" => FrameOp::Scale(
                args.required(0, "size")?.as_pair()?,
                unit_arg(args.optional(1, "unit"))?,
                args.optional(2, "smooth").is_some_and(|v| v.truthy()),
            ),
            "pad" => FrameOp::Pad(
                args.required(0, "size")?.as_pair()?,
                args.optional(1, "offset").map(|v| v.as_pair()).transpose()?,
                unit_arg(args.optional(2, "unit"))?,
            ),
            "with_unit" => FrameOp::WithUnit(unit_arg(Some(args.required(0, "unit")?))?.unwrap_or((1, 1))),
            _ => FrameOp::Flip,
        })
    }

    fn apply(&self, img: &ImageNode) -> Result<ImageNode> {
        match *self {
            FrameOp::Extract(pos, size, unit) => img.extract(pos, size, unit),
            FrameOp::Scale(size, unit, smooth) => img.scale(size, unit, smooth),
            FrameOp::Pad(size, offset, unit) => img.pad(size, offset, unit),
            FrameOp::WithUnit(unit) => img.with_unit(unit),
            FrameOp::Flip => Ok(img.flip()),
        }
    }
}

/// Call arguments, consumed by position or keyword.
struct Args {
    func: String,
    pos: Vec<Option<Value>>,
    kw: BTreeMap<String, Value>,
    used: usize,
}

impl Args {
    fn new(func: String) -> Self {
        Self {
            func,
            pos: Vec::new(),
            kw: BTreeMap::new(),
            used: 0,
        }
    }

    fn take(&mut self, index: usize, name: &str) -> Option<Value> {
        self.used = self.used.max(index + 1);
        if let Some(value) = self.kw.remove(name) {
            return Some(value);
        }
        self.pos.get_mut(index).and_then(Option::take)
    }

    fn required(&mut self, index: usize, name: &str) -> Result<Value> {
        self.take(index, name).ok_or_else(|| {
            GenError::eval(format!("{}() missing argument '{}'", self.func, name))
        })
    }

    /// Absent and `None` both count as not given.
    fn optional(&mut self, index: usize, name: &str) -> Option<Value> {
        self.take(index, name).filter(|v| !v.is_none())
    }

    fn rest(&mut self, from: usize) -> Vec<Value> {
        self.used = self.used.max(self.pos.len());
        self.pos.iter_mut().skip(from).filter_map(Option::take).collect()
    }

    fn finish(self) -> Result<()> {
        if self.pos.len() > self.used {
            return Err(GenError::eval(format!(
                "{}() takes at most {} arguments, got {}",
                self.func,
                self.used,
                self.pos.len()
            )));
        }
        if let Some(name) = self.kw.keys().next() {
            return Err(GenError::eval(format!(
                "{}() got an unexpected keyword argument '{}'",
                self.func, name
            )));
        }
        Ok(())
    }
}

fn binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value> {
    let overflow = || GenError::eval("integer overflow");
    match (op, lhs, rhs) {
        (BinOp::Add, Value::Int(a), Value::Int(b)) => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
        (BinOp::Sub, Value::Int(a), Value::Int(b)) => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
        (BinOp::Mul, Value::Int(a), Value::Int(b)) => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
        (BinOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
        (BinOp::Add, Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (BinOp::Add, Value::Tuple(mut a), Value::Tuple(b)) => {
            a.extend(b);
            Ok(Value::Tuple(a))
        }
        (BinOp::Add, Value::Mesh(mut a), Value::Mesh(b)) => {
            a.extend(&b);
            Ok(Value::Mesh(a))
        }
        (op, lhs, rhs) => Err(GenError::eval(format!(
            "unsupported operands for {}: {} and {}",
            op.symbol(),
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn unit_arg(value: Option<Value>) -> Result<Option<(u32, u32)>> {
    match value {
        None => Ok(None),
        Some(Value::Int(n)) => {
            let n = to_u32(n)?;
            Ok(Some((n, n)))
        }
        Some(other) => other.as_pair().map(Some),
    }
}

fn shape_named(name: &str) -> Result<BlockShape> {
    BlockShape::from_name(name).ok_or_else(|| GenError::eval(format!("unknown block shape '{}'", name)))
}

fn no_method(type_name: &str, method: &str, available: &[&str]) -> GenError {
    GenError::eval(format!(
        "{} has no method '{}'. Available: {}",
        type_name,
        method,
        available.join(", ")
    ))
}

fn to_u32(n: i64) -> Result<u32> {
    u32::try_from(n).map_err(|_| GenError::eval(format!("{} is out of range", n)))
}

fn to_i32(n: i64) -> Result<i32> {
    i32::try_from(n).map_err(|_| GenError::eval(format!("{} is out of range", n)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PipelineContext;
    use crate::diagnostics::Diagnostics;
    use crate::dsl::expr::{parse_block, parse_expr};
    use crate::dsl::span::Location;
    use crate::imaging::ImageCache;
    use crate::mods::ModRegistry;
    use image::{Rgba, RgbaImage};
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn fixture() -> (TempDir, PipelineContext) {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/assets")).unwrap();
        let mut sheet = RgbaImage::new(64, 32);
        sheet.put_pixel(40, 10, Rgba([255, 0, 0, 255]));
        sheet.save(dir.path().join("src/assets/sheet.png")).unwrap();
        let mods =
            ModRegistry::from_names(dir.path(), &["outpost".to_string()], &mut Diagnostics::new())
                .unwrap();
        (dir, PipelineContext::new(mods, ImageCache::new()))
    }

    fn eval(ctx: &mut PipelineContext, globals: &Globals, src: &str) -> EvalResult<Value> {
        let expr = parse_expr("t.od", src, Location::default()).unwrap();
        let mut mod_ctx = ctx.for_mod("outpost");
        Interpreter::new(&mut mod_ctx, globals).eval(&expr)
    }

    #[test]
    fn test_arithmetic_and_collections() {
        let (_dir, mut ctx) = fixture();
        let g = Globals::new();
        assert_eq!(eval(&mut ctx, &g, "2 * (3 + 4) - 1").unwrap(), Value::Int(13));
        assert_eq!(eval(&mut ctx, &g, "[1, 2][-1]").unwrap(), Value::Int(2));
        assert_eq!(
            eval(&mut ctx, &g, "names(\"iron copper, gold\")").unwrap(),
            Value::List(vec!["iron".into(), "copper".into(), "gold".into()])
        );
        assert_eq!(
            eval(&mut ctx, &g, "range(1, 3)").unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_image_methods() {
        let (_dir, mut ctx) = fixture();
        let g = Globals::new();
        let v = eval(&mut ctx, &g, "load(\"sheet.png\").with_unit(32).extract((1, 0), (1, 1)).size").unwrap();
        assert_eq!(v, Value::from((32, 32)));

        let v = eval(&mut ctx, &g, "load(\"sheet.png\").autocrop()").unwrap();
        let items = v.as_seq().unwrap();
        assert_eq!(items[0].as_image().unwrap().size(), (1, 1));
        assert_eq!(items[1], Value::from((40, 10)));

        let v = eval(&mut ctx, &g, "load(\"sheet.png\").chop({\"a\": (0, 0), \"b\": (1, 0)}, unit=32)").unwrap();
        assert!(matches!(v, Value::Dict(ref m) if m.len() == 2));
    }

    #[test]
    fn test_anim_from_strip_and_map() {
        let (_dir, mut ctx) = fixture();
        let g = Globals::new();
        let v = eval(&mut ctx, &g, "anim(load(\"sheet.png\"), 2, 8, oneshot=True).flip()").unwrap();
        let Value::Anim(anim) = v else {
            panic!("expected anim");
        };
        assert_eq!(anim.len(), 2);
        assert_eq!(anim.frame_size(), (32, 32));
        assert!(anim.oneshot);
    }

    #[test]
    fn test_globals_and_block() {
        let (_dir, mut ctx) = fixture();
        let (stmts, errors) = parse_block("t.od", "a = 2\nb = a * a\nc = nope\n", Location::default());
        assert!(errors.is_empty());
        let mut g = Globals::new();
        let failures = exec_block(&mut ctx.for_mod("outpost"), &mut g, &stmts);
        assert_eq!(g.get("b"), Some(&Value::Int(4)));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].span.start, Location::new(3, 5));
    }

    #[test]
    fn test_instances_lookup() {
        let (_dir, mut ctx) = fixture();
        ctx.builders.structure.root().add("anvil").unwrap();
        let g = Globals::new();
        assert_eq!(
            eval(&mut ctx, &g, "INSTANCES.structure.anvil").unwrap(),
            Value::Proto(Kind::Structure, "anvil".into())
        );
        let err = eval(&mut ctx, &g, "INSTANCES.structure[\"ghost\"]").unwrap_err();
        assert_eq!(err.error.code(), "unresolved-reference");
        assert_eq!(
            eval(&mut ctx, &g, "INSTANCES.structure.names()").unwrap(),
            Value::List(vec!["anvil".into()])
        );
    }

    #[test]
    fn test_unknown_function_lists_builtins() {
        let (_dir, mut ctx) = fixture();
        let err = eval(&mut ctx, &Globals::new(), "open(\"x\")").unwrap_err();
        let msg = err.error.to_string();
        assert!(msg.contains("unknown function 'open'"));
        assert!(msg.contains("load"));
    }

    #[test]
    fn test_argument_checking() {
        let (_dir, mut ctx) = fixture();
        let g = Globals::new();
        let err = eval(&mut ctx, &g, "blank(1, 2, 3)").unwrap_err();
        assert!(err.error.to_string().contains("at most 2"));
        let err = eval(&mut ctx, &g, "blank(1, 2, color=3)").unwrap_err();
        assert!(err.error.to_string().contains("unexpected keyword"));
        let err = eval(&mut ctx, &g, "blank(1)").unwrap_err();
        assert!(err.error.to_string().contains("missing argument 'height'"));
    }

    #[test]
    fn test_shapes_and_parts() {
        let (_dir, mut ctx) = fixture();
        let g = Globals::new();
        let v = eval(&mut ctx, &g, "solid(2, 1, 1)").unwrap();
        assert_eq!(v, Value::Shape(ShapeGrid::filled(BlockShape::Solid, (2, 1, 1))));
        let v = eval(&mut ctx, &g, "part(cuboid(32, 32, 32, at=(0, 0, 32)), blank(32, 64))").unwrap();
        assert_eq!(v.as_part().unwrap().base, (0, -64));
    }

    #[test]
    fn test_missing_asset_is_located() {
        let (_dir, mut ctx) = fixture();
        let err = eval(&mut ctx, &Globals::new(), "[1, load(\"nope.png\")]").unwrap_err();
        assert_eq!(err.error.code(), "asset-not-found");
        assert_eq!(err.span.start, Location::new(1, 5));
    }
}
