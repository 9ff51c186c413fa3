//! Section fields: what each `(section type, field)` accepts and how it is
//! applied to the builder scope.
//!
//! A field value is parsed into a host expression (an image path becomes a
//! `load(path)` call, a shape becomes a shape-constructor call and so on),
//! evaluated like any backtick expression, and the resulting value handed
//! to [`apply`].

use crate::builder::{BlockShape, Builders, Kind, ScopeId};
use crate::error::{GenError, Result};

use super::expr::{Expr, SExpr};
use super::lexer::{Token, TokenKind};
use super::span::{Span, Spanned};
use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A bare word.
    Name,
    /// A quoted string.
    Str,
    Int,
    /// A quoted asset path, loaded as an image.
    Image,
    /// `COUNT NAME`.
    ItemCount,
    /// `solid|floor|empty|ramp_* [(X, Y, Z)]`.
    Shape,
    /// One of the block shape names.
    BlockShape,
    /// Parenthesised list of this many integers.
    IntTuple(usize),
    /// `NAME LENGTH RATE [oneshot]`.
    AnimSlot,
    /// `NAME SOURCE`.
    Mirror,
    /// `NAME [SPRITE]`.
    Variant,
    /// A kind name such as `item`.
    KindName,
    /// Backtick expression only.
    Expr,
    /// Init-only: backtick expression giving the names to declare.
    MultiName,
    /// Init-only: derive from a prototype of the given kind.
    From(Kind),
}

impl FieldKind {
    /// Init-only fields construct the section's scope and must come first.
    pub fn is_init(self) -> bool {
        matches!(self, FieldKind::MultiName | FieldKind::From(_))
    }

    fn expects(self) -> &'static str {
        match self {
            FieldKind::Name => "a name",
            FieldKind::Str => "a quoted string",
            FieldKind::Int => "an integer",
            FieldKind::Image => "a quoted image path",
            FieldKind::ItemCount => "COUNT NAME",
            FieldKind::Shape => "a shape such as solid (1, 1, 1)",
            FieldKind::BlockShape => "a block shape",
            FieldKind::IntTuple(_) => "a parenthesised integer tuple",
            FieldKind::AnimSlot => "NAME LENGTH RATE [oneshot]",
            FieldKind::Mirror => "NAME SOURCE",
            FieldKind::Variant => "NAME [SPRITE]",
            FieldKind::KindName => "a kind name",
            FieldKind::Expr | FieldKind::MultiName => "a backtick expression",
            FieldKind::From(_) => "a prototype name",
        }
    }

    /// Turn the literal tokens of a field value into an expression.
    /// `tokens` excludes the end of line.
    pub fn parse(self, file: &str, tokens: &[Token], end: Span) -> Result<SExpr> {
        let mut cursor = Cursor {
            file,
            tokens,
            pos: 0,
            end,
            expects: self.expects(),
        };
        let expr = self.parse_with(&mut cursor)?;
        cursor.finish()?;
        Ok(expr)
    }

    fn parse_with(self, c: &mut Cursor<'_>) -> Result<SExpr> {
        let start = c.span();
        Ok(match self {
            FieldKind::Name => c.word()?.map(Expr::Str),
            FieldKind::Str => c.string()?.map(Expr::Str),
            FieldKind::Int => c.int()?.map(Expr::Int),
            FieldKind::Image => {
                let path = c.string()?;
                let span = path.span;
                Expr::call("load", vec![path.map(Expr::Str)], span)
            }
            FieldKind::ItemCount => {
                let count = c.int()?;
                let name = c.word()?;
                tuple(vec![name.map(Expr::Str), count.map(Expr::Int)], start)
            }
            FieldKind::Shape => {
                let shape = c.word()?;
                if BlockShape::from_name(&shape.value).is_none() {
                    return Err(c.error_at(shape.span, &format!("'{}'", shape.value)));
                }
                let args = if c.at(&TokenKind::LParen) {
                    c.int_tuple(3)?
                } else {
                    Vec::new()
                };
                Expr::call(&shape.value, args, start.merge(c.span()))
            }
            FieldKind::BlockShape => {
                let shape = c.word()?;
                if BlockShape::from_name(&shape.value).is_none() {
                    return Err(c.error_at(shape.span, &format!("'{}'", shape.value)));
                }
                shape.map(Expr::Str)
            }
            FieldKind::IntTuple(n) => tuple(c.int_tuple(n)?, start),
            FieldKind::AnimSlot => {
                let name = c.word()?.map(Expr::Str);
                let length = c.int()?.map(Expr::Int);
                let rate = c.int()?.map(Expr::Int);
                let oneshot = match c.peek_word() {
                    Some("oneshot") => {
                        let w = c.word()?;
                        Spanned::new(Expr::Bool(true), w.span)
                    }
                    _ => Spanned::new(Expr::Bool(false), start),
                };
                tuple(vec![name, length, rate, oneshot], start)
            }
            FieldKind::Mirror => {
                let name = c.word()?.map(Expr::Str);
                let source = c.word()?.map(Expr::Str);
                tuple(vec![name, source], start)
            }
            FieldKind::Variant => {
                let name = c.word()?.map(Expr::Str);
                let sprite = if c.peek_word().is_some() {
                    c.word()?.map(Expr::Str)
                } else {
                    Spanned::new(Expr::None, start)
                };
                tuple(vec![name, sprite], start)
            }
            FieldKind::KindName => {
                let kind = c.word()?;
                if Kind::from_name(&kind.value).is_none() {
                    return Err(c.error_at(kind.span, &format!("'{}'", kind.value)));
                }
                kind.map(Expr::Str)
            }
            FieldKind::Expr | FieldKind::MultiName => return Err(c.error()),
            FieldKind::From(kind) => {
                let name = c.word()?.map(Expr::Str);
                if kind == Kind::Structure && c.at(&TokenKind::LParen) {
                    let offset = tuple(c.int_tuple(2)?, start);
                    tuple(vec![name, offset], start)
                } else {
                    name
                }
            }
        })
    }
}

fn tuple(items: Vec<SExpr>, start: Span) -> SExpr {
    let span = items.iter().fold(start, |acc, e| acc.merge(e.span));
    Spanned::new(Expr::Tuple(items), span)
}

struct Cursor<'a> {
    file: &'a str,
    tokens: &'a [Token],
    pos: usize,
    end: Span,
    expects: &'static str,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn span(&self) -> Span {
        self.peek().map_or(self.end, |t| t.span)
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek().is_some_and(|t| &t.kind == kind)
    }

    fn peek_word(&self) -> Option<&str> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Word(w)) => Some(w),
            _ => None,
        }
    }

    fn saw(&self) -> String {
        self.peek().map_or("end of line".to_string(), |t| t.kind.to_string())
    }

    fn error_at(&self, span: Span, saw: &str) -> GenError {
        GenError::Parse {
            file: self.file.to_string(),
            line: span.start.line,
            column: span.start.column,
            expected: self.expects.to_string(),
            saw: saw.to_string(),
        }
    }

    fn error(&self) -> GenError {
        self.error_at(self.span(), &self.saw())
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek().cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Span> {
        if self.at(&kind) {
            Ok(self.next().map_or(self.end, |t| t.span))
        } else {
            Err(self.error())
        }
    }

    fn word(&mut self) -> Result<Spanned<String>> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Word(w),
                span,
            }) => {
                let out = Spanned::new(w.clone(), *span);
                self.pos += 1;
                Ok(out)
            }
            _ => Err(self.error()),
        }
    }

    fn string(&mut self) -> Result<Spanned<String>> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Str(s),
                span,
            }) => {
                let out = Spanned::new(s.clone(), *span);
                self.pos += 1;
                Ok(out)
            }
            _ => Err(self.error()),
        }
    }

    fn int(&mut self) -> Result<Spanned<i64>> {
        let negative = self.at(&TokenKind::Minus);
        let start = self.span();
        if negative {
            self.pos += 1;
        }
        let word = self.word().map_err(|_| self.error())?;
        let n: i64 = word
            .value
            .parse()
            .map_err(|_| self.error_at(word.span, &format!("'{}'", word.value)))?;
        Ok(Spanned::new(if negative { -n } else { n }, start.merge(word.span)))
    }

    fn int_tuple(&mut self, n: usize) -> Result<Vec<SExpr>> {
        self.expect(TokenKind::LParen)?;
        let mut items = Vec::with_capacity(n);
        for i in 0..n {
            if i > 0 {
                self.expect(TokenKind::Comma)?;
            }
            items.push(self.int()?.map(Expr::Int));
        }
        self.expect(TokenKind::RParen)?;
        Ok(items)
    }

    fn finish(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(t) => Err(GenError::Parse {
                file: self.file.to_string(),
                line: t.span.start.line,
                column: t.span.start.column,
                expected: "end of line".to_string(),
                saw: t.kind.to_string(),
            }),
        }
    }
}

/// A field a section type accepts.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

const BLOCK_FIELDS: &[FieldSpec] = &[
    field("multi_name", FieldKind::MultiName),
    field("shape", FieldKind::BlockShape),
    field("front", FieldKind::Image),
    field("back", FieldKind::Image),
    field("top", FieldKind::Image),
    field("bottom", FieldKind::Image),
    field("light_color", FieldKind::IntTuple(3)),
    field("light_radius", FieldKind::Int),
];

const STRUCTURE_FIELDS: &[FieldSpec] = &[
    field("multi_name", FieldKind::MultiName),
    field("shape", FieldKind::Shape),
    field("layer", FieldKind::Int),
    field("image", FieldKind::Image),
    field("parts", FieldKind::Expr),
];

const ITEM_FIELDS: &[FieldSpec] = &[
    field("multi_name", FieldKind::MultiName),
    field("from_structure", FieldKind::From(Kind::Structure)),
    field("display_name", FieldKind::Str),
    field("icon", FieldKind::Image),
];

const RECIPE_FIELDS: &[FieldSpec] = &[
    field("multi_name", FieldKind::MultiName),
    field("from_item", FieldKind::From(Kind::Item)),
    field("display_name", FieldKind::Str),
    field("station", FieldKind::Name),
    field("input", FieldKind::ItemCount),
    field("output", FieldKind::ItemCount),
];

const ANIM_GROUP_FIELDS: &[FieldSpec] = &[
    field("frame_size", FieldKind::IntTuple(2)),
    field("sheet_px", FieldKind::Int),
    field("anim", FieldKind::AnimSlot),
    field("mirror", FieldKind::Mirror),
];

const SPRITE_FIELDS: &[FieldSpec] = &[
    field("multi_name", FieldKind::MultiName),
    field("group", FieldKind::Name),
    field("image", FieldKind::Image),
    field("images", FieldKind::Expr),
];

const ATTACH_SLOT_FIELDS: &[FieldSpec] = &[
    field("group", FieldKind::Name),
    field("variant", FieldKind::Variant),
];

const EXTRA_FIELDS: &[FieldSpec] = &[
    field("ids", FieldKind::KindName),
    field("value", FieldKind::Expr),
];

/// Fields of a section type. Loot tables have their own script format and
/// no section fields.
pub fn fields(kind: Kind) -> &'static [FieldSpec] {
    match kind {
        Kind::Block => BLOCK_FIELDS,
        Kind::Structure => STRUCTURE_FIELDS,
        Kind::Item => ITEM_FIELDS,
        Kind::Recipe => RECIPE_FIELDS,
        Kind::AnimGroup => ANIM_GROUP_FIELDS,
        Kind::Sprite => SPRITE_FIELDS,
        Kind::AttachSlot => ATTACH_SLOT_FIELDS,
        Kind::Extra => EXTRA_FIELDS,
        Kind::LootTable => &[],
    }
}

/// Section type named in a header.
pub fn section_kind(name: &str) -> Option<Kind> {
    Kind::from_name(name).filter(|k| *k != Kind::LootTable)
}

pub fn lookup(kind: Kind, name: &str) -> Option<FieldSpec> {
    fields(kind).iter().find(|f| f.name == name).copied()
}

/// Apply an evaluated, non-init field to every prototype in `scope`.
pub fn apply(builders: &mut Builders, kind: Kind, scope: ScopeId, field: &str, value: &Value) -> Result<()> {
    match kind {
        Kind::Block => {
            let mut s = builders.block.scope(scope);
            match field {
                "shape" => {
                    let name = value.as_str()?;
                    let shape = BlockShape::from_name(name)
                        .ok_or_else(|| GenError::eval(format!("unknown block shape '{}'", name)))?;
                    s.shape(shape);
                }
                "front" => {
                    s.front(value.as_image()?.clone());
                }
                "back" => {
                    s.back(value.as_image()?.clone());
                }
                "top" => {
                    s.top(value.as_image()?.clone());
                }
                "bottom" => {
                    s.bottom(value.as_image()?.clone());
                }
                "light_color" => {
                    let seq = value.as_seq()?;
                    let [r, g, b] = seq else {
                        return Err(GenError::eval("light_color needs three components"));
                    };
                    let color = (r.as_u8()?, g.as_u8()?, b.as_u8()?);
                    s.set(move |p| p.light_color = Some(color));
                }
                "light_radius" => {
                    let radius = value.as_u8()?;
                    s.set(move |p| p.light_radius = Some(radius));
                }
                _ => return Err(unknown(kind, field)),
            }
        }
        Kind::Structure => {
            let mut s = builders.structure.scope(scope);
            match field {
                "shape" => {
                    s.shape(value.as_shape()?.clone());
                }
                "layer" => {
                    s.layer(value.as_u8()?);
                }
                "image" => {
                    s.image(value.as_visual()?);
                }
                "parts" => {
                    let parts = value
                        .as_seq()?
                        .iter()
                        .map(|p| p.as_part().cloned())
                        .collect::<Result<Vec<_>>>()?;
                    s.parts(parts);
                }
                _ => return Err(unknown(kind, field)),
            }
        }
        Kind::Item => {
            let mut s = builders.item.scope(scope);
            match field {
                "display_name" => {
                    s.display_name(value.as_str()?);
                }
                "icon" => {
                    s.icon(value.as_image()?.clone());
                }
                _ => return Err(unknown(kind, field)),
            }
        }
        Kind::Recipe => {
            let mut s = builders.recipe.scope(scope);
            match field {
                "display_name" => {
                    s.display_name(value.as_str()?);
                }
                "station" => {
                    s.station(value.as_name()?);
                }
                "input" | "output" => {
                    let (name, count) = item_count(value)?;
                    if field == "input" {
                        s.input(name, count);
                    } else {
                        s.output(name, count);
                    }
                }
                _ => return Err(unknown(kind, field)),
            }
        }
        Kind::AnimGroup => {
            let mut s = builders.anim_group.scope(scope);
            match field {
                "frame_size" => {
                    let (w, h) = value.as_pair()?;
                    s.frame_size(w, h);
                }
                "sheet_px" => {
                    s.sheet_px(value.as_u32()?);
                }
                "anim" => {
                    let [name, length, rate, oneshot] = value.as_seq()? else {
                        return Err(GenError::eval("anim needs name, length, rate and oneshot"));
                    };
                    s.anim(name.as_str()?, length.as_u32()?, rate.as_u32()?, oneshot.truthy());
                }
                "mirror" => {
                    let [name, source] = value.as_seq()? else {
                        return Err(GenError::eval("mirror needs a name and a source"));
                    };
                    s.mirror(name.as_str()?, source.as_str()?);
                }
                _ => return Err(unknown(kind, field)),
            }
        }
        Kind::Sprite => {
            let mut s = builders.sprite.scope(scope);
            match field {
                "group" => {
                    s.group(value.as_name()?);
                }
                "image" => {
                    s.images(vec![value.as_image()?.clone()]);
                }
                "images" => {
                    let images = value
                        .as_seq()?
                        .iter()
                        .map(|v| v.as_image().cloned())
                        .collect::<Result<Vec<_>>>()?;
                    s.images(images);
                }
                _ => return Err(unknown(kind, field)),
            }
        }
        Kind::AttachSlot => {
            let mut s = builders.attach_slot.scope(scope);
            match field {
                "group" => {
                    s.group(value.as_name()?);
                }
                "variant" => {
                    let [name, sprite] = value.as_seq()? else {
                        return Err(GenError::eval("variant needs a name and an optional sprite"));
                    };
                    let sprite = if sprite.is_none() {
                        None
                    } else {
                        Some(sprite.as_name()?)
                    };
                    s.variant(name.as_str()?, sprite);
                }
                _ => return Err(unknown(kind, field)),
            }
        }
        Kind::Extra => {
            let mut s = builders.extra.scope(scope);
            match field {
                "ids" => {
                    let name = value.as_str()?;
                    let ids_of = Kind::from_name(name)
                        .ok_or_else(|| GenError::eval(format!("unknown kind '{}'", name)))?;
                    s.ids(ids_of);
                }
                "value" => {
                    s.value(value.to_json()?);
                }
                _ => return Err(unknown(kind, field)),
            }
        }
        Kind::LootTable => return Err(unknown(kind, field)),
    }
    Ok(())
}

fn item_count(value: &Value) -> Result<(&str, u32)> {
    match value.as_seq()? {
        [name, count] => Ok((name.as_name()?, count.as_u32()?)),
        _ => Err(GenError::eval("expected (name, count)")),
    }
}

fn unknown(kind: Kind, field: &str) -> GenError {
    GenError::UnknownField {
        kind: kind.name().to_string(),
        field: field.to_string(),
    }
}
