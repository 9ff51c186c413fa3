//! Section scripts (`.od`).
//!
//! ```text
//! script  := { blank | section | %%%-block }
//! section := '[' TYPE NAME ']' NEWLINE { field | blank }
//! field   := WORD ':' ( value | '`' host-expr '`' ) NEWLINE
//! ```
//!
//! Parsing also performs the static checks: unknown section types and
//! unknown fields abandon the section, malformed values drop the field.
//! Everything is reported to the diagnostics and parsing carries on.

use crate::builder::Kind;
use crate::diagnostics::Diagnostics;
use crate::error::GenError;

use super::expr::{parse_block, parse_expr, Assign, SExpr};
use super::fields::{lookup, section_kind, FieldSpec};
use super::lexer::{Lexer, Mode, Token, TokenKind};
use super::span::{source_location, Location, Span, Spanned};

#[derive(Debug)]
pub struct Script {
    pub file: String,
    pub items: Vec<ScriptItem>,
}

#[derive(Debug)]
pub enum ScriptItem {
    Section(Section),
    Block(Vec<Assign>),
}

#[derive(Debug)]
pub struct Section {
    pub kind: Kind,
    pub name: Spanned<String>,
    pub fields: Vec<FieldStmt>,
}

#[derive(Debug)]
pub struct FieldStmt {
    pub spec: FieldSpec,
    /// Span of the field name.
    pub span: Span,
    pub value: SExpr,
}

impl FieldStmt {
    pub fn is_init(&self) -> bool {
        self.spec.kind.is_init()
    }
}

/// Parse a section script, reporting every problem found.
pub fn parse_script(file: &str, source: &str, diagnostics: &mut Diagnostics) -> Script {
    let (tokens, errors) = Lexer::tokenize(file, source, Mode::Script);
    for err in &errors {
        diagnostics.report(err);
    }
    let mut parser = ScriptParser {
        file,
        tokens,
        pos: 0,
        diagnostics,
        items: Vec::new(),
        current: None,
        skipping: false,
    };
    parser.run();
    Script {
        file: file.to_string(),
        items: parser.items,
    }
}

struct ScriptParser<'a> {
    file: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: &'a mut Diagnostics,
    items: Vec<ScriptItem>,
    current: Option<Section>,
    /// Inside an abandoned section: ignore fields until the next header.
    skipping: bool,
}

impl ScriptParser<'_> {
    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        self.pos = (self.pos + 1).min(self.tokens.len());
        token
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn skip_line(&mut self) {
        while !self.at_line_end() {
            self.advance();
        }
    }

    fn parse_error(&mut self, expected: &str) {
        let token = self.peek().clone();
        self.diagnostics.report(&GenError::Parse {
            file: self.file.to_string(),
            line: token.span.start.line,
            column: token.span.start.column,
            expected: expected.to_string(),
            saw: token.kind.to_string(),
        });
        self.skip_line();
    }

    fn report_at(&mut self, at: Location, err: &GenError) {
        self.diagnostics.report_at(source_location(self.file, at), err);
    }

    fn finish_section(&mut self) {
        if let Some(section) = self.current.take() {
            self.items.push(ScriptItem::Section(section));
        }
    }

    fn run(&mut self) {
        loop {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Newline => {
                    self.advance();
                }
                TokenKind::HostBlock(source) => {
                    self.advance();
                    self.finish_section();
                    self.skipping = false;
                    let (stmts, errors) = parse_block(self.file, &source, token.span.start);
                    for err in &errors {
                        self.diagnostics.report(err);
                    }
                    self.items.push(ScriptItem::Block(stmts));
                }
                TokenKind::LBracket => {
                    self.finish_section();
                    self.header();
                }
                TokenKind::Word(_) if self.skipping => self.skip_line(),
                TokenKind::Word(_) if self.current.is_none() => {
                    self.parse_error("a section header");
                }
                TokenKind::Word(name) => {
                    self.advance();
                    self.field(Spanned::new(name, token.span));
                }
                _ => self.parse_error("a section header or field"),
            }
        }
        self.finish_section();
    }

    fn word(&mut self, expected: &str) -> Option<Spanned<String>> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Word(w) => {
                self.advance();
                Some(Spanned::new(w, token.span))
            }
            _ => {
                self.parse_error(expected);
                None
            }
        }
    }

    fn header(&mut self) {
        self.advance();
        self.skipping = true;
        let Some(kind_name) = self.word("a section type") else {
            return;
        };
        let Some(name) = self.word("a section name") else {
            return;
        };
        if self.peek().kind != TokenKind::RBracket {
            self.parse_error("']'");
            return;
        }
        self.advance();
        if !self.at_line_end() {
            self.parse_error("end of line");
            return;
        }
        let Some(kind) = section_kind(&kind_name.value) else {
            self.report_at(
                kind_name.span.start,
                &GenError::UnknownSectionType {
                    kind: kind_name.value,
                },
            );
            return;
        };
        self.skipping = false;
        self.current = Some(Section {
            kind,
            name,
            fields: Vec::new(),
        });
    }

    fn field(&mut self, name: Spanned<String>) {
        if self.peek().kind != TokenKind::Colon {
            self.parse_error("':'");
            return;
        }
        self.advance();
        let mut value = Vec::new();
        while !self.at_line_end() {
            value.push(self.advance());
        }
        let end = self.peek().span;

        let Some(kind) = self.current.as_ref().map(|s| s.kind) else {
            return;
        };
        let Some(spec) = lookup(kind, &name.value) else {
            self.report_at(
                name.span.start,
                &GenError::UnknownField {
                    kind: kind.name().to_string(),
                    field: name.value,
                },
            );
            self.current = None;
            self.skipping = true;
            return;
        };

        let parsed = match value.as_slice() {
            [Token {
                kind: TokenKind::Host(source),
                span,
            }] => parse_expr(self.file, source, span.start),
            _ => spec.kind.parse(self.file, &value, end),
        };
        match parsed {
            Ok(expr) => {
                if let Some(section) = self.current.as_mut() {
                    section.fields.push(FieldStmt {
                        spec,
                        span: name.span,
                        value: expr,
                    });
                }
            }
            Err(err) => self.diagnostics.report(&err),
        }
    }
}

/// Whether a section builds its scope from an init-only field.
pub fn init_field(section: &Section) -> Option<&FieldStmt> {
    section.fields.first().filter(|f| f.is_init())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::expr::Expr;
    use crate::dsl::fields::FieldKind;

    fn parse(src: &str) -> (Script, Diagnostics) {
        let mut diags = Diagnostics::new();
        let script = parse_script("t.od", src, &mut diags);
        (script, diags)
    }

    fn sections(script: &Script) -> Vec<&Section> {
        script
            .items
            .iter()
            .filter_map(|i| match i {
                ScriptItem::Section(s) => Some(s),
                ScriptItem::Block(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_sections_and_fields() {
        let src = "\
[block grass]
shape: floor
bottom: \"tiles/grass.png\"

[structure anvil]
shape: solid (1, 1, 1)
image: `load(\"anvil.png\").flip()`
";
        let (script, diags) = parse(src);
        assert!(diags.is_empty(), "{:?}", diags.iter().collect::<Vec<_>>());
        let secs = sections(&script);
        assert_eq!(secs.len(), 2);
        assert_eq!(secs[0].kind, Kind::Block);
        assert_eq!(secs[0].name.value, "grass");
        assert_eq!(secs[0].fields.len(), 2);
        assert_eq!(secs[1].fields[1].spec.name, "image");
        assert!(matches!(secs[1].fields[1].value.value, Expr::Call { .. }));
        // backtick spans are in script coordinates
        assert_eq!(secs[1].fields[1].value.span.start, Location::new(7, 9));
    }

    #[test]
    fn test_unknown_type_and_field_abandon_section() {
        let src = "\
[tile grass]
shape: floor
[block dirt]
colour: brown
shape: solid
[block stone]
shape: solid
";
        let (script, diags) = parse(src);
        assert!(diags.has_code("unknown-section-type"));
        assert!(diags.has_code("unknown-field"));
        assert_eq!(diags.error_count(), 2);
        let secs = sections(&script);
        assert_eq!(secs.len(), 1);
        assert_eq!(secs[0].name.value, "stone");
    }

    #[test]
    fn test_parse_error_drops_field_only() {
        let src = "[block grass]\nshape: floor floor\nbottom: \"g.png\"\n";
        let (script, diags) = parse(src);
        assert_eq!(diags.error_count(), 1);
        assert!(diags.has_code("parse"));
        let secs = sections(&script);
        assert_eq!(secs[0].fields.len(), 1);
        assert_eq!(secs[0].fields[0].spec.name, "bottom");
    }

    #[test]
    fn test_field_outside_section() {
        let (script, diags) = parse("shape: floor\n");
        assert!(diags.has_code("parse"));
        assert!(script.items.is_empty());
    }

    #[test]
    fn test_blocks_interleave() {
        let src = "%%%\nn = 2\n%%%\n[item axe]\nicon: `tools[\"axe\"]`\n";
        let (script, diags) = parse(src);
        assert!(diags.is_empty());
        assert!(matches!(script.items[0], ScriptItem::Block(ref s) if s.len() == 1));
        assert!(matches!(script.items[1], ScriptItem::Section(_)));
    }

    #[test]
    fn test_init_field() {
        let (script, _) = parse("[item anvil]\nfrom_structure: anvil\ndisplay_name: \"Anvil\"\n");
        let secs = sections(&script);
        assert_eq!(init_field(secs[0]).map(|f| f.spec.name), Some("from_structure"));
        assert_eq!(secs[0].fields[0].spec.kind, FieldKind::From(Kind::Structure));
    }
}
