//! Loot scripts (`.loot`).
//!
//! ```text
//! header := '[' MODE '_' OBJECT [ '_ext' ] NAME ']'
//! entry  := [ '(' ['-'] INT ['%'] ')' ] [ INT [ '-' INT ] ] [ '*' ] WORD
//! ```
//!
//! `MODE` is `choose` or `multi` and `OBJECT` is `item` or `structure`. A
//! parenthesised number is a weight in `choose` tables and a percentage
//! chance in `multi` tables; `%` is only accepted in the latter. `*` marks
//! a reference to another table, which takes no counts.

use crate::builder::{LootEntry, LootMode, LootObject, LootRef, LootTableDef};
use crate::diagnostics::Diagnostics;
use crate::error::{GenError, Result};

use super::lexer::{Lexer, Mode, Token, TokenKind};
use super::span::source_location;

/// Parse a loot script. Bad lines are reported and skipped.
pub fn parse_loot(file: &str, source: &str, diagnostics: &mut Diagnostics) -> Vec<LootTableDef> {
    let (tokens, errors) = Lexer::tokenize(file, source, Mode::Script);
    for err in &errors {
        diagnostics.report(err);
    }
    let mut parser = LootParser {
        file,
        tokens,
        pos: 0,
    };
    let mut tables: Vec<LootTableDef> = Vec::new();
    // entries after a broken header are dropped with it
    let mut in_broken_table = false;
    loop {
        match parser.peek().kind {
            TokenKind::Eof => break,
            TokenKind::Newline => {
                parser.advance();
                continue;
            }
            _ => {}
        }
        if parser.peek().kind == TokenKind::LBracket {
            match parser.header() {
                Ok(table) => {
                    tables.push(table);
                    in_broken_table = false;
                }
                Err(err) => {
                    in_broken_table = true;
                    diagnostics.report(&err);
                    parser.skip_line();
                }
            }
            continue;
        }
        if in_broken_table {
            parser.skip_line();
            continue;
        }
        let result = match tables.last_mut() {
            Some(table) => parser.entry(table.mode).map(|e| table.entries.push(e)),
            None => Err(parser.error("a table header")),
        };
        if let Err(err) = result {
            diagnostics.report(&err);
            parser.skip_line();
        }
    }
    tables
}

struct LootParser<'a> {
    file: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl LootParser<'_> {
    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        self.pos = (self.pos + 1).min(self.tokens.len());
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn skip_line(&mut self) {
        while !self.at_line_end() {
            self.advance();
        }
    }

    fn error(&self, expected: &str) -> GenError {
        let token = self.peek();
        GenError::Parse {
            file: self.file.to_string(),
            line: token.span.start.line,
            column: token.span.start.column,
            expected: expected.to_string(),
            saw: token.kind.to_string(),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        if self.at(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&kind.to_string()))
        }
    }

    fn word(&mut self, expected: &str) -> Result<String> {
        match &self.peek().kind {
            TokenKind::Word(w) => {
                let w = w.clone();
                self.advance();
                Ok(w)
            }
            _ => Err(self.error(expected)),
        }
    }

    fn peek_int(&self) -> Option<u32> {
        match &self.peek().kind {
            TokenKind::Word(w) => w.parse().ok(),
            _ => None,
        }
    }

    fn number(&mut self) -> Result<u32> {
        let n = self.peek_int().ok_or_else(|| self.error("a number"))?;
        self.advance();
        Ok(n)
    }

    fn weight(&mut self) -> Result<i32> {
        let too_large = self.error("a weight below 2147483648");
        let n = self.number()?;
        i32::try_from(n).map_err(|_| too_large)
    }

    fn end_of_line(&mut self) -> Result<()> {
        if self.at_line_end() {
            Ok(())
        } else {
            Err(self.error("end of line"))
        }
    }

    fn header(&mut self) -> Result<LootTableDef> {
        let start = self.peek().span.start;
        self.advance();
        let kind = self.word("a table type such as choose_item")?;
        let (mode, object, extension) = parse_table_type(&kind).ok_or_else(|| GenError::Parse {
            file: self.file.to_string(),
            line: start.line,
            column: start.column + 1,
            expected: "choose_item, multi_item, choose_structure or multi_structure, optionally with _ext".to_string(),
            saw: format!("'{}'", kind),
        })?;
        let name = self.word("a table name")?;
        self.expect(TokenKind::RBracket)?;
        self.end_of_line()?;
        Ok(LootTableDef {
            name,
            mode,
            object,
            extension,
            entries: Vec::new(),
            origin: Some(source_location(self.file, start)),
        })
    }

    fn entry(&mut self, mode: LootMode) -> Result<LootEntry> {
        let mut weight = LootTableDef::default_weight(mode);
        if self.at(&TokenKind::LParen) {
            self.advance();
            let negative = self.at(&TokenKind::Minus);
            if negative {
                self.advance();
            }
            let n = self.weight()?;
            weight = if negative { -n } else { n };
            if self.at(&TokenKind::Percent) {
                if mode == LootMode::Choose {
                    return Err(self.error("')' (choose tables take weights, not percentages)"));
                }
                self.advance();
            }
            self.expect(TokenKind::RParen)?;
        }

        let mut counts = None;
        if let Some(min) = self.peek_int() {
            // a lone number is an object name, not a count
            let followed = self.tokens.get(self.pos + 1).map(|t| &t.kind);
            if matches!(
                followed,
                Some(TokenKind::Word(_) | TokenKind::Minus | TokenKind::Star)
            ) {
                self.advance();
                let max = if self.at(&TokenKind::Minus) {
                    self.advance();
                    self.number()?
                } else {
                    min
                };
                if max < min {
                    return Err(self.error(&format!("a count range with max >= {}", min)));
                }
                counts = Some((min, max));
            }
        }

        let target = if self.at(&TokenKind::Star) {
            if counts.is_some() {
                return Err(self.error("an object name (table references take no counts)"));
            }
            self.advance();
            LootRef::Table(self.word("a table name")?)
        } else {
            let (min, max) = counts.unwrap_or((1, 1));
            LootRef::Object {
                name: self.word("an object name")?,
                min,
                max,
            }
        };
        self.end_of_line()?;
        Ok(LootEntry { weight, target })
    }
}

/// `choose_item_ext` and friends.
fn parse_table_type(word: &str) -> Option<(LootMode, LootObject, bool)> {
    let (base, extension) = match word.strip_suffix("_ext") {
        Some(base) => (base, true),
        None => (word, false),
    };
    let (mode, object) = base.split_once('_')?;
    let mode = match mode {
        "choose" => LootMode::Choose,
        "multi" => LootMode::Multi,
        _ => return None,
    };
    let object = LootObject::ALL.into_iter().find(|o| o.name() == object)?;
    Some((mode, object, extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> (Vec<LootTableDef>, Diagnostics) {
        let mut diags = Diagnostics::new();
        let tables = parse_loot("chests.loot", src, &mut diags);
        (tables, diags)
    }

    fn object(name: &str, min: u32, max: u32) -> LootRef {
        LootRef::Object {
            name: name.to_string(),
            min,
            max,
        }
    }

    #[test]
    fn test_choose_table() {
        let src = "\
[choose_item chest]
(5) 1-3 gold
gem
(2) *rare
";
        let (tables, diags) = parse(src);
        assert!(diags.is_empty());
        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        assert_eq!((t.mode, t.object, t.extension), (LootMode::Choose, LootObject::Item, false));
        assert_eq!(t.origin.as_deref(), Some("chests.loot:1:1"));
        assert_eq!(
            t.entries,
            vec![
                LootEntry { weight: 5, target: object("gold", 1, 3) },
                LootEntry { weight: 1, target: object("gem", 1, 1) },
                LootEntry { weight: 2, target: LootRef::Table("rare".into()) },
            ]
        );
    }

    #[test]
    fn test_multi_extension() {
        let (tables, diags) = parse("[multi_structure_ext ruins]\n(50%) 2 rubble\n*urns\n(-10) 5\n");
        assert!(diags.is_empty());
        let t = &tables[0];
        assert!(t.extension);
        assert_eq!(t.entries[0], LootEntry { weight: 50, target: object("rubble", 2, 2) });
        assert_eq!(t.entries[1].weight, 100);
        // a lone number is a name
        assert_eq!(t.entries[2], LootEntry { weight: -10, target: object("5", 1, 1) });
    }

    #[test]
    fn test_errors_recover() {
        let src = "\
[choose_item chest]
(50%) gold
2 *gems
3-1 iron
copper
[choose_blocks bad]
stone
[multi_item ok]
wood
";
        let (tables, diags) = parse(src);
        assert_eq!(diags.error_count(), 4);
        assert!(diags.has_code("parse"));
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].entries, vec![LootEntry { weight: 1, target: object("copper", 1, 1) }]);
        assert_eq!(tables[1].name, "ok");
        assert_eq!(tables[1].entries.len(), 1);
    }

    #[test]
    fn test_oversized_weight_is_an_error() {
        let (tables, diags) = parse("[choose_item t]\n(3000000000) gold\n(2) silver\n");
        assert_eq!(diags.error_count(), 1);
        assert!(diags.has_code("parse"));
        assert_eq!(tables[0].entries.len(), 1);
        assert_eq!(tables[0].entries[0].weight, 2);
    }

    #[test]
    fn test_entry_before_header() {
        let (tables, diags) = parse("gold\n");
        assert!(tables.is_empty());
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn test_table_types() {
        assert_eq!(parse_table_type("multi_item_ext"), Some((LootMode::Multi, LootObject::Item, true)));
        assert_eq!(parse_table_type("choose_structure"), Some((LootMode::Choose, LootObject::Structure, false)));
        assert_eq!(parse_table_type("pick_item"), None);
        assert_eq!(parse_table_type("choose"), None);
    }
}
