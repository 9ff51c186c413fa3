//! Tokenizer shared by the section DSL, the loot DSL and host expressions.
//!
//! Script mode produces words (`[A-Za-z0-9_/]+`), backtick expressions and
//! `%%%` blocks. Host mode produces identifiers, integers and operators.
//! Lexing never stops at the first error: a bad character is reported and
//! the rest of its line skipped.

use std::fmt;

use crate::error::GenError;

use super::span::{Location, Span};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Script-mode word.
    Word(String),
    /// Host-mode identifier.
    Ident(String),
    /// Host-mode integer literal.
    Int(i64),
    Str(String),
    /// Contents of a backtick expression.
    Host(String),
    /// Contents of a `%%%` block.
    HostBlock(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Colon,
    Comma,
    Percent,
    Minus,
    Plus,
    Star,
    Dot,
    Eq,
    Newline,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Word(w) | TokenKind::Ident(w) => write!(f, "'{}'", w),
            TokenKind::Int(n) => write!(f, "'{}'", n),
            TokenKind::Str(s) => write!(f, "\"{}\"", s),
            TokenKind::Host(_) => f.write_str("backtick expression"),
            TokenKind::HostBlock(_) => f.write_str("%%% block"),
            TokenKind::LParen => f.write_str("'('"),
            TokenKind::RParen => f.write_str("')'"),
            TokenKind::LBracket => f.write_str("'['"),
            TokenKind::RBracket => f.write_str("']'"),
            TokenKind::LBrace => f.write_str("'{'"),
            TokenKind::RBrace => f.write_str("'}'"),
            TokenKind::Colon => f.write_str("':'"),
            TokenKind::Comma => f.write_str("','"),
            TokenKind::Percent => f.write_str("'%'"),
            TokenKind::Minus => f.write_str("'-'"),
            TokenKind::Plus => f.write_str("'+'"),
            TokenKind::Star => f.write_str("'*'"),
            TokenKind::Dot => f.write_str("'.'"),
            TokenKind::Eq => f.write_str("'='"),
            TokenKind::Newline => f.write_str("end of line"),
            TokenKind::Eof => f.write_str("end of file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Script,
    Host,
}

pub struct Lexer<'f> {
    file: &'f str,
    mode: Mode,
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
    errors: Vec<GenError>,
}

impl<'f> Lexer<'f> {
    /// Tokenize `source`. Always ends with `Eof`; errors are returned
    /// alongside the tokens that could be read.
    pub fn tokenize(file: &'f str, source: &str, mode: Mode) -> (Vec<Token>, Vec<GenError>) {
        let mut lexer = Lexer {
            file,
            mode,
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            errors: Vec::new(),
        };
        let mut tokens = Vec::new();
        while !lexer.is_eof() {
            lexer.skip_blanks();
            let Some(ch) = lexer.peek() else {
                break;
            };
            if ch == '#' {
                lexer.skip_line();
                continue;
            }
            if let Some(token) = lexer.next_token() {
                tokens.push(token);
            }
        }
        tokens.push(Token::new(TokenKind::Eof, Span::at(lexer.here())));
        (tokens, lexer.errors)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn here(&self) -> Location {
        Location::new(self.line, self.col)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_n(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn skip_blanks(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\u{feff}')) {
            self.advance();
        }
    }

    /// Skip to (not past) the next newline.
    fn skip_line(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn error(&mut self, at: Location, expected: &str, saw: String) {
        self.errors.push(GenError::Parse {
            file: self.file.to_string(),
            line: at.line,
            column: at.column,
            expected: expected.to_string(),
            saw,
        });
        self.skip_line();
    }

    fn at_line_start(&self) -> bool {
        self.chars[..self.pos]
            .iter()
            .rev()
            .take_while(|&&c| c != '\n')
            .all(|c| c.is_whitespace())
    }

    /// Whether the current line, from the cursor, is exactly `%%%`.
    fn at_block_fence(&self) -> bool {
        let rest: String = self.chars[self.pos..]
            .iter()
            .take_while(|&&c| c != '\n')
            .collect();
        rest.trim() == "%%%"
    }

    fn next_token(&mut self) -> Option<Token> {
        let start = self.here();
        let ch = self.peek()?;

        if self.mode == Mode::Script && ch == '%' && self.at_line_start() && self.at_block_fence() {
            return self.read_block(start);
        }

        let kind = match ch {
            '\n' => {
                self.advance();
                TokenKind::Newline
            }
            '"' => return self.read_string(start, '"'),
            '\'' if self.mode == Mode::Host => return self.read_string(start, '\''),
            '`' if self.mode == Mode::Script => return self.read_backtick(start),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            ':' => self.single(TokenKind::Colon),
            ',' => self.single(TokenKind::Comma),
            '%' => self.single(TokenKind::Percent),
            '-' => self.single(TokenKind::Minus),
            '*' => self.single(TokenKind::Star),
            '{' if self.mode == Mode::Host => self.single(TokenKind::LBrace),
            '}' if self.mode == Mode::Host => self.single(TokenKind::RBrace),
            '+' if self.mode == Mode::Host => self.single(TokenKind::Plus),
            '.' if self.mode == Mode::Host => self.single(TokenKind::Dot),
            '=' if self.mode == Mode::Host => self.single(TokenKind::Eq),
            c if self.mode == Mode::Script && is_word_char(c) => TokenKind::Word(self.read_while(is_word_char)),
            c if self.mode == Mode::Host && c.is_ascii_digit() => {
                let digits = self.read_while(|c| c.is_ascii_digit());
                match digits.parse() {
                    Ok(n) => TokenKind::Int(n),
                    Err(_) => {
                        self.error(start, "an integer", format!("'{}'", digits));
                        return None;
                    }
                }
            }
            c if self.mode == Mode::Host && (c.is_ascii_alphabetic() || c == '_') => {
                TokenKind::Ident(self.read_while(|c| c.is_ascii_alphanumeric() || c == '_'))
            }
            other => {
                self.error(start, "a token", format!("'{}'", other));
                return None;
            }
        };
        Some(Token::new(kind, Span::new(start, self.here())))
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|&c| pred(c)) {
            out.push(c);
            self.advance();
        }
        out
    }

    fn read_string(&mut self, start: Location, quote: char) -> Option<Token> {
        self.advance();
        let mut out = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.error(start, "closing quote", "end of line".to_string());
                    return None;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some(c @ ('\\' | '"' | '\'')) => out.push(c),
                        other => {
                            let saw = other.map_or("end of file".to_string(), |c| format!("'\\{}'", c));
                            self.error(start, "a valid escape", saw);
                            return None;
                        }
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    out.push(c);
                    self.advance();
                }
            }
        }
        Some(Token::new(TokenKind::Str(out), Span::new(start, self.here())))
    }

    /// Backtick contents; the span starts at the first character inside.
    fn read_backtick(&mut self, start: Location) -> Option<Token> {
        self.advance();
        let inner = self.here();
        let mut out = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    self.error(start, "closing backtick", "end of line".to_string());
                    return None;
                }
                Some('`') => {
                    let end = self.here();
                    self.advance();
                    return Some(Token::new(TokenKind::Host(out), Span::new(inner, end)));
                }
                Some(c) => {
                    out.push(c);
                    self.advance();
                }
            }
        }
    }

    /// A `%%%` fenced block. The span starts at the first line inside.
    fn read_block(&mut self, start: Location) -> Option<Token> {
        self.skip_line();
        self.advance();
        let inner = self.here();
        let mut out = String::new();
        while !self.is_eof() {
            self.skip_blanks();
            if self.at_block_fence() {
                let end = self.here();
                self.skip_line();
                return Some(Token::new(TokenKind::HostBlock(out), Span::new(inner, end)));
            }
            let line_start = self.pos;
            let line = self.read_while(|c| c != '\n');
            // keep the original indentation so columns stay accurate
            let indent: String = self.chars[..line_start]
                .iter()
                .rev()
                .take_while(|&&c| c != '\n')
                .collect();
            out.push_str(&indent);
            out.push_str(&line);
            out.push('\n');
            self.advance();
        }
        self.error(start, "closing %%%", "end of file".to_string());
        None
    }
}

pub fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '/'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str, mode: Mode) -> Vec<TokenKind> {
        let (tokens, errors) = Lexer::tokenize("t.od", source, mode);
        assert!(errors.is_empty(), "{:?}", errors);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    fn word(w: &str) -> TokenKind {
        TokenKind::Word(w.to_string())
    }

    #[test]
    fn test_section_header_and_field() {
        let got = kinds("[block ore/iron]\nshape: solid # comment\n", Mode::Script);
        assert_eq!(
            got,
            vec![
                TokenKind::LBracket,
                word("block"),
                word("ore/iron"),
                TokenKind::RBracket,
                TokenKind::Newline,
                word("shape"),
                TokenKind::Colon,
                word("solid"),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_backtick_span_points_inside() {
        let (tokens, _) = Lexer::tokenize("t.od", "image: `load(\"a.png\")`", Mode::Script);
        let host = &tokens[2];
        assert_eq!(host.kind, TokenKind::Host("load(\"a.png\")".to_string()));
        assert_eq!(host.span.start, Location::new(1, 9));
    }

    #[test]
    fn test_block_keeps_indentation() {
        let src = "%%%\n  x = 1\ny = 2\n%%%\n[item a]\n";
        let (tokens, errors) = Lexer::tokenize("t.od", src, Mode::Script);
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::HostBlock("  x = 1\ny = 2\n".to_string()));
        assert_eq!(tokens[0].span.start, Location::new(2, 1));
        assert_eq!(tokens[1].kind, TokenKind::Newline);
        assert_eq!(tokens[2].kind, TokenKind::LBracket);
    }

    #[test]
    fn test_loot_entry() {
        let got = kinds("(50%) 1-3 *gems", Mode::Script);
        assert_eq!(
            got,
            vec![
                TokenKind::LParen,
                word("50"),
                TokenKind::Percent,
                TokenKind::RParen,
                word("1"),
                TokenKind::Minus,
                word("3"),
                TokenKind::Star,
                word("gems"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_host_mode() {
        let got = kinds("a.b(1, x='s') + -2", Mode::Host);
        assert_eq!(
            got,
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Dot,
                TokenKind::Ident("b".into()),
                TokenKind::LParen,
                TokenKind::Int(1),
                TokenKind::Comma,
                TokenKind::Ident("x".into()),
                TokenKind::Eq,
                TokenKind::Str("s".into()),
                TokenKind::RParen,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Int(2),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_error_recovers_at_next_line() {
        let (tokens, errors) = Lexer::tokenize("t.od", "name: a ! b\nlayer: 2\n", Mode::Script);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().starts_with("t.od:1:9:"));
        assert!(tokens.iter().any(|t| t.kind == word("layer")));
        assert!(!tokens.iter().any(|t| t.kind == word("b")));
    }

    #[test]
    fn test_unterminated_string() {
        let (_, errors) = Lexer::tokenize("t.od", "image: \"a.png\n", Mode::Script);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "parse");
    }
}
