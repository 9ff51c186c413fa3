//! Host expressions: the small language inside backticks and `%%%` blocks.
//!
//! ```text
//! block   := { IDENT '=' expr NEWLINE }
//! expr    := term { ('+' | '-') term }
//! term    := unary { '*' unary }
//! unary   := '-' unary | postfix
//! postfix := atom { '.' IDENT | '(' args ')' | '[' expr ']' }
//! atom    := INT | STRING | IDENT | '(' exprs ')' | '[' exprs ']' | '{' pairs '}'
//! ```
//!
//! Newlines inside brackets are ignored, so long literals may span lines.

use crate::error::{GenError, Result};

use super::lexer::{Lexer, Mode, Token, TokenKind};
use super::span::{Location, Span, Spanned};

pub type SExpr = Spanned<Expr>;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    Name(String),
    Attr(Box<SExpr>, String),
    Index(Box<SExpr>, Box<SExpr>),
    Call {
        callee: Box<SExpr>,
        args: Vec<SExpr>,
        kwargs: Vec<(String, SExpr)>,
    },
    List(Vec<SExpr>),
    Tuple(Vec<SExpr>),
    Dict(Vec<(SExpr, SExpr)>),
    Binary(BinOp, Box<SExpr>, Box<SExpr>),
    Neg(Box<SExpr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
        }
    }
}

/// `target = value` inside a `%%%` block.
#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub target: Spanned<String>,
    pub value: SExpr,
}

impl Expr {
    /// Call of a builtin by name, used to desugar literal field values.
    pub fn call(name: &str, args: Vec<SExpr>, span: Span) -> SExpr {
        Spanned::new(
            Expr::Call {
                callee: Box::new(Spanned::new(Expr::Name(name.to_string()), span)),
                args,
                kwargs: Vec::new(),
            },
            span,
        )
    }
}

/// Parse one backtick expression. `origin` is where its text starts in the
/// script, so spans come out in script coordinates.
pub fn parse_expr(file: &str, source: &str, origin: Location) -> Result<SExpr> {
    let mut parser = Parser::new(file, source, origin)?;
    parser.skip_newlines();
    let expr = parser.expr()?;
    parser.skip_newlines();
    parser.expect_end()?;
    Ok(expr)
}

/// Parse a `%%%` block. Every bad statement is reported; parsing resumes at
/// the next line.
pub fn parse_block(file: &str, source: &str, origin: Location) -> (Vec<Assign>, Vec<GenError>) {
    let mut parser = match Parser::new(file, source, origin) {
        Ok(p) => p,
        Err(err) => return (Vec::new(), vec![err]),
    };
    let mut out = Vec::new();
    let mut errors = Vec::new();
    loop {
        parser.skip_newlines();
        if parser.check(&TokenKind::Eof) {
            break;
        }
        match parser.assignment() {
            Ok(assign) => out.push(assign),
            Err(err) => {
                errors.push(err);
                parser.skip_to_newline();
            }
        }
    }
    (out, errors)
}

struct Parser<'f> {
    file: &'f str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'f> Parser<'f> {
    fn new(file: &'f str, source: &str, origin: Location) -> Result<Self> {
        let (tokens, mut errors) = Lexer::tokenize(file, source, Mode::Host);
        if !errors.is_empty() {
            let err = errors.remove(0);
            return Err(relocate(err, origin));
        }
        let tokens = strip_nested_newlines(tokens)
            .into_iter()
            .map(|t| Token::new(t.kind, t.span.relative_to(origin)))
            .collect();
        Ok(Self { file, tokens, pos: 0 })
    }

    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
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

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error(&kind.to_string()))
        }
    }

    fn expect_end(&mut self) -> Result<()> {
        if self.check(&TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.error("end of expression"))
        }
    }

    fn skip_newlines(&mut self) {
        while self.eat(&TokenKind::Newline) {}
    }

    fn skip_to_newline(&mut self) {
        while !self.check(&TokenKind::Newline) && !self.check(&TokenKind::Eof) {
            self.advance();
        }
    }

    fn assignment(&mut self) -> Result<Assign> {
        let token = self.advance();
        let TokenKind::Ident(name) = token.kind else {
            self.pos -= 1;
            return Err(self.error("a name to assign"));
        };
        self.expect(TokenKind::Eq)?;
        let value = self.expr()?;
        if !self.check(&TokenKind::Eof) {
            self.expect(TokenKind::Newline)?;
        }
        Ok(Assign {
            target: Spanned::new(name, token.span),
            value,
        })
    }

    fn expr(&mut self) -> Result<SExpr> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> Result<SExpr> {
        let mut lhs = self.unary()?;
        while self.eat(&TokenKind::Star) {
            let rhs = self.unary()?;
            lhs = binary(BinOp::Mul, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<SExpr> {
        if self.check(&TokenKind::Minus) {
            let start = self.advance().span;
            let inner = self.unary()?;
            let span = start.merge(inner.span);
            return Ok(Spanned::new(Expr::Neg(Box::new(inner)), span));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<SExpr> {
        let mut expr = self.atom()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let token = self.advance();
                let TokenKind::Ident(attr) = token.kind else {
                    self.pos -= 1;
                    return Err(self.error("an attribute name"));
                };
                let span = expr.span.merge(token.span);
                expr = Spanned::new(Expr::Attr(Box::new(expr), attr), span);
            } else if self.check(&TokenKind::LParen) {
                self.advance();
                let (args, kwargs) = self.call_args()?;
                let close = self.expect(TokenKind::RParen)?;
                let span = expr.span.merge(close.span);
                expr = Spanned::new(
                    Expr::Call {
                        callee: Box::new(expr),
                        args,
                        kwargs,
                    },
                    span,
                );
            } else if self.check(&TokenKind::LBracket) {
                self.advance();
                let index = self.expr()?;
                let close = self.expect(TokenKind::RBracket)?;
                let span = expr.span.merge(close.span);
                expr = Spanned::new(Expr::Index(Box::new(expr), Box::new(index)), span);
            } else {
                return Ok(expr);
            }
        }
    }

    fn call_args(&mut self) -> Result<(Vec<SExpr>, Vec<(String, SExpr)>)> {
        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let keyword = match (&self.peek().kind, self.tokens.get(self.pos + 1)) {
                (TokenKind::Ident(name), Some(next)) if next.kind == TokenKind::Eq => {
                    Some(name.clone())
                }
                _ => None,
            };
            if let Some(name) = keyword {
                self.advance();
                self.advance();
                kwargs.push((name, self.expr()?));
            } else if !kwargs.is_empty() {
                return Err(self.error("a keyword argument"));
            } else {
                args.push(self.expr()?);
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok((args, kwargs))
    }

    fn atom(&mut self) -> Result<SExpr> {
        let token = self.advance();
        let span = token.span;
        let expr = match token.kind {
            TokenKind::Int(n) => Expr::Int(n),
            TokenKind::Str(s) => Expr::Str(s),
            TokenKind::Ident(name) => match name.as_str() {
                "None" => Expr::None,
                "True" => Expr::Bool(true),
                "False" => Expr::Bool(false),
                _ => Expr::Name(name),
            },
            TokenKind::LParen => {
                let (items, trailing_comma) = self.items(&TokenKind::RParen)?;
                let close = self.expect(TokenKind::RParen)?;
                let span = span.merge(close.span);
                if items.len() == 1 && !trailing_comma {
                    let inner = items.into_iter().next().map(|e| e.value).unwrap_or(Expr::None);
                    return Ok(Spanned::new(inner, span));
                }
                return Ok(Spanned::new(Expr::Tuple(items), span));
            }
            TokenKind::LBracket => {
                let (items, _) = self.items(&TokenKind::RBracket)?;
                let close = self.expect(TokenKind::RBracket)?;
                return Ok(Spanned::new(Expr::List(items), span.merge(close.span)));
            }
            TokenKind::LBrace => {
                let mut pairs = Vec::new();
                while !self.check(&TokenKind::RBrace) {
                    let key = self.expr()?;
                    self.expect(TokenKind::Colon)?;
                    pairs.push((key, self.expr()?));
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                let close = self.expect(TokenKind::RBrace)?;
                return Ok(Spanned::new(Expr::Dict(pairs), span.merge(close.span)));
            }
            _ => {
                self.pos -= 1;
                return Err(self.error("an expression"));
            }
        };
        Ok(Spanned::new(expr, span))
    }

    /// Comma-separated expressions up to `close`. Also reports whether the
    /// list ended with a comma.
    fn items(&mut self, close: &TokenKind) -> Result<(Vec<SExpr>, bool)> {
        let mut items = Vec::new();
        let mut trailing = false;
        while !self.check(close) {
            items.push(self.expr()?);
            trailing = self.eat(&TokenKind::Comma);
            if !trailing {
                break;
            }
        }
        Ok((items, trailing))
    }
}

fn binary(op: BinOp, lhs: SExpr, rhs: SExpr) -> SExpr {
    let span = lhs.span.merge(rhs.span);
    Spanned::new(Expr::Binary(op, Box::new(lhs), Box::new(rhs)), span)
}

fn strip_nested_newlines(tokens: Vec<Token>) -> Vec<Token> {
    let mut depth = 0usize;
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token.kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                depth = depth.saturating_sub(1)
            }
            TokenKind::Newline if depth > 0 => continue,
            _ => {}
        }
        out.push(token);
    }
    out
}

fn relocate(err: GenError, origin: Location) -> GenError {
    match err {
        GenError::Parse {
            file,
            line,
            column,
            expected,
            saw,
        } => {
            let at = Location::new(line, column).relative_to(origin);
            GenError::Parse {
                file,
                line: at.line,
                column: at.column,
                expected,
                saw,
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Expr {
        parse_expr("t.od", src, Location::default()).unwrap().value
    }

    /// Structural comparison ignoring spans.
    fn shape(e: &Expr) -> String {
        match e {
            Expr::None => "None".into(),
            Expr::Bool(b) => b.to_string(),
            Expr::Int(n) => n.to_string(),
            Expr::Str(s) => format!("{:?}", s),
            Expr::Name(n) => n.clone(),
            Expr::Attr(o, a) => format!("{}.{}", shape(&o.value), a),
            Expr::Index(o, i) => format!("{}[{}]", shape(&o.value), shape(&i.value)),
            Expr::Call { callee, args, kwargs } => {
                let mut parts: Vec<String> = args.iter().map(|a| shape(&a.value)).collect();
                parts.extend(kwargs.iter().map(|(k, v)| format!("{}={}", k, shape(&v.value))));
                format!("{}({})", shape(&callee.value), parts.join(", "))
            }
            Expr::List(items) => format!(
                "[{}]",
                items.iter().map(|i| shape(&i.value)).collect::<Vec<_>>().join(", ")
            ),
            Expr::Tuple(items) => format!(
                "({})",
                items.iter().map(|i| shape(&i.value)).collect::<Vec<_>>().join(", ")
            ),
            Expr::Dict(pairs) => format!(
                "{{{}}}",
                pairs
                    .iter()
                    .map(|(k, v)| format!("{}: {}", shape(&k.value), shape(&v.value)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Expr::Binary(op, l, r) => format!("({} {} {})", shape(&l.value), op.symbol(), shape(&r.value)),
            Expr::Neg(e) => format!("-{}", shape(&e.value)),
        }
    }

    #[test]
    fn test_method_chain() {
        let e = parse("load(\"sheet.png\").extract((0, 1), (2, 2), unit=(16, 16)).flip()");
        assert_eq!(
            shape(&e),
            "load(\"sheet.png\").extract((0, 1), (2, 2), unit=(16, 16)).flip()"
        );
    }

    #[test]
    fn test_precedence() {
        assert_eq!(shape(&parse("1 + 2 * -3 - 4")), "((1 + (2 * -3)) - 4)");
    }

    #[test]
    fn test_paren_vs_tuple() {
        assert_eq!(parse("(7)"), Expr::Int(7));
        assert_eq!(shape(&parse("(7,)")), "(7)");
        assert!(matches!(parse("()"), Expr::Tuple(ref v) if v.is_empty()));
    }

    #[test]
    fn test_instances_path() {
        let e = parse("INSTANCES.structure.anvil");
        assert!(matches!(e, Expr::Attr(_, ref attr) if attr == "anvil"));
        assert_eq!(shape(&e), "INSTANCES.structure.anvil");
    }

    #[test]
    fn test_spans_are_in_script_coordinates() {
        let e = parse_expr("t.od", "a.b(", Location::new(4, 10)).unwrap_err();
        assert!(e.to_string().starts_with("t.od:4:14:"), "{}", e);
    }

    #[test]
    fn test_block_multiline_literal() {
        let src = "tiles = {\n  \"grass\": (0, 0),\n  \"dirt\": (1, 0),\n}\nn = 3\n";
        let (stmts, errors) = parse_block("t.od", src, Location::new(2, 1));
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].target.value, "tiles");
        assert_eq!(shape(&stmts[0].value.value), "{\"grass\": (0, 0), \"dirt\": (1, 0)}");
        assert_eq!(stmts[1].target.span.start, Location::new(6, 1));
    }

    #[test]
    fn test_block_recovers() {
        let (stmts, errors) = parse_block("t.od", "a = (\nb = 2\n", Location::default());
        // the open paren swallows the newline, so only one error and no statements
        assert_eq!(errors.len(), 1);
        assert!(stmts.is_empty());

        let (stmts, errors) = parse_block("t.od", "= 1\nb = 2\n", Location::default());
        assert_eq!(errors.len(), 1);
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_positional_after_keyword_rejected() {
        assert!(parse_expr("t.od", "f(a=1, 2)", Location::default()).is_err());
    }
}
