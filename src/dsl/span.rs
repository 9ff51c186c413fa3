//! Source positions for DSL diagnostics.

use std::fmt;

/// A position in a script (1-indexed line and column, columns counted in
/// characters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Default for Location {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl Location {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Translate a position inside embedded source that starts at `origin`.
    /// Columns only shift on the embedded source's first line.
    pub fn relative_to(self, origin: Location) -> Location {
        if self.line == 1 {
            Location::new(origin.line, origin.column + self.column - 1)
        } else {
            Location::new(origin.line + self.line - 1, self.column)
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open range of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Location,
    pub end: Location,
}

impl Span {
    pub fn new(start: Location, end: Location) -> Self {
        Self { start, end }
    }

    pub fn at(loc: Location) -> Self {
        Self::new(loc, loc)
    }

    /// Span covering both.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn relative_to(self, origin: Location) -> Span {
        Span::new(self.start.relative_to(origin), self.end.relative_to(origin))
    }
}

/// A value with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            value: f(self.value),
            span: self.span,
        }
    }
}

/// `file:line:column`, the location form used by diagnostics.
pub fn source_location(file: &str, loc: Location) -> String {
    format!("{}:{}", file, loc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_first_line() {
        let origin = Location::new(12, 9);
        assert_eq!(Location::new(1, 5).relative_to(origin), Location::new(12, 13));
        assert_eq!(Location::new(3, 2).relative_to(origin), Location::new(14, 2));
    }

    #[test]
    fn test_merge() {
        let a = Span::new(Location::new(1, 4), Location::new(1, 8));
        let b = Span::new(Location::new(1, 2), Location::new(2, 1));
        assert_eq!(a.merge(b), Span::new(Location::new(1, 2), Location::new(2, 1)));
    }

    #[test]
    fn test_source_location() {
        assert_eq!(source_location("blocks.od", Location::new(3, 7)), "blocks.od:3:7");
    }
}
