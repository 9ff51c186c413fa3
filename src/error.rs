use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for tilegen operations.
///
/// Most variants are also recorded as non-fatal diagnostics during a build;
/// see [`GenError::is_fatal`] for the ones that abort immediately.
#[derive(Error, Diagnostic, Debug)]
pub enum GenError {
    #[error("IO error: {0}")]
    #[diagnostic(code(tilegen::io))]
    IoError(#[from] std::io::Error),

    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(tilegen::io))]
    Io { path: PathBuf, message: String },

    #[error("Image error with {path}: {message}")]
    #[diagnostic(code(tilegen::image))]
    Image { path: PathBuf, message: String },

    #[error("Image cache error: {message}")]
    #[diagnostic(code(tilegen::cache))]
    Cache { message: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(tilegen::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Asset not found: {path} (searched mod '{module}' and its dependencies)")]
    #[diagnostic(code(tilegen::asset_not_found))]
    AssetNotFound { module: String, path: String },

    #[error("Unknown mod: {name}")]
    #[diagnostic(code(tilegen::mods::unknown))]
    UnknownMod { name: String },

    #[error("Mod '{name}' depends on '{dep}', which has not been registered")]
    #[diagnostic(
        code(tilegen::mods::missing_dep),
        help("List dependencies before the mods that use them in --mods")
    )]
    MissingDep { name: String, dep: String },

    #[error("Mod '{name}' is declared more than once")]
    #[diagnostic(code(tilegen::mods::duplicate))]
    DuplicateMod { name: String },

    #[error("{file}:{line}:{column}: expected {expected}, saw {saw}")]
    #[diagnostic(code(tilegen::dsl::parse))]
    Parse {
        file: String,
        line: u32,
        column: u32,
        expected: String,
        saw: String,
    },

    #[error("Unknown section type '{kind}'")]
    #[diagnostic(code(tilegen::dsl::unknown_section))]
    UnknownSectionType { kind: String },

    #[error("Unknown field '{field}' for section type '{kind}'")]
    #[diagnostic(code(tilegen::dsl::unknown_field))]
    UnknownField { kind: String, field: String },

    #[error("Evaluation error: {message}")]
    #[diagnostic(code(tilegen::dsl::eval))]
    Eval { message: String },

    #[error("{kind} '{name}': missing required field '{field}'")]
    #[diagnostic(code(tilegen::proto::missing_field))]
    MissingField {
        kind: &'static str,
        name: String,
        field: &'static str,
    },

    #[error("{kind} '{name}': exactly one of '{first}' and '{second}' must be set")]
    #[diagnostic(code(tilegen::proto::ambiguous_field))]
    AmbiguousField {
        kind: &'static str,
        name: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("{kind} '{name}': field '{field}' must not be set ({reason})")]
    #[diagnostic(code(tilegen::proto::conflicting_field))]
    ConflictingField {
        kind: &'static str,
        name: String,
        field: &'static str,
        reason: String,
    },

    #[error("{kind} '{name}': {message}")]
    #[diagnostic(code(tilegen::proto::invalid))]
    Invalid {
        kind: &'static str,
        name: String,
        message: String,
    },

    #[error("Duplicate {kind} name '{name}'")]
    #[diagnostic(code(tilegen::builder::duplicate_name))]
    DuplicateName { kind: &'static str, name: String },

    #[error("{context}: unresolved {kind} reference '{name}'")]
    #[diagnostic(code(tilegen::resolve::unresolved))]
    UnresolvedReference {
        context: String,
        kind: &'static str,
        name: String,
    },

    #[error("Loot table '{name}': extension type {found} does not match base type {expected}")]
    #[diagnostic(code(tilegen::loot::type_mismatch))]
    LootTypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("Loot table cycle: {}", .path.join(" -> "))]
    #[diagnostic(code(tilegen::loot::cycle))]
    LootCycle { path: Vec<String> },

    #[error("Loot table extension '{name}' has no base table")]
    #[diagnostic(code(tilegen::loot::missing_base))]
    LootMissingBase { name: String },

    #[error("Box {width}x{height} does not fit on an empty {page_width}x{page_height} page")]
    #[diagnostic(code(tilegen::pack::oversized))]
    OversizedBox {
        width: u32,
        height: u32,
        page_width: u32,
        page_height: u32,
    },

    #[error("Sprite '{sprite}': {message}")]
    #[diagnostic(code(tilegen::sprite::size_mismatch))]
    SpriteSizeMismatch { sprite: String, message: String },

    #[error("Build error: {message}")]
    #[diagnostic(code(tilegen::build))]
    Build {
        message: String,
        #[help]
        help: Option<String>,
    },
}

impl GenError {
    /// Whether this error aborts the pipeline instead of being accumulated.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GenError::IoError(_)
                | GenError::Io { .. }
                | GenError::Cache { .. }
                | GenError::DuplicateName { .. }
                | GenError::OversizedBox { .. }
                | GenError::SpriteSizeMismatch { .. }
        )
    }

    /// Stable short code used when the error is recorded as a diagnostic.
    pub fn code(&self) -> &'static str {
        match self {
            GenError::IoError(_) | GenError::Io { .. } => "io",
            GenError::Image { .. } => "image",
            GenError::Cache { .. } => "cache",
            GenError::Config { .. } => "config",
            GenError::AssetNotFound { .. } => "asset-not-found",
            GenError::UnknownMod { .. } => "unknown-mod",
            GenError::MissingDep { .. } => "missing-dep",
            GenError::DuplicateMod { .. } => "duplicate-mod",
            GenError::Parse { .. } => "parse",
            GenError::UnknownSectionType { .. } => "unknown-section-type",
            GenError::UnknownField { .. } => "unknown-field",
            GenError::Eval { .. } => "eval",
            GenError::MissingField { .. } => "missing-field",
            GenError::AmbiguousField { .. } => "ambiguous-field",
            GenError::ConflictingField { .. } => "conflicting-field",
            GenError::Invalid { .. } => "invalid-value",
            GenError::DuplicateName { .. } => "duplicate-name",
            GenError::UnresolvedReference { .. } => "unresolved-reference",
            GenError::LootTypeMismatch { .. } => "loot-type-mismatch",
            GenError::LootCycle { .. } => "loot-cycle",
            GenError::LootMissingBase { .. } => "loot-missing-base",
            GenError::OversizedBox { .. } => "oversized-box",
            GenError::SpriteSizeMismatch { .. } => "sprite-size-mismatch",
            GenError::Build { .. } => "build",
        }
    }

    pub(crate) fn eval(message: impl Into<String>) -> Self {
        GenError::Eval {
            message: message.into(),
        }
    }

    pub(crate) fn build(message: impl Into<String>) -> Self {
        GenError::Build {
            message: message.into(),
            help: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let dup = GenError::DuplicateName {
            kind: "block",
            name: "grass".to_string(),
        };
        assert!(dup.is_fatal());

        let missing = GenError::MissingField {
            kind: "block",
            name: "grass".to_string(),
            field: "shape",
        };
        assert!(!missing.is_fatal());
        assert_eq!(missing.code(), "missing-field");
    }

    #[test]
    fn test_parse_error_message_has_position() {
        let err = GenError::Parse {
            file: "blocks.od".to_string(),
            line: 3,
            column: 7,
            expected: "':'".to_string(),
            saw: "'shape'".to_string(),
        };
        assert_eq!(err.to_string(), "blocks.od:3:7: expected ':', saw 'shape'");
    }

    #[test]
    fn test_loot_cycle_message() {
        let err = GenError::LootCycle {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Loot table cycle: a -> b -> a");
    }
}
