//! The authoring languages.
//!
//! Section scripts (`.od`) declare prototypes field by field; loot scripts
//! (`.loot`) declare loot tables. Field values and `%%%` blocks are host
//! expressions, evaluated by a small interpreter that can only reach the
//! builtins listed in [`interp::BUILTINS`].

mod expr;
mod fields;
mod interp;
mod lexer;
mod loot;
mod run;
mod section;
mod span;
mod value;

use std::fs;

use tracing::debug;

use crate::context::ModContext;
use crate::error::{GenError, Result};
use crate::mods::{ScriptFile, ScriptKind};

pub use expr::{parse_expr, Expr};
pub use fields::{FieldKind, FieldSpec};
pub use interp::{Globals, Interpreter, BUILTINS};
pub use loot::parse_loot;
pub use run::run_script;
pub use section::{parse_script, Script};
pub use span::{Location, Span};
pub use value::Value;

/// Read, parse and run one script file for the context's mod.
pub fn run_file(ctx: &mut ModContext<'_>, file: &ScriptFile) -> Result<()> {
    let source = fs::read_to_string(&file.path).map_err(|e| GenError::Io {
        path: file.path.clone(),
        message: e.to_string(),
    })?;
    let name = file.path.display().to_string();
    debug!(module = %file.module, path = %name, "running script");
    match file.kind {
        ScriptKind::Section => {
            let script = parse_script(&name, &source, ctx.diagnostics());
            run_script(ctx, &script)
        }
        ScriptKind::Loot => {
            let tables = parse_loot(&name, &source, ctx.diagnostics());
            ctx.builders().loot_tables.extend(tables);
            Ok(())
        }
    }
}
