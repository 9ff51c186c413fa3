//! Executing parsed section scripts against the builder registry.

use std::collections::HashSet;

use tracing::trace;

use crate::builder::{Builder, Builders, IconSource, Kind, Prototype, ScopeId};
use crate::context::ModContext;
use crate::error::{GenError, Result};

use super::fields::{self, FieldKind};
use super::interp::{exec_block, At, EvalResult, Globals, Interpreter};
use super::section::{init_field, FieldStmt, Script, ScriptItem, Section};
use super::span::{source_location, Location};
use super::value::Value;

/// Run every block and section of `script` in order. Each script gets its
/// own globals. Only fatal errors are returned; everything else goes to
/// the diagnostics.
pub fn run_script(ctx: &mut ModContext<'_>, script: &Script) -> Result<()> {
    let mut globals = Globals::new();
    for item in &script.items {
        match item {
            ScriptItem::Block(stmts) => {
                for err in exec_block(ctx, &mut globals, stmts) {
                    report(ctx, &script.file, err.span.start, err.error)?;
                }
            }
            ScriptItem::Section(section) => run_section(ctx, &globals, &script.file, section)?,
        }
    }
    Ok(())
}

fn report(ctx: &mut ModContext<'_>, file: &str, at: Location, err: GenError) -> Result<()> {
    if err.is_fatal() {
        return Err(err);
    }
    ctx.diagnostics().report_at(source_location(file, at), &err);
    Ok(())
}

fn run_section(ctx: &mut ModContext<'_>, globals: &Globals, file: &str, section: &Section) -> Result<()> {
    trace!(kind = section.kind.name(), name = %section.name.value, "running section");
    let scope = match open_scope(ctx, globals, file, section) {
        Ok(Some(scope)) => scope,
        Ok(None) => return Ok(()),
        Err(err) => return report(ctx, file, err.span.start, err.error),
    };

    let rest = match init_field(section) {
        Some(_) => &section.fields[1..],
        None => &section.fields[..],
    };
    for field in rest {
        if let Err(err) = run_field(ctx, globals, section.kind, scope, field) {
            report(ctx, file, err.span.start, err.error)?;
        }
    }
    Ok(())
}

fn run_field(
    ctx: &mut ModContext<'_>,
    globals: &Globals,
    kind: Kind,
    scope: ScopeId,
    field: &FieldStmt,
) -> EvalResult<()> {
    if field.is_init() {
        return Err(GenError::eval(format!(
            "'{}' constructs the section and must be its first field",
            field.spec.name
        )))
        .at(field.span);
    }
    let value = Interpreter::new(ctx, globals).eval(&field.value)?;
    fields::apply(ctx.builders(), kind, scope, field.spec.name, &value).at(field.value.span)
}

/// Create the section's scope. `None` means a duplicate name was reported
/// and the section is skipped.
fn open_scope(
    ctx: &mut ModContext<'_>,
    globals: &Globals,
    file: &str,
    section: &Section,
) -> EvalResult<Option<ScopeId>> {
    let name = &section.name.value;
    let name_at = section.name.span;
    let Some(init) = init_field(section) else {
        if !claim(ctx, file, section.kind, [name.clone()], name_at.start) {
            return Ok(None);
        }
        return declare(ctx.builders(), section.kind, None, &[name.as_str()])
            .map(Some)
            .at(name_at);
    };

    let value = Interpreter::new(ctx, globals).eval(&init.value)?;
    let span = init.value.span;
    match init.spec.kind {
        FieldKind::MultiName => {
            let names = value
                .as_seq()
                .and_then(|items| {
                    items
                        .iter()
                        .map(|v| v.as_name().map(str::to_string))
                        .collect::<Result<Vec<_>>>()
                })
                .at(span)?;
            let full = names.iter().map(|n| format!("{}/{}", name, n));
            if !claim(ctx, file, section.kind, full, name_at.start) {
                return Ok(None);
            }
            declare(ctx.builders(), section.kind, Some(name), &names)
                .map(Some)
                .at(span)
        }
        FieldKind::From(Kind::Structure) => {
            let (source, icon) = match &value {
                Value::Tuple(items) => match items.as_slice() {
                    [source, offset] => {
                        let (x, y) = offset.as_pair().at(span)?;
                        (source.as_name().at(span)?, IconSource::Offset(x, y))
                    }
                    _ => return Err(GenError::eval("expected NAME or NAME (X, Y)")).at(span),
                },
                other => (other.as_name().at(span)?, IconSource::Thumbnail),
            };
            let proto = source_proto(&ctx.builders().structure, name, source).at(span)?;
            if !claim(ctx, file, Kind::Item, [name.clone()], name_at.start) {
                return Ok(None);
            }
            let builders = ctx.builders();
            let mut root = builders.item.root();
            root.from_structure(&proto, Some(name), icon)
                .map(|s| Some(s.id()))
                .at(span)
        }
        FieldKind::From(Kind::Item) => {
            let proto = source_proto(&ctx.builders().item, name, value.as_name().at(span)?).at(span)?;
            if !claim(ctx, file, Kind::Recipe, [name.clone()], name_at.start) {
                return Ok(None);
            }
            let builders = ctx.builders();
            let mut root = builders.recipe.root();
            root.from_item(&proto, Some(name)).map(|s| Some(s.id())).at(span)
        }
        other => Err(GenError::eval(format!("'{:?}' cannot construct a section", other))).at(span),
    }
}

/// Report names that are already declared, or repeated. Returns whether
/// all of them are free.
fn claim<I>(ctx: &mut ModContext<'_>, file: &str, kind: Kind, names: I, at: Location) -> bool
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let mut free = true;
    for name in names {
        if ctx.builders().contains(kind, &name) || !seen.insert(name.clone()) {
            let err = GenError::DuplicateName {
                kind: kind.name(),
                name,
            };
            ctx.diagnostics().report_at(source_location(file, at), &err);
            free = false;
        }
    }
    free
}

fn source_proto<P: Prototype>(builder: &Builder<P>, context: &str, name: &str) -> Result<P> {
    builder
        .get(name)
        .cloned()
        .ok_or_else(|| GenError::UnresolvedReference {
            context: context.to_string(),
            kind: P::KIND.name(),
            name: name.to_string(),
        })
}

fn declare<S: AsRef<str>>(
    builders: &mut Builders,
    kind: Kind,
    prefix: Option<&str>,
    names: &[S],
) -> Result<ScopeId> {
    match kind {
        Kind::Block => scoped(&mut builders.block, prefix, names),
        Kind::Structure => scoped(&mut builders.structure, prefix, names),
        Kind::Item => scoped(&mut builders.item, prefix, names),
        Kind::Recipe => scoped(&mut builders.recipe, prefix, names),
        Kind::AnimGroup => scoped(&mut builders.anim_group, prefix, names),
        Kind::Sprite => scoped(&mut builders.sprite, prefix, names),
        Kind::AttachSlot => scoped(&mut builders.attach_slot, prefix, names),
        Kind::Extra => scoped(&mut builders.extra, prefix, names),
        Kind::LootTable => Err(GenError::eval("loot tables are declared in .loot scripts")),
    }
}

fn scoped<P: Prototype, S: AsRef<str>>(
    builder: &mut Builder<P>,
    prefix: Option<&str>,
    names: &[S],
) -> Result<ScopeId> {
    let mut root = builder.root();
    let names = names.iter().map(AsRef::as_ref);
    let id = match prefix {
        Some(prefix) => root.prefixed(prefix).add_all(names)?.id(),
        None => root.add_all(names)?.id(),
    };
    Ok(id)
}
