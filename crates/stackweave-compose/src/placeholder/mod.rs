//! Placeholder resolution.
//!
//! Expands `{{identifier}}` tokens in string values using a
//! [`BindingContext`]. Substitution is a single pass: text inserted from a
//! binding is never rescanned. Object keys and non-string values keep their
//! shape, intrinsic calls included.

pub mod bindings;
pub mod lexer;

use stackweave_common::error::{Result, StackweaveError};

pub use self::bindings::{BindingContext, GlobalBindings};
use self::lexer::Segment;
use crate::node::{Node, NodeMap};
use crate::unit::{LoadedUnit, PathMap, ResolvedUnit};

/// Expands every placeholder in `text`.
///
/// # Errors
///
/// Returns `StackweaveError::InvalidPlaceholder` for a malformed token and
/// `StackweaveError::UnresolvedPlaceholder` for an identifier with no
/// binding.
pub fn substitute(text: &str, ctx: &BindingContext) -> Result<String> {
    let segments = lexer::segments(text).map_err(|e| StackweaveError::InvalidPlaceholder {
        unit: ctx.owner().to_string(),
        text: e.text,
    })?;

    let mut out = String::with_capacity(text.len());
    for segment in segments {
        match segment {
            Segment::Literal(literal) => out.push_str(literal),
            Segment::Placeholder(name) => {
                let value = ctx
                    .get(name)
                    .ok_or_else(|| StackweaveError::UnresolvedPlaceholder {
                        unit: ctx.owner().to_string(),
                        identifier: name.to_string(),
                    })?;
                out.push_str(value);
            }
        }
    }
    Ok(out)
}

/// Expands placeholders in every string leaf of `node`, in place.
///
/// # Errors
///
/// Returns the first substitution error.
pub fn resolve_node(node: &mut Node, ctx: &BindingContext) -> Result<()> {
    node.try_for_each_string_mut(&mut |s| {
        if lexer::has_token_syntax(s) {
            *s = substitute(s, ctx)?;
        }
        Ok(())
    })
}

/// Expands placeholders in every operation of a path mapping.
///
/// # Errors
///
/// Returns the first substitution error.
pub fn resolve_paths(paths: &mut PathMap, ctx: &BindingContext) -> Result<()> {
    paths
        .values_mut()
        .flat_map(NodeMap::values_mut)
        .try_for_each(|operation| resolve_node(operation, ctx))
}

/// Resolves one unit's fragment and, when present, a copy of the skeleton's
/// unit template against the unit's binding context.
///
/// # Errors
///
/// Returns the first substitution error, naming the unit.
pub fn resolve_unit(
    loaded: LoadedUnit,
    unit_template: Option<&Node>,
    globals: &GlobalBindings,
) -> Result<ResolvedUnit> {
    let LoadedUnit { unit, fragment } = loaded;
    let ctx = BindingContext::for_unit(&unit, globals);
    tracing::debug!(unit = %unit.name, "resolving placeholders");

    let base = match unit_template {
        Some(template) => {
            let mut base = template.clone();
            resolve_node(&mut base, &ctx)?;
            Some(base)
        }
        None => None,
    };

    let mut overrides = fragment.cfn;
    resolve_node(&mut overrides, &ctx)?;

    let mut paths = fragment.swagger;
    resolve_paths(&mut paths, &ctx)?;

    Ok(ResolvedUnit {
        unit,
        base,
        overrides,
        paths,
    })
}
