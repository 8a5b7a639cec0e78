//! Post-merge consistency checks.
//!
//! Runs after the merger and before anything is emitted. Checks, in order:
//!
//! 1. Every resource is an object with a string `Type`.
//! 2. No placeholder token survives resolution.
//! 3. Every `Ref`, `Fn::GetAtt`, `Fn::Sub` and `DependsOn` target exists.
//! 4. References in the other template sections (`Outputs`, `Conditions`,
//!    `Metadata`, ...) and inside API operations resolve the same way.
//! 5. Resources do not reference each other in a cycle.
//! 6. Fragment values that diverge from the skeleton's unit template are
//!    reported (or rejected in strict mode).

pub mod divergence;
pub mod references;

use std::collections::{BTreeMap, BTreeSet};

use stackweave_common::constants::PSEUDO_PARAMETER_PREFIX;
use stackweave_common::error::{Result, StackweaveError};

pub use self::divergence::Divergence;
use self::references::Reference;
use crate::graph::ReferenceGraph;
use crate::node::{Node, NodeMap};
use crate::placeholder::lexer::{self, Segment};
use crate::unit::{PathMap, ResolvedUnit};

/// Everything the validator looks at.
#[derive(Debug, Clone, Copy)]
pub struct ValidationInput<'a> {
    /// Composed resource mapping.
    pub resources: &'a NodeMap,
    /// Non-resource template sections, keyed by section name.
    pub sections: &'a NodeMap,
    /// Owner of each logical id, for error messages.
    pub owners: &'a BTreeMap<String, String>,
    /// Names declared in the skeleton's `Parameters`.
    pub parameters: &'a BTreeSet<String>,
    /// Composed API paths.
    pub paths: &'a PathMap,
    /// Resolved units, for divergence detection.
    pub units: &'a [ResolvedUnit],
    /// Fail on the first divergence instead of reporting it.
    pub strict_divergence: bool,
}

/// Findings of a successful validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Resources ordered so that referenced resources come first.
    pub creation_order: Vec<String>,
    /// Skeleton values overridden with a different value by a fragment.
    pub divergences: Vec<Divergence>,
}

/// Validates the composed documents.
///
/// # Errors
///
/// Returns the first failure: `MalformedFragment`, `UnresolvedPlaceholder`,
/// `DanglingReference`, `CircularDependency` or (strict mode)
/// `DivergentOverride`.
pub fn validate(input: &ValidationInput<'_>) -> Result<ValidationReport> {
    tracing::info!(
        resources = input.resources.len(),
        paths = input.paths.len(),
        "validating composed documents"
    );
    check_structure(input)?;
    check_residual_tokens(input)?;
    let graph = check_resource_references(input)?;
    check_section_references(input)?;
    check_api_references(input)?;
    let creation_order = graph.creation_order()?;
    let divergences = check_divergences(input.units, input.strict_divergence)?;
    Ok(ValidationReport {
        creation_order,
        divergences,
    })
}

fn owner_of<'a>(input: &'a ValidationInput<'_>, logical_id: &'a str) -> &'a str {
    input
        .owners
        .get(logical_id)
        .map_or(logical_id, String::as_str)
}

fn check_structure(input: &ValidationInput<'_>) -> Result<()> {
    for (logical_id, resource) in input.resources {
        let malformed = |reason: String| {
            StackweaveError::malformed(owner_of(input, logical_id), format!("resource \"{logical_id}\" {reason}"))
        };
        let Node::Object(fields) = resource else {
            return Err(malformed(format!("must be an object, got {}", resource.kind())));
        };
        match fields.get("Type") {
            Some(Node::String(kind)) if !kind.is_empty() => {}
            Some(other) => {
                return Err(malformed(format!("has a non-string `Type` ({})", other.kind())));
            }
            None => return Err(malformed("has no `Type`".to_string())),
        }
        if let Some(properties) = fields.get("Properties") {
            if !matches!(properties, Node::Object(_) | Node::Intrinsic(_)) {
                return Err(malformed(format!(
                    "has `Properties` of kind {}",
                    properties.kind()
                )));
            }
        }
    }
    Ok(())
}

fn residual_token(node: &Node) -> Option<String> {
    let mut found = None;
    node.for_each_string(&mut |s| {
        if found.is_none() && lexer::has_token_syntax(s) {
            let name = match lexer::segments(s) {
                Ok(segments) => segments.into_iter().find_map(|seg| match seg {
                    Segment::Placeholder(name) => Some(name.to_string()),
                    Segment::Literal(_) => None,
                }),
                Err(e) => Some(e.text),
            };
            found = Some(name.unwrap_or_else(|| s.to_string()));
        }
    });
    found
}

fn check_residual_tokens(input: &ValidationInput<'_>) -> Result<()> {
    for (logical_id, resource) in input.resources {
        if let Some(identifier) = residual_token(resource) {
            return Err(StackweaveError::UnresolvedPlaceholder {
                unit: owner_of(input, logical_id).to_string(),
                identifier,
            });
        }
    }
    for (path, item) in input.paths {
        for (key, operation) in item {
            if let Some(identifier) = residual_token(operation) {
                return Err(StackweaveError::UnresolvedPlaceholder {
                    unit: format!("paths.{path}.{key}"),
                    identifier,
                });
            }
        }
    }
    Ok(())
}

fn is_declared(input: &ValidationInput<'_>, reference: &Reference) -> bool {
    if input.resources.contains_key(&reference.target) {
        return true;
    }
    !reference.kind.requires_resource()
        && (input.parameters.contains(&reference.target)
            || reference.target.starts_with(PSEUDO_PARAMETER_PREFIX))
}

fn check_resource_references(input: &ValidationInput<'_>) -> Result<ReferenceGraph> {
    let mut graph = ReferenceGraph::new();
    for logical_id in input.resources.keys() {
        let _ = graph.add_resource(logical_id);
    }

    for (logical_id, resource) in input.resources {
        let mut found = references::collect(resource);
        found.extend(references::depends_on(resource));
        for reference in found {
            if !is_declared(input, &reference) {
                return Err(StackweaveError::DanglingReference {
                    resource: logical_id.clone(),
                    target: reference.target,
                });
            }
            if input.resources.contains_key(&reference.target) {
                graph.add_reference(logical_id, &reference.target);
            }
        }
    }
    Ok(graph)
}

fn check_section_references(input: &ValidationInput<'_>) -> Result<()> {
    for (section, content) in input.sections {
        let entries: Vec<(String, &Node)> = match content {
            Node::Object(entries) => entries
                .iter()
                .map(|(key, value)| (format!("{section}.{key}"), value))
                .collect(),
            other => vec![(section.clone(), other)],
        };
        for (location, value) in entries {
            if let Some(reference) = references::collect(value)
                .into_iter()
                .find(|r| !is_declared(input, r))
            {
                return Err(StackweaveError::DanglingReference {
                    resource: location,
                    target: reference.target,
                });
            }
        }
    }
    Ok(())
}

fn check_api_references(input: &ValidationInput<'_>) -> Result<()> {
    for (path, item) in input.paths {
        for (key, operation) in item {
            if let Some(reference) = references::collect(operation)
                .into_iter()
                .find(|r| !is_declared(input, r))
            {
                return Err(StackweaveError::DanglingReference {
                    resource: format!("paths.{path}.{key}"),
                    target: reference.target,
                });
            }
        }
    }
    Ok(())
}

fn check_divergences(units: &[ResolvedUnit], strict: bool) -> Result<Vec<Divergence>> {
    let mut out = Vec::new();
    for resolved in units {
        let Some(base) = &resolved.base else {
            continue;
        };
        for path in divergence::diverging_paths(base, &resolved.overrides) {
            let unit = resolved.unit.name.as_str().to_string();
            if strict {
                return Err(StackweaveError::DivergentOverride { unit, path });
            }
            tracing::warn!(unit = %unit, path = %path, "fragment overrides skeleton value with a different value");
            out.push(Divergence { unit, path });
        }
    }
    Ok(out)
}
