//! Extraction of reference-style links from composed documents.
//!
//! Only `Ref`, `Fn::GetAtt`, `Fn::Sub` and the `DependsOn` resource
//! attribute are understood. Every other intrinsic stays opaque, although
//! references nested inside its arguments are still found.

use std::collections::BTreeSet;

use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_until},
    sequence::delimited,
};

use crate::node::{Intrinsic, Node};

/// How a target is referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReferenceKind {
    /// `{"Ref": "X"}`; parameters and pseudo parameters are valid targets.
    Ref,
    /// `{"Fn::GetAtt": ["X", "Attr"]}`; only resources are valid targets.
    GetAtt,
    /// `${X}` inside `Fn::Sub`; same targets as `Ref`.
    SubRef,
    /// `${X.Attr}` inside `Fn::Sub`; same targets as `GetAtt`.
    SubGetAtt,
    /// `DependsOn` resource attribute; only resources are valid targets.
    DependsOn,
}

impl ReferenceKind {
    /// Returns `true` if only resources (not parameters) may be targeted.
    #[must_use]
    pub const fn requires_resource(self) -> bool {
        matches!(self, Self::GetAtt | Self::SubGetAtt | Self::DependsOn)
    }
}

/// A link from somewhere in a document to a logical name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Reference {
    /// Logical name being referenced.
    pub target: String,
    /// How it is referenced.
    pub kind: ReferenceKind,
}

/// Collects every reference found in `node`, in document order.
#[must_use]
pub fn collect(node: &Node) -> Vec<Reference> {
    let mut out = Vec::new();
    node.for_each_intrinsic(&mut |call| from_intrinsic(call, &mut out));
    out
}

/// Collects the targets of a resource's `DependsOn` attribute.
#[must_use]
pub fn depends_on(resource: &Node) -> Vec<Reference> {
    let targets: Vec<&str> = match resource.get("DependsOn") {
        Some(Node::String(target)) => vec![target.as_str()],
        Some(Node::Array(items)) => items.iter().filter_map(Node::as_str).collect(),
        _ => Vec::new(),
    };
    targets
        .into_iter()
        .map(|target| Reference {
            target: target.to_string(),
            kind: ReferenceKind::DependsOn,
        })
        .collect()
}

fn from_intrinsic(call: &Intrinsic, out: &mut Vec<Reference>) {
    match call.function.as_str() {
        "Ref" => {
            if let Some(target) = call.args.as_str() {
                out.push(Reference {
                    target: target.to_string(),
                    kind: ReferenceKind::Ref,
                });
            }
        }
        "Fn::GetAtt" => {
            let target = match call.args.as_ref() {
                Node::Array(items) => items.first().and_then(Node::as_str),
                Node::String(dotted) => dotted.split('.').next(),
                _ => None,
            };
            if let Some(target) = target.filter(|t| !t.is_empty()) {
                out.push(Reference {
                    target: target.to_string(),
                    kind: ReferenceKind::GetAtt,
                });
            }
        }
        "Fn::Sub" => match call.args.as_ref() {
            Node::String(template) => out.extend(sub_references(template, &BTreeSet::new())),
            Node::Array(items) => {
                if let Some(template) = items.first().and_then(Node::as_str) {
                    let locals: BTreeSet<&str> = items
                        .get(1)
                        .and_then(Node::as_object)
                        .map(|vars| vars.keys().map(String::as_str).collect())
                        .unwrap_or_default();
                    out.extend(sub_references(template, &locals));
                }
            }
            _ => {}
        },
        _ => {}
    }
}

/// Parses one `${...}` expression, returning its inner text.
fn variable(input: &str) -> IResult<&str, &str> {
    delimited(tag("${"), take_until("}"), tag("}")).parse(input)
}

fn until_variable(input: &str) -> IResult<&str, &str> {
    take_until("${").parse(input)
}

/// Lists the names referenced by `${...}` expressions in an `Fn::Sub`
/// template, skipping `${!literal}` escapes and names in `locals`.
#[must_use]
pub fn sub_references(template: &str, locals: &BTreeSet<&str>) -> Vec<Reference> {
    let mut out = Vec::new();
    let mut remaining = template;

    while let Ok((rest, _)) = until_variable(remaining) {
        let Ok((after, inner)) = variable(rest) else {
            break;
        };
        remaining = after;

        let inner = inner.trim();
        if inner.is_empty() || inner.starts_with('!') {
            continue;
        }
        let (target, kind) = match inner.split_once('.') {
            Some((name, _attribute)) => (name, ReferenceKind::SubGetAtt),
            None => (inner, ReferenceKind::SubRef),
        };
        if locals.contains(inner) || locals.contains(target) {
            continue;
        }
        out.push(Reference {
            target: target.to_string(),
            kind,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn targets(value: serde_json::Value) -> Vec<(String, ReferenceKind)> {
        collect(&Node::from(value))
            .into_iter()
            .map(|r| (r.target, r.kind))
            .collect()
    }

    #[test]
    fn ref_and_get_att_forms() {
        let found = targets(json!({
            "a": {"Ref": "Bucket"},
            "b": {"Fn::GetAtt": ["Role", "Arn"]},
            "c": {"Fn::GetAtt": "Queue.Arn"}
        }));
        assert_eq!(
            found,
            vec![
                ("Bucket".into(), ReferenceKind::Ref),
                ("Role".into(), ReferenceKind::GetAtt),
                ("Queue".into(), ReferenceKind::GetAtt),
            ]
        );
    }

    #[test]
    fn references_nested_in_opaque_intrinsics_are_found() {
        let found = targets(json!({"Fn::Join": ["", [{"Ref": "AWS::Region"}, {"Ref": "Api"}]]}));
        assert_eq!(
            found,
            vec![
                ("AWS::Region".into(), ReferenceKind::Ref),
                ("Api".into(), ReferenceKind::Ref),
            ]
        );
    }

    #[test]
    fn import_value_is_opaque() {
        assert!(targets(json!({"Fn::ImportValue": "network-stack-SubnetA"})).is_empty());
    }

    #[test]
    fn sub_string_form() {
        let found = targets(json!({
            "Fn::Sub": "arn:aws:apigateway:${AWS::Region}:lambda:path/2015-03-31/functions/${LambdaUnitA.Arn}/invocations"
        }));
        assert_eq!(
            found,
            vec![
                ("AWS::Region".into(), ReferenceKind::SubRef),
                ("LambdaUnitA".into(), ReferenceKind::SubGetAtt),
            ]
        );
    }

    #[test]
    fn sub_list_form_skips_local_variables() {
        let found = targets(json!({
            "Fn::Sub": ["${Prefix}-${Table}", {"Prefix": {"Ref": "Env"}}]
        }));
        assert_eq!(
            found,
            vec![
                ("Table".into(), ReferenceKind::SubRef),
                ("Env".into(), ReferenceKind::Ref),
            ]
        );
    }

    #[test]
    fn sub_escape_is_literal() {
        assert!(sub_references("${!NotAReference}", &BTreeSet::new()).is_empty());
    }

    #[test]
    fn unterminated_sub_variable_stops_scanning() {
        let found = sub_references("${Good}-${Bad", &BTreeSet::new());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].target, "Good");
    }

    #[test]
    fn depends_on_string_and_list() {
        let single = depends_on(&Node::from(json!({"DependsOn": "A"})));
        assert_eq!(single.len(), 1);
        let many = depends_on(&Node::from(json!({"DependsOn": ["A", "B"]})));
        let names: Vec<&str> = many.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(many.iter().all(|r| r.kind.requires_resource()));
    }
}
