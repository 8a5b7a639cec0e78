//! Detection of fragment values that override the skeleton's unit template.
//!
//! Fragments commonly repeat blocks such as `Environment` or `VpcConfig`
//! that the skeleton also declares. Both stay independently overridable; a
//! repeated block with a different value is reported, never silently picked.

use crate::node::Node;

/// A value in a unit's fragment that differs from the skeleton's.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Divergence {
    /// Unit holding the override.
    pub unit: String,
    /// Dotted path of the diverging value, e.g. `Properties.Environment`.
    pub path: String,
}

/// Lists dotted paths present in both trees whose values differ.
///
/// Objects on both sides are compared key by key; any other pair is
/// compared whole. Keys only present in `overlay` are additions, not
/// divergences.
#[must_use]
pub fn diverging_paths(base: &Node, overlay: &Node) -> Vec<String> {
    let mut out = Vec::new();
    walk(base, overlay, "", &mut out);
    out
}

fn walk(base: &Node, overlay: &Node, prefix: &str, out: &mut Vec<String>) {
    match (base, overlay) {
        (Node::Object(base_map), Node::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                if let Some(base_value) = base_map.get(key) {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    walk(base_value, overlay_value, &path, out);
                }
            }
        }
        _ if base != overlay => out.push(prefix.to_string()),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn paths(base: serde_json::Value, overlay: serde_json::Value) -> Vec<String> {
        diverging_paths(&Node::from(base), &Node::from(overlay))
    }

    #[test]
    fn identical_repeat_is_not_divergent() {
        let block = json!({"Properties": {"VpcConfig": {"SubnetIds": ["a", "b"]}}});
        assert!(paths(block.clone(), block).is_empty());
    }

    #[test]
    fn additions_are_not_divergent() {
        assert!(paths(json!({"Properties": {}}), json!({"Properties": {"MemorySize": 512}})).is_empty());
    }

    #[test]
    fn nested_difference_reports_leaf_path() {
        let found = paths(
            json!({"Properties": {"Environment": {"Variables": {"STAGE": "dev", "TZ": "UTC"}}}}),
            json!({"Properties": {"Environment": {"Variables": {"STAGE": "prod", "TZ": "UTC"}}}}),
        );
        assert_eq!(found, vec!["Properties.Environment.Variables.STAGE"]);
    }

    #[test]
    fn differing_lists_report_the_list() {
        let found = paths(
            json!({"Properties": {"Layers": ["a"]}}),
            json!({"Properties": {"Layers": ["a", "b"]}}),
        );
        assert_eq!(found, vec!["Properties.Layers"]);
    }

    #[test]
    fn intrinsic_replacing_literal_is_divergent() {
        let found = paths(
            json!({"Properties": {"Role": "arn:aws:iam::1:role/x"}}),
            json!({"Properties": {"Role": {"Fn::ImportValue": "iam-LambdaRole"}}}),
        );
        assert_eq!(found, vec!["Properties.Role"]);
    }
}
