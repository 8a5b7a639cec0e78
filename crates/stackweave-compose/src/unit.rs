//! Units, their raw fragments, and the shared documents they compose into.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use stackweave_common::types::{LogicalId, UnitName};

use crate::node::{Node, NodeMap};

/// API path mapping: URL path to path item (method or extension key to value).
pub type PathMap = BTreeMap<String, NodeMap>;

/// One deployable function, immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    /// Unique unit name.
    pub name: UnitName,
    /// Logical resource id derived from the name.
    pub logical_id: LogicalId,
    /// Code artifact path bound to `{{code}}`.
    pub code: String,
    /// Handler identifier bound to `{{handler}}`.
    pub handler: String,
    /// Unit-specific bindings, applied after every other binding.
    pub bindings: BTreeMap<String, String>,
    /// Fragment file the unit was loaded from.
    pub source: PathBuf,
}

/// The unresolved payload of a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Resource description (or overrides of the skeleton's unit template).
    pub cfn: Node,
    /// API paths declared by this unit; empty when the fragment has none.
    pub swagger: PathMap,
}

/// A unit paired with its fragment, as produced by the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedUnit {
    /// The unit.
    pub unit: Unit,
    /// Its raw fragment.
    pub fragment: Fragment,
}

/// A unit after placeholder resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedUnit {
    /// The unit.
    pub unit: Unit,
    /// Resolved skeleton unit template, if the skeleton has one.
    pub base: Option<Node>,
    /// Resolved fragment `cfn` section.
    pub overrides: Node,
    /// Resolved API paths.
    pub paths: PathMap,
}

/// The shared CloudFormation skeleton.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    /// Non-resource sections, copied to the output unchanged.
    pub sections: NodeMap,
    /// Shared resources declared by the skeleton itself.
    pub resources: NodeMap,
    /// Per-unit resource pattern containing placeholder tokens.
    pub unit_template: Option<Node>,
}

impl Skeleton {
    /// Names declared under the skeleton's `Parameters` section.
    #[must_use]
    pub fn parameter_names(&self) -> BTreeSet<String> {
        self.sections
            .get(stackweave_common::constants::PARAMETERS_KEY)
            .and_then(Node::as_object)
            .map(|params| params.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// The shared base API document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseApi {
    /// Global sections (security definitions, validators, info), unchanged.
    pub sections: NodeMap,
    /// Paths declared by the base document itself.
    pub paths: PathMap,
}
