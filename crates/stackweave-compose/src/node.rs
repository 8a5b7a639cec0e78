//! Document tree shared by every pipeline stage.
//!
//! Fragments, skeletons and API documents are all converted into [`Node`]s.
//! Objects are ordered maps, so serializing a tree is canonical. Values shaped
//! like CloudFormation intrinsic functions become [`Node::Intrinsic`] and are
//! copied through untouched by every stage except the validator, which only
//! looks at the reference-style ones.

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use stackweave_common::error::{Result, StackweaveError};

/// An object mapping with canonical (sorted) key order.
pub type NodeMap = BTreeMap<String, Node>;

/// One value of a composed or raw document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `null`
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Numeric literal.
    Number(serde_json::Number),
    /// String literal, the only kind of value placeholders are expanded in.
    String(String),
    /// Ordered list.
    Array(Vec<Node>),
    /// Plain object.
    Object(NodeMap),
    /// Opaque intrinsic function call (`Ref`, `Fn::*`, and `Condition`
    /// operands of the condition functions).
    Intrinsic(Intrinsic),
}

/// An intrinsic function call, kept as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct Intrinsic {
    /// Function key, e.g. `Ref` or `Fn::GetAtt`.
    pub function: String,
    /// Arguments in whatever shape the function takes.
    pub args: Box<Node>,
}

/// Returns `true` if `key` names an intrinsic function when it is the sole
/// key of an object.
///
/// `Condition` is not one of them: as a resource attribute it is a plain
/// key. It only names a condition call inside the operands of
/// `Fn::And`, `Fn::Or` and `Fn::Not` (see [`is_condition_function`]).
#[must_use]
pub fn is_intrinsic_key(key: &str) -> bool {
    key == "Ref" || key.starts_with("Fn::")
}

/// Returns `true` for the functions whose operands may be `{"Condition": name}`.
#[must_use]
pub fn is_condition_function(function: &str) -> bool {
    matches!(function, "Fn::And" | "Fn::Or" | "Fn::Not")
}

impl Intrinsic {
    /// Creates an intrinsic call.
    pub fn new(function: impl Into<String>, args: Node) -> Self {
        Self {
            function: function.into(),
            args: Box::new(args),
        }
    }
}

impl Node {
    /// Returns an empty object node.
    #[must_use]
    pub const fn empty_object() -> Self {
        Self::Object(BTreeMap::new())
    }

    /// Returns the string payload, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the object map, if this is an object.
    #[must_use]
    pub const fn as_object(&self) -> Option<&NodeMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the mutable object map, if this is an object.
    pub const fn as_object_mut(&mut self) -> Option<&mut NodeMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a key of an object node.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Short name of the node's kind, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Intrinsic(_) => "intrinsic function",
        }
    }

    /// Applies `f` to every string leaf, including those inside intrinsic
    /// arguments. Object keys are never visited.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first error produced by `f`.
    pub fn try_for_each_string_mut<F>(&mut self, f: &mut F) -> Result<()>
    where
        F: FnMut(&mut String) -> Result<()>,
    {
        match self {
            Self::String(s) => f(s),
            Self::Array(items) => items
                .iter_mut()
                .try_for_each(|item| item.try_for_each_string_mut(f)),
            Self::Object(map) => map
                .values_mut()
                .try_for_each(|item| item.try_for_each_string_mut(f)),
            Self::Intrinsic(call) => call.args.try_for_each_string_mut(f),
            Self::Null | Self::Bool(_) | Self::Number(_) => Ok(()),
        }
    }

    /// Calls `f` on every string leaf, including intrinsic arguments.
    pub fn for_each_string<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a str),
    {
        match self {
            Self::String(s) => f(s),
            Self::Array(items) => items.iter().for_each(|item| item.for_each_string(f)),
            Self::Object(map) => map.values().for_each(|item| item.for_each_string(f)),
            Self::Intrinsic(call) => call.args.for_each_string(f),
            Self::Null | Self::Bool(_) | Self::Number(_) => {}
        }
    }

    /// Calls `f` on every intrinsic call in the tree, outermost first.
    pub fn for_each_intrinsic<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Intrinsic),
    {
        match self {
            Self::Array(items) => items.iter().for_each(|item| item.for_each_intrinsic(f)),
            Self::Object(map) => map.values().for_each(|item| item.for_each_intrinsic(f)),
            Self::Intrinsic(call) => {
                f(call);
                call.args.for_each_intrinsic(f);
            }
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_) => {}
        }
    }

    /// Converts a YAML document, expanding CloudFormation short-form tags
    /// (`!Ref`, `!GetAtt`, `!Sub`, ...) into their long form.
    ///
    /// # Errors
    ///
    /// Returns `StackweaveError::MalformedFragment` (owned by `owner`) for
    /// non-string mapping keys and non-finite numbers.
    pub fn from_yaml(value: serde_yaml::Value, owner: &str) -> Result<Self> {
        use serde_yaml::Value as Yaml;

        Ok(match value {
            Yaml::Null => Self::Null,
            Yaml::Bool(b) => Self::Bool(b),
            Yaml::Number(n) => Self::Number(yaml_number(&n, owner)?),
            Yaml::String(s) => Self::String(s),
            Yaml::Sequence(items) => Self::Array(
                items
                    .into_iter()
                    .map(|item| Self::from_yaml(item, owner))
                    .collect::<Result<_>>()?,
            ),
            Yaml::Mapping(mapping) => {
                let mut map = NodeMap::new();
                for (key, item) in mapping {
                    let key = match key {
                        Yaml::String(key) => key,
                        other => {
                            return Err(StackweaveError::malformed(
                                owner,
                                format!("mapping key must be a string, got {other:?}"),
                            ));
                        }
                    };
                    let _ = map.insert(key, Self::from_yaml(item, owner)?);
                }
                Self::from_map(map)
            }
            Yaml::Tagged(tagged) => {
                let tag = tagged.tag.to_string();
                let name = tag.trim_start_matches('!');
                let function = if name == "Ref" || name == "Condition" {
                    name.to_string()
                } else {
                    format!("Fn::{name}")
                };
                Self::Intrinsic(Intrinsic::new(function, Self::from_yaml(tagged.value, owner)?))
            }
        })
    }

    fn from_map(map: NodeMap) -> Self {
        if map.len() == 1 {
            let is_call = map.keys().next().is_some_and(|k| is_intrinsic_key(k));
            if is_call {
                if let Some((function, mut args)) = map.into_iter().next() {
                    if is_condition_function(&function) {
                        if let Self::Array(operands) = &mut args {
                            operands.iter_mut().for_each(Self::lift_condition);
                        }
                    }
                    return Self::Intrinsic(Intrinsic::new(function, args));
                }
                return Self::empty_object();
            }
        }
        Self::Object(map)
    }

    /// Turns a `{"Condition": name}` operand into a `Condition` call.
    fn lift_condition(operand: &mut Self) {
        let Self::Object(map) = operand else {
            return;
        };
        if map.len() != 1 {
            return;
        }
        if let Some(name) = map.remove("Condition") {
            *operand = Self::Intrinsic(Intrinsic::new("Condition", name));
        }
    }
}

fn yaml_number(n: &serde_yaml::Number, owner: &str) -> Result<serde_json::Number> {
    if let Some(i) = n.as_i64() {
        return Ok(i.into());
    }
    if let Some(u) = n.as_u64() {
        return Ok(u.into());
    }
    n.as_f64()
        .and_then(serde_json::Number::from_f64)
        .ok_or_else(|| StackweaveError::malformed(owner, format!("non-finite number {n}")))
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(object) => {
                Self::from_map(object.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, item) in map {
                    out.serialize_entry(key, item)?;
                }
                out.end()
            }
            Self::Intrinsic(call) => {
                let mut out = serializer.serialize_map(Some(1))?;
                out.serialize_entry(&call.function, call.args.as_ref())?;
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

/// Merges `overlay` into `base`.
///
/// Objects merge key by key, recursively. Any other overlay value, including
/// an intrinsic call, replaces the base value wholesale.
pub fn deep_merge(base: &mut Node, overlay: Node) {
    match (base, overlay) {
        (Node::Object(base_map), Node::Object(overlay_map)) => {
            for (key, item) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, item),
                    None => {
                        let _ = base_map.insert(key, item);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
