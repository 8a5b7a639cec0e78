//! Fragment discovery and parsing.
//!
//! Every immediate subdirectory of the units directory that holds a fragment
//! document is one unit. Fragments, the skeleton and the base API document
//! may be JSON or YAML; the file extension decides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use stackweave_common::config::ComposeConfig;
use stackweave_common::constants;
use stackweave_common::error::{Result, StackweaveError};
use stackweave_common::types::{LogicalId, UnitName};

use crate::node::{Node, NodeMap};
use crate::unit::{BaseApi, Fragment, LoadedUnit, PathMap, Skeleton, Unit};

const FRAGMENT_KEYS: [&str; 6] = ["name", "code", "handler", "bindings", "cfn", "swagger"];

/// Reads and parses a JSON or YAML document.
///
/// # Errors
///
/// Returns `StackweaveError::Io` if the file cannot be read and
/// `StackweaveError::MalformedFragment` (owned by `owner`) if it does not
/// parse.
pub fn read_document(path: &Path, owner: &str) -> Result<Node> {
    let content = std::fs::read_to_string(path).map_err(|e| StackweaveError::io(path, e))?;
    parse_document(&content, is_yaml(path), owner)
}

/// Parses document text as YAML (`yaml == true`) or JSON.
///
/// # Errors
///
/// Returns `StackweaveError::MalformedFragment` owned by `owner` on any
/// syntax error.
pub fn parse_document(content: &str, yaml: bool, owner: &str) -> Result<Node> {
    if yaml {
        let value: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| StackweaveError::malformed(owner, format!("invalid YAML: {e}")))?;
        Node::from_yaml(value, owner)
    } else {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| StackweaveError::malformed(owner, format!("invalid JSON: {e}")))?;
        Ok(Node::from(value))
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

/// Returns the fragment document inside `dir`, trying each known extension.
#[must_use]
pub fn find_fragment(dir: &Path, stem: &str) -> Option<PathBuf> {
    constants::DOCUMENT_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|candidate| candidate.is_file())
}

/// Discovers and parses every unit under `config.units_dir`.
///
/// Units are returned sorted by name so that composition output does not
/// depend on directory iteration order.
///
/// # Errors
///
/// Returns `StackweaveError::Io` if the directory cannot be listed and
/// `StackweaveError::MalformedFragment` for the first invalid fragment.
pub fn load_units(config: &ComposeConfig) -> Result<Vec<LoadedUnit>> {
    let dir = &config.units_dir;
    tracing::info!(path = %dir.display(), "discovering unit fragments");

    let entries = std::fs::read_dir(dir).map_err(|e| StackweaveError::io(dir, e))?;
    let mut units = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StackweaveError::io(dir, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(fragment_path) = find_fragment(&path, &config.fragment_file) else {
            tracing::debug!(path = %path.display(), "no fragment in directory, skipping");
            continue;
        };
        let dir_name = entry.file_name().to_string_lossy().into_owned();
        let document = read_document(&fragment_path, &dir_name)?;
        units.push(parse_fragment(&dir_name, document, &fragment_path, config)?);
    }

    units.sort_by(|a, b| a.unit.name.cmp(&b.unit.name));
    tracing::info!(count = units.len(), "loaded unit fragments");
    Ok(units)
}

/// Builds a unit and its fragment from a parsed fragment document.
///
/// `dir_name` supplies the default unit name and code path.
///
/// # Errors
///
/// Returns `StackweaveError::MalformedFragment` if the document is not an
/// object, lacks a `cfn` object, has an ill-shaped `swagger` section,
/// carries unknown top-level keys, or sets `code`, `handler` or a binding to
/// a value containing `{{`.
pub fn parse_fragment(
    dir_name: &str,
    document: Node,
    source: &Path,
    config: &ComposeConfig,
) -> Result<LoadedUnit> {
    let mut map = expect_object(document, dir_name, "fragment")?;

    if let Some(unknown) = map.keys().find(|k| !FRAGMENT_KEYS.contains(&k.as_str())) {
        return Err(StackweaveError::malformed(
            dir_name,
            format!("unknown fragment key \"{unknown}\""),
        ));
    }

    let name = match take_string(&mut map, "name", dir_name)? {
        Some(name) => UnitName::parse(name)?,
        None => UnitName::parse(dir_name)?,
    };
    let owner = name.as_str().to_string();

    let cfn = match map.remove("cfn") {
        Some(cfn @ Node::Object(_)) => cfn,
        Some(other) => {
            return Err(StackweaveError::malformed(
                owner,
                format!("`cfn` must be an object, got {}", other.kind()),
            ));
        }
        None => return Err(StackweaveError::malformed(owner, "missing `cfn` section")),
    };

    let swagger = match map.remove("swagger") {
        None | Some(Node::Null) => PathMap::new(),
        Some(node) => parse_paths(node, &owner)?,
    };

    let code = take_string(&mut map, "code", &owner)?
        .unwrap_or_else(|| default_code_path(&config.code_root, dir_name));
    let handler =
        take_string(&mut map, "handler", &owner)?.unwrap_or_else(|| config.default_handler.clone());
    reject_placeholder_syntax(&owner, "`code`", &code)?;
    reject_placeholder_syntax(&owner, "`handler`", &handler)?;
    let bindings = match map.remove("bindings") {
        None | Some(Node::Null) => BTreeMap::new(),
        Some(node) => parse_bindings(node, &owner)?,
    };

    let logical_id = LogicalId::for_unit(&config.resource_prefix, &name);
    tracing::debug!(unit = %name, logical_id = %logical_id, routes = swagger.len(), "parsed fragment");

    Ok(LoadedUnit {
        unit: Unit {
            name,
            logical_id,
            code,
            handler,
            bindings,
            source: source.to_path_buf(),
        },
        fragment: Fragment { cfn, swagger },
    })
}

fn default_code_path(code_root: &str, dir_name: &str) -> String {
    let root = code_root.trim_end_matches('/');
    if root.is_empty() {
        dir_name.to_string()
    } else {
        format!("{root}/{dir_name}")
    }
}

fn expect_object(node: Node, owner: &str, what: &str) -> Result<NodeMap> {
    match node {
        Node::Object(map) => Ok(map),
        other => Err(StackweaveError::malformed(
            owner,
            format!("{what} must be an object, got {}", other.kind()),
        )),
    }
}

fn take_string(map: &mut NodeMap, key: &str, owner: &str) -> Result<Option<String>> {
    match map.remove(key) {
        None | Some(Node::Null) => Ok(None),
        Some(Node::String(s)) => Ok(Some(s)),
        Some(other) => Err(StackweaveError::malformed(
            owner,
            format!("`{key}` must be a string, got {}", other.kind()),
        )),
    }
}

fn parse_bindings(node: Node, owner: &str) -> Result<BTreeMap<String, String>> {
    expect_object(node, owner, "`bindings`")?
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Node::String(s) => s,
                Node::Number(n) => n.to_string(),
                Node::Bool(b) => b.to_string(),
                other => {
                    return Err(StackweaveError::malformed(
                        owner,
                        format!("binding \"{key}\" must be a scalar, got {}", other.kind()),
                    ));
                }
            };
            reject_placeholder_syntax(owner, &format!("binding \"{key}\""), &value)?;
            Ok((key, value))
        })
        .collect()
}

/// Values bound to placeholders are inserted verbatim and never rescanned,
/// so a `{{` inside one would survive into the output.
fn reject_placeholder_syntax(owner: &str, what: &str, value: &str) -> Result<()> {
    if value.contains(constants::PLACEHOLDER_OPEN) {
        return Err(StackweaveError::malformed(
            owner,
            format!("{what} must not contain placeholder syntax, got \"{value}\""),
        ));
    }
    Ok(())
}

/// Validates the shape of a path mapping: path to object of method or
/// extension keys.
///
/// # Errors
///
/// Returns `StackweaveError::MalformedFragment` owned by `owner` if the
/// mapping is not an object, a path does not start with `/`, or a path item
/// is not an object.
pub fn parse_paths(node: Node, owner: &str) -> Result<PathMap> {
    let mut paths = PathMap::new();
    for (path, item) in expect_object(node, owner, "`swagger`")? {
        if !path.starts_with('/') {
            return Err(StackweaveError::malformed(
                owner,
                format!("API path \"{path}\" must start with '/'"),
            ));
        }
        match item {
            Node::Object(methods) => {
                let _ = paths.insert(path, methods);
            }
            other => {
                return Err(StackweaveError::malformed(
                    owner,
                    format!("API path \"{path}\" must be an object, got {}", other.kind()),
                ));
            }
        }
    }
    Ok(paths)
}

/// Loads the shared CloudFormation skeleton.
///
/// # Errors
///
/// Returns `StackweaveError::Io` if the file cannot be read and
/// `StackweaveError::MalformedFragment` (owner `skeleton`) if it is not a
/// well-formed skeleton.
pub fn load_skeleton(path: &Path) -> Result<Skeleton> {
    tracing::info!(path = %path.display(), "loading skeleton template");
    split_skeleton(read_document(path, constants::SKELETON_OWNER)?)
}

/// Splits a parsed skeleton document into sections, shared resources and
/// the unit template.
///
/// # Errors
///
/// Returns `StackweaveError::MalformedFragment` if the document, its
/// `Resources`, or its unit template are not objects.
pub fn split_skeleton(document: Node) -> Result<Skeleton> {
    let owner = constants::SKELETON_OWNER;
    let mut sections = expect_object(document, owner, "skeleton")?;
    let resources = match sections.remove(constants::RESOURCES_KEY) {
        None | Some(Node::Null) => NodeMap::new(),
        Some(Node::Object(resources)) => resources,
        Some(other) => {
            return Err(StackweaveError::malformed(
                owner,
                format!("`Resources` must be an object, got {}", other.kind()),
            ));
        }
    };
    let unit_template = match sections.remove(constants::UNIT_TEMPLATE_KEY) {
        None | Some(Node::Null) => None,
        Some(template @ Node::Object(_)) => Some(template),
        Some(other) => {
            return Err(StackweaveError::malformed(
                owner,
                format!("`UnitTemplate` must be an object, got {}", other.kind()),
            ));
        }
    };
    Ok(Skeleton {
        sections,
        resources,
        unit_template,
    })
}

/// Loads the shared base API document.
///
/// # Errors
///
/// Returns `StackweaveError::Io` if the file cannot be read and
/// `StackweaveError::MalformedFragment` (owner `base-api`) if it is not an
/// object or its `paths` section is ill-shaped.
pub fn load_base_api(path: &Path) -> Result<BaseApi> {
    tracing::info!(path = %path.display(), "loading base API document");
    split_base_api(read_document(path, constants::BASE_API_OWNER)?)
}

/// Splits a parsed API document into global sections and paths.
///
/// # Errors
///
/// Returns `StackweaveError::MalformedFragment` if the document is not an
/// object or its `paths` section is ill-shaped.
pub fn split_base_api(document: Node) -> Result<BaseApi> {
    let owner = constants::BASE_API_OWNER;
    let mut sections = expect_object(document, owner, "base API document")?;
    let paths = match sections.remove(constants::PATHS_KEY) {
        None | Some(Node::Null) => PathMap::new(),
        Some(node) => parse_paths(node, owner)?,
    };
    Ok(BaseApi { sections, paths })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fragment(dir: &str, value: serde_json::Value) -> Result<LoadedUnit> {
        parse_fragment(
            dir,
            Node::from(value),
            Path::new("fragment.json"),
            &ComposeConfig::default(),
        )
    }

    fn write_unit(root: &Path, dir: &str, file: &str, content: &str) {
        let unit_dir = root.join(dir);
        std::fs::create_dir_all(&unit_dir).expect("mkdir");
        std::fs::write(unit_dir.join(file), content).expect("write");
    }

    #[test]
    fn fragment_defaults_come_from_directory_and_config() {
        let loaded = fragment("get_values", json!({"cfn": {}})).expect("parse");
        assert_eq!(loaded.unit.name.as_str(), "get_values");
        assert_eq!(loaded.unit.logical_id.as_str(), "LambdaGetValues");
        assert_eq!(loaded.unit.code, "src/lambdas/get_values");
        assert_eq!(loaded.unit.handler, "lambda_function.lambda_handler");
        assert!(loaded.fragment.swagger.is_empty());
    }

    #[test]
    fn fragment_explicit_fields_win() {
        let loaded = fragment(
            "dir",
            json!({
                "name": "unit-a",
                "code": "src/lambdas/a",
                "handler": "h.handle",
                "bindings": {"memory": 256, "tracing": true},
                "cfn": {"Type": "AWS::Serverless::Function"}
            }),
        )
        .expect("parse");
        assert_eq!(loaded.unit.name.as_str(), "unit-a");
        assert_eq!(loaded.unit.code, "src/lambdas/a");
        assert_eq!(loaded.unit.handler, "h.handle");
        assert_eq!(loaded.unit.bindings.get("memory").map(String::as_str), Some("256"));
        assert_eq!(loaded.unit.bindings.get("tracing").map(String::as_str), Some("true"));
    }

    #[test]
    fn binding_value_with_placeholder_syntax_is_malformed() {
        let err = fragment(
            "unit-a",
            json!({"cfn": {}, "bindings": {"desc": "literal {{x}}"}}),
        )
        .unwrap_err();
        match err {
            StackweaveError::MalformedFragment { unit, reason } => {
                assert_eq!(unit, "unit-a");
                assert!(reason.contains("binding \"desc\""), "got: {reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn handler_with_placeholder_syntax_is_malformed() {
        let err = fragment("unit-a", json!({"cfn": {}, "handler": "{{env}}.main"})).unwrap_err();
        assert!(err.to_string().contains("`handler`"), "got: {err}");
    }

    #[test]
    fn condition_attribute_in_cfn_is_accepted() {
        let loaded = fragment("unit-a", json!({"cfn": {"Condition": "IsProd"}})).expect("parse");
        assert_eq!(
            loaded.fragment.cfn.get("Condition"),
            Some(&Node::String("IsProd".into()))
        );
    }

    #[test]
    fn missing_cfn_names_the_unit() {
        let err = fragment("unit-a", json!({"swagger": {}})).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, StackweaveError::MalformedFragment { .. }));
        assert!(msg.contains("unit-a") && msg.contains("cfn"), "got: {msg}");
    }

    #[test]
    fn non_object_cfn_is_malformed() {
        let err = fragment("unit-a", json!({"cfn": ["not", "an", "object"]})).unwrap_err();
        assert!(err.to_string().contains("`cfn` must be an object"), "got: {err}");
    }

    #[test]
    fn intrinsic_shaped_cfn_is_malformed() {
        let err = fragment("unit-a", json!({"cfn": {"Fn::ImportValue": "x"}})).unwrap_err();
        assert!(matches!(err, StackweaveError::MalformedFragment { .. }));
    }

    #[test]
    fn unknown_key_is_malformed() {
        let err = fragment("unit-a", json!({"cfn": {}, "swager": {}})).unwrap_err();
        assert!(err.to_string().contains("swager"), "got: {err}");
    }

    #[test]
    fn swagger_path_must_start_with_slash() {
        let err = fragment("unit-a", json!({"cfn": {}, "swagger": {"a": {"get": {}}}})).unwrap_err();
        assert!(err.to_string().contains("must start with '/'"), "got: {err}");
    }

    #[test]
    fn swagger_path_item_must_be_object() {
        let err = fragment("unit-a", json!({"cfn": {}, "swagger": {"/a": "get"}})).unwrap_err();
        assert!(matches!(err, StackweaveError::MalformedFragment { .. }));
    }

    #[test]
    fn null_swagger_means_no_paths() {
        let loaded = fragment("unit-a", json!({"cfn": {}, "swagger": null})).expect("parse");
        assert!(loaded.fragment.swagger.is_empty());
    }

    #[test]
    fn load_units_sorts_and_skips_non_units() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_unit(dir.path(), "zeta", "fragment.json", r#"{"cfn": {}}"#);
        write_unit(dir.path(), "alpha", "fragment.yaml", "cfn: {}\nswagger:\n  /alpha:\n    get: {}\n");
        write_unit(dir.path(), "helpers", "utils.py", "print('not a unit')");
        std::fs::write(dir.path().join("README.md"), "docs").expect("write");

        let config = ComposeConfig {
            units_dir: dir.path().to_path_buf(),
            ..ComposeConfig::default()
        };
        let units = load_units(&config).expect("load");
        let names: Vec<&str> = units.iter().map(|u| u.unit.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert!(units[0].fragment.swagger.contains_key("/alpha"));
    }

    #[test]
    fn load_units_reports_malformed_json_with_unit_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_unit(dir.path(), "broken", "fragment.json", "{ \"cfn\": ");
        let config = ComposeConfig {
            units_dir: dir.path().to_path_buf(),
            ..ComposeConfig::default()
        };
        let err = load_units(&config).unwrap_err();
        assert!(matches!(err, StackweaveError::MalformedFragment { ref unit, .. } if unit == "broken"));
    }

    #[test]
    fn load_units_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ComposeConfig {
            units_dir: dir.path().join("absent"),
            ..ComposeConfig::default()
        };
        assert!(matches!(load_units(&config), Err(StackweaveError::Io { .. })));
    }

    #[test]
    fn skeleton_split_removes_resources_and_unit_template() {
        let skeleton = split_skeleton(Node::from(json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Parameters": {"Env": {"Type": "String"}},
            "Resources": {"Api": {"Type": "AWS::Serverless::Api"}},
            "UnitTemplate": {"Type": "AWS::Serverless::Function"}
        })))
        .expect("split");
        assert!(skeleton.resources.contains_key("Api"));
        assert!(skeleton.unit_template.is_some());
        assert!(!skeleton.sections.contains_key("Resources"));
        assert!(!skeleton.sections.contains_key("UnitTemplate"));
        assert!(skeleton.parameter_names().contains("Env"));
    }

    #[test]
    fn skeleton_without_resources_is_valid() {
        let skeleton = split_skeleton(Node::from(json!({"Parameters": {}}))).expect("split");
        assert!(skeleton.resources.is_empty());
        assert!(skeleton.unit_template.is_none());
    }

    #[test]
    fn base_api_split_keeps_global_sections() {
        let api = split_base_api(Node::from(json!({
            "swagger": "2.0",
            "securityDefinitions": {"cognito": {"type": "apiKey"}},
            "paths": {"/health": {"get": {}}}
        })))
        .expect("split");
        assert!(api.sections.contains_key("securityDefinitions"));
        assert!(api.paths.contains_key("/health"));
        assert!(!api.sections.contains_key("paths"));
    }
}
