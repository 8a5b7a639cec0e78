//! Creation of a new unit directory with a starter fragment.

use std::io::Write;
use std::path::PathBuf;

use serde_json::json;
use stackweave_common::config::ComposeConfig;
use stackweave_common::error::{Result, StackweaveError};
use stackweave_common::types::{LogicalId, UnitName};

use crate::loader;

/// Starter fragment for `name`: an empty `cfn` override of the skeleton's
/// unit template and one `get` route at `/<name>` proxied to the unit.
#[must_use]
pub fn starter_fragment(name: &UnitName, logical_id: &LogicalId) -> serde_json::Value {
    let uri = format!(
        "arn:aws:apigateway:${{AWS::Region}}:lambda:path/2015-03-31/functions/${{{logical_id}.Arn}}/invocations"
    );
    json!({
        "name": name.as_str(),
        "cfn": {},
        "swagger": {
            format!("/{name}"): {
                "get": {
                    "responses": {},
                    "x-amazon-apigateway-integration": {
                        "type": "aws_proxy",
                        "httpMethod": "POST",
                        "uri": { "Fn::Sub": uri }
                    }
                }
            }
        }
    })
}

/// Writes `<units_dir>/<name>/<fragment_file>.json` and returns its path.
///
/// # Errors
///
/// Returns `StackweaveError::MalformedFragment` for an invalid name,
/// `StackweaveError::Config` if the unit already has a fragment, and
/// `StackweaveError::Io` if the file cannot be written.
pub fn scaffold_unit(config: &ComposeConfig, name: &str) -> Result<PathBuf> {
    let name = UnitName::parse(name)?;
    let dir = config.units_dir.join(name.as_str());
    if let Some(existing) = loader::find_fragment(&dir, &config.fragment_file) {
        return Err(StackweaveError::Config {
            message: format!(
                "unit \"{name}\" already has a fragment at {}",
                existing.display()
            ),
        });
    }

    let logical_id = LogicalId::for_unit(&config.resource_prefix, &name);
    let mut content = serde_json::to_vec_pretty(&starter_fragment(&name, &logical_id))?;
    content.push(b'\n');

    std::fs::create_dir_all(&dir).map_err(|e| StackweaveError::io(&dir, e))?;
    let path = dir.join(format!("{}.json", config.fragment_file));
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| StackweaveError::io(&path, e))?;
    file.write_all(&content)
        .map_err(|e| StackweaveError::io(&path, e))?;

    tracing::info!(unit = %name, logical_id = %logical_id, path = %path.display(), "scaffolded unit");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(root: &std::path::Path) -> ComposeConfig {
        ComposeConfig {
            units_dir: root.join("units"),
            ..ComposeConfig::default()
        }
    }

    #[test]
    fn scaffolded_fragment_loads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config(dir.path());
        let path = scaffold_unit(&config, "orders-api").expect("scaffold");
        assert!(path.ends_with("units/orders-api/fragment.json"));

        let units = loader::load_units(&config).expect("load");
        assert_eq!(units.len(), 1);
        let unit = &units[0];
        assert_eq!(unit.unit.name.as_str(), "orders-api");
        assert_eq!(unit.unit.logical_id.as_str(), "LambdaOrdersApi");
        assert!(unit.fragment.swagger.contains_key("/orders-api"));
    }

    #[test]
    fn route_invokes_the_unit_function() {
        let name = UnitName::parse("unit-a").expect("name");
        let logical_id = LogicalId::for_unit("Lambda", &name);
        let fragment = starter_fragment(&name, &logical_id);
        let uri = fragment["swagger"]["/unit-a"]["get"]["x-amazon-apigateway-integration"]["uri"]
            ["Fn::Sub"]
            .as_str()
            .expect("uri");
        assert!(uri.contains("${LambdaUnitA.Arn}"), "got: {uri}");
        assert!(uri.contains("${AWS::Region}"), "got: {uri}");
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config(dir.path());
        let path = scaffold_unit(&config, "unit-a").expect("first");
        std::fs::write(&path, "{\"cfn\": {\"Keep\": true}}").expect("edit");

        let err = scaffold_unit(&config, "unit-a").unwrap_err();
        assert!(err.to_string().contains("already has a fragment"), "got: {err}");
        assert!(std::fs::read_to_string(&path).expect("read").contains("Keep"));
    }

    #[test]
    fn rejects_invalid_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = scaffold_unit(&config(dir.path()), "bad name").unwrap_err();
        assert!(matches!(err, StackweaveError::MalformedFragment { .. }));
    }
}
