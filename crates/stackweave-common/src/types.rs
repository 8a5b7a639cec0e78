//! Domain primitive types used across the stackweave workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StackweaveError};

/// Name of one deployable unit (function), unique within a run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitName(String);

impl UnitName {
    /// Creates a unit name after checking its character set.
    ///
    /// # Errors
    ///
    /// Returns `StackweaveError::MalformedFragment` if the name is empty or
    /// contains characters other than ASCII alphanumerics, `-` and `_`.
    pub fn parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(StackweaveError::malformed(name, "unit name is empty"));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(StackweaveError::malformed(
                name.clone(),
                format!("unit name contains invalid character '{bad}'"),
            ));
        }
        Ok(Self(name))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// CloudFormation logical resource id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogicalId(String);

impl LogicalId {
    /// Wraps an already-formed logical id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives the logical id of a unit: `prefix` followed by the unit name
    /// in `PascalCase`, split on `-` and `_`.
    ///
    /// `unit-a` and `unit_a` map to the same id.
    #[must_use]
    pub fn for_unit(prefix: &str, unit: &UnitName) -> Self {
        let mut id = String::from(prefix);
        for part in unit.as_str().split(['-', '_']).filter(|p| !p.is_empty()) {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                id.push(first.to_ascii_uppercase());
                id.extend(chars);
            }
        }
        Self(id)
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// HTTP method of an API operation, as spelled in a Swagger path item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// `get`
    Get,
    /// `put`
    Put,
    /// `post`
    Post,
    /// `delete`
    Delete,
    /// `options`
    Options,
    /// `head`
    Head,
    /// `patch`
    Patch,
    /// API Gateway catch-all `x-amazon-apigateway-any-method`.
    Any,
}

impl HttpMethod {
    /// Returns the canonical lowercase key used in Swagger path items.
    #[must_use]
    pub const fn as_key(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Delete => "delete",
            Self::Options => "options",
            Self::Head => "head",
            Self::Patch => "patch",
            Self::Any => "x-amazon-apigateway-any-method",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = StackweaveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "put" => Ok(Self::Put),
            "post" => Ok(Self::Post),
            "delete" => Ok(Self::Delete),
            "options" => Ok(Self::Options),
            "head" => Ok(Self::Head),
            "patch" => Ok(Self::Patch),
            "x-amazon-apigateway-any-method" => Ok(Self::Any),
            other => Err(StackweaveError::Config {
                message: format!("unknown HTTP method: {other}"),
            }),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Serialization format of emitted artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// YAML.
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = StackweaveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(StackweaveError::Config {
                message: format!("unknown output format: {other}"),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(name: &str) -> UnitName {
        UnitName::parse(name).expect("valid unit name")
    }

    #[test]
    fn unit_name_rejects_empty() {
        assert!(UnitName::parse("").is_err());
    }

    #[test]
    fn unit_name_rejects_slash() {
        let err = UnitName::parse("a/b").unwrap_err();
        assert!(err.to_string().contains("'/'"), "got: {err}");
    }

    #[test]
    fn logical_id_is_prefixed_pascal_case() {
        assert_eq!(
            LogicalId::for_unit("Lambda", &unit("get-values")).as_str(),
            "LambdaGetValues"
        );
        assert_eq!(
            LogicalId::for_unit("Lambda", &unit("init_load_proyect_lambda")).as_str(),
            "LambdaInitLoadProyectLambda"
        );
    }

    #[test]
    fn logical_id_collides_for_separator_variants() {
        let dash = LogicalId::for_unit("Fn", &unit("unit-a"));
        let underscore = LogicalId::for_unit("Fn", &unit("unit_a"));
        assert_eq!(dash, underscore);
    }

    #[test]
    fn logical_id_ignores_repeated_separators() {
        assert_eq!(
            LogicalId::for_unit("", &unit("a--b")).as_str(),
            "AB"
        );
    }

    #[test]
    fn http_method_parses_case_insensitively() {
        assert_eq!("GET".parse::<HttpMethod>().expect("get"), HttpMethod::Get);
        assert_eq!(
            "x-amazon-apigateway-any-method"
                .parse::<HttpMethod>()
                .expect("any"),
            HttpMethod::Any
        );
        assert!("parameters".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn output_format_accepts_yml_alias() {
        assert_eq!("yml".parse::<OutputFormat>().expect("yml"), OutputFormat::Yaml);
        assert_eq!(OutputFormat::default(), OutputFormat::Json);
    }
}
