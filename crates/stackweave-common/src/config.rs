//! Project configuration model for a composition run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, StackweaveError};
use crate::types::OutputFormat;

/// Root configuration of one composition run.
///
/// Every field has a default so a project file only needs to list what it
/// changes. CLI flags override individual fields after loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComposeConfig {
    /// Directory holding one subdirectory per unit.
    pub units_dir: PathBuf,
    /// File stem of each unit's fragment document.
    pub fragment_file: String,
    /// Shared CloudFormation skeleton.
    pub skeleton: PathBuf,
    /// Shared base API document.
    pub base_api: PathBuf,
    /// Destination of the composed CloudFormation document.
    pub output_template: PathBuf,
    /// Destination of the composed API document.
    pub output_api: PathBuf,
    /// Environment name bound to `{{env}}` for every unit.
    pub environment: String,
    /// Application name bound to `{{app}}` for every unit.
    pub app_name: String,
    /// Prefix of every unit's logical resource id.
    pub resource_prefix: String,
    /// Root prepended to a unit's directory name when its fragment has no
    /// explicit `code` path.
    pub code_root: String,
    /// Handler used when a fragment has no explicit `handler`.
    pub default_handler: String,
    /// Extra process-wide bindings applied to every unit.
    pub globals: BTreeMap<String, String>,
    /// Serialization format of both artifacts.
    pub format: OutputFormat,
    /// Turn skeleton/fragment divergences into hard errors.
    pub strict_divergence: bool,
    /// Skeleton resource whose `Properties.DefinitionBody` receives the
    /// composed API document.
    pub embed_api_in: Option<String>,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            units_dir: PathBuf::from(constants::DEFAULT_UNITS_DIR),
            fragment_file: constants::DEFAULT_FRAGMENT_STEM.to_string(),
            skeleton: PathBuf::from(constants::DEFAULT_SKELETON),
            base_api: PathBuf::from(constants::DEFAULT_BASE_API),
            output_template: PathBuf::from(constants::DEFAULT_OUTPUT_TEMPLATE),
            output_api: PathBuf::from(constants::DEFAULT_OUTPUT_API),
            environment: "dev".to_string(),
            app_name: constants::APP_NAME.to_string(),
            resource_prefix: constants::DEFAULT_RESOURCE_PREFIX.to_string(),
            code_root: constants::DEFAULT_UNITS_DIR.to_string(),
            default_handler: constants::DEFAULT_HANDLER.to_string(),
            globals: BTreeMap::new(),
            format: OutputFormat::default(),
            strict_divergence: false,
            embed_api_in: None,
        }
    }
}

impl ComposeConfig {
    /// Loads a project file (YAML or JSON) and validates it.
    ///
    /// Relative paths inside the file are resolved against the file's
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns `StackweaveError::Io` if the file cannot be read and
    /// `StackweaveError::Config` if it cannot be parsed or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading project configuration");
        let content =
            std::fs::read_to_string(path).map_err(|e| StackweaveError::io(path, e))?;
        let mut config = Self::from_str_content(&content)?;
        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.rebase(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from YAML or JSON text without validating it.
    ///
    /// # Errors
    ///
    /// Returns `StackweaveError::Config` if the text does not match the schema.
    pub fn from_str_content(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| StackweaveError::Config {
            message: format!("cannot parse project configuration: {e}"),
        })
    }

    /// Checks values that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `StackweaveError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.environment.trim().is_empty() {
            return Err(config_err("environment must not be empty"));
        }
        if self.app_name.trim().is_empty() {
            return Err(config_err("app_name must not be empty"));
        }
        if !self.resource_prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(config_err(format!(
                "resource_prefix must be alphanumeric, got \"{}\"",
                self.resource_prefix
            )));
        }
        if self
            .resource_prefix
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
        {
            return Err(config_err("resource_prefix must not start with a digit"));
        }
        if self.fragment_file.is_empty() || self.fragment_file.contains(['/', '\\']) {
            return Err(config_err(format!(
                "fragment_file must be a bare file stem, got \"{}\"",
                self.fragment_file
            )));
        }
        if self.output_template == self.output_api {
            return Err(config_err(
                "output_template and output_api must be different paths",
            ));
        }
        self.check_bound_values()
    }

    /// Bound values are inserted verbatim, so none may carry `{{`.
    fn check_bound_values(&self) -> Result<()> {
        let fixed = [
            ("environment", &self.environment),
            ("app_name", &self.app_name),
            ("code_root", &self.code_root),
            ("default_handler", &self.default_handler),
        ];
        let globals = self
            .globals
            .iter()
            .map(|(key, value)| (key.as_str(), value));
        for (field, value) in fixed.into_iter().chain(globals) {
            if value.contains(constants::PLACEHOLDER_OPEN) {
                return Err(config_err(format!(
                    "{field} must not contain placeholder syntax, got \"{value}\""
                )));
            }
        }
        Ok(())
    }

    fn rebase(&mut self, base: &Path) {
        for path in [
            &mut self.units_dir,
            &mut self.skeleton,
            &mut self.base_api,
            &mut self.output_template,
            &mut self.output_api,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

fn config_err(message: impl Into<String>) -> StackweaveError {
    StackweaveError::Config {
        message: message.into(),
    }
}
