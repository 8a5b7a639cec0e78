//! Binding contexts used to resolve placeholders.

use std::collections::BTreeMap;

use stackweave_common::config::ComposeConfig;

use crate::unit::Unit;

/// Process-wide bindings applied to every unit.
///
/// Built once from configuration and passed to the resolver explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalBindings {
    values: BTreeMap<String, String>,
}

impl GlobalBindings {
    /// Builds global bindings: configured extras first, then `env` and `app`.
    #[must_use]
    pub fn from_config(config: &ComposeConfig) -> Self {
        let mut values = config.globals.clone();
        let _ = values.insert("env".into(), config.environment.clone());
        let _ = values.insert("app".into(), config.app_name.clone());
        Self { values }
    }

    /// Builds global bindings from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the value bound to `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// The complete key to value mapping used to resolve one owner's document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingContext {
    owner: String,
    values: BTreeMap<String, String>,
}

impl BindingContext {
    /// Context holding only the global bindings, for shared documents.
    #[must_use]
    pub fn global(owner: impl Into<String>, globals: &GlobalBindings) -> Self {
        Self {
            owner: owner.into(),
            values: globals.values.clone(),
        }
    }

    /// Context of a unit. Later layers win: globals, then the unit's
    /// built-ins (`name`, `logical_id`, `code`, `handler`), then the unit's
    /// own `bindings`.
    #[must_use]
    pub fn for_unit(unit: &Unit, globals: &GlobalBindings) -> Self {
        let mut values = globals.values.clone();
        let builtins = [
            ("name", unit.name.as_str()),
            ("logical_id", unit.logical_id.as_str()),
            ("code", unit.code.as_str()),
            ("handler", unit.handler.as_str()),
        ];
        for (key, value) in builtins {
            let _ = values.insert(key.to_string(), value.to_string());
        }
        for (key, value) in &unit.bindings {
            if let Some(previous) = values.insert(key.clone(), value.clone()) {
                tracing::debug!(unit = %unit.name, key = %key, previous = %previous, "unit binding overrides inherited value");
            }
        }
        Self {
            owner: unit.name.as_str().to_string(),
            values,
        }
    }

    /// Owner name reported in resolution errors.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the value bound to `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}
