//! Folding resolved documents into one resource mapping and one path mapping.
//!
//! Both mergers refuse to overwrite: a second owner claiming an existing
//! logical id or `(path, method)` slot fails the run and names both owners.

use std::collections::BTreeMap;
use std::str::FromStr;

use stackweave_common::constants;
use stackweave_common::error::{Result, StackweaveError};
use stackweave_common::types::HttpMethod;

use crate::node::{Node, NodeMap, deep_merge};
use crate::unit::{PathMap, ResolvedUnit};

/// One `(path, method)` pair and the owner that declared it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Route {
    /// URL path.
    pub path: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Unit (or `base-api`) that declared the route.
    pub owner: String,
}

/// Builds the composed resource mapping.
#[derive(Debug, Default)]
pub struct ResourceMerger {
    resources: NodeMap,
    owners: BTreeMap<String, String>,
}

impl ResourceMerger {
    /// Creates an empty merger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `resource` under `logical_id` on behalf of `owner`.
    ///
    /// # Errors
    ///
    /// Returns `StackweaveError::DuplicateResource` if the id is taken.
    pub fn insert(&mut self, logical_id: &str, owner: &str, resource: Node) -> Result<()> {
        if let Some(first) = self.owners.get(logical_id) {
            return Err(StackweaveError::DuplicateResource {
                logical_id: logical_id.to_string(),
                first: first.clone(),
                second: owner.to_string(),
            });
        }
        tracing::debug!(logical_id, owner, "merging resource");
        let _ = self.owners.insert(logical_id.to_string(), owner.to_string());
        let _ = self.resources.insert(logical_id.to_string(), resource);
        Ok(())
    }

    /// Inserts every shared resource declared by the skeleton.
    ///
    /// # Errors
    ///
    /// Returns `StackweaveError::DuplicateResource` on a collision.
    pub fn insert_shared(&mut self, resources: NodeMap) -> Result<()> {
        for (logical_id, resource) in resources {
            self.insert(&logical_id, constants::SKELETON_OWNER, resource)?;
        }
        Ok(())
    }

    /// Builds a unit's resource from its resolved template and overrides and
    /// inserts it under the unit's logical id.
    ///
    /// # Errors
    ///
    /// Returns `StackweaveError::DuplicateResource` on a collision.
    pub fn insert_unit(&mut self, unit: &ResolvedUnit) -> Result<()> {
        let resource = match &unit.base {
            Some(base) => {
                let mut resource = base.clone();
                deep_merge(&mut resource, unit.overrides.clone());
                resource
            }
            None => unit.overrides.clone(),
        };
        self.insert(
            unit.unit.logical_id.as_str(),
            unit.unit.name.as_str(),
            resource,
        )
    }

    /// Returns the merged resources and the owner of each logical id.
    #[must_use]
    pub fn finish(self) -> (NodeMap, BTreeMap<String, String>) {
        (self.resources, self.owners)
    }
}

/// Builds the composed path mapping.
#[derive(Debug, Default)]
pub struct RouteMerger {
    paths: PathMap,
    owners: BTreeMap<(String, String), String>,
    routes: Vec<Route>,
}

impl RouteMerger {
    /// Creates an empty merger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Unions `paths` into the mapping on behalf of `owner`.
    ///
    /// Method keys are lowercased. Distinct methods under one path merge into
    /// the same path item. Non-method keys (`parameters`, `x-*` extensions)
    /// may repeat only with an equal value.
    ///
    /// # Errors
    ///
    /// Returns `StackweaveError::DuplicateRoute` naming both owners if a slot
    /// is already taken.
    pub fn insert_paths(&mut self, owner: &str, paths: PathMap) -> Result<()> {
        for (path, item) in paths {
            for (key, value) in item {
                self.insert_slot(owner, &path, key, value)?;
            }
        }
        Ok(())
    }

    fn insert_slot(&mut self, owner: &str, path: &str, key: String, value: Node) -> Result<()> {
        let method = HttpMethod::from_str(&key).ok();
        let key = method.map_or(key, |m| m.as_key().to_string());
        let slot = (path.to_string(), key.clone());
        let item = self.paths.entry(path.to_string()).or_default();

        if let Some(first) = self.owners.get(&slot) {
            let identical = item.get(&key) == Some(&value);
            if method.is_some() || !identical {
                return Err(StackweaveError::DuplicateRoute {
                    path: path.to_string(),
                    method: key,
                    first: first.clone(),
                    second: owner.to_string(),
                });
            }
            return Ok(());
        }

        let _ = item.insert(key, value);
        let _ = self.owners.insert(slot, owner.to_string());
        if let Some(method) = method {
            tracing::debug!(path, %method, owner, "merging route");
            self.routes.push(Route {
                path: path.to_string(),
                method,
                owner: owner.to_string(),
            });
        }
        Ok(())
    }

    /// Returns the merged paths and the route table sorted by path then
    /// method.
    #[must_use]
    pub fn finish(self) -> (PathMap, Vec<Route>) {
        let mut routes = self.routes;
        routes.sort();
        (self.paths, routes)
    }
}
