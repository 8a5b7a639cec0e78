//! The composition pipeline: Loader, Resolver, Merger, Validator, Emitter.
//!
//! Stages run strictly in sequence and the first error aborts the run.
//! Nothing is written until every stage before the emitter has succeeded.

use stackweave_common::config::ComposeConfig;
use stackweave_common::constants;
use stackweave_common::error::{Result, StackweaveError};

use crate::emitter::{self, Emitted};
use crate::loader;
use crate::merger::{ResourceMerger, Route, RouteMerger};
use crate::node::{Node, NodeMap};
use crate::placeholder::{self, BindingContext, GlobalBindings};
use crate::unit::{BaseApi, LoadedUnit, ResolvedUnit, Skeleton};
use crate::validator::{self, Divergence, ValidationInput};

/// Raw inputs of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs {
    /// Shared CloudFormation skeleton.
    pub skeleton: Skeleton,
    /// Shared base API document.
    pub base_api: BaseApi,
    /// Units in load order.
    pub units: Vec<LoadedUnit>,
}

/// Summary of a composition run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositionReport {
    /// Unit names in load order.
    pub units: Vec<String>,
    /// Logical resource ids in creation order.
    pub resources: Vec<String>,
    /// Merged routes sorted by path and method.
    pub routes: Vec<Route>,
    /// Skeleton values overridden by fragments with a different value.
    pub divergences: Vec<Divergence>,
    /// Artifacts written by [`Composer::run`]; empty after
    /// [`Composer::compose`].
    pub emitted: Vec<Emitted>,
}

/// The composed documents, held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    /// Composed CloudFormation document.
    pub template: Node,
    /// Composed API document.
    pub api: Node,
    /// Run summary.
    pub report: CompositionReport,
}

/// Runs the composition pipeline for one configuration.
#[derive(Debug, Clone)]
pub struct Composer {
    config: ComposeConfig,
    globals: GlobalBindings,
}

impl Composer {
    /// Creates a composer after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns `StackweaveError::Config` if the configuration is invalid.
    pub fn new(config: ComposeConfig) -> Result<Self> {
        config.validate()?;
        let globals = GlobalBindings::from_config(&config);
        Ok(Self { config, globals })
    }

    /// Returns the configuration this composer runs with.
    #[must_use]
    pub const fn config(&self) -> &ComposeConfig {
        &self.config
    }

    /// Loads every input named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first `Io` or `MalformedFragment` error.
    pub fn load(&self) -> Result<Inputs> {
        Ok(Inputs {
            skeleton: loader::load_skeleton(&self.config.skeleton)?,
            base_api: loader::load_base_api(&self.config.base_api)?,
            units: loader::load_units(&self.config)?,
        })
    }

    /// Loads, resolves, merges and validates without writing anything.
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage.
    pub fn compose(&self) -> Result<Composition> {
        self.compose_inputs(self.load()?)
    }

    /// Composes, then writes both artifacts atomically.
    ///
    /// Both artifacts are rendered before the first write.
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage; prior outputs stay in place.
    pub fn run(&self) -> Result<Composition> {
        let mut composition = self.compose()?;
        let artifacts = [
            emitter::prepare(
                &self.config.output_template,
                &composition.template,
                self.config.format,
            )?,
            emitter::prepare(&self.config.output_api, &composition.api, self.config.format)?,
        ];
        composition.report.emitted = emitter::emit_all(&artifacts)?;
        Ok(composition)
    }

    /// Resolves, merges and validates already-loaded inputs.
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage.
    pub fn compose_inputs(&self, inputs: Inputs) -> Result<Composition> {
        let Inputs {
            skeleton,
            base_api,
            units,
        } = inputs;
        let unit_names: Vec<String> = units
            .iter()
            .map(|u| u.unit.name.as_str().to_string())
            .collect();
        tracing::info!(units = unit_names.len(), "composing");

        let resolved = self.resolve(units, skeleton.unit_template.as_ref())?;

        let global_ctx = BindingContext::global(constants::SKELETON_OWNER, &self.globals);
        let mut shared = Node::Object(skeleton.resources.clone());
        placeholder::resolve_node(&mut shared, &global_ctx)?;

        let mut base_paths = base_api.paths.clone();
        let api_ctx = BindingContext::global(constants::BASE_API_OWNER, &self.globals);
        placeholder::resolve_paths(&mut base_paths, &api_ctx)?;

        let mut resources = ResourceMerger::new();
        if let Node::Object(shared) = shared {
            resources.insert_shared(shared)?;
        }
        let mut routes = RouteMerger::new();
        routes.insert_paths(constants::BASE_API_OWNER, base_paths)?;
        for unit in &resolved {
            resources.insert_unit(unit)?;
            routes.insert_paths(unit.unit.name.as_str(), unit.paths.clone())?;
        }
        let (resources, owners) = resources.finish();
        let (paths, route_table) = routes.finish();

        let parameters = skeleton.parameter_names();
        let validation = validator::validate(&ValidationInput {
            resources: &resources,
            sections: &skeleton.sections,
            owners: &owners,
            parameters: &parameters,
            paths: &paths,
            units: &resolved,
            strict_divergence: self.config.strict_divergence,
        })?;

        let mut api_doc = base_api.sections;
        let _ = api_doc.insert(
            constants::PATHS_KEY.to_string(),
            Node::Object(paths.into_iter().map(|(p, item)| (p, Node::Object(item))).collect()),
        );
        let api = Node::Object(api_doc);

        let mut template_doc = skeleton.sections;
        let _ = template_doc.insert(constants::RESOURCES_KEY.to_string(), Node::Object(resources));
        if let Some(target) = &self.config.embed_api_in {
            embed_api(&mut template_doc, target, &api)?;
        }

        tracing::info!(
            resources = owners.len(),
            routes = route_table.len(),
            divergences = validation.divergences.len(),
            "composition complete"
        );
        Ok(Composition {
            template: Node::Object(template_doc),
            api,
            report: CompositionReport {
                units: unit_names,
                resources: validation.creation_order,
                routes: route_table,
                divergences: validation.divergences,
                emitted: Vec::new(),
            },
        })
    }

    fn resolve(
        &self,
        units: Vec<LoadedUnit>,
        unit_template: Option<&Node>,
    ) -> Result<Vec<ResolvedUnit>> {
        units
            .into_iter()
            .map(|unit| placeholder::resolve_unit(unit, unit_template, &self.globals))
            .collect()
    }
}

/// Places the composed API document at `Properties.DefinitionBody` of the
/// `target` resource.
fn embed_api(template: &mut NodeMap, target: &str, api: &Node) -> Result<()> {
    let resource = template
        .get_mut(constants::RESOURCES_KEY)
        .and_then(Node::as_object_mut)
        .and_then(|resources| resources.get_mut(target))
        .and_then(Node::as_object_mut)
        .ok_or_else(|| StackweaveError::Config {
            message: format!("embed_api_in names unknown resource \"{target}\""),
        })?;
    let properties = resource
        .entry("Properties".to_string())
        .or_insert_with(Node::empty_object);
    let Some(properties) = properties.as_object_mut() else {
        return Err(StackweaveError::Config {
            message: format!("resource \"{target}\" has non-object Properties; cannot embed API"),
        });
    };
    let _ = properties.insert("DefinitionBody".to_string(), api.clone());
    tracing::debug!(resource = target, "embedded API document");
    Ok(())
}
