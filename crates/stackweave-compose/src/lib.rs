//! # stackweave-compose
//!
//! Composition of per-function serverless fragments into one deployable
//! CloudFormation template and one API document.
//!
//! Handles:
//! - **Loader**: Discovery and parsing of unit fragments, skeleton and base API.
//! - **Placeholder**: `{{identifier}}` lexing and substitution per binding context.
//! - **Merger**: Folding resources and routes with duplicate detection.
//! - **Validator**: Reference, cycle, residual-token and divergence checks.
//! - **Emitter**: Deterministic rendering and atomic writes.
//! - **Pipeline**: The [`pipeline::Composer`] tying the stages together.
//! - **Scaffold**: Creation of new unit fragments.

pub mod emitter;
pub mod graph;
pub mod loader;
pub mod merger;
pub mod node;
pub mod pipeline;
pub mod placeholder;
pub mod scaffold;
pub mod unit;
pub mod validator;
