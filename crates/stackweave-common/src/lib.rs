//! # stackweave-common
//!
//! Shared error taxonomy, domain newtypes, configuration model and
//! constants used across the stackweave workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
