//! Resource reference graph using `petgraph`.
//!
//! Nodes are logical resource ids; an edge points from a referenced
//! resource to the resource that references it, so a topological sort
//! yields creation order.

use std::collections::BTreeMap;

use petgraph::graph::NodeIndex;
use stackweave_common::error::{Result, StackweaveError};

/// Directed graph of resource-to-resource references.
#[derive(Debug, Default)]
pub struct ReferenceGraph {
    graph: petgraph::Graph<String, ()>,
    index: BTreeMap<String, NodeIndex>,
}

impl ReferenceGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource node, returning the existing index if already present.
    pub fn add_resource(&mut self, logical_id: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(logical_id) {
            return idx;
        }
        let idx = self.graph.add_node(logical_id.to_string());
        let _ = self.index.insert(logical_id.to_string(), idx);
        idx
    }

    /// Records that `referrer` references `target`.
    pub fn add_reference(&mut self, referrer: &str, target: &str) {
        let from = self.add_resource(target);
        let to = self.add_resource(referrer);
        if !self.graph.contains_edge(from, to) {
            let _ = self.graph.add_edge(from, to, ());
        }
    }

    /// Returns resources in creation order: every resource appears after the
    /// resources it references. Identical input yields identical order.
    ///
    /// # Errors
    ///
    /// Returns `StackweaveError::CircularDependency` naming the resources of
    /// one cycle, sorted, with the first repeated at the end.
    pub fn creation_order(&self) -> Result<Vec<String>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(_cycle) => Err(StackweaveError::CircularDependency {
                resources: self.first_cycle(),
            }),
        }
    }

    fn first_cycle(&self) -> Vec<String> {
        let mut cycles: Vec<Vec<String>> = petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || scc.iter().any(|&idx| self.graph.contains_edge(idx, idx))
            })
            .map(|scc| {
                let mut names: Vec<String> = scc
                    .iter()
                    .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                    .collect();
                names.sort();
                names
            })
            .collect();
        cycles.sort();
        let mut cycle = cycles.into_iter().next().unwrap_or_default();
        if let Some(first) = cycle.first().cloned() {
            cycle.push(first);
        }
        cycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_graph_has_empty_order() {
        let graph = ReferenceGraph::new();
        assert!(graph.creation_order().expect("order").is_empty());
    }

    #[test]
    fn referenced_resource_comes_first() {
        let mut graph = ReferenceGraph::new();
        graph.add_reference("LambdaUnitA", "LambdaRole");
        let order = graph.creation_order().expect("order");
        let pos = |name: &str| order.iter().position(|n| n == name).expect(name);
        assert!(pos("LambdaRole") < pos("LambdaUnitA"), "got: {order:?}");
    }

    #[test]
    fn repeated_reference_adds_one_edge() {
        let mut graph = ReferenceGraph::new();
        graph.add_reference("A", "B");
        graph.add_reference("A", "B");
        assert_eq!(graph.graph.edge_count(), 1);
    }

    #[test]
    fn diamond_is_acyclic() {
        let mut graph = ReferenceGraph::new();
        graph.add_reference("Api", "FnA");
        graph.add_reference("Api", "FnB");
        graph.add_reference("FnA", "Role");
        graph.add_reference("FnB", "Role");
        let order = graph.creation_order().expect("order");
        assert_eq!(order.len(), 4);
        assert_eq!(order.first().map(String::as_str), Some("Role"));
        assert_eq!(order.last().map(String::as_str), Some("Api"));
    }

    #[test]
    fn two_node_cycle_is_named() {
        let mut graph = ReferenceGraph::new();
        graph.add_reference("B", "A");
        graph.add_reference("A", "B");
        let err = graph.creation_order().unwrap_err();
        match err {
            StackweaveError::CircularDependency { resources } => {
                assert_eq!(resources, vec!["A", "B", "A"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut graph = ReferenceGraph::new();
        graph.add_reference("A", "A");
        let err = graph.creation_order().unwrap_err();
        assert!(err.to_string().contains("A -> A"), "got: {err}");
    }
}
