//! Dependency resolution for the tool catalog.
//!
//! `resolve` turns whatever the operator asked for into an install plan:
//! deduplicated, dependency-closed, and ordered so every tool comes after
//! all of its prerequisites. Ties between independent tools follow request
//! order, depth-first: a tool's prerequisites are placed (recursively, in
//! their declared order) right before the tool itself, and a tool already
//! placed is never revisited.
//!
//! ## Cycles
//!
//! A cycle in the catalog is a programming defect. `validate_acyclic` runs a
//! three-colour DFS over the whole graph once at startup:
//!
//! 1. **WHITE** (unvisited)
//! 2. **GRAY** (on the current DFS path)
//! 3. **BLACK** (fully explored)
//!
//! Reaching a GRAY node means the current path loops back on itself.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use thiserror::Error;

use crate::schemas::tools::ToolId;

/// A static graph whose edges point from a node to its prerequisites.
pub trait DependencyGraph {
    type Node: Copy + Eq + Hash + fmt::Display;

    /// Every node, in a stable order.
    fn nodes(&self) -> Vec<Self::Node>;

    /// Direct prerequisites of `node`, in declared order.
    fn prerequisites(&self, node: Self::Node) -> &[Self::Node];
}

/// The built-in tool catalog as a dependency graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog;

impl DependencyGraph for Catalog {
    type Node = ToolId;

    fn nodes(&self) -> Vec<ToolId> {
        ToolId::ALL.to_vec()
    }

    fn prerequisites(&self, node: ToolId) -> &[ToolId] {
        node.prerequisites()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("dependency cycle in tool catalog: {}", chain.join(" -> "))]
pub struct CycleError {
    /// The looping path, first node repeated at the end.
    pub chain: Vec<String>,
}

/// Dependency-ordered, deduplicated plan for `requested`.
///
/// Assumes an acyclic graph (see `validate_acyclic`). Nodes are marked on
/// entry, so even a cyclic graph terminates, just without a meaningful
/// order.
pub fn resolve<G: DependencyGraph>(graph: &G, requested: &[G::Node]) -> Vec<G::Node> {
    fn visit<G: DependencyGraph>(graph: &G, node: G::Node, visited: &mut HashSet<G::Node>, plan: &mut Vec<G::Node>) {
        if !visited.insert(node) {
            return;
        }
        for &prerequisite in graph.prerequisites(node) {
            visit(graph, prerequisite, visited, plan);
        }
        plan.push(node);
    }

    let mut visited = HashSet::new();
    let mut plan = Vec::new();
    for &node in requested {
        visit(graph, node, &mut visited, &mut plan);
    }
    plan
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Colour {
    Gray,
    Black,
}

/// Returns the first cycle found, if any.
pub fn find_cycle<G: DependencyGraph>(graph: &G) -> Option<CycleError> {
    fn dfs<G: DependencyGraph>(
        graph: &G,
        node: G::Node,
        colours: &mut HashMap<G::Node, Colour>,
        path: &mut Vec<G::Node>,
    ) -> Option<CycleError> {
        match colours.get(&node) {
            Some(Colour::Black) => return None,
            Some(Colour::Gray) => {
                let start = path.iter().position(|n| *n == node).unwrap_or(0);
                let mut chain: Vec<String> = path[start..].iter().map(ToString::to_string).collect();
                chain.push(node.to_string());
                return Some(CycleError { chain });
            }
            None => {}
        }

        colours.insert(node, Colour::Gray);
        path.push(node);
        for &prerequisite in graph.prerequisites(node) {
            if let Some(cycle) = dfs(graph, prerequisite, colours, path) {
                return Some(cycle);
            }
        }
        path.pop();
        colours.insert(node, Colour::Black);
        None
    }

    let mut colours = HashMap::new();
    let mut path = Vec::new();
    graph
        .nodes()
        .into_iter()
        .find_map(|node| dfs(graph, node, &mut colours, &mut path))
}

pub fn validate_acyclic<G: DependencyGraph>(graph: &G) -> Result<(), CycleError> {
    match find_cycle(graph) {
        Some(cycle) => Err(cycle),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestGraph(Vec<(&'static str, Vec<&'static str>)>);

    impl DependencyGraph for TestGraph {
        type Node = &'static str;

        fn nodes(&self) -> Vec<&'static str> {
            self.0.iter().map(|(n, _)| *n).collect()
        }

        fn prerequisites(&self, node: &'static str) -> &[&'static str] {
            self.0
                .iter()
                .find(|(n, _)| *n == node)
                .map(|(_, deps)| deps.as_slice())
                .unwrap_or(&[])
        }
    }

    fn chain_graph() -> TestGraph {
        TestGraph(vec![("a", vec![]), ("b", vec!["a"]), ("c", vec!["b"]), ("d", vec!["c"])])
    }

    fn position<T: PartialEq>(plan: &[T], item: &T) -> usize {
        plan.iter().position(|x| x == item).unwrap()
    }

    #[test]
    fn chain_resolves_prerequisites_first() {
        assert_eq!(resolve(&chain_graph(), &["d"]), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn duplicates_are_placed_once_at_first_visit() {
        let graph = TestGraph(vec![("a", vec![]), ("b", vec!["a"]), ("x", vec![])]);
        assert_eq!(resolve(&graph, &["x", "b", "a", "x", "b"]), vec!["x", "a", "b"]);
    }

    #[test]
    fn catalog_plan_puts_every_tool_after_its_prerequisites() {
        let plan = resolve(&Catalog, &ToolId::ALL);
        assert_eq!(plan.len(), ToolId::ALL.len());
        for tool in &plan {
            for prerequisite in tool.prerequisites() {
                assert!(position(&plan, prerequisite) < position(&plan, tool), "{prerequisite} after {tool}");
            }
        }
    }

    #[test]
    fn resolve_is_idempotent() {
        for request in [vec![ToolId::GnocHelper], vec![ToolId::HopsCli, ToolId::Iterm2], ToolId::ALL.to_vec()] {
            let once = resolve(&Catalog, &request);
            assert_eq!(resolve(&Catalog, &once), once);
        }
    }

    #[test]
    fn gnoc_helper_pulls_in_its_full_closure() {
        assert_eq!(
            resolve(&Catalog, &[ToolId::GnocHelper]),
            vec![
                ToolId::Xcode,
                ToolId::Homebrew,
                ToolId::Pyenv,
                ToolId::Python396,
                ToolId::PyenvVenvNcpcli,
                ToolId::Python313,
                ToolId::Allproxy,
                ToolId::GnocHelper,
            ]
        );
    }

    #[test]
    fn catalog_has_no_cycle() {
        assert!(validate_acyclic(&Catalog).is_ok());
    }

    #[test]
    fn cycle_is_reported_with_its_chain() {
        let graph = TestGraph(vec![("a", vec!["c"]), ("b", vec!["a"]), ("c", vec!["b"]), ("z", vec![])]);
        let err = validate_acyclic(&graph).unwrap_err();
        assert_eq!(err.chain, vec!["a", "c", "b", "a"]);
        assert_eq!(err.to_string(), "dependency cycle in tool catalog: a -> c -> b -> a");
    }

    #[test]
    fn resolve_terminates_on_a_cycle() {
        let graph = TestGraph(vec![("a", vec!["b"]), ("b", vec!["a"])]);
        assert_eq!(resolve(&graph, &["a"]), vec!["b", "a"]);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let graph = TestGraph(vec![("a", vec!["a"])]);
        assert_eq!(find_cycle(&graph).unwrap().chain, vec!["a", "a"]);
    }
}
