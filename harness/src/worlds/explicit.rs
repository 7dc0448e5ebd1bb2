//! `ExplicitGraph`: a small weighted graph spelled out edge by edge.
//!
//! Used for hand-checked scenarios: every node has a name, every edge a
//! weight, and the heuristic is an optional per-node table.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use wayfinder_search::{Expansion, GeneratorError, GraphGenerator};

use super::{Costed, Heuristic};

/// Position in an [`ExplicitGraph`] plus the cost of the path to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Waypoint {
    pub node: u32,
    pub cost: u64,
}

impl Costed for Waypoint {
    fn cost(&self) -> u64 {
        self.cost
    }
}

/// Builder for [`ExplicitGraph`]. Nodes are created on first mention.
#[derive(Debug, Clone, Default)]
pub struct ExplicitGraphBuilder {
    id: String,
    names: Vec<String>,
    index: BTreeMap<String, u32>,
    edges: BTreeMap<u32, Vec<(u32, u64)>>,
    roots: Vec<u32>,
    goals: BTreeSet<u32>,
    estimates: BTreeMap<u32, u64>,
    failing: BTreeSet<u32>,
}

impl ExplicitGraphBuilder {
    fn intern(&mut self, name: &str) -> u32 {
        if let Some(id) = self.index.get(name) {
            return *id;
        }
        let id = u32::try_from(self.names.len()).unwrap_or(u32::MAX);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        id
    }

    /// Directed edge. Successors are generated in insertion order.
    #[must_use]
    pub fn edge(mut self, from: &str, to: &str, weight: u64) -> Self {
        let from = self.intern(from);
        let to = self.intern(to);
        self.edges.entry(from).or_default().push((to, weight));
        self
    }

    #[must_use]
    pub fn root(mut self, name: &str) -> Self {
        let id = self.intern(name);
        self.roots.push(id);
        self
    }

    #[must_use]
    pub fn goal(mut self, name: &str) -> Self {
        let id = self.intern(name);
        self.goals.insert(id);
        self
    }

    /// Heuristic value for `name`; unlisted nodes estimate 0.
    #[must_use]
    pub fn estimate(mut self, name: &str, h: u64) -> Self {
        let id = self.intern(name);
        self.estimates.insert(id, h);
        self
    }

    /// Make successor generation for `name` return an error.
    #[must_use]
    pub fn failing(mut self, name: &str) -> Self {
        let id = self.intern(name);
        self.failing.insert(id);
        self
    }

    #[must_use]
    pub fn build(self) -> ExplicitGraph {
        ExplicitGraph {
            id: self.id,
            names: self.names,
            index: self.index,
            edges: self.edges,
            roots: self.roots,
            goals: self.goals,
            estimates: self.estimates,
            failing: self.failing,
        }
    }
}

/// A finite weighted digraph with named nodes.
#[derive(Debug, Clone)]
pub struct ExplicitGraph {
    id: String,
    names: Vec<String>,
    index: BTreeMap<String, u32>,
    edges: BTreeMap<u32, Vec<(u32, u64)>>,
    roots: Vec<u32>,
    goals: BTreeSet<u32>,
    estimates: BTreeMap<u32, u64>,
    failing: BTreeSet<u32>,
}

impl ExplicitGraph {
    #[must_use]
    pub fn builder(id: &str) -> ExplicitGraphBuilder {
        ExplicitGraphBuilder {
            id: id.to_string(),
            ..ExplicitGraphBuilder::default()
        }
    }

    #[must_use]
    pub fn name(&self, node: u32) -> Option<&str> {
        self.names.get(node as usize).map(String::as_str)
    }

    #[must_use]
    pub fn node(&self, name: &str) -> Option<u32> {
        self.index.get(name).copied()
    }

    /// Names of the nodes a sequence of waypoints visits.
    pub fn names<'a>(&self, states: impl IntoIterator<Item = &'a Waypoint>) -> Vec<String> {
        states
            .into_iter()
            .map(|w| self.name(w.node).unwrap_or("?").to_string())
            .collect()
    }
}

impl GraphGenerator for ExplicitGraph {
    type State = Waypoint;
    type Action = u32;

    fn generator_id(&self) -> &str {
        &self.id
    }

    fn roots(&self) -> Result<Vec<Waypoint>, GeneratorError> {
        Ok(self
            .roots
            .iter()
            .map(|node| Waypoint {
                node: *node,
                cost: 0,
            })
            .collect())
    }

    fn successors(&self, state: &Waypoint) -> Result<Vec<Expansion<Waypoint, u32>>, GeneratorError> {
        if self.failing.contains(&state.node) {
            return Err(GeneratorError::new(format!(
                "no successor table for {}",
                self.name(state.node).unwrap_or("?")
            )));
        }
        Ok(self
            .edges
            .get(&state.node)
            .map(|out| {
                out.iter()
                    .map(|(to, weight)| {
                        let next = Waypoint {
                            node: *to,
                            cost: state.cost.saturating_add(*weight),
                        };
                        Expansion::new(next, *to)
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn is_goal(&self, state: &Waypoint) -> bool {
        self.goals.contains(&state.node)
    }
}

impl Heuristic<Waypoint> for ExplicitGraph {
    fn estimate(&self, state: &Waypoint) -> u64 {
        self.estimates.get(&state.node).copied().unwrap_or(0)
    }
}
