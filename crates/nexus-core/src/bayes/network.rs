//! The Bayesian network itself: a DAG of binary-state variables plus one
//! CPD per variable, grounded on `original_source/src/bayesian/
//! network_builder.py`'s `BayesianNetwork`/CPD shape (minus pgmpy).

use std::collections::{HashMap, HashSet};

use petgraph::algo::is_cyclic_directed;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// Every variable in the network is binary: present/referenced (`"true"`)
/// or not (`"false"`), matching the graph-presence semantics CPDs are
/// estimated over.
pub const STATES: [&str; 2] = ["true", "false"];

pub fn state_index(state: &str) -> Option<usize> {
    STATES.iter().position(|s| s.eq_ignore_ascii_case(state))
}

/// Every combination of `n` binary choices, each a `Vec<usize>` indexing
/// into `STATES`. Shared by CPD estimation (one row per parent-state
/// combination) and variable elimination (factor multiplication).
pub(crate) fn all_assignments(n: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    let mut out = Vec::with_capacity(1 << n);
    for bits in 0..(1usize << n) {
        out.push((0..n).map(|i| if bits & (1 << i) != 0 { 1 } else { 0 }).collect());
    }
    out
}

/// `P(variable = STATES[i] | parents = assignment)` for every parent-state
/// assignment, keyed by the parent states (in `parents` order, each entry
/// an index into `STATES`). A variable with no parents has exactly one
/// entry, keyed by the empty assignment.
#[derive(Debug, Clone)]
pub struct Cpd {
    pub variable: String,
    pub parents: Vec<String>,
    pub table: HashMap<Vec<usize>, Vec<f64>>,
}

impl Cpd {
    pub fn root(variable: impl Into<String>, distribution: Vec<f64>) -> Self {
        let mut table = HashMap::new();
        table.insert(Vec::new(), distribution);
        Self { variable: variable.into(), parents: Vec::new(), table }
    }

    pub fn with_table(variable: impl Into<String>, parents: Vec<String>, table: HashMap<Vec<usize>, Vec<f64>>) -> Self {
        Self { variable: variable.into(), parents, table }
    }

    pub fn distribution_for(&self, parent_states: &[usize]) -> Option<&Vec<f64>> {
        self.table.get(parent_states)
    }
}

/// A DAG over binary variables with one CPD per variable. Unlike
/// `KnowledgeGraph`, edges carry no weight of their own — the dependency
/// structure lives entirely in each variable's CPD.
#[derive(Clone)]
pub struct BayesianNetwork {
    pub(crate) graph: StableDiGraph<String, ()>,
    pub(crate) index: HashMap<String, NodeIndex>,
    pub(crate) cpds: HashMap<String, Cpd>,
}

impl Default for BayesianNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl BayesianNetwork {
    pub fn new() -> Self {
        Self { graph: StableDiGraph::new(), index: HashMap::new(), cpds: HashMap::new() }
    }

    /// Idempotent; returns `true` if the variable was newly added.
    pub fn add_variable(&mut self, name: &str) -> bool {
        if self.index.contains_key(name) {
            return false;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        true
    }

    /// Adds a directed edge `parent -> child`. Rejects the edge (and
    /// leaves the graph unchanged) if it would introduce a cycle.
    pub fn add_edge(&mut self, parent: &str, child: &str) -> super::Result<()> {
        let Some(&parent_idx) = self.index.get(parent) else {
            return Err(super::BayesError::UnknownVariable(parent.to_string()));
        };
        let Some(&child_idx) = self.index.get(child) else {
            return Err(super::BayesError::UnknownVariable(child.to_string()));
        };
        let edge_idx = self.graph.add_edge(parent_idx, child_idx, ());
        if is_cyclic_directed(&self.graph) {
            self.graph.remove_edge(edge_idx);
            return Err(super::BayesError::NotAcyclic);
        }
        Ok(())
    }

    pub fn set_cpd(&mut self, cpd: Cpd) {
        self.cpds.insert(cpd.variable.clone(), cpd);
    }

    pub fn cpd(&self, variable: &str) -> Option<&Cpd> {
        self.cpds.get(variable)
    }

    pub fn variables(&self) -> Vec<String> {
        self.graph.node_weights().cloned().collect()
    }

    pub fn contains_variable(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn parents_of(&self, variable: &str) -> Vec<String> {
        let Some(&idx) = self.index.get(variable) else { return Vec::new() };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .filter_map(|e| self.graph.node_weight(e.source()))
            .cloned()
            .collect()
    }

    /// All transitive parents of `variable`, `variable` itself excluded.
    pub fn ancestors(&self, variable: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack: Vec<String> = self.parents_of(variable);
        while let Some(node) = stack.pop() {
            if seen.insert(node.clone()) {
                stack.extend(self.parents_of(&node));
            }
        }
        seen
    }
}
