//! C11 — conditional/marginal/MAP queries over a `BayesianNetwork` via
//! exact variable elimination, under a per-query deadline. Grounded on
//! `original_source/src/bayesian/probabilistic_query_engine.py`'s
//! `ProbabilisticQueryEngine`: its `ThreadPoolExecutor(max_workers=1)` +
//! `future.result(timeout=...)` pattern becomes a detached
//! `std::thread::spawn` plus `mpsc::Receiver::recv_timeout`, and
//! `_calculate_assignment_probability`'s per-variable CPD product is
//! carried over unchanged for the MAP probability calculation.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::network::{all_assignments, state_index, BayesianNetwork, Cpd, STATES};
use super::{BayesError, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Per queried variable: its probability distribution over `STATES`
    /// and its Shannon entropy in bits.
    pub results: HashMap<String, (HashMap<String, f64>, f64)>,
    pub evidence: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct MapResult {
    pub assignment: HashMap<String, String>,
    pub probability: f64,
    pub evidence: HashMap<String, String>,
}

/// A factor over a set of binary variables: an unnormalized table keyed
/// by a per-variable state assignment, in `vars` order.
#[derive(Debug, Clone)]
struct Factor {
    vars: Vec<String>,
    table: HashMap<Vec<usize>, f64>,
}

fn factor_from_cpd(cpd: &Cpd) -> Factor {
    let mut vars = cpd.parents.clone();
    vars.push(cpd.variable.clone());
    let mut table = HashMap::new();
    for (parent_assignment, distribution) in &cpd.table {
        for (state, &prob) in distribution.iter().enumerate() {
            let mut key = parent_assignment.clone();
            key.push(state);
            table.insert(key, prob);
        }
    }
    Factor { vars, table }
}

fn reduce_with_evidence(factor: &Factor, evidence: &HashMap<String, usize>) -> Factor {
    let fixed: Vec<(usize, usize)> = factor
        .vars
        .iter()
        .enumerate()
        .filter_map(|(i, v)| evidence.get(v).map(|&state| (i, state)))
        .collect();

    if fixed.is_empty() {
        return factor.clone();
    }

    let new_vars: Vec<String> = factor
        .vars
        .iter()
        .enumerate()
        .filter(|(i, _)| !fixed.iter().any(|(fi, _)| fi == i))
        .map(|(_, v)| v.clone())
        .collect();

    let mut table = HashMap::new();
    for (key, &value) in &factor.table {
        if fixed.iter().all(|&(i, state)| key[i] == state) {
            let new_key: Vec<usize> = key.iter().enumerate().filter(|(i, _)| !fixed.iter().any(|(fi, _)| fi == i)).map(|(_, &s)| s).collect();
            table.insert(new_key, value);
        }
    }
    Factor { vars: new_vars, table }
}

fn multiply(a: &Factor, b: &Factor) -> Factor {
    let mut vars = a.vars.clone();
    for v in &b.vars {
        if !vars.contains(v) {
            vars.push(v.clone());
        }
    }

    let a_positions: Vec<usize> = a.vars.iter().map(|v| vars.iter().position(|x| x == v).unwrap()).collect();
    let b_positions: Vec<usize> = b.vars.iter().map(|v| vars.iter().position(|x| x == v).unwrap()).collect();

    let mut table = HashMap::new();
    for assignment in all_assignments(vars.len()) {
        let a_key: Vec<usize> = a_positions.iter().map(|&p| assignment[p]).collect();
        let b_key: Vec<usize> = b_positions.iter().map(|&p| assignment[p]).collect();
        if let (Some(&av), Some(&bv)) = (a.table.get(&a_key), b.table.get(&b_key)) {
            table.insert(assignment, av * bv);
        }
    }
    Factor { vars, table }
}

fn sum_out(factor: &Factor, var: &str) -> Factor {
    let Some(pos) = factor.vars.iter().position(|v| v == var) else { return factor.clone() };
    let new_vars: Vec<String> = factor.vars.iter().enumerate().filter(|(i, _)| *i != pos).map(|(_, v)| v.clone()).collect();
    let mut table = HashMap::new();
    for (key, &value) in &factor.table {
        let mut new_key = key.clone();
        new_key.remove(pos);
        *table.entry(new_key).or_insert(0.0) += value;
    }
    Factor { vars: new_vars, table }
}

/// Exact variable elimination for the marginal `P(variable | evidence)`.
/// Restricts to the ancestral set of `variable` and `evidence` (a safe,
/// standard over-approximation of the variables relevant to the query)
/// before eliminating every hidden variable in that set.
fn marginal(network: &BayesianNetwork, variable: &str, evidence: &HashMap<String, usize>) -> Result<Vec<f64>> {
    if !network.contains_variable(variable) {
        return Err(BayesError::UnknownVariable(variable.to_string()));
    }

    let mut relevant = network.ancestors(variable);
    relevant.insert(variable.to_string());
    for ev_var in evidence.keys() {
        relevant.insert(ev_var.clone());
        relevant.extend(network.ancestors(ev_var));
    }

    let mut factors: Vec<Factor> = Vec::new();
    for var in &relevant {
        let cpd = network.cpd(var).ok_or_else(|| BayesError::MissingCpd(var.clone()))?;
        factors.push(reduce_with_evidence(&factor_from_cpd(cpd), evidence));
    }

    let hidden: Vec<&String> = relevant.iter().filter(|v| v.as_str() != variable && !evidence.contains_key(v.as_str())).collect();

    for var in hidden {
        let (touching, rest): (Vec<Factor>, Vec<Factor>) = factors.into_iter().partition(|f| f.vars.contains(var));
        let mut combined = match touching.split_first() {
            Some((first, remainder)) => remainder.iter().fold(first.clone(), |acc, f| multiply(&acc, f)),
            None => continue,
        };
        combined = sum_out(&combined, var);
        factors = rest;
        factors.push(combined);
    }

    let Some((first, remainder)) = factors.split_first() else {
        return Err(BayesError::MissingCpd(variable.to_string()));
    };
    let joint = remainder.iter().fold(first.clone(), |acc, f| multiply(&acc, f));

    let var_pos = joint.vars.iter().position(|v| v == variable).ok_or_else(|| BayesError::MissingCpd(variable.to_string()))?;
    let mut distribution = vec![0.0; STATES.len()];
    for (key, &value) in &joint.table {
        distribution[key[var_pos]] += value;
    }

    let total: f64 = distribution.iter().sum();
    if total > 0.0 {
        for p in &mut distribution {
            *p /= total;
        }
    }
    Ok(distribution)
}

fn evidence_to_states(evidence: &HashMap<String, String>) -> Result<HashMap<String, usize>> {
    evidence
        .iter()
        .map(|(k, v)| state_index(v).map(|s| (k.clone(), s)).ok_or_else(|| BayesError::UnknownState(k.clone(), v.clone())))
        .collect()
}

pub fn calculate_entropy(distribution: &HashMap<String, f64>) -> f64 {
    -distribution.values().filter(|&&p| p > 0.0).map(|&p| p * p.log2()).sum::<f64>()
}

/// Executes queries over a `BayesianNetwork` with a per-call deadline.
/// On timeout, every query method returns `None`, signalling the caller
/// to fall back to vector + graph retrieval (spec §4.6/§5).
pub struct ProbabilisticEngine {
    timeout: Duration,
}

impl Default for ProbabilisticEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ProbabilisticEngine {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn query_conditional(&self, network: &Arc<BayesianNetwork>, query_vars: &[String], evidence: &HashMap<String, String>) -> Option<QueryResult> {
        let network = network.clone();
        let query_vars = query_vars.to_vec();
        let evidence = evidence.clone();
        self.execute_with_timeout(move || Self::query_conditional_impl(&network, &query_vars, &evidence))
    }

    pub fn query_marginal(&self, network: &Arc<BayesianNetwork>, query_vars: &[String]) -> Option<QueryResult> {
        self.query_conditional(network, query_vars, &HashMap::new())
    }

    pub fn get_most_probable_explanation(&self, network: &Arc<BayesianNetwork>, evidence: &HashMap<String, String>) -> Option<MapResult> {
        let network = network.clone();
        let evidence = evidence.clone();
        self.execute_with_timeout(move || Self::map_query_impl(&network, &evidence))
    }

    fn query_conditional_impl(network: &BayesianNetwork, query_vars: &[String], evidence: &HashMap<String, String>) -> Result<QueryResult> {
        let evidence_states = evidence_to_states(evidence)?;
        let mut results = HashMap::new();
        for var in query_vars {
            let distribution = marginal(network, var, &evidence_states)?;
            let named: HashMap<String, f64> = STATES.iter().enumerate().map(|(i, s)| (s.to_string(), distribution[i])).collect();
            let entropy = calculate_entropy(&named);
            results.insert(var.clone(), (named, entropy));
        }
        Ok(QueryResult { results, evidence: evidence.clone() })
    }

    /// Mirrors the original's MAP computation: each remaining variable is
    /// assigned the mode of its evidence-conditioned marginal (an
    /// independence approximation of the true joint MAP, which full
    /// max-product variable elimination over a up-to-1000-node network
    /// would make expensive), then the assignment's probability is the
    /// exact product of each variable's `P(value | parent values)`,
    /// carried over unchanged from `_calculate_assignment_probability`.
    fn map_query_impl(network: &BayesianNetwork, evidence: &HashMap<String, String>) -> Result<MapResult> {
        let evidence_states = evidence_to_states(evidence)?;
        let mut assignment: HashMap<String, String> = evidence.clone();

        for var in network.variables() {
            if evidence.contains_key(&var) {
                continue;
            }
            let distribution = marginal(network, &var, &evidence_states)?;
            let best = distribution.iter().enumerate().max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal)).map(|(i, _)| i).unwrap_or(0);
            assignment.insert(var, STATES[best].to_string());
        }

        let probability = Self::assignment_probability(network, &assignment)?;
        Ok(MapResult { assignment, probability, evidence: evidence.clone() })
    }

    fn assignment_probability(network: &BayesianNetwork, assignment: &HashMap<String, String>) -> Result<f64> {
        let mut probability = 1.0;
        for (var, value) in assignment {
            let cpd = network.cpd(var).ok_or_else(|| BayesError::MissingCpd(var.clone()))?;
            let parent_states: Vec<usize> = cpd
                .parents
                .iter()
                .map(|p| assignment.get(p).and_then(|s| state_index(s)).ok_or_else(|| BayesError::MissingCpd(p.clone())))
                .collect::<Result<Vec<usize>>>()?;
            let distribution = cpd.distribution_for(&parent_states).ok_or_else(|| BayesError::MissingCpd(var.clone()))?;
            let state = state_index(value).ok_or_else(|| BayesError::UnknownState(var.clone(), value.clone()))?;
            probability *= distribution[state];
        }
        Ok(probability)
    }

    fn execute_with_timeout<T, F>(&self, query_fn: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(query_fn());
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(value)) => Some(value),
            Ok(Err(_)) | Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bayes::BayesianNetworkBuilder;
    use crate::entities::EntityType;
    use crate::graph::{EdgeKind, KnowledgeGraph};

    fn sample_network() -> Arc<BayesianNetwork> {
        let mut graph = KnowledgeGraph::new();
        graph.add_entity_node("tesla", EntityType::Org);
        graph.add_entity_node("musk", EntityType::Person);
        graph.add_relationship("musk", EdgeKind::RelatedTo, "tesla", 0.9).unwrap();
        let builder = BayesianNetworkBuilder::new(crate::bayes::BuilderConfig::default());
        builder.build(&graph).unwrap()
    }

    #[test]
    fn marginal_probabilities_sum_to_one() {
        let network = sample_network();
        let engine = ProbabilisticEngine::default();
        let result = engine.query_marginal(&network, &["tesla".to_string()]).unwrap();
        let (dist, _) = &result.results["tesla"];
        let total: f64 = dist.values().sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn conditional_query_respects_evidence() {
        let network = sample_network();
        let engine = ProbabilisticEngine::default();
        let evidence = HashMap::from([("musk".to_string(), "true".to_string())]);
        let result = engine.query_conditional(&network, &["tesla".to_string()], &evidence).unwrap();
        assert!(result.results.contains_key("tesla"));
        assert_eq!(result.evidence.get("musk").map(String::as_str), Some("true"));
    }

    #[test]
    fn map_query_returns_full_assignment() {
        let network = sample_network();
        let engine = ProbabilisticEngine::default();
        let evidence = HashMap::from([("musk".to_string(), "true".to_string())]);
        let result = engine.get_most_probable_explanation(&network, &evidence).unwrap();
        assert!(result.assignment.contains_key("tesla"));
        assert!(result.probability > 0.0 && result.probability <= 1.0);
    }

    #[test]
    fn unknown_variable_query_returns_none_not_panic() {
        let network = sample_network();
        let engine = ProbabilisticEngine::default();
        let result = engine.query_marginal(&network, &["nonexistent".to_string()]);
        assert!(result.is_none());
    }

    #[test]
    fn near_zero_timeout_degrades_to_none() {
        let network = sample_network();
        let engine = ProbabilisticEngine::new(Duration::from_nanos(1));
        let result = engine.query_marginal(&network, &["tesla".to_string()]);
        assert!(result.is_none());
    }

    #[test]
    fn entropy_is_zero_for_certain_distribution() {
        let dist = HashMap::from([("true".to_string(), 1.0), ("false".to_string(), 0.0)]);
        assert_eq!(calculate_entropy(&dist), 0.0);
    }

    #[test]
    fn entropy_is_one_bit_for_fair_coin() {
        let dist = HashMap::from([("true".to_string(), 0.5), ("false".to_string(), 0.5)]);
        assert!((calculate_entropy(&dist) - 1.0).abs() < 1e-9);
    }
}
