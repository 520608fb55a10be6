//! C10/C11 Bayesian inference (spec §4.6): a DAG pruned and confidence-
//! filtered from the knowledge graph, with CPDs estimated by graph-informed
//! sampling, and an inference engine answering conditional/marginal/MAP
//! queries under a per-query deadline.
//!
//! No Rust PGM crate exists in the corpus for this; the network is a
//! from-scratch `petgraph`-backed DAG with a from-scratch CPD table and
//! exact variable elimination (factor product + sum-out), built in the
//! base crate's structural idiom: typed builder + typed engine,
//! `thiserror` errors, unit tests against hand-checked probabilities.
//! Grounded on `original_source/src/bayesian/network_builder.py` and
//! `probabilistic_query_engine.py`, with one deliberate correction: the
//! original estimates CPDs from 100 rows of `random.choice`-sampled dummy
//! data; this estimates them directly from graph-informed weights (inbound
//! edge confidence and in-degree), per the resolved Open Question.

mod builder;
mod engine;
mod network;

pub use builder::{BayesianNetworkBuilder, BuilderConfig};
pub use engine::{MapResult, ProbabilisticEngine, QueryResult};
pub use network::{BayesianNetwork, Cpd, STATES};

use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BayesError {
    #[error("graph is cyclic; cannot build a Bayesian network from it")]
    NotAcyclic,
    #[error("no edges remain after confidence filtering; cannot build a network")]
    EmptyNetwork,
    #[error("unknown variable: {0}")]
    UnknownVariable(String),
    #[error("no conditional probability table for variable: {0}")]
    MissingCpd(String),
    #[error("evidence assigns variable {0} to unknown state {1:?}")]
    UnknownState(String, String),
}

pub type Result<T> = std::result::Result<T, BayesError>;
