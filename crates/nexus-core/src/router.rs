//! C18 — classifies a free-text query into one of three modes and the
//! per-tier budgets that mode implies, grounded on
//! `original_source/src/nexus/public_api.py` (the `mode` parameter
//! threaded through `process()`) and `mcp/request_router.py`'s role as
//! the dispatch point upstream of the processor. The reference system
//! never documents its own keyword heuristic (the classifier itself is
//! external to the kept sources), so the cue lists below are a direct,
//! from-scratch design choice — recorded in DESIGN.md.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TOP_K: usize = 50;
pub const DEFAULT_TOKEN_BUDGET: usize = 10_000;

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Execution,
    Planning,
    Brainstorming,
}

impl QueryMode {
    /// `core_size`: execution 5, planning 10, brainstorming 20 (spec §4.7).
    pub fn core_size(self) -> usize {
        match self {
            QueryMode::Execution => 5,
            QueryMode::Planning => 10,
            QueryMode::Brainstorming => 20,
        }
    }

    /// `extended_size` is double `core_size`, giving the reranker a wider
    /// pool to draw from without unbounded growth.
    pub fn extended_size(self) -> usize {
        self.core_size() * 2
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueryMode::Execution => "execution",
            QueryMode::Planning => "planning",
            QueryMode::Brainstorming => "brainstorming",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "execution" => Some(QueryMode::Execution),
            "planning" => Some(QueryMode::Planning),
            "brainstorming" => Some(QueryMode::Brainstorming),
            _ => None,
        }
    }
}

impl Default for QueryMode {
    fn default() -> Self {
        QueryMode::Execution
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeDetection {
    pub mode: QueryMode,
    pub confidence: f64,
    pub token_budget: usize,
    pub core_size: usize,
    pub extended_size: usize,
}

const PLANNING_CUES: &[&str] = &["plan", "design", "architecture", "roadmap", "approach"];
const BRAINSTORMING_CUES: &[&str] = &["brainstorm", "explore", "what if", "idea", "alternative"];
const EXECUTION_CUES: &[&str] = &["implement", "fix", "debug", "build", "write"];

/// Scores a lowercased query against each mode's cue list and returns the
/// mode with the most hits; ties and no-hit queries default to
/// execution, matching the reference's "process immediately" default
/// posture for an otherwise-unclassifiable request.
pub fn detect_mode(query: &str) -> ModeDetection {
    let lowered = query.to_lowercase();

    let planning_hits = count_hits(&lowered, PLANNING_CUES);
    let brainstorming_hits = count_hits(&lowered, BRAINSTORMING_CUES);
    let execution_hits = count_hits(&lowered, EXECUTION_CUES);

    let total = planning_hits + brainstorming_hits + execution_hits;
    let (mode, hits) = if brainstorming_hits > planning_hits && brainstorming_hits > execution_hits {
        (QueryMode::Brainstorming, brainstorming_hits)
    } else if planning_hits > execution_hits && planning_hits > 0 {
        (QueryMode::Planning, planning_hits)
    } else {
        (QueryMode::Execution, execution_hits)
    };

    let confidence = if total == 0 { 0.5 } else { (hits as f64 / total as f64).clamp(0.0, 1.0) };

    ModeDetection { mode, confidence, token_budget: DEFAULT_TOKEN_BUDGET, core_size: mode.core_size(), extended_size: mode.extended_size() }
}

fn count_hits(lowered_query: &str, cues: &[&str]) -> usize {
    cues.iter().filter(|cue| lowered_query.contains(*cue)).count()
}

/// Resolves the mode actually used by one SOP invocation: an explicit
/// caller-supplied mode always wins over the detector (spec §4.7 "An
/// explicit mode beats the detector").
pub fn resolve_mode(explicit: Option<QueryMode>, query: &str) -> ModeDetection {
    match explicit {
        Some(mode) => ModeDetection { mode, confidence: 1.0, token_budget: DEFAULT_TOKEN_BUDGET, core_size: mode.core_size(), extended_size: mode.extended_size() },
        None => detect_mode(query),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_cues_win_on_imperative_queries() {
        let detection = detect_mode("fix the bug in the parser");
        assert_eq!(detection.mode, QueryMode::Execution);
        assert_eq!(detection.core_size, 5);
    }

    #[test]
    fn planning_cues_win_on_architecture_queries() {
        let detection = detect_mode("what's the right architecture for this module?");
        assert_eq!(detection.mode, QueryMode::Planning);
        assert_eq!(detection.core_size, 10);
    }

    #[test]
    fn brainstorming_cues_win_on_open_ended_queries() {
        let detection = detect_mode("let's brainstorm some alternative approaches");
        assert_eq!(detection.mode, QueryMode::Brainstorming);
        assert_eq!(detection.core_size, 20);
    }

    #[test]
    fn unclassifiable_query_defaults_to_execution() {
        let detection = detect_mode("tesla founding date");
        assert_eq!(detection.mode, QueryMode::Execution);
        assert_eq!(detection.confidence, 0.5);
    }

    #[test]
    fn explicit_mode_beats_detector() {
        let detection = resolve_mode(Some(QueryMode::Brainstorming), "fix the bug");
        assert_eq!(detection.mode, QueryMode::Brainstorming);
        assert_eq!(detection.confidence, 1.0);
    }

    #[test]
    fn extended_size_is_double_core_size() {
        assert_eq!(QueryMode::Planning.extended_size(), 20);
    }
}
