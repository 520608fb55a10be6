use regex::Regex;
use std::sync::LazyLock;

use super::{EntityExtractor, EntitySpan, EntityType};

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2}(?:,?\s+\d{4})?\b",
    )
    .expect("static DATE_RE pattern is valid")
});

static MULTI_PROPER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)+)\b").expect("static MULTI_PROPER_RE pattern is valid"));

static SINGLE_PROPER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:[a-z]\s)([A-Z][a-z]{2,})\b").expect("static SINGLE_PROPER_RE pattern is valid"));

static ACRONYM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2,})\b").expect("static ACRONYM_RE pattern is valid"));

/// Dependency-free NER fallback (no spaCy-equivalent model is in scope —
/// spec §1 treats the extractor as pluggable). Four passes in fixed
/// priority order, each skipping spans that overlap an already-accepted
/// one: month-day dates, then multi-word proper-noun runs as PERSON,
/// then a single capitalized mid-sentence word as ORG, then all-caps
/// acronym runs as ORG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexEntityExtractor;

impl RegexEntityExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn overlaps_existing(entities: &[EntitySpan], start: usize, end: usize) -> bool {
    entities
        .iter()
        .any(|e| (e.start <= start && start < e.end) || (e.start < end && end <= e.end))
}

impl EntityExtractor for RegexEntityExtractor {
    fn extract(&self, text: &str) -> Vec<EntitySpan> {
        let mut entities: Vec<EntitySpan> = Vec::new();

        for m in DATE_RE.find_iter(text) {
            entities.push(EntitySpan {
                text: m.as_str().to_string(),
                entity_type: EntityType::Date,
                start: m.start(),
                end: m.end(),
            });
        }

        for caps in MULTI_PROPER_RE.captures_iter(text) {
            let m = caps.get(1).expect("group 1 always matches when the pattern matches");
            if !overlaps_existing(&entities, m.start(), m.end()) {
                entities.push(EntitySpan {
                    text: m.as_str().to_string(),
                    entity_type: EntityType::Person,
                    start: m.start(),
                    end: m.end(),
                });
            }
        }

        for caps in SINGLE_PROPER_RE.captures_iter(text) {
            let m = caps.get(1).expect("group 1 always matches when the pattern matches");
            if !overlaps_existing(&entities, m.start(), m.end()) {
                entities.push(EntitySpan {
                    text: m.as_str().to_string(),
                    entity_type: EntityType::Org,
                    start: m.start(),
                    end: m.end(),
                });
            }
        }

        for caps in ACRONYM_RE.captures_iter(text) {
            let m = caps.get(1).expect("group 1 always matches when the pattern matches");
            if !overlaps_existing(&entities, m.start(), m.end()) {
                entities.push(EntitySpan {
                    text: m.as_str().to_string(),
                    entity_type: EntityType::Org,
                    start: m.start(),
                    end: m.end(),
                });
            }
        }

        entities.sort_by_key(|e| e.start);
        entities
    }
}
