//! C3 — entity extraction (spec §4.9 contract: opaque NER model with a
//! regex fallback). The production NER model itself is out of scope (spec
//! §1); what is specified is the fallback every ingest path actually runs
//! through, grounded verbatim on
//! `original_source/src/services/entity_service.py::_regex_extract_entities`.

mod regex_extractor;

pub use regex_extractor::RegexEntityExtractor;

use serde::{Deserialize, Serialize};

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Person,
    Org,
    Gpe,
    Date,
    Time,
    Money,
    Product,
    Event,
    Law,
    Norp,
    Fac,
    Loc,
    Concept,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Person => "PERSON",
            EntityType::Org => "ORG",
            EntityType::Gpe => "GPE",
            EntityType::Date => "DATE",
            EntityType::Time => "TIME",
            EntityType::Money => "MONEY",
            EntityType::Product => "PRODUCT",
            EntityType::Event => "EVENT",
            EntityType::Law => "LAW",
            EntityType::Norp => "NORP",
            EntityType::Fac => "FAC",
            EntityType::Loc => "LOC",
            EntityType::Concept => "CONCEPT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntitySpan {
    pub text: String,
    pub entity_type: EntityType,
    pub start: usize,
    pub end: usize,
}

pub trait EntityExtractor {
    fn extract(&self, text: &str) -> Vec<EntitySpan>;

    fn extract_by_type(&self, text: &str, types: &[EntityType]) -> Vec<EntitySpan> {
        self.extract(text)
            .into_iter()
            .filter(|e| types.contains(&e.entity_type))
            .collect()
    }
}

/// Normalizes entity text to a stable graph node id: lowercase, spaces to
/// underscores, dots removed — exact match to
/// `original_source`'s `_normalize_entity_text`.
pub fn normalize_entity_text(text: &str) -> String {
    text.to_lowercase().replace(' ', "_").replace('.', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_entity_text() {
        assert_eq!(normalize_entity_text("NASA Rule 10"), "nasa_rule_10");
        assert_eq!(normalize_entity_text("U.S.A."), "usa");
    }
}
