use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("male"),
            Gender::Female => f.write_str("female"),
        }
    }
}

/// Fields extracted from a free-text coverage question.
///
/// Every field is optional; an unset field means nothing in the query
/// matched, never that parsing failed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StructuredQuery {
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    /// Canonical procedure category, e.g. `knee surgery`
    pub procedure: Option<String>,
    /// Canonical lowercase city, e.g. `mumbai`
    pub location: Option<String>,
    pub policy_duration_months: Option<u32>,
    pub raw_query: String,
}

impl StructuredQuery {
    /// A query with only the raw text set.
    pub fn new(raw_query: impl Into<String>) -> Self {
        Self {
            raw_query: raw_query.into(),
            ..Default::default()
        }
    }

    /// Number of fields the parser managed to fill.
    pub fn matched_fields(&self) -> usize {
        [
            self.age.is_some(),
            self.gender.is_some(),
            self.procedure.is_some(),
            self.location.is_some(),
            self.policy_duration_months.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}
