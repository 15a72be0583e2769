use super::rules::{
    AGE_RULES, DURATION_RULES, FieldRule, GENDER_RULES, LOCATION_RULES, PROCEDURE_RULES,
    first_match,
};
use super::types::StructuredQuery;

/// Turns free-text questions into [`StructuredQuery`] values.
///
/// Stateless; the rule tables are compiled once per process.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryParser;

impl QueryParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, query: &str) -> StructuredQuery {
        let structured = StructuredQuery {
            age: extract("age", &AGE_RULES, query),
            gender: extract("gender", &GENDER_RULES, query),
            procedure: extract("procedure", &PROCEDURE_RULES, query),
            location: extract("location", &LOCATION_RULES, query),
            policy_duration_months: extract("duration", &DURATION_RULES, query),
            raw_query: query.to_string(),
        };

        tracing::debug!(
            target: "query",
            "parsed {} of 5 fields from {:?}",
            structured.matched_fields(),
            query
        );
        structured
    }
}

fn extract<T: std::fmt::Debug>(field: &str, rules: &[FieldRule<T>], query: &str) -> Option<T> {
    let (value, rule) = first_match(rules, query)?;
    tracing::trace!(target: "query", "{field} = {value:?} (rule {rule})");
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Gender;

    #[test]
    fn test_parse_full_query() {
        let query = QueryParser::new()
            .parse("45-year-old male, knee surgery in Mumbai, 12-month policy");

        assert_eq!(query.age, Some(45));
        assert_eq!(query.gender, Some(Gender::Male));
        assert_eq!(query.procedure.as_deref(), Some("knee surgery"));
        assert_eq!(query.location.as_deref(), Some("mumbai"));
        assert_eq!(query.policy_duration_months, Some(12));
        assert_eq!(
            query.raw_query,
            "45-year-old male, knee surgery in Mumbai, 12-month policy"
        );
    }

    #[test]
    fn test_parse_shorthand() {
        let query = QueryParser::new().parse("46F, cataract surgery, Bangalore, 2 years policy");

        assert_eq!(query.age, Some(46));
        assert_eq!(query.gender, Some(Gender::Female));
        assert_eq!(query.procedure.as_deref(), Some("eye surgery"));
        assert_eq!(query.location.as_deref(), Some("bengaluru"));
        assert_eq!(query.policy_duration_months, Some(24));
    }

    #[test]
    fn test_keyword_fallback() {
        let query = QueryParser::new().parse("is my knee covered?");
        assert_eq!(query.procedure.as_deref(), Some("knee surgery"));
        assert_eq!(query.age, None);
    }

    #[test]
    fn test_underage_is_unset() {
        let query = QueryParser::new().parse("15-year-old boy, appendectomy in Delhi");

        assert_eq!(query.age, None);
        assert_eq!(query.gender, Some(Gender::Male));
        assert_eq!(query.procedure.as_deref(), Some("appendectomy"));
        assert_eq!(query.location.as_deref(), Some("delhi"));
    }

    #[test]
    fn test_nothing_matches() {
        let query = QueryParser::new().parse("what does this policy say?");
        assert_eq!(query.matched_fields(), 0);
        assert_eq!(query.raw_query, "what does this policy say?");
    }

    #[test]
    fn test_parse_is_deterministic() {
        let parser = QueryParser::new();
        let text = "32 year old woman, dialysis, Chennai, 6 months";
        assert_eq!(parser.parse(text), parser.parse(text));
    }
}
