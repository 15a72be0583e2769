//! Sequential gate evaluation of a structured query against retrieved text.

use super::config::PolicyConfig;
use super::llm::{GenerationError, Generator, build_prompt, parse_reply};
use super::rules::{
    NetworkCoverage, age_bounds, format_amount, network_coverage, procedure_evidence, quote,
    waiting_period_months,
};
use super::types::Decision;
use crate::query::StructuredQuery;
use crate::vector::SearchHit;

/// Justification for a query with no retrieved policy text.
pub const NO_EVIDENCE: &str = "no relevant policy information found";

/// Applies eligibility, coverage and location rules to retrieved policy text.
///
/// Gates run in order and the eligibility and waiting-period gates
/// short-circuit. Coverage comes from the rule tables, or from the optional
/// [`Generator`] with the rules as fallback. The location check runs last
/// and can only ever turn an approval into a rejection.
pub struct DecisionEngine {
    policy: PolicyConfig,
    generator: Option<Box<dyn Generator>>,
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("policy", &self.policy)
            .field("generator", &self.generator.is_some())
            .finish()
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}

impl DecisionEngine {
    pub fn new(policy: PolicyConfig) -> Self {
        Self {
            policy,
            generator: None,
        }
    }

    /// Delegate coverage evaluation to an LLM.
    pub fn with_generator(mut self, generator: Box<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn decide(&self, query: &StructuredQuery, hits: &[SearchHit]) -> Decision {
        if hits.is_empty() {
            tracing::debug!(target: "decision", "no evidence for {:?}", query.raw_query);
            return Decision::rejected(NO_EVIDENCE);
        }

        let text = hits
            .iter()
            .map(|hit| hit.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if let Some(rejection) = self.check_eligibility(query, &text) {
            return rejection;
        }
        if let Some(rejection) = self.check_waiting_period(query, &text) {
            return rejection;
        }

        let mut decision = match &self.generator {
            Some(generator) => match self.llm_coverage(generator.as_ref(), query, hits) {
                Ok(decision) => decision,
                Err(e) => {
                    tracing::warn!(
                        target: "decision",
                        "generation failed, falling back to rules: {e}"
                    );
                    self.rule_coverage(query, &text)
                }
            },
            None => self.rule_coverage(query, &text),
        };

        self.apply_location(query, &text, &mut decision);

        tracing::debug!(
            target: "decision",
            "{} (amount {}) for {:?}",
            decision.status(),
            decision.amount(),
            query.raw_query
        );
        decision
    }

    fn check_eligibility(&self, query: &StructuredQuery, text: &str) -> Option<Decision> {
        let age = query.age?;
        let (min_age, max_age) =
            age_bounds(text).unwrap_or((self.policy.min_age, self.policy.max_age));
        let clause = format!("Age limit: {min_age}-{max_age} years");

        let reason = if age < min_age {
            format!("age {age} is below the minimum entry age of {min_age}")
        } else if age > max_age {
            format!("age {age} is above the maximum entry age of {max_age}")
        } else {
            return None;
        };
        Some(Decision::rejected(reason).with_clause(clause))
    }

    fn check_waiting_period(&self, query: &StructuredQuery, text: &str) -> Option<Decision> {
        let months = query.policy_duration_months?;
        let required = waiting_period_months(text).unwrap_or(self.policy.waiting_period_months);
        if months >= required {
            return None;
        }
        Some(
            Decision::rejected(format!(
                "policy held for {months} months, waiting period is {required} months"
            ))
            .with_clause(format!("Waiting period: {required} months")),
        )
    }

    fn rule_coverage(&self, query: &StructuredQuery, text: &str) -> Decision {
        let Some(procedure) = query.procedure.as_deref() else {
            return Decision::rejected(
                "no procedure identified in the query; coverage cannot be determined",
            );
        };

        let evidence = procedure_evidence(text, procedure);

        if let Some(exclusion) = evidence.exclusions.first() {
            return Decision::rejected(format!("{procedure} is excluded by the policy"))
                .with_clause(quote(exclusion));
        }

        match evidence.best_coverage() {
            Some((amount, sentence)) => Decision::approved(
                *amount,
                format!("{procedure} is covered: \"{}\"", quote(sentence)),
            )
            .with_clause(format!(
                "Coverage for {procedure}: Rs. {}",
                format_amount(*amount)
            )),
            None => Decision::rejected(format!(
                "no coverage clause found for {procedure} in the retrieved policy text"
            )),
        }
    }

    fn llm_coverage(
        &self,
        generator: &dyn Generator,
        query: &StructuredQuery,
        hits: &[SearchHit],
    ) -> Result<Decision, GenerationError> {
        let prompt = build_prompt(&query.raw_query, hits);
        let reply = generator.generate(&prompt)?;
        parse_reply(&reply)
    }

    fn apply_location(&self, query: &StructuredQuery, text: &str, decision: &mut Decision) {
        let Some(city) = query.location.as_deref() else {
            return;
        };

        match network_coverage(text, city) {
            NetworkCoverage::Listed => {
                if decision.is_approved() {
                    decision.push_justification(format!("{city} is within the hospital network"));
                }
            }
            NetworkCoverage::Excluded => {
                if decision.is_approved() {
                    decision.veto(format!(
                        "{city} is not listed among the network hospitals"
                    ));
                    decision.push_clause(format!("Network hospitals exclude {city}"));
                } else {
                    decision.push_justification(format!(
                        "{city} is also outside the hospital network"
                    ));
                }
            }
            NetworkCoverage::Undeclared => {
                decision.push_justification(format!(
                    "no network restriction found for {city}"
                ));
            }
        }
    }
}
