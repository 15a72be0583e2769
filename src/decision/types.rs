use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    Approved,
    Rejected,
    Error,
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DecisionStatus::Approved => "approved",
            DecisionStatus::Rejected => "rejected",
            DecisionStatus::Error => "error",
        })
    }
}

/// Outcome of evaluating a query against retrieved policy text.
///
/// `amount` is only ever nonzero for an approved decision; every
/// constructor and transition keeps it that way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    decision: DecisionStatus,
    amount: f64,
    justification: Vec<String>,
    clauses_used: Vec<String>,
}

impl Decision {
    /// An approval; cite the clauses it rests on with [`Decision::with_clause`].
    pub fn approved(amount: f64, reason: impl Into<String>) -> Self {
        Self {
            decision: DecisionStatus::Approved,
            amount: sanitize_amount(amount),
            justification: vec![reason.into()],
            clauses_used: Vec::new(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            decision: DecisionStatus::Rejected,
            amount: 0.0,
            justification: vec![reason.into()],
            clauses_used: Vec::new(),
        }
    }

    /// A collaborator failed; `message` must be readable by a user.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            decision: DecisionStatus::Error,
            amount: 0.0,
            justification: vec![message.into()],
            clauses_used: Vec::new(),
        }
    }

    /// Force a rejection, keeping the justification gathered so far.
    pub fn veto(&mut self, reason: impl Into<String>) {
        self.decision = DecisionStatus::Rejected;
        self.amount = 0.0;
        self.justification.push(reason.into());
    }

    pub fn with_clause(mut self, clause: impl Into<String>) -> Self {
        self.clauses_used.push(clause.into());
        self
    }

    pub fn push_justification(&mut self, reason: impl Into<String>) {
        self.justification.push(reason.into());
    }

    pub fn push_clause(&mut self, clause: impl Into<String>) {
        self.clauses_used.push(clause.into());
    }

    pub fn status(&self) -> DecisionStatus {
        self.decision
    }

    pub fn is_approved(&self) -> bool {
        self.decision == DecisionStatus::Approved
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn justification(&self) -> &[String] {
        &self.justification
    }

    pub fn clauses_used(&self) -> &[String] {
        &self.clauses_used
    }

    /// Justification entries joined into one sentence.
    pub fn justification_text(&self) -> String {
        self.justification.join("; ")
    }

    /// Flattened form with a single justification string, for JSON output.
    pub fn to_response(&self) -> DecisionResponse {
        DecisionResponse {
            decision: self.decision,
            amount: self.amount,
            justification: self.justification_text(),
            clauses_used: self.clauses_used.clone(),
        }
    }
}

fn sanitize_amount(amount: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

/// Wire shape of a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub decision: DecisionStatus,
    pub amount: f64,
    pub justification: String,
    pub clauses_used: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_veto_zeroes_amount() {
        let mut decision = Decision::approved(100000.0, "knee surgery is covered")
            .with_clause("Coverage for knee surgery: Rs. 100000");
        assert!(decision.is_approved());

        decision.veto("chennai is outside the network");
        assert_eq!(decision.status(), DecisionStatus::Rejected);
        assert_eq!(decision.amount(), 0.0);
        assert_eq!(decision.clauses_used().len(), 1);
        assert_eq!(decision.justification().len(), 2);
    }

    #[test]
    fn test_response_joins_justification() {
        let mut decision = Decision::rejected("first");
        decision.push_justification("second");

        let response = decision.to_response();
        assert_eq!(response.justification, "first; second");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["decision"], "rejected");
        assert_eq!(json["amount"], 0.0);
    }

    #[test]
    fn test_invalid_amount_clamped() {
        let decision = Decision::approved(f64::NAN, "reason");
        assert_eq!(decision.amount(), 0.0);
    }
}
