//! Pattern extraction over retrieved policy text.
//!
//! Everything here is a lookup: a miss returns `None` or an empty list and
//! the engine falls back to configured defaults.

use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::documents::split_sentences;
use crate::query::vocabulary::{find_city, procedure_category, term_regex};

/// `age limit: 18-65 years`, `entry age between 18 and 65`, ...
static AGE_LIMIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:age\s+limits?|entry\s+age|eligible\s+age|age\s+eligibility|aged?\s+between)\b[^.\d]{0,40}?(\d{1,3})\s*(?:years?)?\s*(?:-|–|to|and)\s*(\d{1,3})",
    )
    .expect("age limit pattern is valid")
});

/// `waiting period of 24 months`, `30-day waiting period` is not matched.
static WAITING_PERIOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bwaiting\s+period\b[^.\d]{0,60}?(\d{1,3})\s*-?\s*(months?|years?|days?)\b")
        .expect("waiting period pattern is valid")
});

/// Currency before the figure: `Rs. 1,00,000`, `INR 2 lakh`, `₹50,000`.
static PREFIXED_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\brs\.?|\binr|₹)\s*(\d[\d,]*(?:\.\d+)?)(?:\s*(lakhs?|lacs?|crores?|cr)\b)?")
        .expect("prefixed amount pattern is valid")
});

/// Currency after the figure: `50,000 rupees`, `2 lakh INR`.
static SUFFIXED_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d[\d,]*(?:\.\d+)?)\s*(lakhs?|lacs?|crores?|cr)?\s*(?:rupees|inr|rs)\b")
        .expect("suffixed amount pattern is valid")
});

/// Indian digit grouping with no currency marker: `1,00,000`, `12,50,000`.
static GROUPED_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2}(?:,\d{2})+,\d{3})\b").expect("grouped amount pattern is valid")
});

/// Multiplier with no currency marker: `2 lakh`, `1.5 crore`.
static MULTIPLIER_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(lakhs?|lacs?|crores?)\b")
        .expect("multiplier amount pattern is valid")
});

static EXCLUSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:not\s+covered|excluded|not\s+payable|not\s+admissible|no\s+coverage)\b")
        .expect("exclusion pattern is valid")
});

static NETWORK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bnetwork\s+(?:of\s+)?(?:hospitals?|providers?)\b")
        .expect("network pattern is valid")
});

/// Text right before a network mention that turns it into its opposite:
/// `non-network`, `out of network`, `out-of-network`.
static NEGATED_NETWORK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:non|out\s+of|out-of)[\s-]*$").expect("negated network pattern is valid")
});

/// Longest clause text quoted back in a justification.
const MAX_QUOTE_CHARS: usize = 160;

/// Age bounds declared in the policy, as `(min, max)`.
pub fn age_bounds(text: &str) -> Option<(u32, u32)> {
    let caps = AGE_LIMIT.captures(text)?;
    let a: u32 = caps.get(1)?.as_str().parse().ok()?;
    let b: u32 = caps.get(2)?.as_str().parse().ok()?;
    Some((a.min(b), a.max(b)))
}

/// Waiting period declared in the policy, in whole months (days round up).
pub fn waiting_period_months(text: &str) -> Option<u32> {
    let caps = WAITING_PERIOD.captures(text)?;
    let value: u32 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_ascii_lowercase();
    Some(if unit.starts_with("year") {
        value * 12
    } else if unit.starts_with("day") {
        value.div_ceil(30)
    } else {
        value
    })
}

/// Every amount in `text`, in rupees.
///
/// Figures with a currency marker are read first. Bare Indian-grouped
/// figures and bare `lakh`/`crore` amounts count too, unless they overlap a
/// figure already read.
pub fn parse_amounts(text: &str) -> Vec<f64> {
    let patterns = [
        &*PREFIXED_AMOUNT,
        &*SUFFIXED_AMOUNT,
        &*GROUPED_AMOUNT,
        &*MULTIPLIER_AMOUNT,
    ];
    let mut found: Vec<(Range<usize>, f64)> = Vec::new();

    for pattern in patterns {
        for caps in pattern.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let span = whole.range();
            if found
                .iter()
                .any(|(seen, _)| seen.start < span.end && span.start < seen.end)
            {
                continue;
            }
            if let Some(amount) = amount_from(&caps) {
                found.push((span, amount));
            }
        }
    }

    found
        .into_iter()
        .map(|(_, amount)| amount)
        .filter(|amount| *amount > 0.0)
        .collect()
}

/// Figure in group 1, optional multiplier in group 2.
fn amount_from(caps: &Captures<'_>) -> Option<f64> {
    let figure = caps.get(1)?.as_str().replace(',', "");
    let base: f64 = figure.trim_end_matches('.').parse().ok()?;
    let multiplier = caps.get(2).map_or(1.0, |unit| unit_multiplier(unit.as_str()));
    Some(base * multiplier)
}

fn unit_multiplier(unit: &str) -> f64 {
    let unit = unit.to_ascii_lowercase();
    if unit.starts_with("cr") {
        10_000_000.0
    } else {
        100_000.0
    }
}

/// Format a rupee amount the way clauses cite it: integral amounts without
/// decimals.
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    }
}

/// What the policy text says about one procedure.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcedureEvidence {
    /// Sentences mentioning the procedure with an amount, and that amount
    pub coverage: Vec<(f64, String)>,
    /// Sentences excluding the procedure
    pub exclusions: Vec<String>,
}

impl ProcedureEvidence {
    /// Highest covered amount and the sentence stating it.
    pub fn best_coverage(&self) -> Option<&(f64, String)> {
        self.coverage
            .iter()
            .max_by(|a, b| a.0.total_cmp(&b.0))
    }
}

/// Scan `text` sentence by sentence for clauses about `procedure`.
///
/// Known categories match on all their phrases and keywords; any other
/// procedure matches on its own words.
pub fn procedure_evidence(text: &str, procedure: &str) -> ProcedureEvidence {
    let terms = match procedure_category(procedure) {
        Some(category) => term_regex(category.terms()),
        None => {
            let words: Vec<&str> = procedure
                .split_whitespace()
                .filter(|word| word.chars().count() >= 3)
                .collect();
            if words.is_empty() {
                return ProcedureEvidence::default();
            }
            term_regex(words)
        }
    };

    let mut evidence = ProcedureEvidence::default();
    for sentence in split_sentences(text) {
        if !terms.is_match(&sentence) {
            continue;
        }
        if EXCLUSION.is_match(&sentence) {
            evidence.exclusions.push(sentence);
            continue;
        }
        if let Some(amount) = parse_amounts(&sentence).into_iter().reduce(f64::max) {
            evidence.coverage.push((amount, sentence));
        }
    }
    evidence
}

/// Whether the policy restricts treatment to a network, and if so whether
/// `city` is inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkCoverage {
    /// No network clause in the text
    Undeclared,
    /// A network clause mentions the city
    Listed,
    /// Network clauses exist and none mention the city
    Excluded,
}

/// Where `city` stands against the network clauses in `text`.
///
/// A city counts as listed when it follows a network mention in the same
/// sentence. Negated mentions (`non-network hospitals`) declare nothing.
pub fn network_coverage(text: &str, city: &str) -> NetworkCoverage {
    let aliases: Vec<&str> = match find_city(city) {
        Some(known) => known.aliases.to_vec(),
        None => vec![city.trim()],
    };
    let city_pattern = term_regex(aliases);

    let mut declared = false;
    for sentence in split_sentences(text) {
        for found in NETWORK.find_iter(&sentence) {
            if NEGATED_NETWORK.is_match(&sentence[..found.start()]) {
                continue;
            }
            declared = true;
            if city_pattern.is_match(&sentence[found.start()..]) {
                return NetworkCoverage::Listed;
            }
        }
    }

    if declared {
        NetworkCoverage::Excluded
    } else {
        NetworkCoverage::Undeclared
    }
}

/// Shorten a clause for quoting, on a char boundary.
pub fn quote(sentence: &str) -> String {
    if sentence.chars().count() <= MAX_QUOTE_CHARS {
        return sentence.to_string();
    }
    let cut: String = sentence.chars().take(MAX_QUOTE_CHARS).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_bounds() {
        assert_eq!(age_bounds("Age limit: 18-65 years."), Some((18, 65)));
        assert_eq!(
            age_bounds("Entry age between 21 years and 60 years"),
            Some((21, 60))
        );
        assert_eq!(age_bounds("Members of any age are welcome."), None);
    }

    #[test]
    fn test_waiting_period() {
        assert_eq!(waiting_period_months("A waiting period of 24 months applies."), Some(24));
        assert_eq!(waiting_period_months("Waiting period: 2 years."), Some(24));
        assert_eq!(waiting_period_months("waiting period of 30 days"), Some(1));
        assert_eq!(waiting_period_months("No waiting period."), None);
    }

    #[test]
    fn test_parse_amounts_indian_grouping() {
        assert_eq!(parse_amounts("covered up to Rs. 1,00,000"), vec![100000.0]);
        assert_eq!(parse_amounts("limit of ₹2,50,000 per year"), vec![250000.0]);
        assert_eq!(parse_amounts("INR 1.5 lakh"), vec![150000.0]);
        assert_eq!(parse_amounts("up to 2 crore rupees"), vec![20000000.0]);
        assert!(parse_amounts("covered in 12 months").is_empty());
    }

    #[test]
    fn test_parse_amounts_without_currency() {
        assert_eq!(parse_amounts("Knee surgeries are covered up to 1,00,000."), vec![100000.0]);
        assert_eq!(parse_amounts("Knee surgeries are covered up to 2 lakh."), vec![200000.0]);
        assert_eq!(parse_amounts("a sum insured of 1.5 crore"), vec![15000000.0]);
        assert!(parse_amounts("policy number 12,345 issued in 2023").is_empty());
    }

    #[test]
    fn test_parse_amounts_counts_each_figure_once() {
        assert_eq!(parse_amounts("Rs. 2 lakh"), vec![200000.0]);
        assert_eq!(parse_amounts("Rs. 1,00,000 or 50,000 rupees"), vec![100000.0, 50000.0]);
    }

    #[test]
    fn test_procedure_evidence_keeps_maximum() {
        let text = "Knee surgeries are covered up to Rs. 1,00,000. \
                    Knee arthroscopy is reimbursed up to Rs. 40,000. \
                    Dental treatment is covered up to Rs. 5,000.";
        let evidence = procedure_evidence(text, "knee surgery");

        assert_eq!(evidence.coverage.len(), 2);
        let (amount, sentence) = evidence.best_coverage().unwrap();
        assert_eq!(*amount, 100000.0);
        assert!(sentence.starts_with("Knee surgeries"));
    }

    #[test]
    fn test_procedure_evidence_exclusion() {
        let text = "Cosmetic dental treatment is not covered.";
        let evidence = procedure_evidence(text, "dental treatment");

        assert!(evidence.coverage.is_empty());
        assert_eq!(evidence.exclusions.len(), 1);
    }

    #[test]
    fn test_unknown_procedure_uses_own_words() {
        let text = "Bariatric surgery is covered up to Rs. 2,00,000.";
        let evidence = procedure_evidence(text, "bariatric surgery");
        assert_eq!(evidence.best_coverage().unwrap().0, 200000.0);
    }

    #[test]
    fn test_network_coverage() {
        let text = "Cashless treatment is available at network hospitals in Mumbai, Pune and Delhi.";
        assert_eq!(network_coverage(text, "mumbai"), NetworkCoverage::Listed);
        assert_eq!(network_coverage(text, "chennai"), NetworkCoverage::Excluded);
        assert_eq!(
            network_coverage("Knee surgery is covered.", "chennai"),
            NetworkCoverage::Undeclared
        );
    }

    #[test]
    fn test_non_network_mention_lists_nothing() {
        let text = "Cashless treatment at network hospitals in Mumbai only. \
                    Treatment at non-network hospitals in Chennai is reimbursed.";
        assert_eq!(network_coverage(text, "chennai"), NetworkCoverage::Excluded);
        assert_eq!(network_coverage(text, "mumbai"), NetworkCoverage::Listed);

        let only_negated = "Out-of-network hospitals in Pune are reimbursed at 80%.";
        assert_eq!(network_coverage(only_negated, "pune"), NetworkCoverage::Undeclared);
    }

    #[test]
    fn test_network_list_ends_at_sentence() {
        let text = "Network hospitals are in Mumbai. Our head office is in Chennai.";
        assert_eq!(network_coverage(text, "chennai"), NetworkCoverage::Excluded);
    }

    #[test]
    fn test_network_alias() {
        let text = "Network hospitals: Bombay, Madras.";
        assert_eq!(network_coverage(text, "chennai"), NetworkCoverage::Listed);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(100000.0), "100000");
        assert_eq!(format_amount(1234.5), "1234.50");
    }
}
