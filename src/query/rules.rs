//! Ordered extraction rules for each query field.
//!
//! Each field has a table of [`FieldRule`]s evaluated top to bottom; within a
//! rule, matches are tried left to right. The first extractor that returns a
//! value wins. A rule whose extractor rejects every match (an age of 150,
//! say) simply falls through to the next rule.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::types::Gender;
use super::vocabulary::{CITIES, PROCEDURES, find_city, term_regex};

/// Youngest and oldest age accepted as a real age.
pub const AGE_RANGE: (u32, u32) = (18, 100);

type Extractor<T> = Box<dyn Fn(&Captures<'_>) -> Option<T> + Send + Sync>;

/// One `(pattern, extractor)` pair.
pub struct FieldRule<T> {
    pub name: &'static str,
    pub pattern: Regex,
    extract: Extractor<T>,
}

impl<T> FieldRule<T> {
    pub fn new(
        name: &'static str,
        pattern: Regex,
        extract: impl Fn(&Captures<'_>) -> Option<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            pattern,
            extract: Box::new(extract),
        }
    }

    /// First value this rule yields for `text`.
    pub fn apply(&self, text: &str) -> Option<T> {
        self.pattern
            .captures_iter(text)
            .find_map(|caps| (self.extract)(&caps))
    }
}

impl<T> std::fmt::Debug for FieldRule<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

/// Evaluate `rules` in order, returning the value and the winning rule name.
pub fn first_match<T>(rules: &[FieldRule<T>], text: &str) -> Option<(T, &'static str)> {
    rules
        .iter()
        .find_map(|rule| rule.apply(text).map(|value| (value, rule.name)))
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in rule pattern is valid")
}

fn number(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group)?.as_str().parse().ok()
}

fn age_in_range(caps: &Captures<'_>, group: usize) -> Option<u32> {
    number(caps, group).filter(|age| (AGE_RANGE.0..=AGE_RANGE.1).contains(age))
}

pub static AGE_RULES: LazyLock<Vec<FieldRule<u32>>> = LazyLock::new(|| {
    vec![
        FieldRule::new(
            "years_old",
            re(r"(?i)\b(\d{1,3})\s*-?\s*(?:years?|yrs?|y/o)(?:\s*-?\s*old)?\b"),
            |caps| {
                // "2 years" alone is a duration, not an age
                let whole = caps.get(0)?.as_str().to_ascii_lowercase();
                if whole.ends_with("old") || whole.ends_with("y/o") {
                    age_in_range(caps, 1)
                } else {
                    None
                }
            },
        ),
        FieldRule::new(
            "age_keyword",
            re(r"(?i)\bage[ds]?\s*(?:of|is|:|=)?\s*(\d{1,3})\b"),
            |caps| age_in_range(caps, 1),
        ),
        FieldRule::new(
            "shorthand",
            re(r"(?i)\b(\d{1,3})\s?[mf]\b"),
            |caps| age_in_range(caps, 1),
        ),
        FieldRule::new(
            "standalone",
            // Group 1 catches a currency or digit-group prefix, group 3 a
            // unit suffix; either disqualifies the number as an age.
            re(r"(?i)(rs\.?\s*|inr\s*|₹\s*|\d[,.])?\b(\d{2})\b(\s*-?\s*(?:months?|mos?|years?|yrs?|days?|weeks?|lakhs?|crores?|rupees|%)|[,.]\d)?"),
            |caps| {
                if caps.get(1).is_some() || caps.get(3).is_some() {
                    return None;
                }
                age_in_range(caps, 2)
            },
        ),
    ]
});

fn gender_word(word: &str) -> Option<Gender> {
    match word.to_ascii_lowercase().as_str() {
        "m" | "male" | "man" | "men" | "gentleman" | "boy" | "husband" | "father" => {
            Some(Gender::Male)
        }
        "f" | "female" | "woman" | "women" | "lady" | "girl" | "wife" | "mother" => {
            Some(Gender::Female)
        }
        _ => None,
    }
}

pub static GENDER_RULES: LazyLock<Vec<FieldRule<Gender>>> = LazyLock::new(|| {
    vec![
        FieldRule::new("shorthand", re(r"(?i)\b\d{1,3}\s?([mf])\b"), |caps| {
            gender_word(caps.get(1)?.as_str())
        }),
        FieldRule::new(
            "word",
            re(r"(?i)\b(male|female|man|woman|men|women|gentleman|lady|boy|girl|husband|wife|father|mother)\b"),
            |caps| gender_word(caps.get(1)?.as_str()),
        ),
    ]
});

/// Phrase rules for every category, then keyword rules for every category.
pub static PROCEDURE_RULES: LazyLock<Vec<FieldRule<String>>> = LazyLock::new(|| {
    let phrases = PROCEDURES.iter().map(|category| {
        let name = category.name;
        FieldRule::new(name, term_regex(category.phrases.iter().copied()), move |_| {
            Some(name.to_string())
        })
    });
    let keywords = PROCEDURES.iter().map(|category| {
        let name = category.name;
        FieldRule::new(name, term_regex(category.keywords.iter().copied()), move |_| {
            Some(name.to_string())
        })
    });
    phrases.chain(keywords).collect()
});

/// A single rule over every alias, so the leftmost city mention wins.
pub static LOCATION_RULES: LazyLock<Vec<FieldRule<String>>> = LazyLock::new(|| {
    let aliases = CITIES.iter().flat_map(|city| city.aliases.iter().copied());
    let pattern = term_regex(aliases);
    let pattern = re(&format!(r"{}\b", pattern.as_str()));
    vec![FieldRule::new("city", pattern, |caps| {
        find_city(caps.get(0)?.as_str()).map(|city| city.name.to_string())
    })]
});

pub static DURATION_RULES: LazyLock<Vec<FieldRule<u32>>> = LazyLock::new(|| {
    vec![
        FieldRule::new(
            "months",
            re(r"(?i)\b(\d{1,3})\s*-?\s*(?:months?|mos?|mths?)\b"),
            |caps| number(caps, 1),
        ),
        FieldRule::new(
            "years",
            re(r"(?i)\b(\d{1,2})\s*-?\s*(?:years?|yrs?)\b(\s*-?\s*old)?"),
            |caps| {
                if caps.get(2).is_some() {
                    return None;
                }
                number(caps, 1).map(|years| years * 12)
            },
        ),
    ]
});
