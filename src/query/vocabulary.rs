//! Procedure categories and the city list the parser and decision rules
//! share.

use regex::Regex;

/// A procedure category with its canonical name and the terms that imply it.
#[derive(Debug)]
pub struct ProcedureCategory {
    /// Canonical name returned by the parser
    pub name: &'static str,
    /// Multi-word phrases and medical synonyms, checked first
    pub phrases: &'static [&'static str],
    /// Single keywords, checked only when no phrase of any category matched
    pub keywords: &'static [&'static str],
}

impl ProcedureCategory {
    /// All terms of this category, phrases first.
    pub fn terms(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.phrases.iter().chain(self.keywords.iter()).copied()
    }
}

pub static PROCEDURES: &[ProcedureCategory] = &[
    ProcedureCategory {
        name: "knee surgery",
        phrases: &[
            "knee surgery",
            "knee replacement",
            "knee arthroscopy",
            "total knee arthroplasty",
            "acl reconstruction",
            "meniscus repair",
        ],
        keywords: &["knee", "acl", "meniscus"],
    },
    ProcedureCategory {
        name: "cardiac surgery",
        phrases: &[
            "cardiac surgery",
            "heart surgery",
            "bypass surgery",
            "coronary artery bypass",
            "angioplasty",
            "valve replacement",
        ],
        keywords: &["cardiac", "heart", "coronary"],
    },
    ProcedureCategory {
        name: "eye surgery",
        phrases: &[
            "eye surgery",
            "cataract surgery",
            "retinal surgery",
            "glaucoma surgery",
            "lasik",
        ],
        keywords: &["eye", "cataract", "retina", "glaucoma"],
    },
    ProcedureCategory {
        name: "hip replacement",
        phrases: &["hip replacement", "hip surgery", "hip arthroplasty"],
        keywords: &["hip"],
    },
    ProcedureCategory {
        name: "dental treatment",
        phrases: &[
            "dental treatment",
            "dental surgery",
            "root canal",
            "tooth extraction",
            "dental implant",
        ],
        keywords: &["dental", "tooth", "teeth"],
    },
    ProcedureCategory {
        name: "maternity",
        phrases: &[
            "maternity benefit",
            "normal delivery",
            "caesarean",
            "c-section",
            "childbirth",
        ],
        keywords: &["maternity", "pregnancy", "prenatal"],
    },
    ProcedureCategory {
        name: "cancer treatment",
        phrases: &[
            "cancer treatment",
            "chemotherapy",
            "radiation therapy",
            "radiotherapy",
            "tumour removal",
            "tumor removal",
        ],
        keywords: &["cancer", "oncology", "tumour", "tumor"],
    },
    ProcedureCategory {
        name: "kidney treatment",
        phrases: &[
            "kidney transplant",
            "kidney stone removal",
            "dialysis",
            "lithotripsy",
        ],
        keywords: &["kidney", "renal"],
    },
    ProcedureCategory {
        name: "appendectomy",
        phrases: &["appendectomy", "appendix removal", "appendicitis surgery"],
        keywords: &["appendix", "appendicitis"],
    },
];

/// A city with the spellings that refer to it. The canonical name is
/// always the first alias.
#[derive(Debug)]
pub struct City {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

pub static CITIES: &[City] = &[
    City { name: "mumbai", aliases: &["mumbai", "bombay"] },
    City { name: "delhi", aliases: &["delhi", "new delhi"] },
    City { name: "bengaluru", aliases: &["bengaluru", "bangalore"] },
    City { name: "chennai", aliases: &["chennai", "madras"] },
    City { name: "kolkata", aliases: &["kolkata", "calcutta"] },
    City { name: "pune", aliases: &["pune", "poona"] },
    City { name: "hyderabad", aliases: &["hyderabad"] },
    City { name: "ahmedabad", aliases: &["ahmedabad"] },
    City { name: "jaipur", aliases: &["jaipur"] },
    City { name: "lucknow", aliases: &["lucknow"] },
    City { name: "gurugram", aliases: &["gurugram", "gurgaon"] },
    City { name: "noida", aliases: &["noida"] },
    City { name: "kochi", aliases: &["kochi", "cochin"] },
    City { name: "thiruvananthapuram", aliases: &["thiruvananthapuram", "trivandrum"] },
    City { name: "chandigarh", aliases: &["chandigarh"] },
    City { name: "indore", aliases: &["indore"] },
    City { name: "nagpur", aliases: &["nagpur"] },
    City { name: "surat", aliases: &["surat"] },
    City { name: "bhopal", aliases: &["bhopal"] },
    City { name: "visakhapatnam", aliases: &["visakhapatnam", "vizag"] },
];

/// Look up a procedure category by canonical name.
pub fn procedure_category(name: &str) -> Option<&'static ProcedureCategory> {
    PROCEDURES
        .iter()
        .find(|category| category.name.eq_ignore_ascii_case(name.trim()))
}

/// Resolve any alias (case-insensitive) to its city.
pub fn find_city(alias: &str) -> Option<&'static City> {
    let alias = alias.trim().to_lowercase();
    let alias = alias.split_whitespace().collect::<Vec<_>>().join(" ");
    CITIES
        .iter()
        .find(|city| city.aliases.iter().any(|a| *a == alias))
}

/// Case-insensitive regex matching any of `terms` as whole words.
///
/// A term may carry a plural ending (`knees`, `surgeries`, `kidneys`) but no
/// other suffix, so `eye` does not match `eyebrow`. Longer terms are tried
/// first so `new delhi` wins over `delhi` at the same position.
pub fn term_regex<'a>(terms: impl IntoIterator<Item = &'a str>) -> Regex {
    let mut terms: Vec<&str> = terms.into_iter().collect();
    terms.sort_by_key(|term| std::cmp::Reverse(term.len()));
    let alternation = terms
        .iter()
        .map(|term| with_plural(term))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
        .expect("escaped terms form a valid pattern")
}

/// Escaped pattern for `term` plus its plural endings.
fn with_plural(term: &str) -> String {
    let (stem, ending) = match term.strip_suffix('y') {
        Some(stem) => (stem, "(?:y|ys|ies)"),
        None => (term, "(?:s|es)?"),
    };
    format!("{}{ending}", regex::escape(stem).replace(' ', r"\s+"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_aliases_resolve() {
        assert_eq!(find_city("Bombay").unwrap().name, "mumbai");
        assert_eq!(find_city("new  delhi").unwrap().name, "delhi");
        assert!(find_city("london").is_none());
    }

    #[test]
    fn test_canonical_name_is_first_alias() {
        for city in CITIES {
            assert_eq!(city.aliases[0], city.name);
        }
    }

    #[test]
    fn test_term_regex_word_start() {
        let re = term_regex(["hip"]);
        assert!(re.is_match("Hip replacement"));
        assert!(!re.is_match("membership benefits"));

        let re = term_regex(["knee"]);
        assert!(re.is_match("Knees and elbows"));
    }

    #[test]
    fn test_term_regex_rejects_longer_words() {
        let re = term_regex(["eye", "hip"]);
        assert!(!re.is_match("eyebrow threading"));
        assert!(!re.is_match("hippocampus scan"));
        assert!(re.is_match("both eyes"));
        assert!(re.is_match("HIP"));
    }

    #[test]
    fn test_term_regex_plural_endings() {
        let re = term_regex(["knee surgery"]);
        assert!(re.is_match("Knee  surgeries are covered"));
        assert!(re.is_match("knee surgery."));
        assert!(!re.is_match("knee surgeryroom"));

        let re = term_regex(["kidney"]);
        assert!(re.is_match("both kidneys"));
    }

    #[test]
    fn test_procedure_lookup() {
        let category = procedure_category("Knee Surgery").unwrap();
        assert!(category.terms().any(|t| t == "acl"));
        assert!(procedure_category("liposuction").is_none());
    }
}
