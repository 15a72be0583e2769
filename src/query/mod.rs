//! Structured field extraction from free-text coverage questions.

pub mod parser;
pub mod rules;
pub mod types;
pub mod vocabulary;

pub use parser::QueryParser;
pub use rules::{AGE_RANGE, FieldRule, first_match};
pub use types::{Gender, StructuredQuery};
pub use vocabulary::{CITIES, City, PROCEDURES, ProcedureCategory, find_city, procedure_category};
