//! Ask command.

use super::{open_index, top_k};
use crate::config::Settings;
use crate::decision::DecisionStatus;
use crate::pipeline::CoveragePipeline;

pub fn run(query: &str, top_k_flag: Option<usize>, json: bool, settings: &Settings) -> anyhow::Result<()> {
    let index = open_index(settings)?;
    if index.is_empty() {
        eprintln!("Note: no policy documents indexed yet. Run 'coverage-desk ingest <files>'.");
    }

    let pipeline = CoveragePipeline::from_settings(&index, settings)?;
    let decision = pipeline.answer(query, top_k(settings, top_k_flag));

    if json {
        println!("{}", serde_json::to_string_pretty(&decision.to_response())?);
        return Ok(());
    }

    let label = match decision.status() {
        DecisionStatus::Approved => "APPROVED",
        DecisionStatus::Rejected => "REJECTED",
        DecisionStatus::Error => "ERROR",
    };
    println!("Decision: {label}");
    if decision.is_approved() {
        println!("Amount:   Rs. {}", crate::decision::rules::format_amount(decision.amount()));
    }
    println!("Why:");
    for reason in decision.justification() {
        println!("  - {reason}");
    }
    if !decision.clauses_used().is_empty() {
        println!("Clauses:");
        for clause in decision.clauses_used() {
            println!("  - {clause}");
        }
    }
    Ok(())
}
