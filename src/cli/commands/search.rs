//! Search command.

use super::{open_index, top_k};
use crate::config::Settings;
use crate::vector::thresholds;

pub fn run(query: &str, top_k_flag: Option<usize>, json: bool, settings: &Settings) -> anyhow::Result<()> {
    let index = open_index(settings)?;
    let hits = index.search(query, top_k(settings, top_k_flag))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        let strength = if hit.score >= thresholds::VERY_SIMILAR {
            "very similar"
        } else if hit.score >= thresholds::SIMILAR {
            "similar"
        } else if hit.score >= thresholds::RELATED {
            "related"
        } else {
            "weak"
        };
        println!(
            "{}. [{:.3} {strength}] {} #{}",
            rank + 1,
            hit.score,
            hit.metadata.filename,
            hit.metadata.chunk_id
        );
        if let Some(header) = &hit.chunk.section_header {
            println!("   {header}");
        }
        println!("   {}", hit.chunk.preview(200));
    }
    Ok(())
}
