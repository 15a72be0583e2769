//! Parse command: show structured fields without touching the index.

use crate::query::QueryParser;

pub fn run(query: &str) -> anyhow::Result<()> {
    let structured = QueryParser::new().parse(query);
    println!("{}", serde_json::to_string_pretty(&structured)?);
    Ok(())
}
