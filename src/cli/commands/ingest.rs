//! Ingest command.

use std::path::{Path, PathBuf};

use anyhow::bail;

use super::open_index;
use crate::config::Settings;
use crate::error::PipelineError;
use crate::pipeline::CoveragePipeline;

/// Ingest each file, skipping ones that fail, then persist the index.
pub fn run(files: &[PathBuf], settings: &Settings) -> anyhow::Result<()> {
    let index = open_index(settings)?;
    let pipeline = CoveragePipeline::from_settings(&index, settings)?;

    let (ingested, failed) = ingest_files(&pipeline, files, &settings.index_path)?;

    println!(
        "Indexed {ingested} chunks from {} file(s); {} entries total",
        files.len() - failed,
        index.len()
    );

    if failed == files.len() {
        bail!("no documents were ingested");
    }
    Ok(())
}

/// Ingest `files` in order and persist whatever was committed to `index_path`.
///
/// Extraction failures skip the file. An index failure stops the run, after
/// saving the chunks earlier files added. Returns `(chunks, failed files)`.
fn ingest_files(
    pipeline: &CoveragePipeline<'_>,
    files: &[PathBuf],
    index_path: &Path,
) -> anyhow::Result<(usize, usize)> {
    let mut ingested = 0usize;
    let mut failed = 0usize;

    for path in files {
        match pipeline.ingest_file(path) {
            Ok(count) => {
                println!("{}: {count} chunks", path.display());
                ingested += count;
            }
            // Embedding failures and corruption affect every file
            Err(e @ PipelineError::Index(_)) => {
                if ingested > 0 {
                    pipeline.index().persist(index_path)?;
                    eprintln!("Saved {ingested} chunks ingested before the failure");
                }
                return Err(e.into());
            }
            Err(e) => {
                eprintln!("Skipping {}: {e}", path.display());
                if let Some(hint) = e.recovery_suggestion() {
                    eprintln!("  {hint}");
                }
                failed += 1;
            }
        }
    }

    if ingested > 0 {
        pipeline.index().persist(index_path)?;
    }
    Ok((ingested, failed))
}
