//! Init and Config commands.

use anyhow::anyhow;

use crate::config::Settings;
use crate::storage::IndexPersistence;

/// Create `.coverage-desk/settings.toml` in the current directory.
///
/// With `force`, an existing settings file is overwritten and the saved
/// index is removed, which also recovers from a corrupted snapshot.
pub fn run_init(force: bool) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let path = Settings::init_config_file(&cwd, force).map_err(|e| anyhow!("{e}"))?;
    println!("Created configuration file at: {}", path.display());

    if force {
        let settings = Settings::load_from(&path).map_err(|e| anyhow!("{e}"))?;
        let persistence = IndexPersistence::new(cwd.join(&settings.index_path));
        if persistence.exists() {
            persistence.clear()?;
            println!("Removed saved index at: {}", settings.index_path.display());
        }
    }

    println!("Edit this file to customize your settings.");
    Ok(())
}

/// Print the effective configuration and index status.
pub fn run_config(settings: &Settings) -> anyhow::Result<()> {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    println!("{}", toml::to_string_pretty(settings)?);

    let persistence = IndexPersistence::new(&settings.index_path);
    match persistence.metadata()? {
        Some(meta) => println!(
            "Index: {} entries, {} dimensions, model {}, saved {}",
            meta.entry_count,
            meta.dimension,
            meta.model,
            meta.created_at_display()
        ),
        None => println!("Index: none saved at {}", settings.index_path.display()),
    }
    Ok(())
}
