use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::info;

use tally_core::config::{StorageBackend, TallyConfig};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Storage backend: csv or sqlite
    #[arg(long, default_value = "csv")]
    pub backend: StorageBackend,

    /// Store location, relative to the config file (default depends on backend)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Overwrite an existing config file. Stored responses are never touched.
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs, config_path: &Path) -> anyhow::Result<()> {
    if config_path.exists() && !args.force {
        anyhow::bail!(
            "Config already exists at {}. Use --force to overwrite it.",
            config_path.display()
        );
    }

    let mut config = TallyConfig::default();
    config.storage.backend = args.backend;
    config.storage.path = Some(
        args.path
            .unwrap_or_else(|| PathBuf::from(args.backend.default_path())),
    );

    let text = config
        .to_toml_string()
        .context("Cannot serialize config")?;
    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory: {}", parent.display()))?;
    }
    std::fs::write(config_path, text)
        .with_context(|| format!("Cannot write config: {}", config_path.display()))?;
    info!(path = %config_path.display(), "Config written");

    // Opening and reading once creates the backing file with an empty schema.
    let (config, session) = super::open_session(config_path)?;
    let existing = session
        .store()
        .load_all()
        .context("Cannot initialize response store")?;

    println!(
        "Initialized {} store at {}",
        config.storage.backend.as_str(),
        config.storage.path().display()
    );
    if !existing.is_empty() {
        println!("  {} existing responses kept", existing.len());
    }
    Ok(())
}
