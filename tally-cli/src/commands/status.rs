use std::path::Path;

use anyhow::Context;
use clap::Args;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the stats as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &StatusArgs, config_path: &Path) -> anyhow::Result<()> {
    let (config, session) = super::open_session(config_path)?;
    let stats = session
        .store()
        .stats()
        .context("Failed to read store stats")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", config.survey.title);
    println!();
    println!("  Backend:   {}", stats.backend);
    println!("  Location:  {}", stats.location);
    if stats.size_bytes > 0 {
        println!("  Size:      {}", format_bytes(stats.size_bytes));
    }
    println!("  Responses: {}", stats.total_records);
    println!();

    println!("  Schema version: {}", stats.schema.version());
    let extensions = stats.schema.extensions();
    if extensions.is_empty() {
        println!("  Optional columns: none");
    } else {
        println!("  Optional columns:");
        for column in extensions {
            println!("    {column}");
        }
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
