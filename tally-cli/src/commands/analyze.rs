use std::path::Path;

use anyhow::Context;
use clap::Args;

use tally_core::analyze::cluster_responses;
use tally_core::render::cluster_report;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,

    /// Override the configured number of clusters
    #[arg(long)]
    pub clusters: Option<usize>,
}

pub fn run(args: &AnalyzeArgs, config_path: &Path) -> anyhow::Result<()> {
    let (mut config, mut session) = super::open_session(config_path)?;
    if let Some(k) = args.clusters {
        anyhow::ensure!(k >= 1, "--clusters must be at least 1");
        config.analysis.clusters = k;
    }

    let records = session
        .current_view()
        .context("Cannot load responses")?;
    let outcome = cluster_responses(records, &config.analysis).context("Clustering failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", cluster_report(&outcome));
    }
    Ok(())
}
