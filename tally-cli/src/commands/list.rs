use std::path::Path;

use anyhow::Context;
use clap::Args;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print the records as a JSON array
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &ListArgs, config_path: &Path) -> anyhow::Result<()> {
    let (_, mut session) = super::open_session(config_path)?;
    let records = session
        .current_view()
        .context("Cannot load responses")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No responses yet.");
        return Ok(());
    }
    for (idx, record) in records.iter().enumerate() {
        if idx > 0 {
            println!();
        }
        println!("#{} {}", idx + 1, record.timestamp);
        for (field, value) in &record.answers {
            println!("  {field}: {value}");
        }
    }
    Ok(())
}
