use std::path::Path;

use anyhow::Context;
use clap::Args;

use tally_core::analyze::distribution_for;
use tally_core::render::chart::{DEFAULT_BAR_WIDTH, bar_chart};

#[derive(Args, Debug)]
pub struct ChartArgs {
    /// Fields to chart
    #[arg(default_values = ["Conhecimento_PrEP", "Conhecimento_PEP"])]
    pub fields: Vec<String>,

    /// Length of the longest bar, in characters (1 to 500)
    #[arg(
        long,
        default_value_t = DEFAULT_BAR_WIDTH,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..=500)
    )]
    pub width: usize,
}

pub fn run(args: &ChartArgs, config_path: &Path) -> anyhow::Result<()> {
    let (_, mut session) = super::open_session(config_path)?;
    let records = session
        .current_view()
        .context("Cannot load responses")?;

    for (idx, field) in args.fields.iter().enumerate() {
        let dist = distribution_for(records, field)?;
        if idx > 0 {
            println!();
        }
        print!("{}", bar_chart(&dist, args.width));
    }
    Ok(())
}
