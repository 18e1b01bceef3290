pub mod analyze;
pub mod chart;
pub mod init;
pub mod list;
pub mod questions;
pub mod status;
pub mod submit;

use std::path::Path;

use anyhow::Context;
use clap::Subcommand;

use tally_core::config::TallyConfig;
use tally_core::session::SurveySession;
use tally_core::store::open_store;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a config file and create the empty response store
    Init(init::InitArgs),
    /// Record one questionnaire response
    Submit(submit::SubmitArgs),
    /// List every question with its allowed answers
    Questions(questions::QuestionsArgs),
    /// Show the store backend, size and schema
    Status(status::StatusArgs),
    /// Print every stored response
    List(list::ListArgs),
    /// Bar charts of answer distributions
    Chart(chart::ChartArgs),
    /// Cluster the responses and project them onto two dimensions
    Analyze(analyze::AnalyzeArgs),
}

pub fn run(cmd: Command, config_path: &Path) -> anyhow::Result<()> {
    match cmd {
        Command::Init(args) => init::run(args, config_path),
        Command::Submit(args) => submit::run(args, config_path),
        Command::Questions(args) => questions::run(&args),
        Command::Status(args) => status::run(&args, config_path),
        Command::List(args) => list::run(&args, config_path),
        Command::Chart(args) => chart::run(&args, config_path),
        Command::Analyze(args) => analyze::run(&args, config_path),
    }
}

pub(crate) fn load_config(path: &Path) -> anyhow::Result<TallyConfig> {
    TallyConfig::load(path).with_context(|| format!("Cannot load config: {}", path.display()))
}

/// Load the config and open a session over its store.
pub(crate) fn open_session(config_path: &Path) -> anyhow::Result<(TallyConfig, SurveySession)> {
    let config = load_config(config_path)?;
    let path = config.storage.path();
    let store = open_store(&config.storage)
        .with_context(|| format!("Cannot open response store: {}", path.display()))?;
    Ok((config, SurveySession::new(store)))
}
