use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use serde_json::Value;

use tally_core::questionnaire::{self, join_multi};
use tally_core::types::Answers;

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Answers file (.toml or .json) mapping field names to labels.
    /// Multi-select answers may be given as arrays.
    #[arg(long, conflicts_with = "answer", required_unless_present = "answer")]
    pub file: Option<PathBuf>,

    /// One answer as FIELD=LABEL. Repeat a field to select several labels.
    #[arg(long = "answer", value_name = "FIELD=LABEL")]
    pub answer: Vec<String>,

    /// The respondent agrees to take part in the survey
    #[arg(long)]
    pub consent: bool,
}

pub fn run(args: SubmitArgs, config_path: &Path) -> anyhow::Result<()> {
    questionnaire::require_consent(args.consent)?;

    let answers = match &args.file {
        Some(path) => answers_from_file(path)?,
        None => answers_from_pairs(&args.answer)?,
    };
    questionnaire::validate_choices(&answers)?;

    let (_, mut session) = super::open_session(config_path)?;
    let record = session.submit(answers).context("Submission failed")?;
    let total = session.current_view()?.len();

    println!("Response recorded at {} ({total} total)", record.timestamp);
    Ok(())
}

fn answers_from_pairs(pairs: &[String]) -> anyhow::Result<Answers> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for pair in pairs {
        let (field, label) = pair
            .split_once('=')
            .with_context(|| format!("Expected FIELD=LABEL, got {pair:?}"))?;
        let field = field.trim();
        match grouped.iter_mut().find(|(f, _)| f == field) {
            Some((_, labels)) => labels.push(label.to_string()),
            None => grouped.push((field.to_string(), vec![label.to_string()])),
        }
    }
    Ok(grouped
        .into_iter()
        .map(|(field, labels)| (field, join_multi(&labels)))
        .collect())
}

fn answers_from_file(path: &Path) -> anyhow::Result<Answers> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read answers file: {}", path.display()))?;
    let value: Value = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&text)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?,
        _ => {
            let table: toml::Table = toml::from_str(&text)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?;
            serde_json::to_value(table)?
        }
    };
    answers_from_value(value)
}

fn answers_from_value(value: Value) -> anyhow::Result<Answers> {
    let Value::Object(map) = value else {
        anyhow::bail!("Answers file must contain a table of FIELD = LABEL");
    };
    map.into_iter()
        .map(|(field, value)| {
            let label = match value {
                Value::String(s) => s,
                Value::Array(items) => {
                    let labels = items
                        .into_iter()
                        .map(|item| match item {
                            Value::String(s) => Ok(s),
                            other => Err(anyhow::anyhow!(
                                "Field {field}: expected a list of labels, found {other}"
                            )),
                        })
                        .collect::<anyhow::Result<Vec<_>>>()?;
                    join_multi(&labels)
                }
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                other => anyhow::bail!("Field {field}: unsupported answer {other}"),
            };
            Ok((field, label))
        })
        .collect()
}
