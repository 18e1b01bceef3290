use clap::Args;

use tally_core::questionnaire::{AnswerKind, Part, questions};

#[derive(Args, Debug)]
pub struct QuestionsArgs {
    /// Print only field names
    #[arg(long)]
    pub fields_only: bool,
}

#[allow(clippy::unnecessary_wraps)]
pub fn run(args: &QuestionsArgs) -> anyhow::Result<()> {
    let mut current: Option<Part> = None;
    for q in questions() {
        if args.fields_only {
            println!("{}", q.field);
            continue;
        }
        if current != Some(q.part) {
            if current.is_some() {
                println!();
            }
            println!("{}", q.part.title());
            current = Some(q.part);
        }

        let kind = match q.kind {
            AnswerKind::Single => "one of",
            AnswerKind::Multi => "any of",
            AnswerKind::Text => "free text",
        };
        let required = if q.required { "" } else { ", optional" };
        println!("  {} ({kind}{required})", q.field);
        println!("    {}", q.prompt);
        for option in q.options {
            println!("      - {option}");
        }
    }
    Ok(())
}
