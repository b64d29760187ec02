//! Ask command implementation.

use crate::assistant::{AskRequest, Assistant, QueryOutcome};
use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, QuestionArgs, UserArgs};
use crate::config::Settings;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    query: &str,
    questions: &QuestionArgs,
    users: &UserArgs,
    no_summary: bool,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'svar doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let spinner = Output::spinner("Loading survey...");
    let assistant = match Assistant::new(settings) {
        Ok(assistant) => assistant,
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to start: {}", e));
            return Err(e.into());
        }
    };

    let request = AskRequest::new(query)
        .with_questions(questions.into())
        .with_users(users.into())
        .with_summary(!no_summary);

    spinner.set_message("Searching survey...");
    let outcome = assistant.ask(&request).await;
    spinner.finish_and_clear();

    match outcome {
        Ok(QueryOutcome::Answered {
            matches,
            answers,
            summary,
        }) => {
            println!("\n{}\n", summary);

            Output::header("Matched questions");
            for m in &matches {
                Output::question_match(m);
            }

            Output::header(&format!("Answers ({})", answers.len()));
            for answer in &answers {
                Output::answer(answer);
            }
        }
        Ok(QueryOutcome::NoAnswers { matches }) => {
            Output::header("Matched questions");
            for m in &matches {
                Output::question_match(m);
            }
            println!();
            Output::warning("No answers found for the selected questions and users.");
        }
        Ok(other) => {
            Output::warning(other.empty_message().unwrap_or("Nothing to show."));
        }
        Err(e) => {
            Output::error(&format!("Failed to answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
