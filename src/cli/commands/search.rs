//! Search command implementation.

use crate::assistant::Assistant;
use crate::catalog::QuestionFilter;
use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, QuestionArgs};
use crate::config::Settings;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, questions: &QuestionArgs, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'svar doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let assistant = Assistant::new(settings)?;

    let spinner = Output::spinner("Searching...");
    let results = assistant
        .search_questions(query, &QuestionFilter::from(questions))
        .await;
    spinner.finish_and_clear();

    match results {
        Ok(matches) => {
            if matches.is_empty() {
                Output::warning("No questions found for the selected filters.");
            } else {
                Output::success(&format!("Found {} matching questions", matches.len()));

                for m in &matches {
                    Output::question_match(m);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(anyhow::anyhow!("{}", e));
        }
    }

    Ok(())
}
