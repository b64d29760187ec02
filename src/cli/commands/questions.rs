//! Questions command implementation.

use crate::catalog::{QuestionFilter, QuestionStore};
use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, QuestionArgs};
use crate::config::Settings;
use anyhow::Result;

/// Run the questions command.
pub fn run_questions(questions: &QuestionArgs, settings: &Settings) -> Result<()> {
    preflight::check(Operation::Questions, settings)?;

    let store = QuestionStore::open(&settings.sqlite_path())?;
    store.persist(&QuestionStore::load(&settings.questions_path())?)?;

    let found = store.filter(&QuestionFilter::from(questions))?;
    if found.is_empty() {
        Output::warning("No questions found for the selected filters.");
        return Ok(());
    }

    Output::header(&format!("Questions ({} of {})", found.len(), store.count()?));
    for question in &found {
        Output::question(question);
    }

    Ok(())
}
