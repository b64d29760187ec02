//! CLI output formatting utilities.

use crate::assistant::QuestionMatch;
use crate::catalog::{Answer, Question, User};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a question row.
    pub fn question(question: &Question) {
        println!(
            "  {} {} {} ({}, {})",
            style("*").cyan(),
            style(&question.question_id).bold(),
            question.question,
            style(&question.category).dim(),
            style(&question.country).dim()
        );
    }

    /// Print a user row.
    pub fn user(user: &User) {
        println!(
            "  {} {} ({}, {}, {})",
            style("*").cyan(),
            style(&user.username).bold(),
            style(&user.user_id).dim(),
            user.stakeholder_type,
            user.country_grouping
        );
    }

    /// Print a semantic match.
    pub fn question_match(m: &QuestionMatch) {
        println!(
            "\n{} {} (score: {:.3})",
            style(">>").green(),
            style(&m.question.question_id).bold(),
            m.score
        );
        println!("   {}", content_preview(&m.question.question, 200));
    }

    /// Print one recorded answer.
    pub fn answer(answer: &Answer) {
        println!(
            "  {} {} / {}: {}",
            style("*").cyan(),
            style(&answer.question_id).dim(),
            style(&answer.user_id).dim(),
            content_preview(&answer.answer, 300)
        );
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis, on a character boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
