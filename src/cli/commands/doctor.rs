//! Doctor command - verify data files, models and configuration.

use crate::catalog::{QuestionStore, UserDirectory};
use crate::cli::Output;
use crate::config::{EmbeddingProvider, Settings};
use console::style;
use std::path::{Path, PathBuf};

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, results: Vec<CheckResult>, checks: &mut Vec<CheckResult>) {
    println!("{}", style(title).bold());
    for check in &results {
        check.print();
    }
    checks.extend(results);
    println!();
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    Output::header("Svar Doctor");
    println!();
    println!("Checking data files, models and configuration...\n");

    let mut checks = Vec::new();

    print_section("Survey Data", check_data_files(settings), &mut checks);
    print_section("Embeddings", check_embedding(settings), &mut checks);
    print_section("Summarizer", vec![check_summarizer(settings)], &mut checks);
    print_section("Storage", vec![check_database(&settings.sqlite_path())], &mut checks);

    let config_path = config_path.unwrap_or_else(Settings::default_config_path);
    print_section("Configuration", vec![check_config_file(&config_path)], &mut checks);

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Svar.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!(
            "All checks passed with {} warning(s).",
            warnings
        ));
    } else {
        Output::success("All checks passed! Svar is ready to use.");
    }

    Ok(())
}

/// Parse the questions and users files, and look for the answers file.
fn check_data_files(settings: &Settings) -> Vec<CheckResult> {
    let hint = "Set the path under [data] in the config file";
    let mut results = Vec::new();

    let questions_path = settings.questions_path();
    results.push(match QuestionStore::load(&questions_path) {
        Ok(questions) => CheckResult::ok(
            "Questions",
            &format!("{} ({} rows)", questions_path.display(), questions.len()),
        ),
        Err(e) => CheckResult::error("Questions", &e.to_string(), hint),
    });

    let directory = UserDirectory::new(settings.users_path(), settings.answers_path());
    results.push(match directory.users() {
        Ok(users) => CheckResult::ok(
            "Users",
            &format!("{} ({} rows)", directory.users_path().display(), users.len()),
        ),
        Err(e) => CheckResult::error("Users", &e.to_string(), hint),
    });

    results.push(check_file("Answers", directory.answers_path(), hint));
    results
}

fn check_embedding(settings: &Settings) -> Vec<CheckResult> {
    let embedding = &settings.embedding;
    let mut results = vec![CheckResult::ok("Provider", &embedding.provider.to_string())];

    match embedding.provider {
        EmbeddingProvider::Minilm => {
            let hint = "Download all-MiniLM-L6-v2 (model.safetensors and tokenizer.json) and set [embedding] model_path / tokenizer_path";
            results.push(check_file(
                "MiniLM weights",
                &Settings::expand_path(&embedding.model_path),
                hint,
            ));
            results.push(check_file(
                "MiniLM tokenizer",
                &Settings::expand_path(&embedding.tokenizer_path),
                hint,
            ));
        }
        EmbeddingProvider::Openai => results.push(check_openai_api_key(true)),
        EmbeddingProvider::Hash => results.push(CheckResult::warning(
            "Hash embeddings",
            "lexical matching only",
            "Use the minilm provider for semantic matching",
        )),
    }

    results
}

fn check_summarizer(settings: &Settings) -> CheckResult {
    if !settings.summarizer.enabled {
        return CheckResult::ok("Summarizer", "disabled, answers shown verbatim");
    }
    match check_openai_api_key(false) {
        r if r.status == CheckStatus::Ok => {
            CheckResult::ok("Summarizer", &format!("{} ({})", settings.summarizer.model, r.message))
        }
        r => CheckResult::warning(
            "Summarizer",
            &format!("OPENAI_API_KEY {}, answers shown verbatim", r.message),
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

fn check_file(name: &str, path: &Path, hint: &str) -> CheckResult {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => CheckResult::ok(
            name,
            &format!("{} ({})", path.display(), format_size(meta.len())),
        ),
        Ok(_) => CheckResult::error(name, &format!("{} is not a file", path.display()), hint),
        Err(_) => CheckResult::error(name, &format!("{} not found", path.display()), hint),
    }
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key(required: bool) -> CheckResult {
    let missing = |message: &str| {
        let hint = "Set with: export OPENAI_API_KEY='sk-...'";
        if required {
            CheckResult::error("OPENAI_API_KEY", message, hint)
        } else {
            CheckResult::warning("OPENAI_API_KEY", message, hint)
        }
    };

    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", masked))
        }
        Ok(key) if key.is_empty() => missing("empty"),
        Ok(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => missing("not set"),
    }
}

fn check_database(db_path: &Path) -> CheckResult {
    if db_path.exists() {
        let size = std::fs::metadata(db_path)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        CheckResult::ok("Database", &format!("{} ({})", db_path.display(), size))
    } else {
        CheckResult::warning(
            "Database",
            &format!("{} (not created yet)", db_path.display()),
            "Database will be created on first use",
        )
    }
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: svar config edit",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_data_file_checks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("questions.csv"),
            "Question Id,Question,Category,Country\nQ1,Price?,Pricing,FR\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("users.csv"), "user_id,username\nu1,A\n").unwrap();

        let mut settings = Settings::default();
        settings.data.questions_path = dir.path().join("questions.csv").display().to_string();
        settings.data.users_path = dir.path().join("users.csv").display().to_string();
        settings.data.answers_path = dir.path().join("answers.csv").display().to_string();

        let results = check_data_files(&settings);
        assert_eq!(results[0].status, CheckStatus::Ok);
        assert!(results[0].message.contains("1 rows"));
        // Users file lacks required columns; answers file is missing.
        assert_eq!(results[1].status, CheckStatus::Error);
        assert_eq!(results[2].status, CheckStatus::Error);
    }

    #[test]
    fn test_disabled_summarizer_is_ok() {
        let mut settings = Settings::default();
        settings.summarizer.enabled = false;
        assert_eq!(check_summarizer(&settings).status, CheckStatus::Ok);
    }
}
