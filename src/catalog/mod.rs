//! Survey catalogs: questions, users and their recorded answers.
//!
//! Questions are loaded once and persisted into SQLite so they can be narrowed
//! by category and country. Users and answers are read from their CSV files on
//! every lookup.

mod questions;
mod users;

pub use questions::QuestionStore;
pub use users::UserDirectory;

use crate::error::{Result, SvarError};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Selection value that disables a filter axis (compared case-insensitively).
pub const ALL: &str = "all";

/// A survey question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: String,
    pub question: String,
    pub category: String,
    pub country: String,
}

/// A survey participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub stakeholder_type: String,
    pub country_grouping: String,
}

/// One participant's recorded answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    pub user_id: String,
    pub answer: String,
}

/// Field access by column name, used to evaluate constraints in memory.
pub trait Record {
    fn field(&self, column: &str) -> Option<&str>;
}

impl Record for Question {
    fn field(&self, column: &str) -> Option<&str> {
        match column {
            "question_id" => Some(&self.question_id),
            "question" => Some(&self.question),
            "category" => Some(&self.category),
            "country" => Some(&self.country),
            _ => None,
        }
    }
}

impl Record for User {
    fn field(&self, column: &str) -> Option<&str> {
        match column {
            "user_id" => Some(&self.user_id),
            "username" => Some(&self.username),
            "stakeholder_type" => Some(&self.stakeholder_type),
            "country_grouping" => Some(&self.country_grouping),
            _ => None,
        }
    }
}

/// One active filter axis: the column must equal `value` exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub column: &'static str,
    pub value: String,
}

impl Constraint {
    /// Build a constraint unless the selection is absent, blank or "all".
    pub fn active(column: &'static str, selection: Option<&str>) -> Option<Self> {
        let value = selection?.trim();
        if value.is_empty() || value.eq_ignore_ascii_case(ALL) {
            return None;
        }
        Some(Self {
            column,
            value: value.to_string(),
        })
    }

    /// Build a constraint unless the selection is absent or exactly "all" in
    /// any case. Anything else, blank or padded values included, must match
    /// the column verbatim.
    pub fn exact(column: &'static str, selection: Option<&str>) -> Option<Self> {
        let value = selection?;
        if value.eq_ignore_ascii_case(ALL) {
            return None;
        }
        Some(Self {
            column,
            value: value.to_string(),
        })
    }
}

/// Apply every constraint as a conjunction. No constraints matches everything.
pub fn matches_all<R: Record>(record: &R, constraints: &[Constraint]) -> bool {
    constraints
        .iter()
        .all(|c| record.field(c.column) == Some(c.value.as_str()))
}

/// Question-side filter criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionFilter {
    pub category: Option<String>,
    pub country: Option<String>,
}

impl QuestionFilter {
    /// Filter on category only.
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            country: None,
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn constraints(&self) -> Vec<Constraint> {
        [
            Constraint::exact("category", self.category.as_deref()),
            Constraint::exact("country", self.country.as_deref()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// User-side filter criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFilter {
    pub stakeholder: Option<String>,
    pub country_grouping: Option<String>,
    pub username: Option<String>,
}

impl UserFilter {
    pub fn constraints(&self) -> Vec<Constraint> {
        [
            Constraint::active("stakeholder_type", self.stakeholder.as_deref()),
            Constraint::active("country_grouping", self.country_grouping.as_deref()),
            Constraint::active("username", self.username.as_deref()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn matches(&self, user: &User) -> bool {
        matches_all(user, &self.constraints())
    }
}

/// Choices offered for every filter axis, each led by "All".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterOptions {
    pub categories: Vec<String>,
    pub countries: Vec<String>,
    pub stakeholders: Vec<String>,
    pub country_groupings: Vec<String>,
    pub usernames: Vec<String>,
}

/// Distinct values in first-seen order, prefixed with "All".
pub(crate) fn choices<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out = vec!["All".to_string()];
    for value in values {
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}

/// Normalize a header: trim, lower-case, collapse inner whitespace to `_`.
pub(crate) fn normalize_header(header: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex"));
    re.replace_all(header.trim().trim_start_matches('\u{feff}').trim(), "_")
        .to_lowercase()
}

/// Decode file contents as UTF-8, falling back to ISO-8859-1.
fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

/// Read a CSV table into typed rows.
///
/// Headers are normalized before `required` columns are checked and before
/// rows are deserialized, so `Question Id` satisfies `question_id`.
pub(crate) fn read_table<T: DeserializeOwned>(path: &Path, required: &[&str]) -> Result<Vec<T>> {
    let bytes = std::fs::read(path)
        .map_err(|e| SvarError::DataLoad(format!("Cannot read {}: {}", path.display(), e)))?;
    parse_table(&decode(bytes), required)
        .map_err(|e| SvarError::DataLoad(format!("{}: {}", path.display(), e)))
}

fn parse_table<T: DeserializeOwned>(
    text: &str,
    required: &[&str],
) -> std::result::Result<Vec<T>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: csv::StringRecord = reader
        .headers()
        .map_err(|e| format!("invalid header row: {}", e))?
        .iter()
        .map(normalize_header)
        .collect();

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(format!("missing required column(s): {}", missing.join(", ")));
    }

    reader.set_headers(headers);

    let mut rows = Vec::new();
    for (line, record) in reader.deserialize::<T>().enumerate() {
        let row = record.map_err(|e| format!("row {}: {}", line + 2, e))?;
        rows.push(row);
    }

    debug!("Parsed {} rows", rows.len());
    Ok(rows)
}
