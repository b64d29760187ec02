//! User and answer lookups.
//!
//! Both catalogs are re-read from disk on every call, so edits to the CSV
//! files are picked up without a restart.

use super::{choices, read_table, Answer, User, UserFilter};
use crate::error::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

const USER_COLUMNS: &[&str] = &["user_id", "username", "stakeholder_type", "country_grouping"];
const ANSWER_COLUMNS: &[&str] = &["question_id", "user_id", "answer"];

/// Stateless view over the users and answers CSV files.
#[derive(Debug, Clone)]
pub struct UserDirectory {
    users_path: PathBuf,
    answers_path: PathBuf,
}

impl UserDirectory {
    pub fn new(users_path: impl Into<PathBuf>, answers_path: impl Into<PathBuf>) -> Self {
        Self {
            users_path: users_path.into(),
            answers_path: answers_path.into(),
        }
    }

    pub fn users_path(&self) -> &Path {
        &self.users_path
    }

    pub fn answers_path(&self) -> &Path {
        &self.answers_path
    }

    /// Every user in file order.
    pub fn users(&self) -> Result<Vec<User>> {
        read_table(&self.users_path, USER_COLUMNS)
    }

    /// Ids of users matching every present filter. No match is an empty list.
    #[instrument(skip(self))]
    pub fn resolve_user_ids(&self, filter: &UserFilter) -> Result<Vec<String>> {
        let constraints = filter.constraints();
        let ids: Vec<String> = self
            .users()?
            .into_iter()
            .filter(|user| super::matches_all(user, &constraints))
            .map(|user| user.user_id)
            .collect();

        debug!("Resolved {} user ids", ids.len());
        Ok(ids)
    }

    /// Answers whose question and user are both in the given id lists.
    #[instrument(skip_all, fields(questions = question_ids.len(), users = user_ids.len()))]
    pub fn resolve_answers(&self, question_ids: &[String], user_ids: &[String]) -> Result<Vec<Answer>> {
        if question_ids.is_empty() || user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let questions: HashSet<&str> = question_ids.iter().map(String::as_str).collect();
        let users: HashSet<&str> = user_ids.iter().map(String::as_str).collect();

        let answers: Vec<Answer> = read_table::<Answer>(&self.answers_path, ANSWER_COLUMNS)?
            .into_iter()
            .filter(|a| questions.contains(a.question_id.as_str()) && users.contains(a.user_id.as_str()))
            .collect();

        debug!("Resolved {} answers", answers.len());
        Ok(answers)
    }

    /// Stakeholder, country grouping and username choices, each led by "All".
    pub fn filter_choices(&self) -> Result<(Vec<String>, Vec<String>, Vec<String>)> {
        let users = self.users()?;
        Ok((
            choices(users.iter().map(|u| u.stakeholder_type.as_str())),
            choices(users.iter().map(|u| u.country_grouping.as_str())),
            choices(users.iter().map(|u| u.username.as_str())),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SvarError;

    const USERS: &str = "user_id,username,stakeholder_type,Country_grouping\n\
        u1,Nicolas Girard,NSCLC_KOL,FR\n\
        u2,Eric Baseilhac,FR_Payer,FR\n\
        u3,Jaime Espin,ES_Payer,ES\n\
        u4,Arsela Prelaj,NSCLC_KOL,IT\n";

    const ANSWERS: &str = "question_id,user_id,answer\n\
        Q1,u1,Very satisfied overall.\n\
        Q1,u2,Moderately\n\
        Q2,u1,Satisfied\n\
        Q3,u3,Blue\n\
        Q9,u9,Orphaned answer\n";

    fn directory() -> (tempfile::TempDir, UserDirectory) {
        let dir = tempfile::tempdir().unwrap();
        let users = dir.path().join("user_table.csv");
        let answers = dir.path().join("answer_table.csv");
        std::fs::write(&users, USERS).unwrap();
        std::fs::write(&answers, ANSWERS).unwrap();
        (dir, UserDirectory::new(users, answers))
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_no_filters_returns_all_users() {
        let (_dir, directory) = directory();

        let all = directory.resolve_user_ids(&UserFilter::default()).unwrap();
        assert_eq!(all, ids(&["u1", "u2", "u3", "u4"]));

        let wildcard = UserFilter {
            stakeholder: Some("All".to_string()),
            country_grouping: Some("all".to_string()),
            username: Some("ALL".to_string()),
        };
        assert_eq!(directory.resolve_user_ids(&wildcard).unwrap().len(), 4);
    }

    #[test]
    fn test_filters_intersect() {
        let (_dir, directory) = directory();

        let kol = UserFilter {
            stakeholder: Some("NSCLC_KOL".to_string()),
            ..Default::default()
        };
        assert_eq!(directory.resolve_user_ids(&kol).unwrap(), ids(&["u1", "u4"]));

        let all_three = UserFilter {
            stakeholder: Some("NSCLC_KOL".to_string()),
            country_grouping: Some("FR".to_string()),
            username: Some("Nicolas Girard".to_string()),
        };
        assert_eq!(directory.resolve_user_ids(&all_three).unwrap(), ids(&["u1"]));

        let disjoint = UserFilter {
            stakeholder: Some("ES_Payer".to_string()),
            country_grouping: Some("FR".to_string()),
            username: None,
        };
        assert!(directory.resolve_user_ids(&disjoint).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_answers_join() {
        let (_dir, directory) = directory();

        let answers = directory
            .resolve_answers(&ids(&["Q1", "Q2"]), &ids(&["u1"]))
            .unwrap();
        let texts: Vec<&str> = answers.iter().map(|a| a.answer.as_str()).collect();
        assert_eq!(texts, vec!["Very satisfied overall.", "Satisfied"]);

        let dangling = directory
            .resolve_answers(&ids(&["Q9"]), &ids(&["u1", "u2"]))
            .unwrap();
        assert!(dangling.is_empty());
    }

    #[test]
    fn test_resolve_answers_empty_inputs() {
        let (_dir, directory) = directory();

        assert!(directory.resolve_answers(&[], &ids(&["u1"])).unwrap().is_empty());
        assert!(directory.resolve_answers(&ids(&["Q1"]), &[]).unwrap().is_empty());
    }

    #[test]
    fn test_empty_inputs_skip_file_read() {
        let directory = UserDirectory::new("/nonexistent/users.csv", "/nonexistent/answers.csv");
        assert!(directory.resolve_answers(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_missing_user_columns() {
        let dir = tempfile::tempdir().unwrap();
        let users = dir.path().join("user_table.csv");
        std::fs::write(&users, "user_id,username\nu1,Flume\n").unwrap();

        let directory = UserDirectory::new(users, dir.path().join("answers.csv"));
        let err = directory.resolve_user_ids(&UserFilter::default()).unwrap_err();
        assert!(matches!(err, SvarError::DataLoad(_)));
    }

    #[test]
    fn test_rereads_on_every_call() {
        let (dir, directory) = directory();
        assert_eq!(directory.users().unwrap().len(), 4);

        std::fs::write(
            dir.path().join("user_table.csv"),
            "user_id,username,stakeholder_type,Country_grouping\nu7,Maywald,DE_Payer,DE\n",
        )
        .unwrap();
        assert_eq!(directory.resolve_user_ids(&UserFilter::default()).unwrap(), ids(&["u7"]));
    }

    #[test]
    fn test_filter_choices() {
        let (_dir, directory) = directory();
        let (stakeholders, groupings, usernames) = directory.filter_choices().unwrap();

        assert_eq!(stakeholders, vec!["All", "NSCLC_KOL", "FR_Payer", "ES_Payer"]);
        assert_eq!(groupings, vec!["All", "FR", "ES", "IT"]);
        assert_eq!(usernames.len(), 5);
    }
}
