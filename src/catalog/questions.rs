//! SQLite-backed question catalog.
//!
//! The questions table is rebuilt (upserted) from the CSV export on every
//! startup and only read afterwards.

use super::{choices, read_table, Question, QuestionFilter};
use crate::error::{Result, SvarError};
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

const REQUIRED_COLUMNS: &[&str] = &["question_id", "question", "category", "country"];

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS questions (
        question_id TEXT PRIMARY KEY,
        question TEXT,
        category TEXT,
        country TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_questions_category ON questions(category);
"#;

/// Question catalog persisted in SQLite.
pub struct QuestionStore {
    conn: Mutex<Connection>,
}

impl QuestionStore {
    /// Open (or create) the question store at `path`.
    #[instrument(skip_all)]
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SvarError::Persistence(format!("Cannot create {:?}: {}", parent, e)))?;
        }

        let conn = Connection::open(path).map_err(persistence)?;

        // Readers from concurrent sessions should not block on each other.
        conn.execute_batch("PRAGMA journal_mode=WAL;").map_err(persistence)?;
        conn.execute_batch(SCHEMA).map_err(persistence)?;

        info!("Opened question store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory question store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(persistence)?;
        conn.execute_batch(SCHEMA).map_err(persistence)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Parse the questions CSV export.
    #[instrument]
    pub fn load(path: &Path) -> Result<Vec<Question>> {
        let questions: Vec<Question> = read_table(path, REQUIRED_COLUMNS)?;
        info!("Loaded {} questions from {:?}", questions.len(), path);
        Ok(questions)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SvarError::Query(format!("Failed to acquire lock: {}", e)))
    }

    /// Upsert every question in one transaction.
    ///
    /// Either all rows are written or, on the first failure, none are.
    #[instrument(skip(self, questions), fields(count = questions.len()))]
    pub fn persist(&self, questions: &[Question]) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SvarError::Persistence(format!("Failed to acquire lock: {}", e)))?;

        let tx = conn.unchecked_transaction().map_err(persistence)?;

        let written = (|| -> rusqlite::Result<usize> {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO questions (question_id, question, category, country)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(question_id) DO UPDATE SET
                    question = excluded.question,
                    category = excluded.category,
                    country = excluded.country
                "#,
            )?;
            for q in questions {
                stmt.execute(params![q.question_id, q.question, q.category, q.country])?;
            }
            Ok(questions.len())
        })();

        match written {
            Ok(count) => {
                tx.commit().map_err(persistence)?;
                info!("Persisted {} questions", count);
                Ok(count)
            }
            Err(e) => {
                warn!("Rolling back question batch: {}", e);
                if let Err(rollback) = tx.rollback() {
                    warn!("Rollback failed: {}", rollback);
                }
                Err(persistence(e))
            }
        }
    }

    /// Questions in the given category; `"all"` in any case returns everything.
    pub fn filter_by_category(&self, category: &str) -> Result<Vec<Question>> {
        self.filter(&QuestionFilter::category(category))
    }

    /// Questions matching every present filter axis, in load order.
    #[instrument(skip(self))]
    pub fn filter(&self, filter: &QuestionFilter) -> Result<Vec<Question>> {
        let constraints = filter.constraints();

        let mut sql = String::from("SELECT question_id, question, category, country FROM questions");
        if !constraints.is_empty() {
            let clauses: Vec<String> = constraints
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{} = ?{}", c.column, i + 1))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY rowid");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql).map_err(query)?;
        let rows = stmt
            .query_map(params_from_iter(constraints.iter().map(|c| c.value.as_str())), |row| {
                Ok(Question {
                    question_id: row.get(0)?,
                    question: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    category: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    country: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                })
            })
            .map_err(query)?;

        let questions = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(query)?;
        debug!("Filter matched {} questions", questions.len());
        Ok(questions)
    }

    /// Number of persisted questions.
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))
            .map_err(query)?;
        Ok(count as usize)
    }

    /// Category choices, led by "All".
    pub fn categories(&self) -> Result<Vec<String>> {
        self.distinct("category")
    }

    /// Country (project) choices, led by "All".
    pub fn countries(&self) -> Result<Vec<String>> {
        self.distinct("country")
    }

    fn distinct(&self, column: &'static str) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {column} FROM questions WHERE {column} IS NOT NULL GROUP BY {column} ORDER BY MIN(rowid)"
            ))
            .map_err(query)?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(query)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(query)?;
        Ok(choices(values.iter().map(String::as_str)))
    }
}

fn persistence(e: rusqlite::Error) -> SvarError {
    SvarError::Persistence(e.to_string())
}

fn query(e: rusqlite::Error) -> SvarError {
    SvarError::Query(format!("Question lookup failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, text: &str, category: &str, country: &str) -> Question {
        Question {
            question_id: id.to_string(),
            question: text.to_string(),
            category: category.to_string(),
            country: country.to_string(),
        }
    }

    fn sample() -> Vec<Question> {
        vec![
            question("Q1", "How satisfied are you with treatment X?", "Landscape", "DAI-475"),
            question("Q2", "Rate your satisfaction with treatment X", "HTA Assessment", "DAI-475"),
            question("Q3", "What is your favorite color?", "Landscape", "DAI-512"),
        ]
    }

    #[test]
    fn test_filter_by_category_all_any_case() {
        let store = QuestionStore::in_memory().unwrap();
        store.persist(&sample()).unwrap();

        for all in ["all", "All", "ALL"] {
            let questions = store.filter_by_category(all).unwrap();
            assert_eq!(questions.len(), 3);
            assert_eq!(questions[0].question_id, "Q1");
        }
    }

    #[test]
    fn test_filter_by_category_exact() {
        let store = QuestionStore::in_memory().unwrap();
        store.persist(&sample()).unwrap();

        let ids: Vec<String> = store
            .filter_by_category("Landscape")
            .unwrap()
            .into_iter()
            .map(|q| q.question_id)
            .collect();
        assert_eq!(ids, vec!["Q1", "Q3"]);

        assert!(store.filter_by_category("landscape").unwrap().is_empty());
        assert!(store.filter_by_category("Unknown").unwrap().is_empty());
    }

    #[test]
    fn test_filter_by_category_blank_or_padded_matches_nothing() {
        let store = QuestionStore::in_memory().unwrap();
        store.persist(&sample()).unwrap();

        for category in ["", "   ", " Landscape ", "Landscape "] {
            assert!(
                store.filter_by_category(category).unwrap().is_empty(),
                "{category:?} should match no questions"
            );
        }
    }

    #[test]
    fn test_concurrent_readers_see_every_row() {
        let store = std::sync::Arc::new(QuestionStore::in_memory().unwrap());
        store.persist(&sample()).unwrap();

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    (0..25)
                        .map(|_| {
                            let ids: Vec<String> = store
                                .filter_by_category("all")
                                .unwrap()
                                .into_iter()
                                .map(|q| q.question_id)
                                .collect();
                            (ids, store.count().unwrap())
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for reader in readers {
            for (ids, count) in reader.join().unwrap() {
                assert_eq!(ids, vec!["Q1", "Q2", "Q3"]);
                assert_eq!(count, 3);
            }
        }
    }

    #[test]
    fn test_filter_category_and_country() {
        let store = QuestionStore::in_memory().unwrap();
        store.persist(&sample()).unwrap();

        let filter = QuestionFilter::category("Landscape").with_country("DAI-512");
        let questions = store.filter(&filter).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question_id, "Q3");

        let filter = QuestionFilter::category("All").with_country("DAI-475");
        assert_eq!(store.filter(&filter).unwrap().len(), 2);
    }

    #[test]
    fn test_persist_is_idempotent() {
        let store = QuestionStore::in_memory().unwrap();
        store.persist(&sample()).unwrap();
        store.persist(&sample()).unwrap();
        assert_eq!(store.count().unwrap(), 3);

        let mut updated = sample();
        updated[0].question = "How satisfied are you overall?".to_string();
        store.persist(&updated).unwrap();

        assert_eq!(store.count().unwrap(), 3);
        let q1 = &store.filter_by_category("all").unwrap()[0];
        assert_eq!(q1.question, "How satisfied are you overall?");
    }

    #[test]
    fn test_persist_rolls_back_failed_batch() {
        let store = QuestionStore::in_memory().unwrap();
        store
            .conn
            .lock()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON questions
                 WHEN NEW.question_id = 'BAD'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let mut batch = sample();
        batch.push(question("BAD", "Broken row", "Landscape", "DAI-475"));

        let err = store.persist(&batch).unwrap_err();
        assert!(matches!(err, SvarError::Persistence(_)));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_load_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.csv");
        std::fs::write(
            &path,
            " Question Id ,Question,Category,Country\nQ1,  Do you prescribe X?  ,Landscape,DAI-475\nQ2,Why?,Landscape,DAI-475\n",
        )
        .unwrap();

        let questions = QuestionStore::load(&path).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question, "Do you prescribe X?");

        // Loading twice and persisting both times keeps one row per id.
        let store = QuestionStore::in_memory().unwrap();
        store.persist(&questions).unwrap();
        store.persist(&QuestionStore::load(&path).unwrap()).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_load_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.csv");
        std::fs::write(&path, "Question Id,Question\nQ1,Hi\n").unwrap();

        let err = QuestionStore::load(&path).unwrap_err();
        assert!(matches!(err, SvarError::DataLoad(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = QuestionStore::load(Path::new("/nonexistent/questions.csv")).unwrap_err();
        assert!(matches!(err, SvarError::DataLoad(_)));
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("questions.db");

        let store = QuestionStore::open(&path).unwrap();
        store.persist(&sample()).unwrap();
        drop(store);

        let reopened = QuestionStore::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 3);
    }

    #[test]
    fn test_choices() {
        let store = QuestionStore::in_memory().unwrap();
        store.persist(&sample()).unwrap();

        assert_eq!(
            store.categories().unwrap(),
            vec!["All", "Landscape", "HTA Assessment"]
        );
        assert_eq!(store.countries().unwrap(), vec!["All", "DAI-475", "DAI-512"]);
    }
}
