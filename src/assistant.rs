//! Question answering over the survey.
//!
//! The [`Assistant`] is built once at startup and shared behind an `Arc`.
//! Each [`ask`](Assistant::ask) narrows questions by category and country,
//! keeps the ones semantically closest to the query, joins them with the
//! answers of the selected users and condenses the first answer.

use crate::catalog::{
    Answer, FilterOptions, Question, QuestionFilter, QuestionStore, UserDirectory, UserFilter,
};
use crate::config::{Prompts, Settings};
use crate::embedding::{create_embedder, Embedder};
use crate::error::{Result, SvarError};
use crate::search::{SemanticFilter, SimilarityResult};
use crate::summarize::{create_summarizer, with_timeout, Summarizer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// One end-to-end query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    pub query: String,
    #[serde(flatten)]
    pub questions: QuestionFilter,
    #[serde(flatten)]
    pub users: UserFilter,
    /// Condense the first answer before returning it.
    #[serde(default = "default_summarize")]
    pub summarize: bool,
}

fn default_summarize() -> bool {
    true
}

impl AskRequest {
    /// A query with every filter set to "all".
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            questions: QuestionFilter::default(),
            users: UserFilter::default(),
            summarize: true,
        }
    }

    pub fn with_questions(mut self, filter: QuestionFilter) -> Self {
        self.questions = filter;
        self
    }

    pub fn with_users(mut self, filter: UserFilter) -> Self {
        self.users = filter;
        self
    }

    pub fn with_summary(mut self, summarize: bool) -> Self {
        self.summarize = summarize;
        self
    }
}

/// A question that passed semantic filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionMatch {
    pub question: Question,
    pub score: f32,
}

/// Result of [`Assistant::ask`]. Empty stages are outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// The category and country filters matched no questions.
    NoQuestions,
    /// Semantic search returned nothing.
    NoMatches,
    /// The user filters matched nobody.
    NoUsers,
    /// No answers join the matched questions and selected users.
    NoAnswers { matches: Vec<QuestionMatch> },
    Answered {
        matches: Vec<QuestionMatch>,
        answers: Vec<Answer>,
        summary: String,
    },
}

impl QueryOutcome {
    /// Message shown when there is nothing to display.
    pub fn empty_message(&self) -> Option<&'static str> {
        match self {
            QueryOutcome::NoQuestions => Some("No questions found for the selected filters."),
            QueryOutcome::NoMatches => Some("No similar questions found."),
            QueryOutcome::NoUsers => Some("No users found for the selected filters."),
            QueryOutcome::NoAnswers { .. } => {
                Some("No answers found for the selected questions and users.")
            }
            QueryOutcome::Answered { .. } => None,
        }
    }
}

/// Survey question-answering assistant.
pub struct Assistant {
    settings: Settings,
    store: QuestionStore,
    directory: UserDirectory,
    embedder: Arc<dyn Embedder>,
    search: SemanticFilter,
    summarizer: Arc<dyn Summarizer>,
}

impl Assistant {
    /// Build the assistant from configuration.
    ///
    /// Loads the embedding provider, reads the questions file and persists it.
    /// Any failure here is fatal for startup.
    #[instrument(skip_all)]
    pub fn new(settings: Settings) -> Result<Self> {
        let embedder = create_embedder(&settings.embedding)?;

        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let summarizer = create_summarizer(&settings.summarizer, prompts)?;

        let questions = QuestionStore::load(&settings.questions_path())?;
        let store = QuestionStore::open(&settings.sqlite_path())?;
        let persisted = store.persist(&questions)?;
        info!("Question store ready with {} questions", persisted);

        let directory = UserDirectory::new(settings.users_path(), settings.answers_path());

        Ok(Self::with_components(
            settings, store, directory, embedder, summarizer,
        ))
    }

    /// Create an assistant with custom components.
    pub fn with_components(
        settings: Settings,
        store: QuestionStore,
        directory: UserDirectory,
        embedder: Arc<dyn Embedder>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        let search = SemanticFilter::new(embedder.clone())
            .with_timeout(Duration::from_secs(settings.embedding.timeout_seconds));

        Self {
            settings,
            store,
            directory,
            embedder,
            search,
            summarizer,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &QuestionStore {
        &self.store
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Questions matching the category and country filters.
    pub fn filter_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>> {
        self.store.filter(filter)
    }

    /// Candidates within the relative band of the best match.
    pub async fn semantic_search(
        &self,
        query: &str,
        candidates: &[Question],
    ) -> Result<Vec<SimilarityResult>> {
        self.search.search(query, candidates).await
    }

    /// Filtered candidates paired with their scores, best first.
    pub async fn search_questions(
        &self,
        query: &str,
        filter: &QuestionFilter,
    ) -> Result<Vec<QuestionMatch>> {
        let candidates = self.filter_questions(filter)?;
        let ranked = self.semantic_search(query, &candidates).await?;
        Ok(to_matches(&candidates, &ranked))
    }

    pub fn resolve_user_ids(&self, filter: &UserFilter) -> Result<Vec<String>> {
        self.directory.resolve_user_ids(filter)
    }

    pub fn resolve_answers(&self, question_ids: &[String], user_ids: &[String]) -> Result<Vec<Answer>> {
        self.directory.resolve_answers(question_ids, user_ids)
    }

    /// Choices for every filter axis.
    pub fn filter_options(&self) -> Result<FilterOptions> {
        let (stakeholders, country_groupings, usernames) = self.directory.filter_choices()?;
        Ok(FilterOptions {
            categories: self.store.categories()?,
            countries: self.store.countries()?,
            stakeholders,
            country_groupings,
            usernames,
        })
    }

    /// Run the full question-answering flow.
    ///
    /// Failures are logged and returned; they never end the process.
    #[instrument(skip(self, request), fields(query = %request.query))]
    pub async fn ask(&self, request: &AskRequest) -> Result<QueryOutcome> {
        let outcome = self.run(request).await;
        if let Err(e) = &outcome {
            error!("Query failed: {}", e);
        }
        outcome
    }

    async fn run(&self, request: &AskRequest) -> Result<QueryOutcome> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(SvarError::InvalidInput("Query must not be empty".to_string()));
        }

        let candidates = self.filter_questions(&request.questions)?;
        if candidates.is_empty() {
            return Ok(QueryOutcome::NoQuestions);
        }

        let ranked = self.semantic_search(query, &candidates).await?;
        if ranked.is_empty() {
            return Ok(QueryOutcome::NoMatches);
        }
        let matches = to_matches(&candidates, &ranked);

        let user_ids = self.resolve_user_ids(&request.users)?;
        if user_ids.is_empty() {
            return Ok(QueryOutcome::NoUsers);
        }

        let question_ids: Vec<String> = matches
            .iter()
            .map(|m| m.question.question_id.clone())
            .collect();
        let answers = self.resolve_answers(&question_ids, &user_ids)?;
        let Some(first) = answers.first() else {
            return Ok(QueryOutcome::NoAnswers { matches });
        };

        let summary = if request.summarize {
            self.summarize(&first.answer).await
        } else {
            first.answer.clone()
        };

        debug!(
            "{} matched questions, {} answers",
            matches.len(),
            answers.len()
        );
        Ok(QueryOutcome::Answered {
            matches,
            answers,
            summary,
        })
    }

    /// Summarize, falling back to the raw text on any failure.
    async fn summarize(&self, text: &str) -> String {
        let timeout = Duration::from_secs(self.settings.summarizer.timeout_seconds);
        match with_timeout("summarizing answer", timeout, self.summarizer.summarize(text)).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Showing the answer verbatim: {}", e);
                text.to_string()
            }
        }
    }
}

fn to_matches(candidates: &[Question], ranked: &[SimilarityResult]) -> Vec<QuestionMatch> {
    ranked
        .iter()
        .map(|r| QuestionMatch {
            question: candidates[r.index].clone(),
            score: r.score,
        })
        .collect()
}
