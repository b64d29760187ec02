//! CLI module for Svar.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::catalog::{QuestionFilter, UserFilter};
use clap::{Args, Parser, Subcommand};

/// Svar - Survey Question Answering
///
/// Ask free-text questions against a survey of clinicians and payers.
/// The name "Svar" is Norwegian for "answer."
#[derive(Parser, Debug)]
#[command(name = "svar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Question-side filters. Omitted or "all" means no constraint.
#[derive(Args, Debug, Clone, Default)]
pub struct QuestionArgs {
    /// Question category (e.g. "Landscape")
    #[arg(long)]
    pub category: Option<String>,

    /// Country or project code the question belongs to
    #[arg(long)]
    pub country: Option<String>,
}

impl From<&QuestionArgs> for QuestionFilter {
    fn from(args: &QuestionArgs) -> Self {
        QuestionFilter {
            category: args.category.clone(),
            country: args.country.clone(),
        }
    }
}

/// User-side filters. Omitted or "all" means no constraint.
#[derive(Args, Debug, Clone, Default)]
pub struct UserArgs {
    /// Stakeholder type (e.g. "FR_Payer")
    #[arg(long)]
    pub stakeholder: Option<String>,

    /// Country grouping of the respondent
    #[arg(long)]
    pub grouping: Option<String>,

    /// Respondent name
    #[arg(long)]
    pub user: Option<String>,
}

impl From<&UserArgs> for UserFilter {
    fn from(args: &UserArgs) -> Self {
        UserFilter {
            stakeholder: args.stakeholder.clone(),
            country_grouping: args.grouping.clone(),
            username: args.user.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check data files, model files and configuration
    Doctor,

    /// Ask a question and show matching answers
    Ask {
        /// The question to ask
        query: String,

        #[command(flatten)]
        questions: QuestionArgs,

        #[command(flatten)]
        users: UserArgs,

        /// Show the first answer verbatim instead of summarizing it
        #[arg(long)]
        no_summary: bool,
    },

    /// Show the survey questions closest to a query
    Search {
        /// Search query
        query: String,

        #[command(flatten)]
        questions: QuestionArgs,
    },

    /// List survey questions
    Questions {
        #[command(flatten)]
        questions: QuestionArgs,
    },

    /// List survey respondents
    Users {
        #[command(flatten)]
        users: UserArgs,
    },

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_filters() {
        let cli = Cli::parse_from([
            "svar",
            "-vv",
            "ask",
            "How satisfied are payers?",
            "--category",
            "Landscape",
            "--stakeholder",
            "FR_Payer",
            "--no-summary",
        ]);
        assert_eq!(cli.verbose, 2);

        let Commands::Ask {
            query,
            questions,
            users,
            no_summary,
        } = cli.command
        else {
            panic!("expected ask");
        };
        assert_eq!(query, "How satisfied are payers?");
        assert!(no_summary);

        let filter = QuestionFilter::from(&questions);
        assert_eq!(filter.category.as_deref(), Some("Landscape"));
        assert!(filter.country.is_none());
        assert_eq!(UserFilter::from(&users).stakeholder.as_deref(), Some("FR_Payer"));
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::parse_from(["svar", "serve"]);
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 3000);
            }
            other => panic!("expected serve, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_users_grouping() {
        let cli = Cli::parse_from(["svar", "users", "--grouping", "FR", "--user", "Jaime Espin"]);
        let Commands::Users { users } = cli.command else {
            panic!("expected users");
        };
        let filter = UserFilter::from(&users);
        assert_eq!(filter.country_grouping.as_deref(), Some("FR"));
        assert_eq!(filter.username.as_deref(), Some("Jaime Espin"));
    }
}
