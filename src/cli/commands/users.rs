//! Users command implementation.

use crate::catalog::{UserDirectory, UserFilter};
use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, UserArgs};
use crate::config::Settings;
use anyhow::Result;

/// Run the users command.
pub fn run_users(users: &UserArgs, settings: &Settings) -> Result<()> {
    preflight::check(Operation::Users, settings)?;

    let directory = UserDirectory::new(settings.users_path(), settings.answers_path());
    let filter = UserFilter::from(users);

    let all = directory.users()?;
    let total = all.len();
    let found: Vec<_> = all.into_iter().filter(|u| filter.matches(u)).collect();

    if found.is_empty() {
        Output::warning("No users found for the selected filters.");
        return Ok(());
    }

    Output::header(&format!("Users ({} of {})", found.len(), total));
    for user in &found {
        Output::user(user);
    }

    Ok(())
}
