//! CLI command implementations.

mod ask;
mod config;
mod doctor;
mod questions;
mod search;
mod serve;
mod users;

pub use ask::run_ask;
pub use config::run_config;
pub use doctor::run_doctor;
pub use questions::run_questions;
pub use search::run_search;
pub use serve::run_serve;
pub use users::run_users;
