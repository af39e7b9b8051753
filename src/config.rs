//! Settings shared by every command, read from the command line or the environment.

use std::path::PathBuf;

use clap::Args;
use tracing_subscriber::filter::LevelFilter;

use crate::auth::PasswordHash;

/// Where data and logs go, and how passwords are hashed.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct Config {
    /// File path to the application SQLite database.
    #[arg(long, env = "FINTRACK_DB", default_value = "fintrack.db", global = true)]
    pub db_path: PathBuf,

    /// The lowest level of log messages to print. `RUST_LOG` takes precedence when set.
    #[arg(long, env = "FINTRACK_LOG_LEVEL", default_value_t = LevelFilter::WARN, global = true)]
    pub log_level: LevelFilter,

    /// Also write debug logs to this file.
    #[arg(long, env = "FINTRACK_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// The bcrypt cost used to hash new passwords.
    #[arg(
        long,
        env = "FINTRACK_BCRYPT_COST",
        default_value_t = PasswordHash::DEFAULT_COST,
        value_parser = clap::value_parser!(u32).range(4..=31),
        global = true
    )]
    pub bcrypt_cost: u32,
}
