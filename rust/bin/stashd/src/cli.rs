//! Command-line and environment configuration.
//!
//! Every flag can also come from an environment variable. A `.env` file in
//! the working directory is loaded before parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use stash_core::{RateLimitConfig, ServiceConfig};

/// Authenticated record submission service.
#[derive(Parser, Debug)]
#[command(name = "stashd", version, about = "Authenticated record submission service")]
pub struct Cli {
    #[command(flatten)]
    pub server: ServerArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a bearer token signed with the configured secret.
    IssueToken {
        /// Token subject (who the token is for).
        #[arg(long)]
        subject: String,

        /// Token lifetime in seconds.
        #[arg(long, default_value_t = 24 * 60 * 60)]
        ttl_secs: u64,
    },
}

#[derive(Args, Debug)]
pub struct ServerArgs {
    /// Listen port.
    #[arg(long, env = "PORT", default_value_t = 3000, global = true)]
    pub port: u16,

    /// Bind host.
    #[arg(long, env = "HOST", default_value = "0.0.0.0", global = true)]
    pub host: String,

    /// Path to the redb store file.
    #[arg(long = "db", env = "STASH_DB_PATH", default_value = "data/stash.redb", global = true)]
    pub db_path: PathBuf,

    /// HMAC secret for bearer tokens.
    #[arg(long, env = "STASH_JWT_SECRET", hide_env_values = true, global = true)]
    pub jwt_secret: Option<String>,

    /// Store the record secret as submitted instead of hashing it.
    #[arg(long, env = "STASH_PLAINTEXT_SECRETS", global = true)]
    pub plaintext_secrets: bool,

    /// Rate limit window, in seconds.
    #[arg(long, env = "STASH_RATE_WINDOW_SECS", default_value_t = 15 * 60, global = true)]
    pub rate_window_secs: u64,

    /// Requests allowed per client address per window.
    #[arg(long, env = "STASH_RATE_MAX", default_value_t = 100, global = true)]
    pub rate_max: u32,

    /// Maximum request body, in bytes.
    #[arg(long, env = "STASH_BODY_LIMIT", default_value_t = 100 * 1024, global = true)]
    pub body_limit: usize,
}

impl ServerArgs {
    pub fn into_config(self) -> ServiceConfig {
        ServiceConfig {
            listen: format!("{}:{}", self.host, self.port),
            db_path: self.db_path,
            jwt_secret: self.jwt_secret.unwrap_or_default(),
            hash_secrets: !self.plaintext_secrets,
            body_limit: self.body_limit,
            rate_limit: RateLimitConfig {
                window: Duration::from_secs(self.rate_window_secs),
                max_requests: self.rate_max,
            },
        }
    }
}
