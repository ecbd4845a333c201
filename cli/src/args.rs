//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for review-relay
#[derive(Parser, Debug)]
#[command(name = "review-relay")]
#[command(author, version, about = "Propagate approved Gerrit changes to an upstream review server")]
#[command(long_about = r#"
review-relay watches the event stream of a downstream Gerrit server. When a
reviewer comments with the trigger token (default "Upstream-Ready+1") on a
change of an upstream-enabled project, and every configured label is approved,
the change is re-submitted to the upstream server and the result is reported
back as a review comment. Projects with a `source` repository are re-synced
into the downstream server a while after the upstream server reports a ref
update.

Configuration files are loaded from (in priority order):
1. REVIEW_RELAY_* environment variables
2. --config <path>                       Explicit config file
3. ./review-relay.toml                   Project-level config
4. ~/.config/review-relay/config.toml    Global config

Example:
  review-relay -v run
  review-relay propagate --event comment-added.json
  review-relay sync platform/core
  review-relay --config /etc/review-relay.toml check-config
"#)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write logs to a daily-rotated file in this directory
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Append propagation decisions as JSON lines to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub audit_log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Listen to the downstream event stream and propagate triggered changes
    Run,

    /// Run the propagation workflow once for a single comment-added event
    Propagate {
        /// JSON event file, or `-` for stdin
        #[arg(long, value_name = "FILE")]
        event: PathBuf,
    },

    /// Mirror one project from its source repository into the downstream server
    Sync {
        /// Project name as configured in [[projects]]
        project: String,
    },

    /// Load and validate the configuration, then print it
    CheckConfig,
}
