//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use leankit_client::DEFAULT_CONCURRENCY;

/// Command-line client for a LeanKit Kanban board.
///
/// Credentials and board settings can be given as flags or through the
/// matching `LEANKIT_*` environment variables.
#[derive(Parser, Debug)]
#[command(name = "leankit")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Account email
    #[arg(long, env = "LEANKIT_EMAIL")]
    pub email: Option<String>,

    /// Account password
    #[arg(long, env = "LEANKIT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Account host, e.g. acme.leankit.com
    #[arg(long, env = "LEANKIT_HOST")]
    pub host: Option<String>,

    /// Board every command operates on
    #[arg(short, long, env = "LEANKIT_BOARD_ID")]
    pub board: Option<String>,

    /// Proxy host
    #[arg(long, env = "LEANKIT_PROXY_HOST")]
    pub proxy_host: Option<String>,

    /// Proxy user
    #[arg(long, env = "LEANKIT_PROXY_USER", requires = "proxy_host")]
    pub proxy_user: Option<String>,

    /// Proxy password
    #[arg(
        long,
        env = "LEANKIT_PROXY_PASS",
        hide_env_values = true,
        requires = "proxy_host"
    )]
    pub proxy_pass: Option<String>,

    /// Keep the ASP.NET session cookie between requests
    #[arg(long)]
    pub session: bool,

    /// Log requests instead of sending them
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum concurrent attachment downloads (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// LeanKit operations.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show the board
    Board,
    /// Show the board archive
    Archive,
    /// Show a card
    Card {
        /// Card id
        card_id: u64,
    },
    /// Show a card's history
    History {
        /// Card id
        card_id: u64,
    },
    /// List a card's comments
    Comments {
        /// Card id
        card_id: u64,
    },
    /// Add a comment to a card
    Comment {
        /// Card id
        card_id: u64,
        /// Comment text (HTML allowed)
        text: String,
    },
    /// List a card's attachments
    Attachments {
        /// Card id
        card_id: u64,
    },
    /// Upload a file to a card
    Upload {
        /// Card id
        card_id: u64,
        /// File to upload
        file: PathBuf,
        /// Attachment description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Download one attachment
    Download {
        /// Attachment id
        attachment_id: u64,
        /// Destination path
        path: PathBuf,
    },
    /// Download every attachment of a card into a directory
    DownloadAll {
        /// Card id
        card_id: u64,
        /// Destination directory
        dir: PathBuf,
    },
    /// Assign a user to a card
    Assign {
        /// Card id
        card_id: u64,
        /// User id
        user_id: u64,
        /// Comment required when the assignment breaks a WIP limit
        #[arg(long)]
        override_comment: Option<String>,
    },
    /// Remove a user from a card
    Unassign {
        /// Card id
        card_id: u64,
        /// User id
        user_id: u64,
    },
}
