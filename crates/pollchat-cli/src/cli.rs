use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use pollchat_core::sort::{SortCriteria, SortOrder};

#[derive(Parser)]
#[command(name = "pollchat")]
#[command(about = "Inspect and maintain conversations across the local cache and remote store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Owner whose conversations are shown
    #[arg(long, global = true, value_name = "ID")]
    pub owner: Option<String>,

    /// Path to the local cache database
    #[arg(long, global = true, value_name = "PATH")]
    pub local_db: Option<PathBuf>,

    /// Path to the remote store database
    #[arg(long, global = true, value_name = "PATH")]
    pub remote_db: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List merged conversations in display order
    #[command(alias = "ls")]
    List {
        /// Field to order by
        #[arg(long, value_enum)]
        criteria: Option<CriteriaArg>,
        /// Direction of the ordering
        #[arg(long, value_enum)]
        order: Option<OrderArg>,
        /// Order favorites like any other conversation
        #[arg(long)]
        no_favorite_first: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a conversation as favorite
    Favorite {
        /// Conversation ID
        id: String,
    },
    /// Remove a conversation from favorites
    Unfavorite {
        /// Conversation ID
        id: String,
    },
    /// Move a favorite to a new rank
    Reorder {
        /// Conversation ID
        id: String,
        /// New rank, starting at 1
        rank: u32,
    },
    /// Renumber favorites as 1..N
    Normalize,
    /// Check favorite ranks for duplicates and gaps
    Validate {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a conversation with its messages and poll
    #[command(alias = "rm")]
    Delete {
        /// Conversation ID
        id: String,
        /// Show what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },
    /// Show whether a conversation has messages or a poll
    Related {
        /// Conversation ID
        id: String,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CriteriaArg {
    Activity,
    Title,
    Created,
    Updated,
}

impl From<CriteriaArg> for SortCriteria {
    fn from(value: CriteriaArg) -> Self {
        match value {
            CriteriaArg::Activity => Self::Activity,
            CriteriaArg::Title => Self::Title,
            CriteriaArg::Created => Self::CreatedAt,
            CriteriaArg::Updated => Self::UpdatedAt,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OrderArg {
    #[value(alias = "ascending")]
    Asc,
    #[value(alias = "descending")]
    Desc,
}

impl From<OrderArg> for SortOrder {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Asc => Self::Ascending,
            OrderArg::Desc => Self::Descending,
        }
    }
}
