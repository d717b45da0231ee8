use clap::{Parser, Subcommand, ValueEnum};

pub mod error;
pub mod handler;
pub mod output;

/// shelf - label editor and download list for a personal gallery downloader
#[derive(Parser, Debug)]
#[command(name = "shelf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Override config directory path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<std::path::PathBuf>,

    /// Enable verbose logging (TRACE level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage labels
    Labels {
        #[command(subcommand)]
        action: LabelAction,
    },

    /// List downloads of a label (default group when omitted)
    List {
        #[arg(long)]
        label: Option<String>,

        /// Reorder the label's downloads before listing
        #[arg(long, value_enum)]
        sort: Option<SortArg>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply an action to several downloads at once
    Batch {
        #[arg(value_enum)]
        action: BatchAction,

        /// Positions in the label's list, e.g. 0,2,5
        #[arg(long, value_delimiter = ',', required = true)]
        positions: Vec<usize>,

        #[arg(long)]
        label: Option<String>,

        /// Target label for `move` (default group when omitted)
        #[arg(long)]
        to: Option<String>,

        /// Also remove downloaded files for `delete`
        #[arg(long)]
        remove_files: bool,
    },

    /// Queue every idle or failed download
    StartAll,

    /// Stop every queued or running download
    StopAll,

    /// Forget the reading position of every download
    ResetProgress,

    /// Show which positions a selection shortcut would check
    Select {
        #[arg(value_enum)]
        which: SelectArg,

        #[arg(long)]
        label: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum LabelAction {
    /// List labels in order
    List,
    Add {
        name: String,
    },
    Rename {
        old: String,
        new: String,
    },
    /// Delete a label; its downloads move to the default group
    Delete {
        name: String,
    },
    /// Move the label at position FROM to position TO
    Move {
        from: usize,
        to: usize,
    },
    /// Preview a label row pinned (pins are not saved)
    Pin {
        name: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortArg {
    Pages,
    Title,
    Author,
    Category,
    Shuffle,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchAction {
    Start,
    Stop,
    Delete,
    Move,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectArg {
    Finished,
    Read,
    All,
}
