use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::search::{DEFAULT_SEARCH_LIMIT, DEFAULT_SUGGEST_LIMIT};

#[derive(Debug, Parser)]
#[command(
    name = "datacat",
    about = "Search and edit data-catalog collections stored as JSON"
)]
pub struct Cli {
    /// Override the XDG data directory holding collection files
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search across collections
    Search(SearchArgs),
    /// Suggest names, titles and domains matching a partial query
    Suggest(SuggestArgs),
    /// Rebuild the search index from the collection files
    Rebuild(RebuildArgs),
    /// Show search index statistics
    Stats(StatsArgs),
    /// Inspect the known collections
    Collection {
        #[command(subcommand)]
        action: CollectionAction,
    },
    /// Read or edit a single collection element
    Element {
        #[command(subcommand)]
        action: ElementAction,
    },
    /// Start MCP server for AI agent integration
    Mcp,
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query
    pub query: String,

    /// Comma-separated document types to search (e.g. models,policies)
    #[arg(short = 't', long)]
    pub types: Option<String>,

    /// Number of results to return
    #[arg(short = 'n', long, default_value_t = DEFAULT_SEARCH_LIMIT)]
    pub limit: usize,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct SuggestArgs {
    /// Partial query
    pub query: String,

    /// Maximum number of suggestions
    #[arg(short = 'n', long, default_value_t = DEFAULT_SUGGEST_LIMIT)]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Rebuild --

#[derive(Debug, Parser)]
pub struct RebuildArgs {
    /// Reindex only this collection type
    #[arg(short = 'c', long)]
    pub collection: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Stats --

#[derive(Debug, Parser)]
pub struct StatsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Collection subcommands --

#[derive(Debug, Subcommand)]
pub enum CollectionAction {
    /// List every known collection and whether its file exists
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print every element of one collection as JSON
    Show {
        /// Collection type (e.g. models)
        collection: String,
    },
}

// -- Element subcommands --

#[derive(Debug, Subcommand)]
pub enum ElementAction {
    /// Print one element as JSON
    Get {
        /// Collection type (e.g. models)
        collection: String,
        /// Element id
        id: String,
    },
    /// Append a new element; an id is generated if missing
    Add {
        /// Collection type (e.g. models)
        collection: String,
        /// JSON object: inline, @path to read a file, or - for stdin
        body: String,
    },
    /// Merge fields into an existing element
    Update {
        /// Collection type (e.g. models)
        collection: String,
        /// Element id
        id: String,
        /// JSON object: inline, @path to read a file, or - for stdin
        body: String,
    },
    /// Delete an element
    Remove {
        /// Collection type (e.g. models)
        collection: String,
        /// Element id
        id: String,
    },
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "datacat",
            &mut std::io::stdout(),
        );
    }
}
