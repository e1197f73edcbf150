//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand, ValueHint};

use crate::domain::TaxonomyKind;

/// Manage hierarchical taxonomies (item groups, cost centers, warehouses, party groups) on a remote store
#[derive(Parser, Debug)]
#[command(name = "taxonomy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Project directory holding `.taxonomy.toml` (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    /// Taxonomy to operate on
    #[arg(short, long, global = true, default_value_t = TaxonomyKind::ItemGroup)]
    pub kind: TaxonomyKind,

    /// Company scope (overrides `[scope] company`)
    #[arg(long, global = true)]
    pub company: Option<String>,

    /// Company abbreviation stripped from names (overrides `[scope] abbreviation`)
    #[arg(long, global = true)]
    pub abbr: Option<String>,

    /// Remote store base URL (overrides `[remote] base_url`)
    #[arg(long, global = true, value_hint = ValueHint::Url)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List nodes
    #[command(group(ArgGroup::new("filter").args(["parents", "leafs"])))]
    List {
        /// Only group nodes
        #[arg(long)]
        parents: bool,
        /// Only individual nodes
        #[arg(long)]
        leafs: bool,
    },

    /// Show hierarchy as tree with member counts
    Tree,

    /// Show direct and total member counts per node
    Counts,

    /// Create a node
    #[command(group(ArgGroup::new("type").args(["group", "leaf"])))]
    Create {
        /// Display name
        name: String,
        /// Parent group id
        #[arg(short, long)]
        parent: Option<String>,
        /// Create a group node
        #[arg(long)]
        group: bool,
        /// Create an individual node
        #[arg(long)]
        leaf: bool,
    },

    /// Rename a node
    Rename {
        id: String,
        name: String,
    },

    /// Move a node under another group or to the root
    #[command(group(ArgGroup::new("destination").args(["parent", "root"]).required(true)))]
    Move {
        id: String,
        /// New parent group id
        #[arg(short, long)]
        parent: Option<String>,
        /// Move to the root level (groups only)
        #[arg(long)]
        root: bool,
    },

    /// Move several nodes under one target group
    #[command(group(ArgGroup::new("selection").args(["groups", "subgroups"]).required(true)))]
    Regroup {
        /// Group ids to move
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        groups: Vec<String>,
        /// Subgroup ids to move
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        subgroups: Vec<String>,
        /// Target group id (interactive pick if omitted)
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Delete nodes
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Remove descendants first
        #[arg(long)]
        cascade: bool,
    },

    /// Toggle the default designation of a node
    Default {
        id: String,
    },

    /// Print the normalized form of a name
    Normalize {
        name: String,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,

    /// Print a config template
    Template,
}
