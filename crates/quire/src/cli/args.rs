//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(version, about = "Quire - work with the entries of a content repository", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Site configuration (YAML or TOML)
    #[arg(long, short, env = "QUIRE_CONFIG", default_value = "config.yml", global = true)]
    pub config: PathBuf,

    /// Content root for the `local` backend (overrides `backend.root`)
    #[arg(long, env = "QUIRE_ROOT", global = true)]
    pub root: Option<PathBuf>,

    /// Directory for local draft backups (defaults to the user data dir)
    #[arg(long, env = "QUIRE_BACKUPS", global = true)]
    pub backups: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the entries of a collection
    List {
        /// Collection name
        collection: String,

        /// Sort by this field (`commit_date` and `commit_author` also work)
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print one entry
    Show {
        /// Collection name
        collection: String,

        /// Entry slug
        slug: String,

        /// Print the file as stored instead of JSON
        #[arg(long)]
        raw: bool,
    },

    /// Search entries of one or more collections
    Search {
        /// Search term
        term: String,

        /// Collections to search (all when omitted)
        #[arg(long = "collection", short = 'c')]
        collections: Vec<String>,
    },

    /// Search specific fields of one collection
    Query {
        /// Collection name
        collection: String,

        /// Search term
        term: String,

        /// Field to search, dotted for nested fields (repeatable)
        #[arg(long = "field", short = 'f', required = true)]
        fields: Vec<String>,

        /// Only search the entry with this slug
        #[arg(long)]
        file: Option<String>,

        /// Maximum number of hits
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Create an entry
    New {
        /// Collection name
        collection: String,

        /// Field value as `key=value` (repeatable)
        #[arg(long = "set", short = 's', value_name = "KEY=VALUE")]
        values: Vec<String>,
    },

    /// Delete an entry
    Delete {
        /// Collection name
        collection: String,

        /// Entry slug
        slug: String,
    },

    /// List media files
    Media {
        /// Folder to list (the site media folder when omitted)
        folder: Option<String>,
    },

    /// List entries waiting for review
    Unpublished,

    /// Publish an entry that is ready
    Publish {
        /// Collection name
        collection: String,

        /// Entry slug
        slug: String,
    },
}
