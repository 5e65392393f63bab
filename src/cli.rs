use clap::{Parser, Subcommand};

#[derive(Debug, Parser, Clone)]
#[clap(author, version, about = "Go Version Manager - install and switch between Go versions", long_about = None)]
pub struct CLI {
    /// Verbose output
    #[clap(short, long, global = true)]
    pub(crate) verbose: bool,
    /// Enable debug logging
    #[clap(long, global = true)]
    pub(crate) debug: bool,
    #[command(subcommand)]
    pub(crate) command: GvmCommand,
}

#[derive(Debug, Subcommand, Clone, PartialEq)]
pub enum GvmCommand {
    /// Set up gvm: creates `config.json` in the user config directory, the
    /// directory Go archives are stored in, and fetches the available versions
    Configure,
    /// List the most recent Go versions available for download
    List {
        /// Show downloaded versions only
        #[clap(short, long, conflicts_with = "current")]
        downloaded: bool,
        /// Show the current active version only
        #[clap(short, long)]
        current: bool,
        #[command(subcommand)]
        action: Option<ListAction>,
    },
    /// Download a Go version without activating it. Defaults to the latest stable version
    Download {
        /// Version to download, e.g. 1.25.5
        #[clap(short = 'g', long = "version")]
        version: Option<String>,
    },
    /// Make a Go version the active toolchain, downloading it first if needed
    Use {
        /// Version to use, e.g. 1.25.5
        version: String,
    },
}

#[derive(Debug, Subcommand, Clone, PartialEq)]
pub enum ListAction {
    /// Refresh the list of available versions from go.dev
    Update,
}
