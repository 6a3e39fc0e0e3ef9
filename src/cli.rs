use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Research data catalog server
#[derive(Parser, Debug)]
#[command(name = "research-catalog", about = "Research data catalog with DOI assignment")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the web catalog.
    Serve {
        /// Overrides BIND_ADDR
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Overrides MEDIA_ROOT
        #[arg(long)]
        media_root: Option<PathBuf>,

        /// Keep datasets and users in process memory instead of Postgres.
        #[arg(long, default_value_t = false)]
        in_memory: bool,
    },
    /// Create the database tables and indexes.
    Migrate,
}
