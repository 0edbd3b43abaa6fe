use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Timestamped,
    Json,
}

#[derive(Parser)]
#[command(name = "ytscript", about = "YouTube transcript service", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log to stderr as well as the log file
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP transcript service
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<String>,

        /// Relay base URL for scraper fetches (e.g. this service's public URL)
        #[arg(long)]
        relay_url: Option<String>,

        /// Server-side deadline in seconds (8-15)
        #[arg(long)]
        deadline: Option<u64>,
    },

    /// Fetch a transcript from a running service
    Fetch {
        /// YouTube video URL or video ID (reads from stdin if omitted)
        url: Option<String>,

        /// Transcript service base URL
        #[arg(long)]
        server: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Timestamped)]
        format: OutputFormat,

        /// Write output to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
