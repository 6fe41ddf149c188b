//! tsim: parse queries and browse datasets through the lens engine.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "tsim")]
#[command(about = "Trellis simulator - parse queries and browse datasets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a query and print its canonical form
    #[command(visible_alias = "p")]
    Parse {
        /// Query string (e.g., "year>=2005 & genre='Rock' [/name]")
        query: String,

        /// Only allow these properties (comma-separated)
        #[arg(short = 'a', long = "allow", value_delimiter = ',')]
        allow: Vec<String>,

        /// Print the term tree as JSON
        #[arg(long = "json")]
        json: bool,
    },

    /// Browse a dataset: drill down, filter and list rows
    #[command(visible_alias = "b")]
    Browse {
        /// Dataset JSON file (default: built-in sample library)
        #[arg(short = 'd', long = "data")]
        data: Option<PathBuf>,

        /// Content type to start from (default: first type of the dataset)
        #[arg(short = 't', long = "type")]
        content_type: Option<String>,

        /// Query applied after navigating
        #[arg(short = 'q', long = "query")]
        query: Option<String>,

        /// Drill into this row; repeat to go deeper
        #[arg(short = 'f', long = "forward")]
        forward: Vec<usize>,

        /// Config file with chunk_size, fetch_threshold, loading_type
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,

        /// Load with the row count known up front
        #[arg(long = "count-known")]
        count_known: bool,

        /// Rows per fetch (overrides config)
        #[arg(short = 'n', long = "chunk-size")]
        chunk_size: Option<usize>,

        /// Output as JSON
        #[arg(long = "json")]
        json: bool,
    },

    /// List the content types of a dataset
    Types {
        /// Dataset JSON file (default: built-in sample library)
        #[arg(short = 'd', long = "data")]
        data: Option<PathBuf>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { query, allow, json } => commands::parse(&query, &allow, json),
        Commands::Browse {
            data,
            content_type,
            query,
            forward,
            config,
            count_known,
            chunk_size,
            json,
        } => {
            let opts = commands::BrowseOptions {
                data: data.as_deref(),
                content_type: content_type.as_deref(),
                query: query.as_deref(),
                forward: &forward,
                config: config.as_deref(),
                count_known,
                chunk_size,
                json,
            };
            commands::browse(&opts)
        }
        Commands::Types { data } => commands::types(data.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
