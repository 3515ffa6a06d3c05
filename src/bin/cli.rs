//! CaskDB CLI
//!
//! Command-line interface over a local CaskDB data directory. Keys and
//! values are taken and printed as UTF-8 text.

use std::path::PathBuf;
use std::process::ExitCode;

use caskdb::{Config, Database};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// CaskDB CLI
#[derive(Parser, Debug)]
#[command(name = "caskdb")]
#[command(about = "Embedded log-structured key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./caskdb_data")]
    dir: PathBuf,

    /// Active file size in MB before it is rotated into an archive
    #[arg(short = 'm', long, default_value = "10")]
    max_file_mb: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Delete {
        /// The key to delete
        key: String,
    },

    /// List live keys in order
    Keys {
        /// Only list keys starting with this prefix
        #[arg(short, long)]
        prefix: Option<String>,
    },

    /// Compact archived files into one
    Merge,

    /// Remove all data
    Clear,

    /// List data files
    Files,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,caskdb=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> caskdb::Result<ExitCode> {
    let config = Config::builder()
        .data_dir(&args.dir)
        .active_file_size_limit(args.max_file_mb * 1024 * 1024)
        .build();
    let db = Database::open_with(config)?;

    match args.command {
        Commands::Get { key } => match db.get(key.as_bytes())? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => {
                eprintln!("key not found: {}", key);
                db.close()?;
                return Ok(ExitCode::FAILURE);
            }
        },
        Commands::Put { key, value } => db.put(key.as_bytes(), value.as_bytes())?,
        Commands::Delete { key } => db.delete(key.as_bytes())?,
        Commands::Keys { prefix } => {
            let prefix = prefix.unwrap_or_default();
            for key in db.keys()?.filter(|k| k.starts_with(prefix.as_bytes())) {
                println!("{}", String::from_utf8_lossy(&key));
            }
        }
        Commands::Merge => db.merge_archives()?,
        Commands::Clear => db.clear()?,
        Commands::Files => {
            for file in db.list_data_files()? {
                println!(
                    "{:>6}  {:>12}  {}  {}",
                    file.file_id,
                    file.size,
                    if file.writable { "active " } else { "archive" },
                    file.path.display()
                );
            }
        }
    }

    db.close()?;
    Ok(ExitCode::SUCCESS)
}
