//! AtlasORM CLI
//!
//! Inspects and edits the snapshot of a file-backed store.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use atlasorm::codec::SerialisedData;
use atlasorm::keys::{KeyKind, KeyScheme, StandardKeyScheme};
use atlasorm::store::StoredValue;
use atlasorm::{Config, Direction, FileStore, KeyValueStore, SyncStrategy};

/// AtlasORM CLI
#[derive(Parser, Debug)]
#[command(name = "atlasorm-cli")]
#[command(about = "Inspect an AtlasORM store snapshot")]
#[command(version)]
struct Args {
    /// Snapshot file
    #[arg(short, long, default_value = "./atlasorm_data/store.db")]
    data_file: String,

    /// Key delimiter used when the store was written
    #[arg(long, default_value = ":")]
    delimiter: char,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List keys, optionally under a prefix
    Keys {
        /// Key prefix (e.g. "doc:users")
        #[arg(default_value = "")]
        prefix: String,
    },

    /// Show the record under a key
    Get {
        /// The key to show
        key: String,
    },

    /// List the members of a set
    Members {
        /// The set key
        key: String,
    },

    /// List a rank range of a sorted set
    Range {
        /// The sorted set key
        key: String,

        /// First rank (inclusive, negative counts from the end)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        start: i64,

        /// Last rank (inclusive, negative counts from the end)
        #[arg(long, default_value = "-1", allow_hyphen_values = true)]
        end: i64,

        /// Highest score first
        #[arg(long)]
        desc: bool,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,atlasorm=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let config = Config::builder()
        .data_file(&args.data_file)
        .sync_strategy(SyncStrategy::EveryWrite)
        .key_delimiter(args.delimiter)
        .build();

    let store = match FileStore::open(&config) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&store, &StandardKeyScheme::new(args.delimiter), args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(store: &FileStore, keys: &dyn KeyScheme, command: Commands) -> atlasorm::Result<()> {
    match command {
        Commands::Keys { prefix } => {
            for key in store.memory().keys(&prefix) {
                println!("{}", key);
            }
        }
        Commands::Get { key } => match store.memory().entry(&key) {
            None => println!("(nil)"),
            Some(StoredValue::Value(bytes)) => {
                let is_document = matches!(keys.parse_key(&key), Some(KeyKind::Document { .. }));
                match SerialisedData::from_bytes(&bytes) {
                    Ok(data) if is_document => {
                        println!("codec:   {}", data.codec());
                        println!("payload: {}", data.data());
                    }
                    _ => println!("{}", String::from_utf8_lossy(&bytes)),
                }
            }
            Some(StoredValue::Set(members)) => {
                for member in members {
                    println!("{}", member);
                }
            }
            Some(StoredValue::SortedSet(set)) => {
                for (member, score) in set.iter() {
                    println!("{}\t{:?}", member, score);
                }
            }
        },
        Commands::Members { key } => {
            for member in store.set_members(&key)? {
                println!("{}", member);
            }
        }
        Commands::Range {
            key,
            start,
            end,
            desc,
        } => {
            let direction = if desc { Direction::Desc } else { Direction::Asc };
            for member in store.sorted_set_range(&key, start, end, direction)? {
                println!("{}", member);
            }
        }
        Commands::Del { key } => {
            store.delete(&key)?;
            println!("OK");
        }
    }

    Ok(())
}
