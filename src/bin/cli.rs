//! LogKV CLI
//!
//! Command-line interface for a local LogKV data directory.
//!
//! - With a subcommand: run it once and exit
//! - `repl`: line-oriented shell
//! - No arguments at all: numbered menu

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use logkv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// LogKV CLI
#[derive(Parser, Debug)]
#[command(name = "logkv")]
#[command(about = "Log-structured key/value store CLI")]
#[command(version)]
struct Args {
    /// Directory for storing log files
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Active segment size limit in MB before rotation
    #[arg(short = 'm', long, default_value = "64")]
    max_segment_mb: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Set a key to a value
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Delete a key
    Delete {
        /// The key to delete
        key: String,
    },

    /// Compact log segments
    Compact,

    /// Interactive shell
    Repl,
}

fn main() {
    // Logs go to stderr so command output stays clean
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();

    let menu = std::env::args_os().len() == 1;
    let args = Args::parse();

    if args.command.is_none() && !menu {
        if let Err(e) = Args::command().print_help() {
            eprintln!("Failed to print help: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .max_active_segment_bytes(args.max_segment_mb.saturating_mul(1024 * 1024))
        .build();

    let engine = match Engine::open(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Failed to open store at {}: {}", args.data_dir.display(), e);
            std::process::exit(1);
        }
    };

    let outcome = match args.command {
        None => menu_mode(&engine).map_err(logkv::LogKvError::from),
        Some(Commands::Repl) => repl(&engine).map_err(logkv::LogKvError::from),
        Some(command) => run_once(&engine, command),
    };

    let closed = engine.close();

    if let Err(e) = outcome.and(closed) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// =============================================================================
// Single-shot Mode
// =============================================================================

fn run_once(engine: &Engine, command: Commands) -> logkv::Result<()> {
    match command {
        Commands::Set { key, value } => {
            engine.set(&key, &value)?;
            println!("OK: set '{}' -> '{}'", key, value);
        }
        Commands::Get { key } => match engine.get(&key)? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("NOT FOUND"),
        },
        Commands::Delete { key } => {
            engine.delete(&key)?;
            println!("OK: deleted '{}'", key);
        }
        Commands::Compact => {
            engine.compact()?;
            println!("OK: compaction completed");
        }
        Commands::Repl => repl(engine)?,
    }
    Ok(())
}

// =============================================================================
// Interactive Modes
// =============================================================================

/// Print `label`, then read one line; None on end of input
fn prompt(label: &str) -> io::Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn repl(engine: &Engine) -> io::Result<()> {
    println!("Interactive KV store. Type 'help' for commands, 'exit' to quit.");

    while let Some(raw) = prompt("> ")? {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        if raw == "exit" || raw == "quit" {
            break;
        }
        if raw == "help" {
            println!("Commands:");
            println!("  set <key> <value>");
            println!("  get <key>");
            println!("  delete <key>");
            println!("  compact");
            println!("  exit");
            continue;
        }

        let parts: Vec<&str> = raw.split_whitespace().collect();
        let result = match (parts[0].to_lowercase().as_str(), parts.len()) {
            ("set", n) if n >= 3 => {
                let value = parts[2..].join(" ");
                engine.set(parts[1], value).map(|_| "OK".to_string())
            }
            ("get", 2) => engine.get(parts[1]).map(|value| match value {
                Some(v) => String::from_utf8_lossy(&v).into_owned(),
                None => "NOT FOUND".to_string(),
            }),
            ("delete", 2) => engine.delete(parts[1]).map(|_| "OK".to_string()),
            ("compact", 1) => engine.compact().map(|_| "OK: compacted".to_string()),
            _ => Ok("Invalid command. Type 'help'.".to_string()),
        };

        match result {
            Ok(message) => println!("{}", message),
            Err(e) => println!("Error: {}", e),
        }
    }

    Ok(())
}

fn menu_mode(engine: &Engine) -> io::Result<()> {
    loop {
        println!();
        println!("====== Key-Value Store ======");
        println!("1) Add data");
        println!("2) See data");
        println!("3) Delete data");
        println!("4) Compact logs");
        println!("5) Exit");
        println!("=============================");

        let choice = match prompt("Choose an option (1-5): ")? {
            Some(choice) => choice,
            None => break,
        };

        match choice.trim() {
            "1" => {
                let Some(key) = prompt("Enter key: ")? else { break };
                let Some(value) = prompt("Enter value: ")? else { break };
                match engine.set(&key, &value) {
                    Ok(()) => println!("Added: {} -> {}", key, value),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "2" => {
                let Some(key) = prompt("Enter key to view: ")? else { break };
                match engine.get(&key) {
                    Ok(Some(value)) => println!("Value: {}", String::from_utf8_lossy(&value)),
                    Ok(None) => println!("Key not found."),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "3" => {
                let Some(key) = prompt("Enter key to delete: ")? else { break };
                match engine.delete(&key) {
                    Ok(()) => println!("Deleted key: {}", key),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "4" => match engine.compact() {
                Ok(_) => println!("Compaction done."),
                Err(e) => println!("Error: {}", e),
            },
            "5" => {
                println!("Goodbye!");
                break;
            }
            _ => println!("Invalid option! Try again."),
        }
    }

    Ok(())
}
