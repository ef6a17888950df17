mod config;
mod handlers;
mod invokers;
mod session;
mod terminal_output;

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use cmdforge_config::{config_dir, config_file_path, load_and_prepare};
use cmdforge_core::{Invoker, MainThread};
use cmdforge_logging::init_logger;

use config::Config;
use invokers::{ConsoleSender, PlayerSender};
use session::Session;
use terminal_output::{note_error, note_warn, paint, BOLD};

#[derive(Parser)]
#[command(name = "cmdforge")]
#[command(about = "cmdforge: declarative command routing demo host")]
#[command(version)]
struct Cli {
    /// Config file (default: $CMDFORGE_CONFIG_DIR/config.yaml or ~/.cmdforge/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Act as this player instead of the console
    #[arg(long = "as", global = true)]
    player: Option<String>,

    /// Permission granted to the --as player (repeatable; `*` grants all)
    #[arg(long = "grant", global = true)]
    grants: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read commands from stdin, one per line (`/eco give alice 5`)
    Repl,
    /// Print every registered route
    Tree,
    /// Print completions for a partial command line
    Complete {
        /// Partial input; a trailing space completes the next word
        line: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));
    let prepared = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start config runtime")?
        .block_on(load_and_prepare(&path))
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    let config = Config::from(&prepared);

    init_logger(config.log_dir.as_deref(), &config.log_level, config.log_json);

    // Asynchronous routes run on this runtime's blocking pool.
    let workers = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .max_blocking_threads(config.worker_threads)
        .thread_name("cmdforge-worker")
        .enable_all()
        .build()
        .context("Failed to start worker runtime")?;

    // This thread owns all invoker output from here on.
    let main_thread = MainThread::bind_current();
    let session = Arc::new(Session::new(
        &config,
        main_thread.handle(),
        Some(workers.handle().clone()),
    )?);

    let invoker: Arc<dyn Invoker> = match cli.player {
        Some(name) => {
            if cli.grants.is_empty() {
                note_warn(&format!("{name} has no permissions; pass --grant to add some"));
            }
            Arc::new(PlayerSender::new(&name, cli.grants))
        }
        None => Arc::new(ConsoleSender::new()),
    };

    match cli.command {
        Commands::Repl => run_repl(main_thread, session, invoker),
        Commands::Tree => print!("{}", session.describe_tree()),
        Commands::Complete { line } => {
            for suggestion in session.complete(invoker.as_ref(), &line) {
                println!("{suggestion}");
            }
        }
    }

    workers.shutdown_background();
    Ok(())
}

/// Feed stdin lines to the designated thread until EOF or `quit`, then keep
/// draining until every in-flight route has replied.
fn run_repl(main_thread: MainThread, session: Arc<Session>, invoker: Arc<dyn Invoker>) {
    println!(
        "{} acting as {}. Type `quit` to exit.",
        paint(BOLD, "cmdforge"),
        invoker.name()
    );
    info!(invoker = invoker.name(), "REPL started");

    let handle = main_thread.handle();
    let reader = thread::Builder::new()
        .name("cmdforge-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "Failed to read stdin");
                        break;
                    }
                };
                if matches!(line.trim(), "quit" | "exit") {
                    break;
                }
                let session = Arc::clone(&session);
                let invoker = Arc::clone(&invoker);
                handle.run_on_main(move || {
                    let _ = session.handle_line(invoker, &line);
                });
            }
        });

    if let Err(e) = reader {
        note_error(&format!("Failed to start input reader: {e}"));
        return;
    }
    main_thread.run();
    info!("REPL finished");
}
