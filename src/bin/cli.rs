use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tracing_subscriber::EnvFilter;

use joinperm::query::explorer::{ordering_count, Exploration, ExplorationConfig, Explorer, PermutationId};
use joinperm::query::model::QueryModel;
use joinperm::query::parser::extract;
use joinperm::query::planner::reconstruct_indices;
use joinperm::workload::{
    load_query, load_workload, DryRunExecutor, FileHistory, HistoryStore, RunRecord, RunnerConfig,
    WorkloadQuery, WorkloadRunner,
};

const HISTORY_FILE: &str = ".joinperm_history";

#[derive(Parser)]
#[command(author, version, about = "joinperm - rebuild SQL queries under arbitrary join orders")]
struct Cli {
    #[command(flatten)]
    exploration: ExplorationArgs,

    /// Command to execute
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct ExplorationArgs {
    /// Discarded draws allowed before a query counts as exhausted
    #[arg(short, long, default_value_t = joinperm::query::explorer::DEFAULT_BUDGET)]
    budget: usize,

    /// Seed for reproducible orderings
    #[arg(short, long)]
    seed: Option<u64>,
}

impl ExplorationArgs {
    fn config(&self) -> ExplorationConfig {
        ExplorationConfig {
            budget: self.budget,
            seed: self.seed,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the extracted query model
    Show {
        /// Query file or SQL text
        query: String,
    },

    /// Rebuild a query for an explicit ordering such as 2-0-1
    Reconstruct {
        /// Query file or SQL text
        query: String,

        /// Permutation identifier (indices into the listed joins)
        #[arg(short, long)]
        order: String,
    },

    /// Draw one fresh, valid ordering
    Explore {
        /// Query file or SQL text
        query: String,

        /// History file of previous runs
        #[arg(long)]
        history: Option<PathBuf>,

        /// Query id used in history (defaults to the file stem)
        #[arg(long)]
        query_id: Option<String>,

        /// Mark the drawn ordering as tried (not executed) in the history file
        #[arg(long, requires = "history")]
        record: bool,

        /// Record the ordering as planned with the engine's join reordering disabled
        #[arg(long, requires = "record")]
        no_optimizer: bool,
    },

    /// Sweep a workload, printing one statement per query and pass
    Run {
        /// A .sql file or a directory of .sql files
        workload: PathBuf,

        /// History file of previous runs
        #[arg(long)]
        history: PathBuf,

        /// Number of sweeps over the workload
        #[arg(short, long, default_value_t = 1)]
        passes: usize,

        /// Mark runs as executed with the engine's join reordering disabled
        #[arg(long)]
        no_optimizer: bool,
    },

    /// Start an interactive shell
    Shell,
}

/// Accept either a path to a query file or the query text itself
fn load_input(input: &str, query_id: Option<&str>) -> Result<WorkloadQuery> {
    let path = Path::new(input);
    let mut query = if path.is_file() {
        load_query(path)?
    } else {
        WorkloadQuery::from_sql("inline", input)?
    };
    if let Some(id) = query_id {
        query.id = id.to_string();
    }
    Ok(query)
}

fn print_model(model: &QueryModel) {
    println!();
    println!("QueryModel");
    println!("{}", "-".repeat(30));
    print!("{}", model);
    println!("Orderings: {}", ordering_count(model.join_count()));
}

fn reconstruct_command(input: &str, order: &str) -> Result<()> {
    let query = load_input(input, None)?;
    let id: PermutationId = order.parse()?;
    let sql = reconstruct_indices(&query.model, &id.indices()?)
        .with_context(|| format!("Ordering {} cannot be applied to query {}", id, query.id))?;
    println!("{}", sql);
    Ok(())
}

/// What `explore --record` stores: the ordering counts as tried, with no
/// measurement attached
fn planned_record(query_id: &str, id: PermutationId, no_optimizer: bool) -> RunRecord {
    RunRecord::unexecuted(query_id, id, !no_optimizer)
}

fn explore_command(
    config: ExplorationConfig,
    input: &str,
    history: Option<&Path>,
    query_id: Option<&str>,
    record: bool,
    no_optimizer: bool,
) -> Result<()> {
    let query = load_input(input, query_id)?;
    let mut store = history.map(FileHistory::open).transpose().context("Failed to open history")?;
    let tried = store.as_ref().map(|h| h.tried(&query.id)).unwrap_or_default();

    let mut explorer = Explorer::new(config);
    match explorer.explore(&query.model, &tried)? {
        Exploration::Found { id, query: sql, attempts } => {
            println!("-- {} [{}] after {} discarded draws", query.id, id, attempts);
            println!("{};", sql);
            if let (true, Some(store)) = (record, store.as_mut()) {
                store.record(planned_record(&query.id, id, no_optimizer))?;
            }
        }
        Exploration::Exhausted { attempts } => {
            println!("-- {}: no fresh ordering found in {} attempts", query.id, attempts);
        }
    }
    Ok(())
}

fn run_command(config: RunnerConfig, workload: &Path, history: &Path) -> Result<()> {
    let queries = load_workload(workload)?;
    if queries.is_empty() {
        bail!("No .sql files found in {}", workload.display());
    }
    let store = FileHistory::open(history).context("Failed to open history")?;

    let mut runner = WorkloadRunner::new(config, DryRunExecutor::new(), store);
    let summary = runner.run(&queries)?;

    let (mut executor, _) = runner.into_parts();
    for sql in executor.drain() {
        println!("{};", sql);
    }
    eprintln!(
        "{} executed, {} exhausted, {} failed",
        summary.executed, summary.exhausted, summary.failed
    );
    Ok(())
}

fn run_shell(config: ExplorationConfig) -> Result<()> {
    println!("Welcome to joinperm. Type 'help' for assistance or 'exit' to quit.");

    let mut rl = Editor::<(), DefaultHistory>::new()?;
    if let Err(err) = rl.load_history(HISTORY_FILE) {
        if !err.to_string().contains("No such file or directory") {
            println!("Error loading history: {}", err);
        }
    }

    let mut explorer = Explorer::new(config);
    let mut current: Option<QueryModel> = None;
    let mut tried: HashSet<PermutationId> = HashSet::new();

    loop {
        match rl.readline("joinperm> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);

                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match line.to_lowercase().as_str() {
                    "exit" | "quit" => {
                        println!("Goodbye!");
                        break;
                    }
                    "help" => print_help(),
                    "show" => match &current {
                        Some(model) => print_model(model),
                        None => println!("No query loaded"),
                    },
                    "next" => match &current {
                        Some(model) => draw(&mut explorer, model, &mut tried),
                        None => println!("No query loaded"),
                    },
                    _ => match extract(line) {
                        Ok(model) => {
                            tried.clear();
                            draw(&mut explorer, &model, &mut tried);
                            current = Some(model);
                        }
                        Err(err) => println!("Error: {}", err),
                    },
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {}", err);
                break;
            }
        }
    }

    if let Err(err) = rl.save_history(HISTORY_FILE) {
        println!("Error saving history: {}", err);
    }
    Ok(())
}

fn draw(explorer: &mut Explorer, model: &QueryModel, tried: &mut HashSet<PermutationId>) {
    match explorer.explore(model, tried) {
        Ok(Exploration::Found { id, query, .. }) => {
            println!("[{}] {}", id, query);
            tried.insert(id);
        }
        Ok(Exploration::Exhausted { attempts }) => {
            println!("No fresh ordering in {} attempts ({} already shown)", attempts, tried.len());
        }
        Err(err) => println!("Error: {}", err),
    }
}

fn help_text() -> String {
    [
        "Available commands:",
        "  SELECT ... FROM ... WHERE ... - Load a query and draw an ordering",
        "  next                          - Draw another unseen ordering",
        "  show                          - Display the loaded query model",
        "  help                          - Display this help message",
        "  exit                          - Exit the shell",
    ]
    .join("\n")
}

fn print_help() {
    println!("{}", help_text());
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.exploration.config();

    match cli.command {
        Some(Commands::Show { query }) => {
            let query = load_input(&query, None)?;
            print_model(&query.model);
        }
        Some(Commands::Reconstruct { query, order }) => reconstruct_command(&query, &order)?,
        Some(Commands::Explore {
            query,
            history,
            query_id,
            record,
            no_optimizer,
        }) => explore_command(
            config,
            &query,
            history.as_deref(),
            query_id.as_deref(),
            record,
            no_optimizer,
        )?,
        Some(Commands::Run {
            workload,
            history,
            passes,
            no_optimizer,
        }) => {
            let runner_config = RunnerConfig {
                exploration: config,
                passes,
                optimizer_enabled: !no_optimizer,
            };
            run_command(runner_config, &workload, &history)?;
        }
        Some(Commands::Shell) | None => run_shell(config)?,
    }

    Ok(())
}
