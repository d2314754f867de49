use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use log::LevelFilter;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;

use relopt::catalog::{Schema, Statistics};
use relopt::query::algebra::{convert, convert_detailed, execution_steps, query_stats, render_tree};
use relopt::query::parser::Parser;
use relopt::query::parser::ast::QueryModel;
use relopt::query::planner::{HeuristicKind, OptimizedQuery, Optimizer, OptimizerConfig};

const HISTORY_FILE: &str = ".relopt_history";

#[derive(ClapParser)]
#[command(author, version, about = "relopt - translate SQL to relational algebra and optimize it")]
struct Cli {
    /// Schema descriptor (JSON) with reserved words and known tables
    #[arg(short, long, global = true)]
    schema: Option<PathBuf>,

    /// Per-table row estimates (JSON) used to order joins
    #[arg(long, global = true)]
    stats: Option<PathBuf>,

    /// Heuristics to run, comma separated, in order
    #[arg(long, global = true, value_delimiter = ',')]
    heuristics: Option<Vec<HeuristicKind>>,

    /// Log rewrite details
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive shell
    Shell,

    /// Translate a query to relational algebra
    Convert {
        /// SQL query to translate
        query: String,

        /// Print every conversion stage
        #[arg(long)]
        steps: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Translate and optimize a query
    Optimize {
        /// SQL query to optimize
        query: String,

        /// Print the optimization report as JSON
        #[arg(long)]
        json: bool,

        /// Also explain the optimized plan
        #[arg(long)]
        explain: bool,
    },

    /// Show the plan tree, execution steps and statistics of a query
    Explain {
        /// SQL query to explain
        query: String,
    },
}

/// Everything loaded from the command line flags
struct Session {
    parser: Parser,
    optimizer: Optimizer,
}

impl Session {
    fn new(cli: &Cli) -> Result<Self> {
        let schema = match &cli.schema {
            Some(path) => Schema::from_json_file(path)
                .with_context(|| format!("Failed to load schema from {}", path.display()))?,
            None => Schema::new(),
        };

        let mut config = OptimizerConfig::default().with_schema(schema.clone());
        if let Some(path) = &cli.stats {
            let stats = Statistics::from_json_file(path)
                .with_context(|| format!("Failed to load statistics from {}", path.display()))?;
            config = config.with_statistics(stats);
        }
        if let Some(heuristics) = &cli.heuristics {
            config = config.with_heuristics(heuristics.clone());
        }

        Ok(Session {
            parser: Parser::with_schema(schema),
            optimizer: Optimizer::with_config(&config),
        })
    }

    fn parse(&self, query: &str) -> Result<QueryModel> {
        Ok(self.parser.parse(query)?)
    }

    fn optimize(&self, query: &str) -> Result<OptimizedQuery> {
        let model = self.parse(query)?;
        Ok(self.optimizer.optimize(&model))
    }
}

fn print_conversion(model: &QueryModel, steps: bool) {
    if steps {
        for (stage, expr) in &convert_detailed(model) {
            println!("{:<11} {}", format!("{}:", stage), expr);
        }
    } else {
        println!("{}", convert(model));
    }
}

fn print_report(result: &OptimizedQuery) {
    println!("Original:  {}", convert(&result.original));
    for step in &result.steps {
        println!();
        println!("[{}]", step.heuristic);
        for note in &step.notes {
            println!("  - {}", note);
        }
        for warning in &step.warnings {
            println!("  ! {}", warning);
        }
        println!("  {}", convert(&step.model));
    }
    println!();
    println!("Optimized: {}", convert(&result.model));
}

fn print_explanation(model: &QueryModel) -> Result<()> {
    println!("Plan:");
    for line in render_tree(model).lines() {
        println!("  {}", line);
    }
    println!();
    println!("Execution order:");
    for (i, step) in execution_steps(model).iter().enumerate() {
        println!("  {}. {} - {}", i + 1, step.kind, step.description);
    }
    println!();
    println!("Statistics:");
    println!("{}", serde_json::to_string_pretty(&query_stats(model))?);
    Ok(())
}

fn run_shell(session: &Session) -> Result<()> {
    println!("Welcome to relopt. Type 'help' for assistance or 'exit' to quit.");

    let mut rl = Editor::<(), DefaultHistory>::new()?;
    if let Err(err) = rl.load_history(HISTORY_FILE) {
        if !err.to_string().contains("No such file or directory") {
            println!("Error loading history: {}", err);
        }
    }

    loop {
        let readline = rl.readline("relopt> ");
        match readline {
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
                    "help" => {
                        print_help();
                    }
                    _ => match session.optimize(line) {
                        Ok(result) => print_report(&result),
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

fn print_help() {
    println!("Enter a query to see its relational algebra before and after optimization.");
    println!();
    println!("Supported queries:");
    println!("  SELECT <columns | *> FROM <table>");
    println!("    [INNER JOIN <table> ON <table>.<column> = <table>.<column>]...");
    println!("    [WHERE <condition>];");
    println!();
    println!("Other commands:");
    println!("  help                          - Display this help message");
    println!("  exit                          - Exit the shell");
}

fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let session = Session::new(&cli)?;

    match &cli.command {
        Some(Commands::Shell) | None => {
            run_shell(&session)?;
        }
        Some(Commands::Convert { query, steps, json }) => {
            let model = session.parse(query)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&convert_detailed(&model))?);
            } else {
                print_conversion(&model, *steps);
            }
        }
        Some(Commands::Optimize { query, json, explain }) => {
            let result = session.optimize(query)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_report(&result);
            }
            if *explain {
                println!();
                print_explanation(&result.model)?;
            }
        }
        Some(Commands::Explain { query }) => {
            let model = session.parse(query)?;
            print_explanation(&model)?;
        }
    }

    Ok(())
}
