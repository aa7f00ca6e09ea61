//! Storyline CLI - discover market topics, research them, and write video scripts

mod interactive;

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::io::{self, BufRead, Read};
use std::path::PathBuf;
use storyline_lib::config::STORE_VAR;
use storyline_lib::store::DEFAULT_STORE_FILE;
use storyline_lib::topics::extract_titles;
use storyline_lib::{
    Config, ConfigError, FieldSelection, GLYPH_LEGEND, HttpLinkChecker, LinkAnnotator,
    OpenRouterGateway, ResearchOutcome, ResultStore, SessionState, Workflow, WorkflowError,
};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "storyline")]
#[command(about = "Turn market buzz into researched video scripts", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    log_verbosity: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Research store file [default: $STORYLINE_STORE or research_results.json]
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover candidate video topics and check their source links
    Discover {
        /// Research field: auto, ai, semiconductors, ev, macro
        #[arg(short, long, default_value = "auto")]
        field: FieldSelection,

        /// Free-text research field (overrides --field)
        #[arg(short, long, value_name = "TEXT")]
        custom: Option<String>,
    },

    /// Run deep research on a topic (cached by topic)
    Research {
        /// The topic to research (use "-" to read from stdin)
        #[arg(value_name = "TOPIC")]
        topic: String,
    },

    /// Write a video script from a researched topic
    Script {
        /// A topic that has already been researched (use "-" to read from stdin)
        #[arg(value_name = "TOPIC")]
        topic: String,
    },

    /// List researched topics
    Topics,

    /// Print the stored research report for a topic
    Show {
        #[arg(value_name = "TOPIC")]
        topic: String,
    },

    /// Annotate the links in a file (or stdin) with reachability glyphs
    CheckLinks {
        /// File to read [default: stdin]
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Walk through discovery, research and scripting interactively
    Session,
}

fn read_topic_from_stdin() -> io::Result<String> {
    let stdin = io::stdin();
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Resolve a topic argument, reading stdin for "-".
fn resolve_topic(topic: String) -> String {
    if topic != "-" {
        return topic;
    }
    match read_topic_from_stdin() {
        Ok(t) if !t.is_empty() => t,
        Ok(_) => fail("Error", "No topic provided on stdin"),
        Err(e) => fail("Error reading from stdin", e),
    }
}

/// Store location for commands that never call the model.
fn store_location(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| {
        std::env::var(STORE_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    })
    .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_FILE))
}

/// Resolve configuration or stop with a startup message.
fn load_config(store: Option<PathBuf>) -> Config {
    match Config::from_env() {
        Ok(config) => match store {
            Some(path) => config.with_store_path(path),
            None => config,
        },
        Err(e @ ConfigError::MissingApiKey) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            eprintln!("  Get a key at https://openrouter.ai/keys");
            std::process::exit(1);
        }
        Err(e) => fail("Configuration error", e),
    }
}

fn build_workflow(config: &Config) -> Workflow<OpenRouterGateway, HttpLinkChecker> {
    match Workflow::from_config(config) {
        Ok(workflow) => workflow,
        Err(e) => fail("Failed to initialize HTTP client", e),
    }
}

fn fail(context: &str, error: impl std::fmt::Display) -> ! {
    eprintln!("{} {}: {}", "✗".red().bold(), context, error);
    std::process::exit(1);
}

/// Print annotated discovery output followed by the glyph legend and titles.
fn print_discovery(annotated: &str) {
    println!("{}", annotated);
    println!("\n{}", GLYPH_LEGEND.dimmed());

    let titles = extract_titles(annotated);
    if !titles.is_empty() {
        println!("\n{}", "Suggested topics:".bold());
        for title in titles {
            println!("  • {}", title);
        }
    }
}

/// Initialize tracing subscriber based on verbosity and output format
fn init_tracing(verbose: u8, json: bool) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            // -v: flow progress, cache hits, link summaries
            1 => "warn,storyline_lib=info".to_string(),
            2 => "info,storyline_lib=debug".to_string(),
            _ => "debug,storyline_lib=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(false)
                    .with_file(verbose >= 3)
                    .with_line_number(verbose >= 3)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_verbosity, cli.json);

    tracing::info!("Storyline CLI starting");

    match cli.command {
        Commands::Discover { field, custom } => {
            let field = match custom {
                Some(text) => match FieldSelection::custom(&text) {
                    Ok(field) => field,
                    Err(e) => fail("Discovery skipped", e),
                },
                None => field,
            };

            let config = load_config(cli.store);
            let workflow = build_workflow(&config);
            let mut state = SessionState::new();

            eprintln!("{} Discovering topics for: {}", "→".cyan(), field);
            match workflow.discover(&mut state, &field).await {
                Ok(annotated) => print_discovery(&annotated),
                Err(e) => fail("Discovery failed", e),
            }
        }

        Commands::Research { topic } => {
            let topic = resolve_topic(topic);
            let config = load_config(cli.store);
            let workflow = build_workflow(&config);
            let mut state = SessionState::new();

            eprintln!(
                "{} Researching \"{}\" (this can take several minutes)",
                "→".cyan(),
                topic
            );
            match workflow.research(&mut state, &topic).await {
                Ok(outcome) => {
                    match &outcome {
                        ResearchOutcome::Cached(_) => {
                            eprintln!("{} Loaded cached research", "✓".green())
                        }
                        ResearchOutcome::Fresh(_) => eprintln!(
                            "{} Research complete, saved to {}",
                            "✓".green(),
                            config.store_path.display()
                        ),
                    }
                    println!("{}", outcome.report());
                }
                Err(WorkflowError::Unsaved { report, source }) => {
                    // Print the report before exiting so the model call is not wasted.
                    println!("{}", report);
                    fail("Research finished but could not be saved", source);
                }
                Err(e) => fail("Research failed", e),
            }
        }

        Commands::Script { topic } => {
            let topic = resolve_topic(topic);
            let config = load_config(cli.store);
            let workflow = build_workflow(&config);
            let state = SessionState::new();

            eprintln!("{} Writing script for \"{}\"", "→".cyan(), topic);
            match workflow.script(&state, &topic).await {
                Ok(script) => println!("{}", script),
                Err(e) => fail("Script generation failed", e),
            }
        }

        Commands::Topics => {
            let store = ResultStore::new(store_location(cli.store));
            let topics = store.topics();
            if topics.is_empty() {
                println!("No researched topics yet. Run 'storyline research <TOPIC>'.");
            }
            for topic in topics {
                println!("{}", topic);
            }
        }

        Commands::Show { topic } => {
            let topic = topic.trim();
            let store = ResultStore::new(store_location(cli.store));
            match store.get(topic) {
                Some(record) => println!("{}", record.result),
                None => fail(
                    "Error",
                    format!(
                        "Topic '{}' not found. Run 'storyline topics' to see researched topics.",
                        topic
                    ),
                ),
            }
        }

        Commands::CheckLinks { file } => {
            let text = match file {
                Some(path) => match std::fs::read_to_string(&path) {
                    Ok(text) => text,
                    Err(e) => fail(&format!("Failed to read {}", path.display()), e),
                },
                None => {
                    let mut buf = String::new();
                    if let Err(e) = io::stdin().read_to_string(&mut buf) {
                        fail("Error reading from stdin", e);
                    }
                    buf
                }
            };

            let checker = match HttpLinkChecker::new() {
                Ok(checker) => checker,
                Err(e) => fail("Failed to initialize HTTP client", e),
            };
            let annotated = LinkAnnotator::new(checker).annotate(&text).await;
            println!("{}", annotated);
            println!("\n{}", GLYPH_LEGEND.dimmed());
        }

        Commands::Session => {
            let config = load_config(cli.store);
            let workflow = build_workflow(&config);
            interactive::run(&workflow).await;
        }
    }
}
