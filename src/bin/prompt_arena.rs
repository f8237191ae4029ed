//! prompt-arena — run one prompt against several models side by side
//!
//! Usage:
//!   prompt-arena models                                  List the model catalog
//!   prompt-arena run [-m <id>]... [options] <PROMPT>     Run one round and print results as they arrive

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use prompt_arena::types::request::{DEFAULT_MAX_TOKENS, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE};
use prompt_arena::{
    ArenaConfig, CanonicalRequest, InvocationOrchestrator, ModelCatalog, ProviderKind, RoundBoard,
};

/// Test one prompt across multiple AI models simultaneously
#[derive(Parser)]
#[command(name = "prompt-arena")]
#[command(version, about, long_about = None)]
struct Cli {
    /// YAML endpoint configuration (overrides environment)
    #[arg(short, long, global = true, env = "ARENA_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// YAML model catalog (defaults to the built-in catalog)
    #[arg(long, global = true, env = "ARENA_CATALOG", value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Call vendor APIs directly instead of going through the forwarding proxy
    #[arg(long, global = true)]
    direct: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available models grouped by provider
    Models,
    /// Run a prompt against the selected models
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Model id to include (repeatable); defaults to gpt-4o and claude-3-5-sonnet
    #[arg(short, long = "model", value_name = "ID")]
    models: Vec<String>,

    /// System prompt
    #[arg(short, long, default_value = DEFAULT_SYSTEM_PROMPT)]
    system: String,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(short, long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f64,

    /// Maximum tokens to generate
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Emit one JSON object per result instead of text blocks
    #[arg(long)]
    json: bool,

    /// The prompt
    #[arg(required = true, num_args = 1..)]
    prompt: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<ExitCode> {
    let catalog = match &cli.catalog {
        Some(path) => ModelCatalog::from_yaml_file(path)
            .with_context(|| format!("loading catalog {}", path.display()))?,
        None => ModelCatalog::builtin(),
    };

    match cli.command {
        Commands::Models => {
            cmd_models(&catalog);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run(args) => {
            let config = match &cli.config {
                Some(path) => ArenaConfig::from_yaml_file(path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None if cli.direct => ArenaConfig::direct_from_env(),
                None => ArenaConfig::from_env(),
            };
            cmd_run(catalog, &config, args).await
        }
    }
}

fn cmd_models(catalog: &ModelCatalog) {
    for kind in ProviderKind::ALL {
        let models: Vec<_> = catalog.by_provider(kind).collect();
        if models.is_empty() {
            continue;
        }
        println!("{kind}:");
        for m in models {
            println!("  {:<30} {}", m.id, m.display_name);
        }
    }
}

async fn cmd_run(catalog: ModelCatalog, config: &ArenaConfig, args: RunArgs) -> Result<ExitCode> {
    let orchestrator = InvocationOrchestrator::from_config(catalog, config)?;

    let selected = if args.models.is_empty() {
        ModelCatalog::default_selection()
    } else {
        args.models
    };
    let request = CanonicalRequest::new(args.prompt.join(" "))
        .with_system_prompt(args.system)
        .with_temperature(args.temperature)
        .with_max_tokens(args.max_tokens);

    let mut handle = orchestrator.run_round(request, selected)?;
    let mut board = RoundBoard::new();
    board.begin(&handle);

    while let Some(update) = handle.recv().await {
        let model_id = update.model_id.clone();
        if args.json {
            println!("{}", update.to_json_line()?);
        }
        if !board.apply(update) || args.json {
            continue;
        }
        let name = orchestrator
            .catalog()
            .get(&model_id)
            .map(|m| format!("{} ({})", m.display_name, m.provider))
            .unwrap_or_else(|| model_id.clone());
        if let Some(state) = board.state(&model_id) {
            println!("=== {name} ===");
            println!("{}\n", state.display_text());
        }
    }

    let failed = board
        .iter()
        .filter(|(_, s)| s.failure().is_some())
        .count();
    if failed > 0 {
        eprintln!("{failed}/{} models failed", board.len());
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
