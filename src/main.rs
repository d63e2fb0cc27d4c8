//! crewline CLI - research, write and translate with a crew of LLM roles

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::warn;

use crewline::output::write_event_log;
use crewline::pipeline::BUILTIN_PIPELINE_YAML;
use crewline::{create_provider, CrewError, FixSuggestion, Pipeline, Provider, Runner};

#[derive(Parser)]
#[command(name = "crewline")]
#[command(about = "Sequential multi-agent content pipeline over an LLM API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline (built-in blog pipeline when no file is given)
    Run {
        /// Path to a .crew.yaml file
        file: Option<PathBuf>,

        /// Override the pipeline provider (groq, mock)
        #[arg(short, long)]
        provider: Option<String>,

        /// Override the pipeline model
        #[arg(short, long)]
        model: Option<String>,

        /// Placeholder value, e.g. --input topic="Rust em 2025"
        #[arg(short, long = "input", value_name = "KEY=VALUE")]
        inputs: Vec<String>,

        /// Final result file (default from the pipeline, else resultado.md)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the execution event log as JSON
        #[arg(long, value_name = "PATH")]
        events: Option<PathBuf>,
    },

    /// Validate a pipeline without calling the model
    Validate {
        /// Path to a .crew.yaml file
        file: Option<PathBuf>,
    },

    /// Print the built-in pipeline definition
    Show,
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            file,
            provider,
            model,
            inputs,
            output,
            events,
        } => run_pipeline(file, provider, model, inputs, output, events).await,
        Commands::Validate { file } => validate_pipeline(file),
        Commands::Show => {
            print!("{BUILTIN_PIPELINE_YAML}");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("\n{} {}", "❌ Erro:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn load(file: Option<&PathBuf>) -> Result<Pipeline, CrewError> {
    match file {
        Some(path) => Pipeline::load(path),
        None => Pipeline::builtin(),
    }
}

fn parse_inputs(raw: &[String]) -> Result<HashMap<String, String>, CrewError> {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(CrewError::InvalidInput { raw: pair.clone() }),
        })
        .collect()
}

async fn run_pipeline(
    file: Option<PathBuf>,
    provider_override: Option<String>,
    model_override: Option<String>,
    raw_inputs: Vec<String>,
    output: Option<PathBuf>,
    events: Option<PathBuf>,
) -> Result<(), CrewError> {
    let mut pipeline = load(file.as_ref())?;
    let inputs = parse_inputs(&raw_inputs)?;

    if let Some(p) = provider_override {
        pipeline.provider = p;
    }
    pipeline.validate()?;

    let model_label = model_override
        .clone()
        .or_else(|| pipeline.model.clone())
        .unwrap_or_else(|| "(default)".to_string());
    let provider: Arc<dyn Provider> = Arc::from(create_provider(&pipeline.provider)?);
    let runner = Runner::new(pipeline, provider)
        .with_model(model_override)
        .with_inputs(inputs)
        .with_result_file(output);

    println!(
        "{} Using provider: {} | model: {}",
        "→".cyan(),
        runner.pipeline().provider.cyan().bold(),
        model_label.cyan()
    );
    if file.is_none() {
        println!("⏳ Processando conteúdo em português e realizando a tradução...");
    } else {
        println!("⏳ Running {} tasks...", runner.pipeline().tasks.len());
    }

    let result = runner.run().await;

    // A failed dump never hides the run's own error
    if let Some(path) = events {
        if let Err(e) = write_event_log(&path, runner.event_log()).await {
            if result.is_ok() {
                return Err(e);
            }
            warn!(path = %path.display(), error = %e, "Event log not written");
        }
    }

    let result = result?;
    println!(
        "\n{} {} {}",
        "📝 Conteúdo gerado".green().bold(),
        "→".cyan(),
        result.result_file.display()
    );
    println!("{}", result);

    Ok(())
}

fn validate_pipeline(file: Option<PathBuf>) -> Result<(), CrewError> {
    let pipeline = load(file.as_ref())?;
    let plan = pipeline.plan()?;

    let name = file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(built-in)".to_string());
    println!("{} Pipeline '{}' is valid", "✓".green(), name);
    println!("  Provider: {}", pipeline.provider);
    println!("  Model: {}", pipeline.model.as_deref().unwrap_or("(default)"));
    println!("  Roles: {}", plan.registry.len());
    println!("  Tasks: {}", plan.order.len());
    let order: Vec<&str> = plan.order.iter().map(|id| id.as_ref()).collect();
    println!("  Order: {}", order.join(" → "));

    Ok(())
}
