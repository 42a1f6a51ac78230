//! dtfm - turn a task description into shell commands.
//!
//! Sends the task to a local Ollama server, collects the streamed answer and
//! renders it as terminal markdown using the style from `dtfm_config.yaml`.

mod config;
mod llm;
mod prompt;
mod protocol;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dtfm")]
#[command(author, version, about = "Turn a task description into shell commands")]
#[command(long_about = "Describe what you want to do in plain words and get the shell commands for it.\n\nRequires a running Ollama server and a dtfm_config.yaml next to the executable.\n\nOptions are only recognised before the first task word. To start a task with -c, -h or -V, put -- in front of it: dtfm -- -h flag of ls")]
struct Cli {
    /// Configuration file (default: dtfm_config.yaml next to the executable)
    #[arg(short = 'c', long, value_name = "PATH", env = "DTFM_CONFIG")]
    config: Option<PathBuf>,

    /// Task description; every remaining word is part of it
    #[arg(value_name = "TASK", trailing_var_arg = true, allow_hyphen_values = true)]
    task: Vec<String>,
}

impl Cli {
    /// The task words joined by single spaces, or `None` if there are none.
    fn task(&self) -> Option<String> {
        if self.task.is_empty() {
            None
        } else {
            Some(self.task.join(" "))
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let Some(task) = cli.task() else {
        print_usage();
        std::process::exit(1);
    };

    init_logging();

    if let Err(e) = run(task, cli.config.as_deref()).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("Usage: dtfm 'task description'");
    println!("Example: dtfm 'list files in the current folder'");
}

/// Logs go to stderr so stdout only ever carries the answer.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dtfm=warn,reqwest=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load config, query the model, render the answer.
async fn run(task: String, config_override: Option<&Path>) -> Result<()> {
    let config_path = config::Config::resolve_path(config_override)?;
    debug!("Loading config from {}", config_path.display());
    let config = config::Config::load(&config_path)?;
    info!("Using model {} at {}", config.model, config.host());

    let prompt = prompt::build_prompt(&task);
    let client = llm::OllamaClient::new(config.model.clone(), config.host().to_string())?;
    let response = client
        .generate(&prompt)
        .await
        .context("Failed to generate response")?;

    let renderer = render::TermRenderer::new(&config.style_source(), config.word_wrap);
    let output = render::render_or_raw(renderer, &response);

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .and_then(|_| stdout.flush())
        .context("Failed to write output")?;
    Ok(())
}
