//! tokenprobe CLI - per-token confidence of chat completions

use std::io::{IsTerminal, Write};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use tokenprobe::completions::{
    CompletionOptions, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT,
    DEFAULT_TEMPERATURE,
};
use tokenprobe::credentials::{mask_api_key, CredentialStore};
use tokenprobe::history::{History, DEFAULT_HISTORY_CAPACITY};
use tokenprobe::render::Renderer;
use tokenprobe::{Analyzer, Client, ConfidencePolicy, LogBase, Scorer};

#[derive(Parser)]
#[command(name = "tokenprobe", version)]
#[command(about = "Visualize token log-probabilities and sequence confidence", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single prompt
    Analyze {
        /// Prompt to complete
        prompt: String,

        #[command(flatten)]
        options: AnalyzeArgs,

        /// Print the analysis as JSON instead of the colored report
        #[arg(long)]
        json: bool,
    },
    /// Read prompts from stdin one per line (:history, :clear, :quit)
    Repl {
        #[command(flatten)]
        options: AnalyzeArgs,

        /// Number of past results to keep for :history
        #[arg(long, default_value_t = DEFAULT_HISTORY_CAPACITY)]
        history: usize,
    },
    /// Manage the locally stored API key
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Store an API key
    Set {
        /// API key to store
        key: String,
    },
    /// Show the stored API key (masked)
    Show,
    /// Delete the stored API key
    Clear,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Model name
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Sampling temperature (0-2)
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f64,

    /// Maximum tokens to generate
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Alternatives to show per token (0-20)
    #[arg(long)]
    top_logprobs: Option<u8>,

    /// System prompt sent before the user prompt
    #[arg(long, default_value = DEFAULT_SYSTEM_PROMPT)]
    system: String,

    /// Do not send a system prompt
    #[arg(long, conflicts_with = "system")]
    no_system: bool,

    /// Base used to turn log-probabilities into probabilities (natural, two)
    #[arg(long, default_value = "natural")]
    base: LogBase,

    /// Confidence buckets: four-tier, three-tier, or e.g. 0.9=high,0.6=medium,low
    #[arg(long, default_value = "four-tier")]
    policy: ConfidencePolicy,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Disable ANSI colors
    #[arg(long)]
    no_color: bool,
}

impl AnalyzeArgs {
    fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            model: self.model.clone(),
            system_prompt: (!self.no_system).then(|| self.system.clone()),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_logprobs: self.top_logprobs,
        }
    }

    fn renderer(&self) -> Renderer {
        if self.no_color || !std::io::stdout().is_terminal() {
            Renderer::plain()
        } else {
            Renderer::default()
        }
    }

    fn analyzer(&self) -> Result<Analyzer> {
        let api_key = resolve_api_key()?;
        let mut builder = Client::builder_from_env(api_key);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        let scorer = Scorer::new(self.base, self.policy.clone());
        Ok(Analyzer::new(client, scorer, self.completion_options()))
    }
}

fn resolve_api_key() -> Result<String> {
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if !key.trim().is_empty() {
            return Ok(key);
        }
    }
    CredentialStore::default_location()?
        .load()?
        .context("No API key: set OPENAI_API_KEY or run `tokenprobe auth set <KEY>`")
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("tokenprobe=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze {
            prompt,
            options,
            json,
        } => {
            let analyzer = options.analyzer()?;
            let analysis = analyzer.analyze(&prompt).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                print!("{}", options.renderer().render(&analysis));
            }
        }
        Commands::Repl { options, history } => {
            run_repl(options.analyzer()?, options.renderer(), history).await?;
        }
        Commands::Auth { command } => run_auth(command)?,
    }

    Ok(())
}

async fn run_repl(analyzer: Analyzer, renderer: Renderer, capacity: usize) -> Result<()> {
    let mut history = History::with_capacity(capacity);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let prompt = line.trim();
        match prompt {
            "" => continue,
            ":quit" | ":q" => break,
            ":history" => print!("{}", renderer.render_history(&history)),
            ":clear" => history.clear(),
            _ => match analyzer.analyze(prompt).await {
                Ok(analysis) => {
                    print!("{}", renderer.render(&analysis));
                    history.push(analysis);
                }
                Err(err) => eprintln!("request failed: {err}"),
            },
        }
    }

    Ok(())
}

fn run_auth(command: AuthCommands) -> Result<()> {
    let store = CredentialStore::default_location()?;
    match command {
        AuthCommands::Set { key } => {
            store.save(&key)?;
            println!(
                "Saved API key {} to {}",
                mask_api_key(&key),
                store.path().display()
            );
        }
        AuthCommands::Show => match store.load()? {
            Some(key) => println!("{} ({})", mask_api_key(&key), store.path().display()),
            None => println!("No API key stored"),
        },
        AuthCommands::Clear => {
            if store.clear()? {
                println!("Removed {}", store.path().display());
            } else {
                println!("No API key stored");
            }
        }
    }
    Ok(())
}
