//! docscout - LLM gateway command line.

use std::future::Future;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use docscout::analysis::{enrich_reviews, extract_from_html, ReviewAnalyst, ReviewsData};
use docscout::config::loader::get_config_path;
use docscout::config::{load_with_env, save_config, Config};
use docscout::providers::{ChatMessage, ChatOptions, ProviderFactory};
use docscout::GatewayError;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "docscout", about = "docscout - LLM gateway for doctor search", version = VERSION)]
struct Cli {
    /// Config file (defaults to ~/.docscout/config.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Give up on a vendor request after this many seconds.
    #[arg(long, global = true, default_value_t = 60)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file without asking.
        #[arg(short, long)]
        force: bool,
    },
    /// Show which provider would be used.
    Info,
    /// Send one message and print the reply.
    Chat {
        /// Message to send.
        #[arg(short, long)]
        message: String,
        /// Optional system prompt.
        #[arg(short, long)]
        system: Option<String>,
        /// Model override.
        #[arg(long)]
        model: Option<String>,
        /// Sampling temperature (0-2).
        #[arg(short, long)]
        temperature: Option<f32>,
    },
    /// Analyze a reviews JSON file against patient requirements.
    Analyze {
        /// Path to a reviews file ({averageRating, totalReviews, reviews}).
        #[arg(short, long)]
        file: PathBuf,
        /// What the patient is looking for.
        #[arg(short, long, default_value = "")]
        requirements: String,
        /// Annotate each review with sentiment and topics first.
        #[arg(long)]
        enrich: bool,
    },
    /// Extract structured data from an HTML page.
    Extract {
        /// Path to the HTML file.
        #[arg(short, long)]
        file: PathBuf,
        /// What to extract, phrased as an instruction.
        #[arg(short, long)]
        purpose: String,
        /// Model override.
        #[arg(long)]
        model: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    if let Commands::Init { force } = cli.command {
        return cmd_init(config_path, force);
    }

    let config = load_with_env(config_path)?;
    let factory = ProviderFactory::new(config);
    let deadline = Duration::from_secs(cli.timeout);

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    runtime.block_on(async {
        match cli.command {
            Commands::Init { .. } => Ok(()),
            Commands::Info => cmd_info(&factory),
            Commands::Chat {
                message,
                system,
                model,
                temperature,
            } => cmd_chat(&factory, deadline, message, system, model, temperature).await,
            Commands::Analyze {
                file,
                requirements,
                enrich,
            } => cmd_analyze(&factory, deadline, &file, &requirements, enrich).await,
            Commands::Extract {
                file,
                purpose,
                model,
            } => cmd_extract(&factory, deadline, &file, &purpose, model.as_deref()).await,
        }
    })
}

/// Bound a gateway call by the CLI timeout.
async fn with_deadline<T>(
    deadline: Duration,
    call: impl Future<Output = Result<T, GatewayError>>,
) -> Result<T> {
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => Ok(result?),
        Err(_) => bail!("request timed out after {}s", deadline.as_secs()),
    }
}

// ============================================================================
// Init
// ============================================================================

fn cmd_init(path: Option<&Path>, force: bool) -> Result<()> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);

    if config_path.exists() && !force {
        println!("Config already exists at {}", config_path.display());
        print!("Overwrite? [y/N] ");
        io::stdout().flush().ok();
        let mut input = String::new();
        io::stdin().read_line(&mut input).ok();
        if !input.trim().eq_ignore_ascii_case("y") {
            return Ok(());
        }
    }

    let written = save_config(&Config::default(), Some(&config_path))?;
    println!("  Created config at {}", written.display());
    println!("\nNext steps:");
    println!("  1. Add an API key under providers.openai.apiKey or providers.blackbox.apiKey");
    println!("     (or export OPENAI_API_KEY / BLACKBOX_API_KEY)");
    println!("  2. Check the selection: docscout info");
    Ok(())
}

// ============================================================================
// Info
// ============================================================================

fn cmd_info(factory: &ProviderFactory) -> Result<()> {
    let info = factory.provider_info()?;
    let provider = factory.get()?;

    println!("docscout {}", VERSION);
    println!("  Provider:       {}", info.provider);
    println!("  Model:          {}", provider.default_model());
    println!(
        "  API key:        {}",
        if info.has_api_key { "set" } else { "missing" }
    );
    println!("  Tool calling:   {}", if info.supports_tools { "yes" } else { "no" });
    println!("  Mock fallback:  {}", factory.config().mock_fallback);
    if info.using_mock {
        println!("\n  Replies come from the built-in mock provider.");
    }
    Ok(())
}

// ============================================================================
// Chat
// ============================================================================

async fn cmd_chat(
    factory: &ProviderFactory,
    deadline: Duration,
    message: String,
    system: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
) -> Result<()> {
    let provider = factory.get()?;

    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user(message));

    let mut options = ChatOptions::default();
    if let Some(model) = model {
        options = options.with_model(model);
    }
    if let Some(temperature) = temperature {
        options = options.with_temperature(temperature);
    }

    let response = with_deadline(deadline, provider.chat(&messages, &options)).await?;
    info!(
        prompt_tokens = response.usage.prompt_tokens,
        completion_tokens = response.usage.completion_tokens,
        finish_reason = %response.finish_reason,
        "Chat completed"
    );
    println!("{}", response.content);
    Ok(())
}

// ============================================================================
// Analyze
// ============================================================================

async fn cmd_analyze(
    factory: &ProviderFactory,
    deadline: Duration,
    file: &Path,
    requirements: &str,
    enrich: bool,
) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let mut reviews: ReviewsData = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse reviews in {}", file.display()))?;
    debug!(reviews = reviews.reviews.len(), "Loaded reviews");

    let provider = factory.get()?;
    if enrich {
        tokio::time::timeout(deadline, enrich_reviews(&provider, &mut reviews))
            .await
            .with_context(|| format!("enrichment timed out after {}s", deadline.as_secs()))?;
    }

    let analyst = ReviewAnalyst::new(provider);
    let analysis = tokio::time::timeout(deadline, analyst.analyze(&reviews, requirements))
        .await
        .with_context(|| format!("analysis timed out after {}s", deadline.as_secs()))?;

    if enrich {
        let out = serde_json::json!({ "analysis": analysis, "reviews": reviews });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    }
    Ok(())
}

// ============================================================================
// Extract
// ============================================================================

async fn cmd_extract(
    factory: &ProviderFactory,
    deadline: Duration,
    file: &Path,
    purpose: &str,
    model: Option<&str>,
) -> Result<()> {
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let provider = factory.get()?;

    match with_deadline(deadline, extract_from_html(&provider, &html, purpose, model)).await? {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        None => bail!("the model reply was not valid JSON"),
    }
}
