use aigard_lib::services::config_store::{AppConfig, ConfigStore};
use aigard_lib::services::detection::{ExternalClassifier, FusionScheme, MistralClassifier};
use aigard_lib::services::providers::MISTRAL_PROVIDER;
use aigard_lib::services::text_processor::normalize_punctuation;
use aigard_lib::{init_logging, Detector, DocumentVerdict};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "aigard")]
#[command(
    version,
    about = "Estimate whether a Russian or English passage was machine-generated",
    after_help = "\
Examples:
  aigard essay.txt                     Summary verdict
  cat post.txt | aigard --json         Full JSON verdict from stdin
  aigard essay.txt --local-only        Skip the remote classifier
  aigard config set-key sk-...         Save the Mistral API key"
)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Text file to analyze (default: stdin)
    path: Option<PathBuf>,

    /// Maximum chunk size in characters
    #[arg(long)]
    max_chunk_size: Option<usize>,

    /// Minimum trimmed text length in characters
    #[arg(long)]
    min_chars: Option<usize>,

    /// Fusion scheme (structural, lexical)
    #[arg(long)]
    scheme: Option<FusionScheme>,

    /// Never call the remote classifier
    #[arg(long)]
    local_only: bool,

    /// Remote classifier model
    #[arg(long, env = "AIGARD_MISTRAL_MODEL")]
    model: Option<String>,

    /// Print the full verdict as JSON
    #[arg(long)]
    json: bool,

    /// Normalize quotes, exotic spaces and line endings before analysis
    #[arg(long)]
    normalize: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Edit the saved configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
enum ConfigAction {
    /// Save the Mistral API key
    SetKey { key: String },
    /// Remove the saved Mistral API key
    DeleteKey,
    /// Save the default remote classifier model
    SetModel { model: String },
}

fn run_config_command(store: &ConfigStore, action: ConfigAction) -> Result<String> {
    match action {
        ConfigAction::SetKey { key } => {
            let key = key.trim();
            if key.is_empty() {
                bail!("API key must not be empty");
            }
            store.set_api_key(MISTRAL_PROVIDER, key)?;
            Ok(format!("Saved {} API key to {}", MISTRAL_PROVIDER, store.config_file().display()))
        }
        ConfigAction::DeleteKey => {
            store.delete_api_key(MISTRAL_PROVIDER)?;
            Ok(format!("Removed {} API key from {}", MISTRAL_PROVIDER, store.config_file().display()))
        }
        ConfigAction::SetModel { model } => {
            let model = model.trim();
            if model.is_empty() {
                bail!("model name must not be empty");
            }
            let mut config = store.load()?;
            config.external.model = model.to_string();
            store.save(&config)?;
            Ok(format!("Remote classifier model set to {}", config.external.model))
        }
    }
}

fn load_config() -> AppConfig {
    let Some(store) = ConfigStore::open_default() else {
        return AppConfig::default();
    };
    match store.load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load {}: {}; using defaults", store.config_file().display(), e);
            AppConfig::default()
        }
    }
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("failed to read {}", p.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn print_summary(verdict: &DocumentVerdict) {
    println!("AI score:   {}%", verdict.ai_score);
    println!("Label:      {}", verdict.label.as_str());
    println!("Confidence: {:.2}", verdict.confidence);
    println!("Chunks:     {}", verdict.chunk_count);
    match verdict.external_probability {
        Some(p) => println!(
            "Local/remote: {:.2} / {:.2}",
            verdict.local_probability, p
        ),
        None => println!("Local:      {:.2} (remote classifier not used)", verdict.local_probability),
    }
    if let Some(note) = verdict.external_fallback.as_ref() {
        println!("Remote:     {}", note);
    }
    if !verdict.evidence_phrases.is_empty() {
        println!("Evidence:");
        for phrase in &verdict.evidence_phrases {
            println!("  - {}", phrase);
        }
    }
    println!("{}", verdict.explanation);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    if let Some(Commands::Config { action }) = cli.command {
        let store = ConfigStore::open_default().context("no config directory on this platform")?;
        println!("{}", run_config_command(&store, action)?);
        return Ok(());
    }

    let mut config = load_config();
    if let Some(size) = cli.max_chunk_size {
        config.detection.max_chunk_size = size;
    }
    if let Some(min) = cli.min_chars {
        config.detection.min_text_chars = min;
    }
    if let Some(scheme) = cli.scheme {
        config.detection.scheme = scheme;
    }
    if let Some(model) = cli.model.as_ref() {
        config.external.model = model.clone();
    }

    let raw = read_input(cli.path.as_ref())?;
    let text = if cli.normalize {
        normalize_punctuation(&raw)
    } else {
        raw
    };

    let classifier = if cli.local_only {
        None
    } else {
        MistralClassifier::from_config(&config)
    };
    match classifier.as_ref() {
        Some(c) => info!("Remote classifier enabled: {}", c.model()),
        None => info!("Remote classifier disabled, local analysis only"),
    }

    let detector = Detector::from_config(&config);
    let verdict = detector
        .analyze_with(
            &text,
            classifier.as_ref().map(|c| c as &dyn ExternalClassifier),
            |done, total| info!("Analyzed chunk {}/{}", done, total),
        )
        .await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        print_summary(&verdict);
    }

    Ok(())
}
