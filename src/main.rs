use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use subtrans::config::{Config, Provider};
use subtrans::pipeline::{print_summary, translate_file, RunConfig};
use subtrans::translate::{create_model, BatchTranslator, RetryPolicy};
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "subtrans")]
#[command(version, about = "Batch subtitle translation using AI")]
#[command(long_about = "Translate SRT subtitle files with OpenAI or Google Gemini, keeping cue timing intact and sizing each line to its on-screen duration.")]
struct Cli {
    /// Input subtitle file
    input: PathBuf,

    /// Output subtitle file (defaults to <input>_<language>.srt)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target language (e.g., Japanese, fr, pt-BR)
    #[arg(short, long)]
    target: Option<String>,

    /// Title of the film or show, used as translation context
    #[arg(long, default_value = "")]
    title: String,

    /// Number of cues per request
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Translation provider: openai, gemini
    #[arg(short, long)]
    provider: Option<String>,

    /// Model name override
    #[arg(short, long)]
    model: Option<String>,

    /// File with tone and character notes sent with every batch
    #[arg(long)]
    style_guide: Option<PathBuf>,

    /// Write a JSON reading-speed report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Skip the connection check before translating
    #[arg(long)]
    skip_check: bool,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn derive_output_path(input: &Path, target_language: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let suffix: String = target_language
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let mut output = input.to_path_buf();
    output.set_file_name(format!("{}_{}.srt", stem.to_string_lossy(), suffix));
    output
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Validate input file exists
    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    // Load configuration, then let flags win
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(ref provider) = cli.provider {
        config.provider = provider
            .parse::<Provider>()
            .map_err(|e: String| anyhow::anyhow!(e))?;
    }
    if let Some(ref model) = cli.model {
        config.model = Some(model.clone());
    }
    if let Some(size) = cli.batch_size {
        config.batch_size = size;
    }
    if let Some(ref target) = cli.target {
        config.target_language = target.clone();
    }
    let provider = config.provider;
    config
        .validate(provider)
        .context("Configuration validation failed")?;

    let style_guide = match cli.style_guide {
        Some(ref path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read style guide {}", path.display()))?,
        ),
        None => None,
    };

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| derive_output_path(&cli.input, &config.target_language));

    let model = create_model(provider, &config).context("Failed to create language model")?;

    info!("Input:    {}", cli.input.display());
    info!("Output:   {}", output.display());
    info!("Provider: {} ({})", model.name(), model.model());
    info!("Language: {}", config.target_language);
    if !cli.title.is_empty() {
        info!("Title:    {}", cli.title);
    }

    if cli.skip_check {
        warn!("Skipping connection check");
    } else {
        model
            .check_connection()
            .await
            .with_context(|| format!("Could not reach {}", model.name()))?;
        info!("Connection OK");
    }

    let translator = BatchTranslator::new(model).with_policy(RetryPolicy::from_config(&config));

    let run = RunConfig {
        title: cli.title.clone(),
        target_language: config.target_language.clone(),
        batch_size: config.batch_size,
        style_guide,
        context_window: config.context_window,
        show_progress: !cli.no_progress,
    };

    let result = translate_file(&cli.input, &output, &translator, &run)
        .await
        .context("Translation failed")?;

    if let Some(ref report_path) = cli.report {
        std::fs::write(report_path, result.report.to_json())
            .with_context(|| format!("Failed to write report {}", report_path.display()))?;
        info!("Report:   {}", report_path.display());
    }

    print_summary(&result);

    Ok(())
}
