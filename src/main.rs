// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use kikuyu_translate::app_config::{Config, LogLevel};
use kikuyu_translate::database::models::{
    Difficulty, NewPrompt, NewTranslation, SourceType, TranslationStatus,
};
use kikuyu_translate::database::Repository;
use kikuyu_translate::export::{export_translations, ExportFormat};
use kikuyu_translate::moderation::ModerationService;
use kikuyu_translate::prompt_cache::PromptCache;
use kikuyu_translate::validation::validate_kikuyu_text;
use kikuyu_translate::{run_server, stats};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for ExportFormat to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliExportFormat {
    Json,
    Csv,
}

impl From<CliExportFormat> for ExportFormat {
    fn from(format: CliExportFormat) -> Self {
        match format {
            CliExportFormat::Json => ExportFormat::Json,
            CliExportFormat::Csv => ExportFormat::Csv,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (default command)
    Serve,

    /// Create the database file and schema
    InitDb,

    /// Run self-checks against validation, storage and statistics
    HealthCheck,

    /// Refill the prompt cache from the LLM and the dataset
    Refill {
        /// Refill even when the cache is above its low-water mark
        #[arg(short, long)]
        force: bool,
    },

    /// Delete translations that were marked rejected
    CleanupRejected,

    /// Export translations to a file or stdout
    Export {
        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: CliExportFormat,

        /// Status filter: pending, approved, rejected, flagged or all
        #[arg(short, long, default_value = "all")]
        status: String,

        /// Output file; `-` writes to stdout. Defaults to the generated file name
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completions for kikuyu-translate
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Kikuyu Translate - crowdsourced English to Kikuyu translations
///
/// Serves English prompts to volunteers, stores their Kikuyu translations
/// and exposes an admin panel for review and export.
#[derive(Parser, Debug)]
#[command(name = "kikuyu-translate")]
#[command(version)]
#[command(about = "Crowdsourcing service for English to Kikuyu translations")]
#[command(long_about = "Kikuyu Translate serves English sentences to contributors and collects their Kikuyu translations.

EXAMPLES:
    kikuyu-translate                              # Start the server with settings from the environment
    kikuyu-translate --port 8080 serve            # Start the server on another port
    kikuyu-translate init-db                      # Create the database schema
    kikuyu-translate refill --force               # Refill the prompt cache now
    kikuyu-translate export -f csv -s approved    # Export approved translations as CSV
    kikuyu-translate completions bash > kt.bash   # Generate bash completions

CONFIGURATION:
    Settings are read from environment variables (OPENROUTER_API_KEY, ADMIN_PASSWORD,
    SECRET_KEY, DATABASE_PATH, MIN_CACHE_SIZE, ...). The flags below override the
    matching variables.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Address to bind the server on
    #[arg(long, global = true)]
    host: Option<String>,

    /// Port to bind the server on
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// SQLite database file
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // Filtering happens through log::max_level so it can be raised later
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI colour for log level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, colour) = Self::decoration(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                colour, now, emoji, record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Start at info; the configured level is applied once config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "kikuyu-translate", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await,
        Commands::InitDb => init_db(&config),
        Commands::HealthCheck => health_check(&config).await,
        Commands::Refill { force } => refill(&config, force).await,
        Commands::CleanupRejected => cleanup_rejected(&config).await,
        Commands::Export {
            format,
            status,
            output,
        } => export(&config, format.into(), &status, output).await,
        Commands::Completions { .. } => Ok(()),
    }
}

/// Read the environment, apply CLI overrides and validate
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::from_env().context("Failed to load configuration")?;

    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(database) = &cli.database {
        config.server.database_path = database.to_string_lossy().into_owned();
    }

    let level = match &cli.log_level {
        Some(level) => {
            config.log_level = level.clone().into();
            config.log_level
        }
        None => config.effective_log_level(),
    };
    log::set_max_level(level.to_level_filter());

    config
        .validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

fn init_db(config: &Config) -> Result<()> {
    let repo = Repository::open(&config.server.database_path)?;
    let stats = repo.connection().stats()?;
    info!(
        "Database ready at {} ({} prompts, {} translations, {} users)",
        config.server.database_path, stats.prompt_count, stats.translation_count, stats.user_count
    );
    Ok(())
}

/// One named self-check with its result
struct CheckResult {
    name: &'static str,
    passed: bool,
    detail: String,
}

impl CheckResult {
    fn from_result(name: &'static str, result: Result<String>) -> Self {
        match result {
            Ok(detail) => Self { name, passed: true, detail },
            Err(e) => Self {
                name,
                passed: false,
                detail: format!("{:#}", e),
            },
        }
    }
}

fn check_validation_samples() -> Result<String> {
    let accepted = ["Wĩ mwega?", "Nĩ ndĩ mwega mũno.", "Ũrĩ kũ?"];
    for sample in accepted {
        validate_kikuyu_text(sample)
            .map_err(|e| anyhow!("Expected '{}' to be accepted: {}", sample, e))?;
    }

    let rejected = ["", "   ", "<script>alert(1)</script>"];
    for sample in rejected {
        if validate_kikuyu_text(sample).is_ok() {
            return Err(anyhow!("Expected {:?} to be rejected", sample));
        }
    }

    Ok(format!(
        "{} accepted, {} rejected as expected",
        accepted.len(),
        rejected.len()
    ))
}

async fn check_database_round_trip(repo: &Repository) -> Result<String> {
    let prompt_id = repo
        .insert_prompt(&NewPrompt::new(
            "Good morning, how are you?",
            "greetings",
            SourceType::Manual,
            Difficulty::Basic,
        ))
        .await?
        .ok_or_else(|| anyhow!("Sample prompt was reported as duplicate"))?;

    let user = repo.get_or_create_user("health-check").await?;
    let claimed = repo
        .claim_next_prompt(&user.session_id, None)
        .await?
        .ok_or_else(|| anyhow!("No prompt could be claimed"))?;
    if claimed.id != prompt_id {
        return Err(anyhow!("Claimed prompt {} instead of {}", claimed.id, prompt_id));
    }

    let translation = repo
        .create_translation(NewTranslation {
            prompt_id,
            user_id: user.id,
            kikuyu_text: validate_kikuyu_text("Rũciinĩ mwega, ũrĩ mwega?")?,
            ip_address: None,
            user_agent: None,
        })
        .await?;
    let stored = repo
        .get_translation(translation.id)
        .await?
        .ok_or_else(|| anyhow!("Stored translation could not be read back"))?;

    Ok(format!(
        "prompt {} and translation {} written and read back",
        prompt_id, stored.id
    ))
}

async fn check_duplicate_detection(repo: &Repository) -> Result<String> {
    let prompt_id = repo
        .insert_prompt(&NewPrompt::new(
            "Thank you very much.",
            "greetings",
            SourceType::Manual,
            Difficulty::Basic,
        ))
        .await?
        .ok_or_else(|| anyhow!("Sample prompt was reported as duplicate"))?;

    if repo
        .insert_prompt(&NewPrompt::new(
            "  thank you VERY much.",
            "greetings",
            SourceType::Manual,
            Difficulty::Basic,
        ))
        .await?
        .is_some()
    {
        return Err(anyhow!("Duplicate prompt text was accepted"));
    }

    let user = repo.get_or_create_user("health-check-duplicates").await?;
    let claimed = repo
        .claim_next_prompt(&user.session_id, None)
        .await?
        .ok_or_else(|| anyhow!("No prompt could be claimed"))?;
    if claimed.id != prompt_id {
        return Err(anyhow!("Claimed prompt {} instead of {}", claimed.id, prompt_id));
    }
    let translation = |text: &str| NewTranslation {
        prompt_id,
        user_id: user.id,
        kikuyu_text: text.to_string(),
        ip_address: None,
        user_agent: None,
    };
    repo.create_translation(translation("Nĩ ngatho mũno.")).await?;
    if repo
        .create_translation(translation("nĩ ngatho mũno."))
        .await
        .is_ok()
    {
        return Err(anyhow!("Duplicate translation was accepted"));
    }

    Ok("duplicate prompts and translations rejected".to_string())
}

async fn check_stats_timing(repo: &Repository) -> Result<String> {
    let started = Instant::now();
    let overview = stats::overview(repo).await?;
    stats::category_stats(repo).await?;
    stats::platform_stats(repo).await?;
    let elapsed = started.elapsed();

    if elapsed > Duration::from_secs(2) {
        return Err(anyhow!("Statistics took {} ms", elapsed.as_millis()));
    }
    Ok(format!(
        "{} translations summarized in {} ms",
        overview.translations.total,
        elapsed.as_millis()
    ))
}

/// Checks run against a scratch in-memory database plus a ping of the real one
async fn health_check(config: &Config) -> Result<()> {
    let scratch = Repository::new_in_memory()?;

    let mut results = vec![CheckResult::from_result(
        "validation samples",
        check_validation_samples(),
    )];
    results.push(CheckResult::from_result(
        "database round-trip",
        check_database_round_trip(&scratch).await,
    ));
    results.push(CheckResult::from_result(
        "duplicate detection",
        check_duplicate_detection(&scratch).await,
    ));
    results.push(CheckResult::from_result(
        "statistics timing",
        check_stats_timing(&scratch).await,
    ));

    let configured = async {
        let repo = Repository::open(&config.server.database_path)?;
        repo.ping().await?;
        Ok(format!("{} reachable", config.server.database_path))
    };
    results.push(CheckResult::from_result("configured database", configured.await));

    for result in &results {
        if result.passed {
            info!("PASS {}: {}", result.name, result.detail);
        } else {
            error!("FAIL {}: {}", result.name, result.detail);
        }
    }

    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        return Err(anyhow!("{} of {} health checks failed", failed, results.len()));
    }
    info!("All {} health checks passed", results.len());
    Ok(())
}

async fn refill(config: &Config, force: bool) -> Result<()> {
    let repo = Repository::open(&config.server.database_path)?;
    let cache = PromptCache::from_config(config, repo);

    let before = cache.stats().await?;
    info!(
        "Cache has {} available prompts (minimum {}), {} of {} API calls left today",
        before.available, before.min_cache_size, before.remaining_calls, before.daily_limit
    );

    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message("Refilling prompt cache...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let outcome = cache.refill(force).await;
    spinner.finish_and_clear();
    let outcome = outcome?;

    if let Some(reason) = outcome.skipped_reason {
        warn!("Refill skipped: {:?}. Use --force to refill anyway.", reason);
        return Ok(());
    }
    if let Some(llm_error) = &outcome.llm_error {
        warn!("LLM generation stopped early: {}", llm_error);
    }

    let after = cache.stats().await?;
    let bar = ProgressBar::new(after.min_cache_size.max(1) as u64);
    let style = ProgressStyle::default_bar()
        .template("[{bar:40.cyan/blue}] {pos}/{len} available {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style.progress_chars("█▓▒░"));
    bar.set_position(after.available.max(0) as u64);
    bar.finish_with_message(format!("({:?})", after.health));

    info!(
        "Added {} prompts ({} from LLM, {} from dataset) using {} API calls",
        outcome.added, outcome.llm_added, outcome.dataset_added, outcome.calls_made
    );
    Ok(())
}

async fn cleanup_rejected(config: &Config) -> Result<()> {
    let repo = Repository::open(&config.server.database_path)?;
    let removed = ModerationService::new(repo.clone()).cleanup_rejected("cli").await?;
    info!("Removed {} rejected translations", removed);
    if removed > 0 {
        repo.connection().vacuum()?;
    }
    Ok(())
}

async fn export(
    config: &Config,
    format: ExportFormat,
    status: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let status = match status.trim() {
        "" | "all" => None,
        value => Some(
            value
                .parse::<TranslationStatus>()
                .map_err(|_| anyhow!("Invalid status: {}", value))?,
        ),
    };

    let repo = Repository::open(&config.server.database_path)?;
    let file = export_translations(&repo, format, status, config.limits.max_export_records).await?;

    let path = output.unwrap_or_else(|| PathBuf::from(&file.file_name));
    if path.as_os_str() == "-" {
        std::io::stdout()
            .write_all(file.body.as_bytes())
            .context("Failed to write export to stdout")?;
        return Ok(());
    }

    std::fs::write(&path, &file.body)
        .with_context(|| format!("Failed to write export file: {:?}", path))?;
    info!("Exported {} translations to {:?}", file.records, path);
    Ok(())
}
