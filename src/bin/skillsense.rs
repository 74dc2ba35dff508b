//! CLI binary for skillsense.
//!
//! Maps flags onto `ReviewConfig`, wires the local store and the LLM scorer
//! into the analyzer, and prints records.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use skillsense::backend::local::LocalStore;
use skillsense::pipeline::input::resolve_input;
use skillsense::pipeline::llm::{resolve_provider, LlmScorer};
use skillsense::{
    format_size, list_records, load_record, render_listing, render_record, require_auth,
    AnalysisForm, AnalysisObserver, AnalysisStage, Capabilities, FileIntake, NoopObserver,
    Rasterizer, ResumeAnalyzer, ReviewConfig, ReviewError,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Spinner observer ─────────────────────────────────────────────────────────

/// Shows the current stage's status text next to a spinner.
struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_message("Starting…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl AnalysisObserver for SpinnerObserver {
    fn on_stage(&self, stage: AnalysisStage) {
        self.bar.set_message(stage.status_text());
    }

    fn on_complete(&self, route: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", green("✔"), bold(route));
    }

    fn on_error(&self, status: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", red("✘"), red(status));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Sign in once (local session)
  skillsense login alice

  # Review a résumé against a job
  skillsense analyze resume.pdf --company Acme --title "Backend Engineer" \
      --description "Rust, Postgres, on-call rotation"

  # Job description from a file, résumé from a URL
  skillsense analyze https://example.com/cv.pdf --title SRE --description-file job.txt

  # List stored reviews, then show one
  skillsense list
  skillsense show 3f6c2a9e-…

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  SKILLSENSE_STORE_DIR    Where blobs, records and the session live
"#;

/// Score résumés against job descriptions with a vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "skillsense",
    version,
    about = "Score résumés against job descriptions with a vision LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding blobs, records and the session.
    #[arg(long, global = true, env = "SKILLSENSE_STORE_DIR", default_value = ".skillsense")]
    store_dir: PathBuf,

    /// Path to libpdfium (file or containing directory).
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SKILLSENSE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SKILLSENSE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a résumé, render it, and record AI feedback.
    Analyze(AnalyzeArgs),

    /// List stored reviews.
    List {
        /// Print records as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one stored review.
    Show {
        id: String,

        /// Print the record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start a local session.
    Login { username: String },

    /// End the local session.
    Logout,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Local PDF path or HTTP/HTTPS URL.
    input: String,

    /// Company the application targets.
    #[arg(long, env = "SKILLSENSE_COMPANY", default_value = "")]
    company: String,

    /// Job title.
    #[arg(long, env = "SKILLSENSE_TITLE", default_value = "")]
    title: String,

    /// Job description text.
    #[arg(long, env = "SKILLSENSE_DESCRIPTION", conflicts_with = "description_file")]
    description: Option<String>,

    /// Read the job description from a file.
    #[arg(long)]
    description_file: Option<PathBuf>,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Page-1 oversampling factor (0.5–8).
    #[arg(long, env = "SKILLSENSE_SCALE", default_value_t = 4.0)]
    scale: f32,

    /// Largest accepted file, in bytes.
    #[arg(long, env = "SKILLSENSE_MAX_FILE_BYTES", default_value_t = skillsense::config::DEFAULT_MAX_FILE_BYTES)]
    max_file_bytes: u64,

    /// Max LLM output tokens.
    #[arg(long, env = "SKILLSENSE_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "SKILLSENSE_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Retries on LLM failure.
    #[arg(long, env = "SKILLSENSE_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "SKILLSENSE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "SKILLSENSE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable the spinner.
    #[arg(long, env = "SKILLSENSE_NO_PROGRESS")]
    no_progress: bool,

    /// Print the finished record as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries the stage text, so library INFO logs are muted
    // while it is on screen.
    let show_progress = match &cli.command {
        Command::Analyze(args) => !cli.quiet && !args.no_progress && !args.json,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let store = Arc::new(LocalStore::new(&cli.store_dir));

    match &cli.command {
        Command::Analyze(args) => analyze(&cli, args, store, show_progress).await,
        Command::List { json } => {
            require_auth(&*store, "/").map_err(not_signed_in)?;
            let config = ReviewConfig::default();
            let records = list_records(&*store, &config.key_prefix)
                .await
                .context("Failed to list records")?;

            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&records).context("Failed to serialise records")?
                );
            } else {
                for line in render_listing(&records) {
                    println!("{line}");
                }
            }
            Ok(())
        }
        Command::Show { id, json } => {
            require_auth(&*store, &format!("/resume/{id}")).map_err(not_signed_in)?;
            let config = ReviewConfig::default();
            let Some(record) = load_record(&*store, &config.key_prefix, id)
                .await
                .context("Failed to load record")?
            else {
                bail!("No resume with id '{id}'");
            };

            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&record).context("Failed to serialise record")?
                );
            } else {
                print!("{}", render_record(&record));
            }
            Ok(())
        }
        Command::Login { username } => {
            store
                .sign_in(username)
                .await
                .context("Failed to write session")?;
            if !cli.quiet {
                eprintln!("{} signed in as {}", green("✔"), bold(username));
            }
            Ok(())
        }
        Command::Logout => {
            store.sign_out().await.context("Failed to remove session")?;
            if !cli.quiet {
                eprintln!("{} signed out", green("✔"));
            }
            Ok(())
        }
    }
}

async fn analyze(
    cli: &Cli,
    args: &AnalyzeArgs,
    store: Arc<LocalStore>,
    show_progress: bool,
) -> Result<()> {
    let config = build_config(cli, args).await?;
    let job_description = match (&args.description, &args.description_file) {
        (_, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read job description from {:?}", path))?,
        (Some(text), None) => text.clone(),
        (None, None) => String::new(),
    };

    let file = resolve_input(&args.input, args.download_timeout)
        .await
        .context("Failed to read résumé")?;
    let mut intake = FileIntake::new(config.max_file_bytes);
    intake.select([file]).context("File rejected")?;
    if let (Some(held), false) = (intake.file(), cli.quiet) {
        eprintln!("{} {}", held.name(), dim(&format_size(held.size())));
    }

    let rasterizer = Arc::new(Rasterizer::pdfium(&config));
    let provider = resolve_provider(&config).context("Failed to set up the LLM provider")?;
    let scorer = LlmScorer::new(provider, store.clone(), rasterizer.clone(), config.clone());
    let caps = Capabilities {
        storage: store.clone(),
        kv: store.clone(),
        scoring: Arc::new(scorer),
        auth: store,
    };

    let observer: Arc<dyn AnalysisObserver> = if show_progress {
        SpinnerObserver::new()
    } else {
        Arc::new(NoopObserver)
    };
    let analyzer = ResumeAnalyzer::new(caps, rasterizer, &config).with_observer(observer);

    let form = AnalysisForm {
        company_name: args.company.clone(),
        job_title: args.title.clone(),
        job_description,
    };
    let outcome = analyzer
        .submit(intake.take(), form)
        .await
        .map_err(not_signed_in)
        .context("Analysis failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome.record).context("Failed to serialise record")?
        );
    } else {
        print!("{}", render_record(&outcome.record));
    }
    Ok(())
}

/// Map CLI args to `ReviewConfig`.
async fn build_config(cli: &Cli, args: &AnalyzeArgs) -> Result<ReviewConfig> {
    let mut builder = ReviewConfig::builder()
        .render_scale(args.scale)
        .max_file_bytes(args.max_file_bytes)
        .max_tokens(args.max_tokens)
        .temperature(args.temperature)
        .max_retries(args.max_retries)
        .store_dir(&cli.store_dir);

    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref path) = cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path);
    }

    builder.build().context("Invalid configuration")
}

/// Turn the redirect into a hint for the terminal.
fn not_signed_in(e: ReviewError) -> anyhow::Error {
    match e {
        ReviewError::Unauthenticated { redirect } => anyhow::anyhow!(
            "Not signed in (would continue at {redirect}). Run `skillsense login <name>` first."
        ),
        other => other.into(),
    }
}
