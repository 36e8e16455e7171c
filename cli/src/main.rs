//! Switchboard CLI - binary entry point.
//!
//! # Architecture
//!
//! Each subcommand is one short page visit: it builds the page model the
//! operation needs, starts a [`Console`], feeds it at most one event, and
//! keeps ticking until the engine has no queued work left. Effects the engine
//! emits along the way are printed as plain lines. Durable cross-visit state
//! (the last-known status mailbox, the back-navigation marker) lives in the
//! state directory, so consecutive invocations see each other's writes.
//!
//! ```text
//! main() -> ConsoleConfig -> Console::start() -> handle(event) -> drive()
//!                                                                    |
//!                                                                    v
//!                                                printed effects + exit code
//! ```

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use switchboard_client::{AdminClient, AdminTarget};
use switchboard_config::ConsoleConfig;
use switchboard_engine::{
    Console, FileStore, FormModel, NoticeLevel, PageModel, StatusStore, ToggleDisplay, UiEffect,
    UiEvent,
};
use switchboard_types::FormId;

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(about = "Drive the WhatsApp notifier admin interface from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (default: ~/.switchboard/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the notifier configuration is complete (exit 1 if not)
    Check,
    /// Fetch authoritative statuses for the given forms
    Reconcile {
        /// Form ids to reconcile
        #[arg(required = true)]
        form_ids: Vec<u64>,
    },
    /// Flip a form's notification status
    Toggle {
        /// Form id to flip
        form_id: u64,
    },
    /// Ask the server to verify its gateway connection
    TestConnection,
    /// Clear the stored notification log
    ClearLogs {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn init_tracing(config: &ConsoleConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    let (log_file, init_warnings) = open_log_file(config);

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // If we can't open a log file, prefer "no logs" over mixing log lines
    // into the command output.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file(config: &ConsoleConfig) -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let candidates = log_file_candidates(config);
    let mut warnings = Vec::new();

    for candidate in candidates {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates(config: &ConsoleConfig) -> Vec<PathBuf> {
    vec![
        // Primary: <state dir>/logs/switchboard.log
        config.state_dir().join("logs").join("switchboard.log"),
        // Fallback: ./.switchboard/logs/switchboard.log (useful in
        // constrained environments)
        PathBuf::from(".switchboard")
            .join("logs")
            .join("switchboard.log"),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConsoleConfig::load_from(path)?,
        None => ConsoleConfig::load()?.unwrap_or_default(),
    };
    init_tracing(&config);

    let endpoint = config.endpoint().context(
        "no admin endpoint configured; set [admin] endpoint or SWITCHBOARD_ENDPOINT",
    )?;
    let token = config
        .token()
        .context("no auth token configured; set [admin] token or SWITCHBOARD_TOKEN")?;
    let target = AdminTarget::new(&endpoint, token)?;
    let client = AdminClient::new(target).with_timeout(config.request_timeout());
    let store: Box<dyn StatusStore + Send> = Box::new(
        FileStore::new(config.state_dir()).context("prepare the state directory")?,
    );

    let page = match &cli.command {
        Commands::Check => PageModel::form_list([]),
        Commands::Reconcile { form_ids } => {
            PageModel::form_list(form_ids.iter().map(|id| (FormId::new(*id), false)))
        }
        Commands::Toggle { form_id } => PageModel::form_list([(FormId::new(*form_id), false)]),
        Commands::TestConnection | Commands::ClearLogs { .. } => {
            PageModel::settings(FormModel::new(FormId::new(0)))
        }
    };
    let mut console = Console::new(client, page, store, config.settings_url());
    console.start();

    match cli.command {
        Commands::Check => check(&mut console).await,
        Commands::Reconcile { form_ids } => reconcile(&mut console, &form_ids).await,
        Commands::Toggle { form_id } => toggle(&mut console, FormId::new(form_id)).await,
        Commands::TestConnection => test_connection(&mut console).await,
        Commands::ClearLogs { yes } => clear_logs(&mut console, yes).await,
    }
}

async fn check(console: &mut Console) -> Result<()> {
    let effects = drive(console).await;

    if effects
        .iter()
        .any(|e| matches!(e, UiEffect::ShowConfigBanner(_)))
    {
        bail!("notifier configuration is incomplete");
    }
    if let Some(message) = first_error(&effects) {
        bail!("configuration check failed: {message}");
    }
    println!("configuration complete");
    Ok(())
}

async fn reconcile(console: &mut Console, form_ids: &[u64]) -> Result<()> {
    let effects = drive(console).await;

    for id in form_ids {
        let form_id = FormId::new(*id);
        if let Some(enabled) = console.displayed_status(form_id) {
            println!("form #{form_id}: {}", ToggleDisplay::settled(enabled).label());
        }
    }
    if let Some(message) = first_error(&effects) {
        bail!("{message}");
    }
    Ok(())
}

async fn toggle(console: &mut Console, form_id: FormId) -> Result<()> {
    // Let the scheduled pass replace the assumed-off display with server
    // truth, so the flip requests the opposite of the real current state.
    drive(console).await;
    let before = console.displayed_status(form_id).unwrap_or(false);

    console.handle(UiEvent::ToggleFlipped { form_id });
    let effects = drive(console).await;

    let after = console.displayed_status(form_id).unwrap_or(before);
    println!("form #{form_id}: {}", ToggleDisplay::settled(after).label());
    if let Some(message) = first_error(&effects) {
        bail!("{message}");
    }
    Ok(())
}

async fn test_connection(console: &mut Console) -> Result<()> {
    console.handle(UiEvent::TestConnectionRequested);
    let effects = drive(console).await;

    if let Some(message) = first_error(&effects) {
        bail!("{message}");
    }
    Ok(())
}

async fn clear_logs(console: &mut Console, yes: bool) -> Result<()> {
    console.handle(UiEvent::ClearLogsRequested);
    let request = console.take_effects().into_iter().find_map(|e| match e {
        UiEffect::RequestConfirmation(request) => Some(request),
        _ => None,
    });
    let Some(request) = request else {
        bail!("the engine did not ask for confirmation");
    };

    if !yes && !confirm_on_terminal(&request.prompt)? {
        println!("aborted");
        return Ok(());
    }
    console.handle(UiEvent::ConfirmationAnswered {
        id: request.id,
        confirmed: true,
    });

    let effects = drive(console).await;
    if let Some(message) = first_error(&effects) {
        bail!("{message}");
    }
    Ok(())
}

const DRIVE_POLL: Duration = Duration::from_millis(25);

/// Tick the console until its queued work (remote calls in flight, scheduled
/// reconciliation passes) has drained, printing printable effects on the way.
/// Sleeps stop early at the engine's next timer deadline; remote completions
/// arrive through the mailbox, not a timer, so the poll interval caps the
/// wait.
async fn drive(console: &mut Console) -> Vec<UiEffect> {
    let mut seen = Vec::new();
    loop {
        console.tick();
        let batch = console.take_effects();
        for effect in &batch {
            if let Some(line) = render_effect(effect) {
                println!("{line}");
            }
        }
        seen.extend(batch);
        if console.idle() {
            return seen;
        }
        let pause = console.next_deadline().map_or(DRIVE_POLL, |deadline| {
            deadline
                .saturating_duration_since(tokio::time::Instant::now())
                .min(DRIVE_POLL)
        });
        tokio::time::sleep(pause).await;
    }
}

/// One printed line (or block) per effect a terminal can usefully show.
/// Field-level effects only make sense against a rendered form; they are
/// logged by the engine and skipped here.
fn render_effect(effect: &UiEffect) -> Option<String> {
    match effect {
        UiEffect::ShowNotice(notice) => {
            Some(format!("[{}] {}", notice.level().as_str(), notice.message()))
        }
        UiEffect::ShowConfigBanner(banner) => {
            let mut out = format!("! {}", banner.message);
            for finding in &banner.findings {
                out.push_str(&format!("\n!   {}: {}", finding.label, finding.message));
            }
            if let Some(url) = banner.settings_url.as_deref() {
                out.push_str(&format!("\n!   settings: {url}"));
            }
            Some(out)
        }
        UiEffect::ClearLogPanel => Some("log panel cleared".to_owned()),
        _ => None,
    }
}

fn first_error(effects: &[UiEffect]) -> Option<&str> {
    effects.iter().find_map(|e| match e {
        UiEffect::ShowNotice(notice) if notice.level() == NoticeLevel::Error => {
            Some(notice.message())
        }
        _ => None,
    })
}

fn confirm_on_terminal(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush().context("flush the prompt")?;
    let mut answer = String::new();
    io::stdin()
        .read_line(&mut answer)
        .context("read the confirmation answer")?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
