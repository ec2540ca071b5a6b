use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fhat_core::classify::Classifier;
use fhat_core::present::{DashboardViewModel, ResultPresenter, ResultsPage};
use fhat_core::service::http::HttpAnalysisService;
use fhat_core::service::SelectedFile;
use fhat_core::storage::SnapshotStore;
use fhat_core::workflow::error::WorkflowError;
use fhat_core::workflow::WorkflowController;

mod summary;

const NO_ANALYSIS_MESSAGE: &str =
    "No analysis in this session yet. Run with --file <path> first (set FHAT_SESSION_DIR to keep a session across runs).";

#[derive(Debug, Parser)]
#[command(name = "fhat_cli")]
struct Args {
    /// Financial data file to upload (.csv or .xlsx).
    #[arg(long, conflicts_with = "show")]
    file: Option<PathBuf>,

    /// Present the latest snapshot of this session without calling the service.
    #[arg(long)]
    show: bool,

    /// Print the dashboard as JSON instead of a text summary.
    #[arg(long)]
    json: bool,

    /// Overrides FHAT_BUSINESS_ID.
    #[arg(long)]
    business_id: Option<u64>,

    /// Overrides FHAT_ANALYSIS_LANG.
    #[arg(long)]
    lang: Option<String>,
}

/// How a run ended. Failures are reported by `main`, which returns normally
/// so the sentry guard flushes.
#[derive(Debug, PartialEq)]
enum Outcome {
    Printed,
    Failed(String),
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let mut settings = fhat_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    if let Some(business_id) = args.business_id {
        settings.business_id = business_id;
    }
    if let Some(lang) = args.lang.clone() {
        settings.analysis_lang = lang;
    }

    let presenter = ResultPresenter::new(&Classifier::default())
        .context("threshold registry is misconfigured")?;
    let store = SnapshotStore::session(&settings.session_dir);

    let outcome = if args.show {
        show(&store, &presenter, args.json)
    } else {
        submit(&args, &settings, &store, &presenter).await
    };

    if !settings.resume_session {
        store.end_session();
    }

    match outcome? {
        Outcome::Printed => Ok(ExitCode::SUCCESS),
        Outcome::Failed(message) => {
            eprintln!("{message}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn submit(
    args: &Args,
    settings: &fhat_core::config::Settings,
    store: &Arc<SnapshotStore>,
    presenter: &ResultPresenter,
) -> anyhow::Result<Outcome> {
    let file = args.file.as_deref().map(read_selected_file).transpose()?;

    let service = HttpAnalysisService::from_settings(settings)?;
    let controller = WorkflowController::new(service, Arc::clone(store), settings.business_id);

    tracing::info!(
        business_id = settings.business_id,
        file = ?args.file,
        lang = %settings.analysis_lang,
        "submitting financial data"
    );
    match controller.submit(file).await {
        Ok(()) => show(store, presenter, args.json),
        Err(err) => {
            if let WorkflowError::Transport(_) = &err {
                let report = anyhow::Error::new(err.clone());
                sentry_anyhow::capture_anyhow(&report);
            }
            tracing::error!(business_id = settings.business_id, error = %err, "analysis run failed");
            Ok(Outcome::Failed(err.user_message()))
        }
    }
}

fn show(store: &SnapshotStore, presenter: &ResultPresenter, json: bool) -> anyhow::Result<Outcome> {
    match ResultsPage::load(store, presenter) {
        ResultsPage::RedirectToUpload => Ok(Outcome::Failed(NO_ANALYSIS_MESSAGE.to_string())),
        ResultsPage::Dashboard { dashboard } => {
            print_dashboard(&dashboard, json)?;
            Ok(Outcome::Printed)
        }
    }
}

fn print_dashboard(dashboard: &DashboardViewModel, json: bool) -> anyhow::Result<()> {
    if json {
        let out = serde_json::to_string_pretty(dashboard).context("failed to serialize dashboard")?;
        println!("{out}");
    } else {
        print!("{}", summary::render(dashboard));
    }
    Ok(())
}

fn read_selected_file(path: &Path) -> anyhow::Result<SelectedFile> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(SelectedFile::new(file_name, bytes))
}

fn init_sentry(settings: &fhat_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
