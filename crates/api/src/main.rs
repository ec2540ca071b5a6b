use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fhat_core::classify::Classifier;
use fhat_core::present::{ResultPresenter, ResultsPage};
use fhat_core::service::http::HttpAnalysisService;
use fhat_core::service::SelectedFile;
use fhat_core::storage::SnapshotStore;
use fhat_core::workflow::error::WorkflowError;
use fhat_core::workflow::{WorkflowController, WorkflowState};

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const UPLOAD_PAGE: &str = r#"<!doctype html>
<html>
  <head><title>Financial Health Assessment</title></head>
  <body>
    <h1>Upload financial data</h1>
    <form action="/submit" method="post" enctype="multipart/form-data">
      <input type="file" name="file" accept=".csv,.xlsx">
      <button type="submit">Analyze</button>
    </form>
  </body>
</html>
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = fhat_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let presenter = match ResultPresenter::new(&Classifier::default()) {
        Ok(presenter) => presenter,
        Err(e) => {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            return Err(err.context("threshold registry is misconfigured"));
        }
    };

    let service = HttpAnalysisService::from_settings(&settings)?;
    let store = SnapshotStore::session(&settings.session_dir);
    let controller = Arc::new(WorkflowController::new(
        service,
        Arc::clone(&store),
        settings.business_id,
    ));

    let state = AppState {
        controller,
        presenter,
    };

    let app = Router::new()
        .route("/", get(upload_page))
        .route("/healthz", get(healthz))
        .route("/submit", post(submit))
        .route("/workflow", get(workflow_state))
        .route("/dashboard", get(dashboard))
        .route("/snapshot/latest", get(latest_snapshot))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));

    tracing::info!(
        %addr,
        business_id = settings.business_id,
        session_dir = %settings.session_dir.display(),
        resume_session = settings.resume_session,
        "dashboard listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if !settings.resume_session {
        store.end_session();
    }
    Ok(())
}

#[derive(Clone)]
struct AppState {
    controller: Arc<WorkflowController<HttpAnalysisService>>,
    presenter: ResultPresenter,
}

#[derive(Debug, Serialize)]
struct ApiError {
    message: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ApiError { message })).into_response()
}

async fn healthz() -> &'static str {
    "ok"
}

async fn upload_page() -> Html<&'static str> {
    Html(UPLOAD_PAGE)
}

async fn submit(State(state): State<AppState>, multipart: Multipart) -> Response {
    let file = match read_file_field(multipart).await {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(error = %e, "malformed upload form");
            return error_response(StatusCode::BAD_REQUEST, "Could not read the uploaded form.".to_string());
        }
    };

    match state.controller.submit(file).await {
        Ok(()) => Redirect::to("/dashboard").into_response(),
        Err(err) => {
            let status = match &err {
                WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
                WorkflowError::AlreadyInProgress => StatusCode::CONFLICT,
                WorkflowError::Transport(_) => StatusCode::BAD_GATEWAY,
            };
            error_response(status, err.user_message())
        }
    }
}

/// Picks the `file` field; an empty file input counts as no file.
async fn read_file_field(mut multipart: Multipart) -> anyhow::Result<Option<SelectedFile>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        if file_name.is_empty() && bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(SelectedFile::new(file_name, bytes.to_vec())));
    }
    Ok(None)
}

async fn workflow_state(State(state): State<AppState>) -> Json<WorkflowState> {
    Json(state.controller.state())
}

async fn dashboard(State(state): State<AppState>) -> Response {
    match ResultsPage::load(state.controller.store(), &state.presenter) {
        ResultsPage::RedirectToUpload => Redirect::to("/").into_response(),
        ResultsPage::Dashboard { dashboard } => Json(dashboard).into_response(),
    }
}

async fn latest_snapshot(State(state): State<AppState>) -> Response {
    match state.controller.store().latest() {
        Some(snapshot) => Json(snapshot).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
