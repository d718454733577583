use axum::{
    routing::{get, post},
    Router,
    extract::{Json, State},
    http::header,
    response::{Html, IntoResponse, Response},
};
use tower_http::cors::{CorsLayer, Any};
use chrono::Utc;
use tracing::info;

use crate::error::{Result, AppError};
use crate::api::models::{CredentialList, RunRequest, RunResponse};
use crate::api::response::{self, Reply};
use crate::export::{to_xlsx, EXPORT_FILENAME, XLSX_MIME};
use crate::pipeline::{scrape_and_analyze, NO_DATA_MESSAGE};
use crate::AppState;

const DASHBOARD: &str = include_str!("dashboard.html");

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/api/credentials", get(credentials_handler))
        .route("/api/run", post(run_handler))
        .route("/api/export", get(export_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn dashboard_handler() -> Html<&'static str> {
    Html(DASHBOARD)
}

async fn credentials_handler(State(state): State<AppState>) -> Reply<CredentialList> {
    response::success(CredentialList { names: state.credentials.names() }, None)
}

async fn run_handler(
    State(state): State<AppState>,
    Json(req): Json<RunRequest>,
) -> Reply<RunResponse> {
    let Ok(_running) = state.run_lock.try_lock() else {
        return response::failure(&AppError::Busy);
    };

    info!(credential = %req.credential, llm_token = req.llm_token.is_some(), "Run requested");
    // A failed run must not leave the previous table downloadable.
    state.store_latest(None);
    let start_time = std::time::Instant::now();
    let result = process_run(&state, &req).await;
    info!(elapsed = ?start_time.elapsed(), ok = result.is_ok(), "Run finished");

    match result {
        Ok(data) => {
            let message = (!data.has_data).then(|| NO_DATA_MESSAGE.to_string());
            response::success(data, message)
        }
        Err(err) => response::failure(&err),
    }
}

async fn process_run(state: &AppState, req: &RunRequest) -> Result<RunResponse> {
    let session = state.session(&req.credential, req.llm_token.as_deref())?;
    let source = session.scrape_client(&state.config);
    let completer = session.chat_client(&state.config);

    let outcome = scrape_and_analyze(&source, completer.as_ref()).await?;
    let has_data = outcome.has_data();
    state.store_latest(has_data.then(|| outcome.table.clone()));

    Ok(RunResponse {
        status: if has_data { "success" } else { "empty" }.to_string(),
        has_data,
        row_count: outcome.table.len(),
        rows: outcome.table.into_rows(),
        analysis: outcome.analysis,
        finished_at: Utc::now(),
    })
}

async fn export_handler(State(state): State<AppState>) -> Result<Response> {
    let table = state
        .latest_table()
        .ok_or_else(|| AppError::NotFound("No scraped data to export".to_string()))?;
    let bytes = to_xlsx(&table)?;
    info!(rows = table.len(), "Serving spreadsheet export");

    let headers = [
        (header::CONTENT_TYPE, XLSX_MIME.to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", EXPORT_FILENAME)),
    ];
    Ok((headers, bytes).into_response())
}
