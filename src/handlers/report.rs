use axum::Json;
use axum::extract::{Path, State};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tokio::sync::oneshot;

use crate::admission::AdmissionDecision;
use crate::error::ApiError;
use crate::metrics::{ADMISSION_DENIED, REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{ReportJob, ReportRequest, ReportResponse, StatsResponse, StoredReport};
use crate::state::AppState;

const COMPANY_NAME_MIN: usize = 2;
const COMPANY_NAME_MAX: usize = 200;

fn validate(request: &ReportRequest) -> Result<(), ApiError> {
    let name_len = request.company_name.trim().chars().count();
    if name_len < COMPANY_NAME_MIN || name_len > COMPANY_NAME_MAX {
        return Err(ApiError::Invalid("company_name must be 2-200 characters"));
    }
    let email = request.email.trim();
    if email.len() < 3 || !email.contains('@') {
        return Err(ApiError::Invalid("a valid email is required"));
    }
    Ok(())
}

// post handler
pub async fn generate_report_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ReportRequest>,
) -> Result<Json<ReportResponse>, ApiError> {
    REQUEST_TOTAL.inc();
    validate(&payload)?;

    // Fast 429 before queueing. The worker re-checks under its serial
    // loop, which is where the decision is binding.
    if let AdmissionDecision::Denied(denial) = state.admission.check(&payload.email) {
        ADMISSION_DENIED.inc();
        return Err(ApiError::RateLimited(denial));
    }

    let started = Instant::now();
    let (reply_tx, reply_rx) = oneshot::channel();
    state
        .job_tx
        .send(ReportJob {
            request: payload,
            reply_tx,
        })
        .await
        .map_err(|_| ApiError::QueueClosed)?;

    // wait for the worker's reply
    let result = reply_rx.await.map_err(|_| ApiError::QueueClosed)?;

    REQUEST_LATENCY.observe(started.elapsed().as_secs_f64());
    result.map(Json)
}

pub async fn get_report_handler(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<String>,
) -> Result<Json<StoredReport>, ApiError> {
    state
        .reports
        .get(&report_id)
        .map(|report| Json(report.clone()))
        .ok_or(ApiError::NotFound)
}

pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        total_reports: state.report_counter.load(Ordering::Relaxed),
        cached_snapshots: state.research_cache.len(),
        tracked_requesters: state.admission.tracked_identities(),
    })
}
