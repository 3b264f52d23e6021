use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::ApiError;

// Inbound report request
#[derive(Deserialize, Clone)]
pub struct ReportRequest {
    pub company_name: String,
    pub email: String,
}

// Finished report, as returned to the caller
#[derive(Serialize, Clone)]
pub struct ReportResponse {
    pub success: bool,
    pub report: String,
    pub company_name: String,
    pub timestamp: String,
    pub report_id: String,
    pub report_number: u64,
}

// One search hit that survived the per-source fold
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SourceHit {
    pub region: String,
    pub source: String,
    pub title: String,
    pub url: String,
    pub content: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub currency: String,
    pub change_percent: Option<f64>,
}

// What the research cache stores per company: search digest + live quote.
// The quote is optional; quote-provider failures leave partial snapshots.
#[derive(Clone)]
pub struct MarketSnapshot {
    pub hits: Vec<SourceHit>,
    pub quote: Option<Quote>,
}

// Queued job - holds the request + one-time reply channel
pub struct ReportJob {
    pub request: ReportRequest,
    pub reply_tx: oneshot::Sender<Result<ReportResponse, ApiError>>,
}

// Reports are kept in memory for later retrieval by id
#[derive(Serialize, Clone)]
pub struct StoredReport {
    pub company: String,
    pub report: String,
    pub timestamp: String,
    pub report_id: String,
    pub email: String,
    pub report_number: u64,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub total_reports_generated: u64,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub total_reports: u64,
    pub cached_snapshots: usize,
    pub tracked_requesters: usize,
}

// Read-only quota preview for one requester
#[derive(Serialize)]
pub struct QuotaResponse {
    pub email: String,
    pub allowed: bool,
    pub used: usize,
    pub limit: usize,
    pub remaining: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}
