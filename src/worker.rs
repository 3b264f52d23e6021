use std::sync::Arc;
use std::sync::atomic::Ordering;

use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::admission::AdmissionDecision;
use crate::error::ApiError;
use crate::llm::LlmClient;
use crate::metrics::{ADMISSION_DENIED, CACHE_HITS, CACHE_MISSES, CACHE_SIZE, UPSTREAM_ERRORS};
use crate::models::{MarketSnapshot, ReportJob, ReportRequest, ReportResponse, StoredReport};
use crate::prompts;
use crate::quotes::QuoteClient;
use crate::search::SearchClient;
use crate::state::AppState;

pub struct Upstreams {
    pub search: SearchClient,
    pub quotes: QuoteClient,
    pub llm: LlmClient,
}

// Report worker -> drains the queue one job at a time. A single consumer
// keeps each job's admission check-then-record free of interleaving, so
// two racing requests can never both land the last quota slot.
pub async fn report_worker(
    mut rx: mpsc::Receiver<ReportJob>,
    state: Arc<AppState>,
    upstreams: Upstreams,
) {
    info!("report worker started - processing jobs sequentially");

    while let Some(job) = rx.recv().await {
        let result = process_job(&state, &upstreams, &job.request).await;
        // The requester may have hung up; nothing to unwind if so.
        let _ = job.reply_tx.send(result);
    }
}

async fn process_job(
    state: &AppState,
    upstreams: &Upstreams,
    request: &ReportRequest,
) -> Result<ReportResponse, ApiError> {
    // The handler's pre-flight check is advisory; this one decides.
    let decision = state.admission.check(&request.email);
    if let AdmissionDecision::Denied(denial) = decision {
        ADMISSION_DENIED.inc();
        return Err(ApiError::RateLimited(denial));
    }

    let company = request.company_name.trim();
    let snapshot = match state.research_cache.get(company) {
        Some(snapshot) => {
            CACHE_HITS.inc();
            info!(company, "research cache hit");
            snapshot
        }
        None => {
            CACHE_MISSES.inc();
            info!(company, "research cache miss - fetching upstream");
            let snapshot = fetch_snapshot(upstreams, company).await;
            state.research_cache.put(company, snapshot.clone());
            CACHE_SIZE.set(state.research_cache.len() as f64);
            snapshot
        }
    };

    let digest = prompts::format_digest(company, &snapshot);
    let analysis = upstreams
        .llm
        .complete(
            prompts::ANALYST_SYSTEM,
            &prompts::build_analysis_prompt(company, &digest),
        )
        .await?;
    let report = upstreams
        .llm
        .complete(
            prompts::REPORT_SYSTEM,
            &prompts::build_report_prompt(company, &analysis, &digest),
        )
        .await?;

    // Quota is charged only now, once the upstream work actually happened.
    state.admission.record(&request.email);

    let report_number = state.report_counter.fetch_add(1, Ordering::Relaxed) + 1;
    let timestamp = chrono::Utc::now().to_rfc3339();
    let report_id = make_report_id(company, &request.email, &timestamp, report_number);

    state.reports.insert(
        report_id.clone(),
        StoredReport {
            company: company.to_string(),
            report: report.clone(),
            timestamp: timestamp.clone(),
            report_id: report_id.clone(),
            email: request.email.trim().to_string(),
            report_number,
        },
    );
    info!(company, report_id = %report_id, report_number, "report generated");

    Ok(ReportResponse {
        success: true,
        report,
        company_name: company.to_string(),
        timestamp,
        report_id,
        report_number,
    })
}

// Snapshot fetches never fail the job: dropped sources shrink the digest,
// a missing quote just leaves the field empty.
async fn fetch_snapshot(upstreams: &Upstreams, company: &str) -> MarketSnapshot {
    let hits = upstreams.search.gather(company).await;
    let quote = match upstreams.quotes.fetch(company).await {
        Ok(quote) => Some(quote),
        Err(err) => {
            UPSTREAM_ERRORS.inc();
            warn!("quote dropped from snapshot: {err}");
            None
        }
    };
    MarketSnapshot { hits, quote }
}

// Short report id (hash of company + email + time), unique enough for an
// in-memory store.
fn make_report_id(company: &str, email: &str, timestamp: &str, report_number: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(company);
    hasher.update(email);
    hasher.update(timestamp);
    hasher.update(report_number.to_be_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_ids_are_short_stable_hashes() {
        let id = make_report_id("Tesla Inc", "alice@example.com", "2026-08-06T00:00:00Z", 1);
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            id,
            make_report_id("Tesla Inc", "alice@example.com", "2026-08-06T00:00:00Z", 1)
        );
    }

    #[test]
    fn report_ids_differ_per_report() {
        let first = make_report_id("Tesla Inc", "alice@example.com", "2026-08-06T00:00:00Z", 1);
        let second = make_report_id("Tesla Inc", "alice@example.com", "2026-08-06T00:00:00Z", 2);
        assert_ne!(first, second);
    }
}
