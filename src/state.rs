use dashmap::DashMap;
use std::sync::atomic::AtomicU64;
use tokio::sync::mpsc;

use crate::admission::AdmissionController;
use crate::cache::TtlCache;
use crate::models::{MarketSnapshot, ReportJob, StoredReport};

// app's shared state
pub struct AppState {
    pub admission: AdmissionController,
    pub research_cache: TtlCache<MarketSnapshot>,
    pub reports: DashMap<String, StoredReport>, // report id -> stored report
    pub report_counter: AtomicU64,
    pub job_tx: mpsc::Sender<ReportJob>,
}
