use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("report_requests_total", "Total number of report requests").unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("report_cache_hits_total", "Research cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("report_cache_misses_total", "Research cache misses").unwrap();
    pub static ref ADMISSION_DENIED: Counter = register_counter!(
        "report_admission_denied_total",
        "Requests denied by the admission controller"
    )
    .unwrap();
    pub static ref UPSTREAM_ERRORS: Counter = register_counter!(
        "report_upstream_errors_total",
        "Failed upstream search/quote calls"
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "report_request_latency_seconds",
        "End-to-end report latency in seconds"
    )
    .unwrap();
    pub static ref CACHE_SIZE: Gauge = register_gauge!(
        "report_cache_size",
        "Current number of cached research snapshots"
    )
    .unwrap();
}
