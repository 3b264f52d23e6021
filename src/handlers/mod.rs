mod health;
mod metrics;
mod quota;
mod report;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use quota::quota_handler;
pub use report::{generate_report_handler, get_report_handler, stats_handler};
