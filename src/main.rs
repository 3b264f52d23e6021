mod admission;
mod cache;
mod config;
mod error;
mod handlers;
mod llm;
mod metrics;
mod models;
mod prompts;
mod quotes;
mod search;
mod state;
mod worker;

use axum::{
    Router,
    routing::{get, post},
};
use clap::Parser;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::admission::{AdmissionConfig, AdmissionController};
use crate::cache::TtlCache;
use crate::config::Args;
use crate::handlers::{
    generate_report_handler, get_report_handler, health_handler, metrics_handler, quota_handler,
    stats_handler,
};
use crate::llm::LlmClient;
use crate::models::ReportJob;
use crate::quotes::QuoteClient;
use crate::search::SearchClient;
use crate::state::AppState;
use crate::worker::{Upstreams, report_worker};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // parse cli arguments
    let args = Args::parse();

    let anthropic_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
    let tavily_key = std::env::var("TAVILY_API_KEY").unwrap_or_default();
    if anthropic_key.is_empty() {
        warn!("ANTHROPIC_API_KEY is not set; report generation will fail");
    }
    if tavily_key.is_empty() {
        warn!("TAVILY_API_KEY is not set; every search source will be dropped");
    }

    let http = reqwest::Client::new();
    let (job_tx, job_rx) = mpsc::channel::<ReportJob>(100);

    // creating shared state
    let state = Arc::new(AppState {
        admission: AdmissionController::new(AdmissionConfig {
            global_cap: args.global_cap,
            per_identity_cap: args.user_cap,
            window: Duration::from_secs(args.window_minutes * 60),
        }),
        research_cache: TtlCache::new(Duration::from_secs(args.cache_ttl_minutes * 60)),
        reports: DashMap::new(),
        report_counter: AtomicU64::new(0),
        job_tx,
    });

    let upstreams = Upstreams {
        search: SearchClient::new(http.clone(), args.search_url.clone(), tavily_key),
        quotes: QuoteClient::new(http.clone(), args.quote_url.clone()),
        llm: LlmClient::new(
            http,
            args.llm_url.clone(),
            anthropic_key,
            args.llm_model.clone(),
        ),
    };

    // spawn the report worker
    tokio::spawn(report_worker(job_rx, state.clone(), upstreams));

    // creating the router with routes
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/generate-report", post(generate_report_handler))
        .route("/api/report/{report_id}", get(get_report_handler))
        .route("/api/quota/{email}", get(quota_handler))
        .route("/api/stats", get(stats_handler))
        .route("/metrics", get(metrics_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");

    info!("gateway running on http://localhost:{}", args.port);
    info!(
        "admission: {} reports per {} minutes per requester, {} per minute globally",
        args.user_cap, args.window_minutes, args.global_cap
    );
    info!("research cache TTL: {} minutes", args.cache_ttl_minutes);
    info!("llm model: {} via {}", args.llm_model, args.llm_url);

    axum::serve(listener, app).await.expect("server error");
}
