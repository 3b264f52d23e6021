use clap::Parser;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "report-gateway")]
#[command(about = "Rate-limited, caching API for AI company risk reports")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Global cap on admitted reports per minute, all requesters combined
    #[arg(long, default_value_t = 10)]
    pub global_cap: usize,

    // Per-requester cap on admitted reports per window
    #[arg(long, default_value_t = 5)]
    pub user_cap: usize,

    // Rolling window for the per-requester cap, in minutes
    #[arg(long, default_value_t = 60)]
    pub window_minutes: u64,

    // Research cache TTL in minutes
    #[arg(long, default_value_t = 5)]
    pub cache_ttl_minutes: u64,

    // Tavily-compatible search API base URL
    #[arg(long, default_value = "https://api.tavily.com")]
    pub search_url: String,

    // Quote API base URL
    #[arg(long, default_value = "https://query1.finance.yahoo.com")]
    pub quote_url: String,

    // Anthropic-compatible messages API base URL
    #[arg(long, default_value = "https://api.anthropic.com")]
    pub llm_url: String,

    // Model used for risk analysis and report generation
    #[arg(long, default_value = "claude-sonnet-4-20250514")]
    pub llm_model: String,
}
