use serde::Deserialize;

use crate::error::FetchError;
use crate::models::Quote;

// Known-name lookups cover the companies people actually type; anything
// else falls back to treating the first word as a symbol.
const KNOWN_TICKERS: &[(&str, &str)] = &[
    ("tesla", "TSLA"),
    ("apple", "AAPL"),
    ("microsoft", "MSFT"),
    ("alphabet", "GOOGL"),
    ("google", "GOOGL"),
    ("amazon", "AMZN"),
    ("meta", "META"),
    ("nvidia", "NVDA"),
    ("netflix", "NFLX"),
    ("reliance", "RELIANCE.NS"),
    ("infosys", "INFY"),
    ("tata motors", "TTM"),
    ("hdfc bank", "HDB"),
];

pub fn guess_ticker(company: &str) -> String {
    let folded = company.trim().to_lowercase();
    for (name, symbol) in KNOWN_TICKERS {
        if folded.contains(name) {
            return (*symbol).to_string();
        }
    }
    folded
        .split_whitespace()
        .next()
        .unwrap_or(&folded)
        .to_uppercase()
}

#[derive(Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Deserialize)]
struct ChartMeta {
    #[serde(default)]
    symbol: String,
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(rename = "chartPreviousClose")]
    chart_previous_close: Option<f64>,
}

pub struct QuoteClient {
    http: reqwest::Client,
    base_url: String,
}

impl QuoteClient {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    pub async fn fetch(&self, company: &str) -> Result<Quote, FetchError> {
        let symbol = guess_ticker(company);
        let url = format!(
            "{}/v8/finance/chart/{symbol}?range=1d&interval=1d",
            self.base_url
        );
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| FetchError::Http {
                provider: "quotes",
                err,
            })?;
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                provider: "quotes",
                status: resp.status().as_u16(),
            });
        }
        let body: ChartResponse = resp.json().await.map_err(|err| FetchError::Payload {
            provider: "quotes",
            err,
        })?;

        let meta = body
            .chart
            .result
            .and_then(|mut results| results.pop())
            .map(|result| result.meta);
        let Some(meta) = meta else {
            return Err(FetchError::Status {
                provider: "quotes",
                status: 404,
            });
        };
        let Some(price) = meta.regular_market_price else {
            return Err(FetchError::Status {
                provider: "quotes",
                status: 404,
            });
        };

        let change_percent = meta
            .chart_previous_close
            .filter(|prev| *prev > 0.0)
            .map(|prev| (price - prev) / prev * 100.0);

        Ok(Quote {
            symbol: if meta.symbol.is_empty() { symbol } else { meta.symbol },
            price,
            currency: meta.currency.unwrap_or_else(|| "USD".to_string()),
            change_percent,
        })
    }
}
