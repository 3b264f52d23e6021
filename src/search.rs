use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::error::FetchError;
use crate::metrics::UPSTREAM_ERRORS;
use crate::models::SourceHit;

// The digest fed to the analyst prompt is capped; beyond this the extra
// hits only dilute the context.
const MAX_DIGEST_HITS: usize = 20;

// Site-scoped query against one financial platform
struct SourceQuery {
    region: &'static str,
    source: &'static str,
    query: String,
    max_results: u32,
}

fn source_queries(company: &str) -> Vec<SourceQuery> {
    vec![
        SourceQuery {
            region: "India",
            source: "Moneycontrol",
            query: format!("{company} quarterly results site:moneycontrol.com"),
            max_results: 2,
        },
        SourceQuery {
            region: "India",
            source: "Screener.in",
            query: format!("{company} financial ratios site:screener.in"),
            max_results: 2,
        },
        SourceQuery {
            region: "India",
            source: "BSE/NSE",
            query: format!("{company} announcements site:bseindia.com OR site:nseindia.com"),
            max_results: 2,
        },
        SourceQuery {
            region: "USA",
            source: "Yahoo Finance",
            query: format!("{company} earnings site:finance.yahoo.com"),
            max_results: 2,
        },
        SourceQuery {
            region: "USA",
            source: "MarketWatch",
            query: format!("{company} financial results site:marketwatch.com"),
            max_results: 2,
        },
        SourceQuery {
            region: "USA",
            source: "SEC EDGAR",
            query: format!("{company} 10-K annual report site:sec.gov"),
            max_results: 2,
        },
        SourceQuery {
            region: "Global",
            source: "General Search",
            query: format!("\"{company}\" annual report OR regulatory filing"),
            max_results: 3,
        },
    ]
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RawHit>,
}

#[derive(Deserialize)]
struct RawHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

pub struct SearchClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SearchClient {
    pub fn new(http: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }

    // Run the full query battery for a company. Each source resolves to its
    // own Result; failed sources are folded away so partial digests still
    // reach the analyst.
    pub async fn gather(&self, company: &str) -> Vec<SourceHit> {
        let mut outcomes = Vec::new();
        for query in source_queries(company) {
            outcomes.push(self.search_one(&query).await);
        }
        fold_outcomes(outcomes)
    }

    async fn search_one(&self, query: &SourceQuery) -> Result<Vec<SourceHit>, FetchError> {
        let resp = self
            .http
            .post(format!("{}/search", self.base_url))
            .json(&json!({
                "api_key": self.api_key,
                "query": query.query,
                "max_results": query.max_results,
            }))
            .send()
            .await
            .map_err(|err| FetchError::Http {
                provider: query.source,
                err,
            })?;
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                provider: query.source,
                status: resp.status().as_u16(),
            });
        }
        let body: SearchResponse = resp.json().await.map_err(|err| FetchError::Payload {
            provider: query.source,
            err,
        })?;

        Ok(body
            .results
            .into_iter()
            .map(|hit| SourceHit {
                region: query.region.to_string(),
                source: query.source.to_string(),
                title: hit.title,
                url: hit.url,
                content: hit.content,
            })
            .collect())
    }
}

// Keep successes, drop failures, dedup by URL, cap the digest.
fn fold_outcomes(outcomes: Vec<Result<Vec<SourceHit>, FetchError>>) -> Vec<SourceHit> {
    let mut hits: Vec<SourceHit> = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(batch) => {
                for hit in batch {
                    if !hits.iter().any(|seen| seen.url == hit.url) {
                        hits.push(hit);
                    }
                }
            }
            Err(err) => {
                UPSTREAM_ERRORS.inc();
                warn!("search source dropped: {err}");
            }
        }
    }
    hits.truncate(MAX_DIGEST_HITS);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(source: &str, url: &str) -> SourceHit {
        SourceHit {
            region: "USA".to_string(),
            source: source.to_string(),
            title: format!("{source} result"),
            url: url.to_string(),
            content: "filing text".to_string(),
        }
    }

    fn source_error() -> FetchError {
        FetchError::Status {
            provider: "Yahoo Finance",
            status: 503,
        }
    }

    #[test]
    fn failed_sources_are_omitted_from_the_digest() {
        let hits = fold_outcomes(vec![
            Ok(vec![hit("SEC EDGAR", "https://sec.gov/a")]),
            Err(source_error()),
            Ok(vec![hit("MarketWatch", "https://marketwatch.com/b")]),
        ]);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source, "SEC EDGAR");
        assert_eq!(hits[1].source, "MarketWatch");
    }

    #[test]
    fn duplicate_urls_are_kept_once() {
        let hits = fold_outcomes(vec![
            Ok(vec![hit("SEC EDGAR", "https://sec.gov/a")]),
            Ok(vec![hit("General Search", "https://sec.gov/a")]),
        ]);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, "SEC EDGAR");
    }

    #[test]
    fn digest_is_capped() {
        let batch: Vec<SourceHit> = (0..30)
            .map(|i| hit("General Search", &format!("https://example.com/{i}")))
            .collect();

        assert_eq!(fold_outcomes(vec![Ok(batch)]).len(), MAX_DIGEST_HITS);
    }

    #[test]
    fn all_sources_failing_yields_an_empty_digest() {
        let hits = fold_outcomes(vec![Err(source_error()), Err(source_error())]);
        assert!(hits.is_empty());
    }

    #[test]
    fn query_battery_names_the_company() {
        let queries = source_queries("Tesla Inc");
        assert!(queries.iter().all(|q| q.query.contains("Tesla Inc")));
    }
}
