use crate::models::MarketSnapshot;

// Per-hit content clip; anything longer adds noise, not signal.
const HIT_CONTENT_CHARS: usize = 400;
// The report prompt only restates the head of the digest for grounding.
const DIGEST_PREVIEW_CHARS: usize = 1000;

pub const ANALYST_SYSTEM: &str = "You are a financial analyst specializing in corporate risk \
assessment. Analyze the provided filings and market data and identify key business risks across \
these categories:
1. Financial risks (liquidity, debt, revenue concentration)
2. Operational risks (supply chain, technology, workforce)
3. Market risks (competition, market conditions, customer dependencies)
4. Regulatory/Legal risks (compliance, litigation, regulatory changes)
5. Strategic risks (business model, innovation, execution)

Provide a structured analysis with specific evidence from the filings.";

pub const REPORT_SYSTEM: &str = "You are a business consultant writing investor-grade company \
risk reports. Produce a markdown report with this structure:

# Company Risk Assessment: [Company Name]
- Report date, analysis coverage, overall risk rating (High/Moderate/Low with a score out of 10)
- Executive summary (3-4 sentences, key takeaway first)
- Top 5 material risks, each with: category, severity, specific evidence, likelihood, potential impact
- Scenario outlook (best/base/worst case with rough probabilities)
- Action plan: what to monitor over the next 30 days, each quarter, and annually
- Data sources
- A closing disclaimer that this is AI-generated and not financial advice

Write in plain English, be specific about numbers where the data supports them, and keep the \
report under 1000 words.";

// Render a snapshot as the text digest both prompts consume.
pub fn format_digest(company: &str, snapshot: &MarketSnapshot) -> String {
    let mut digest = String::new();

    if let Some(quote) = &snapshot.quote {
        digest.push_str(&format!(
            "Live quote: {} {:.2} {}",
            quote.symbol, quote.price, quote.currency
        ));
        if let Some(change) = quote.change_percent {
            digest.push_str(&format!(" ({change:+.2}% today)"));
        }
        digest.push_str("\n\n");
    }

    if snapshot.hits.is_empty() {
        digest.push_str(&format!(
            "No financial data found for '{company}'. The company may not be publicly traded, \
may file under a different legal name, or may be private without public filings."
        ));
        return digest;
    }

    let sources = {
        let mut seen: Vec<&str> = Vec::new();
        for hit in &snapshot.hits {
            if !seen.contains(&hit.source.as_str()) {
                seen.push(&hit.source);
            }
        }
        seen.len()
    };
    digest.push_str(&format!(
        "Found {} results from {} sources:\n\n",
        snapshot.hits.len(),
        sources
    ));

    let formatted: Vec<String> = snapshot
        .hits
        .iter()
        .enumerate()
        .map(|(idx, hit)| {
            format!(
                "[{}] {} ({})\nTitle: {}\nURL: {}\nContent: {}\n",
                idx + 1,
                hit.source,
                hit.region,
                hit.title,
                hit.url,
                clip(&hit.content, HIT_CONTENT_CHARS),
            )
        })
        .collect();
    digest.push_str(&formatted.join("---\n"));
    digest
}

pub fn build_analysis_prompt(company: &str, digest: &str) -> String {
    format!(
        "Company: {company}\n\nFiling information:\n{digest}\n\nAnalyze these filings and \
identify the top 5 most material risks for this company. For each risk, provide:\n\
- Risk category\n- Specific evidence from the filings\n- Potential impact (High/Medium/Low)\n\
- Brief explanation"
    )
}

pub fn build_report_prompt(company: &str, analysis: &str, digest: &str) -> String {
    format!(
        "Create the risk report for: {company}\n\nANALYSIS:\n{analysis}\n\nSOURCE DATA \
(excerpt):\n{}",
        clip(digest, DIGEST_PREVIEW_CHARS)
    )
}

// Char-boundary-safe truncation.
fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let clipped: String = text.chars().take(max_chars).collect();
    format!("{clipped}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Quote, SourceHit};

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            hits: vec![SourceHit {
                region: "USA".to_string(),
                source: "SEC EDGAR".to_string(),
                title: "Tesla 10-K".to_string(),
                url: "https://sec.gov/tesla-10k".to_string(),
                content: "Annual report".to_string(),
            }],
            quote: Some(Quote {
                symbol: "TSLA".to_string(),
                price: 412.5,
                currency: "USD".to_string(),
                change_percent: Some(-1.25),
            }),
        }
    }

    #[test]
    fn digest_leads_with_the_quote() {
        let digest = format_digest("Tesla Inc", &snapshot());
        assert!(digest.starts_with("Live quote: TSLA 412.50 USD (-1.25% today)"));
        assert!(digest.contains("[1] SEC EDGAR (USA)"));
        assert!(digest.contains("https://sec.gov/tesla-10k"));
    }

    #[test]
    fn empty_snapshot_explains_the_miss() {
        let empty = MarketSnapshot {
            hits: vec![],
            quote: None,
        };
        let digest = format_digest("Acme Corp", &empty);
        assert!(digest.contains("No financial data found for 'Acme Corp'"));
    }

    #[test]
    fn prompts_carry_company_and_digest() {
        let digest = format_digest("Tesla Inc", &snapshot());
        let analysis_prompt = build_analysis_prompt("Tesla Inc", &digest);
        assert!(analysis_prompt.contains("Company: Tesla Inc"));
        assert!(analysis_prompt.contains("Live quote"));

        let report_prompt = build_report_prompt("Tesla Inc", "analysis text", &digest);
        assert!(report_prompt.contains("ANALYSIS:\nanalysis text"));
    }

    #[test]
    fn long_content_is_clipped_on_char_boundaries() {
        let long = "é".repeat(500);
        let clipped = clip(&long, 400);
        assert!(clipped.ends_with("..."));
        assert_eq!(clipped.chars().count(), 403);
    }
}
