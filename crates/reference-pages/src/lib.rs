//! Scrapers for the two reference pages the dashboard leans on: a
//! corporate tax-rate table and a trading-community watch-list. Both use
//! fixed-position selectors that track the current upstream markup and
//! will break when it changes; the tax-rate path degrades to a documented
//! default instead of failing the valuation.

use dashboard_core::{DashboardError, WatchlistEntry};
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;

/// Fallback when the tax table cannot be read (US statutory rate)
pub const DEFAULT_TAX_RATE: f64 = 0.21;

const DEFAULT_TAX_URL: &str = "https://tradingeconomics.com/country-list/corporate-tax-rate";
const DEFAULT_WATCHLIST_BASE: &str = "https://stocktwits.com/watchlists/public";

pub struct ReferencePages {
    client: Client,
    tax_url: String,
    watchlist_base: String,
}

impl ReferencePages {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent("Mozilla/5.0 (compatible; marketdash/0.1)")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            tax_url: std::env::var("TAX_PAGE_URL").unwrap_or_else(|_| DEFAULT_TAX_URL.to_string()),
            watchlist_base: std::env::var("WATCHLIST_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_WATCHLIST_BASE.to_string()),
        }
    }

    /// Corporate tax rate for `country` as a fraction in [0, 1].
    /// Any miss (network, markup change, unknown country) substitutes the
    /// default rate and logs the substitution.
    pub async fn fetch_corporate_tax_rate(&self, country: &str) -> f64 {
        match self.try_fetch_tax_rate(country).await {
            Ok(rate) => rate,
            Err(e) => {
                tracing::warn!(
                    "Tax rate lookup for {country} failed ({e}), substituting default {DEFAULT_TAX_RATE}"
                );
                DEFAULT_TAX_RATE
            }
        }
    }

    async fn try_fetch_tax_rate(&self, country: &str) -> Result<f64, DashboardError> {
        let response = self
            .client
            .get(&self.tax_url)
            .send()
            .await
            .map_err(|e| DashboardError::Scrape(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DashboardError::Scrape(format!(
                "Tax page HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DashboardError::Scrape(e.to_string()))?;

        parse_tax_rate(&body, country).ok_or_else(|| {
            DashboardError::Scrape(format!("No tax-rate row matched {country}"))
        })
    }

    /// Symbols on a public community watch-list page.
    pub async fn fetch_watchlist(&self, slug: &str) -> Result<Vec<WatchlistEntry>, DashboardError> {
        let url = format!("{}/{}", self.watchlist_base, slug);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DashboardError::Scrape(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DashboardError::Scrape(format!(
                "Watch-list page HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DashboardError::Scrape(e.to_string()))?;

        let entries = parse_watchlist(&body)?;
        if entries.is_empty() {
            return Err(DashboardError::Scrape(format!(
                "No watch-list rows matched on {slug} (markup change?)"
            )));
        }
        Ok(entries)
    }
}

impl Default for ReferencePages {
    fn default() -> Self {
        Self::new()
    }
}

/// First table row whose first cell matches `country` (case-insensitive);
/// second cell is the rate in percent. Rates above 1 are treated as
/// percentages and divided down.
pub fn parse_tax_rate(html: &str, country: &str) -> Option<f64> {
    let document = Html::parse_document(html);
    let row_sel = Selector::parse("table tr").ok()?;
    let cell_sel = Selector::parse("td").ok()?;

    for row in document.select(&row_sel) {
        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|c| c.text().collect::<String>().trim().to_string())
            .collect();

        if cells.len() < 2 {
            continue;
        }
        if !cells[0].eq_ignore_ascii_case(country) {
            continue;
        }

        let raw: f64 = cells[1].trim_end_matches('%').trim().parse().ok()?;
        let rate = if raw > 1.0 { raw / 100.0 } else { raw };
        return (0.0..=1.0).contains(&rate).then_some(rate);
    }

    None
}

/// Watch-list rows: each `tr` holds the symbol link in the first cell and
/// an optional note in the second.
pub fn parse_watchlist(html: &str) -> Result<Vec<WatchlistEntry>, DashboardError> {
    let document = Html::parse_document(html);
    let row_sel = Selector::parse("table.watchlist tr, table#watchlist tr")
        .map_err(|e| DashboardError::Scrape(e.to_string()))?;
    let symbol_sel =
        Selector::parse("td a").map_err(|e| DashboardError::Scrape(e.to_string()))?;
    let cell_sel = Selector::parse("td").map_err(|e| DashboardError::Scrape(e.to_string()))?;

    let mut entries = Vec::new();
    for row in document.select(&row_sel) {
        let Some(link) = row.select(&symbol_sel).next() else {
            continue;
        };
        let symbol = link.text().collect::<String>().trim().to_uppercase();
        if symbol.is_empty() || symbol.len() > 6 || !symbol.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
            continue;
        }

        let note = row
            .select(&cell_sel)
            .nth(1)
            .map(|c| c.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty());

        entries.push(WatchlistEntry { symbol, note });
    }

    Ok(entries)
}
