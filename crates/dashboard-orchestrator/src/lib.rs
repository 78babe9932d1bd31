use chrono::{DateTime, Duration, Utc};
use dashboard_core::{
    Bar, DashboardError, ForecastSeries, Fundamentals, MarketDataSource, QuoteSnapshot,
    TickerDashboard, ValuationReport, WatchlistEntry,
};
use dashmap::DashMap;
use forecast_engine::ForecastEngine;
use rayon::prelude::*;
use reference_pages::ReferencePages;
use std::collections::HashMap;
use std::sync::Arc;
use valuation_engine::ValuationEngine;

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

const DEFAULT_CACHE_TTL_SECS: i64 = 300; // 5 minutes
const HISTORY_DAYS: u32 = 365;
const FORECAST_HORIZON: usize = 30;

/// Session facade: one instance per server process. Caches exist purely to
/// avoid redundant network calls within a session; everything is
/// recomputed from fresh data once an entry expires.
pub struct DashboardOrchestrator {
    source: Arc<dyn MarketDataSource>,
    reference: ReferencePages,
    valuation: ValuationEngine,
    forecaster: ForecastEngine,
    cache_ttl: Duration,
    history_cache: DashMap<String, CacheEntry<Vec<Bar>>>,
    quote_cache: DashMap<String, CacheEntry<QuoteSnapshot>>,
    fundamentals_cache: DashMap<String, CacheEntry<Fundamentals>>,
    tax_cache: DashMap<String, CacheEntry<f64>>,
    watchlist_cache: DashMap<String, CacheEntry<Vec<WatchlistEntry>>>,
}

impl DashboardOrchestrator {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        let ttl_secs: i64 = std::env::var("MARKETDASH_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);

        Self {
            source,
            reference: ReferencePages::new(),
            valuation: ValuationEngine::new(),
            forecaster: ForecastEngine::new(),
            cache_ttl: Duration::seconds(ttl_secs),
            history_cache: DashMap::new(),
            quote_cache: DashMap::new(),
            fundamentals_cache: DashMap::new(),
            tax_cache: DashMap::new(),
            watchlist_cache: DashMap::new(),
        }
    }

    fn cache_get<T: Clone>(&self, cache: &DashMap<String, CacheEntry<T>>, key: &str) -> Option<T> {
        let entry = cache.get(key)?;
        if Utc::now() - entry.cached_at < self.cache_ttl {
            Some(entry.data.clone())
        } else {
            drop(entry);
            cache.remove(key);
            None
        }
    }

    fn cache_put<T>(&self, cache: &DashMap<String, CacheEntry<T>>, key: String, data: T) {
        cache.insert(
            key,
            CacheEntry {
                data,
                cached_at: Utc::now(),
            },
        );
    }

    pub async fn history(&self, symbol: &str, days: u32) -> Result<Vec<Bar>, DashboardError> {
        let key = format!("{symbol}:{days}");
        if let Some(bars) = self.cache_get(&self.history_cache, &key) {
            return Ok(bars);
        }
        let bars = self.source.history(symbol, days).await?;
        self.cache_put(&self.history_cache, key, bars.clone());
        Ok(bars)
    }

    pub async fn quote(&self, symbol: &str) -> Result<QuoteSnapshot, DashboardError> {
        if let Some(quote) = self.cache_get(&self.quote_cache, symbol) {
            return Ok(quote);
        }
        let quote = self.source.quote(symbol).await?;
        self.cache_put(&self.quote_cache, symbol.to_string(), quote.clone());
        Ok(quote)
    }

    pub async fn fundamentals(&self, symbol: &str) -> Result<Fundamentals, DashboardError> {
        if let Some(f) = self.cache_get(&self.fundamentals_cache, symbol) {
            return Ok(f);
        }
        let f = self.source.fundamentals(symbol).await?;
        self.cache_put(&self.fundamentals_cache, symbol.to_string(), f.clone());
        Ok(f)
    }

    pub async fn watchlist(&self, slug: &str) -> Result<Vec<WatchlistEntry>, DashboardError> {
        if let Some(entries) = self.cache_get(&self.watchlist_cache, slug) {
            return Ok(entries);
        }
        let entries = self.reference.fetch_watchlist(slug).await?;
        self.cache_put(&self.watchlist_cache, slug.to_string(), entries.clone());
        Ok(entries)
    }

    /// Country tax rate from the reference page, fetched at most once per
    /// TTL window. Never fails: the scraper substitutes its default.
    async fn tax_rate(&self, country: &str) -> f64 {
        if let Some(rate) = self.cache_get(&self.tax_cache, country) {
            return rate;
        }
        let rate = self.reference.fetch_corporate_tax_rate(country).await;
        self.cache_put(&self.tax_cache, country.to_string(), rate);
        rate
    }

    /// Indicator section for one ticker.
    pub async fn indicators(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<dashboard_core::IndicatorSummary, DashboardError> {
        let bars = self.history(symbol, days).await?;
        technical_indicators::summarize(symbol, &bars)
    }

    /// Valuation section for one ticker.
    pub async fn valuation(&self, symbol: &str) -> Result<ValuationReport, DashboardError> {
        let quote = self.quote(symbol).await?;
        let fundamentals = self.fundamentals(symbol).await?;

        // Only hit the scraped table when the provider had no effective rate
        let scraped_tax = if fundamentals.effective_tax_rate.is_none() {
            Some(self.tax_rate("United States").await)
        } else {
            None
        };

        self.valuation
            .evaluate(symbol, &quote, &fundamentals, scraped_tax, None, None)
    }

    /// Forecast section for one ticker.
    pub async fn forecast(
        &self,
        symbol: &str,
        horizon: usize,
    ) -> Result<ForecastSeries, DashboardError> {
        let bars = self.history(symbol, HISTORY_DAYS).await?;
        self.forecaster.forecast_prices(symbol, &bars, horizon)
    }

    /// Assemble the full dashboard for one ticker. Sections degrade
    /// independently: a failed section is `None` and its error string is
    /// recorded, page-level catch style.
    pub async fn dashboard(&self, symbol: &str) -> TickerDashboard {
        let mut errors = Vec::new();

        let quote = match self.quote(symbol).await {
            Ok(q) => Some(q),
            Err(e) => {
                errors.push(format!("quote: {e}"));
                None
            }
        };

        let bars = match self.history(symbol, HISTORY_DAYS).await {
            Ok(b) => Some(b),
            Err(e) => {
                errors.push(format!("history: {e}"));
                None
            }
        };

        let indicators = bars.as_deref().and_then(|b| {
            match technical_indicators::summarize(symbol, b) {
                Ok(s) => Some(s),
                Err(e) => {
                    errors.push(format!("indicators: {e}"));
                    None
                }
            }
        });

        let valuation = match self.valuation(symbol).await {
            Ok(v) => Some(v),
            Err(e) => {
                errors.push(format!("valuation: {e}"));
                None
            }
        };

        let forecast = bars.as_deref().and_then(|b| {
            match self.forecaster.forecast_prices(symbol, b, FORECAST_HORIZON) {
                Ok(f) => Some(f),
                Err(e) => {
                    errors.push(format!("forecast: {e}"));
                    None
                }
            }
        });

        TickerDashboard {
            symbol: symbol.to_string(),
            timestamp: Utc::now(),
            quote,
            indicators,
            valuation,
            forecast,
            errors,
        }
    }

    /// Fan independent per-series fits across the rayon pool. No ordering
    /// guarantee between fits and no cancellation; failed fits are dropped
    /// from the result map.
    pub async fn forecast_many(
        &self,
        symbols: &[String],
        horizon: usize,
    ) -> HashMap<String, ForecastSeries> {
        let mut histories: Vec<(String, Vec<Bar>)> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            match self.history(symbol, HISTORY_DAYS).await {
                Ok(bars) => histories.push((symbol.clone(), bars)),
                Err(e) => tracing::warn!("forecast_many: skipping {symbol}: {e}"),
            }
        }

        let results = tokio::task::spawn_blocking(move || {
            let engine = ForecastEngine::new();
            histories
                .par_iter()
                .filter_map(|(symbol, bars)| {
                    match engine.forecast_prices(symbol, bars, horizon) {
                        Ok(series) => Some((symbol.clone(), series)),
                        Err(e) => {
                            tracing::warn!("forecast_many: fit failed for {symbol}: {e}");
                            None
                        }
                    }
                })
                .collect::<HashMap<_, _>>()
        })
        .await;

        results.unwrap_or_default()
    }
}
