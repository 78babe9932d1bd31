pub mod dcf;
pub mod wacc;

pub use dcf::*;
pub use wacc::*;

use dashboard_core::{
    AssumedDefault, DashboardError, FairValueVerdict, Fundamentals, QuoteSnapshot, ValuationReport,
};

/// Hard-coded fallbacks for missing upstream fields. Every use is recorded
/// in the result's `assumed` list and logged.
pub const DEFAULT_TAX_RATE: f64 = 0.21;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.045;
pub const DEFAULT_EQUITY_RISK_PREMIUM: f64 = 0.055;
pub const DEFAULT_BETA: f64 = 1.0;
pub const DEFAULT_GROWTH_RATE: f64 = 0.05;
pub const DEFAULT_TERMINAL_GROWTH: f64 = 0.025;
pub const PROJECTION_YEARS: usize = 5;

pub struct ValuationEngine;

impl ValuationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Full WACC + DCF valuation for one ticker.
    ///
    /// `scraped_tax_rate` is the country rate from the reference page, used
    /// when the provider's effective rate is absent. `risk_free` and
    /// `growth_rate` are optional user overrides.
    pub fn evaluate(
        &self,
        symbol: &str,
        quote: &QuoteSnapshot,
        fundamentals: &Fundamentals,
        scraped_tax_rate: Option<f64>,
        risk_free: Option<f64>,
        growth_rate: Option<f64>,
    ) -> Result<ValuationReport, DashboardError> {
        if quote.price <= 0.0 {
            return Err(DashboardError::InvalidData(format!(
                "Non-positive price for {symbol}"
            )));
        }

        let shares = fundamentals
            .shares_outstanding
            .or(quote.shares_outstanding)
            .filter(|s| *s > 0.0)
            .ok_or_else(|| {
                DashboardError::InsufficientData(format!("No shares outstanding for {symbol}"))
            })?;

        let base_fcf = fundamentals.free_cash_flow.filter(|f| *f > 0.0).ok_or_else(|| {
            DashboardError::InsufficientData(format!("No positive free cash flow for {symbol}"))
        })?;

        let mut assumed = Vec::new();

        let tax_rate = fundamentals
            .effective_tax_rate
            .filter(|t| (0.0..=1.0).contains(t))
            .or_else(|| scraped_tax_rate.filter(|t| (0.0..=1.0).contains(t)))
            .unwrap_or_else(|| {
                record_default(&mut assumed, "tax_rate", DEFAULT_TAX_RATE);
                DEFAULT_TAX_RATE
            });

        let beta = fundamentals.beta.filter(|b| b.is_finite()).unwrap_or_else(|| {
            record_default(&mut assumed, "beta", DEFAULT_BETA);
            DEFAULT_BETA
        });

        let rf = risk_free.unwrap_or_else(|| {
            record_default(&mut assumed, "risk_free_rate", DEFAULT_RISK_FREE_RATE);
            DEFAULT_RISK_FREE_RATE
        });

        let growth = growth_rate
            .map(|g| g.clamp(-0.05, 0.25))
            .unwrap_or_else(|| {
                record_default(&mut assumed, "growth_rate", DEFAULT_GROWTH_RATE);
                DEFAULT_GROWTH_RATE
            });

        let total_debt = fundamentals.total_debt.unwrap_or_else(|| {
            record_default(&mut assumed, "total_debt", 0.0);
            0.0
        });
        let cash = fundamentals.total_cash.unwrap_or_else(|| {
            record_default(&mut assumed, "total_cash", 0.0);
            0.0
        });

        let market_cap = quote.market_cap.unwrap_or(quote.price * shares);

        let coe = cost_of_equity(rf, beta, DEFAULT_EQUITY_RISK_PREMIUM);
        let cod = after_tax_cost_of_debt(
            fundamentals.interest_expense.unwrap_or(0.0),
            total_debt,
            tax_rate,
        );

        let mut wacc = wacc(market_cap, total_debt, coe, cod)?;
        wacc.assumed = assumed.clone();

        let params = DcfParams {
            growth_rates: vec![growth; PROJECTION_YEARS],
            discount_rate: wacc.wacc,
            terminal_growth: DEFAULT_TERMINAL_GROWTH,
            mid_year: true,
        };

        let mut dcf = dcf_valuation(base_fcf, cash, total_debt, shares, &params)?;
        dcf.assumed = assumed;

        let verdict = FairValueVerdict::classify(quote.price, dcf.fair_value_per_share);

        Ok(ValuationReport {
            symbol: symbol.to_string(),
            price: quote.price,
            wacc,
            dcf,
            verdict,
        })
    }
}

impl Default for ValuationEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn record_default(assumed: &mut Vec<AssumedDefault>, name: &str, value: f64) {
    tracing::warn!("Missing {name}, substituting default {value}");
    assumed.push(AssumedDefault {
        name: name.to_string(),
        value,
    });
}
