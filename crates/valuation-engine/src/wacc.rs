use dashboard_core::{DashboardError, WaccBreakdown};

/// CAPM cost of equity: rf + beta * equity risk premium
pub fn cost_of_equity(risk_free: f64, beta: f64, equity_premium: f64) -> f64 {
    risk_free + beta * equity_premium
}

/// After-tax cost of debt from the interest expense run rate.
/// Zero or missing debt means zero cost of debt.
pub fn after_tax_cost_of_debt(interest_expense: f64, total_debt: f64, tax_rate: f64) -> f64 {
    if total_debt <= 0.0 || interest_expense <= 0.0 {
        return 0.0;
    }
    (interest_expense / total_debt) * (1.0 - tax_rate)
}

/// Blend equity and debt costs by market-value weights.
/// Weights sum to 1 for positive inputs.
pub fn wacc(
    market_cap: f64,
    total_debt: f64,
    cost_of_equity: f64,
    cost_of_debt_after_tax: f64,
) -> Result<WaccBreakdown, DashboardError> {
    if market_cap < 0.0 || total_debt < 0.0 {
        return Err(DashboardError::InvalidData(
            "Negative capital input".to_string(),
        ));
    }

    let total_capital = market_cap + total_debt;
    if total_capital <= 0.0 {
        return Err(DashboardError::Calculation(
            "Zero total capital".to_string(),
        ));
    }

    let equity_weight = market_cap / total_capital;
    let debt_weight = total_debt / total_capital;

    Ok(WaccBreakdown {
        cost_of_equity,
        cost_of_debt_after_tax,
        equity_weight,
        debt_weight,
        wacc: equity_weight * cost_of_equity + debt_weight * cost_of_debt_after_tax,
        assumed: Vec::new(),
    })
}
