use dashboard_core::DashboardError;
use nalgebra::{DMatrix, DVector};
use std::fmt;

/// ARIMA model order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// ARIMA(p,d,q) fitted by Hannan-Rissanen conditional least squares:
/// MA terms are regressed against residuals of a long autoregression.
pub struct ArimaModel {
    pub order: ArimaOrder,
    pub sigma2: f64,
    pub aic: f64,
    intercept: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    /// tails[k] = last observed value of the k-times differenced series
    tails: Vec<f64>,
    /// last p values of the d-differenced series, newest last
    w_tail: Vec<f64>,
    /// last q in-sample residuals, newest last
    resid_tail: Vec<f64>,
}

impl ArimaModel {
    pub fn fit(series: &[f64], order: ArimaOrder) -> Result<Self, DashboardError> {
        let ArimaOrder { p, d, q } = order;
        let min_len = d + p.max(q) + 8;
        if series.len() < min_len {
            return Err(DashboardError::InsufficientData(format!(
                "Need at least {min_len} observations for {order}, got {}",
                series.len()
            )));
        }

        let w = difference(series, d);
        let n = w.len();

        // Residual proxies from a long AR, for the MA regressors
        let long_order = (p + q + 2).min(n / 2);
        let residual_proxy = if q > 0 {
            ar_residuals(&w, long_order)?
        } else {
            vec![0.0; n]
        };

        let start = p.max(q).max(if q > 0 { long_order } else { 0 });
        let rows = n - start;
        let cols = 1 + p + q;
        if rows <= cols {
            return Err(DashboardError::InsufficientData(format!(
                "Too few rows ({rows}) for {cols} coefficients in {order}"
            )));
        }

        let mut x = DMatrix::zeros(rows, cols);
        let mut y = DVector::zeros(rows);
        for (row, t) in (start..n).enumerate() {
            y[row] = w[t];
            x[(row, 0)] = 1.0;
            for i in 0..p {
                x[(row, 1 + i)] = w[t - 1 - i];
            }
            for j in 0..q {
                x[(row, 1 + p + j)] = residual_proxy[t - 1 - j];
            }
        }

        let beta = ols(x, &y)?;
        let intercept = beta[0];
        let ar: Vec<f64> = (0..p).map(|i| beta[1 + i]).collect();
        let ma: Vec<f64> = (0..q).map(|j| beta[1 + p + j]).collect();

        // In-sample residuals of the full model
        let mut residuals = vec![0.0; n];
        let mut sse = 0.0;
        for t in start..n {
            let mut fitted = intercept;
            for (i, phi) in ar.iter().enumerate() {
                fitted += phi * w[t - 1 - i];
            }
            for (j, theta) in ma.iter().enumerate() {
                fitted += theta * residuals[t - 1 - j];
            }
            residuals[t] = w[t] - fitted;
            sse += residuals[t] * residuals[t];
        }

        let n_eff = rows as f64;
        let sigma2 = sse / n_eff;
        let aic = n_eff * sigma2.max(1e-12).ln() + 2.0 * (p + q + 1) as f64;

        let mut tails = Vec::with_capacity(d);
        let mut level = series.to_vec();
        for _ in 0..d {
            let last = *level.last().ok_or_else(|| {
                DashboardError::Calculation("Differencing emptied the series".to_string())
            })?;
            tails.push(last);
            level = difference(&level, 1);
        }

        Ok(Self {
            order,
            sigma2,
            aic,
            intercept,
            ar,
            ma,
            tails,
            w_tail: w[n - p..].to_vec(),
            resid_tail: residuals[n - q..].to_vec(),
        })
    }

    /// Recursive point forecasts, un-differenced back to levels.
    /// Output length always equals `horizon`.
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let mut w_hist = self.w_tail.clone();
        let mut e_hist = self.resid_tail.clone();
        let mut tails = self.tails.clone();
        let mut out = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let mut val = self.intercept;
            for (i, phi) in self.ar.iter().enumerate() {
                val += phi * w_hist[w_hist.len() - 1 - i];
            }
            for (j, theta) in self.ma.iter().enumerate() {
                // Future shocks have expectation zero
                if j < e_hist.len() {
                    val += theta * e_hist[e_hist.len() - 1 - j];
                }
            }
            w_hist.push(val);
            e_hist.push(0.0);

            let mut level = val;
            for k in (0..tails.len()).rev() {
                level += tails[k];
                tails[k] = level;
            }
            out.push(level);
        }

        out
    }
}

/// Grid-search (p,d,q) up to the given maxima, minimizing AIC.
pub fn select_order(
    series: &[f64],
    max_p: usize,
    max_d: usize,
    max_q: usize,
) -> Result<ArimaModel, DashboardError> {
    let mut best: Option<ArimaModel> = None;

    for d in 0..=max_d {
        for p in 0..=max_p {
            for q in 0..=max_q {
                let order = ArimaOrder { p, d, q };
                let model = match ArimaModel::fit(series, order) {
                    Ok(m) => m,
                    Err(_) => continue,
                };
                if !model.aic.is_finite() {
                    continue;
                }
                let better = best.as_ref().map_or(true, |b| model.aic < b.aic);
                if better {
                    best = Some(model);
                }
            }
        }
    }

    best.ok_or_else(|| {
        DashboardError::InsufficientData("No ARIMA order could be fitted".to_string())
    })
}

fn difference(series: &[f64], times: usize) -> Vec<f64> {
    let mut out = series.to_vec();
    for _ in 0..times {
        out = out.windows(2).map(|w| w[1] - w[0]).collect();
    }
    out
}

/// Residuals of an AR(m) fit, zero-padded for the first m positions.
fn ar_residuals(w: &[f64], m: usize) -> Result<Vec<f64>, DashboardError> {
    let n = w.len();
    if m == 0 || n <= 2 * m + 1 {
        return Ok(vec![0.0; n]);
    }

    let rows = n - m;
    let mut x = DMatrix::zeros(rows, m + 1);
    let mut y = DVector::zeros(rows);
    for (row, t) in (m..n).enumerate() {
        y[row] = w[t];
        x[(row, 0)] = 1.0;
        for i in 0..m {
            x[(row, 1 + i)] = w[t - 1 - i];
        }
    }

    let beta = ols(x, &y)?;
    let mut residuals = vec![0.0; n];
    for t in m..n {
        let mut fitted = beta[0];
        for i in 0..m {
            fitted += beta[1 + i] * w[t - 1 - i];
        }
        residuals[t] = w[t] - fitted;
    }

    Ok(residuals)
}

/// Least-squares solve via SVD; rank-deficient designs get the
/// minimum-norm solution instead of failing.
fn ols(x: DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>, DashboardError> {
    let svd = x.svd(true, true);
    svd.solve(y, 1e-12)
        .map_err(|e| DashboardError::Calculation(e.to_string()))
}
