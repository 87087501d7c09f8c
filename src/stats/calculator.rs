//! Statistics Calculator Module
//! Ordinary-least-squares trend fitting for the scatter panels.

use statrs::distribution::{ContinuousCDF, StudentsT};

/// Significance threshold for the slope test
pub const SIGNIFICANCE_THRESHOLD: f64 = 0.05;

/// A fitted least-squares line and its diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Two-tailed p-value against a zero slope.
    pub p_value: f64,
    pub n: usize,
}

impl TrendFit {
    /// Predicted y at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    pub fn is_significant(&self) -> bool {
        self.p_value <= SIGNIFICANCE_THRESHOLD
    }
}

/// Handles the regression behind the trend lines.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Fit `y = intercept + slope * x` by ordinary least squares.
    ///
    /// Returns `None` for fewer than three pairs or zero x-variance; either
    /// way there is no meaningful line to draw.
    pub fn fit_linear(xs: &[f64], ys: &[f64]) -> Option<TrendFit> {
        let n = xs.len().min(ys.len());
        if n < 3 {
            return None;
        }
        let n_f = n as f64;

        let mean_x = xs[..n].iter().sum::<f64>() / n_f;
        let mean_y = ys[..n].iter().sum::<f64>() / n_f;

        let mut ss_xx = 0.0;
        let mut ss_xy = 0.0;
        let mut ss_yy = 0.0;
        for i in 0..n {
            let dx = xs[i] - mean_x;
            let dy = ys[i] - mean_y;
            ss_xx += dx * dx;
            ss_xy += dx * dy;
            ss_yy += dy * dy;
        }
        if ss_xx <= f64::EPSILON {
            return None;
        }

        let slope = ss_xy / ss_xx;
        let intercept = mean_y - slope * mean_x;

        let ss_res = (ss_yy - slope * ss_xy).max(0.0);
        let r_squared = if ss_yy > 0.0 { 1.0 - ss_res / ss_yy } else { 0.0 };

        let df = n_f - 2.0;
        let se_slope = (ss_res / df / ss_xx).sqrt();

        // Two-tailed p-value using t-distribution
        let p_value = if se_slope > 0.0 {
            let t = slope / se_slope;
            match StudentsT::new(0.0, 1.0, df) {
                Ok(dist) => 2.0 * (1.0 - dist.cdf(t.abs())),
                Err(_) => f64::NAN,
            }
        } else if slope.abs() > 0.0 {
            // Exact fit on a non-flat line
            0.0
        } else {
            1.0
        };

        Some(TrendFit {
            slope,
            intercept,
            r_squared,
            p_value,
            n,
        })
    }

    /// Fit over (x, y) pairs, the shape the scatter panels collect.
    pub fn fit_points(points: &[(f64, f64)]) -> Option<TrendFit> {
        let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
        Self::fit_linear(&xs, &ys)
    }
}
