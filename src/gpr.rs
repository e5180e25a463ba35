//! One-dimensional Gaussian process regression.
//!
//! Each wind component is modeled as a smooth function of altitude with a
//! squared-exponential kernel plus an observation-noise term. Targets are
//! centered before fitting and the kernel length scale is selected by log
//! marginal likelihood over a small candidate grid, so the regressor stays
//! calibrated without an iterative hyperparameter optimizer.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::constants::{CHOLESKY_JITTER, MIN_SIGNAL_VARIANCE};

/// A fitted 1-D Gaussian process regressor.
///
/// Immutable after fitting. The Cholesky factor of the kernel matrix is
/// stored with the weights, so a serialized regressor reproduces
/// bit-identical predictions after a round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpRegressor {
    train_x: Vec<f64>,
    target_mean: f64,
    alpha: DVector<f64>,
    chol_lower: DMatrix<f64>,
    signal_variance: f64,
    length_scale: f64,
    noise_variance: f64,
    log_marginal_likelihood: f64,
}

impl GpRegressor {
    /// Fit against paired inputs and targets, selecting the length scale
    /// from `candidates` by log marginal likelihood.
    ///
    /// Returns `None` only if no candidate kernel matrix factorizes, which
    /// cannot happen for a positive noise variance and finite inputs.
    pub fn fit(
        x: &[f64],
        y: &[f64],
        noise_variance: f64,
        candidates: &[f64],
    ) -> Option<GpRegressor> {
        debug_assert_eq!(x.len(), y.len());
        let n = x.len();

        let target_mean = y.iter().sum::<f64>() / n as f64;
        let centered = DVector::from_iterator(n, y.iter().map(|v| v - target_mean));

        // Centered sample variance sets the prior amplitude; floor it so a
        // constant target column keeps a usable prior.
        let signal_variance = (centered.norm_squared() / n as f64).max(MIN_SIGNAL_VARIANCE);

        let mut best: Option<GpRegressor> = None;
        for &length_scale in candidates {
            let kernel_matrix = DMatrix::from_fn(n, n, |i, j| {
                let k = rbf(x[i], x[j], signal_variance, length_scale);
                if i == j {
                    k + noise_variance + CHOLESKY_JITTER
                } else {
                    k
                }
            });

            let chol = match kernel_matrix.cholesky() {
                Some(chol) => chol,
                None => continue,
            };

            let alpha = chol.solve(&centered);
            let lower = chol.unpack();

            let half_log_det: f64 = (0..n).map(|i| lower[(i, i)].ln()).sum();
            let lml = -0.5 * centered.dot(&alpha)
                - half_log_det
                - 0.5 * n as f64 * (2.0 * std::f64::consts::PI).ln();

            if best
                .as_ref()
                .map_or(true, |b| lml > b.log_marginal_likelihood)
            {
                best = Some(GpRegressor {
                    train_x: x.to_vec(),
                    target_mean,
                    alpha,
                    chol_lower: lower,
                    signal_variance,
                    length_scale,
                    noise_variance,
                    log_marginal_likelihood: lml,
                });
            }
        }

        best
    }

    /// Predictive mean and standard deviation at a query point.
    ///
    /// Defined for any finite input. Far from the training inputs the
    /// cross-covariance vanishes and the standard deviation saturates at
    /// the prior marginal `sqrt(signal_variance + noise_variance)`; it is
    /// never reported as zero-uncertainty extrapolation.
    pub fn predict(&self, query: f64) -> (f64, f64) {
        let n = self.train_x.len();
        let kstar =
            DVector::from_fn(n, |i, _| {
                rbf(self.train_x[i], query, self.signal_variance, self.length_scale)
            });

        let mean = self.target_mean + kstar.dot(&self.alpha);

        // Explained variance is ||L⁻¹ k*||²; a failed triangular solve
        // (zero pivot) degrades to the full prior rather than false
        // confidence.
        let explained = self
            .chol_lower
            .solve_lower_triangular(&kstar)
            .map(|v| v.norm_squared())
            .unwrap_or(0.0);

        let variance = (self.signal_variance + self.noise_variance - explained).max(0.0);
        (mean, variance.sqrt())
    }

    /// Selected kernel length scale.
    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    /// Log marginal likelihood of the fitted hyperparameters.
    pub fn log_marginal_likelihood(&self) -> f64 {
        self.log_marginal_likelihood
    }

    /// Prior marginal standard deviation (the extrapolation plateau).
    pub fn prior_std(&self) -> f64 {
        (self.signal_variance + self.noise_variance).sqrt()
    }
}

/// Squared-exponential covariance between two inputs.
#[inline]
fn rbf(a: f64, b: f64, signal_variance: f64, length_scale: f64) -> f64 {
    let scaled = (a - b) / length_scale;
    signal_variance * (-0.5 * scaled * scaled).exp()
}
