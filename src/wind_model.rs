//! Probabilistic wind field over altitude.
//!
//! Sparse altitude-indexed wind observations are turned into a continuous
//! belief: a mean wind vector plus a standard deviation per component at
//! any altitude. Zonal (u) and meridional (v) components are fitted as two
//! independent regressors; the simplification loses cross-component
//! correlation but keeps each fit tractable and independently tunable.

use serde::{Deserialize, Serialize};

use crate::constants::{LENGTH_SCALE_CANDIDATES_M, WIND_NOISE_VARIANCE};
use crate::error::DriftError;
use crate::gpr::GpRegressor;

/// One wind observation at a known altitude.
///
/// Multiple samples at the same (or nearly the same) altitude are treated
/// as independent noisy observations and all feed the fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindSample {
    /// Altitude of the observation (m, above ground)
    pub altitude_m: f64,
    /// Eastward wind component (m/s)
    pub u_mps: f64,
    /// Northward wind component (m/s)
    pub v_mps: f64,
}

impl WindSample {
    pub fn new(altitude_m: f64, u_mps: f64, v_mps: f64) -> Self {
        WindSample {
            altitude_m,
            u_mps,
            v_mps,
        }
    }
}

/// The model's belief about the wind at one altitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindPrediction {
    /// Mean eastward wind (m/s)
    pub mean_u: f64,
    /// Mean northward wind (m/s)
    pub mean_v: f64,
    /// Standard deviation of the eastward component (m/s, ≥ 0)
    pub std_u: f64,
    /// Standard deviation of the northward component (m/s, ≥ 0)
    pub std_v: f64,
}

/// Fitted wind-field model: altitude → (u, v) with per-component
/// uncertainty.
///
/// Fit-then-freeze: fitting produces the whole internal state and nothing
/// mutates it afterwards, so a fitted model is safe to share across
/// concurrent rollouts. Re-fitting means building a new instance.
/// Serialization captures the fitted factorization, so a round-tripped
/// model predicts bit-identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindFieldModel {
    u: GpRegressor,
    v: GpRegressor,
    training_min_m: f64,
    training_max_m: f64,
}

impl WindFieldModel {
    /// Fit a wind field against a collection of samples.
    ///
    /// Fails when fewer than two distinct sample altitudes are present: a
    /// single altitude cannot constrain the variance structure. The input
    /// collection is not modified; samples arrive validated (finite, with
    /// positive altitude) from the ingestion layer.
    pub fn fit(samples: &[WindSample]) -> Result<WindFieldModel, DriftError> {
        let mut distinct: Vec<f64> = samples
            .iter()
            .map(|s| s.altitude_m)
            .filter(|a| a.is_finite())
            .collect();
        distinct.sort_by(f64::total_cmp);
        distinct.dedup();

        if distinct.len() < 2 {
            return Err(DriftError::InsufficientData {
                found: distinct.len(),
            });
        }

        let altitudes: Vec<f64> = samples.iter().map(|s| s.altitude_m).collect();
        let us: Vec<f64> = samples.iter().map(|s| s.u_mps).collect();
        let vs: Vec<f64> = samples.iter().map(|s| s.v_mps).collect();

        let u = GpRegressor::fit(&altitudes, &us, WIND_NOISE_VARIANCE, &LENGTH_SCALE_CANDIDATES_M);
        let v = GpRegressor::fit(&altitudes, &vs, WIND_NOISE_VARIANCE, &LENGTH_SCALE_CANDIDATES_M);
        let (u, v) = match (u, v) {
            (Some(u), Some(v)) => (u, v),
            // Unreachable for finite inputs and a positive noise term;
            // reported as a data problem because that is what it would be.
            _ => {
                return Err(DriftError::InsufficientData {
                    found: distinct.len(),
                })
            }
        };

        log::debug!(
            "wind fit over {} samples ({} distinct altitudes): u length-scale {:.0} m (lml {:.2}), \
             v length-scale {:.0} m (lml {:.2})",
            samples.len(),
            distinct.len(),
            u.length_scale(),
            u.log_marginal_likelihood(),
            v.length_scale(),
            v.log_marginal_likelihood(),
        );

        Ok(WindFieldModel {
            u,
            v,
            training_min_m: distinct[0],
            training_max_m: distinct[distinct.len() - 1],
        })
    }

    /// Wind belief at one altitude.
    ///
    /// Deterministic given the fitted state and defined for any finite
    /// altitude. Outside the training range the standard deviations widen
    /// toward the prior marginal instead of the model erroring or
    /// pretending certainty.
    pub fn predict(&self, altitude_m: f64) -> WindPrediction {
        let (mean_u, std_u) = self.u.predict(altitude_m);
        let (mean_v, std_v) = self.v.predict(altitude_m);
        WindPrediction {
            mean_u,
            mean_v,
            std_u,
            std_v,
        }
    }

    /// Wind belief at each altitude, in input order.
    pub fn predict_batch(&self, altitudes: &[f64]) -> Vec<WindPrediction> {
        altitudes.iter().map(|&z| self.predict(z)).collect()
    }

    /// Altitude span of the training samples (m).
    pub fn training_range_m(&self) -> (f64, f64) {
        (self.training_min_m, self.training_max_m)
    }

    /// Whether a query altitude falls outside the training span, meaning
    /// predictions there are extrapolations.
    pub fn is_extrapolation(&self, altitude_m: f64) -> bool {
        altitude_m < self.training_min_m || altitude_m > self.training_max_m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_samples() -> Vec<WindSample> {
        vec![
            WindSample::new(1000.0, 3.0, -1.0),
            WindSample::new(5000.0, 8.0, 0.5),
            WindSample::new(10000.0, 15.0, 2.0),
            WindSample::new(15000.0, 22.0, 4.0),
            WindSample::new(20000.0, 26.0, 7.0),
        ]
    }

    #[test]
    fn test_fit_requires_two_distinct_altitudes() {
        let err = WindFieldModel::fit(&[]).unwrap_err();
        assert!(matches!(err, DriftError::InsufficientData { found: 0 }));

        let one = vec![WindSample::new(5000.0, 10.0, 1.0)];
        let err = WindFieldModel::fit(&one).unwrap_err();
        assert!(matches!(err, DriftError::InsufficientData { found: 1 }));

        // Repeats of one altitude are still one distinct altitude
        let dupes = vec![
            WindSample::new(5000.0, 10.0, 1.0),
            WindSample::new(5000.0, 11.0, 0.0),
            WindSample::new(5000.0, 9.5, 2.0),
        ];
        let err = WindFieldModel::fit(&dupes).unwrap_err();
        assert!(matches!(err, DriftError::InsufficientData { found: 1 }));
    }

    #[test]
    fn test_two_distinct_altitudes_fit() {
        let samples = vec![
            WindSample::new(1000.0, 5.0, 0.0),
            WindSample::new(20000.0, 25.0, 10.0),
        ];
        let model = WindFieldModel::fit(&samples).unwrap();
        assert_eq!(model.training_range_m(), (1000.0, 20000.0));
    }

    #[test]
    fn test_duplicate_altitudes_are_independent_observations() {
        // Conflicting readings at 5 km plus a second altitude: fit succeeds
        // and the mean at 5 km lands between the conflicting values.
        let samples = vec![
            WindSample::new(5000.0, 8.0, 0.0),
            WindSample::new(5000.0, 12.0, 0.0),
            WindSample::new(10000.0, 15.0, 0.0),
        ];
        let model = WindFieldModel::fit(&samples).unwrap();
        let p = model.predict(5000.0);
        assert!(p.mean_u > 8.0 && p.mean_u < 12.5);
    }

    #[test]
    fn test_std_nonnegative_everywhere() {
        let model = WindFieldModel::fit(&profile_samples()).unwrap();
        for z in [-2000.0, 0.0, 500.0, 10000.0, 19999.0, 30000.0, 80000.0] {
            let p = model.predict(z);
            assert!(p.std_u >= 0.0 && p.std_v >= 0.0, "negative std at {z}");
        }
    }

    #[test]
    fn test_uncertainty_widens_outside_training_range() {
        let model = WindFieldModel::fit(&profile_samples()).unwrap();
        let interior: Vec<WindPrediction> =
            model.predict_batch(&[2500.0, 7500.0, 12500.0, 17500.0]);
        for outside in [-8000.0, 45000.0, 60000.0] {
            let far = model.predict(outside);
            for p in &interior {
                assert!(far.std_u >= p.std_u, "u std not wider at {outside}");
                assert!(far.std_v >= p.std_v, "v std not wider at {outside}");
            }
        }
    }

    #[test]
    fn test_predict_batch_matches_scalar_predict() {
        let model = WindFieldModel::fit(&profile_samples()).unwrap();
        let altitudes = [1000.0, 4321.0, 18000.0, 25000.0];
        let batch = model.predict_batch(&altitudes);
        assert_eq!(batch.len(), altitudes.len());
        for (z, p) in altitudes.iter().zip(&batch) {
            assert_eq!(*p, model.predict(*z));
        }
    }

    #[test]
    fn test_extrapolation_flag() {
        let model = WindFieldModel::fit(&profile_samples()).unwrap();
        assert!(model.is_extrapolation(500.0));
        assert!(model.is_extrapolation(25000.0));
        assert!(!model.is_extrapolation(10000.0));
    }

    #[test]
    fn test_serde_round_trip_is_bit_identical() {
        let model = WindFieldModel::fit(&profile_samples()).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let restored: WindFieldModel = serde_json::from_str(&json).unwrap();
        for z in [0.0, 3000.0, 11111.0, 20000.0, 35000.0] {
            assert_eq!(model.predict(z), restored.predict(z));
        }
    }
}
