//! Monte Carlo landing-distribution engine.
//!
//! Runs many independent stochastic rollouts of one descent profile
//! against a fitted wind model and aggregates the terminal points into a
//! landing distribution: sample mean, sample covariance, and confidence
//! ellipses. Rollouts share nothing but read-only access to the model, so
//! they run on the rayon pool in any order; aggregation is
//! order-independent and the collected point list keeps rollout-index
//! order for reproducibility.

use std::time::{Duration, Instant};

use nalgebra::{Matrix2, SymmetricEigen, Vector2};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONFIDENCE_LEVELS, DEFAULT_DT_S, DEFAULT_MAX_DISCARD_FRACTION, DEFAULT_MAX_STEPS,
    DEFAULT_ROLLOUTS, MIN_ROLLOUTS, NUMERICAL_TOLERANCE,
};
use crate::derivatives::DescentProfile;
use crate::error::DriftError;
use crate::trajectory::TrajectoryIntegrator;
use crate::wind_model::WindFieldModel;

/// Tunables of one simulation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of independent rollouts
    pub n_rollouts: usize,
    /// Integration step (s)
    pub dt_s: f64,
    /// Base seed for reproducible noise streams; `None` draws one from OS
    /// entropy
    pub seed: Option<u64>,
    /// Confidence levels to report zones for, each in (0, 1)
    pub confidence_levels: Vec<f64>,
    /// Discard fraction above which the whole run fails
    pub max_discard_fraction: f64,
    /// Fewest completed rollouts for which statistics are reported
    pub min_rollouts: usize,
    /// Optional wall-clock budget; rollouts not started at the deadline
    /// are skipped
    pub timeout: Option<Duration>,
    /// Per-rollout integration step ceiling
    pub max_steps: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            n_rollouts: DEFAULT_ROLLOUTS,
            dt_s: DEFAULT_DT_S,
            seed: None,
            confidence_levels: DEFAULT_CONFIDENCE_LEVELS.to_vec(),
            max_discard_fraction: DEFAULT_MAX_DISCARD_FRACTION,
            min_rollouts: MIN_ROLLOUTS,
            timeout: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// Confidence ellipse for the landing distribution.
///
/// Derived analytically from the sample covariance eigenstructure: the
/// semi-axes are `sqrt(λᵢ · r²)` with `r² = −2·ln(1 − level)`, the
/// chi-squared quantile for two degrees of freedom. Zones for increasing
/// levels share axes and grow monotonically, so they are nested by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceZone {
    /// Confidence level in (0, 1)
    pub level: f64,
    /// Ellipse center, the sample mean (m)
    pub center_x_m: f64,
    pub center_y_m: f64,
    /// Semi-major axis (m)
    pub semi_major_m: f64,
    /// Semi-minor axis (m)
    pub semi_minor_m: f64,
    /// Angle of the major axis from +x (rad)
    pub orientation_rad: f64,
}

impl ConfidenceZone {
    /// Whether a point lies inside (or on) the ellipse.
    pub fn contains(&self, x_m: f64, y_m: f64) -> bool {
        let dx = x_m - self.center_x_m;
        let dy = y_m - self.center_y_m;
        let (sin, cos) = self.orientation_rad.sin_cos();
        let along_major = dx * cos + dy * sin;
        let along_minor = -dx * sin + dy * cos;

        let normalized = |offset: f64, semi_axis: f64| -> Option<f64> {
            if semi_axis > NUMERICAL_TOLERANCE {
                Some(offset / semi_axis)
            } else if offset.abs() <= NUMERICAL_TOLERANCE {
                Some(0.0)
            } else {
                None
            }
        };

        match (
            normalized(along_major, self.semi_major_m),
            normalized(along_minor, self.semi_minor_m),
        ) {
            (Some(a), Some(b)) => a * a + b * b <= 1.0 + NUMERICAL_TOLERANCE,
            _ => false,
        }
    }

    /// Ellipse area (m²).
    pub fn area_m2(&self) -> f64 {
        std::f64::consts::PI * self.semi_major_m * self.semi_minor_m
    }
}

/// Aggregate result of one simulation call. Read-only once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandingDistribution {
    /// Terminal (x, y) per completed rollout, in rollout-index order (m)
    pub points: Vec<(f64, f64)>,
    /// Sample mean landing point (m)
    pub mean: Vector2<f64>,
    /// Unbiased sample covariance of the landing points (m²)
    pub covariance: Matrix2<f64>,
    /// Confidence zones in ascending level order
    pub confidence_zones: Vec<ConfidenceZone>,
    /// Rollouts that reached the ground
    pub completed: usize,
    /// Rollouts discarded at the step ceiling
    pub discarded: usize,
}

impl LandingDistribution {
    /// Zone for an exact requested level, if one was computed.
    pub fn zone(&self, level: f64) -> Option<&ConfidenceZone> {
        self.confidence_zones.iter().find(|z| z.level == level)
    }
}

/// Runs independent descent rollouts and aggregates landing statistics.
#[derive(Debug)]
pub struct MonteCarloEngine {
    profile: DescentProfile,
    config: SimulationConfig,
}

impl MonteCarloEngine {
    /// Validate the configuration and build an engine.
    pub fn new(
        profile: DescentProfile,
        config: SimulationConfig,
    ) -> Result<MonteCarloEngine, DriftError> {
        if config.n_rollouts < config.min_rollouts {
            return Err(DriftError::InsufficientRollouts {
                completed: 0,
                discarded: 0,
                requested: config.n_rollouts,
                required: config.min_rollouts,
            });
        }
        // Surfaces a bad dt before any rollout runs
        TrajectoryIntegrator::new(config.dt_s)?;
        for &level in &config.confidence_levels {
            if !level.is_finite() || level <= 0.0 || level >= 1.0 {
                return Err(DriftError::InvalidConfig {
                    reason: format!("confidence level must lie in (0, 1), got {level}"),
                });
            }
        }
        if !(0.0..=1.0).contains(&config.max_discard_fraction) {
            return Err(DriftError::InvalidConfig {
                reason: format!(
                    "max discard fraction must lie in [0, 1], got {}",
                    config.max_discard_fraction
                ),
            });
        }
        if config.max_steps == 0 {
            return Err(DriftError::InvalidConfig {
                reason: "step ceiling must be at least 1".to_string(),
            });
        }
        Ok(MonteCarloEngine { profile, config })
    }

    /// Run all rollouts and aggregate the landing distribution.
    ///
    /// Individual rollouts that exhaust the step ceiling are discarded and
    /// counted; the call fails when too few complete or the discard rate
    /// points at a systemic profile problem.
    pub fn run(&self, wind_model: &WindFieldModel) -> Result<LandingDistribution, DriftError> {
        let integrator =
            TrajectoryIntegrator::new(self.config.dt_s)?.with_max_steps(self.config.max_steps);
        let base_seed = self
            .config
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen());
        let deadline = self.config.timeout.map(|budget| Instant::now() + budget);

        let outcomes: Vec<RolloutOutcome> = (0..self.config.n_rollouts)
            .into_par_iter()
            .map(|index| {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return RolloutOutcome::Skipped;
                }
                let mut rng = Pcg64Mcg::seed_from_u64(rollout_seed(base_seed, index as u64));
                match integrator.run(&self.profile, wind_model, &mut rng) {
                    Ok(path) => match path.last() {
                        Some(state) => RolloutOutcome::Landed(state.x_m, state.y_m),
                        None => RolloutOutcome::Discarded,
                    },
                    Err(_) => RolloutOutcome::Discarded,
                }
            })
            .collect();

        let mut points = Vec::with_capacity(outcomes.len());
        let mut discarded = 0;
        let mut skipped = 0;
        for outcome in outcomes {
            match outcome {
                RolloutOutcome::Landed(x, y) => points.push((x, y)),
                RolloutOutcome::Discarded => discarded += 1,
                RolloutOutcome::Skipped => skipped += 1,
            }
        }
        let completed = points.len();

        log::debug!(
            "monte carlo: {completed} completed, {discarded} discarded, {skipped} skipped \
             of {} rollouts",
            self.config.n_rollouts
        );

        if completed < self.config.min_rollouts {
            return Err(DriftError::InsufficientRollouts {
                completed,
                discarded,
                requested: self.config.n_rollouts,
                required: self.config.min_rollouts,
            });
        }

        let attempted = completed + discarded;
        let discard_fraction = discarded as f64 / attempted as f64;
        if discard_fraction > self.config.max_discard_fraction {
            log::warn!(
                "discard rate {:.0}% exceeds the {:.0}% threshold; failing the run",
                discard_fraction * 100.0,
                self.config.max_discard_fraction * 100.0
            );
            return Err(DriftError::InsufficientRollouts {
                completed,
                discarded,
                requested: self.config.n_rollouts,
                required: self.config.min_rollouts,
            });
        }

        let (mean, covariance) = sample_moments(&points);

        let mut levels = self.config.confidence_levels.clone();
        levels.sort_by(f64::total_cmp);
        levels.dedup();
        let confidence_zones = levels
            .iter()
            .map(|&level| confidence_ellipse(level, &mean, &covariance))
            .collect();

        Ok(LandingDistribution {
            points,
            mean,
            covariance,
            confidence_zones,
            completed,
            discarded,
        })
    }
}

/// One-call surface for the API layer: validate, run, aggregate.
pub fn simulate(
    wind_model: &WindFieldModel,
    profile: DescentProfile,
    config: SimulationConfig,
) -> Result<LandingDistribution, DriftError> {
    MonteCarloEngine::new(profile, config)?.run(wind_model)
}

enum RolloutOutcome {
    Landed(f64, f64),
    Discarded,
    Skipped,
}

/// Derive the rollout's RNG seed from the base seed and its index
/// (SplitMix64 finalizer), keeping the per-rollout streams decorrelated.
fn rollout_seed(base: u64, index: u64) -> u64 {
    let mut z = base.wrapping_add(index.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Sample mean and unbiased sample covariance of the landing points.
fn sample_moments(points: &[(f64, f64)]) -> (Vector2<f64>, Matrix2<f64>) {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov_xx = 0.0;
    let mut cov_xy = 0.0;
    let mut cov_yy = 0.0;
    for &(x, y) in points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov_xx += dx * dx;
        cov_xy += dx * dy;
        cov_yy += dy * dy;
    }
    let denom = n - 1.0;

    (
        Vector2::new(mean_x, mean_y),
        Matrix2::new(
            cov_xx / denom,
            cov_xy / denom,
            cov_xy / denom,
            cov_yy / denom,
        ),
    )
}

/// Confidence ellipse from the covariance eigenstructure at the
/// chi-squared quantile for two degrees of freedom.
fn confidence_ellipse(
    level: f64,
    mean: &Vector2<f64>,
    covariance: &Matrix2<f64>,
) -> ConfidenceZone {
    // Quantile of chi² with 2 dof in closed form
    let scale = -2.0 * (1.0 - level).ln();

    let eigen = SymmetricEigen::new(*covariance);
    let (major_idx, minor_idx) = if eigen.eigenvalues[0] >= eigen.eigenvalues[1] {
        (0, 1)
    } else {
        (1, 0)
    };
    // Round-off can push a degenerate eigenvalue slightly negative
    let major_var = eigen.eigenvalues[major_idx].max(0.0);
    let minor_var = eigen.eigenvalues[minor_idx].max(0.0);
    let axis = eigen.eigenvectors.column(major_idx);

    ConfidenceZone {
        level,
        center_x_m: mean.x,
        center_y_m: mean.y,
        semi_major_m: (major_var * scale).sqrt(),
        semi_minor_m: (minor_var * scale).sqrt(),
        orientation_rad: axis[1].atan2(axis[0]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wind_model::WindSample;

    fn test_model() -> WindFieldModel {
        WindFieldModel::fit(&[
            WindSample::new(1000.0, 5.0, 0.0),
            WindSample::new(20000.0, 25.0, 10.0),
        ])
        .unwrap()
    }

    fn quick_config(seed: u64) -> SimulationConfig {
        SimulationConfig {
            n_rollouts: 64,
            seed: Some(seed),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_too_few_rollouts_rejected() {
        let profile = DescentProfile::new(10000.0, 5.0).unwrap();
        let config = SimulationConfig {
            n_rollouts: 10,
            ..SimulationConfig::default()
        };
        let err = MonteCarloEngine::new(profile, config).unwrap_err();
        assert!(matches!(
            err,
            DriftError::InsufficientRollouts {
                requested: 10,
                required: 30,
                ..
            }
        ));
    }

    #[test]
    fn test_bad_confidence_level_rejected() {
        let profile = DescentProfile::new(10000.0, 5.0).unwrap();
        for level in [0.0, 1.0, 1.5, f64::NAN] {
            let config = SimulationConfig {
                confidence_levels: vec![level],
                ..SimulationConfig::default()
            };
            assert!(MonteCarloEngine::new(profile, config).is_err());
        }
    }

    #[test]
    fn test_seeded_runs_are_bit_identical() {
        let profile = DescentProfile::new(10000.0, 5.0).unwrap();
        let model = test_model();
        let a = simulate(&model, profile, quick_config(42)).unwrap();
        let b = simulate(&model, profile, quick_config(42)).unwrap();
        assert_eq!(a.points, b.points);
        assert_eq!(a.mean, b.mean);
        assert_eq!(a.covariance, b.covariance);
    }

    #[test]
    fn test_different_seeds_diverge() {
        let profile = DescentProfile::new(10000.0, 5.0).unwrap();
        let model = test_model();
        let a = simulate(&model, profile, quick_config(1)).unwrap();
        let b = simulate(&model, profile, quick_config(2)).unwrap();
        assert_ne!(a.points, b.points);
    }

    #[test]
    fn test_zones_sorted_and_nested() {
        let profile = DescentProfile::new(10000.0, 5.0).unwrap();
        let result = simulate(&test_model(), profile, quick_config(7)).unwrap();
        assert_eq!(result.confidence_zones.len(), 2);
        let narrow = result.zone(0.68).unwrap();
        let wide = result.zone(0.95).unwrap();
        assert!(wide.semi_major_m > narrow.semi_major_m);
        assert!(wide.semi_minor_m > narrow.semi_minor_m);
        assert!(wide.area_m2() > narrow.area_m2());
        // Everything inside the narrow zone is inside the wide one
        for &(x, y) in &result.points {
            if narrow.contains(x, y) {
                assert!(wide.contains(x, y));
            }
        }
    }

    #[test]
    fn test_zone_contains_its_center() {
        let profile = DescentProfile::new(10000.0, 5.0).unwrap();
        let result = simulate(&test_model(), profile, quick_config(5)).unwrap();
        for zone in &result.confidence_zones {
            assert!(zone.contains(zone.center_x_m, zone.center_y_m));
        }
    }

    #[test]
    fn test_empirical_coverage_near_nominal() {
        let profile = DescentProfile::new(10000.0, 5.0).unwrap();
        let config = SimulationConfig {
            n_rollouts: 500,
            seed: Some(13),
            ..SimulationConfig::default()
        };
        let result = simulate(&test_model(), profile, config).unwrap();
        let zone = result.zone(0.95).unwrap();
        let inside = result
            .points
            .iter()
            .filter(|&&(x, y)| zone.contains(x, y))
            .count();
        let coverage = inside as f64 / result.points.len() as f64;
        assert!(
            coverage > 0.88 && coverage <= 1.0,
            "95% zone covered {coverage}"
        );
    }

    #[test]
    fn test_zero_descent_rate_fails_with_discards() {
        let profile = DescentProfile::new(10000.0, 0.0).unwrap();
        let config = SimulationConfig {
            n_rollouts: 32,
            seed: Some(3),
            max_steps: 200,
            ..SimulationConfig::default()
        };
        let err = simulate(&test_model(), profile, config).unwrap_err();
        match err {
            DriftError::InsufficientRollouts {
                completed,
                discarded,
                ..
            } => {
                assert_eq!(completed, 0);
                assert_eq!(discarded, 32);
            }
            other => panic!("expected InsufficientRollouts, got {other:?}"),
        }
    }

    #[test]
    fn test_expired_timeout_fails_with_no_completions() {
        let profile = DescentProfile::new(10000.0, 5.0).unwrap();
        let config = SimulationConfig {
            n_rollouts: 64,
            seed: Some(21),
            timeout: Some(Duration::ZERO),
            ..SimulationConfig::default()
        };
        let err = simulate(&test_model(), profile, config).unwrap_err();
        assert!(matches!(
            err,
            DriftError::InsufficientRollouts { completed: 0, .. }
        ));
    }

    #[test]
    fn test_rollout_seed_decorrelates_indices() {
        let s0 = rollout_seed(42, 0);
        let s1 = rollout_seed(42, 1);
        let s2 = rollout_seed(43, 0);
        assert_ne!(s0, s1);
        assert_ne!(s0, s2);
        // Deterministic for a fixed (base, index)
        assert_eq!(s0, rollout_seed(42, 0));
    }

    #[test]
    fn test_moments_of_known_points() {
        let points = [(0.0, 0.0), (2.0, 0.0), (0.0, 2.0), (2.0, 2.0)];
        let (mean, cov) = sample_moments(&points);
        assert_eq!(mean, Vector2::new(1.0, 1.0));
        assert!((cov[(0, 0)] - 4.0 / 3.0).abs() < 1e-12);
        assert!((cov[(1, 1)] - 4.0 / 3.0).abs() < 1e-12);
        assert!(cov[(0, 1)].abs() < 1e-12);
    }
}
