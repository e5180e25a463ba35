/// Physical constants and engine defaults used across the prediction core.

/// Specific gas constant for dry air (J/(kg·K))
pub const R_AIR: f64 = 287.0531;

/// Gravitational acceleration in m/s²
pub const G_ACCEL_MPS2: f64 = 9.80665;

/// Standard air density at sea level (kg/m³)
pub const SEA_LEVEL_AIR_DENSITY: f64 = 1.225;

/// Upper edge of the modeled atmosphere (m).
///
/// Altitudes above this are clamped before the layer lookup; high-altitude
/// platforms release well below it.
pub const ATMOSPHERE_CEILING_M: f64 = 47000.0;

// Numerical stability constants

/// Diagonal jitter added to the kernel matrix before factorization.
///
/// Without it the Cholesky can fail on tightly clustered sample
/// altitudes.
pub const CHOLESKY_JITTER: f64 = 1e-10;

/// General tolerance for floating point comparisons
pub const NUMERICAL_TOLERANCE: f64 = 1e-9;

// Wind-field regression defaults
//
// The kernel length scale is selected per component by log marginal
// likelihood over this candidate grid. The grid spans the plausible
// vertical correlation lengths of stratospheric wind structure; values in
// meters.

/// Candidate kernel length scales (m) scored during fitting
pub const LENGTH_SCALE_CANDIDATES_M: [f64; 7] =
    [5_000.0, 7_500.0, 10_000.0, 15_000.0, 20_000.0, 25_000.0, 30_000.0];

/// Observation-noise variance for wind component samples ((m/s)²).
///
/// Absorbs instrument scatter and conflicting readings at near-duplicate
/// altitudes; such samples are fed to the fit as-is, never deduplicated.
pub const WIND_NOISE_VARIANCE: f64 = 0.5;

/// Signal variance used when the training targets are constant.
///
/// A degenerate (zero-variance) target column would otherwise collapse the
/// prior and report zero uncertainty everywhere.
pub const MIN_SIGNAL_VARIANCE: f64 = 1.0;

// Monte Carlo engine defaults

/// Fewest completed rollouts for which a covariance estimate is reported
pub const MIN_ROLLOUTS: usize = 30;

/// Default number of rollouts per simulation
pub const DEFAULT_ROLLOUTS: usize = 1000;

/// Default integration step (s)
pub const DEFAULT_DT_S: f64 = 1.0;

/// Default fraction of discarded rollouts above which the whole run fails
pub const DEFAULT_MAX_DISCARD_FRACTION: f64 = 0.5;

/// Default confidence levels for landing-zone contours
pub const DEFAULT_CONFIDENCE_LEVELS: [f64; 2] = [0.68, 0.95];

/// Hard ceiling on integration steps per rollout.
///
/// Guards against a non-terminating descent from a near-zero configured
/// descent rate; a rollout that exhausts it is discarded, not fatal to the
/// run as a whole.
pub const DEFAULT_MAX_STEPS: usize = 1_000_000;
