//! Descent physics: payload state, descent profile, and the trajectory
//! derivative.
//!
//! The derivative function is pure. Wind noise is drawn by the integrator
//! (one pair per step, scaled by the model's standard deviations) and
//! passed in, so the physics stays deterministic and testable in
//! isolation.

use serde::{Deserialize, Serialize};

use crate::atmosphere::density_ratio;
use crate::error::DriftError;
use crate::wind_model::WindPrediction;

/// Payload state at one instant of a rollout, in the local ENU frame
/// anchored at the release point's ground projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayloadState {
    /// Eastward position (m)
    pub x_m: f64,
    /// Northward position (m)
    pub y_m: f64,
    /// Altitude above ground (m)
    pub altitude_m: f64,
    /// Elapsed time since release (s)
    pub elapsed_s: f64,
    /// Magnitude of the downward altitude rate at this state (m/s)
    pub descent_rate_mps: f64,
}

/// Immutable configuration of one simulated drop.
///
/// Validated at construction; simulation code can assume a well-formed
/// profile and never re-checks it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DescentProfile {
    /// Release altitude above ground (m, ≥ 0)
    pub release_altitude_m: f64,
    /// Eastward release coordinate (m)
    pub release_x_m: f64,
    /// Northward release coordinate (m)
    pub release_y_m: f64,
    /// Terminal descent rate in sea-level air (m/s, ≥ 0)
    pub terminal_descent_rate_mps: f64,
    /// Density-response exponent of the descent rate (≥ 0).
    ///
    /// 0 gives a constant-rate parachute approximation; 1 gives the
    /// terminal-velocity square-root law, where thinner air at altitude
    /// speeds the descent and the rate approaches the configured terminal
    /// value as the payload nears the ground.
    pub drag_exponent: f64,
}

impl DescentProfile {
    /// Build a profile dropping from `release_altitude_m` at the frame
    /// origin with a constant descent rate.
    ///
    /// A rate of exactly zero is accepted here: it is a runtime hazard
    /// handled by the integrator's step ceiling, not a malformed profile.
    /// Negative or non-finite parameters are rejected outright.
    pub fn new(
        release_altitude_m: f64,
        terminal_descent_rate_mps: f64,
    ) -> Result<DescentProfile, DriftError> {
        if !release_altitude_m.is_finite() || release_altitude_m < 0.0 {
            return Err(DriftError::InvalidProfile {
                reason: format!("release altitude must be finite and ≥ 0, got {release_altitude_m}"),
            });
        }
        if !terminal_descent_rate_mps.is_finite() || terminal_descent_rate_mps < 0.0 {
            return Err(DriftError::InvalidProfile {
                reason: format!(
                    "terminal descent rate must be finite and ≥ 0, got {terminal_descent_rate_mps}"
                ),
            });
        }

        Ok(DescentProfile {
            release_altitude_m,
            release_x_m: 0.0,
            release_y_m: 0.0,
            terminal_descent_rate_mps,
            drag_exponent: 0.0,
        })
    }

    /// Place the release point away from the frame origin.
    pub fn with_release_point(mut self, x_m: f64, y_m: f64) -> DescentProfile {
        self.release_x_m = x_m;
        self.release_y_m = y_m;
        self
    }

    /// Set the density-response exponent of the descent rate.
    pub fn with_drag_exponent(mut self, exponent: f64) -> Result<DescentProfile, DriftError> {
        if !exponent.is_finite() || exponent < 0.0 {
            return Err(DriftError::InvalidProfile {
                reason: format!("drag exponent must be finite and ≥ 0, got {exponent}"),
            });
        }
        self.drag_exponent = exponent;
        Ok(self)
    }

    /// Initial state of a rollout under this profile.
    pub fn release_state(&self) -> PayloadState {
        PayloadState {
            x_m: self.release_x_m,
            y_m: self.release_y_m,
            altitude_m: self.release_altitude_m,
            elapsed_s: 0.0,
            descent_rate_mps: descent_rate_at(self, self.release_altitude_m),
        }
    }
}

/// Effective descent rate (m/s, downward-positive) at an altitude.
///
/// `terminal_rate · ratio(z)^(-exponent/2)` with `ratio` the sea-level
/// relative air density: never below the configured terminal rate, and
/// converging to it as the air thickens toward the ground.
pub fn descent_rate_at(profile: &DescentProfile, altitude_m: f64) -> f64 {
    if profile.drag_exponent == 0.0 {
        return profile.terminal_descent_rate_mps;
    }
    profile.terminal_descent_rate_mps
        * density_ratio(altitude_m).powf(-0.5 * profile.drag_exponent)
}

/// Instantaneous trajectory derivative `[dx/dt, dy/dt, dz/dt]` (m/s).
///
/// The horizontal rates are the mean wind plus the caller-drawn noise
/// pair; the vertical rate is the altitude-dependent descent rate, always
/// non-positive.
pub fn compute_derivatives(
    state: &PayloadState,
    wind: &WindPrediction,
    profile: &DescentProfile,
    noise: (f64, f64),
) -> [f64; 3] {
    let (noise_u, noise_v) = noise;
    [
        wind.mean_u + noise_u,
        wind.mean_v + noise_v,
        -descent_rate_at(profile, state.altitude_m),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn calm_wind() -> WindPrediction {
        WindPrediction {
            mean_u: 4.0,
            mean_v: -2.0,
            std_u: 1.0,
            std_v: 1.0,
        }
    }

    #[test]
    fn test_profile_rejects_bad_parameters() {
        assert!(DescentProfile::new(-100.0, 5.0).is_err());
        assert!(DescentProfile::new(f64::NAN, 5.0).is_err());
        assert!(DescentProfile::new(10000.0, -5.0).is_err());
        assert!(DescentProfile::new(10000.0, f64::INFINITY).is_err());
        assert!(DescentProfile::new(10000.0, 5.0)
            .unwrap()
            .with_drag_exponent(-1.0)
            .is_err());
    }

    #[test]
    fn test_zero_rate_is_constructible() {
        // Caught later by the integrator's step ceiling, not here
        assert!(DescentProfile::new(10000.0, 0.0).is_ok());
    }

    #[test]
    fn test_constant_rate_ignores_altitude() {
        let profile = DescentProfile::new(20000.0, 5.0).unwrap();
        assert_eq!(descent_rate_at(&profile, 0.0), 5.0);
        assert_eq!(descent_rate_at(&profile, 20000.0), 5.0);
    }

    #[test]
    fn test_rate_grows_with_altitude_under_sqrt_law() {
        let profile = DescentProfile::new(20000.0, 5.0)
            .unwrap()
            .with_drag_exponent(1.0)
            .unwrap();
        let ground = descent_rate_at(&profile, 0.0);
        let mid = descent_rate_at(&profile, 10000.0);
        let high = descent_rate_at(&profile, 20000.0);
        assert_relative_eq!(ground, 5.0, max_relative = 1e-12);
        assert!(mid > ground);
        assert!(high > mid);
        // Thin stratospheric air: roughly 1/sqrt(0.0726) ≈ 3.7× at 20 km
        assert!(high > 3.0 * ground && high < 4.5 * ground);
    }

    #[test]
    fn test_derivative_is_wind_plus_noise() {
        let profile = DescentProfile::new(15000.0, 6.0).unwrap();
        let state = profile.release_state();
        let d = compute_derivatives(&state, &calm_wind(), &profile, (0.5, -0.25));
        assert_relative_eq!(d[0], 4.5, max_relative = 1e-12);
        assert_relative_eq!(d[1], -2.25, max_relative = 1e-12);
        assert_relative_eq!(d[2], -6.0, max_relative = 1e-12);
    }

    #[test]
    fn test_vertical_rate_never_positive() {
        let profile = DescentProfile::new(20000.0, 5.0)
            .unwrap()
            .with_drag_exponent(1.0)
            .unwrap();
        for z in [0.0, 100.0, 5000.0, 20000.0, 40000.0] {
            let state = PayloadState {
                altitude_m: z,
                ..profile.release_state()
            };
            let d = compute_derivatives(&state, &calm_wind(), &profile, (0.0, 0.0));
            assert!(d[2] < 0.0);
        }
    }

    #[test]
    fn test_release_state_matches_profile() {
        let profile = DescentProfile::new(12000.0, 4.0)
            .unwrap()
            .with_release_point(250.0, -80.0);
        let state = profile.release_state();
        assert_eq!(state.x_m, 250.0);
        assert_eq!(state.y_m, -80.0);
        assert_eq!(state.altitude_m, 12000.0);
        assert_eq!(state.elapsed_s, 0.0);
        assert_eq!(state.descent_rate_mps, 4.0);
    }
}
