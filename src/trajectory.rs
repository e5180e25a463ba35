//! Fixed-step stochastic trajectory integration.
//!
//! One rollout integrates the descent derivative from release altitude to
//! the ground with forward Euler. Every step queries the wind model at the
//! current altitude and draws one noise pair scaled by the predicted
//! standard deviations, so wind uncertainty propagates into the landing
//! point. The step size trades integration error for runtime and must stay
//! well below the wind model's vertical length scale or lookups alias.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::constants::DEFAULT_MAX_STEPS;
use crate::derivatives::{compute_derivatives, DescentProfile, PayloadState};
use crate::error::DriftError;
use crate::wind_model::WindFieldModel;

/// Integrates descent rollouts with a fixed time step.
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryIntegrator {
    dt_s: f64,
    max_steps: usize,
}

impl TrajectoryIntegrator {
    /// Build an integrator with the given step size (s).
    pub fn new(dt_s: f64) -> Result<TrajectoryIntegrator, DriftError> {
        if !dt_s.is_finite() || dt_s <= 0.0 {
            return Err(DriftError::InvalidConfig {
                reason: format!("integration step must be finite and > 0, got {dt_s}"),
            });
        }
        Ok(TrajectoryIntegrator {
            dt_s,
            max_steps: DEFAULT_MAX_STEPS,
        })
    }

    /// Override the per-rollout step ceiling.
    pub fn with_max_steps(mut self, max_steps: usize) -> TrajectoryIntegrator {
        self.max_steps = max_steps;
        self
    }

    pub fn dt_s(&self) -> f64 {
        self.dt_s
    }

    /// Run one rollout from release to ground.
    ///
    /// Returns the full path, release state first, final state exactly at
    /// altitude 0 (the last step is linearly clipped rather than allowed
    /// to overshoot below ground). A release altitude of 0 yields a
    /// single-point path at the release coordinates.
    ///
    /// Fails only by exhausting the step ceiling, which the Monte Carlo
    /// engine treats as one discarded rollout.
    pub fn run<R: Rng>(
        &self,
        profile: &DescentProfile,
        wind_model: &WindFieldModel,
        rng: &mut R,
    ) -> Result<Vec<PayloadState>, DriftError> {
        let mut state = profile.release_state();

        let expected_steps = if state.descent_rate_mps > 0.0 {
            (profile.release_altitude_m / (state.descent_rate_mps * self.dt_s)) as usize + 2
        } else {
            16
        };
        let mut path = Vec::with_capacity(expected_steps.min(self.max_steps));
        path.push(state);

        if state.altitude_m <= 0.0 {
            return Ok(path);
        }

        for _ in 0..self.max_steps {
            let wind = wind_model.predict(state.altitude_m);

            // One noise pair per step, u before v: the draw order is part
            // of the reproducibility contract.
            let noise_u: f64 = rng.sample::<f64, _>(StandardNormal) * wind.std_u;
            let noise_v: f64 = rng.sample::<f64, _>(StandardNormal) * wind.std_v;

            let deriv = compute_derivatives(&state, &wind, profile, (noise_u, noise_v));
            let next_altitude = state.altitude_m + deriv[2] * self.dt_s;

            if next_altitude <= 0.0 {
                // Clip the final step so the reported landing is at ground
                // level, not below it.
                let fraction = state.altitude_m / (state.altitude_m - next_altitude);
                let dt_final = fraction * self.dt_s;
                state = PayloadState {
                    x_m: state.x_m + deriv[0] * dt_final,
                    y_m: state.y_m + deriv[1] * dt_final,
                    altitude_m: 0.0,
                    elapsed_s: state.elapsed_s + dt_final,
                    descent_rate_mps: -deriv[2],
                };
                path.push(state);
                return Ok(path);
            }

            state = PayloadState {
                x_m: state.x_m + deriv[0] * self.dt_s,
                y_m: state.y_m + deriv[1] * self.dt_s,
                altitude_m: next_altitude,
                elapsed_s: state.elapsed_s + self.dt_s,
                descent_rate_mps: -deriv[2],
            };
            path.push(state);
        }

        Err(DriftError::StepCeilingExceeded {
            max_steps: self.max_steps,
        })
    }
}
