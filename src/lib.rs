//! # Driftcast
//!
//! Probabilistic landing-zone prediction for payloads released from
//! high-altitude platforms. Sparse altitude-indexed wind samples are
//! fitted into a continuous mean-plus-uncertainty wind field, that
//! uncertainty is propagated through a descent physics model by a
//! fixed-step integrator, and a Monte Carlo engine turns many stochastic
//! rollouts into a landing distribution with confidence zones.
//!
//! The HTTP layer, dashboard, and data ingestion live outside this crate;
//! the boundary is [`WindFieldModel::predict`] for wind profiles and
//! [`simulate`] for landing distributions.

// Re-export the main types and functions
pub use derivatives::{compute_derivatives, descent_rate_at, DescentProfile, PayloadState};
pub use error::DriftError;
pub use monte_carlo::{
    simulate, ConfidenceZone, LandingDistribution, MonteCarloEngine, SimulationConfig,
};
pub use trajectory::TrajectoryIntegrator;
pub use wind_model::{WindFieldModel, WindPrediction, WindSample};

// Module declarations
pub mod atmosphere;
pub mod constants;
mod derivatives;
mod error;
mod gpr;
mod monte_carlo;
mod trajectory;
mod wind_model;
