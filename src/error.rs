use thiserror::Error;

/// Errors produced by the wind-field model and the simulation engine.
///
/// Per-rollout failures (`StepCeilingExceeded`) are absorbed by the Monte
/// Carlo engine and surface only as discard counts; the remaining variants
/// abort the operation that raised them.
#[derive(Debug, Error)]
pub enum DriftError {
    /// Wind-field fit received too few distinct sample altitudes to
    /// estimate a variance structure.
    #[error("wind fit needs samples at 2 or more distinct altitudes, got {found}")]
    InsufficientData { found: usize },

    /// A single rollout failed to reach the ground within the step ceiling.
    #[error("rollout exceeded {max_steps} integration steps without reaching ground")]
    StepCeilingExceeded { max_steps: usize },

    /// Too few rollouts completed to report a trustworthy distribution.
    #[error(
        "{completed} of {requested} rollouts completed ({discarded} discarded); \
         at least {required} required"
    )]
    InsufficientRollouts {
        completed: usize,
        discarded: usize,
        requested: usize,
        required: usize,
    },

    /// Descent profile parameters rejected at construction.
    #[error("invalid descent profile: {reason}")]
    InvalidProfile { reason: String },

    /// Simulation configuration rejected before any rollout ran.
    #[error("invalid simulation config: {reason}")]
    InvalidConfig { reason: String },
}
