use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("strategy must be snowball|avalanche, got '{0}'")]
    InvalidStrategy(String),

    #[error("invalid solver config: {field} {reason}")]
    InvalidSolveConfig { field: &'static str, reason: String },
}
