use thiserror::Error;

#[derive(Debug, Error)]
pub enum VdfError {
    #[error("vdf compute exceeded its deadline")]
    Timeout,
    #[error("vdf compute was cancelled")]
    Cancelled,
    #[error("vdf proof is malformed: {0}")]
    Malformed(String),
    #[error("iterations must be nonzero")]
    ZeroIterations,
}
