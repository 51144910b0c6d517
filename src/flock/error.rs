// Error type for the flock simulation core.
// Numerical degeneracy never shows up here: safe_normalize absorbs it.

/// Everything that can go wrong while setting up a simulation.
#[derive(Debug, thiserror::Error)]
pub enum FlockError {
    #[error("invalid flock config: {0}")]
    InvalidConfig(String),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("failed to read config file: {0}")]
    ConfigIo(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),
}

pub type Result<T> = std::result::Result<T, FlockError>;
