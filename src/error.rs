use thiserror::Error;

/// Errors raised outside the physics core: configuration and runner control
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] validator::ValidationErrors),

    #[error("Simulation runner has stopped")]
    RunnerStopped,
}

pub type Result<T> = std::result::Result<T, SimError>;
