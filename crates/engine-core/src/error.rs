use thiserror::Error;

/// Errors surfaced across the engine façade.
///
/// Internal failures (action panics, worker saturation) never reach this
/// enum — they're caught, logged, and handled where they occur. Only
/// caller-visible contract violations do.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is stopped")]
    EngineStopped,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
