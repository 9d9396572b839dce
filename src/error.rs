use thiserror::Error;

/// Reasons a problem instance is rejected before any search happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Instance is empty")]
    Empty,
    #[error("Not a number: {0}")]
    NotANumber(String),
    #[error("Expected {expected} source numbers, found {found}")]
    WrongCount { expected: usize, found: usize },
    #[error("At least {minimum} source numbers are required, found {found}")]
    TooFewNumbers { minimum: usize, found: usize },
    #[error("{0} is not a legal source number")]
    IllegalNumber(String),
    #[error("{value} appears {count} times, at most {allowed} allowed")]
    Overused {
        value: String,
        count: usize,
        allowed: usize,
    },
    #[error("Target {0} is outside 100..=999")]
    TargetOutOfRange(String),
    #[error("Numbers must be positive, found {0}")]
    NotPositive(String),
}
