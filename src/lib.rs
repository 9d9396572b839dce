//! Solver for the numbers round: combine source numbers with `+ - * /` to
//! reach a target, or get as close to it as the rules allow.
//!
//! The engine is an exhaustive depth-bounded backtracking search over a
//! shared expression stack. It deepens one source number at a time so the
//! first exact match it reports is also one of the shortest.
//!
//! ```
//! use numbers::{solve_instance, SolverConfig};
//!
//! let answer = solve_instance("1 3 7 6 8 3 250", &SolverConfig::default());
//! assert!(answer.is_ok());
//! ```

pub mod best;
pub mod error;
pub mod game;
pub mod games;
pub mod number;
pub mod ops;
pub mod search;
pub mod stack;

use serde::{Deserialize, Serialize};

pub use error::GameError;
pub use game::{solve, solve_instance, Game, Outcome, Rules, SolverConfig};
pub use number::{Number, Precision};
pub use ops::Operator;
pub use stack::{Derivation, Step};

/// One solved standard game, as written to the batch output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub starting: Vec<u64>,
    pub target: u64,
    pub closest: Option<u64>,
    pub derivation: String,
}

impl GameRecord {
    pub fn new(starting: Vec<u64>, target: u64, closest: Option<u64>, derivation: String) -> Self {
        Self {
            starting,
            target,
            closest,
            derivation,
        }
    }

    /// Validates and solves `starting -> target` under `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance breaks the configured rules.
    pub fn solve(starting: Vec<u64>, target: u64, config: &SolverConfig) -> Result<Self, GameError> {
        let game = Game::new(starting, target, config.rules)?;
        let outcome = solve(&game, config);
        let closest = outcome.closest().copied();
        Ok(Self::new(
            game.sources().to_vec(),
            target,
            closest,
            outcome.to_string(),
        ))
    }
}
