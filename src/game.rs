use itertools::Itertools;
use log::{debug, info};

use std::fmt;
use std::ops::RangeInclusive;

use crate::error::GameError;
use crate::number::{Arbitrary, Bounded, Number, Precision};
use crate::search::Search;
use crate::stack::Derivation;

pub const STANDARD_SOURCE_COUNT: usize = 6;
pub const STANDARD_TOLERANCE: u64 = 9;
pub const TARGET_RANGE: RangeInclusive<u64> = 100..=999;
pub const MIN_UNRESTRICTED_SOURCES: usize = 2;

/// Legal source values under the standard rules and how often each may appear.
const STANDARD_ALLOWANCE: [(u64, usize); 14] = [
    (1, 2),
    (2, 2),
    (3, 2),
    (4, 2),
    (5, 2),
    (6, 2),
    (7, 2),
    (8, 2),
    (9, 2),
    (10, 2),
    (25, 1),
    (50, 1),
    (75, 1),
    (100, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rules {
    /// Six numbers from the standard pool, target in 100..=999, within 9.
    #[default]
    Standard,
    /// Any two or more positive numbers and any positive target; every
    /// result counts as a best effort.
    Unrestricted,
}

/// Everything the session needs besides the instance itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SolverConfig {
    pub rules: Rules,
    /// Search only the deepest budget instead of deepening from 2.
    pub quick: bool,
    /// Report nothing unless the target is hit exactly.
    pub exact_only: bool,
    /// Keep searching after the first exact match.
    pub find_all: bool,
    /// Upper bound on the number of steps in a derivation.
    pub max_length: Option<usize>,
    pub precision: Precision,
}

/// A validated problem instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game<N> {
    sources: Vec<N>,
    target: N,
    rules: Rules,
}

impl<N: Number> Game<N> {
    /// # Errors
    ///
    /// Returns an error if the sources or target break the given rules.
    pub fn new(sources: Vec<N>, target: N, rules: Rules) -> Result<Self, GameError> {
        match rules {
            Rules::Standard => validate_standard(&sources, &target)?,
            Rules::Unrestricted => validate_unrestricted(&sources, &target)?,
        }
        debug!("Accepted {:?} game {:?} -> {}", rules, sources, target);
        Ok(Self {
            sources,
            target,
            rules,
        })
    }

    /// Parses the source numbers followed by the target.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is not a number or the instance is invalid.
    pub fn parse<S: AsRef<str>>(fields: &[S], rules: Rules) -> Result<Self, GameError> {
        let mut numbers = fields
            .iter()
            .map(|field| {
                let field = field.as_ref();
                field
                    .parse::<N>()
                    .map_err(|_| GameError::NotANumber(field.to_string()))
            })
            .collect::<Result<Vec<N>, _>>()?;
        let target = numbers.pop().ok_or(GameError::Empty)?;
        Self::new(numbers, target, rules)
    }

    pub fn sources(&self) -> &[N] {
        &self.sources
    }

    pub fn target(&self) -> &N {
        &self.target
    }

    pub fn rules(&self) -> Rules {
        self.rules
    }

    /// Largest acceptable distance for a best-effort answer.
    pub fn tolerance(&self, exact_only: bool) -> N {
        if exact_only {
            return N::zero();
        }
        match self.rules {
            Rules::Standard => N::from(STANDARD_TOLERANCE),
            Rules::Unrestricted => self.target.clone(),
        }
    }

    /// True when no combination of the sources can come within `tolerance`
    /// of the target.
    ///
    /// Every value derivable from a set of sources is at most the product of
    /// `max(v, 2)` over them, since `a + b <= max(a, 2) * max(b, 2)`.
    fn out_of_reach(&self, tolerance: &N) -> bool {
        let two = N::from(2u64);
        let mut bound = N::one();
        for value in &self.sources {
            let factor = if value > &two { value } else { &two };
            match bound.checked_mul(factor) {
                Some(product) => bound = product,
                None => return false,
            }
        }
        match bound.checked_add(tolerance) {
            Some(reach) => reach < self.target,
            None => false,
        }
    }
}

fn validate_standard<N: Number>(sources: &[N], target: &N) -> Result<(), GameError> {
    if sources.len() != STANDARD_SOURCE_COUNT {
        return Err(GameError::WrongCount {
            expected: STANDARD_SOURCE_COUNT,
            found: sources.len(),
        });
    }

    let counts = sources.iter().counts();
    for value in sources {
        let allowed = STANDARD_ALLOWANCE
            .iter()
            .find(|(legal, _)| &N::from(*legal) == value)
            .map(|&(_, allowed)| allowed)
            .ok_or_else(|| GameError::IllegalNumber(value.to_string()))?;
        let count = counts.get(value).copied().unwrap_or(0);
        if count > allowed {
            return Err(GameError::Overused {
                value: value.to_string(),
                count,
                allowed,
            });
        }
    }

    let low = N::from(*TARGET_RANGE.start());
    let high = N::from(*TARGET_RANGE.end());
    if target < &low || target > &high {
        return Err(GameError::TargetOutOfRange(target.to_string()));
    }
    Ok(())
}

fn validate_unrestricted<N: Number>(sources: &[N], target: &N) -> Result<(), GameError> {
    if sources.len() < MIN_UNRESTRICTED_SOURCES {
        return Err(GameError::TooFewNumbers {
            minimum: MIN_UNRESTRICTED_SOURCES,
            found: sources.len(),
        });
    }
    if let Some(value) = sources.iter().chain([target]).find(|value| value.is_zero()) {
        return Err(GameError::NotPositive(value.to_string()));
    }
    Ok(())
}

/// Result of solving one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<N> {
    /// The target is one of the sources.
    AlreadyPresent(N),
    /// One or more derivations reaching the target exactly.
    Exact(Vec<Derivation<N>>),
    /// Closest derivation found within tolerance.
    Approximate {
        derivation: Derivation<N>,
        distance: N,
    },
    NoSolution,
}

impl<N: Number> Outcome<N> {
    pub fn is_exact(&self) -> bool {
        matches!(self, Outcome::AlreadyPresent(_) | Outcome::Exact(_))
    }

    /// Closest value reached, if any.
    pub fn closest(&self) -> Option<&N> {
        match self {
            Outcome::AlreadyPresent(target) => Some(target),
            Outcome::Exact(derivations) => derivations.first().and_then(Derivation::result),
            Outcome::Approximate { derivation, .. } => derivation.result(),
            Outcome::NoSolution => None,
        }
    }
}

impl<N: Number> fmt::Display for Outcome<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::AlreadyPresent(target) => write!(f, "{}={}", target, target),
            Outcome::Exact(derivations) => write!(f, "{}", derivations.iter().join("\n")),
            Outcome::Approximate {
                derivation,
                distance,
            } => write!(f, "{} ({} away)", derivation, distance),
            Outcome::NoSolution => f.write_str("none"),
        }
    }
}

/// Solves a validated game.
///
/// By default the search deepens from two pushed sources up to the limit,
/// so the first exact match uses as few steps as possible. In quick mode
/// only the deepest budget is searched.
pub fn solve<N: Number>(game: &Game<N>, config: &SolverConfig) -> Outcome<N> {
    if game.sources.contains(&game.target) {
        return Outcome::AlreadyPresent(game.target.clone());
    }

    let tolerance = game.tolerance(config.exact_only);
    if game.out_of_reach(&tolerance) {
        debug!("Target {} is out of reach of {:?}", game.target, game.sources);
        return Outcome::NoSolution;
    }

    let count = game.sources.len();
    let deepest = config
        .max_length
        .map_or(count, |steps| count.min(steps.saturating_add(1)));
    if deepest < 2 {
        return Outcome::NoSolution;
    }

    let mut search = Search::new(
        game.sources.clone(),
        game.target.clone(),
        tolerance,
        !config.find_all,
    );
    if config.quick {
        search.run(deepest);
    } else {
        for budget in 2..=deepest {
            if search.run(budget) {
                break;
            }
        }
    }

    let stats = search.stats();
    debug!("Search finished: nodes={} steps={}", stats.nodes, stats.steps);

    let (solutions, best) = search.into_results();
    if !solutions.is_empty() {
        return Outcome::Exact(solutions.into_iter().unique().collect());
    }
    match best.into_inner() {
        Some((derivation, distance)) if !config.exact_only => Outcome::Approximate {
            derivation,
            distance,
        },
        _ => Outcome::NoSolution,
    }
}

/// Parses one instance line (numbers separated by whitespace or commas,
/// target last) in the configured precision, solves it and renders the
/// outcome.
///
/// # Errors
///
/// Returns an error if the line is not a valid instance under the rules.
pub fn solve_instance(line: &str, config: &SolverConfig) -> Result<String, GameError> {
    let fields: Vec<&str> = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|field| !field.is_empty())
        .collect();
    if fields.is_empty() {
        return Err(GameError::Empty);
    }
    info!("Solving {}", fields.join(" "));
    match config.precision {
        Precision::Bounded => solve_fields::<Bounded>(&fields, config),
        Precision::Arbitrary => solve_fields::<Arbitrary>(&fields, config),
    }
}

fn solve_fields<N: Number>(fields: &[&str], config: &SolverConfig) -> Result<String, GameError> {
    let game = Game::<N>::parse(fields, config.rules)?;
    Ok(solve(&game, config).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tests::{replays, uses_every_result};
    use std::collections::HashSet;

    fn unrestricted() -> SolverConfig {
        SolverConfig {
            rules: Rules::Unrestricted,
            ..SolverConfig::default()
        }
    }

    fn standard_game(sources: &[u64], target: u64) -> Game<u64> {
        match Game::new(sources.to_vec(), target, Rules::Standard) {
            Ok(game) => game,
            Err(err) => panic!("{:?} -> {} rejected: {}", sources, target, err),
        }
    }

    fn unrestricted_game(sources: &[u64], target: u64) -> Game<u64> {
        match Game::new(sources.to_vec(), target, Rules::Unrestricted) {
            Ok(game) => game,
            Err(err) => panic!("{:?} -> {} rejected: {}", sources, target, err),
        }
    }

    /// Every positive value reachable from `sources` with no pruning beyond
    /// the game rules themselves.
    fn reachable(sources: &[u64]) -> HashSet<u64> {
        fn walk(values: &[u64], seen: &mut HashSet<u64>) {
            seen.extend(values.iter().copied());
            for i in 0..values.len() {
                for j in 0..values.len() {
                    if i == j {
                        continue;
                    }
                    let (a, b) = (values[i], values[j]);
                    let rest: Vec<u64> = values
                        .iter()
                        .enumerate()
                        .filter(|&(k, _)| k != i && k != j)
                        .map(|(_, &v)| v)
                        .collect();
                    let mut results = vec![a + b, a * b];
                    if a > b {
                        results.push(a - b);
                    }
                    if a % b == 0 {
                        results.push(a / b);
                    }
                    for result in results {
                        let mut next = rest.clone();
                        next.push(result);
                        walk(&next, seen);
                    }
                }
            }
        }
        let mut seen = HashSet::new();
        walk(sources, &mut seen);
        seen
    }

    #[test]
    fn test_parse_standard_game() {
        let game = Game::<u64>::parse(&["1", "3", "7", "6", "8", "3", "250"], Rules::Standard);
        assert!(game.is_ok());
        if let Ok(game) = game {
            assert_eq!(game.sources(), &[1, 3, 7, 6, 8, 3]);
            assert_eq!(game.target(), &250);
            assert_eq!(game.tolerance(false), 9);
            assert_eq!(game.tolerance(true), 0);
        }
    }

    #[test]
    fn test_standard_validation_errors() {
        let cases: Vec<(Vec<&str>, GameError)> = vec![
            (vec![], GameError::Empty),
            (
                vec!["1", "2", "3", "4", "5", "500"],
                GameError::WrongCount {
                    expected: 6,
                    found: 5,
                },
            ),
            (
                vec!["1", "2", "3", "4", "5", "11", "500"],
                GameError::IllegalNumber("11".into()),
            ),
            (
                vec!["3", "3", "3", "4", "5", "6", "500"],
                GameError::Overused {
                    value: "3".into(),
                    count: 3,
                    allowed: 2,
                },
            ),
            (
                vec!["25", "25", "3", "4", "5", "6", "500"],
                GameError::Overused {
                    value: "25".into(),
                    count: 2,
                    allowed: 1,
                },
            ),
            (
                vec!["1", "2", "3", "4", "5", "6", "99"],
                GameError::TargetOutOfRange("99".into()),
            ),
            (
                vec!["1", "2", "3", "4", "5", "6", "1000"],
                GameError::TargetOutOfRange("1000".into()),
            ),
            (
                vec!["1", "2", "x", "4", "5", "6", "500"],
                GameError::NotANumber("x".into()),
            ),
            (
                vec!["1", "2", "-3", "4", "5", "6", "500"],
                GameError::NotANumber("-3".into()),
            ),
        ];
        for (fields, expected) in cases {
            assert_eq!(
                Game::<u64>::parse(&fields, Rules::Standard),
                Err(expected),
                "{:?}",
                fields
            );
        }
    }

    #[test]
    fn test_unrestricted_validation() {
        assert_eq!(
            Game::<u64>::parse(&["7", "12"], Rules::Unrestricted),
            Err(GameError::TooFewNumbers {
                minimum: 2,
                found: 1
            })
        );
        assert_eq!(
            Game::<u64>::parse(&["7", "0", "12"], Rules::Unrestricted),
            Err(GameError::NotPositive("0".into()))
        );
        assert_eq!(
            Game::<u64>::parse(&["7", "3", "0"], Rules::Unrestricted),
            Err(GameError::NotPositive("0".into()))
        );
        let game = Game::<u64>::parse(&["11", "200", "13", "5000"], Rules::Unrestricted);
        assert_eq!(game.map(|g| g.tolerance(false)), Ok(5000));
    }

    #[test]
    fn test_target_already_present() {
        let game = standard_game(&[100, 1, 2, 3, 4, 5], 100);
        let outcome = solve(&game, &SolverConfig::default());
        assert_eq!(outcome, Outcome::AlreadyPresent(100));
        assert_eq!(outcome.to_string(), "100=100");
        assert_eq!(
            solve_instance("5 12 12", &unrestricted()),
            Ok("12=12".to_string())
        );
    }

    #[test]
    fn test_example_needs_four_steps() {
        let sources = [1, 3, 7, 6, 8, 3];
        let game = standard_game(&sources, 250);
        let outcome = solve(&game, &SolverConfig::default());
        match &outcome {
            Outcome::Exact(derivations) => {
                assert_eq!(derivations.len(), 1);
                let derivation = &derivations[0];
                assert_eq!(derivation.len(), 4, "{}", derivation);
                assert_eq!(derivation.result(), Some(&250));
                assert!(replays(&sources, derivation), "{}", derivation);
            }
            other => panic!("expected an exact match, got {}", other),
        }
        assert!(outcome.is_exact());
    }

    #[test]
    fn test_shortest_derivation_first() {
        let cases: [(&[u64], u64, usize); 3] = [
            (&[100, 25, 7, 4, 3, 2], 368, 3),
            (&[2, 3, 4, 5], 14, 2),
            (&[4, 5, 2], 22, 2),
        ];
        for (sources, target, steps) in cases {
            let game = unrestricted_game(sources, target);
            match solve(&game, &SolverConfig::default()) {
                Outcome::Exact(derivations) => {
                    assert_eq!(derivations[0].len(), steps, "{}", derivations[0]);
                    assert!(replays(sources, &derivations[0]));
                }
                other => panic!("{:?} -> {}: {}", sources, target, other),
            }
        }
    }

    #[test]
    fn test_quick_mode_is_never_shorter() {
        let sources = [2, 3, 4, 5];
        let game = unrestricted_game(&sources, 14);
        let quick = SolverConfig {
            quick: true,
            ..unrestricted()
        };
        let shortest = match solve(&game, &unrestricted()) {
            Outcome::Exact(derivations) => derivations[0].len(),
            other => panic!("expected an exact match, got {}", other),
        };
        match solve(&game, &quick) {
            Outcome::Exact(derivations) => {
                let derivation = &derivations[0];
                assert!(derivation.len() >= shortest, "{}", derivation);
                assert!(derivation.len() < sources.len(), "{}", derivation);
                assert_eq!(derivation.result(), Some(&14));
                assert!(replays(&sources, derivation), "{}", derivation);
                assert!(uses_every_result(derivation), "{}", derivation);
            }
            other => panic!("expected an exact match, got {}", other),
        }
    }

    #[test]
    fn test_quick_find_all_has_no_dead_steps() {
        let config = SolverConfig {
            quick: true,
            find_all: true,
            ..unrestricted()
        };
        let sources = [2, 3, 4, 6];
        match solve(&unrestricted_game(&sources, 10), &config) {
            Outcome::Exact(derivations) => {
                assert!(derivations.len() > 1);
                for derivation in &derivations {
                    assert!(replays(&sources, derivation), "{}", derivation);
                    assert!(uses_every_result(derivation), "{}", derivation);
                }
            }
            other => panic!("expected exact matches, got {}", other),
        }

        let rendered = solve_instance("2 3 4 6 10", &config).unwrap_or_default();
        assert!(rendered.lines().any(|line| line == "6+4=10"), "{}", rendered);
        assert!(!rendered.lines().any(|line| line == "3+2=5; 6+4=10"));
        assert!(!rendered.lines().any(|line| line == "3-2=1; 6+4=10"));
    }

    #[test]
    fn test_out_of_reach_fails_fast() {
        let game = standard_game(&[1, 1, 2, 2, 3, 3], 999);
        assert!(game.out_of_reach(&game.tolerance(false)));
        assert_eq!(solve(&game, &SolverConfig::default()), Outcome::NoSolution);
        assert_eq!(
            solve_instance("1 1 2 2 3 3 999", &SolverConfig::default()),
            Ok("none".to_string())
        );
    }

    #[test]
    fn test_reach_bound_accounts_for_ones() {
        // 1 * 1 = 1 but 1 + 1 = 2 is reachable.
        let game = unrestricted_game(&[1, 1], 2);
        assert!(!game.out_of_reach(&game.tolerance(true)));
        let exact = SolverConfig {
            exact_only: true,
            ..unrestricted()
        };
        assert_eq!(solve(&game, &exact).to_string(), "1+1=2");
    }

    #[test]
    fn test_approximate_outcome() {
        assert_eq!(
            solve_instance("5 4 21", &unrestricted()),
            Ok("5*4=20 (1 away)".to_string())
        );
        let exact = SolverConfig {
            exact_only: true,
            ..unrestricted()
        };
        assert_eq!(solve_instance("5 4 21", &exact), Ok("none".to_string()));
    }

    #[test]
    fn test_exhaustive_no_solution() {
        let exact = SolverConfig {
            exact_only: true,
            ..unrestricted()
        };
        let game = unrestricted_game(&[1, 1, 1, 1], 7);
        assert!(!game.out_of_reach(&0));
        assert_eq!(solve(&game, &exact), Outcome::NoSolution);
    }

    #[test]
    fn test_max_length_caps_steps() {
        let capped = SolverConfig {
            max_length: Some(1),
            ..unrestricted()
        };
        assert_eq!(
            solve_instance("2 3 4 5 14", &capped),
            Ok("5*3=15 (1 away)".to_string())
        );
        let none = SolverConfig {
            max_length: Some(0),
            ..unrestricted()
        };
        assert_eq!(solve_instance("2 3 4 5 14", &none), Ok("none".to_string()));
    }

    #[test]
    fn test_find_all_reports_distinct_derivations() {
        let sources = [1, 2, 3, 4];
        let all = SolverConfig {
            find_all: true,
            ..unrestricted()
        };
        let game = unrestricted_game(&sources, 10);
        match solve(&game, &all) {
            Outcome::Exact(derivations) => {
                assert!(derivations.len() > 1);
                let distinct: HashSet<_> = derivations.iter().collect();
                assert_eq!(distinct.len(), derivations.len());
                for derivation in &derivations {
                    assert_eq!(derivation.len(), 2, "{}", derivation);
                    assert!(replays(&sources, derivation), "{}", derivation);
                }
            }
            other => panic!("expected exact matches, got {}", other),
        }
        let rendered = solve_instance("1 2 3 4 10", &all).unwrap_or_default();
        assert!(rendered.lines().count() > 1);
    }

    #[test]
    fn test_pruning_keeps_every_reachable_target() {
        let exact = SolverConfig {
            exact_only: true,
            ..unrestricted()
        };
        for sources in [[2u64, 3, 7, 11], [1, 1, 5, 9], [4, 4, 6, 25]] {
            let reachable = reachable(&sources);
            for target in 1..=200 {
                let game = unrestricted_game(&sources, target);
                let outcome = solve(&game, &exact);
                assert_eq!(
                    outcome.is_exact(),
                    reachable.contains(&target),
                    "{:?} -> {}: {}",
                    sources,
                    target,
                    outcome
                );
                if let Outcome::Exact(derivations) = outcome {
                    assert!(replays(&sources, &derivations[0]));
                }
            }
        }
    }

    #[test]
    fn test_deterministic_output() {
        let config = SolverConfig {
            find_all: true,
            ..SolverConfig::default()
        };
        let first = solve_instance("100 25 7 4 3 2 368", &config);
        let second = solve_instance("100 25 7 4 3 2 368", &config);
        assert!(first.is_ok());
        assert_eq!(first, second);
    }

    #[test]
    fn test_commas_and_whitespace() {
        assert_eq!(
            solve_instance(" 4, 5,2 , 22 ", &unrestricted()),
            solve_instance("4 5 2 22", &unrestricted())
        );
        assert_eq!(
            solve_instance("  ", &unrestricted()),
            Err(GameError::Empty)
        );
    }

    #[test]
    fn test_arbitrary_precision() {
        let line = "1000000000000 1000000000000 3 3000000000000000000000000";
        let config = SolverConfig {
            precision: Precision::Arbitrary,
            ..unrestricted()
        };
        assert_eq!(
            solve_instance(line, &config),
            Ok("1000000000000*1000000000000=1000000000000000000000000; \
                1000000000000000000000000*3=3000000000000000000000000"
                .to_string())
        );

        // The target does not fit a u64 at all.
        assert_eq!(
            solve_instance(line, &unrestricted()),
            Err(GameError::NotANumber("3000000000000000000000000".into()))
        );
    }

    #[test]
    fn test_bounded_overflow_is_pruned() {
        let outcome = solve_instance("4294967296 4294967296 5 7", &unrestricted());
        assert!(outcome.is_ok());
        assert_ne!(outcome, Ok("none".to_string()));
    }
}
