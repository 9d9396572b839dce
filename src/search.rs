use log::debug;

use crate::best::BestMatch;
use crate::number::{distance, Number};
use crate::ops::Operator;
use crate::stack::{Derivation, ExpressionStack, StackMachine, Step};

/// Source numbers of one game together with their availability mask.
#[derive(Debug, Clone)]
pub(crate) struct SourcePool<N> {
    values: Vec<N>,
    used: Vec<bool>,
}

impl<N: Number> SourcePool<N> {
    fn new(values: Vec<N>) -> Self {
        let used = vec![false; values.len()];
        Self { values, used }
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn is_used(&self, index: usize) -> bool {
        self.used[index]
    }

    /// True when an earlier source with the same value is still unused, in
    /// which case pushing this one would only repeat that branch.
    fn is_shadowed(&self, index: usize) -> bool {
        let value = &self.values[index];
        (0..index).any(|earlier| !self.used[earlier] && &self.values[earlier] == value)
    }

    /// Marks the source as used and hands out its value.
    fn claim(&mut self, index: usize) -> N {
        self.used[index] = true;
        self.values[index].clone()
    }

    fn release(&mut self, index: usize) {
        self.used[index] = false;
    }
}

/// Counters reported after each search pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SearchStats {
    /// Calls into the recursive search.
    pub nodes: u64,
    /// Operator applications that passed their legality check.
    pub steps: u64,
}

/// Depth-bounded backtracking search over push/operate sequences.
///
/// All mutable state lives here and is restored to its initial shape after
/// every [`Search::run`]; only the solutions, the best match and the stats
/// accumulate across runs.
#[derive(Debug)]
pub struct Search<N> {
    pool: SourcePool<N>,
    stack: ExpressionStack<N>,
    target: N,
    best: BestMatch<N>,
    solutions: Vec<Derivation<N>>,
    stop_at_first: bool,
    stats: SearchStats,
}

impl<N: Number> StackMachine<N> for Search<N> {
    fn stack(&mut self) -> &mut ExpressionStack<N> {
        &mut self.stack
    }
}

impl<N: Number> Search<N> {
    pub fn new(sources: Vec<N>, target: N, tolerance: N, stop_at_first: bool) -> Self {
        let capacity = sources.len();
        Self {
            pool: SourcePool::new(sources),
            stack: ExpressionStack::with_capacity(capacity),
            target,
            best: BestMatch::new(tolerance),
            solutions: Vec::new(),
            stop_at_first,
            stats: SearchStats::default(),
        }
    }

    /// Searches every derivation that pushes at most `budget` source numbers.
    /// Returns whether an exact match was found during this run.
    pub fn run(&mut self, budget: usize) -> bool {
        let before = self.stats;
        let found = self.explore(budget);
        debug!(
            "budget {}: found={} nodes={} steps={}",
            budget,
            found,
            self.stats.nodes - before.nodes,
            self.stats.steps - before.steps
        );
        found
    }

    fn explore(&mut self, budget: usize) -> bool {
        self.stats.nodes += 1;
        let mut found = false;

        if budget > 0 {
            for index in 0..self.pool.len() {
                if self.pool.is_used(index) || self.pool.is_shadowed(index) {
                    continue;
                }
                let value = self.pool.claim(index);
                let hit = self.with_value(value, |search| search.explore(budget - 1));
                self.pool.release(index);
                if hit {
                    found = true;
                    if self.stop_at_first {
                        return true;
                    }
                }
            }
        }

        if self.stack.len() >= 2 {
            for op in Operator::ALL {
                let hit = self
                    .with_top_two(|search, a, b| search.try_operator(op, a, b, budget))
                    .unwrap_or(false);
                if hit {
                    found = true;
                    if self.stop_at_first {
                        return true;
                    }
                }
            }
        }

        found
    }

    fn try_operator(&mut self, op: Operator, a: &N, b: &N, budget: usize) -> bool {
        let Some(result) = op.apply(a, b) else {
            return false;
        };
        self.stats.steps += 1;

        // With the operands lifted, any result left on the stack belongs to a
        // step this one does not build on.
        let complete = !self.stack.has_pending_results();
        let step = Step::new(op, a.clone(), b.clone(), result.clone());
        self.with_step(step, |search| {
            if result == search.target {
                if !complete {
                    return false;
                }
                search.solutions.push(search.stack.derivation());
                return true;
            }
            if complete {
                let gap = distance(&result, &search.target);
                search.best.offer(gap, search.stack.trail());
            }
            search.with_result(result, |search| search.explore(budget))
        })
    }

    pub fn solutions(&self) -> &[Derivation<N>] {
        &self.solutions
    }

    pub fn best(&self) -> &BestMatch<N> {
        &self.best
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    pub fn into_results(self) -> (Vec<Derivation<N>>, BestMatch<N>) {
        (self.solutions, self.best)
    }
}
