//! Backtracking state shared by every level of the search.
//!
//! All mutation goes through closure-scoped primitives: the value or step is
//! installed, the closure runs, and the previous shape is put back before the
//! primitive returns, whatever the closure returned.

use std::fmt;

use crate::ops::Operator;

/// One applied operation: `left op right = result`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Step<N> {
    pub op: Operator,
    pub left: N,
    pub right: N,
    pub result: N,
}

impl<N> Step<N> {
    pub fn new(op: Operator, left: N, right: N, result: N) -> Self {
        Self {
            op,
            left,
            right,
            result,
        }
    }
}

impl<N: fmt::Display> fmt::Display for Step<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}={}", self.left, self.op, self.right, self.result)
    }
}

/// An ordered trail of steps, rendered as `A op B=R; C op D=S`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Derivation<N> {
    steps: Vec<Step<N>>,
}

impl<N> Derivation<N> {
    pub fn new(steps: Vec<Step<N>>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step<N>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Value produced by the last step.
    pub fn result(&self) -> Option<&N> {
        self.steps.last().map(|step| &step.result)
    }
}

impl<N: fmt::Display> fmt::Display for Derivation<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

/// Values currently in play plus the trail of steps that produced them.
#[derive(Debug)]
pub struct ExpressionStack<N> {
    values: Vec<N>,
    /// Parallel to `values`: whether the value was produced by a step.
    derived: Vec<bool>,
    trail: Vec<Step<N>>,
}

impl<N: Clone> ExpressionStack<N> {
    /// Preallocates room for `capacity` source numbers, which bounds both
    /// the values in play and the number of steps.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            derived: Vec::with_capacity(capacity),
            trail: Vec::with_capacity(capacity.saturating_sub(1)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[N] {
        &self.values
    }

    pub fn trail(&self) -> &[Step<N>] {
        &self.trail
    }

    /// True when a step result is still in play, i.e. some step in the trail
    /// has not been consumed by a later one.
    pub fn has_pending_results(&self) -> bool {
        self.derived.iter().any(|&derived| derived)
    }

    fn push(&mut self, value: N, derived: bool) {
        self.values.push(value);
        self.derived.push(derived);
    }

    fn pop(&mut self) -> Option<(N, bool)> {
        let value = self.values.pop()?;
        let derived = self.derived.pop()?;
        Some((value, derived))
    }

    /// Copy of the current trail, detached from any later stack changes.
    pub fn derivation(&self) -> Derivation<N> {
        Derivation::new(self.trail.clone())
    }
}

/// Scoped push/restore primitives over an [`ExpressionStack`].
///
/// Implementors only expose their stack; the provided methods guarantee that
/// on return the stack has exactly the shape it had on entry.
pub trait StackMachine<N: Clone>: Sized {
    fn stack(&mut self) -> &mut ExpressionStack<N>;

    /// Runs `f` with the source `value` pushed on top of the stack.
    fn with_value<R>(&mut self, value: N, f: impl FnOnce(&mut Self) -> R) -> R {
        self.stack().push(value, false);
        let outcome = f(self);
        self.stack().pop();
        outcome
    }

    /// Runs `f` with the step result `value` pushed on top of the stack.
    fn with_result<R>(&mut self, value: N, f: impl FnOnce(&mut Self) -> R) -> R {
        self.stack().push(value, true);
        let outcome = f(self);
        self.stack().pop();
        outcome
    }

    /// Runs `f` with `step` appended to the trail.
    fn with_step<R>(&mut self, step: Step<N>, f: impl FnOnce(&mut Self) -> R) -> R {
        self.stack().trail.push(step);
        let outcome = f(self);
        self.stack().trail.pop();
        outcome
    }

    /// Lifts the two topmost values off the stack and runs `f` with them as
    /// `(a, b)`, where `b` is the most recent push. Both are put back in place
    /// afterwards. Returns `None` without calling `f` when fewer than two
    /// values are available.
    fn with_top_two<R>(&mut self, f: impl FnOnce(&mut Self, &N, &N) -> R) -> Option<R> {
        let stack = self.stack();
        if stack.len() < 2 {
            return None;
        }
        let (b, b_derived) = stack.pop()?;
        let (a, a_derived) = stack.pop()?;
        let outcome = f(self, &a, &b);
        let stack = self.stack();
        stack.push(a, a_derived);
        stack.push(b, b_derived);
        Some(outcome)
    }
}

impl<N: Clone> StackMachine<N> for ExpressionStack<N> {
    fn stack(&mut self) -> &mut ExpressionStack<N> {
        self
    }
}
