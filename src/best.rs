use crate::number::Number;
use crate::stack::{Derivation, Step};

/// Closest derivation seen so far, by absolute distance to the target.
///
/// Only distances within `tolerance` are ever kept, and a candidate replaces
/// the current one only when strictly closer, so among equally close
/// derivations the first one found wins.
#[derive(Debug, Clone)]
pub struct BestMatch<N> {
    tolerance: N,
    best: Option<(Derivation<N>, N)>,
}

impl<N: Number> BestMatch<N> {
    pub fn new(tolerance: N) -> Self {
        Self {
            tolerance,
            best: None,
        }
    }

    /// Distance a candidate has to beat to be recorded.
    fn accepts(&self, distance: &N) -> bool {
        match &self.best {
            Some((_, current)) => distance < current,
            None => distance <= &self.tolerance,
        }
    }

    /// Records `trail` if `distance` improves on everything seen so far.
    /// Returns whether it was recorded.
    pub fn offer(&mut self, distance: N, trail: &[Step<N>]) -> bool {
        if !self.accepts(&distance) {
            return false;
        }
        self.best = Some((Derivation::new(trail.to_vec()), distance));
        true
    }

    pub fn distance(&self) -> Option<&N> {
        self.best.as_ref().map(|(_, distance)| distance)
    }

    pub fn derivation(&self) -> Option<&Derivation<N>> {
        self.best.as_ref().map(|(derivation, _)| derivation)
    }

    pub fn into_inner(self) -> Option<(Derivation<N>, N)> {
        self.best
    }
}
