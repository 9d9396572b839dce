use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{CheckedAdd, CheckedMul, CheckedSub};

use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;

/// Arithmetic the search needs from a numeric domain.
///
/// Implemented for `u64` (bounded, overflowing operations are reported as
/// `None` by the checked methods) and `BigUint` (arbitrary precision).
pub trait Number:
    Integer
    + CheckedAdd
    + CheckedSub
    + CheckedMul
    + Clone
    + Hash
    + Debug
    + Display
    + FromStr
    + From<u64>
    + Send
    + Sync
{
}

impl<T> Number for T where
    T: Integer
        + CheckedAdd
        + CheckedSub
        + CheckedMul
        + Clone
        + Hash
        + Debug
        + Display
        + FromStr
        + From<u64>
        + Send
        + Sync
{
}

/// Numeric domain chosen once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// Machine `u64`.
    #[default]
    Bounded,
    /// `BigUint`, no upper limit.
    Arbitrary,
}

pub type Bounded = u64;
pub type Arbitrary = BigUint;

/// Absolute difference between two values.
pub fn distance<N: Number>(a: &N, b: &N) -> N {
    if a >= b {
        a.clone() - b.clone()
    } else {
        b.clone() - a.clone()
    }
}

/// Exact quotient of `a / b`, or `None` when `b` does not divide `a`.
pub fn exact_quotient<N: Number>(a: &N, b: &N) -> Option<N> {
    if b.is_zero() {
        return None;
    }
    let (quotient, remainder) = a.div_rem(b);
    remainder.is_zero().then_some(quotient)
}
