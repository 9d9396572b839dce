use std::fmt;

use crate::number::{exact_quotient, Number};

/// The four binary operators of the game, tried in `Operator::ALL` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    pub const ALL: [Operator; 4] = [
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
    ];

    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
            Operator::Multiply => '*',
            Operator::Divide => '/',
        }
    }

    /// Applies the operator to `a` (pushed first) and `b` (pushed second).
    ///
    /// Returns `None` when the pair is illegal under the game rules (negative
    /// or fractional result) or when the result cannot lead anywhere new:
    /// the commutative operators only accept `a >= b`, identities with 1 are
    /// skipped and no result may reproduce one of its operands. A bounded
    /// overflow is also reported as `None`.
    pub fn apply<N: Number>(self, a: &N, b: &N) -> Option<N> {
        match self {
            Operator::Add => {
                if a < b {
                    return None;
                }
                a.checked_add(b)
            }
            Operator::Subtract => {
                if a <= b {
                    return None;
                }
                a.checked_sub(b).filter(|result| result != b)
            }
            Operator::Multiply => {
                let one = N::one();
                if a <= &one || b <= &one || a < b {
                    return None;
                }
                a.checked_mul(b)
            }
            Operator::Divide => {
                if b <= &N::one() {
                    return None;
                }
                exact_quotient(a, b).filter(|result| result != b)
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
