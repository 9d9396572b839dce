//! Producers of standard games: the exhaustive list of legal instances and
//! random draws in the style of the television round.

use itertools::Itertools;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use crate::game::{STANDARD_SOURCE_COUNT, TARGET_RANGE};

pub const SMALL_NUMBERS: [u64; 20] = [1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10];
pub const LARGE_NUMBERS: [u64; 4] = [25, 50, 75, 100];

/// Every distinct legal selection of source numbers, each sorted ascending.
pub fn legal_selections() -> Vec<Vec<u64>> {
    SMALL_NUMBERS
        .iter()
        .chain(LARGE_NUMBERS.iter())
        .copied()
        .combinations(STANDARD_SOURCE_COUNT)
        .unique()
        .collect()
}

/// Every legal selection paired with every legal target.
pub fn legal_games() -> impl Iterator<Item = (Vec<u64>, u64)> {
    legal_selections()
        .into_iter()
        .flat_map(|selection| TARGET_RANGE.map(move |target| (selection.clone(), target)))
}

/// Draws a random standard game: up to four large numbers, the rest small.
pub fn random_game<R: Rng + ?Sized>(rng: &mut R) -> (Vec<u64>, u64) {
    let large_count = rng.random_range(0..=LARGE_NUMBERS.len());
    let small_count = STANDARD_SOURCE_COUNT - large_count;

    let mut chosen: Vec<u64> = SMALL_NUMBERS
        .choose_multiple(rng, small_count)
        .chain(LARGE_NUMBERS.choose_multiple(rng, large_count))
        .copied()
        .collect();
    chosen.shuffle(rng);

    let target = rng.random_range(TARGET_RANGE);
    (chosen, target)
}
