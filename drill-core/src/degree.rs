//! # Scale-Degree Target Module
//!
//! The target degrees the performer is drilled on, and the generator
//! that draws the session's sequence of targets. The direction tag is
//! display metadata only; pitch-class matching is octave-invariant.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Whether the target is to be sung/played above or below the tonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Above,
    Below,
}

/// A drill target: a degree 1-7 plus an optional direction.
///
/// Degree 1 may carry no direction (plain tonic) or either direction;
/// degrees 2-7 always carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleDegree {
    pub degree: u8,
    pub direction: Option<Direction>,
}

impl std::fmt::Display for ScaleDegree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.direction {
            Some(Direction::Above) => write!(f, "{}↑", self.degree),
            Some(Direction::Below) => write!(f, "{}↓", self.degree),
            None => write!(f, "{}", self.degree),
        }
    }
}

/// Redraw cap for the no-repeat rejection loop. Rejection sampling
/// terminates almost surely long before this; the cap guarantees it.
const MAX_REDRAWS: usize = 100;

/// Draws the session's sequence of targets, enforcing the
/// no-immediate-repeat rule.
#[derive(Debug)]
pub struct ScaleDegreeGenerator {
    rng: StdRng,
}

impl ScaleDegreeGenerator {
    /// Creates an entropy-seeded generator.
    pub fn new() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    /// Creates a deterministic generator for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Draws the next target, never structurally equal to `previous`.
    ///
    /// The degree is uniform over 1-7. Degree 1 splits uniformly three
    /// ways (plain tonic / above / below); other degrees pick a
    /// direction uniformly. A draw identical to `previous` (same
    /// degree and same direction, including both directionless) is
    /// rejected and redrawn, up to [`MAX_REDRAWS`] times.
    pub fn next(&mut self, previous: Option<ScaleDegree>) -> ScaleDegree {
        let mut candidate = self.draw();
        for _ in 0..MAX_REDRAWS {
            if Some(candidate) != previous {
                break;
            }
            candidate = self.draw();
        }
        candidate
    }

    fn draw(&mut self) -> ScaleDegree {
        let degree = self.rng.gen_range(1..=7u8);
        let direction = if degree == 1 {
            match self.rng.gen_range(0..3u8) {
                0 => None,
                1 => Some(Direction::Above),
                _ => Some(Direction::Below),
            }
        } else if self.rng.gen_range(0..2u8) == 0 {
            Some(Direction::Above)
        } else {
            Some(Direction::Below)
        };
        ScaleDegree { degree, direction }
    }
}

impl Default for ScaleDegreeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_repeats_previous_target() {
        let mut generator = ScaleDegreeGenerator::with_seed(7);
        let mut previous = generator.next(None);
        for _ in 0..2000 {
            let next = generator.next(Some(previous));
            assert_ne!(next, previous);
            previous = next;
        }
    }

    #[test]
    fn plain_tonic_is_not_redrawn_immediately() {
        let plain_tonic = ScaleDegree { degree: 1, direction: None };
        let mut generator = ScaleDegreeGenerator::with_seed(42);
        for _ in 0..2000 {
            assert_ne!(generator.next(Some(plain_tonic)), plain_tonic);
        }
    }

    #[test]
    fn degrees_always_carry_valid_shape() {
        let mut generator = ScaleDegreeGenerator::with_seed(3);
        let mut previous = None;
        for _ in 0..2000 {
            let target = generator.next(previous);
            assert!((1..=7).contains(&target.degree));
            if target.degree != 1 {
                assert!(target.direction.is_some());
            }
            previous = Some(target);
        }
    }

    #[test]
    fn all_seventeen_combinations_are_reachable() {
        let mut generator = ScaleDegreeGenerator::with_seed(11);
        let mut seen = std::collections::HashSet::new();
        let mut previous = None;
        for _ in 0..5000 {
            let target = generator.next(previous);
            seen.insert((target.degree, target.direction.map(|d| d == Direction::Above)));
            previous = Some(target);
        }
        // 3 tonic variants + 2 directions for each of degrees 2-7.
        assert_eq!(seen.len(), 17);
    }

    #[test]
    fn display_renders_direction_arrows() {
        let above = ScaleDegree { degree: 5, direction: Some(Direction::Above) };
        let plain = ScaleDegree { degree: 1, direction: None };
        assert_eq!(above.to_string(), "5↑");
        assert_eq!(plain.to_string(), "1");
    }
}
