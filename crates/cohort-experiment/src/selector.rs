//! Weighted alternative selection
//!
//! Provides [`Selector`], which owns an injected random source so tests can
//! pin draws with a seeded generator.

use crate::error::SelectionError;
use crate::experiment::{Alternative, Experiment};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Pick an alternative with probability `weight / total`
///
/// Draws `p` uniformly in `[0, total)` and walks the alternatives in declared
/// order, returning the first whose weight is at least the remaining `p` and
/// otherwise subtracting that weight before moving on.
///
/// # Errors
/// - `NoAlternatives` for an empty slice
/// - `ZeroTotalWeight` if every weight is zero
/// - `Exhausted` if the walk ends without a match
#[allow(clippy::cast_precision_loss)]
pub fn choose<'a, R: Rng + ?Sized>(
    alternatives: &'a [Alternative],
    rng: &mut R,
) -> Result<&'a str, SelectionError> {
    if alternatives.is_empty() {
        return Err(SelectionError::NoAlternatives);
    }

    let total: u128 = alternatives.iter().map(|a| u128::from(a.weight())).sum();
    if total == 0 {
        return Err(SelectionError::ZeroTotalWeight);
    }

    let mut point = rng.gen::<f64>() * total as f64;
    for alt in alternatives {
        let weight = alt.weight() as f64;
        if point <= weight {
            return Ok(alt.name());
        }
        point -= weight;
    }

    Err(SelectionError::Exhausted { total })
}

/// Weighted selector over an injected random source
#[derive(Debug, Clone)]
pub struct Selector<R = StdRng> {
    rng: R,
}

impl Selector<StdRng> {
    /// Selector seeded from OS entropy
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Selector with a fixed seed
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Selector<R> {
    /// Create selector around a random source
    #[inline]
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Choose an alternative of `experiment`
    ///
    /// # Errors
    /// See [`choose`]. Unreachable for registered experiments.
    pub fn choose<'e>(&mut self, experiment: &'e Experiment) -> Result<&'e str, SelectionError> {
        choose(experiment.alternatives(), &mut self.rng)
    }

    /// Placeholder alternative reported when nothing is assigned yet
    #[inline]
    #[must_use]
    pub fn first<'e>(&self, experiment: &'e Experiment) -> &'e str {
        experiment.first_alternative()
    }

    /// Consume selector, returning the random source
    #[inline]
    pub fn into_inner(self) -> R {
        self.rng
    }
}
