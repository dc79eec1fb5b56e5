use std::collections::BTreeMap;
use std::fmt;

use num::{BigInt, BigRational, One, Signed, Zero};

/// Exact rational probability.
pub type Probability = BigRational;

/// Shorthand for the probability `numer / denom`.
///
/// # Panics
///
/// Panics if `denom` is zero.
pub fn fraction(numer: i64, denom: i64) -> Probability {
    BigRational::new(BigInt::from(numer), BigInt::from(denom))
}

/// A probabilistic state: a distribution over action states.
///
/// Stored as a list of `(state, probability)` pairs.
/// The same state may occur more than once, in which case the probabilities add up.
/// A valid distribution is non-empty, has only positive probabilities and sums up to exactly 1.
/// See [`ProbabilisticTransitionSystem::validate()`](crate::ProbabilisticTransitionSystem::validate).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Distribution {
    pairs: Vec<(u32, Probability)>,
}

impl Distribution {
    pub fn new(pairs: Vec<(u32, Probability)>) -> Self {
        Distribution { pairs }
    }

    /// The distribution that reaches `state` with probability 1.
    pub fn dirac(state: u32) -> Self {
        Distribution { pairs: vec![(state, Probability::one())] }
    }

    /// Build a distribution from `(state, numerator, denominator)` triples.
    ///
    /// ```
    /// use pbisim::{Distribution, fraction};
    ///
    /// let coin = Distribution::from_fractions(&[(1, 1, 2), (2, 1, 2)]);
    /// assert_eq!(coin.probability_of(1), fraction(1, 2));
    /// ```
    pub fn from_fractions(parts: &[(u32, i64, i64)]) -> Self {
        parts.iter()
            .map(|&(state, numer, denom)| (state, fraction(numer, denom)))
            .collect()
    }

    #[inline]
    pub fn pairs(&self) -> &[(u32, Probability)] {
        &self.pairs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item=u32> + '_ {
        self.pairs.iter().map(|(s, _)| *s)
    }

    /// Sum of all probabilities.
    pub fn total(&self) -> Probability {
        self.pairs.iter()
            .fold(Probability::zero(), |acc, (_, p)| acc + p)
    }

    /// Aggregate probability of reaching `state`.
    pub fn probability_of(&self, state: u32) -> Probability {
        self.pairs.iter()
            .filter(|(s, _)| *s == state)
            .fold(Probability::zero(), |acc, (_, p)| acc + p)
    }

    pub(crate) fn has_non_positive(&self) -> bool {
        self.pairs.iter().any(|(_, p)| !p.is_positive())
    }

    /// Map every state through `class` and add up the probabilities of states that land in the
    /// same class.
    ///
    /// The result is sorted by class and contains every class at most once.
    pub fn lift(&self, mut class: impl FnMut(u32) -> u32) -> Distribution {
        let mut summed: BTreeMap<u32, Probability> = BTreeMap::new();
        for (state, p) in &self.pairs {
            *summed.entry(class(*state)).or_insert_with(Probability::zero) += p;
        }
        summed.into_iter().collect()
    }

    pub(crate) fn shift(&self, offset: u32) -> Distribution {
        self.pairs.iter()
            .map(|(s, p)| (s + offset, p.clone()))
            .collect()
    }
}

impl FromIterator<(u32, Probability)> for Distribution {
    fn from_iter<I: IntoIterator<Item=(u32, Probability)>>(iter: I) -> Self {
        Distribution { pairs: iter.into_iter().collect() }
    }
}

impl From<Vec<(u32, Probability)>> for Distribution {
    fn from(pairs: Vec<(u32, Probability)>) -> Self {
        Distribution { pairs }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (state, p)) in self.pairs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{state}: {p}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lift_sums_per_class() {
        let d = Distribution::from_fractions(&[(0, 1, 4), (1, 1, 4), (2, 1, 2)]);
        // 0 and 2 collapse into class 5, 1 goes to class 3
        let lifted = d.lift(|s| if s == 1 { 3 } else { 5 });
        assert_eq!(lifted.pairs(), &[(3, fraction(1, 4)), (5, fraction(3, 4))]);
        assert_eq!(lifted.total(), Probability::one());
    }

    #[test]
    fn repeated_states_add_up() {
        let d = Distribution::from_fractions(&[(7, 1, 3), (7, 2, 3)]);
        assert_eq!(d.probability_of(7), Probability::one());
        assert_eq!(d.lift(|s| s).pairs(), Distribution::dirac(7).pairs());
    }

    #[test]
    fn display() {
        let d = Distribution::from_fractions(&[(0, 1, 2), (3, 1, 2)]);
        assert_eq!(d.to_string(), "[0: 1/2, 3: 1/2]");
        assert_eq!(Distribution::dirac(4).to_string(), "[4: 1]");
    }

    #[test]
    fn non_positive() {
        assert!(Distribution::from_fractions(&[(0, 0, 1), (1, 1, 1)]).has_non_positive());
        assert!(Distribution::from_fractions(&[(0, -1, 2), (1, 3, 2)]).has_non_positive());
        assert!(!Distribution::dirac(0).has_non_positive());
    }
}
