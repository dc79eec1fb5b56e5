//! Minimization of probabilistic labeled transition systems
//! modulo strong probabilistic bisimulation.
//!
//! A probabilistic labeled transition system (PLTS) has two kinds of states.
//! *Action states* have outgoing transitions labeled with actions,
//! each of which leads to a *probabilistic state*.
//! A probabilistic state is a probability distribution over action states.
//! Two states are strongly probabilistically bisimilar if they can mimic each other's
//! actions such that the resulting distributions assign equal probability to every class of
//! bisimilar states.
//!
//! The crate computes the coarsest such partition of both kinds of states using the
//! O(m log n) partition refinement algorithm by J.F. Groote, H.J. Rivera Verduzco and
//! E.P. de Vink, see [`grv`].
//! A simpler signature based algorithm is available as well, see [`Algorithm`].
//! Probabilities are exact rational numbers ([`Probability`]).
//!
//! Requires **Rust version** >= 1.73.
//!
//! # Usage
//!
//! Most of this crate's functionality can be accessed through the
//! [`ProbabilisticTransitionSystem`] struct.
//! The following system tosses a coin and then finishes in either case:
//!
//! ```
//! use pbisim::{ProbabilisticTransitionSystem, Distribution, EquivalenceClasses, Transition};
//!
//! let (toss, done) = (0, 1);
//! let lts = ProbabilisticTransitionSystem::new(
//!     4,
//!     ["toss", "done"],
//!     vec![
//!         Transition::new(0, toss, 0),
//!         Transition::new(1, done, 1),
//!         Transition::new(2, done, 1),
//!     ],
//!     vec![
//!         // Heads or tails
//!         Distribution::from_fractions(&[(1, 1, 2), (2, 1, 2)]),
//!         Distribution::dirac(3),
//!     ],
//!     Distribution::dirac(0),
//! ).unwrap();
//!
//! let (minimized, partition) = lts.minimize();
//! // Heads and tails behave the same
//! assert!(partition.in_same_class(1, 2));
//! assert_eq!(minimized.num_states(), 3);
//! // The toss now surely leads to the merged state
//! assert_eq!(minimized.probabilistic_state(partition.probabilistic_class_of(0)),
//!            &Distribution::dirac(partition.class_of(1)));
//! ```
//!
//! ### Comparing two systems
//!
//! [`ProbabilisticTransitionSystem::compare()`] decides whether the initial distributions
//! of two systems are bisimilar.
//! Labels are matched by name.
//!
//! ```
//! use pbisim::{ProbabilisticTransitionSystem, Distribution, Transition};
//!
//! let fair = ProbabilisticTransitionSystem::new(
//!     3,
//!     ["heads", "tails"],
//!     vec![Transition::new(1, 0, 1), Transition::new(2, 1, 1)],
//!     vec![Distribution::from_fractions(&[(1, 1, 2), (2, 1, 2)]), Distribution::dirac(0)],
//!     Distribution::from_fractions(&[(1, 1, 2), (2, 1, 2)]),
//! ).unwrap();
//! let biased = ProbabilisticTransitionSystem::new(
//!     3,
//!     ["tails", "heads"],
//!     vec![Transition::new(1, 1, 0), Transition::new(2, 0, 0)],
//!     vec![Distribution::dirac(0)],
//!     Distribution::from_fractions(&[(1, 1, 4), (2, 3, 4)]),
//! ).unwrap();
//!
//! assert!(fair.compare(&fair).unwrap());
//! assert!(!fair.compare(&biased).unwrap());
//! ```
//!
//! # Serde
//!
//! When compiled with the feature flag `serde` (disabled by default),
//! [`ProbabilisticTransitionSystem`], [`Distribution`], [`Transition`] and [`Partition`]
//! implement serde's `Serialize` and `Deserialize` traits.
//! Deserializing a transition system validates it the same way as
//! [`ProbabilisticTransitionSystem::new()`].

pub mod embedded_list;
pub mod equivalence;
pub mod grv;
mod distribution;
mod error;
mod merge;
mod partition;
mod quotient;
mod signature;

// Re-exports
pub use distribution::*;
pub use error::*;
pub use equivalence::EquivalenceRelation;
pub use partition::{Algorithm, Partition};
pub use quotient::EquivalenceClasses;

use log::debug;
use num::One;

/// An action transition from an action state to a probabilistic state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transition {
    /// Source action state
    pub from: u32,
    /// Index into the label names of the transition system
    pub label: u32,
    /// Target probabilistic state
    pub to: u32,
}

impl Transition {
    #[inline]
    pub const fn new(from: u32, label: u32, to: u32) -> Self {
        Transition { from, label, to }
    }
}

impl From<(u32, u32, u32)> for Transition {
    fn from((from, label, to): (u32, u32, u32)) -> Self {
        Transition { from, label, to }
    }
}

/// Probabilistic Labeled Transition System (PLTS)
///
/// Action states are numbered `0..num_states()`,
/// probabilistic states `0..num_probabilistic_states()`,
/// labels are indices into [`labels()`](ProbabilisticTransitionSystem::labels).
/// The initial state is a distribution over action states, which is not one of the
/// numbered probabilistic states.
///
/// A system created with [`new()`](ProbabilisticTransitionSystem::new) is always valid,
/// see [`validate()`](ProbabilisticTransitionSystem::validate).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "SerdeTransitionSystem"))]
pub struct ProbabilisticTransitionSystem {
    num_states: u32,
    labels: Vec<String>,
    transitions: Vec<Transition>,
    distributions: Vec<Distribution>,
    initial: Distribution,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct SerdeTransitionSystem {
    num_states: u32,
    labels: Vec<String>,
    transitions: Vec<Transition>,
    distributions: Vec<Distribution>,
    initial: Distribution,
}

#[cfg(feature = "serde")]
impl TryFrom<SerdeTransitionSystem> for ProbabilisticTransitionSystem {
    type Error = Error;
    fn try_from(deserialized: SerdeTransitionSystem) -> Result<Self> {
        ProbabilisticTransitionSystem::new(
            deserialized.num_states,
            deserialized.labels,
            deserialized.transitions,
            deserialized.distributions,
            deserialized.initial,
        )
    }
}

impl ProbabilisticTransitionSystem {
    /// Create a new transition system and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the system is malformed,
    /// see [`validate()`](ProbabilisticTransitionSystem::validate).
    pub fn new<S: Into<String>>(
        num_states: u32,
        labels: impl IntoIterator<Item=S>,
        transitions: Vec<Transition>,
        distributions: Vec<Distribution>,
        initial: Distribution,
    ) -> Result<Self> {
        let lts = ProbabilisticTransitionSystem::from_parts_unchecked(
            num_states,
            labels.into_iter().map(Into::into).collect(),
            transitions,
            distributions,
            initial,
        );
        lts.validate()?;
        Ok(lts)
    }

    /// Create a transition system without validating it.
    ///
    /// All further operations assume a valid system and may panic or produce nonsense otherwise.
    pub fn from_parts_unchecked(
        num_states: u32,
        labels: Vec<String>,
        transitions: Vec<Transition>,
        distributions: Vec<Distribution>,
        initial: Distribution,
    ) -> Self {
        ProbabilisticTransitionSystem {
            num_states,
            labels,
            transitions,
            distributions,
            initial,
        }
    }

    /// Check that all indices are in range and all distributions are proper probability
    /// distributions: non-empty, with positive probabilities that add up to exactly 1.
    ///
    /// # Errors
    ///
    /// Returns the first problem that was found.
    pub fn validate(&self) -> Result<()> {
        for (i, t) in self.transitions.iter().enumerate() {
            if t.from >= self.num_states {
                return Err(Error::SourceOutOfRange { transition: i, state: t.from });
            }
            if t.label as usize >= self.labels.len() {
                return Err(Error::LabelOutOfRange { transition: i, label: t.label });
            }
            if t.to as usize >= self.distributions.len() {
                return Err(Error::TargetOutOfRange { transition: i, distribution: t.to });
            }
        }
        for (d, distribution) in self.distributions.iter().enumerate() {
            self.validate_distribution(distribution, Some(d as u32))?;
        }
        self.validate_distribution(&self.initial, None)
    }

    fn validate_distribution(&self, distribution: &Distribution, which: Option<u32>) -> Result<()> {
        if distribution.is_empty() {
            return Err(Error::EmptyDistribution { distribution: which });
        }
        if let Some(state) = distribution.states().find(|&s| s >= self.num_states) {
            return Err(Error::DanglingState { distribution: which, state });
        }
        if distribution.has_non_positive() {
            return Err(Error::NonPositiveProbability { distribution: which });
        }
        let sum = distribution.total();
        if !sum.is_one() {
            return Err(Error::NotNormalized { distribution: which, sum });
        }
        Ok(())
    }

    /// The number of action states.
    #[inline]
    pub fn num_states(&self) -> u32 {
        self.num_states
    }

    /// The number of probabilistic states, excluding the initial distribution.
    #[inline]
    pub fn num_probabilistic_states(&self) -> u32 {
        self.distributions.len() as u32
    }

    #[inline]
    pub fn num_action_labels(&self) -> u32 {
        self.labels.len() as u32
    }

    /// Label names. The label of a transition is an index into this list.
    #[inline]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// All action transitions in their original order.
    #[inline]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// # Panics
    ///
    /// Panics if `distribution` is not less than `num_probabilistic_states()`.
    #[inline]
    pub fn probabilistic_state(&self, distribution: u32) -> &Distribution {
        &self.distributions[distribution as usize]
    }

    #[inline]
    pub fn distributions(&self) -> &[Distribution] {
        &self.distributions
    }

    #[inline]
    pub fn initial_probabilistic_state(&self) -> &Distribution {
        &self.initial
    }

    /// Compute the strong probabilistic bisimulation classes with the default algorithm.
    pub fn partition(&self) -> Partition {
        self.partition_with(Algorithm::default())
    }

    pub fn partition_with(&self, algorithm: Algorithm) -> Partition {
        algorithm.partition(self)
    }

    /// Create a new, minimized system where bisimilar states are consolidated.
    ///
    /// Returns a tuple containing the minimized system and the partition used.
    /// Action state `i` of the minimized system stands for class `i` of the partition,
    /// likewise for probabilistic states.
    pub fn minimize(&self) -> (ProbabilisticTransitionSystem, Partition) {
        self.minimize_with(Algorithm::default())
    }

    pub fn minimize_with(&self, algorithm: Algorithm) -> (ProbabilisticTransitionSystem, Partition) {
        let partition = self.partition_with(algorithm);
        let minimized = partition.quotient(self);
        debug!("Minimized from {} to {} states and from {} to {} probabilistic states",
            self.num_states(), minimized.num_states(),
            self.num_probabilistic_states(), minimized.num_probabilistic_states());
        (minimized, partition)
    }

    /// Replace this system by its minimization.
    ///
    /// Returns the partition that maps the old states to the new ones.
    pub fn reduce(&mut self) -> Partition {
        let (minimized, partition) = self.minimize();
        *self = minimized;
        partition
    }

    /// Decide whether the initial distributions of `self` and `other` are bisimilar.
    ///
    /// # Errors
    ///
    /// Fails if a label name occurs more than once in either system.
    pub fn compare(&self, other: &ProbabilisticTransitionSystem) -> Result<bool> {
        self.compare_with(other, Algorithm::default())
    }

    pub fn compare_with(&self, other: &ProbabilisticTransitionSystem, algorithm: Algorithm) -> Result<bool> {
        let mut union = self.clone();
        let (initial, other_initial) = union.merge(other)?;
        let partition = union.partition_with(algorithm);
        Ok(partition.in_same_probabilistic_class(initial, other_initial))
    }
}
