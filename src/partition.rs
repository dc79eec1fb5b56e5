//! The result of a refinement and the choice of refinement strategy.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use rustc_hash::FxHashMap;

use crate::equivalence::EquivalenceRelation;
use crate::grv::GrvPartitioner;
use crate::quotient::EquivalenceClasses;
use crate::signature::signature_refinement;
use crate::{Error, ProbabilisticTransitionSystem, Result};

/// Strong probabilistic bisimulation classes of action states and probabilistic states.
///
/// Classes are numbered densely in the order in which they first occur when going through the
/// states by index. State 0 is therefore always in class 0, and equal partitions always have equal
/// numbering, no matter how they were computed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "SerdePartition"))]
pub struct Partition {
    classes: Vec<u32>,
    probabilistic_classes: Vec<u32>,
    num_classes: usize,
    num_probabilistic_classes: usize,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct SerdePartition {
    classes: Vec<u32>,
    probabilistic_classes: Vec<u32>,
    num_classes: usize,
    num_probabilistic_classes: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<SerdePartition> for Partition {
    type Error = Error;
    fn try_from(deserialized: SerdePartition) -> Result<Self> {
        let partition = Partition::from_classes(deserialized.classes, deserialized.probabilistic_classes)?;
        let stated = [
            (false, deserialized.num_classes, partition.num_classes),
            (true, deserialized.num_probabilistic_classes, partition.num_probabilistic_classes),
        ];
        for (probabilistic, stated, used) in stated {
            if stated != used {
                return Err(Error::ClassCountMismatch { probabilistic, stated, used });
            }
        }
        Ok(partition)
    }
}

/// Check that `classes` are numbered by first occurrence and return how many there are.
fn count_canonical(classes: &[u32], probabilistic: bool) -> Result<usize> {
    let mut count = 0;
    for (state, &class) in classes.iter().enumerate() {
        match (class as usize).cmp(&count) {
            Ordering::Less => {}
            Ordering::Equal => count += 1,
            Ordering::Greater => return Err(Error::NonCanonicalClass {
                probabilistic,
                state: state as u32,
                class,
            }),
        }
    }
    Ok(count)
}

/// Renumber arbitrary block identifiers by first occurrence.
fn canonical<B: Copy + Eq + Hash>(blocks: &[B]) -> (Vec<u32>, usize) {
    let mut numbering: FxHashMap<B, u32> = FxHashMap::default();
    let classes = blocks.iter()
        .map(|block| {
            let next = numbering.len() as u32;
            *numbering.entry(*block).or_insert(next)
        })
        .collect();
    (classes, numbering.len())
}

impl Partition {
    /// Create a partition from the block identifier of every action state and of every
    /// probabilistic state.
    ///
    /// The identifiers themselves are irrelevant, only which states share one.
    ///
    /// ```
    /// use pbisim::{Partition, EquivalenceClasses};
    ///
    /// let partition = Partition::from_blocks(&[7, 3, 7], &[1, 1]);
    /// assert_eq!(partition.classes(), &[0, 1, 0]);
    /// assert_eq!(partition.num_classes(), 2);
    /// assert_eq!(partition.num_probabilistic_classes(), 1);
    /// ```
    pub fn from_blocks<B: Copy + Eq + Hash>(blocks: &[B], probabilistic_blocks: &[B]) -> Self {
        let (classes, num_classes) = canonical(blocks);
        let (probabilistic_classes, num_probabilistic_classes) = canonical(probabilistic_blocks);
        Partition {
            classes,
            probabilistic_classes,
            num_classes,
            num_probabilistic_classes,
        }
    }

    /// Take over class numbers that are already numbered by first occurrence, as returned by
    /// [`classes()`](Self::classes) and [`probabilistic_classes()`](Self::probabilistic_classes).
    ///
    /// # Errors
    ///
    /// Fails if a state has a class number that is neither a class seen before nor the next
    /// unused one.
    ///
    /// ```
    /// use pbisim::{Error, Partition};
    ///
    /// assert!(Partition::from_classes(vec![0, 1, 0], vec![0]).is_ok());
    /// assert_eq!(
    ///     Partition::from_classes(vec![0, 2, 1], vec![0]),
    ///     Err(Error::NonCanonicalClass { probabilistic: false, state: 1, class: 2 }),
    /// );
    /// ```
    pub fn from_classes(classes: Vec<u32>, probabilistic_classes: Vec<u32>) -> Result<Self> {
        let num_classes = count_canonical(&classes, false)?;
        let num_probabilistic_classes = count_canonical(&probabilistic_classes, true)?;
        Ok(Partition {
            classes,
            probabilistic_classes,
            num_classes,
            num_probabilistic_classes,
        })
    }

    /// Class of every action state.
    #[inline]
    pub fn classes(&self) -> &[u32] {
        &self.classes
    }

    /// Class of every probabilistic state.
    #[inline]
    pub fn probabilistic_classes(&self) -> &[u32] {
        &self.probabilistic_classes
    }

    /// The partition of action states as an equivalence relation.
    pub fn relation(&self) -> EquivalenceRelation {
        EquivalenceRelation::from_classes(&self.classes)
    }

    /// The partition of probabilistic states as an equivalence relation.
    pub fn probabilistic_relation(&self) -> EquivalenceRelation {
        EquivalenceRelation::from_classes(&self.probabilistic_classes)
    }
}

impl EquivalenceClasses for Partition {
    #[inline]
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    #[inline]
    fn num_probabilistic_classes(&self) -> usize {
        self.num_probabilistic_classes
    }

    #[inline]
    fn class_of(&self, state: u32) -> u32 {
        self.classes[state as usize]
    }

    #[inline]
    fn probabilistic_class_of(&self, distribution: u32) -> u32 {
        self.probabilistic_classes[distribution as usize]
    }
}

/// Refinement strategy used to compute bisimulation.
///
/// Both strategies compute the same partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Algorithm {
    /// The O(m log n) algorithm by Groote, Rivera Verduzco and de Vink, see [`crate::grv`].
    #[default]
    Grv,
    /// Repeated refinement by signatures, starting with a partition by enabled labels.
    /// Runs in O(mn) but has lower overhead on small systems.
    Signature,
}

impl Algorithm {
    /// Compute the bisimulation partition of `lts` with this strategy.
    ///
    /// `lts` must be valid.
    pub fn partition(self, lts: &ProbabilisticTransitionSystem) -> Partition {
        match self {
            Algorithm::Grv => GrvPartitioner::new(lts).into_partition(),
            Algorithm::Signature => signature_refinement(lts),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Grv => write!(f, "grv"),
            Algorithm::Signature => write!(f, "signature"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grv" => Ok(Algorithm::Grv),
            "signature" | "bem" => Ok(Algorithm::Signature),
            _ => Err(format!("unknown algorithm {s:?}, expected \"grv\" or \"signature\"")),
        }
    }
}
