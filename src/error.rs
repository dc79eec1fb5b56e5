use std::{fmt, error, result};

use crate::Probability;

/// Reasons why a probabilistic transition system or a partition is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A transition starts in a state that does not exist.
    SourceOutOfRange { transition: usize, state: u32 },
    /// A transition carries a label outside of the label alphabet.
    LabelOutOfRange { transition: usize, label: u32 },
    /// A transition leads to a probabilistic state that does not exist.
    TargetOutOfRange { transition: usize, distribution: u32 },
    /// A distribution refers to an action state that does not exist.
    /// `distribution` is `None` for the initial distribution.
    DanglingState { distribution: Option<u32>, state: u32 },
    EmptyDistribution { distribution: Option<u32> },
    NonPositiveProbability { distribution: Option<u32> },
    /// The probabilities of a distribution do not add up to exactly 1.
    NotNormalized { distribution: Option<u32>, sum: Probability },
    /// A label name occurs more than once in one alphabet.
    DuplicateLabel(String),
    /// The classes of a partition are not numbered densely by first occurrence.
    NonCanonicalClass { probabilistic: bool, state: u32, class: u32 },
    /// A partition states a different number of classes than its states use.
    ClassCountMismatch { probabilistic: bool, stated: usize, used: usize },
}

fn kind(probabilistic: bool) -> &'static str {
    if probabilistic { "probabilistic" } else { "action" }
}

struct Which(Option<u32>);

impl fmt::Display for Which {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(d) => write!(f, "distribution {d}"),
            None => write!(f, "initial distribution"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SourceOutOfRange { transition, state } =>
                write!(f, "transition {transition} starts in nonexistent state {state}"),
            Error::LabelOutOfRange { transition, label } =>
                write!(f, "transition {transition} has unknown label {label}"),
            Error::TargetOutOfRange { transition, distribution } =>
                write!(f, "transition {transition} leads to nonexistent distribution {distribution}"),
            Error::DanglingState { distribution, state } =>
                write!(f, "{} refers to nonexistent state {state}", Which(*distribution)),
            Error::EmptyDistribution { distribution } =>
                write!(f, "{} is empty", Which(*distribution)),
            Error::NonPositiveProbability { distribution } =>
                write!(f, "{} contains a probability that is not positive", Which(*distribution)),
            Error::NotNormalized { distribution, sum } =>
                write!(f, "probabilities of {} sum up to {sum} instead of 1", Which(*distribution)),
            Error::DuplicateLabel(name) => write!(f, "label {name:?} occurs more than once"),
            Error::NonCanonicalClass { probabilistic, state, class } =>
                write!(f, "{} state {state} has class {class}, which is not numbered by first occurrence",
                    kind(*probabilistic)),
            Error::ClassCountMismatch { probabilistic, stated, used } =>
                write!(f, "partition states {stated} {} classes but uses {used}", kind(*probabilistic)),
        }
    }
}

impl error::Error for Error {}

/// Type alias for `Result<T, pbisim::Error>`
pub type Result<T> = result::Result<T, Error>;
