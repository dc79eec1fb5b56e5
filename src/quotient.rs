//! Building the minimized system from bisimulation classes.

use std::collections::BTreeSet;

use crate::{Distribution, ProbabilisticTransitionSystem, Transition};

/// Access to the bisimulation classes of action states and probabilistic states.
///
/// Classes of either kind are numbered `0..num_classes()` and `0..num_probabilistic_classes()`.
/// The provided methods build the quotient system in which every class is collapsed into one
/// state.
pub trait EquivalenceClasses {
    /// Number of classes of action states.
    fn num_classes(&self) -> usize;

    /// Number of classes of probabilistic states.
    fn num_probabilistic_classes(&self) -> usize;

    /// Class of the action state `state`.
    fn class_of(&self, state: u32) -> u32;

    /// Class of the probabilistic state `distribution`.
    fn probabilistic_class_of(&self, distribution: u32) -> u32;

    fn in_same_class(&self, s: u32, t: u32) -> bool {
        self.class_of(s) == self.class_of(t)
    }

    fn in_same_probabilistic_class(&self, d: u32, e: u32) -> bool {
        self.probabilistic_class_of(d) == self.probabilistic_class_of(e)
    }

    /// The transitions of `lts` with source and target replaced by their classes.
    ///
    /// Transitions that become identical are only kept once.
    /// The result is sorted.
    fn replace_transitions(&self, lts: &ProbabilisticTransitionSystem) -> Vec<Transition> {
        let transitions: BTreeSet<Transition> = lts.transitions().iter()
            .map(|t| Transition::new(self.class_of(t.from), t.label, self.probabilistic_class_of(t.to)))
            .collect();
        transitions.into_iter().collect()
    }

    /// One distribution per probabilistic class, over the classes of action states,
    /// followed by the initial distribution over classes.
    ///
    /// Bisimilar probabilistic states reach every class with the same probability,
    /// so each class is represented by its first member.
    fn replace_probabilistic_states(
        &self,
        lts: &ProbabilisticTransitionSystem,
    ) -> (Vec<Distribution>, Distribution) {
        let mut distributions: Vec<Option<Distribution>> = vec![None; self.num_probabilistic_classes()];
        for (d, distribution) in lts.distributions().iter().enumerate() {
            let class = &mut distributions[self.probabilistic_class_of(d as u32) as usize];
            if class.is_none() {
                *class = Some(distribution.lift(|s| self.class_of(s)));
            }
        }
        let initial = lts.initial_probabilistic_state().lift(|s| self.class_of(s));
        (distributions.into_iter().flatten().collect(), initial)
    }

    /// The quotient of `lts` by these classes.
    ///
    /// Action state `i` of the result stands for class `i`, likewise for probabilistic states.
    fn quotient(&self, lts: &ProbabilisticTransitionSystem) -> ProbabilisticTransitionSystem {
        let transitions = self.replace_transitions(lts);
        let (distributions, initial) = self.replace_probabilistic_states(lts);
        ProbabilisticTransitionSystem::from_parts_unchecked(
            self.num_classes() as u32,
            lts.labels().to_vec(),
            transitions,
            distributions,
            initial,
        )
    }
}
