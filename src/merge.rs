use log::debug;
use rustc_hash::FxHashMap;

use crate::{Error, ProbabilisticTransitionSystem, Result, Transition};

fn label_indices(labels: &[String]) -> Result<FxHashMap<String, u32>> {
    let mut indices = FxHashMap::default();
    for (i, label) in labels.iter().enumerate() {
        if indices.insert(label.clone(), i as u32).is_some() {
            return Err(Error::DuplicateLabel(label.clone()));
        }
    }
    Ok(indices)
}

impl ProbabilisticTransitionSystem {
    /// Add all states and transitions of `other` to this system, next to the existing ones.
    ///
    /// Labels are identified by name; labels that only `other` has are appended.
    /// The states of `other` are numbered after the states of `self`.
    /// The initial distributions of both systems are added as the last two
    /// probabilistic states and their indices are returned.
    /// The initial distribution of `self` stays unchanged.
    ///
    /// # Errors
    ///
    /// Fails if a label name occurs more than once in one of the systems.
    /// In that case `self` is not modified.
    ///
    /// # Example
    ///
    /// ```
    /// use pbisim::{ProbabilisticTransitionSystem, Distribution, Transition};
    ///
    /// let mut lts = ProbabilisticTransitionSystem::new(
    ///     1, ["a"], vec![Transition::new(0, 0, 0)], vec![Distribution::dirac(0)], Distribution::dirac(0),
    /// ).unwrap();
    /// let other = ProbabilisticTransitionSystem::new(
    ///     2, ["b", "a"], vec![Transition::new(1, 1, 0)], vec![Distribution::dirac(0)], Distribution::dirac(1),
    /// ).unwrap();
    ///
    /// assert_eq!(lts.merge(&other).unwrap(), (2, 3));
    /// assert_eq!(lts.num_states(), 3);
    /// assert_eq!(lts.labels(), &["a", "b"]);
    /// // The `a` transition of `other` has been renumbered
    /// assert_eq!(lts.transitions()[1], Transition::new(2, 0, 1));
    /// assert_eq!(lts.probabilistic_state(3), &Distribution::dirac(2));
    /// ```
    pub fn merge(&mut self, other: &ProbabilisticTransitionSystem) -> Result<(u32, u32)> {
        let mut indices = label_indices(&self.labels)?;
        label_indices(&other.labels)?;

        let label_map: Vec<u32> = other.labels.iter()
            .map(|label| {
                let next = indices.len() as u32;
                *indices.entry(label.clone()).or_insert_with(|| {
                    self.labels.push(label.clone());
                    next
                })
            })
            .collect();

        let state_offset = self.num_states;
        let distribution_offset = self.num_probabilistic_states();
        self.transitions.extend(other.transitions.iter()
            .map(|t| Transition::new(
                t.from + state_offset,
                label_map[t.label as usize],
                t.to + distribution_offset,
            )));
        self.distributions.extend(other.distributions.iter()
            .map(|d| d.shift(state_offset)));
        self.num_states += other.num_states;

        let initial = self.num_probabilistic_states();
        self.distributions.push(self.initial.clone());
        self.distributions.push(other.initial.shift(state_offset));
        debug!("Merged systems into {} states and {} probabilistic states",
            self.num_states, self.distributions.len());
        Ok((initial, initial + 1))
    }
}
