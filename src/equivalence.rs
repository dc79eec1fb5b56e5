//! Bisimulation classes as a relation that can be coarsened and carried across minimization.
//!
//! A [`Partition`] is fixed once computed. An [`EquivalenceRelation`] can be joined further, and
//! a relation over the states of a minimized system can be pulled back onto the states of the
//! system it was built from.

use disjoint_sets::UnionFind;

use crate::Partition;

/// Equivalence relation over the states of one system.
#[derive(Debug, Clone)]
pub struct EquivalenceRelation {
    union: UnionFind,
}

impl EquivalenceRelation {
    /// The relation in which every state is only related to itself.
    pub fn identity(num_states: usize) -> Self {
        EquivalenceRelation { union: UnionFind::new(num_states) }
    }

    /// Relate two states if they have the same class.
    pub fn from_classes(classes: &[u32]) -> Self {
        let mut union = UnionFind::new(classes.len());
        // First state seen of every class
        let mut first = vec![None; classes.iter().max().map_or(0, |&c| c as usize + 1)];
        for (state, &class) in classes.iter().enumerate() {
            let slot = &mut first[class as usize];
            match *slot {
                Some(rep) => { union.union(rep, state); }
                None => *slot = Some(state),
            }
        }
        EquivalenceRelation { union }
    }

    /// Number of states the relation is defined on.
    #[inline]
    pub fn num_states(&self) -> usize {
        self.union.len()
    }

    #[inline]
    pub fn related(&self, a: u32, b: u32) -> bool {
        self.union.equiv(a as usize, b as usize)
    }

    /// Relate `a` and `b` and everything related to either of them.
    ///
    /// Returns `false` if they were already related.
    pub fn join(&mut self, a: u32, b: u32) -> bool {
        self.union.union(a as usize, b as usize)
    }

    /// The states grouped by class, ordered by their smallest member.
    pub fn classes(&self) -> Vec<Vec<u32>> {
        let mut index = vec![usize::MAX; self.num_states()];
        let mut classes: Vec<Vec<u32>> = Vec::new();
        for state in 0..self.num_states() {
            let root = self.union.find(state);
            if index[root] == usize::MAX {
                index[root] = classes.len();
                classes.push(Vec::new());
            }
            classes[index[root]].push(state as u32);
        }
        classes
    }

    pub fn num_classes(&self) -> usize {
        (0..self.num_states())
            .filter(|&s| self.union.find(s) == s)
            .count()
    }

    /// All states related to `state`, including itself.
    pub fn members_of(&self, state: u32) -> impl Iterator<Item = u32> + '_ {
        let root = self.union.find(state as usize);
        (0..self.num_states() as u32)
            .filter(move |&s| self.union.find(s as usize) == root)
    }

    /// Carry a relation over the action states of a minimized system back to the system it was
    /// minimized from.
    ///
    /// `partition` is the partition the minimization produced, so that action state `s` of the
    /// original system became state `partition.class_of(s)` of the minimized one.
    /// Two original states are related if their minimized states are.
    ///
    /// # Example
    ///
    /// ```
    /// use pbisim::{EquivalenceRelation, Partition};
    ///
    /// // States 0 and 2 were merged by minimization
    /// let partition = Partition::from_blocks(&[0, 1, 0, 2], &[]);
    /// // Further relate minimized states 1 and 2
    /// let mut relation = EquivalenceRelation::identity(3);
    /// relation.join(1, 2);
    ///
    /// let pulled = relation.pull_back(&partition);
    /// assert_eq!(pulled.classes(), vec![vec![0, 2], vec![1, 3]]);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `partition` has more classes than this relation has states.
    pub fn pull_back(&self, partition: &Partition) -> Self {
        self.pull_back_classes(partition.classes())
    }

    /// Like [`pull_back()`](Self::pull_back), for a relation over the probabilistic states of a
    /// minimized system.
    pub fn pull_back_probabilistic(&self, partition: &Partition) -> Self {
        self.pull_back_classes(partition.probabilistic_classes())
    }

    fn pull_back_classes(&self, classes: &[u32]) -> Self {
        let mut union = UnionFind::new(classes.len());
        // First original state that lands in the class of every minimized root
        let mut first = vec![None; self.num_states()];
        for (state, &class) in classes.iter().enumerate() {
            let root = self.union.find(class as usize);
            let slot = &mut first[root];
            match *slot {
                Some(rep) => { union.union(rep, state); }
                None => *slot = Some(state),
            }
        }
        EquivalenceRelation { union }
    }
}

impl From<&Partition> for EquivalenceRelation {
    fn from(partition: &Partition) -> Self {
        partition.relation()
    }
}
