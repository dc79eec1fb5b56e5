// Transient data of the mark and split phases.
//
// All of this is only meaningful during a single mark/split step. It is kept
// out of the long-lived model, allocated once per refinement and cleared again
// by every phase that uses it.

use num::Zero;

use crate::embedded_list::EmbeddedList;
use crate::Probability;

use super::model::ActionTransition;

/// Which of the groups of a marked block keeps the original block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Group {
    Left,
    Middle(usize),
    Right,
}

/// Marking of an action block while splitting by a probabilistic splitter.
///
/// `left` can only reach the splitter, `middle` reaches the splitter and the rest
/// of its old constellation, `right` does not reach the splitter.
#[derive(Debug, Clone)]
pub(crate) struct ActionMark {
    pub block: usize,
    pub left: EmbeddedList,
    pub middle: EmbeddedList,
    pub right: EmbeddedList,
    pub large: Group,
}

impl ActionMark {
    pub fn new(block: usize, states: EmbeddedList) -> Self {
        ActionMark {
            block,
            left: EmbeddedList::new(),
            middle: EmbeddedList::new(),
            right: states,
            large: Group::Right,
        }
    }

    pub fn group_mut(&mut self, group: Group) -> &mut EmbeddedList {
        match group {
            Group::Left => &mut self.left,
            Group::Middle(_) => &mut self.middle,
            Group::Right => &mut self.right,
        }
    }

    /// Point `large` at the group with the most states.
    pub fn find_large(&mut self) {
        self.large = Group::Right;
        let mut largest = self.right.len();
        if self.left.len() > largest {
            self.large = Group::Left;
            largest = self.left.len();
        }
        if self.middle.len() > largest {
            self.large = Group::Middle(0);
        }
    }
}

/// Marking of a probabilistic block while splitting by an action splitter.
///
/// `left` reaches the splitter with probability 1, each list in `middle` holds the states
/// reaching it with one other probability, `right` does not reach the splitter.
#[derive(Debug, Clone)]
pub(crate) struct ProbabilisticMark {
    pub block: usize,
    pub left: EmbeddedList,
    pub middle: Vec<EmbeddedList>,
    pub right: EmbeddedList,
    pub large: Group,
}

impl ProbabilisticMark {
    pub fn new(block: usize, states: EmbeddedList) -> Self {
        ProbabilisticMark {
            block,
            left: EmbeddedList::new(),
            middle: Vec::new(),
            right: states,
            large: Group::Right,
        }
    }

    pub fn group_mut(&mut self, group: Group) -> &mut EmbeddedList {
        match group {
            Group::Left => &mut self.left,
            Group::Middle(i) => &mut self.middle[i],
            Group::Right => &mut self.right,
        }
    }

    pub fn find_large(&mut self) {
        self.large = Group::Right;
        let mut largest = self.right.len();
        if self.left.len() > largest {
            self.large = Group::Left;
            largest = self.left.len();
        }
        for (i, middle) in self.middle.iter().enumerate() {
            if middle.len() > largest {
                self.large = Group::Middle(i);
                largest = middle.len();
            }
        }
    }
}

/// Groups action transitions by label in time linear in the number of transitions.
///
/// Labels have a limited range, so there is one list per label,
/// plus a stack of the labels whose list is currently non-empty.
#[derive(Debug, Clone, Default)]
pub(crate) struct LabelBuckets {
    lists: Vec<EmbeddedList>,
    occupied: Vec<usize>,
}

impl LabelBuckets {
    pub fn new(n_labels: usize) -> Self {
        LabelBuckets {
            lists: vec![EmbeddedList::new(); n_labels],
            occupied: Vec::new(),
        }
    }

    /// Add transition `t`, which must not be a member of any list.
    pub fn add(&mut self, transitions: &mut [ActionTransition], t: usize) {
        let label = transitions[t].label;
        if self.lists[label].is_empty() {
            self.occupied.push(label);
        }
        self.lists[label].push_back(transitions, t);
    }

    pub fn bucket(&self, label: usize) -> EmbeddedList {
        self.lists[label]
    }

    pub fn n_labels(&self) -> usize {
        self.lists.len()
    }

    /// Append all collected transitions to `dest`, one label after the other,
    /// and leave all buckets empty.
    pub fn drain_into(&mut self, transitions: &mut [ActionTransition], dest: &mut EmbeddedList) {
        while let Some(label) = self.occupied.pop() {
            dest.append(transitions, &mut self.lists[label]);
        }
    }
}

/// Per-phase auxiliary arrays, indexed by state or block.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scratch {
    pub action_marked: Vec<bool>,
    /// Transitions into the rest of the old constellation, see `mark_action()`
    pub residual: Vec<usize>,
    /// New counter slot of a state whose transitions into the splitter got their own counter
    pub count_slot: Vec<usize>,
    pub probabilistic_marked: Vec<bool>,
    /// Probability to reach the splitter
    pub cumulative: Vec<Probability>,

    // Index into `action_marks`/`probabilistic_marks` per block, if the block is marked
    pub action_marking: Vec<Option<usize>>,
    pub probabilistic_marking: Vec<Option<usize>>,
    pub action_marks: Vec<ActionMark>,
    pub probabilistic_marks: Vec<ProbabilisticMark>,

    // Reused buffers
    pub by_probability: Vec<(Probability, usize)>,
    pub walk: Vec<usize>,
    pub buckets: LabelBuckets,
}

impl Scratch {
    pub fn new(n_states: usize, n_probabilistic_states: usize, n_labels: usize) -> Self {
        Scratch {
            action_marked: vec![false; n_states],
            residual: vec![0; n_states],
            count_slot: vec![0; n_states],
            probabilistic_marked: vec![false; n_probabilistic_states],
            cumulative: vec![Probability::zero(); n_probabilistic_states],
            buckets: LabelBuckets::new(n_labels),
            ..Default::default()
        }
    }

    /// Make room for the marking of blocks created since the last phase.
    pub fn grow(&mut self, n_action_blocks: usize, n_probabilistic_blocks: usize) {
        self.action_marking.resize(n_action_blocks, None);
        self.probabilistic_marking.resize(n_probabilistic_blocks, None);
    }

    /// Whether all marking information has been reset.
    #[cfg(any(test, debug_assertions))]
    pub fn is_clean(&self) -> bool {
        self.action_marked.iter().all(|m| !m)
            && self.probabilistic_marked.iter().all(|m| !m)
            && self.action_marking.iter().all(Option::is_none)
            && self.probabilistic_marking.iter().all(Option::is_none)
    }
}
