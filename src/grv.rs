//! Probabilistic bisimulation in O(m log n).
//!
//! This is the partition refinement algorithm by J.F. Groote, H.J. Rivera Verduzco
//! and E.P. de Vink from "An O(m log n) algorithm for probabilistic bisimulation", 2018.
//! It refines two partitions at once: one of the action states and one of the
//! probabilistic states. Every block belongs to a constellation. Whenever a constellation
//! consists of more than one block, one of its blocks that holds at most half of its
//! states is split off into a constellation of its own and used as splitter for the
//! blocks of the other partition. Because a state can only be in such a small block
//! O(log n) times, the total work stays in O(m log n).
//!
//! All blocks are stable when no constellation has more than one block,
//! at which point the blocks are the bisimulation classes.

mod model;
mod scratch;


use std::mem;
use std::time::Instant;

use log::{debug, trace};
use num::One;

use crate::embedded_list::{EmbeddedList, move_back};
use crate::partition::Partition;
use crate::quotient::EquivalenceClasses;
use crate::ProbabilisticTransitionSystem;

use model::*;
use scratch::*;

/// Computes strong probabilistic bisimulation using the GRV algorithm.
///
/// The input must be valid, see [`ProbabilisticTransitionSystem::validate()`].
///
/// # Example
///
/// ```
/// use pbisim::{ProbabilisticTransitionSystem, Distribution, EquivalenceClasses, Transition};
/// use pbisim::grv::GrvPartitioner;
///
/// // Two states that both do `a` into distributions that end in the deadlock state 2.
/// let lts = ProbabilisticTransitionSystem::new(
///     3,
///     ["a"],
///     vec![Transition::new(0, 0, 0), Transition::new(1, 0, 1)],
///     vec![Distribution::dirac(2), Distribution::dirac(2)],
///     Distribution::dirac(0),
/// ).unwrap();
///
/// let partitioner = GrvPartitioner::new(&lts);
/// assert!(partitioner.in_same_class(0, 1));
/// assert!(!partitioner.in_same_class(0, 2));
/// assert!(partitioner.in_same_probabilistic_class(0, 1));
/// ```
#[derive(Debug, Clone)]
pub struct GrvPartitioner {
    model: Model,
    partition: Partition,
}

impl GrvPartitioner {
    pub fn new(lts: &ProbabilisticTransitionSystem) -> Self {
        debug!("Probabilistic bisimulation partitioner created for {} states, {} probabilistic states \
            and {} transitions", lts.num_states(), lts.num_probabilistic_states(), lts.transitions().len());
        let now = Instant::now();
        let mut refiner = Refiner::new(lts);
        refiner.refine();
        let partition = refiner.partition();
        debug!("Refined into {} action blocks and {} probabilistic blocks in {:.5}s",
            partition.num_classes(), partition.num_probabilistic_classes(), now.elapsed().as_secs_f64());
        GrvPartitioner {
            model: refiner.model,
            partition,
        }
    }

    /// The resulting partition.
    #[inline]
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn into_partition(self) -> Partition {
        self.partition
    }

    /// Total number of action blocks that were created during refinement.
    ///
    /// Since blocks are never merged or deleted, this equals the number of classes.
    pub fn action_blocks_created(&self) -> usize {
        self.model.action_blocks.len()
    }

    /// Total number of probabilistic blocks that were created during refinement.
    pub fn probabilistic_blocks_created(&self) -> usize {
        self.model.probabilistic_blocks.len()
    }
}

impl EquivalenceClasses for GrvPartitioner {
    fn num_classes(&self) -> usize {
        self.partition.num_classes()
    }

    fn num_probabilistic_classes(&self) -> usize {
        self.partition.num_probabilistic_classes()
    }

    fn class_of(&self, state: u32) -> u32 {
        self.partition.class_of(state)
    }

    fn probabilistic_class_of(&self, distribution: u32) -> u32 {
        self.partition.probabilistic_class_of(distribution)
    }
}

struct Refiner {
    model: Model,
    scratch: Scratch,
}

impl Refiner {
    /// Build the initial partition.
    ///
    /// All probabilistic states start out in one block.
    /// Action states are split by the set of labels they can perform.
    fn new(lts: &ProbabilisticTransitionSystem) -> Self {
        let n_states = lts.num_states() as usize;
        let n_probabilistic = lts.num_probabilistic_states() as usize;
        let n_labels = lts.num_action_labels() as usize;

        let mut model = Model {
            action_states: vec![ActionState::default(); n_states],
            probabilistic_states: vec![ProbabilisticState::default(); n_probabilistic],
            ..Default::default()
        };
        let mut scratch = Scratch::new(n_states, n_probabilistic, n_labels);

        for (i, t) in lts.transitions().iter().enumerate() {
            model.action_transitions.push(ActionTransition::new(t.from as usize, t.label as usize, t.to as usize));
            model.probabilistic_states[t.to as usize].incoming.push(i);
        }
        for (d, distribution) in lts.distributions().iter().enumerate() {
            for (state, probability) in distribution.pairs() {
                let i = model.probabilistic_transitions.len();
                model.probabilistic_transitions.push(
                    ProbabilisticTransition::new(d, probability.clone(), *state as usize));
                model.action_states[*state as usize].incoming.push(i);
            }
        }
        for t in 0..model.action_transitions.len() {
            scratch.buckets.add(&mut model.action_transitions, t);
        }

        let mut all_states = EmbeddedList::new();
        for s in 0..n_states {
            all_states.push_back(&mut model.action_states, s);
        }
        model.action_blocks.push(ActionBlock::new(0, all_states));

        let mut refiner = Refiner { model, scratch };
        refiner.refine_initial_action_block();
        let Refiner { model, scratch } = &mut refiner;

        // Constellations that contain everything
        let mut action_constellation = Constellation { blocks: EmbeddedList::new(), size: n_states };
        for b in 0..model.action_blocks.len() {
            action_constellation.blocks.push_back(&mut model.action_blocks, b);
        }
        let action_trivial = action_constellation.blocks.len() <= 1;
        model.action_constellations.push(action_constellation);

        let mut all_probabilistic = EmbeddedList::new();
        for d in 0..n_probabilistic {
            all_probabilistic.push_back(&mut model.probabilistic_states, d);
        }
        model.probabilistic_blocks.push(ProbabilisticBlock::new(0, all_probabilistic));
        let mut probabilistic_constellation = Constellation { blocks: EmbeddedList::new(), size: n_probabilistic };
        probabilistic_constellation.blocks.push_back(&mut model.probabilistic_blocks, 0);
        model.probabilistic_constellations.push(probabilistic_constellation);

        // All transitions with the same source and label share one counter,
        // as there is only one probabilistic constellation.
        let mut slot: Vec<Option<usize>> = vec![None; n_states];
        for label in 0..n_labels {
            let bucket = scratch.buckets.bucket(label);
            let mut cursor = bucket.front();
            while let Some(t) = cursor {
                cursor = EmbeddedList::next_of(&model.action_transitions, t);
                let from = model.action_transitions[t].from;
                let counter = *slot[from].get_or_insert_with(|| {
                    model.counts.push(0);
                    model.counts.len() - 1
                });
                model.counts[counter] += 1;
                model.action_transitions[t].count = counter;
            }
            for t in bucket.iter(&model.action_transitions) {
                slot[model.action_transitions[t].from] = None;
            }
        }

        // The buckets hold all transitions grouped by label,
        // which is the order the incoming list of a probabilistic block needs.
        let mut incoming = EmbeddedList::new();
        scratch.buckets.drain_into(&mut model.action_transitions, &mut incoming);
        model.probabilistic_blocks[0].incoming = incoming;

        for t in 0..model.probabilistic_transitions.len() {
            let block = model.action_states[model.probabilistic_transitions[t].to].block;
            model.action_blocks[block].incoming.push_back(&mut model.probabilistic_transitions, t);
        }

        if !action_trivial {
            model.action_work.push(0);
        }
        refiner
    }

    /// Split the single initial action block by the labels that states can perform,
    /// one label after the other.
    fn refine_initial_action_block(&mut self) {
        let Refiner { model, scratch } = self;
        for label in 0..scratch.buckets.n_labels() {
            let bucket = scratch.buckets.bucket(label);
            scratch.walk.clear();
            scratch.walk.extend(bucket.iter(&model.action_transitions)
                .map(|t| model.action_transitions[t].from));
            scratch.grow(model.action_blocks.len(), model.probabilistic_blocks.len());
            scratch.action_marks.clear();

            for &s in &scratch.walk {
                if scratch.action_marked[s] {
                    continue;
                }
                scratch.action_marked[s] = true;
                let block = model.action_states[s].block;
                let mark = match scratch.action_marking[block] {
                    Some(mark) => mark,
                    None => {
                        scratch.action_marks.push(ActionMark::new(block, EmbeddedList::new()));
                        scratch.action_marking[block] = Some(scratch.action_marks.len() - 1);
                        scratch.action_marks.len() - 1
                    }
                };
                move_back(&mut model.action_states, s,
                    &mut model.action_blocks[block].states, &mut scratch.action_marks[mark].left);
            }

            for mark in &mut scratch.action_marks {
                let block = &mut model.action_blocks[mark.block];
                if block.states.is_empty() {
                    // Every state of the block can do this label
                    block.states = mark.left.take();
                } else {
                    let new_block = model.action_blocks.len();
                    let mut cursor = mark.left.front();
                    while let Some(s) = cursor {
                        cursor = EmbeddedList::next_of(&model.action_states, s);
                        model.action_states[s].block = new_block;
                    }
                    model.action_blocks.push(ActionBlock::new(0, mark.left.take()));
                }
                scratch.action_marking[mark.block] = None;
            }

            for &s in &scratch.walk {
                scratch.action_marked[s] = false;
            }
        }
    }

    fn refine(&mut self) {
        while !(self.model.action_work.is_empty() && self.model.probabilistic_work.is_empty()) {
            // Recounting every round is quadratic, so only unit tests do it
            #[cfg(test)]
            self.assert_consistent();

            if let Some(constellation) = self.model.action_work.pop() {
                self.split_by_action_constellation(constellation);
            }
            if let Some(constellation) = self.model.probabilistic_work.pop() {
                self.split_by_probabilistic_constellation(constellation);
            }
        }
        #[cfg(debug_assertions)]
        self.assert_consistent();
    }

    /// Refine the probabilistic blocks with a splitter from the action constellation.
    fn split_by_action_constellation(&mut self, constellation: usize) {
        let splitter = self.model.choose_action_splitter(constellation);
        trace!("Splitting probabilistic blocks by action block {splitter} with {} states",
            self.model.action_blocks[splitter].states.len());
        self.mark_probabilistic(splitter);

        let mut marks = mem::take(&mut self.scratch.probabilistic_marks);
        for mark in &mut marks {
            let block = mark.block;
            let large = mark.large;
            self.model.probabilistic_blocks[block].states = mark.group_mut(large).take();
            trace!("Probabilistic block {block}: {} left, {} middle groups, {} right",
                mark.left.len(), mark.middle.len(), mark.right.len());

            let buckets = &mut self.scratch.buckets;
            for group in [&mut mark.left, &mut mark.right].into_iter().chain(mark.middle.iter_mut()) {
                if !group.is_empty() {
                    self.model.split_probabilistic_block(block, group, buckets);
                }
            }
        }
        marks.clear();
        self.scratch.probabilistic_marks = marks;
    }

    /// Mark the probabilistic blocks that can reach the action block `splitter` and
    /// divide their states by the probability with which they reach it.
    fn mark_probabilistic(&mut self, splitter: usize) {
        let Refiner { model, scratch } = self;
        scratch.grow(model.action_blocks.len(), model.probabilistic_blocks.len());
        scratch.probabilistic_marks.clear();

        let incoming = model.action_blocks[splitter].incoming;
        for pt in incoming.iter(&model.probabilistic_transitions) {
            let transition = &model.probabilistic_transitions[pt];
            let s = transition.from;
            let block = model.probabilistic_states[s].block;
            let mark = match scratch.probabilistic_marking[block] {
                Some(mark) => mark,
                None => {
                    // Until shown otherwise, no state reaches the splitter
                    let states = model.probabilistic_blocks[block].states.take();
                    scratch.probabilistic_marks.push(ProbabilisticMark::new(block, states));
                    scratch.probabilistic_marking[block] = Some(scratch.probabilistic_marks.len() - 1);
                    scratch.probabilistic_marks.len() - 1
                }
            };
            if scratch.probabilistic_marked[s] {
                scratch.cumulative[s] += &transition.probability;
            } else {
                scratch.probabilistic_marked[s] = true;
                scratch.cumulative[s] = transition.probability.clone();
                let mark = &mut scratch.probabilistic_marks[mark];
                move_back(&mut model.probabilistic_states, s, &mut mark.right, &mut mark.left);
            }
        }

        for mark in &mut scratch.probabilistic_marks {
            // States reaching the splitter with probability 1 stay in left,
            // all others are grouped by their probability.
            let mut pending = mark.left.take();
            scratch.by_probability.clear();
            let mut cursor = pending.front();
            while let Some(s) = cursor {
                cursor = EmbeddedList::next_of(&model.probabilistic_states, s);
                if scratch.cumulative[s].is_one() {
                    move_back(&mut model.probabilistic_states, s, &mut pending, &mut mark.left);
                } else {
                    scratch.by_probability.push((scratch.cumulative[s].clone(), s));
                }
                scratch.probabilistic_marked[s] = false;
            }

            scratch.by_probability.sort_unstable();
            for (i, (probability, s)) in scratch.by_probability.iter().enumerate() {
                if i == 0 || *probability != scratch.by_probability[i - 1].0 {
                    mark.middle.push(EmbeddedList::new());
                }
                let group = mark.middle.len() - 1;
                move_back(&mut model.probabilistic_states, *s, &mut pending, &mut mark.middle[group]);
            }
            debug_assert!(pending.is_empty());

            mark.find_large();
            scratch.probabilistic_marking[mark.block] = None;
        }
    }

    /// Refine the action blocks with a splitter from the probabilistic constellation,
    /// one label at a time.
    fn split_by_probabilistic_constellation(&mut self, constellation: usize) {
        let splitter = self.model.choose_probabilistic_splitter(constellation);
        trace!("Splitting action blocks by probabilistic block {splitter} with {} states",
            self.model.probabilistic_blocks[splitter].states.len());

        // Splitting action blocks leaves the incoming transitions of the splitter untouched
        let incoming = self.model.probabilistic_blocks[splitter].incoming;
        let mut walk = mem::take(&mut self.scratch.walk);
        walk.clear();
        walk.extend(incoming.iter(&self.model.action_transitions));

        let mut start = 0;
        while start < walk.len() {
            let label = self.model.action_transitions[walk[start]].label;
            let len = walk[start..].iter()
                .take_while(|&&t| self.model.action_transitions[t].label == label)
                .count();
            let end = start + len;
            self.mark_action(&walk[start..end]);
            self.split_action_marks();
            start = end;
        }
        self.scratch.walk = walk;
    }

    /// Mark the action blocks containing a source of the transitions in `group`,
    /// which all have the same label and lead into the splitter.
    fn mark_action(&mut self, group: &[usize]) {
        let Refiner { model, scratch } = self;
        scratch.grow(model.action_blocks.len(), model.probabilistic_blocks.len());
        scratch.action_marks.clear();

        for &t in group {
            let s = model.action_transitions[t].from;
            let block = model.action_states[s].block;
            let mark = match scratch.action_marking[block] {
                Some(mark) => mark,
                None => {
                    let states = model.action_blocks[block].states.take();
                    scratch.action_marks.push(ActionMark::new(block, states));
                    scratch.action_marking[block] = Some(scratch.action_marks.len() - 1);
                    scratch.action_marks.len() - 1
                }
            };
            if !scratch.action_marked[s] {
                scratch.action_marked[s] = true;
                scratch.residual[s] = model.counts[model.action_transitions[t].count];
                let mark = &mut scratch.action_marks[mark];
                move_back(&mut model.action_states, s, &mut mark.right, &mut mark.left);
            }
            scratch.residual[s] -= 1;
        }

        // A residual count above zero means the state can also reach the rest of
        // the old constellation
        for mark in &mut scratch.action_marks {
            let mut cursor = mark.left.front();
            while let Some(s) = cursor {
                cursor = EmbeddedList::next_of(&model.action_states, s);
                if scratch.residual[s] > 0 {
                    move_back(&mut model.action_states, s, &mut mark.left, &mut mark.middle);
                }
                scratch.action_marked[s] = false;
            }
            mark.find_large();
            scratch.action_marking[mark.block] = None;
        }

        // Transitions into the splitter from states in middle get a counter of their own.
        // The old counter now only counts the transitions into the rest of the constellation.
        for &t in group {
            let s = model.action_transitions[t].from;
            let residual = scratch.residual[s];
            if residual == 0 {
                continue;
            }
            let old_slot = model.action_transitions[t].count;
            let old = model.counts[old_slot];
            if old != residual {
                // First transition of this state
                model.counts[old_slot] = residual;
                model.counts.push(old - residual);
                scratch.count_slot[s] = model.counts.len() - 1;
            }
            model.action_transitions[t].count = scratch.count_slot[s];
        }
    }

    fn split_action_marks(&mut self) {
        let mut marks = mem::take(&mut self.scratch.action_marks);
        for mark in &mut marks {
            let block = mark.block;
            let large = mark.large;
            self.model.action_blocks[block].states = mark.group_mut(large).take();
            trace!("Action block {block}: {} left, {} middle, {} right",
                mark.left.len(), mark.middle.len(), mark.right.len());

            for group in [&mut mark.left, &mut mark.right, &mut mark.middle] {
                if !group.is_empty() {
                    self.model.split_action_block(block, group);
                }
            }
        }
        marks.clear();
        self.scratch.action_marks = marks;
    }

    fn partition(&self) -> Partition {
        let action_blocks: Vec<usize> = self.model.action_states.iter()
            .map(|s| s.block)
            .collect();
        let probabilistic_blocks: Vec<usize> = self.model.probabilistic_states.iter()
            .map(|s| s.block)
            .collect();
        Partition::from_blocks(&action_blocks, &probabilistic_blocks)
    }

    #[cfg(any(test, debug_assertions))]
    fn assert_consistent(&self) {
        if let Err(msg) = self.model.check() {
            panic!("Inconsistent refinement data: {msg}");
        }
        assert!(self.scratch.is_clean(), "Marking was not reset");
    }
}
