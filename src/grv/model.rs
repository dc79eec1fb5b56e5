// Long-lived data of the refinement: states, transitions, blocks and constellations.
//
// Everything is kept in `Vec` arenas and referred to by index. Nodes that are
// members of embedded lists carry their own `Links`. Nothing in here is ever
// deleted; blocks and constellations are only created by splitting.

use crate::embedded_list::{EmbeddedList, Linked, Links, move_back};
use crate::Probability;

use super::scratch::LabelBuckets;

macro_rules! impl_linked {
    ( $( $t:ty ),* ) => {
        $(
            impl Linked for $t {
                #[inline]
                fn links(&self) -> &Links {
                    &self.links
                }
                #[inline]
                fn links_mut(&mut self) -> &mut Links {
                    &mut self.links
                }
            }
        )*
    };
}

impl_linked!(ActionTransition, ProbabilisticTransition, ActionState, ProbabilisticState,
    ActionBlock, ProbabilisticBlock);

/// `from --label--> to`, where `to` is a probabilistic state.
#[derive(Debug, Clone)]
pub(crate) struct ActionTransition {
    links: Links,
    pub from: usize,
    pub label: usize,
    pub to: usize,
    /// Slot in `Model::counts` holding the number of transitions from `from` labeled `label`
    /// into the constellation of `to`. Shared by all of these transitions.
    pub count: usize,
}

/// Probabilistic state `from` reaches action state `to` with `probability`.
#[derive(Debug, Clone)]
pub(crate) struct ProbabilisticTransition {
    links: Links,
    pub from: usize,
    pub probability: Probability,
    pub to: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ActionState {
    links: Links,
    pub block: usize,
    /// Incoming probabilistic transitions
    pub incoming: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ProbabilisticState {
    links: Links,
    pub block: usize,
    /// Incoming action transitions
    pub incoming: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ActionBlock {
    links: Links,
    pub constellation: usize,
    pub states: EmbeddedList,
    pub incoming: EmbeddedList,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ProbabilisticBlock {
    links: Links,
    pub constellation: usize,
    pub states: EmbeddedList,
    /// Incoming action transitions, grouped by label
    pub incoming: EmbeddedList,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Constellation {
    pub blocks: EmbeddedList,
    /// Number of states in all blocks of this constellation
    pub size: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Model {
    pub action_transitions: Vec<ActionTransition>,
    pub probabilistic_transitions: Vec<ProbabilisticTransition>,
    pub action_states: Vec<ActionState>,
    pub probabilistic_states: Vec<ProbabilisticState>,
    pub action_blocks: Vec<ActionBlock>,
    pub probabilistic_blocks: Vec<ProbabilisticBlock>,
    pub action_constellations: Vec<Constellation>,
    pub probabilistic_constellations: Vec<Constellation>,
    /// Storage for the counters of `ActionTransition::count`.
    pub counts: Vec<usize>,

    // Non-trivial constellations. Used as stacks.
    pub action_work: Vec<usize>,
    pub probabilistic_work: Vec<usize>,
}

impl ActionTransition {
    pub fn new(from: usize, label: usize, to: usize) -> Self {
        ActionTransition { links: Links::default(), from, label, to, count: 0 }
    }
}

impl ProbabilisticTransition {
    pub fn new(from: usize, probability: Probability, to: usize) -> Self {
        ProbabilisticTransition { links: Links::default(), from, probability, to }
    }
}

impl ActionBlock {
    pub fn new(constellation: usize, states: EmbeddedList) -> Self {
        ActionBlock { constellation, states, ..Default::default() }
    }
}

impl ProbabilisticBlock {
    pub fn new(constellation: usize, states: EmbeddedList) -> Self {
        ProbabilisticBlock { constellation, states, ..Default::default() }
    }
}

impl Model {
    /// Move `states`, a subset of the members of `block`, into a new block of the same
    /// constellation.
    ///
    /// If the constellation was trivial before, it is pushed onto the action work stack.
    /// Returns the index of the new block.
    pub fn split_action_block(&mut self, block: usize, states: &mut EmbeddedList) -> usize {
        let new_block = self.action_blocks.len();
        let constellation = self.action_blocks[block].constellation;
        self.action_blocks.push(ActionBlock::new(constellation, states.take()));

        let mut old_incoming = self.action_blocks[block].incoming;
        let mut new_incoming = EmbeddedList::new();
        let mut cursor = self.action_blocks[new_block].states.front();
        while let Some(s) = cursor {
            cursor = EmbeddedList::next_of(&self.action_states, s);
            let state = &mut self.action_states[s];
            state.block = new_block;
            for &t in &state.incoming {
                move_back(&mut self.probabilistic_transitions, t, &mut old_incoming, &mut new_incoming);
            }
        }
        self.action_blocks[block].incoming = old_incoming;
        self.action_blocks[new_block].incoming = new_incoming;

        let parent = &mut self.action_constellations[constellation];
        parent.blocks.push_back(&mut self.action_blocks, new_block);
        if parent.blocks.len() == 2 {
            self.action_work.push(constellation);
        }
        new_block
    }

    /// Move `states`, a subset of the members of `block`, into a new block of the same
    /// constellation.
    ///
    /// The incoming transitions of the moved states are regrouped by label using `buckets`.
    /// If the constellation was trivial before, it is pushed onto the probabilistic work stack.
    /// Returns the index of the new block.
    pub fn split_probabilistic_block(
        &mut self,
        block: usize,
        states: &mut EmbeddedList,
        buckets: &mut LabelBuckets,
    ) -> usize {
        let new_block = self.probabilistic_blocks.len();
        let constellation = self.probabilistic_blocks[block].constellation;
        self.probabilistic_blocks.push(ProbabilisticBlock::new(constellation, states.take()));

        let mut old_incoming = self.probabilistic_blocks[block].incoming;
        let mut cursor = self.probabilistic_blocks[new_block].states.front();
        while let Some(s) = cursor {
            cursor = EmbeddedList::next_of(&self.probabilistic_states, s);
            let state = &mut self.probabilistic_states[s];
            state.block = new_block;
            for &t in &state.incoming {
                old_incoming.erase(&mut self.action_transitions, t);
                buckets.add(&mut self.action_transitions, t);
            }
        }
        self.probabilistic_blocks[block].incoming = old_incoming;
        let mut new_incoming = EmbeddedList::new();
        buckets.drain_into(&mut self.action_transitions, &mut new_incoming);
        self.probabilistic_blocks[new_block].incoming = new_incoming;

        let parent = &mut self.probabilistic_constellations[constellation];
        parent.blocks.push_back(&mut self.probabilistic_blocks, new_block);
        if parent.blocks.len() == 2 {
            self.probabilistic_work.push(constellation);
        }
        new_block
    }

    /// Take a block with at most half of the states out of the non-trivial constellation
    /// `constellation` and put it into a new constellation of its own.
    ///
    /// The remainder is pushed back onto the work stack if it is still non-trivial.
    pub fn choose_action_splitter(&mut self, constellation: usize) -> usize {
        let c = &mut self.action_constellations[constellation];
        debug_assert!(c.blocks.len() >= 2, "splitter taken from a trivial constellation");
        let mut splitter = c.blocks.front().expect("non-trivial constellation has blocks");
        if self.action_blocks[splitter].states.len() > c.size / 2 {
            splitter = c.blocks.back().expect("non-trivial constellation has blocks");
        }
        let splitter_size = self.action_blocks[splitter].states.len();
        c.blocks.erase(&mut self.action_blocks, splitter);
        c.size -= splitter_size;
        if c.blocks.len() > 1 {
            self.action_work.push(constellation);
        }

        let mut own = Constellation { blocks: EmbeddedList::new(), size: splitter_size };
        own.blocks.push_back(&mut self.action_blocks, splitter);
        self.action_blocks[splitter].constellation = self.action_constellations.len();
        self.action_constellations.push(own);
        splitter
    }

    /// Probabilistic counterpart of [`choose_action_splitter()`](Model::choose_action_splitter).
    pub fn choose_probabilistic_splitter(&mut self, constellation: usize) -> usize {
        let c = &mut self.probabilistic_constellations[constellation];
        debug_assert!(c.blocks.len() >= 2, "splitter taken from a trivial constellation");
        let mut splitter = c.blocks.front().expect("non-trivial constellation has blocks");
        if self.probabilistic_blocks[splitter].states.len() > c.size / 2 {
            splitter = c.blocks.back().expect("non-trivial constellation has blocks");
        }
        let splitter_size = self.probabilistic_blocks[splitter].states.len();
        c.blocks.erase(&mut self.probabilistic_blocks, splitter);
        c.size -= splitter_size;
        if c.blocks.len() > 1 {
            self.probabilistic_work.push(constellation);
        }

        let mut own = Constellation { blocks: EmbeddedList::new(), size: splitter_size };
        own.blocks.push_back(&mut self.probabilistic_blocks, splitter);
        self.probabilistic_blocks[splitter].constellation = self.probabilistic_constellations.len();
        self.probabilistic_constellations.push(own);
        splitter
    }

    /// Check the internal invariants of the data structure.
    ///
    /// This recounts everything that is maintained incrementally,
    /// so it is only meant for debug builds and tests.
    #[cfg(any(test, debug_assertions))]
    pub fn check(&self) -> Result<(), String> {
        use rustc_hash::FxHashMap;

        // Transition counters against a fresh count
        let mut fresh: FxHashMap<(usize, usize, usize), usize> = FxHashMap::default();
        let constellation_of = |t: &ActionTransition| {
            self.probabilistic_blocks[self.probabilistic_states[t.to].block].constellation
        };
        for t in &self.action_transitions {
            *fresh.entry((t.from, t.label, constellation_of(t))).or_insert(0) += 1;
        }
        for t in &self.action_transitions {
            let expected = fresh[&(t.from, t.label, constellation_of(t))];
            if self.counts[t.count] != expected {
                return Err(format!("transition {} --{}-> {} has constellation count {}, should be {}",
                    t.from, t.label, t.to, self.counts[t.count], expected));
            }
        }

        // Constellation sizes and membership
        let mut action_total = 0;
        for (i, c) in self.action_constellations.iter().enumerate() {
            let mut counted = 0;
            for b in c.blocks.iter(&self.action_blocks) {
                if self.action_blocks[b].constellation != i {
                    return Err(format!("action block {b} is listed in constellation {i}"));
                }
                counted += self.action_blocks[b].states.len();
            }
            if counted != c.size {
                return Err(format!("action constellation {i} records {} states, but has {counted}", c.size));
            }
            action_total += counted;
        }
        if action_total != self.action_states.len() {
            return Err(format!("action blocks hold {action_total} states instead of {}", self.action_states.len()));
        }
        let mut probabilistic_total = 0;
        for (i, c) in self.probabilistic_constellations.iter().enumerate() {
            let mut counted = 0;
            for b in c.blocks.iter(&self.probabilistic_blocks) {
                if self.probabilistic_blocks[b].constellation != i {
                    return Err(format!("probabilistic block {b} is listed in constellation {i}"));
                }
                counted += self.probabilistic_blocks[b].states.len();
            }
            if counted != c.size {
                return Err(format!("probabilistic constellation {i} records {} states, but has {counted}", c.size));
            }
            probabilistic_total += counted;
        }
        if probabilistic_total != self.probabilistic_states.len() {
            return Err(format!("probabilistic blocks hold {probabilistic_total} states instead of {}",
                self.probabilistic_states.len()));
        }

        // Block membership of states
        for (i, b) in self.action_blocks.iter().enumerate() {
            if b.states.is_empty() && !self.action_states.is_empty() {
                return Err(format!("action block {i} is empty"));
            }
            if let Some(s) = b.states.iter(&self.action_states).find(|&s| self.action_states[s].block != i) {
                return Err(format!("action state {s} is listed in block {i}"));
            }
        }
        for (i, b) in self.probabilistic_blocks.iter().enumerate() {
            if let Some(s) = b.states.iter(&self.probabilistic_states).find(|&s| self.probabilistic_states[s].block != i) {
                return Err(format!("probabilistic state {s} is listed in block {i}"));
            }
        }

        // Non-trivial constellations are exactly those on the stacks
        let mut on_stack = vec![false; self.action_constellations.len()];
        for &c in &self.action_work {
            on_stack[c] = true;
        }
        for (i, c) in self.action_constellations.iter().enumerate() {
            if (c.blocks.len() > 1) != on_stack[i] {
                return Err(format!("action constellation {i} with {} blocks is misplaced on the stack",
                    c.blocks.len()));
            }
        }
        let mut on_stack = vec![false; self.probabilistic_constellations.len()];
        for &c in &self.probabilistic_work {
            on_stack[c] = true;
        }
        for (i, c) in self.probabilistic_constellations.iter().enumerate() {
            if (c.blocks.len() > 1) != on_stack[i] {
                return Err(format!("probabilistic constellation {i} with {} blocks is misplaced on the stack",
                    c.blocks.len()));
            }
        }
        Ok(())
    }
}
