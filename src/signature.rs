use std::time::Instant;

use log::debug;
use rustc_hash::FxHashMap;

use crate::partition::Partition;
use crate::{Distribution, ProbabilisticTransitionSystem};

// Find strong probabilistic bisimulation using signature refinement.
//
// The initial partition groups action states by the set of labels they enable, as in
// C. Baier, B. Engelen and M. Majster-Cederbaum, "Deciding bisimilarity and similarity for
// probabilistic processes", 2000. After that, both partitions are refined by signatures
// in turns:
//
// probabilistic: sig[d] = {(ID, p) | p = sum of d(s) for all s with partition[s] == ID}
// action:        sig[s] = (partition[s], {(a, ID) | s -a-> d and prob_partition[d] == ID})
//
// The action signature contains the previous class, so every round refines the partition.
// Once the number of action classes stays the same, both partitions are stable.
pub(crate) fn signature_refinement(lts: &ProbabilisticTransitionSystem) -> Partition {
    let now = Instant::now();
    let mut adj = vec![Vec::new(); lts.num_states() as usize];
    for t in lts.transitions() {
        adj[t.from as usize].push((t.label, t.to));
    }

    let (mut partition, mut count) = enabledness_partition(&adj);
    let mut prob_partition;
    let mut rounds = 0;
    loop {
        rounds += 1;
        prob_partition = probabilistic_signature_partition(lts.distributions(), &partition);
        let (new_partition, new_count) = action_signature_partition(&adj, &partition, &prob_partition);
        partition = new_partition;
        if new_count == count {
            break;
        }
        count = new_count;
    }
    debug!("Signature refinement found {count} classes after {rounds} rounds in {:.5}s",
        now.elapsed().as_secs_f64());
    Partition::from_blocks(&partition, &prob_partition)
}

fn enabledness_partition(adj: &[Vec<(u32, u32)>]) -> (Vec<u32>, usize) {
    let mut sigmap: FxHashMap<Box<[u32]>, u32> = FxHashMap::default();
    let partition = adj.iter()
        .map(|transitions| {
            let mut labels: Vec<u32> = transitions.iter().map(|(label, _)| *label).collect();
            labels.sort_unstable();
            labels.dedup();
            let next = sigmap.len() as u32;
            *sigmap.entry(labels.into_boxed_slice()).or_insert(next)
        })
        .collect();
    (partition, sigmap.len())
}

fn probabilistic_signature_partition(distributions: &[Distribution], partition: &[u32]) -> Vec<u32> {
    let signatures: Vec<Distribution> = distributions.iter()
        .map(|d| d.lift(|s| partition[s as usize]))
        .collect();
    let mut sigmap = FxHashMap::default();
    signatures.iter()
        .map(|sig| {
            let next = sigmap.len() as u32;
            *sigmap.entry(sig).or_insert(next)
        })
        .collect()
}

fn action_signature_partition(
    adj: &[Vec<(u32, u32)>],
    partition: &[u32],
    prob_partition: &[u32],
) -> (Vec<u32>, usize) {
    let signatures: Vec<(u32, Vec<(u32, u32)>)> = adj.iter()
        .zip(partition)
        .map(|(transitions, &class)| {
            let mut sig: Vec<_> = transitions.iter()
                .map(|&(label, d)| (label, prob_partition[d as usize]))
                .collect();
            sig.sort_unstable();
            sig.dedup();
            (class, sig)
        })
        .collect();
    let mut sigmap = FxHashMap::default();
    let new_partition = signatures.iter()
        .map(|sig| {
            let next = sigmap.len() as u32;
            *sigmap.entry(sig).or_insert(next)
        })
        .collect();
    (new_partition, sigmap.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabledness() {
        // Label sets: {0, 1}, {}, {1, 0}, {1}
        let adj = vec![
            vec![(0, 0), (1, 0)],
            vec![],
            vec![(1, 2), (0, 1), (1, 0)],
            vec![(1, 1)],
        ];
        let (partition, count) = enabledness_partition(&adj);
        assert_eq!(count, 3);
        assert_eq!(partition[0], partition[2]);
        assert_ne!(partition[1], partition[3]);
    }

    #[test]
    fn probabilistic_signatures_sum_per_class() {
        let distributions = vec![
            Distribution::from_fractions(&[(0, 1, 2), (1, 1, 2)]),
            Distribution::from_fractions(&[(1, 1, 4), (2, 1, 4), (0, 1, 2)]),
            Distribution::from_fractions(&[(0, 1, 4), (1, 3, 4)]),
        ];
        // States 1 and 2 are in the same class
        let prob = probabilistic_signature_partition(&distributions, &[0, 1, 1]);
        assert_eq!(prob[0], prob[1]);
        assert_ne!(prob[0], prob[2]);
    }
}
