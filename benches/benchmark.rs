use pbisim::*;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

// Binary tree of fair coin tosses of the given depth. Leaves are labeled by their
// number of heads, so inner states on one level are bisimilar if they have seen the same
// number of heads.
fn coin_tree(depth: u32) -> ProbabilisticTransitionSystem {
    let inner = (1u32 << depth) - 1;
    let leaves = 1u32 << depth;
    let n = inner + leaves;
    let mut transitions = Vec::new();
    let mut distributions = Vec::new();
    for s in 0..inner {
        transitions.push(Transition::new(s, 0, s));
        distributions.push(Distribution::from_fractions(&[(2 * s + 1, 1, 2), (2 * s + 2, 1, 2)]));
    }
    let done = distributions.len() as u32;
    distributions.push(Distribution::dirac(0));
    for leaf in 0..leaves {
        let heads = leaf.count_ones();
        transitions.push(Transition::new(inner + leaf, 1 + heads, done));
    }
    let labels = std::iter::once("toss".to_string())
        .chain((0..=depth).map(|h| format!("heads{h}")));
    ProbabilisticTransitionSystem::new(n, labels, transitions, distributions, Distribution::dirac(0))
        .unwrap()
}

// Random walk on a ring, see the `minimize` demo
fn ring(n: u32) -> ProbabilisticTransitionSystem {
    let mut transitions: Vec<Transition> = (0..n).map(|i| Transition::new(i, 0, i)).collect();
    transitions.push(Transition::new(0, 1, n));
    let mut distributions: Vec<Distribution> = (0..n)
        .map(|i| Distribution::from_fractions(&[((i + n - 1) % n, 1, 2), ((i + 1) % n, 1, 2)]))
        .collect();
    distributions.push(Distribution::dirac(0));
    ProbabilisticTransitionSystem::new(n, ["step", "home"], transitions, distributions, Distribution::dirac(0))
        .unwrap()
}

pub fn benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("minimize");
    let systems = [("coin_tree_12", coin_tree(12)), ("ring_2000", ring(2000))];
    for (name, lts) in &systems {
        for algorithm in [Algorithm::Grv, Algorithm::Signature] {
            group.bench_with_input(BenchmarkId::new(algorithm.to_string(), name), lts,
                |b, lts| b.iter(|| lts.partition_with(algorithm)));
        }
    }
    group.finish();
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
