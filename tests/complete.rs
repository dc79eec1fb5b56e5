use pbisim::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// A chain of `levels` coin tosses. In level i, the toss state leads to heads and tails
// with probability 1/2 each, both of which continue with the next toss.
// At the levels listed in `stop`, tails ends with `stop` instead.
// At the levels listed in `biased`, heads has probability 1/3 and tails 2/3.
//
// States: toss i => 3i, heads i => 3i + 1, tails i => 3i + 2, final state => 3 * levels
// Distributions: coin i => 2i, continue to level i + 1 => 2i + 1, stopped => 2 * levels
fn coin_chain(levels: u32, stop: &[u32], biased: &[u32]) -> ProbabilisticTransitionSystem {
    let (toss, next, halt) = (0, 1, 2);
    let mut transitions = Vec::new();
    let mut distributions = Vec::new();
    for i in 0..levels {
        let (t, h, tails) = (3 * i, 3 * i + 1, 3 * i + 2);
        transitions.push(Transition::new(t, toss, 2 * i));
        transitions.push(Transition::new(h, next, 2 * i + 1));
        if stop.contains(&i) {
            transitions.push(Transition::new(tails, halt, 2 * levels));
        } else {
            transitions.push(Transition::new(tails, next, 2 * i + 1));
        }
        if biased.contains(&i) {
            distributions.push(Distribution::from_fractions(&[(h, 1, 3), (tails, 2, 3)]));
        } else {
            distributions.push(Distribution::from_fractions(&[(h, 1, 2), (tails, 1, 2)]));
        }
        distributions.push(Distribution::dirac(3 * (i + 1)));
    }
    distributions.push(Distribution::dirac(3 * levels));
    ProbabilisticTransitionSystem::new(
        3 * levels + 1,
        ["toss", "next", "stop"],
        transitions,
        distributions,
        Distribution::dirac(0),
    ).unwrap()
}

// Linear congruential generator, good enough to produce test systems
struct Lcg(u64);

impl Lcg {
    fn below(&mut self, n: u32) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) % n as u64) as u32
    }

    fn distribution(&mut self, n_states: u32) -> Distribution {
        let parts: Vec<(u32, i64)> = (0..1 + self.below(3))
            .map(|_| (self.below(n_states), 1 + self.below(3) as i64))
            .collect();
        let total: i64 = parts.iter().map(|(_, w)| w).sum();
        parts.into_iter()
            .map(|(s, w)| (s, fraction(w, total)))
            .collect()
    }

    // Systems with few distinct distributions and labels, so that there is something to merge
    fn system(&mut self) -> ProbabilisticTransitionSystem {
        let n_states = 1 + self.below(30);
        let n_distributions = 1 + self.below(6);
        let n_labels = 1 + self.below(2);
        let mut transitions = Vec::new();
        for from in 0..n_states {
            for _ in 0..self.below(3) {
                transitions.push(Transition::new(from, self.below(n_labels), self.below(n_distributions)));
            }
        }
        let distributions = (0..n_distributions).map(|_| self.distribution(n_states)).collect();
        let initial = self.distribution(n_states);
        ProbabilisticTransitionSystem::new(
            n_states,
            ["a", "b"].into_iter().take(n_labels as usize),
            transitions,
            distributions,
            initial,
        ).unwrap()
    }
}

// Check that `partition` is a probabilistic bisimulation on `lts`:
// states in one class have the same moves into probabilistic classes,
// distributions in one class assign the same probability to each class.
fn assert_bisimulation(lts: &ProbabilisticTransitionSystem, partition: &Partition) {
    let mut moves = vec![Vec::new(); lts.num_states() as usize];
    for t in lts.transitions() {
        moves[t.from as usize].push((t.label, partition.probabilistic_class_of(t.to)));
    }
    for m in &mut moves {
        m.sort_unstable();
        m.dedup();
    }
    for s in 0..lts.num_states() {
        for t in 0..s {
            if partition.in_same_class(s, t) {
                assert_eq!(moves[s as usize], moves[t as usize], "states {s} and {t}");
            }
        }
    }

    let lifted: Vec<Distribution> = lts.distributions().iter()
        .map(|d| d.lift(|s| partition.class_of(s)))
        .collect();
    for d in 0..lts.num_probabilistic_states() {
        for e in 0..d {
            assert_eq!(partition.in_same_probabilistic_class(d, e),
                lifted[d as usize] == lifted[e as usize],
                "distributions {d} and {e}");
        }
    }
}

#[test]
fn halves_are_not_quarters() {
    init_logging();
    let (a, b, c) = (0, 1, 2);
    let lts = ProbabilisticTransitionSystem::new(
        5,
        ["a", "b", "c"],
        vec![(0, a, 0).into(), (1, a, 1).into(), (2, b, 2).into(), (3, c, 2).into()],
        vec![
            Distribution::from_fractions(&[(2, 1, 2), (3, 1, 2)]),
            Distribution::from_fractions(&[(2, 1, 4), (3, 3, 4)]),
            Distribution::dirac(4),
        ],
        Distribution::dirac(0),
    ).unwrap();
    for algorithm in [Algorithm::Grv, Algorithm::Signature] {
        let partition = lts.partition_with(algorithm);
        assert!(!partition.in_same_probabilistic_class(0, 1), "{algorithm}");
        assert!(!partition.in_same_class(0, 1), "{algorithm}");
    }
}

#[test]
fn single_state() {
    init_logging();
    let lts = ProbabilisticTransitionSystem::new(
        1, Vec::<String>::new(), vec![], vec![], Distribution::dirac(0),
    ).unwrap();
    let (minimized, partition) = lts.minimize();
    assert_eq!(partition.num_classes(), 1);
    assert_eq!(minimized, lts);
}

#[test]
fn distinct_labels_never_merge() {
    init_logging();
    let n = 20;
    let labels: Vec<String> = (0..n).map(|i| format!("a{i}")).collect();
    let transitions = (0..n).map(|i| Transition::new(i, i, 0)).collect();
    let lts = ProbabilisticTransitionSystem::new(
        n + 1, labels, transitions, vec![Distribution::dirac(n)], Distribution::dirac(0),
    ).unwrap();
    let partition = lts.partition();
    assert_eq!(partition.num_classes(), n as usize + 1);
    assert_eq!(partition.classes(), (0..=n).collect::<Vec<_>>());
}

#[test]
fn identical_transitions_merge() {
    init_logging();
    let (a, b) = (0, 1);
    let lts = ProbabilisticTransitionSystem::new(
        5,
        ["a", "b"],
        vec![
            Transition::new(0, a, 0), Transition::new(0, b, 1),
            Transition::new(1, b, 1), Transition::new(1, a, 0), Transition::new(1, a, 0),
            // Same moves, but into a different distribution over equivalent states
            Transition::new(2, a, 2), Transition::new(2, b, 1),
        ],
        vec![
            Distribution::from_fractions(&[(3, 1, 3), (4, 2, 3)]),
            Distribution::dirac(3),
            Distribution::from_fractions(&[(4, 1, 3), (3, 2, 3)]),
        ],
        Distribution::dirac(0),
    ).unwrap();
    let partition = lts.partition();
    assert!(partition.in_same_class(0, 1));
    assert!(partition.in_same_class(0, 2));
    assert!(partition.in_same_class(3, 4));
    assert!(partition.in_same_probabilistic_class(0, 2));
    assert_eq!(partition.num_classes(), 2);
    // All distributions end in the class of 3 and 4
    assert_eq!(partition.num_probabilistic_classes(), 1);
}

#[test]
fn coin_chain_collapses() {
    init_logging();
    let levels = 6;
    let lts = coin_chain(levels, &[], &[]);
    let (minimized, partition) = lts.minimize();
    for i in 0..levels {
        assert!(partition.in_same_class(3 * i + 1, 3 * i + 2));
        assert!(!partition.in_same_class(3 * i, 3 * i + 1));
    }
    // Tosses, one merged branch per level and the final state
    assert_eq!(minimized.num_states(), 2 * levels + 1);
    // The distribution after stopping coincides with continuing after the last level
    assert_eq!(minimized.num_probabilistic_states(), 2 * levels);
    // Every coin became a certain move to its merged branch
    for i in 0..levels {
        let coin = minimized.probabilistic_state(partition.probabilistic_class_of(2 * i));
        assert_eq!(coin, &Distribution::dirac(partition.class_of(3 * i + 1)));
    }
    assert_bisimulation(&lts, &partition);
}

#[test]
fn long_coin_chain() {
    init_logging();
    // Telling the levels apart takes thousands of splits
    let levels = 2000;
    let lts = coin_chain(levels, &[], &[]);
    let (minimized, partition) = lts.minimize_with(Algorithm::Grv);
    assert_eq!(minimized.num_states(), 2 * levels + 1);
    assert!(partition.in_same_class(3 * levels - 2, 3 * levels - 1));
    assert!(!partition.in_same_class(0, 3));
}

#[test]
fn coin_chain_with_stops() {
    init_logging();
    let levels = 6;
    let lts = coin_chain(levels, &[1, 4], &[]);
    let partition = lts.partition();
    for i in 0..levels {
        assert_eq!(partition.in_same_class(3 * i + 1, 3 * i + 2), i != 1 && i != 4, "level {i}");
    }
    // Tails of levels 1 and 4 both stop
    assert!(partition.in_same_class(5, 14));
    assert_eq!(partition, lts.partition_with(Algorithm::Signature));
    assert_bisimulation(&lts, &partition);
}

#[test]
fn biased_coin_stays_apart() {
    init_logging();
    let levels = 6;
    // Level 4 both stops and tosses a 1/3 coin, the fair chain is next to it
    let mut lts = coin_chain(levels, &[1, 4], &[4]);
    let fair = coin_chain(levels, &[1, 4], &[]);
    let (initial, fair_initial) = lts.merge(&fair).unwrap();
    let (offset, coin_offset) = (fair.num_states(), fair.num_probabilistic_states());

    for algorithm in [Algorithm::Grv, Algorithm::Signature] {
        let partition = lts.partition_with(algorithm);
        for i in 0..levels {
            let (toss, heads, tails, coin) = (3 * i, 3 * i + 1, 3 * i + 2, 2 * i);
            for base in [0, offset] {
                assert_eq!(partition.in_same_class(base + heads, base + tails), i != 1 && i != 4,
                    "{algorithm} level {i}");
            }
            // Only the fair level after the biased one is the same in both chains
            assert_eq!(partition.in_same_class(toss, offset + toss), i == 5, "{algorithm} level {i}");
            assert_eq!(partition.in_same_probabilistic_class(coin, coin_offset + coin), i == 5,
                "{algorithm} level {i}");
        }
        // The branches of the biased level still match their fair counterparts
        assert!(partition.in_same_class(13, offset + 13));
        assert!(partition.in_same_class(14, offset + 14));
        assert!(!partition.in_same_probabilistic_class(initial, fair_initial));
        assert_bisimulation(&lts, &partition);
    }

    let biased = coin_chain(levels, &[1, 4], &[4]);
    let (minimized, partition) = biased.minimize();
    let coin = minimized.probabilistic_state(partition.probabilistic_class_of(8));
    assert_eq!(coin.probability_of(partition.class_of(13)), fraction(1, 3));
    assert_eq!(coin.probability_of(partition.class_of(14)), fraction(2, 3));
    assert!(!biased.compare(&fair).unwrap());

    // A biased coin between branches that continue alike is a certain move
    assert!(coin_chain(levels, &[1, 4], &[2]).compare(&fair).unwrap());
}

#[test]
fn minimizing_twice_changes_nothing() {
    init_logging();
    let mut rng = Lcg(17);
    for _ in 0..50 {
        let lts = rng.system();
        let (minimized, _) = lts.minimize();
        let (again, partition) = minimized.minimize();
        assert_eq!(again, minimized);
        assert_eq!(partition.classes(), (0..minimized.num_states()).collect::<Vec<_>>());
        assert_eq!(partition.probabilistic_classes(),
            (0..minimized.num_probabilistic_states()).collect::<Vec<_>>());
    }
}

#[test]
fn deterministic() {
    init_logging();
    let mut rng = Lcg(4);
    for _ in 0..20 {
        let lts = rng.system();
        assert_eq!(lts.partition(), lts.partition());
        assert_eq!(lts.minimize(), lts.minimize());
    }
}

#[test]
fn strategies_agree() {
    init_logging();
    let mut rng = Lcg(2024);
    for _ in 0..300 {
        let lts = rng.system();
        let grv = lts.partition_with(Algorithm::Grv);
        let signature = lts.partition_with(Algorithm::Signature);
        assert_bisimulation(&lts, &grv);
        assert_eq!(grv, signature, "{lts:?}");
    }
}

#[test]
fn quotient_is_valid() {
    init_logging();
    let mut rng = Lcg(99);
    for _ in 0..50 {
        let mut lts = rng.system();
        let original = lts.clone();
        let partition = lts.reduce();
        assert_eq!(lts.validate(), Ok(()));
        assert_eq!(lts.num_states() as usize, partition.num_classes());
        assert_eq!(lts.labels(), original.labels());
        let initial = original.initial_probabilistic_state().lift(|s| partition.class_of(s));
        assert_eq!(lts.initial_probabilistic_state(), &initial);
        // The reduced system is bisimilar to the original one
        assert!(original.compare(&lts).unwrap());
    }
}

#[test]
fn relation_through_minimization() {
    init_logging();
    let lts = coin_chain(4, &[2], &[]);
    let (minimized, partition) = lts.minimize();
    // Bisimulation on the minimized system only relates states to themselves
    let relation = minimized.partition().relation().pull_back(&partition);
    let direct = EquivalenceRelation::from(&partition);
    assert_eq!(relation.num_classes(), direct.num_classes());
    assert_eq!(relation.classes(), direct.classes());
    assert_eq!(direct.members_of(1).collect::<Vec<_>>(), vec![1, 2]);

    // Relating two minimized states relates all of their original members
    let mut coarser = EquivalenceRelation::identity(minimized.num_states() as usize);
    coarser.join(partition.class_of(0), partition.class_of(3));
    let pulled = coarser.pull_back(&partition);
    assert!(pulled.related(0, 3));
    assert!(!pulled.related(0, 1));
    assert_eq!(pulled.num_classes(), direct.num_classes() - 1);

    let probabilistic = minimized.partition().probabilistic_relation()
        .pull_back_probabilistic(&partition);
    assert_eq!(probabilistic.num_classes(), partition.num_probabilistic_classes());
}

#[test]
fn compare_systems() {
    init_logging();
    let three = coin_chain(3, &[], &[]);
    // The same chain with different numbering and label order
    let shuffled = ProbabilisticTransitionSystem::new(
        10,
        ["next", "toss"],
        vec![
            Transition::new(9, 1, 0), Transition::new(8, 0, 1), Transition::new(7, 0, 1),
            Transition::new(6, 1, 2), Transition::new(5, 0, 3), Transition::new(4, 0, 3),
            Transition::new(3, 1, 4), Transition::new(2, 0, 5), Transition::new(1, 0, 5),
        ],
        vec![
            Distribution::from_fractions(&[(8, 1, 2), (7, 1, 2)]),
            Distribution::dirac(6),
            Distribution::from_fractions(&[(5, 1, 2), (4, 1, 2)]),
            Distribution::dirac(3),
            Distribution::from_fractions(&[(2, 1, 2), (1, 1, 2)]),
            Distribution::dirac(0),
        ],
        Distribution::dirac(9),
    ).unwrap();
    assert!(three.compare(&shuffled).unwrap());
    assert!(shuffled.compare_with(&three, Algorithm::Signature).unwrap());
    assert!(!three.compare(&coin_chain(4, &[], &[])).unwrap());
    assert!(!three.compare(&coin_chain(3, &[0], &[])).unwrap());
}

#[test]
fn compare_initial_distributions() {
    init_logging();
    let (heads, tails) = (0, 1);
    let coin = |initial: Distribution| ProbabilisticTransitionSystem::new(
        3,
        ["heads", "tails"],
        vec![Transition::new(1, heads, 0), Transition::new(2, tails, 0)],
        vec![Distribution::dirac(0)],
        initial,
    ).unwrap();
    let fair = coin(Distribution::from_fractions(&[(1, 1, 2), (2, 1, 2)]));
    let split = coin(Distribution::from_fractions(&[(1, 1, 4), (2, 1, 2), (1, 1, 4)]));
    let biased = coin(Distribution::from_fractions(&[(1, 1, 4), (2, 3, 4)]));
    assert!(fair.compare(&split).unwrap());
    assert!(!fair.compare(&biased).unwrap());
}

#[test]
fn validation_errors() {
    let system = |transitions: Vec<Transition>, distributions: Vec<Distribution>, initial| {
        ProbabilisticTransitionSystem::new(2, ["a"], transitions, distributions, initial)
    };
    let d = || vec![Distribution::dirac(1)];
    let ok = Distribution::dirac(0);

    assert_eq!(system(vec![Transition::new(2, 0, 0)], d(), ok.clone()),
        Err(Error::SourceOutOfRange { transition: 0, state: 2 }));
    assert_eq!(system(vec![Transition::new(0, 0, 0), Transition::new(0, 1, 0)], d(), ok.clone()),
        Err(Error::LabelOutOfRange { transition: 1, label: 1 }));
    assert_eq!(system(vec![Transition::new(0, 0, 1)], d(), ok.clone()),
        Err(Error::TargetOutOfRange { transition: 0, distribution: 1 }));
    assert_eq!(system(vec![], vec![Distribution::dirac(5)], ok.clone()),
        Err(Error::DanglingState { distribution: Some(0), state: 5 }));
    assert_eq!(system(vec![], d(), Distribution::default()),
        Err(Error::EmptyDistribution { distribution: None }));
    assert_eq!(system(vec![], vec![Distribution::from_fractions(&[(0, 3, 2), (1, -1, 2)])], ok.clone()),
        Err(Error::NonPositiveProbability { distribution: Some(0) }));
    assert_eq!(system(vec![], d(), Distribution::from_fractions(&[(0, 1, 3), (1, 1, 3)])),
        Err(Error::NotNormalized { distribution: None, sum: fraction(2, 3) }));
    assert!(system(vec![Transition::new(1, 0, 0)], d(), ok).is_ok());
}

#[cfg(feature = "serde")]
#[test]
fn serde_json() {
    let lts = coin_chain(2, &[1], &[]);
    let json = serde_json::to_string(&lts).unwrap();
    let read: ProbabilisticTransitionSystem = serde_json::from_str(&json).unwrap();
    assert_eq!(read, lts);

    let partition = lts.partition();
    let json = serde_json::to_string(&partition).unwrap();
    assert_eq!(serde_json::from_str::<Partition>(&json).unwrap(), partition);

    // Deserialization validates
    let mut invalid = serde_json::to_value(&lts).unwrap();
    invalid["num_states"] = serde_json::json!(3);
    let error = serde_json::from_value::<ProbabilisticTransitionSystem>(invalid).unwrap_err();
    assert!(error.to_string().contains("nonexistent"), "{error}");
}
