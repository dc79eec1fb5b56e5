// Compare implementations of a fair die that only uses fair coins.
//
// This is the die by D. Knuth and A. Yao: three coin tosses select one of eight outcomes,
// six of which are the faces of the die, while the remaining two go back to an earlier toss.

use pbisim::{Distribution, ProbabilisticTransitionSystem, Result, Transition};

// Toss states are 0..=6, faces 7..=12, the final state is 13.
// With `copy`, state 14 is a copy of the first toss state and the system starts in either one.
fn knuth_yao(heads: (i64, i64), copy: bool) -> Result<ProbabilisticTransitionSystem> {
    let (numer, denom) = heads;
    let coin = |h: u32, t: u32| Distribution::from_fractions(&[(h, numer, denom), (t, denom - numer, denom)]);
    let labels = ["toss", "one", "two", "three", "four", "five", "six"];

    // Toss i leads to distribution i
    let mut distributions = vec![
        coin(1, 2),
        coin(3, 4),
        coin(5, 6),
        coin(1, 7),
        coin(8, 9),
        coin(10, 11),
        coin(12, 2),
    ];
    let mut transitions: Vec<Transition> = (0..7).map(|i| Transition::new(i, 0, i)).collect();
    // Showing a face ends the run
    distributions.push(Distribution::dirac(13));
    for face in 1..=6 {
        transitions.push(Transition::new(6 + face, face, 7));
    }

    let (num_states, initial) = if copy {
        transitions.push(Transition::new(14, 0, 0));
        (15, Distribution::from_fractions(&[(0, 1, 2), (14, 1, 2)]))
    } else {
        (14, Distribution::dirac(0))
    };
    ProbabilisticTransitionSystem::new(num_states, labels, transitions, distributions, initial)
}

fn main() -> Result<()> {
    env_logger::init();
    let fair = knuth_yao((1, 2), false)?;
    let copied = knuth_yao((1, 2), true)?;
    let biased = knuth_yao((1, 3), false)?;

    println!("Fair die and fair die with a copied start: {}",
        if fair.compare(&copied)? { "bisimilar" } else { "not bisimilar" });
    println!("Fair die and die with biased coins: {}",
        if fair.compare(&biased)? { "bisimilar" } else { "not bisimilar" });

    let (minimized, partition) = copied.minimize();
    println!("The copied die has {} states, minimized {}, classes: {:?}",
        copied.num_states(), minimized.num_states(), partition.classes());
    println!("Minimized initial distribution: {}", minimized.initial_probabilistic_state());
    Ok(())
}
