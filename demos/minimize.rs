// Minimize a symmetric random walk on a ring.
//
// Every position steps to both neighbours with probability 1/2.
// Position 0 can additionally announce `home`. Positions i and n - i are mirror images
// of each other and therefore bisimilar.
//
// Example usage:
// `cargo run --example minimize -- 1000 signature`
//     (Ring with 1000 positions, minimized with the signature algorithm)

use std::env;
use std::process;
use std::time::Instant;

use pbisim::{Algorithm, Distribution, EquivalenceClasses, ProbabilisticTransitionSystem, Result, Transition};

fn ring(n: u32) -> Result<ProbabilisticTransitionSystem> {
    let (step, home) = (0, 1);
    let mut transitions: Vec<Transition> = (0..n).map(|i| Transition::new(i, step, i)).collect();
    transitions.push(Transition::new(0, home, n));
    let mut distributions: Vec<Distribution> = (0..n)
        .map(|i| Distribution::from_fractions(&[((i + n - 1) % n, 1, 2), ((i + 1) % n, 1, 2)]))
        .collect();
    distributions.push(Distribution::dirac(0));
    ProbabilisticTransitionSystem::new(n, ["step", "home"], transitions, distributions, Distribution::dirac(0))
}

fn main() -> Result<()> {
    env_logger::init();
    let mut args = env::args().skip(1);
    let n = args.next()
        .map(|arg| arg.parse().unwrap_or_else(|e| {
            eprintln!("Invalid ring size {arg:?}: {e}");
            process::exit(2);
        }))
        .unwrap_or(12);
    let algorithm: Algorithm = args.next()
        .map(|arg| arg.parse().unwrap_or_else(|e| {
            eprintln!("{e}");
            process::exit(2);
        }))
        .unwrap_or_default();

    let lts = ring(n)?;
    let now = Instant::now();
    let (minimized, partition) = lts.minimize_with(algorithm);
    println!("Minimized with {algorithm} in {:.5}s", now.elapsed().as_secs_f64());
    println!("States: {} -> {}", lts.num_states(), minimized.num_states());
    println!("Probabilistic states: {} -> {}",
        lts.num_probabilistic_states(), minimized.num_probabilistic_states());
    if n <= 20 {
        for (i, class) in partition.relation().classes().iter().enumerate() {
            println!("Class {i}: {class:?}");
        }
    }
    if n >= 2 {
        println!("Positions 1 and {} bisimilar: {}", n - 1, partition.in_same_class(1, n - 1));
    }
    Ok(())
}
