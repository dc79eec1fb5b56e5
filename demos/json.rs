// JSON serialization and deserialization of probabilistic transition systems.
//
// When run with no arguments, a system is written to `./plts.json`.
// With a path as a command line argument (for example 'plts.json',
// that was previously written by this example), that file is read,
// validated and minimized.
//
// Example usage:
// `cargo run --example json --features serde`
//     (Writes a system into ./plts.json)
// `cargo run --example json --features serde -- plts.json`
//     (Reads that system again and minimizes it)

use std::env;
use std::ffi::OsStr;
use std::fs::File;
use std::io;

use pbisim::*;

fn system() -> Result<ProbabilisticTransitionSystem> {
    let (send, ack, lose) = (0, 1, 2);
    // A sender that sends until the message is not lost, with two identical receivers
    ProbabilisticTransitionSystem::new(
        4,
        ["send", "ack", "lose"],
        vec![
            Transition::new(0, send, 0),
            Transition::new(1, ack, 1),
            Transition::new(2, ack, 1),
            Transition::new(3, lose, 1),
        ],
        vec![
            Distribution::from_fractions(&[(1, 9, 20), (2, 9, 20), (3, 1, 10)]),
            Distribution::dirac(0),
        ],
        Distribution::dirac(0),
    )
}

fn dump_system() -> io::Result<()> {
    let lts = system().map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    const FNAME: &str = "plts.json";
    let f = File::create(FNAME)?;
    serde_json::to_writer_pretty(f, &lts)?;

    println!("Written probabilistic transition system to `./{FNAME}`");
    println!("Try processing it with `{} {FNAME}`.",
             env::args().next().unwrap_or_default());
    Ok(())
}

fn minimize_json(fname: &OsStr) -> io::Result<()> {
    let reader = File::open(fname)?;
    // Invalid systems are rejected here
    let lts: ProbabilisticTransitionSystem = serde_json::from_reader(&reader)?;
    println!("Read system with {} states from {}.", lts.num_states(), fname.to_string_lossy());

    let (minimized, partition) = lts.minimize();
    println!("Classes: {:?}", partition.classes());
    for (d, distribution) in minimized.distributions().iter().enumerate() {
        println!("Distribution {d}: {distribution}");
    }
    println!("{}", serde_json::to_string_pretty(&minimized)?);
    Ok(())
}

fn main() -> io::Result<()> {
    env_logger::init();
    match env::args_os().nth(1) {
        Some(fname) => minimize_json(&fname),
        None => dump_system(),
    }
}
