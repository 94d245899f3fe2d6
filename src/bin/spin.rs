/*
 * spin.rs - job-control workload
 *
 * usage: spin <seconds>
 * Sleeps for the given number of seconds in 1-second chunks, then exits.
 * Handy as a long-running job: `spin 30 &`, then play with jobs/fg/bg.
 */

use std::env;
use std::process;
use std::thread;
use std::time::Duration;

fn seconds_arg(name: &str) -> u64 {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: {name} <seconds>");
        process::exit(2);
    }
    args[1].parse().unwrap_or_else(|_| {
        eprintln!("{name}: seconds must be a non-negative integer");
        process::exit(2);
    })
}

fn main() {
    let secs = seconds_arg("spin");
    for _ in 0..secs {
        thread::sleep(Duration::from_secs(1));
    }
}
