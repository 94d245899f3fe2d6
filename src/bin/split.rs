/*
 * split.rs - job-control workload
 *
 * usage: split <seconds>
 * Forks a child that sleeps for the given number of seconds, then waits
 * for it. Useful for checking that signals reach every member of a
 * job's process group, not just the process the shell forked.
 */

use nix::sys::wait::wait;
use nix::unistd::{fork, ForkResult};
use std::env;
use std::process;
use std::thread;
use std::time::Duration;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: split <seconds>");
        process::exit(2);
    }
    let secs: u64 = args[1].parse().unwrap_or_else(|_| {
        eprintln!("split: seconds must be a non-negative integer");
        process::exit(2);
    });

    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            for _ in 0..secs {
                thread::sleep(Duration::from_secs(1));
            }
        }
        Ok(ForkResult::Parent { .. }) => {
            if let Err(err) = wait() {
                eprintln!("split: wait: {err}");
                process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("split: fork: {err}");
            process::exit(1);
        }
    }
}
