/*
 * stopself.rs - job-control workload
 *
 * usage: stopself <seconds>
 * Sleeps for the given number of seconds, then sends SIGTSTP to its own
 * process group, simulating a job stopped from the keyboard.
 */

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::env;
use std::process;
use std::thread;
use std::time::Duration;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: stopself <seconds>");
        process::exit(2);
    }
    let secs: u64 = args[1].parse().unwrap_or_else(|_| {
        eprintln!("stopself: seconds must be a non-negative integer");
        process::exit(2);
    });

    for _ in 0..secs {
        thread::sleep(Duration::from_secs(1));
    }

    let own_pid = process::id() as i32;
    if let Err(err) = signal::kill(Pid::from_raw(-own_pid), Signal::SIGTSTP) {
        eprintln!("stopself: kill: {err}");
        process::exit(1);
    }
}
