use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::error::{Result, ShellError};
use crate::jobs::{self, Placement};
use crate::parser::Command;

/// Either a bare pid or a (job number, process index) pair: the two
/// ways `slay`, `halt`, and `cont` name a single process.
#[derive(Debug, PartialEq, Eq)]
pub enum ProcessSelector {
    Pid(Pid),
    Indexed { job: u32, index: usize },
}

/// The closed set of shell builtins, parsed and validated up front so
/// dispatch is a plain match instead of string checks scattered through
/// the control flow.
#[derive(Debug, PartialEq, Eq)]
pub enum Builtin {
    Fg(u32),
    Bg(u32),
    Slay(ProcessSelector),
    Halt(ProcessSelector),
    Cont(ProcessSelector),
    Jobs,
    Quit,
}

impl Builtin {
    /// Recognizes the leading command of a pipeline as a builtin.
    /// `None` means "not a builtin" and the pipeline launcher takes
    /// over; `Some(Err(..))` is a builtin with malformed arguments.
    pub fn parse(command: &Command) -> Option<Result<Builtin>> {
        let args = &command.argv[1..];
        let parsed = match command.program() {
            "fg" => parse_job_number("fg", args).map(Builtin::Fg),
            "bg" => parse_job_number("bg", args).map(Builtin::Bg),
            "slay" => parse_selector("slay", args).map(Builtin::Slay),
            "halt" => parse_selector("halt", args).map(Builtin::Halt),
            "cont" => parse_selector("cont", args).map(Builtin::Cont),
            "jobs" => expect_no_args("jobs", args).map(|_| Builtin::Jobs),
            "quit" | "exit" => expect_no_args(command.program(), args).map(|_| Builtin::Quit),
            _ => return None,
        };
        Some(parsed)
    }

    pub fn run(self) -> Result<()> {
        match self {
            Builtin::Fg(number) => resume_job("fg", number, Placement::Foreground),
            Builtin::Bg(number) => resume_job("bg", number, Placement::Background),
            Builtin::Slay(selector) => signal_process("slay", selector, Signal::SIGKILL),
            Builtin::Halt(selector) => signal_process("halt", selector, Signal::SIGSTOP),
            Builtin::Cont(selector) => signal_process("cont", selector, Signal::SIGCONT),
            Builtin::Jobs => {
                jobs::with_table(|table| print!("{table}"));
                Ok(())
            }
            // No cleanup of live jobs; the OS re-parents them.
            Builtin::Quit => std::process::exit(0),
        }
    }
}

/// Continues every process in the job's group and records the new
/// placement. Terminal ownership is not touched here: the SIGCHLD
/// handler re-arbitrates it once the kernel reports the processes as
/// continued.
fn resume_job(name: &str, number: u32, target: Placement) -> Result<()> {
    jobs::with_table(|table| {
        let job = table
            .job_mut(number)
            .ok_or_else(|| ShellError::new(format!("{name}: no such job {number}")))?;
        signal::kill(Pid::from_raw(-job.pgid().as_raw()), Signal::SIGCONT)?;
        if job.placement() != target {
            job.set_placement(target);
        }
        Ok(())
    })
}

/// Sends `sig` to exactly one process, after both forms of selector have
/// been checked against the table. Nothing is sent on a failed lookup.
fn signal_process(name: &str, selector: ProcessSelector, sig: Signal) -> Result<()> {
    jobs::with_table(|table| {
        let pid = match selector {
            ProcessSelector::Pid(pid) => {
                if !table.contains_process(pid) {
                    return Err(ShellError::new(format!("{name}: no process {pid}")));
                }
                pid
            }
            ProcessSelector::Indexed { job, index } => {
                let job = table
                    .job(job)
                    .ok_or_else(|| ShellError::new(format!("{name}: no such job {job}")))?;
                job.processes()
                    .get(index)
                    .ok_or_else(|| {
                        ShellError::new(format!(
                            "{name}: job {} has no process at index {index}",
                            job.number()
                        ))
                    })?
                    .pid()
            }
        };
        signal::kill(pid, sig)?;
        Ok(())
    })
}

fn parse_job_number(name: &str, args: &[String]) -> Result<u32> {
    match args {
        [arg] => arg
            .parse::<u32>()
            .map_err(|_| ShellError::new(format!("{name}: job number must be an integer"))),
        _ => Err(ShellError::new(format!("usage: {name} <job>"))),
    }
}

fn parse_selector(name: &str, args: &[String]) -> Result<ProcessSelector> {
    let usage = || ShellError::new(format!("usage: {name} <pid> | {name} <job> <index>"));
    match args {
        [pid] => {
            let pid: i32 = pid.parse().map_err(|_| usage())?;
            if pid <= 0 {
                return Err(usage());
            }
            Ok(ProcessSelector::Pid(Pid::from_raw(pid)))
        }
        [job, index] => {
            let job = job.parse::<u32>().map_err(|_| usage())?;
            let index = index.parse::<usize>().map_err(|_| usage())?;
            Ok(ProcessSelector::Indexed { job, index })
        }
        _ => Err(usage()),
    }
}

fn expect_no_args(name: &str, args: &[String]) -> Result<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(ShellError::new(format!("{name} takes no arguments")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Command {
        Command {
            argv: parts.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn unknown_commands_are_not_builtins() {
        assert!(Builtin::parse(&cmd(&["ls", "-l"])).is_none());
        assert!(Builtin::parse(&cmd(&["fgrep", "x"])).is_none());
    }

    #[test]
    fn fg_requires_exactly_one_numeric_argument() {
        assert!(Builtin::parse(&cmd(&["fg"])).unwrap().is_err());
        assert!(Builtin::parse(&cmd(&["fg", "one"])).unwrap().is_err());
        assert!(Builtin::parse(&cmd(&["fg", "1", "2"])).unwrap().is_err());
        assert_eq!(
            Builtin::parse(&cmd(&["fg", "2"])).unwrap().unwrap(),
            Builtin::Fg(2)
        );
    }

    #[test]
    fn slay_accepts_pid_or_job_index_forms() {
        assert_eq!(
            Builtin::parse(&cmd(&["slay", "123"])).unwrap().unwrap(),
            Builtin::Slay(ProcessSelector::Pid(Pid::from_raw(123)))
        );
        assert_eq!(
            Builtin::parse(&cmd(&["slay", "1", "0"])).unwrap().unwrap(),
            Builtin::Slay(ProcessSelector::Indexed { job: 1, index: 0 })
        );
        assert!(Builtin::parse(&cmd(&["slay"])).unwrap().is_err());
        assert!(Builtin::parse(&cmd(&["slay", "1", "0", "2"])).unwrap().is_err());
        assert!(Builtin::parse(&cmd(&["slay", "-4"])).unwrap().is_err());
    }

    #[test]
    fn quit_and_jobs_take_no_arguments() {
        assert!(Builtin::parse(&cmd(&["jobs", "1"])).unwrap().is_err());
        assert!(Builtin::parse(&cmd(&["quit", "now"])).unwrap().is_err());
        assert!(Builtin::parse(&cmd(&["exit", "0"])).unwrap().is_err());
        assert_eq!(Builtin::parse(&cmd(&["jobs"])).unwrap().unwrap(), Builtin::Jobs);
        assert_eq!(Builtin::parse(&cmd(&["exit"])).unwrap().unwrap(), Builtin::Quit);
    }

    #[test]
    fn fg_on_missing_job_reports_and_leaves_table_alone() {
        let err = Builtin::Fg(4242).run().unwrap_err();
        assert!(err.to_string().contains("no such job 4242"));
        assert!(jobs::with_table(|table| !table.contains_job(4242)));
    }

    #[test]
    fn slay_out_of_range_index_fails_without_signaling() {
        let err = Builtin::Slay(ProcessSelector::Indexed {
            job: 4243,
            index: 0,
        })
        .run()
        .unwrap_err();
        assert!(err.to_string().contains("no such job 4243"));
    }
}
