use std::ffi::CString;
use std::os::unix::io::RawFd;
use std::process;

use nix::errno::Errno;
use nix::libc;
use nix::unistd::{self, ForkResult, Pid};

use crate::error::{Result, ShellError};
use crate::jobs::{self, Placement, Process};
use crate::parser::{Command, Pipeline};
use crate::signals;

/// Builds one job from a parsed pipeline: forks a process per stage,
/// wires the pipe chain, puts every stage into one process group, and
/// registers the result with the job table. Foreground jobs get the
/// terminal and block the caller until they leave the foreground;
/// background jobs return immediately.
pub fn launch_pipeline(pipeline: &Pipeline) -> Result<()> {
    let stages = dedup_stages(&pipeline.commands);
    let placement = if pipeline.background {
        Placement::Background
    } else {
        Placement::Foreground
    };

    // No SIGCHLD may be reconciled against a half-built job. The waiter
    // re-enables delivery; every other path out must unblock.
    signals::block_job_signals();
    match spawn_job(&stages, placement) {
        Ok(()) if placement == Placement::Foreground => {
            signals::wait_for_foreground();
            Ok(())
        }
        Ok(()) => {
            signals::unblock_job_signals();
            Ok(())
        }
        Err(err) => {
            signals::unblock_job_signals();
            Err(err)
        }
    }
}

/// Stages that repeat an earlier stage verbatim are launched once. A
/// long-standing quirk of this shell, kept because it shapes the visible
/// job composition users and tests rely on.
fn dedup_stages(commands: &[Command]) -> Vec<Command> {
    let mut kept: Vec<Command> = Vec::with_capacity(commands.len());
    for command in commands {
        if !kept.iter().any(|earlier| earlier.argv == command.argv) {
            kept.push(command.clone());
        }
    }
    kept
}

fn spawn_job(stages: &[Command], placement: Placement) -> Result<()> {
    let number = jobs::table().add_job(placement).number();
    match spawn_stages(number, stages) {
        Ok(pgid) => {
            if placement == Placement::Foreground {
                signals::give_terminal_to(pgid)?;
            }
            let report = jobs::table()
                .job(number)
                .map(|job| job.to_string())
                .unwrap_or_default();
            print!("{report}");
            Ok(())
        }
        Err(err) => {
            // A job that never gained a process has nothing to reap and
            // must not linger; one with survivors stays visible.
            jobs::table().synchronize(number);
            Err(err)
        }
    }
}

fn spawn_stages(number: u32, stages: &[Command]) -> Result<Pid> {
    let mut pgid: Option<Pid> = None;
    let mut upstream: Option<RawFd> = None;
    for (index, stage) in stages.iter().enumerate() {
        let is_last = index + 1 == stages.len();
        if let Err(err) = spawn_stage(number, stage, is_last, &mut pgid, &mut upstream) {
            if let Some(fd) = upstream.take() {
                let _ = unistd::close(fd);
            }
            return Err(err);
        }
    }
    pgid.ok_or_else(|| ShellError::new("empty pipeline"))
}

fn spawn_stage(
    number: u32,
    stage: &Command,
    is_last: bool,
    pgid: &mut Option<Pid>,
    upstream: &mut Option<RawFd>,
) -> Result<()> {
    let argv = cstring_argv(stage)?;
    let downstream = if is_last {
        None
    } else {
        Some(unistd::pipe().map_err(|e| ShellError::new(format!("pipe: {}", e.desc())))?)
    };

    let child = match unsafe { unistd::fork() } {
        Ok(ForkResult::Child) => run_stage(stage, &argv, *pgid, *upstream, downstream),
        Ok(ForkResult::Parent { child }) => child,
        Err(errno) => {
            if let Some((read_end, write_end)) = downstream {
                let _ = unistd::close(read_end);
                let _ = unistd::close(write_end);
            }
            return Err(ShellError::new(format!("fork: {}", errno.desc())));
        }
    };

    // Both sides call setpgid so group membership holds no matter which
    // runs first. EACCES means the child already joined and exec'd.
    let group = *pgid.get_or_insert(child);
    let _ = unistd::setpgid(child, group);

    if let Some(job) = jobs::table().job_mut(number) {
        job.add_process(Process::new(child, stage.command_line()));
    }

    if let Some(fd) = upstream.take() {
        unistd::close(fd)?;
    }
    if let Some((read_end, write_end)) = downstream {
        unistd::close(write_end)?;
        *upstream = Some(read_end);
    }
    Ok(())
}

/// Child-side setup and program replacement. Never returns to shell
/// logic: any failure past the fork belongs to this process alone.
fn run_stage(
    stage: &Command,
    argv: &[CString],
    pgid: Option<Pid>,
    upstream: Option<RawFd>,
    downstream: Option<(RawFd, RawFd)>,
) -> ! {
    signals::unblock_job_signals();
    if let Err(errno) = wire_stage(pgid, upstream, downstream) {
        eprintln!("{}: {}", stage.program(), errno.desc());
        process::exit(1);
    }
    let err = unistd::execvp(&argv[0], argv).unwrap_err();
    match err {
        Errno::ENOENT => eprintln!("{}: command not found", stage.program()),
        errno => eprintln!("{}: {}", stage.program(), errno.desc()),
    }
    process::exit(127);
}

fn wire_stage(
    pgid: Option<Pid>,
    upstream: Option<RawFd>,
    downstream: Option<(RawFd, RawFd)>,
) -> nix::Result<()> {
    if let Some(fd) = upstream {
        unistd::dup2(fd, libc::STDIN_FILENO)?;
        unistd::close(fd)?;
    }
    if let Some((read_end, write_end)) = downstream {
        unistd::close(read_end)?;
        unistd::dup2(write_end, libc::STDOUT_FILENO)?;
        unistd::close(write_end)?;
    }
    // First stage founds the group (pgid 0 = own pid), the rest join it.
    unistd::setpgid(Pid::from_raw(0), pgid.unwrap_or_else(|| Pid::from_raw(0)))?;
    Ok(())
}

fn cstring_argv(stage: &Command) -> Result<Vec<CString>> {
    stage
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| ShellError::new(format!("{}: argument contains NUL byte", stage.program())))
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
    fn identical_stages_collapse() {
        let stages = dedup_stages(&[cmd(&["sleep", "5"]), cmd(&["sleep", "5"])]);
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].argv, vec!["sleep", "5"]);
    }

    #[test]
    fn dedup_is_not_limited_to_adjacent_stages() {
        let stages = dedup_stages(&[
            cmd(&["cat"]),
            cmd(&["sort"]),
            cmd(&["cat"]),
        ]);
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].argv, vec!["cat"]);
        assert_eq!(stages[1].argv, vec!["sort"]);
    }

    #[test]
    fn differing_arguments_are_distinct_stages() {
        let stages = dedup_stages(&[cmd(&["sleep", "5"]), cmd(&["sleep", "6"])]);
        assert_eq!(stages.len(), 2);
    }
}
