use std::process;

use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{self, Pid};

use crate::error::{Result, ShellError};
use crate::jobs::{self, Placement, ProcessState};

/// The signals whose handlers touch the job table. Blocking this set is
/// the shell's only mutual-exclusion mechanism: the main flow blocks it
/// around table access, and every handler is installed with it as the
/// handler mask.
fn job_control_signals() -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGCHLD);
    set.add(Signal::SIGINT);
    set.add(Signal::SIGTSTP);
    set
}

pub fn block_job_signals() {
    signal::sigprocmask(SigmaskHow::SIG_BLOCK, Some(&job_control_signals()), None)
        .expect("sigprocmask");
}

pub fn unblock_job_signals() {
    signal::sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&job_control_signals()), None)
        .expect("sigprocmask");
}

/// Installs the shell's signal handlers:
/// - SIGCHLD: reconcile the job table with whatever the kernel reports.
/// - SIGINT / SIGTSTP: forward to the foreground job's process group.
/// - SIGQUIT: print a farewell and exit.
/// - SIGTTIN / SIGTTOU: ignored, so the shell can keep using the
///   terminal while a foreground job owns it.
pub fn install_signal_handlers() {
    let mask = job_control_signals();
    let handlers: [(Signal, SigHandler); 4] = [
        (Signal::SIGCHLD, SigHandler::Handler(handle_sigchld)),
        (Signal::SIGINT, SigHandler::Handler(handle_sigint)),
        (Signal::SIGTSTP, SigHandler::Handler(handle_sigtstp)),
        (Signal::SIGQUIT, SigHandler::Handler(handle_sigquit)),
    ];
    for (sig, handler) in handlers {
        let action = SigAction::new(handler, SaFlags::SA_RESTART, mask);
        unsafe { signal::sigaction(sig, &action) }.expect("install signal handler");
    }
    for sig in [Signal::SIGTTIN, Signal::SIGTTOU] {
        let action = SigAction::new(SigHandler::SigIgn, SaFlags::SA_RESTART, SigSet::empty());
        unsafe { signal::sigaction(sig, &action) }.expect("ignore terminal signal");
    }
}

/// Hands the controlling terminal to `pgid`. ENOTTY means there is no
/// controlling terminal to hand over (piped stdin, test harness) and is
/// not an error.
pub fn give_terminal_to(pgid: Pid) -> Result<()> {
    match unistd::tcsetpgrp(libc::STDIN_FILENO, pgid) {
        Ok(()) | Err(Errno::ENOTTY) => Ok(()),
        Err(errno) => Err(ShellError::new(format!("tcsetpgrp: {}", errno.desc()))),
    }
}

/// Blocks the caller until no foreground job remains, waking only on
/// signal delivery. Must be entered with the job-control signals
/// blocked; the check and the suspension are atomic because sigsuspend
/// swaps in the empty mask only while sleeping. Leaves the job-control
/// signals unblocked.
pub fn wait_for_foreground() {
    let empty = SigSet::empty();
    while jobs::table().has_foreground_job() {
        // nix 0.26 has no SigSet::suspend; call sigsuspend directly on the
        // empty mask. EINTR is the expected return every time a signal wakes us.
        unsafe { libc::sigsuspend(empty.as_ref() as *const libc::sigset_t); }
    }
    unblock_job_signals();
}

extern "C" fn handle_sigchld(_: libc::c_int) {
    // Several children can change state before this handler runs once,
    // so drain every pending report rather than taking just one.
    loop {
        let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
        let (pid, state) = match waitpid(Pid::from_raw(-1), Some(flags)) {
            Ok(WaitStatus::Stopped(pid, _)) => (pid, ProcessState::Stopped),
            Ok(WaitStatus::Continued(pid)) => (pid, ProcessState::Running),
            Ok(WaitStatus::Exited(pid, _)) => (pid, ProcessState::Terminated),
            Ok(WaitStatus::Signaled(pid, _, _)) => (pid, ProcessState::Terminated),
            _ => break,
        };
        reconcile(pid, state);
    }
}

/// Applies one kernel-reported state change to the owning job and
/// re-arbitrates terminal ownership. Runs in signal context with the
/// job-control signals masked, so the direct table lock is safe.
fn reconcile(pid: Pid, state: ProcessState) {
    let mut table = jobs::table();
    let Some(job) = table.job_with_process_mut(pid) else {
        return; // not ours
    };
    if let Some(process) = job.process_mut(pid) {
        process.set_state(state);
    }
    let number = job.number();
    let pgid = job.pgid();
    let keeps_terminal =
        job.placement() == Placement::Foreground && state == ProcessState::Running;
    table.synchronize(number);
    drop(table);

    let owner = if keeps_terminal {
        pgid
    } else {
        unistd::getpgrp()
    };
    if give_terminal_to(owner).is_err() {
        let _ = unistd::write(
            libc::STDERR_FILENO,
            b"jsh: lost control of the terminal\n",
        );
        process::exit(1);
    }
}

extern "C" fn handle_sigint(_: libc::c_int) {
    forward_to_foreground(Signal::SIGINT);
}

extern "C" fn handle_sigtstp(_: libc::c_int) {
    forward_to_foreground(Signal::SIGTSTP);
}

/// Keyboard-generated signals belong to the foreground job, delivered to
/// its whole group via the negated group id. Without a foreground job
/// they are dropped.
fn forward_to_foreground(sig: Signal) {
    let table = jobs::table();
    if let Some(job) = table.foreground_job() {
        let _ = signal::kill(Pid::from_raw(-job.pgid().as_raw()), sig);
    }
}

extern "C" fn handle_sigquit(_: libc::c_int) {
    let _ = unistd::write(
        libc::STDERR_FILENO,
        b"jsh: terminating on SIGQUIT\n",
    );
    process::exit(0);
}
