use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use nix::unistd::Pid;
use once_cell::sync::Lazy;

use crate::signals;

/// Run state of a single process, as last reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Stopped,
    Terminated,
}

impl ProcessState {
    fn as_str(self) -> &'static str {
        match self {
            ProcessState::Running => "Running",
            ProcessState::Stopped => "Stopped",
            ProcessState::Terminated => "Terminated",
        }
    }
}

/// One OS process participating in a pipeline. The pid and the command
/// line are fixed at launch; only the run state changes, and only the
/// SIGCHLD reconciliation path changes it.
#[derive(Debug)]
pub struct Process {
    pid: Pid,
    command: String,
    state: ProcessState,
}

impl Process {
    pub fn new(pid: Pid, command: String) -> Self {
        Process {
            pid,
            command,
            state: ProcessState::Running,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn set_state(&mut self, state: ProcessState) {
        self.state = state;
    }
}

/// Whether a job currently claims the terminal or runs behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Foreground,
    Background,
}

impl Placement {
    fn as_str(self) -> &'static str {
        match self {
            Placement::Foreground => "Foreground",
            Placement::Background => "Background",
        }
    }
}

/// A numbered collection of processes sharing one process group.
/// Processes are kept in launch order; the group id is the pid of the
/// first process added.
#[derive(Debug)]
pub struct Job {
    number: u32,
    pgid: Pid,
    processes: Vec<Process>,
    placement: Placement,
}

impl Job {
    fn new(number: u32, placement: Placement) -> Self {
        Job {
            number,
            pgid: Pid::from_raw(0),
            processes: Vec::new(),
            placement,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn pgid(&self) -> Pid {
        self.pgid
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn set_placement(&mut self, placement: Placement) {
        self.placement = placement;
    }

    pub fn add_process(&mut self, process: Process) {
        if self.processes.is_empty() {
            self.pgid = process.pid();
        }
        self.processes.push(process);
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn contains_process(&self, pid: Pid) -> bool {
        self.processes.iter().any(|p| p.pid() == pid)
    }

    pub fn process_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.processes.iter_mut().find(|p| p.pid() == pid)
    }

    fn all_terminated(&self) -> bool {
        self.processes
            .iter()
            .all(|p| p.state() == ProcessState::Terminated)
    }

    fn any_running(&self) -> bool {
        self.processes
            .iter()
            .any(|p| p.state() == ProcessState::Running)
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] ({})", self.number, self.placement.as_str())?;
        for process in &self.processes {
            writeln!(
                f,
                "    {:<8} {:<11} {}",
                process.pid(),
                process.state().as_str(),
                process.command()
            )?;
        }
        Ok(())
    }
}

/// The authoritative collection of live jobs.
///
/// Job numbers start at 1, grow strictly while their holders live, and
/// become reusable once the numbered job is removed: the next number is
/// always one past the highest live number.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: BTreeMap<u32, Job>,
}

impl JobTable {
    pub fn new() -> Self {
        JobTable {
            jobs: BTreeMap::new(),
        }
    }

    /// Creates an empty job under the next free number and returns a
    /// handle for populating it.
    pub fn add_job(&mut self, placement: Placement) -> &mut Job {
        let number = self.jobs.keys().next_back().copied().unwrap_or(0) + 1;
        self.jobs
            .entry(number)
            .or_insert_with(|| Job::new(number, placement))
    }

    pub fn contains_job(&self, number: u32) -> bool {
        self.jobs.contains_key(&number)
    }

    pub fn job(&self, number: u32) -> Option<&Job> {
        self.jobs.get(&number)
    }

    pub fn job_mut(&mut self, number: u32) -> Option<&mut Job> {
        self.jobs.get_mut(&number)
    }

    pub fn contains_process(&self, pid: Pid) -> bool {
        self.jobs.values().any(|job| job.contains_process(pid))
    }

    pub fn job_with_process_mut(&mut self, pid: Pid) -> Option<&mut Job> {
        self.jobs
            .values_mut()
            .find(|job| job.contains_process(pid))
    }

    pub fn has_foreground_job(&self) -> bool {
        self.foreground_job().is_some()
    }

    pub fn foreground_job(&self) -> Option<&Job> {
        self.jobs
            .values()
            .find(|job| job.placement() == Placement::Foreground)
    }

    /// Re-derives a job's aggregate status after a process state change.
    /// A job whose processes have all terminated leaves the table; a
    /// foreground job with no running process falls back to the
    /// background, which is what releases the foreground waiter.
    pub fn synchronize(&mut self, number: u32) {
        let Some(job) = self.jobs.get_mut(&number) else {
            return;
        };
        if job.all_terminated() {
            self.jobs.remove(&number);
        } else if job.placement() == Placement::Foreground && !job.any_running() {
            job.set_placement(Placement::Background);
        }
    }
}

impl fmt::Display for JobTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for job in self.jobs.values() {
            write!(f, "{}", job)?;
        }
        Ok(())
    }
}

/// The one piece of process-wide state: the main loop and the signal
/// handlers must both see it.
static JOB_TABLE: Lazy<Mutex<JobTable>> = Lazy::new(|| Mutex::new(JobTable::new()));

/// Locks the table directly. Callers must already have the job-control
/// signals blocked (signal handlers are, by their installed mask; the
/// launcher and the foreground waiter block them explicitly).
pub fn table() -> MutexGuard<'static, JobTable> {
    JOB_TABLE.lock().unwrap()
}

/// Runs one table operation with the job-control signals blocked, so a
/// handler firing mid-operation can never find the table half-mutated
/// (or the lock held by its own thread).
pub fn with_table<R>(f: impl FnOnce(&mut JobTable) -> R) -> R {
    signals::block_job_signals();
    let result = f(&mut table());
    signals::unblock_job_signals();
    result
}
