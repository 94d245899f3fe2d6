use std::fmt;

use nix::errno::Errno;

/// The single error type the shell reports: a human-readable, one-line
/// message. Syscall failures, malformed builtin arguments, and parse
/// errors all funnel into this so the read loop only has one thing to
/// print before carrying on.
#[derive(Debug)]
pub struct ShellError(String);

impl ShellError {
    pub fn new(message: impl Into<String>) -> Self {
        ShellError(message.into())
    }
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ShellError {}

impl From<Errno> for ShellError {
    fn from(errno: Errno) -> Self {
        ShellError(errno.desc().to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShellError>;
