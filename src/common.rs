use std::io;
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use nix::Error as NixError;
use thiserror::Error as ThisError;

use crate::status::ExitStatus;

/// A process exited normally with a non-zero code.
#[derive(ThisError, Debug, Copy, Clone, PartialEq, Eq)]
#[error("exit status {exit_code}")]
pub struct ExitError {
    pub exit_code: i32,
}

#[derive(ThisError, Debug)]
pub enum WaitError {
    /// Rendered with the `SIGxxx` name (`signal: SIGKILL`), not the
    /// strsignal description some runtimes print (`signal: killed`).
    #[error("signal: {}", .0.as_str())]
    Signaled(Signal),
    #[error(transparent)]
    Exit(#[from] ExitError),
    #[error("{0}")]
    Release(#[source] io::Error),
    #[error("notification stream closed before pid {0} exited")]
    StreamClosed(Pid),
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Nix(#[from] NixError),
}

impl WaitError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            WaitError::Exit(ExitError { exit_code }) => Some(*exit_code),
            _ => None,
        }
    }

    pub fn signal(&self) -> Option<Signal> {
        match self {
            WaitError::Signaled(signal) => Some(*signal),
            _ => None,
        }
    }

    pub fn is_stream_closed(&self) -> bool {
        match self {
            WaitError::StreamClosed(_) => true,
            _ => false,
        }
    }
}

/// Something a caller can block on until it terminates.
///
/// `wait_native` and `try_wait_native` reap through the OS directly and are
/// only used when no shared reaper is running. `release` runs after the
/// shared reaper already reported the exit, so under normal operation it
/// fails with `ECHILD`.
pub trait WaitTarget {
    fn pid(&self) -> Pid;

    fn wait_native(&mut self) -> Result<ExitStatus, WaitError>;

    /// Non-blocking variant of `wait_native`, `Ok(None)` while still running.
    fn try_wait_native(&mut self) -> Result<Option<ExitStatus>, WaitError>;

    fn release(&mut self) -> io::Result<()>;

    /// Verdict of the native wait once it produced `status`. Defaults to the
    /// classification of a reaped exit.
    fn native_result(&self, status: ExitStatus) -> Result<(), WaitError> {
        status.exit_result()
    }
}
