use std::fmt;
use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

use crate::common::{ ExitError, WaitError };

/// How a process stopped running, stripped of the OS bit layout.
///
/// Only `Exited` and `Signaled` are terminal. `Stopped` and `Continued`
/// are job-control transitions and never end a wait.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ExitStatus {
    Exited(i32),
    Signaled(Signal),
    Stopped(Signal),
    Continued,
}

impl ExitStatus {
    /// Decodes a raw wait(2) status word.
    pub fn from_raw(raw: i32) -> nix::Result<ExitStatus> {
        if libc::WIFEXITED(raw) {
            Ok(ExitStatus::Exited(libc::WEXITSTATUS(raw)))
        } else if libc::WIFSIGNALED(raw) {
            Ok(ExitStatus::Signaled(Signal::try_from(libc::WTERMSIG(raw))?))
        } else if libc::WIFSTOPPED(raw) {
            Ok(ExitStatus::Stopped(Signal::try_from(libc::WSTOPSIG(raw))?))
        } else if libc::WIFCONTINUED(raw) {
            Ok(ExitStatus::Continued)
        } else {
            Err(Errno::EINVAL)
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            ExitStatus::Exited(_) | ExitStatus::Signaled(_) => true,
            _ => false,
        }
    }

    /// Maps a terminal status onto the error model of a blocking wait:
    /// `Exited(0)` is success, any other exit code is an [`ExitError`] and a
    /// signal death is [`WaitError::Signaled`].
    ///
    /// Non-terminal statuses carry no verdict and map to `Ok(())`.
    pub fn exit_result(self) -> Result<(), WaitError> {
        match self {
            ExitStatus::Signaled(signal) => Err(WaitError::Signaled(signal)),
            ExitStatus::Exited(code) if code != 0 => {
                Err(ExitError { exit_code: code }.into())
            },
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exit status {}", code),
            ExitStatus::Signaled(signal) => write!(f, "signal: {}", signal.as_str()),
            ExitStatus::Stopped(signal) => write!(f, "stopped: {}", signal.as_str()),
            ExitStatus::Continued => write!(f, "continued"),
        }
    }
}

/// One process state change as observed by the reaper.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ProcessExit {
    pub pid: Pid,
    pub status: ExitStatus,
}

impl ProcessExit {
    pub fn new(pid: Pid, status: ExitStatus) -> Self {
        Self { pid, status }
    }

    pub fn exited(pid: Pid, code: i32) -> Self {
        Self::new(pid, ExitStatus::Exited(code))
    }

    pub fn signaled(pid: Pid, signal: Signal) -> Self {
        Self::new(pid, ExitStatus::Signaled(signal))
    }

    /// Builds a notification from a `waitpid` result.
    ///
    /// Returns `None` for `StillAlive`, which names no process. Ptrace stops
    /// are reported as `Stopped`.
    pub fn from_wait_status(status: WaitStatus) -> Option<Self> {
        let exit = match status {
            WaitStatus::Exited(pid, code) => Self::exited(pid, code),
            WaitStatus::Signaled(pid, signal, _) => Self::signaled(pid, signal),
            WaitStatus::Stopped(pid, signal) => Self::new(pid, ExitStatus::Stopped(signal)),
            #[cfg(any(target_os = "linux", target_os = "android"))]
            WaitStatus::PtraceEvent(pid, signal, _) => {
                Self::new(pid, ExitStatus::Stopped(signal))
            },
            #[cfg(any(target_os = "linux", target_os = "android"))]
            WaitStatus::PtraceSyscall(pid) => {
                Self::new(pid, ExitStatus::Stopped(Signal::SIGTRAP))
            },
            WaitStatus::Continued(pid) => Self::new(pid, ExitStatus::Continued),
            WaitStatus::StillAlive => return None,
        };

        Some(exit)
    }

    pub fn from_raw(pid: Pid, raw: i32) -> nix::Result<Self> {
        Ok(Self::new(pid, ExitStatus::from_raw(raw)?))
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "pid {}: {}", self.pid, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_raw_exit() {
        assert_eq!(ExitStatus::from_raw(0).unwrap(), ExitStatus::Exited(0));
        assert_eq!(ExitStatus::from_raw(13 << 8).unwrap(), ExitStatus::Exited(13));
        assert_eq!(ExitStatus::from_raw(255 << 8).unwrap(), ExitStatus::Exited(255));
    }

    #[test]
    fn decodes_raw_signal() {
        let raw = Signal::SIGKILL as i32;

        assert_eq!(ExitStatus::from_raw(raw).unwrap(), ExitStatus::Signaled(Signal::SIGKILL));
        // core dump flag does not change the verdict
        assert_eq!(ExitStatus::from_raw(raw | 0x80).unwrap(), ExitStatus::Signaled(Signal::SIGKILL));
    }

    #[test]
    fn decodes_raw_stop_and_continue() {
        let stopped = ((Signal::SIGSTOP as i32) << 8) | 0x7f;

        assert_eq!(ExitStatus::from_raw(stopped).unwrap(), ExitStatus::Stopped(Signal::SIGSTOP));
        assert_eq!(ExitStatus::from_raw(0xffff).unwrap(), ExitStatus::Continued);
        assert!(!ExitStatus::Continued.is_terminal());
        assert!(!ExitStatus::Stopped(Signal::SIGSTOP).is_terminal());
    }

    #[test]
    fn zero_exit_is_success() {
        assert!(ExitStatus::Exited(0).exit_result().is_ok());
    }

    #[test]
    fn non_zero_exit_is_exit_error() {
        let err = ExitStatus::Exited(7).exit_result().unwrap_err();

        assert_eq!(err.exit_code(), Some(7));
        assert_eq!(err.to_string(), "exit status 7");
    }

    #[test]
    fn every_signal_is_named() {
        for signal in Signal::iterator() {
            let err = ExitStatus::Signaled(signal).exit_result().unwrap_err();

            assert_eq!(err.to_string(), format!("signal: {}", signal.as_str()));
            assert_eq!(err.exit_code(), None);
        }
    }

    #[test]
    fn wait_status_conversion() {
        let pid = Pid::from_raw(42);

        assert_eq!(
            ProcessExit::from_wait_status(WaitStatus::Exited(pid, 3)),
            Some(ProcessExit::exited(pid, 3)),
        );
        assert_eq!(
            ProcessExit::from_wait_status(WaitStatus::Signaled(pid, Signal::SIGTERM, false)),
            Some(ProcessExit::signaled(pid, Signal::SIGTERM)),
        );
        assert_eq!(
            ProcessExit::from_wait_status(WaitStatus::Continued(pid)),
            Some(ProcessExit::new(pid, ExitStatus::Continued)),
        );
        assert_eq!(ProcessExit::from_wait_status(WaitStatus::StillAlive), None);
    }
}
