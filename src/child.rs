use std::io;
use nix::unistd::Pid;
use nix::sys::wait::{ waitpid, WaitPidFlag };
use derive_more::From;

use crate::common::{ WaitError, WaitTarget };
use crate::status::{ ExitStatus, ProcessExit };

/// A bare pid owned by the caller, the counterpart of a spawned command.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, From)]
pub struct RawProcess(pub Pid);

impl RawProcess {
    pub fn from_raw(pid: i32) -> Self {
        RawProcess(Pid::from_raw(pid))
    }

    fn wait_with(&self, options: Option<WaitPidFlag>) -> nix::Result<Option<ExitStatus>> {
        let status = waitpid(self.0, options)?;

        Ok(ProcessExit::from_wait_status(status).map(|exit| exit.status))
    }
}

impl WaitTarget for RawProcess {
    fn pid(&self) -> Pid {
        self.0
    }

    fn wait_native(&mut self) -> Result<ExitStatus, WaitError> {
        loop {
            match self.wait_with(None)? {
                Some(status) if status.is_terminal() => return Ok(status),
                _ => continue,
            }
        }
    }

    fn try_wait_native(&mut self) -> Result<Option<ExitStatus>, WaitError> {
        let status = self.wait_with(Some(WaitPidFlag::WNOHANG))?;

        Ok(status.filter(ExitStatus::is_terminal))
    }

    fn release(&mut self) -> io::Result<()> {
        waitpid(self.0, Some(WaitPidFlag::WNOHANG))?;

        Ok(())
    }

    // waitpid only fails on the syscall; the exit code is not an error
    fn native_result(&self, _status: ExitStatus) -> Result<(), WaitError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nix::sys::signal::Signal;
    use super::*;

    #[test]
    fn native_verdict_ignores_exit_code() {
        let process = RawProcess::from_raw(i32::MAX);

        assert!(process.native_result(ExitStatus::Exited(4)).is_ok());
        assert!(process.native_result(ExitStatus::Signaled(Signal::SIGKILL)).is_ok());
    }

    #[test]
    fn native_wait_on_foreign_pid_fails() {
        let mut process = RawProcess::from_raw(i32::MAX);

        match process.wait_native() {
            Err(WaitError::Nix(errno)) => assert_eq!(errno, nix::errno::Errno::ECHILD),
            other => panic!("unexpected {:?}", other),
        }
    }
}
