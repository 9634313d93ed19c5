use std::io;
use std::mem;
use std::os::unix::process::ExitStatusExt;
use std::process::{ self, Child };
use nix::unistd::Pid;

use crate::common::{ WaitError, WaitTarget };
use crate::status::ExitStatus;

fn convert(status: process::ExitStatus) -> Result<ExitStatus, WaitError> {
    Ok(ExitStatus::from_raw(status.into_raw())?)
}

impl WaitTarget for Child {
    fn pid(&self) -> Pid {
        Pid::from_raw(self.id() as i32)
    }

    fn wait_native(&mut self) -> Result<ExitStatus, WaitError> {
        convert(self.wait()?)
    }

    fn try_wait_native(&mut self) -> Result<Option<ExitStatus>, WaitError> {
        match self.try_wait()? {
            Some(status) => Ok(Some(convert(status)?)),
            None => Ok(None),
        }
    }

    // A blocking `wait` here could attach to a recycled pid, so only poll.
    fn release(&mut self) -> io::Result<()> {
        mem::drop(self.stdin.take());
        self.try_wait()?;

        Ok(())
    }
}
