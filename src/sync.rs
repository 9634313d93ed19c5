use std::io;
use std::process::Child;
use log::{ debug, trace, warn };
use nix::unistd::Pid;

use crate::child::RawProcess;
use crate::common::{ WaitError, WaitTarget };
use crate::status::{ ExitStatus, ProcessExit };
use crate::utils::is_no_child;

/// Blocks until `target` terminates and reports it like a direct wait would.
///
/// Without a shared reaper this is the target's own native wait, judged by
/// [`WaitTarget::native_result`]. With one,
/// the exit is taken from `notifications`: entries for other pids and
/// non-terminal entries are skipped, and the first terminal entry for the
/// target decides the result. The target is then released; its expected
/// `ECHILD` is ignored and any other release failure only surfaces when the
/// process itself succeeded.
///
/// If `notifications` ends first, [`WaitError::StreamClosed`] is returned and
/// the target is not released.
///
/// `notifications` must not be drained by another waiter at the same time,
/// otherwise exits meant for it are lost. Use
/// [`ExitRouter`](crate::ExitRouter) to give each waiter its own stream.
pub fn wait<T, S>(using_reaper: bool, notifications: S, target: &mut T) -> Result<(), WaitError>
where
    T: WaitTarget + ?Sized,
    S: IntoIterator<Item = ProcessExit>,
{
    if !using_reaper {
        let status = target.wait_native()?;

        return target.native_result(status);
    }

    let pid = target.pid();
    let status = notifications
        .into_iter()
        .find_map(|exit| matching_status(pid, exit))
        .ok_or(WaitError::StreamClosed(pid))?;

    reconcile(pid, status.exit_result(), target.release())
}

/// [`wait`] for a spawned command.
pub fn wait_command<S>(using_reaper: bool, notifications: S, child: &mut Child) -> Result<(), WaitError>
where
    S: IntoIterator<Item = ProcessExit>,
{
    wait(using_reaper, notifications, child)
}

/// [`wait`] for a bare pid.
pub fn wait_process<S>(using_reaper: bool, notifications: S, mut process: RawProcess) -> Result<(), WaitError>
where
    S: IntoIterator<Item = ProcessExit>,
{
    wait(using_reaper, notifications, &mut process)
}

pub(crate) fn matching_status(pid: Pid, exit: ProcessExit) -> Option<ExitStatus> {
    if exit.pid != pid {
        debug!("waiting for pid {}, skipping {}", pid, exit);
        return None;
    }

    if !exit.status.is_terminal() {
        debug!("skipping non-terminal {}", exit);
        return None;
    }

    trace!("matched {}", exit);
    Some(exit.status)
}

pub(crate) fn reconcile(
    pid: Pid,
    result: Result<(), WaitError>,
    release: io::Result<()>,
) -> Result<(), WaitError> {
    let error = match release {
        Ok(()) => return result,
        Err(error) => error,
    };

    if is_no_child(&error) {
        debug!("pid {} already reaped: {}", pid, error);
        return result;
    }

    match result {
        Ok(()) => Err(WaitError::Release(error)),
        Err(wait_error) => {
            warn!("releasing pid {} failed after {}: {}", pid, wait_error, error);
            Err(wait_error)
        },
    }
}
