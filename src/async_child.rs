use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::Child;
use std::task::{ Context, Poll };
use futures::stream::{ Stream, StreamExt };
use tokio::signal::unix::{ signal, Signal as SignalStream, SignalKind };

use crate::child::RawProcess;
use crate::common::{ WaitError, WaitTarget };
use crate::status::{ ExitStatus, ProcessExit };
use crate::sync::{ matching_status, reconcile };

/// Native wait that parks on `SIGCHLD` instead of blocking the thread.
struct NativeWaitFuture<'a, T: ?Sized> {
    target: &'a mut T,
    sigchld: SignalStream,
}

impl<'a, T: WaitTarget + ?Sized> NativeWaitFuture<'a, T> {
    fn new(target: &'a mut T) -> io::Result<Self> {
        let sigchld = signal(SignalKind::child())?;

        Ok(Self { target, sigchld })
    }
}

impl<'a, T: WaitTarget + ?Sized> Future for NativeWaitFuture<'a, T> {
    type Output = Result<ExitStatus, WaitError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        let this = self.get_mut();

        loop {
            match this.target.try_wait_native() {
                Ok(Some(status)) => return Poll::Ready(Ok(status)),
                Ok(None) => {},
                Err(error) => return Poll::Ready(Err(error)),
            }

            match this.sigchld.poll_recv(cx) {
                Poll::Ready(Some(())) => continue,
                Poll::Ready(None) => {
                    let error = io::Error::new(io::ErrorKind::Other, "SIGCHLD listener closed");

                    return Poll::Ready(Err(error.into()));
                },
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Async [`wait`](crate::wait). Must run inside a tokio runtime when
/// `using_reaper` is false.
pub async fn wait_async<T, S>(using_reaper: bool, notifications: S, target: &mut T) -> Result<(), WaitError>
where
    T: WaitTarget + ?Sized,
    S: Stream<Item = ProcessExit> + Unpin,
{
    if !using_reaper {
        let status = NativeWaitFuture::new(&mut *target)?.await?;

        return target.native_result(status);
    }

    let pid = target.pid();
    let mut notifications = notifications;
    let status = loop {
        match notifications.next().await {
            Some(exit) => {
                if let Some(status) = matching_status(pid, exit) {
                    break status;
                }
            },
            None => return Err(WaitError::StreamClosed(pid)),
        }
    };

    reconcile(pid, status.exit_result(), target.release())
}

pub async fn wait_command_async<S>(using_reaper: bool, notifications: S, child: &mut Child) -> Result<(), WaitError>
where
    S: Stream<Item = ProcessExit> + Unpin,
{
    wait_async(using_reaper, notifications, child).await
}

pub async fn wait_process_async<S>(using_reaper: bool, notifications: S, mut process: RawProcess) -> Result<(), WaitError>
where
    S: Stream<Item = ProcessExit> + Unpin,
{
    wait_async(using_reaper, notifications, &mut process).await
}
