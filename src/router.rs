use std::collections::{ HashMap, VecDeque };
use std::sync::{ mpsc, Mutex, MutexGuard, PoisonError };
use log::{ debug, trace };
use nix::unistd::Pid;

use crate::status::ProcessExit;

#[cfg(feature = "async")]
use futures::channel::oneshot;
#[cfg(feature = "async")]
use futures::future::{ self, FutureExt };
#[cfg(feature = "async")]
use futures::stream::{ Stream, StreamExt };

const DEFAULT_BACKLOG: usize = 1024;

enum Waiter {
    Blocking(mpsc::SyncSender<ProcessExit>),
    #[cfg(feature = "async")]
    Async(oneshot::Sender<ProcessExit>),
}

impl Waiter {
    /// False when the subscription was dropped before the exit arrived.
    fn deliver(self, exit: ProcessExit) -> bool {
        match self {
            Waiter::Blocking(sender) => sender.try_send(exit).is_ok(),
            #[cfg(feature = "async")]
            Waiter::Async(sender) => sender.send(exit).is_ok(),
        }
    }
}

#[derive(Default)]
struct RouterState {
    waiters: HashMap<Pid, Vec<Waiter>>,
    backlog: VecDeque<ProcessExit>,
    closed: bool,
}

/// Routes each reaped exit to the waiters of that pid only.
///
/// The reaper calls [`publish`](ExitRouter::publish) for every reaped child
/// and each waiter reads from its own [`Subscription`], so concurrent waits
/// on different pids never steal each other's exits. An exit published
/// before anyone subscribed to its pid is kept in a bounded backlog and
/// handed to the next subscriber of that pid.
pub struct ExitRouter {
    state: Mutex<RouterState>,
    backlog_limit: usize,
}

impl ExitRouter {
    pub fn new() -> Self {
        Self::with_backlog(DEFAULT_BACKLOG)
    }

    /// Keeps at most `limit` unclaimed exits, dropping the oldest first.
    pub fn with_backlog(limit: usize) -> Self {
        Self {
            state: Mutex::new(RouterState::default()),
            backlog_limit: limit,
        }
    }

    fn lock(&self) -> MutexGuard<RouterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, pid: Pid, waiter: Waiter) {
        let mut state = self.lock();

        if let Some(index) = state.backlog.iter().position(|exit| exit.pid == pid) {
            if let Some(exit) = state.backlog.remove(index) {
                trace!("delivering backlogged {}", exit);

                if !waiter.deliver(exit) {
                    state.backlog.insert(index, exit);
                }
            }
        } else if !state.closed {
            state.waiters.entry(pid).or_insert_with(Vec::new).push(waiter);
        }
    }

    /// Returns a stream yielding the next terminal exit of `pid`, or nothing
    /// once the router is closed.
    pub fn subscribe(&self, pid: Pid) -> Subscription {
        let (sender, receiver) = mpsc::sync_channel(1);

        self.register(pid, Waiter::Blocking(sender));

        Subscription { pid, receiver }
    }

    #[cfg(feature = "async")]
    pub fn subscribe_async(&self, pid: Pid) -> AsyncSubscription {
        let (sender, receiver) = oneshot::channel();

        self.register(pid, Waiter::Async(sender));

        AsyncSubscription { pid, receiver }
    }

    /// Hands a reaped exit to its waiters. Non-terminal statuses are dropped.
    pub fn publish(&self, exit: ProcessExit) {
        if !exit.status.is_terminal() {
            trace!("ignoring non-terminal {}", exit);
            return;
        }

        let mut state = self.lock();
        let waiters = state.waiters.remove(&exit.pid).unwrap_or_default();
        let mut delivered = false;

        for waiter in waiters {
            delivered |= waiter.deliver(exit);
        }

        if delivered {
            return;
        }

        if state.backlog.len() >= self.backlog_limit {
            if let Some(dropped) = state.backlog.pop_front() {
                debug!("backlog full, dropping {}", dropped);
            }
        }

        if self.backlog_limit > 0 {
            state.backlog.push_back(exit);
        }
    }

    /// Ends every pending and future subscription. Backlogged exits can still
    /// be claimed.
    pub fn close(&self) {
        let mut state = self.lock();

        state.closed = true;
        state.waiters.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl Default for ExitRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocking stream of at most one exit for a single pid.
#[derive(Debug)]
pub struct Subscription {
    pid: Pid,
    receiver: mpsc::Receiver<ProcessExit>,
}

impl Subscription {
    pub fn pid(&self) -> Pid {
        self.pid
    }
}

impl IntoIterator for Subscription {
    type Item = ProcessExit;
    type IntoIter = mpsc::IntoIter<ProcessExit>;

    fn into_iter(self) -> Self::IntoIter {
        self.receiver.into_iter()
    }
}

/// Async counterpart of [`Subscription`].
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct AsyncSubscription {
    pid: Pid,
    receiver: oneshot::Receiver<ProcessExit>,
}

#[cfg(feature = "async")]
impl AsyncSubscription {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Yields the exit, or ends without one once the router is closed.
    pub fn into_stream(self) -> impl Stream<Item = ProcessExit> + Unpin {
        self.receiver
            .into_stream()
            .filter_map(|result| future::ready(result.ok()))
    }
}
