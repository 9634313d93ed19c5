//! Emulates a blocking wait on a child process when a shared reaper, not the
//! process owner, collects exit statuses and publishes them as
//! [`ProcessExit`] notifications.

pub use nix::unistd::Pid;
pub use nix::sys::signal::Signal;
pub use nix::Error as NixError;
pub use nix::errno::Errno as NixErrno;

mod common;
mod status;
mod child;
mod command;
mod router;
mod sync;
#[cfg(feature = "async")]
mod async_child;
mod utils;

pub use common::{ ExitError, WaitError, WaitTarget };
pub use status::{ ExitStatus, ProcessExit };
pub use child::RawProcess;
pub use router::{ ExitRouter, Subscription };
#[cfg(feature = "async")]
pub use router::AsyncSubscription;
pub use sync::{ wait, wait_command, wait_process };
#[cfg(feature = "async")]
pub use async_child::{ wait_async, wait_command_async, wait_process_async };
