use std::env;
use std::error::Error;
use std::process::{ self, Command };
use std::sync::Arc;
use std::thread;
use log::{ debug, error, info };
use nix::errno::Errno;
use nix::sys::wait::waitpid;

use reapwait::{ wait_command, ExitRouter, Pid, ProcessExit, WaitError };

fn usage() -> ! {
    eprintln!("usage: reapwait <command> [args...]");
    eprintln!();
    eprintln!("  REAPWAIT_DIRECT=1  wait on the child directly instead of through the reaper");
    process::exit(2);
}

// Reaps every child of this process and publishes the exits until none are left.
fn run_reaper(router: Arc<ExitRouter>) {
    loop {
        match waitpid(Pid::from_raw(-1), None) {
            Ok(status) => {
                if let Some(exit) = ProcessExit::from_wait_status(status) {
                    debug!("reaped {}", exit);
                    router.publish(exit);
                }
            },
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => break,
            Err(err) => {
                error!("waitpid failed: {}", err);
                break;
            },
        }
    }

    router.close();
}

fn exit_code(result: &Result<(), WaitError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(WaitError::Exit(err)) => err.exit_code,
        Err(WaitError::Signaled(signal)) => 128 + *signal as i32,
        Err(_) => 1,
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (program, rest) = match args.split_first() {
        Some(split) => split,
        None => usage(),
    };
    let using_reaper = env::var_os("REAPWAIT_DIRECT").is_none();

    let router = Arc::new(ExitRouter::new());
    let mut child = Command::new(program).args(rest).spawn()?;
    let pid = Pid::from_raw(child.id() as i32);
    let subscription = router.subscribe(pid);

    info!("started {} as pid {}, shared reaper: {}", program, pid, using_reaper);

    let reaper = if using_reaper {
        let router = Arc::clone(&router);

        Some(thread::spawn(move || run_reaper(router)))
    } else {
        None
    };

    let result = wait_command(using_reaper, subscription, &mut child);

    if let Some(reaper) = reaper {
        if reaper.join().is_err() {
            error!("reaper thread panicked");
        }
    }

    if let Err(err) = &result {
        info!("pid {}: {}", pid, err);
    }

    process::exit(exit_code(&result));
}
