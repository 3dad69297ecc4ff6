//! Forked helper processes
//!
//! Byte-range locks and write visibility are defined between processes, not
//! threads, so the cases that need a second actor fork one. The child runs a
//! closure, reports a failure message through a pipe and leaves with
//! `_exit`, which skips every destructor inherited from the parent (the
//! working directory guard in particular). A second pipe lets the child tell
//! the parent it reached a checkpoint.

use std::fs::File;
use std::io::{Read, Write};
use std::panic::{self, AssertUnwindSafe};

use log::{debug, error, warn};
use nix::fcntl::OFlag;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, pipe2, ForkResult, Pid};

use crate::error::{CaseError, CaseResult, OsResultExt};

/// Exit code of a child whose closure returned an error
const EXIT_FAILED: i32 = 1;
/// Exit code of a child whose closure panicked
const EXIT_PANICKED: i32 = 2;

/// A forked child that has not been joined yet
///
/// Dropping without calling [`ChildProcess::wait`] still blocks until the
/// child exits, so no zombie outlives the case.
#[derive(Debug)]
pub struct ChildProcess {
    pid: Option<Pid>,
    report: File,
    ready: File,
}

/// Child side of the checkpoint pipe
#[derive(Debug)]
pub struct ChildSignal {
    ready: File,
}

impl ChildSignal {
    /// Tell the parent the child reached its checkpoint
    pub fn ready(&self) -> CaseResult {
        (&self.ready).write_all(b"r").op("signal parent")
    }
}

/// Fork, run `body` in the child and return a handle to it in the parent
pub fn spawn_child<F>(body: F) -> CaseResult<ChildProcess>
where
    F: FnOnce(&ChildSignal) -> CaseResult,
{
    // Close-on-exec so no other exec'd process keeps a write end open and
    // holds off EOF
    let (report_read, report_write) = pipe2(OFlag::O_CLOEXEC).op("pipe")?;
    let (ready_read, ready_write) = pipe2(OFlag::O_CLOEXEC).op("pipe")?;

    // SAFETY: the child only runs `body` and then calls `_exit`
    match unsafe { fork() }.op("fork")? {
        ForkResult::Parent { child } => {
            drop(report_write);
            drop(ready_write);
            debug!("Forked child {}", child);
            Ok(ChildProcess {
                pid: Some(child),
                report: File::from(report_read),
                ready: File::from(ready_read),
            })
        }
        ForkResult::Child => {
            drop(report_read);
            drop(ready_read);
            let mut report = File::from(report_write);
            let signal = ChildSignal {
                ready: File::from(ready_write),
            };
            let code = match panic::catch_unwind(AssertUnwindSafe(|| body(&signal))) {
                Ok(Ok(())) => 0,
                Ok(Err(e)) => {
                    error!("Child process failed: {}", e);
                    let _ = report.write_all(e.to_string().as_bytes());
                    EXIT_FAILED
                }
                Err(_) => {
                    let _ = report.write_all(b"child panicked");
                    EXIT_PANICKED
                }
            };
            drop(report);
            drop(signal);
            // SAFETY: terminates the forked child without running the
            // parent's destructors
            unsafe { libc::_exit(code) }
        }
    }
}

impl ChildProcess {
    pub fn pid(&self) -> Option<Pid> {
        self.pid
    }

    /// Block until the child signals its checkpoint.
    ///
    /// Returns false if the child exited without signalling.
    pub fn wait_ready(&mut self) -> CaseResult<bool> {
        let mut byte = [0u8; 1];
        loop {
            match self.ready.read(&mut byte) {
                Ok(0) => return Ok(false),
                Ok(_) => return Ok(true),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).op("wait for child checkpoint"),
            }
        }
    }

    /// Block until the child exits; an unclean exit becomes `CaseError::Child`
    pub fn wait(mut self) -> CaseResult {
        let message = self.read_report();

        let Some(pid) = self.pid.take() else {
            return Ok(());
        };

        match waitpid(pid, None).op("waitpid")? {
            WaitStatus::Exited(_, 0) => {
                debug!("Child {} exited cleanly", pid);
                Ok(())
            }
            WaitStatus::Exited(_, code) if message.is_empty() => Err(CaseError::Child(format!(
                "child {} exited with status {}",
                pid, code
            ))),
            WaitStatus::Exited(_, _) => Err(CaseError::Child(message)),
            status => Err(CaseError::Child(format!(
                "child {} exited with abnormal status: {:?}",
                pid, status
            ))),
        }
    }

    /// Everything the child wrote to its report pipe; EOF arrives once the
    /// child has exited and closed its end
    fn read_report(&mut self) -> String {
        let mut buf = Vec::new();
        if let Err(e) = self.report.read_to_end(&mut buf) {
            warn!("Failed to read child report: {}", e);
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if let Some(pid) = self.pid.take() {
            if let Err(e) = waitpid(pid, None) {
                error!("Failed to reap child {}: {}", pid, e);
            }
        }
    }
}
