use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;
use tracing::{debug, warn};

use super::ProcessState;
use crate::shell::shutdown_requested;

/// Block until the child terminates. EINTR restarts the wait unless an
/// interrupt asked the shell to shut down, in which case the child is
/// left running and reported as such.
pub fn wait_pid(pid: Pid) -> ProcessState {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(pid, status)) => {
                debug!("process {} exited with status {}", pid, status);
                return ProcessState::Completed(status as u8, None);
            }
            Ok(WaitStatus::Signaled(pid, signal, core_dumped)) => {
                debug!(
                    "process {} killed by {:?} core_dumped:{}",
                    pid, signal, core_dumped
                );
                return ProcessState::Completed(1, Some(signal));
            }
            Err(nix::errno::Errno::EINTR) => {
                if shutdown_requested() {
                    debug!("interrupted waiting for {}, abandoning wait", pid);
                    return ProcessState::Running;
                }
            }
            Err(nix::errno::Errno::ECHILD) => {
                debug!("no child {} (ECHILD), treating as completed", pid);
                return ProcessState::Completed(1, None);
            }
            status => {
                warn!("unexpected waitpid status for {}: {:?}", pid, status);
                return ProcessState::Completed(1, None);
            }
        }
    }
}
