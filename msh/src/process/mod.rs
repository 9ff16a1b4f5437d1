mod fork;
mod redirect;
mod wait;

pub use redirect::Redirect;
pub use wait::wait_pid;

use anyhow::Result;
use msh_types::Context;
use nix::sys::signal::Signal;
use nix::unistd::Pid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Completed(u8, Option<Signal>),
}

/// One external command to spawn: argv plus optional stream rewiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pub argv: Vec<String>,
    pub redirects: Vec<Redirect>,
}

impl Process {
    pub fn new(argv: Vec<String>) -> Self {
        Process {
            argv,
            redirects: Vec::new(),
        }
    }

    pub fn with_redirects(
        argv: Vec<String>,
        redirect_out: Option<String>,
        redirect_in: Option<String>,
    ) -> Self {
        let mut process = Process::new(argv);
        if let Some(path) = redirect_out {
            process.redirects.push(Redirect::Output(path));
        }
        if let Some(path) = redirect_in {
            process.redirects.push(Redirect::Input(path));
        }
        process
    }

    /// Fork and exec. Returns the child pid; the caller decides whether
    /// to wait on it.
    pub fn spawn(&self, ctx: &Context) -> Result<Pid> {
        fork::fork_process(ctx, self)
    }
}
