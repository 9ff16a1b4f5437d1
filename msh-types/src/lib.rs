use anyhow::Result;
use libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::unistd::Pid;
use std::fmt::Debug;
use std::fs::File;
use std::io::Write;
use std::mem;
use std::os::unix::io::{FromRawFd, RawFd};

/// Per-evaluation execution context passed to builtins and the process
/// runner. Owns no resources; the raw descriptors are borrowed from the
/// shell and default to the standard streams.
#[derive(Clone)]
pub struct Context {
    pub shell_pid: Pid,
    pub interactive: bool,
    pub foreground: bool,
    pub infile: RawFd,
    pub outfile: RawFd,
    pub errfile: RawFd,
    pub save_history: bool,
}

impl Context {
    pub fn new(shell_pid: Pid, interactive: bool) -> Self {
        Context {
            shell_pid,
            interactive,
            foreground: true,
            infile: STDIN_FILENO,
            outfile: STDOUT_FILENO,
            errfile: STDERR_FILENO,
            save_history: true,
        }
    }

    pub fn write_stdout(&self, msg: &str) -> Result<()> {
        let mut file = unsafe { File::from_raw_fd(self.outfile) };
        writeln!(&mut file, "{msg}")?;
        mem::forget(file);
        Ok(())
    }

    pub fn write_stderr(&self, msg: &str) -> Result<()> {
        let mut file = unsafe { File::from_raw_fd(self.errfile) };
        writeln!(&mut file, "{msg}")?;
        mem::forget(file);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.infile = STDIN_FILENO;
        self.outfile = STDOUT_FILENO;
        self.errfile = STDERR_FILENO;
        self.foreground = true;
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        f.debug_struct("Context")
            .field("shell_pid", &self.shell_pid)
            .field("interactive", &self.interactive)
            .field("foreground", &self.foreground)
            .field("infile", &self.infile)
            .field("outfile", &self.outfile)
            .field("errfile", &self.errfile)
            .field("save_history", &self.save_history)
            .finish()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExitStatus {
    ExitedWith(i32),
    Running(Pid),
}

impl ExitStatus {
    /// Exit code for prompt/status purposes. A job still running in the
    /// background counts as success.
    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::ExitedWith(code) => *code,
            ExitStatus::Running(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_defaults_to_standard_streams() {
        let ctx = Context::new(Pid::from_raw(42), true);
        assert_eq!(ctx.infile, STDIN_FILENO);
        assert_eq!(ctx.outfile, STDOUT_FILENO);
        assert_eq!(ctx.errfile, STDERR_FILENO);
        assert!(ctx.save_history);
    }

    #[test]
    fn exit_status_code() {
        assert_eq!(ExitStatus::ExitedWith(2).code(), 2);
        assert_eq!(ExitStatus::Running(Pid::from_raw(1)).code(), 0);
    }
}
