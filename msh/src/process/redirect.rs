use libc::{STDIN_FILENO, STDOUT_FILENO};
use nix::fcntl::{OFlag, open};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2};

use crate::shell::APP_NAME;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// `> path`: stdout to the file, created/truncated.
    Output(String),
    /// `< path`: stdin from the file.
    Input(String),
}

impl Redirect {
    /// Rewire one standard stream. Runs post-fork, pre-exec, in the
    /// child only. Open failures are reported and the stream is left as
    /// inherited; exec proceeds regardless.
    pub(crate) fn apply_in_child(&self) {
        match self {
            Redirect::Output(path) => {
                let flags = OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC;
                match open(path.as_str(), flags, Mode::from_bits_truncate(0o644)) {
                    Ok(fd) => {
                        if let Err(err) = dup2(fd, STDOUT_FILENO) {
                            eprintln!("{APP_NAME}: failed to redirect stdout to {path}: {err}");
                        }
                        close(fd).ok();
                    }
                    Err(err) => {
                        eprintln!("{APP_NAME}: failed to open output redirect file {path}: {err}");
                    }
                }
            }
            Redirect::Input(path) => {
                match open(path.as_str(), OFlag::O_RDONLY, Mode::empty()) {
                    Ok(fd) => {
                        if let Err(err) = dup2(fd, STDIN_FILENO) {
                            eprintln!("{APP_NAME}: failed to redirect stdin from {path}: {err}");
                        }
                        close(fd).ok();
                    }
                    Err(err) => {
                        eprintln!("{APP_NAME}: failed to open input redirect file {path}: {err}");
                    }
                }
            }
        }
    }
}
