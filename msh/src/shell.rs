use crate::parser::{self, Command};
use crate::process::{Process, ProcessState, wait_pid};
use anyhow::{Context as _, Result};
use libc::c_int;
use msh_builtin::ShellProxy;
use msh_history::{HistoryEntry, HistoryStore, current_time_millis};
use msh_types::{Context, ExitStatus};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::unistd::{Pid, chdir, getpid};
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

pub const APP_NAME: &str = "msh";

/// Set from the SIGINT handler. Nothing else may run in signal context;
/// the main loop observes the flag and performs the actual shutdown.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_signum: c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

/// Shell state: own pid, exit flag, and the handle on the shared
/// history segment. The handle is owned here and passed down
/// explicitly; there is no global segment state.
pub struct Shell {
    pub pid: Pid,
    pub exited: Option<ExitStatus>,
    history: Option<HistoryStore>,
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        f.debug_struct("Shell")
            .field("pid", &self.pid)
            .field("exited", &self.exited)
            .finish()
    }
}

impl Shell {
    pub fn new() -> Result<Self> {
        let pid = getpid();
        let history = HistoryStore::open().context("failed to open shared history log")?;
        debug!(
            "opened history segment {} creator:{}",
            history.name(),
            history.created()
        );
        Ok(Shell {
            pid,
            exited: None,
            history: Some(history),
        })
    }

    /// Install the interrupt handler. No SA_RESTART: a blocking read
    /// must return EINTR so the loop can observe the shutdown flag.
    pub fn set_signals(&mut self) {
        let action = SigAction::new(
            SigHandler::Handler(handle_sigint),
            SaFlags::empty(),
            SigSet::empty(),
        );
        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        unsafe {
            if let Err(err) = sigaction(Signal::SIGINT, &action) {
                warn!("failed to set SIGINT handler: {}", err);
            }
            if let Err(err) = sigaction(Signal::SIGQUIT, &ignore) {
                warn!("failed to set SIGQUIT handler: {}", err);
            }
        }
    }

    /// Evaluate one input line: split on `;`, run each sub-command.
    /// A failing sub-command never stops the ones after it.
    pub fn eval_str(&mut self, ctx: &mut Context, input: &str) -> Result<ExitCode> {
        let mut last_exit = 0;
        for text in parser::split_commands(input) {
            let Some(command) = parser::parse_command(text) else {
                continue;
            };
            debug!("eval {:?}", command);
            last_exit = self.run_command(ctx, command);
            ctx.reset();
            if self.exited.is_some() {
                break;
            }
        }
        Ok(ExitCode::from(last_exit.clamp(0, 255) as u8))
    }

    fn run_command(&mut self, ctx: &mut Context, command: Command) -> i32 {
        if let Some(builtin) = msh_builtin::get_command(&command.argv[0]) {
            debug!("builtin {}", command.argv[0]);
            let status = builtin(ctx, command.argv, self);
            return status.code();
        }
        self.run_external(ctx, command)
    }

    fn run_external(&mut self, ctx: &mut Context, command: Command) -> i32 {
        ctx.foreground = !command.background;
        let started = current_time_millis();

        let process =
            Process::with_redirects(command.argv, command.redirect_out, command.redirect_in);
        let pid = match process.spawn(ctx) {
            Ok(pid) => pid,
            Err(err) => {
                // Spawn failure: reported, command treated as not executed.
                eprintln!("{APP_NAME}: {}: {err}", command.raw);
                return 1;
            }
        };

        let status = if command.background {
            debug!("background job '{}' pid {}", command.raw, pid);
            ExitStatus::Running(pid)
        } else {
            match wait_pid(pid) {
                ProcessState::Completed(code, signal) => {
                    debug!("job '{}' completed code:{} signal:{:?}", command.raw, code, signal);
                    ExitStatus::ExitedWith(code as i32)
                }
                ProcessState::Running => ExitStatus::Running(pid),
            }
        };

        // For background jobs this end timestamp is taken right after
        // spawn returns, so the recorded duration is near zero.
        let ended = current_time_millis();
        if ctx.save_history {
            let entry = HistoryEntry::new(command.raw.as_str(), pid, started, ended);
            if let Some(history) = self.history.as_mut() {
                if let Err(err) = history.append(&entry) {
                    warn!("failed to append history entry: {}", err);
                }
            }
        }
        status.code()
    }

    /// Final flush and segment teardown, shared by `exit`, interrupt,
    /// and end-of-input. Only the creating process unlinks the segment.
    pub fn shutdown(&mut self, ctx: &Context, dump: bool) {
        if dump {
            ctx.write_stdout("\nExiting shell. Final command history:").ok();
            match self.history.as_ref().map(|h| h.snapshot()) {
                Some(Ok(entries)) => {
                    for (i, entry) in entries.iter().enumerate() {
                        ctx.write_stdout(&msh_builtin::format_entry(i + 1, entry)).ok();
                    }
                }
                Some(Err(err)) => {
                    ctx.write_stderr(&format!("{APP_NAME}: history unavailable: {err}"))
                        .ok();
                }
                None => {}
            }
        }
        if let Some(history) = self.history.take() {
            if history.created() {
                if let Err(err) = history.destroy() {
                    warn!("failed to destroy history segment: {}", err);
                }
            } else {
                history.close();
            }
        }
    }
}

impl ShellProxy for Shell {
    fn exit_shell(&mut self) {
        debug!("exit requested");
        self.exited = Some(ExitStatus::ExitedWith(0));
    }

    fn changepwd(&mut self, path: &str) -> Result<()> {
        chdir(Path::new(path))?;
        Ok(())
    }

    fn history_snapshot(&mut self) -> Result<Vec<HistoryEntry>> {
        match self.history.as_ref() {
            Some(history) => Ok(history.snapshot()?),
            None => Ok(Vec::new()),
        }
    }
}
