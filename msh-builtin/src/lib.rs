use anyhow::Result;
use msh_history::HistoryEntry;
use msh_types::{Context, ExitStatus};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

pub mod cd;
pub mod history;

pub use history::format_entry;

/// Interface builtin commands use to reach shell state without being
/// coupled to the shell implementation.
pub trait ShellProxy {
    /// Initiates shell exit; the main loop performs the actual shutdown.
    fn exit_shell(&mut self);

    /// Changes the current working directory.
    fn changepwd(&mut self, path: &str) -> Result<()>;

    /// Current contents of the shared history log, oldest first.
    fn history_snapshot(&mut self) -> Result<Vec<HistoryEntry>>;
}

/// All builtin commands conform to this signature.
pub type BuiltinCommand =
    fn(ctx: &Context, argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus;

/// Registry of builtin commands. These are reserved words: they never
/// reach the process spawner and are never recorded in history.
pub static BUILTIN_COMMAND: Lazy<Mutex<HashMap<&str, BuiltinCommand>>> = Lazy::new(|| {
    let mut builtin = HashMap::new();

    builtin.insert("exit", exit as BuiltinCommand);
    builtin.insert("cd", cd::command as BuiltinCommand);
    builtin.insert("history", history::command as BuiltinCommand);

    Mutex::new(builtin)
});

/// Look up a builtin command by name.
pub fn get_command(name: &str) -> Option<BuiltinCommand> {
    if let Ok(builtin) = BUILTIN_COMMAND.lock() {
        builtin.get(name).copied()
    } else {
        None
    }
}

/// Built-in exit command. Takes the same shutdown path as an interrupt.
pub fn exit(_ctx: &Context, _argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus {
    debug!("exit command called");
    proxy.exit_shell();
    ExitStatus::ExitedWith(0)
}
