use super::ShellProxy;
use msh_history::HistoryEntry;
use msh_types::{Context, ExitStatus};

/// `history`. Prints the shared log oldest first with 1-based ordinals.
pub fn command(ctx: &Context, _argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus {
    match proxy.history_snapshot() {
        Ok(entries) => {
            for (i, entry) in entries.iter().enumerate() {
                ctx.write_stdout(&format_entry(i + 1, entry)).ok();
            }
            ExitStatus::ExitedWith(0)
        }
        Err(err) => {
            ctx.write_stderr(&format!("history: {err}")).ok();
            ExitStatus::ExitedWith(1)
        }
    }
}

/// One listing line, also used by the shutdown dump.
pub fn format_entry(ordinal: usize, entry: &HistoryEntry) -> String {
    format!(
        "[{}] {} | PID: {} | Duration: {}ms | Started: {}",
        ordinal,
        entry.command,
        entry.pid,
        entry.duration_ms,
        entry.started_display()
    )
}
