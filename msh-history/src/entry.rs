use chrono::{DateTime, Local, TimeZone};
use nix::unistd::Pid;

/// Fixed size of the command text slot in the shared segment, including
/// the trailing NUL. Longer commands are truncated on write.
pub const MAX_COMMAND_LEN: usize = 1024;

/// Capacity of the shared ring buffer. The log overwrites its oldest
/// entry once this many have been written.
pub const MAX_HISTORY: usize = 100;

/// One recorded command invocation. Immutable once written to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub command: String,
    pub pid: Pid,
    pub start_ms: i64,
    pub end_ms: i64,
    pub duration_ms: i64,
}

impl HistoryEntry {
    pub fn new(command: impl Into<String>, pid: Pid, start_ms: i64, end_ms: i64) -> Self {
        HistoryEntry {
            command: command.into(),
            pid,
            start_ms,
            end_ms,
            duration_ms: end_ms - start_ms,
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        Local.timestamp_millis_opt(self.start_ms).single()
    }

    /// Start timestamp rendered for the `history` listing.
    pub fn started_display(&self) -> String {
        self.started_at()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// In-segment entry layout. The command field is NUL-padded so a reader
/// from another process can recover the text without a length field.
#[repr(C)]
pub(crate) struct RawEntry {
    command: [u8; MAX_COMMAND_LEN],
    pid: libc::pid_t,
    start_ms: i64,
    end_ms: i64,
    duration_ms: i64,
}

impl RawEntry {
    pub(crate) fn write(&mut self, entry: &HistoryEntry) {
        self.command = [0; MAX_COMMAND_LEN];
        let bytes = entry.command.as_bytes();
        let len = bytes.len().min(MAX_COMMAND_LEN - 1);
        self.command[..len].copy_from_slice(&bytes[..len]);
        self.pid = entry.pid.as_raw();
        self.start_ms = entry.start_ms;
        self.end_ms = entry.end_ms;
        self.duration_ms = entry.duration_ms;
    }

    pub(crate) fn read(&self) -> HistoryEntry {
        let len = self
            .command
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_COMMAND_LEN);
        HistoryEntry {
            command: String::from_utf8_lossy(&self.command[..len]).into_owned(),
            pid: Pid::from_raw(self.pid),
            start_ms: self.start_ms,
            end_ms: self.end_ms,
            duration_ms: self.duration_ms,
        }
    }
}
