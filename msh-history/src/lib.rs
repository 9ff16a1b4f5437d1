mod entry;
mod shm;
mod store;

pub use crate::entry::{HistoryEntry, MAX_COMMAND_LEN, MAX_HISTORY};
pub use crate::shm::HistoryError;
pub use crate::store::{HistoryStore, HISTORY_NAME_ENV, SHM_NAME};

/// Return the current time as milliseconds since the Unix epoch.
pub fn current_time_millis() -> i64 {
    match std::time::SystemTime::now().duration_since(std::time::SystemTime::UNIX_EPOCH) {
        Ok(n) => n.as_millis() as i64,
        Err(e) => {
            tracing::error!("invalid system time: {}", e);
            0
        }
    }
}
