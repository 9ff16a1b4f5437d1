use crate::entry::{HistoryEntry, RawEntry, MAX_HISTORY};
use crate::shm::{HistoryError, SharedSegment};
use std::ptr::addr_of_mut;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::debug;

/// Default name of the shared history segment. Every shell instance on
/// the host that uses this name sees the same log.
pub const SHM_NAME: &str = "/msh_history";

/// Environment override for the segment name, used to keep tests away
/// from the real log.
pub const HISTORY_NAME_ENV: &str = "MSH_HISTORY_NAME";

// "MSH1", published by the creator once the semaphore is usable.
const LOG_READY: u32 = 0x4d53_4831;

const READY_WAIT_MS: u64 = 1;
const READY_WAIT_TRIES: usize = 1000;

/// Shared log layout. Lives entirely inside the segment; only ever
/// accessed through the mapping, never constructed by value.
#[repr(C)]
struct RawLog {
    ready: AtomicU32,
    seq: u64,
    mutex: libc::sem_t,
    entries: [RawEntry; MAX_HISTORY],
}

/// Holds the semaphore for the duration of one log access. `sem_wait`
/// is retried on EINTR; `sem_post` happens on drop.
struct LogGuard {
    log: *mut RawLog,
}

impl LogGuard {
    fn lock(log: *mut RawLog) -> Result<Self, HistoryError> {
        loop {
            let rc = unsafe { libc::sem_wait(addr_of_mut!((*log).mutex)) };
            if rc == 0 {
                return Ok(LogGuard { log });
            }
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(HistoryError::Lock(err));
        }
    }
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        unsafe {
            libc::sem_post(addr_of_mut!((*self.log).mutex));
        }
    }
}

/// Handle on the cross-process history log. Opening is idempotent:
/// the first process creates and initializes the segment, later ones
/// attach to it. All access is serialized through a process-shared
/// semaphore living inside the segment.
pub struct HistoryStore {
    segment: SharedSegment,
}

impl HistoryStore {
    /// Open the default log, honoring the `MSH_HISTORY_NAME` override.
    pub fn open() -> Result<Self, HistoryError> {
        match std::env::var(HISTORY_NAME_ENV) {
            Ok(name) if !name.is_empty() => Self::open_named(&name),
            _ => Self::open_named(SHM_NAME),
        }
    }

    pub fn open_named(name: &str) -> Result<Self, HistoryError> {
        let segment = SharedSegment::open(name, std::mem::size_of::<RawLog>())?;
        let store = HistoryStore { segment };
        if store.segment.created() {
            store.init_log()?;
        } else {
            store.wait_ready()?;
        }
        Ok(store)
    }

    fn log(&self) -> *mut RawLog {
        self.segment.as_ptr() as *mut RawLog
    }

    fn init_log(&self) -> Result<(), HistoryError> {
        let log = self.log();
        unsafe {
            if libc::sem_init(addr_of_mut!((*log).mutex), 1, 1) != 0 {
                let err = std::io::Error::last_os_error();
                let _ = self.segment.unlink();
                return Err(HistoryError::Semaphore(err));
            }
            // Fresh segments are zero-filled, so seq and the entries are
            // already in their initial state.
            (*log).ready.store(LOG_READY, Ordering::Release);
        }
        debug!("initialized history log {}", self.segment.name());
        Ok(())
    }

    /// An attacher may map the segment before the creator has finished
    /// initializing the semaphore; wait briefly for the ready word.
    fn wait_ready(&self) -> Result<(), HistoryError> {
        let log = self.log();
        for _ in 0..READY_WAIT_TRIES {
            if unsafe { (*log).ready.load(Ordering::Acquire) } == LOG_READY {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(READY_WAIT_MS));
        }
        Err(HistoryError::NotInitialized(
            self.segment.name().to_string(),
        ))
    }

    /// Whether this process created (and therefore owns) the segment.
    pub fn created(&self) -> bool {
        self.segment.created()
    }

    pub fn name(&self) -> &str {
        self.segment.name()
    }

    /// Append one entry, overwriting the oldest once the ring is full.
    pub fn append(&mut self, entry: &HistoryEntry) -> Result<(), HistoryError> {
        let log = self.log();
        let _guard = LogGuard::lock(log)?;
        unsafe {
            let idx = ((*log).seq % MAX_HISTORY as u64) as usize;
            (*log).entries[idx].write(entry);
            (*log).seq += 1;
            debug!("history append idx:{} seq:{}", idx, (*log).seq);
        }
        Ok(())
    }

    /// The most recent `min(written, MAX_HISTORY)` entries, ordered
    /// oldest-written first.
    pub fn snapshot(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let log = self.log();
        let _guard = LogGuard::lock(log)?;
        let mut entries = Vec::new();
        unsafe {
            let seq = (*log).seq;
            let n = seq.min(MAX_HISTORY as u64);
            for i in 0..n {
                let idx = ((seq - n + i) % MAX_HISTORY as u64) as usize;
                entries.push((*log).entries[idx].read());
            }
        }
        Ok(entries)
    }

    /// Release this process's mapping. The segment itself stays on the
    /// host for sibling instances.
    pub fn close(self) {}

    /// Unmap and unlink the segment. Only the creator should call this;
    /// siblings still attached keep valid mappings, but the name is gone
    /// and later opens start a fresh log. The semaphore is deliberately
    /// not destroyed since a sibling may still be holding it.
    pub fn destroy(self) -> Result<(), HistoryError> {
        self.segment.unlink()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::MAX_COMMAND_LEN;
    use nix::unistd::Pid;

    fn init() {
        let _ = tracing_subscriber::fmt::try_init();
    }

    fn test_name(tag: &str) -> String {
        let name = format!("/msh-hist-test-{}-{}", std::process::id(), tag);
        // A previous panicked run may have left the segment behind.
        let _ = nix::sys::mman::shm_unlink(name.as_str());
        name
    }

    fn entry(cmd: &str, pid: i32) -> HistoryEntry {
        HistoryEntry::new(cmd, Pid::from_raw(pid), 1_000, 1_250)
    }

    #[test]
    fn append_and_snapshot_in_order() {
        init();
        let name = test_name("order");
        let mut store = HistoryStore::open_named(&name).unwrap();
        assert!(store.created());

        store.append(&entry("first", 10)).unwrap();
        store.append(&entry("second", 11)).unwrap();
        store.append(&entry("third", 12)).unwrap();

        let entries = store.snapshot().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].command, "first");
        assert_eq!(entries[2].command, "third");
        assert_eq!(entries[1].pid, Pid::from_raw(11));

        store.destroy().unwrap();
    }

    #[test]
    fn ring_overwrites_oldest() {
        init();
        let name = test_name("ring");
        let mut store = HistoryStore::open_named(&name).unwrap();

        let extra = 7;
        for i in 0..MAX_HISTORY + extra {
            store.append(&entry(&format!("cmd-{i}"), i as i32)).unwrap();
        }

        let entries = store.snapshot().unwrap();
        assert_eq!(entries.len(), MAX_HISTORY);
        // The oldest `extra` entries are gone.
        assert_eq!(entries[0].command, format!("cmd-{extra}"));
        assert_eq!(
            entries[MAX_HISTORY - 1].command,
            format!("cmd-{}", MAX_HISTORY + extra - 1)
        );

        store.destroy().unwrap();
    }

    #[test]
    fn attach_sees_existing_entries() {
        init();
        let name = test_name("attach");
        let mut creator = HistoryStore::open_named(&name).unwrap();
        creator.append(&entry("from-creator", 1)).unwrap();

        let mut attacher = HistoryStore::open_named(&name).unwrap();
        assert!(!attacher.created());
        assert_eq!(attacher.snapshot().unwrap().len(), 1);

        attacher.append(&entry("from-attacher", 2)).unwrap();
        let entries = creator.snapshot().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].command, "from-attacher");

        attacher.close();
        creator.destroy().unwrap();
    }

    #[test]
    fn attach_to_unsized_segment_fails_cleanly() {
        init();
        let name = test_name("unsized");
        // Stand in for a creator that died between shm_open and
        // ftruncate: the name exists but the object is zero bytes.
        // Attaching must report an error, not fault on first access.
        let fd = nix::sys::mman::shm_open(
            name.as_str(),
            nix::fcntl::OFlag::O_CREAT | nix::fcntl::OFlag::O_EXCL | nix::fcntl::OFlag::O_RDWR,
            nix::sys::stat::Mode::S_IRUSR | nix::sys::stat::Mode::S_IWUSR,
        )
        .unwrap();

        let result = HistoryStore::open_named(&name);
        assert!(matches!(result, Err(HistoryError::NotInitialized(_))));

        let _ = nix::unistd::close(fd);
        let _ = nix::sys::mman::shm_unlink(name.as_str());
    }

    #[test]
    fn long_command_is_truncated_in_log() {
        init();
        let name = test_name("trunc");
        let mut store = HistoryStore::open_named(&name).unwrap();

        let long = "y".repeat(MAX_COMMAND_LEN + 100);
        store.append(&entry(&long, 5)).unwrap();

        let entries = store.snapshot().unwrap();
        assert_eq!(entries[0].command.len(), MAX_COMMAND_LEN - 1);

        store.destroy().unwrap();
    }

    #[test]
    fn two_processes_append_under_the_lock() {
        init();
        let name = test_name("xproc");
        let mut store = HistoryStore::open_named(&name).unwrap();

        match unsafe { nix::unistd::fork() }.unwrap() {
            nix::unistd::ForkResult::Child => {
                // Attach by name as an unrelated opener would, write a
                // share of entries, then leave without running the test
                // harness teardown.
                let code = match HistoryStore::open_named(&name) {
                    Ok(mut child_store) => {
                        let mut failures = 0;
                        for i in 0..20 {
                            if child_store
                                .append(&entry(&format!("child-{i}"), 2))
                                .is_err()
                            {
                                failures += 1;
                            }
                        }
                        failures
                    }
                    Err(_) => 1,
                };
                unsafe { libc::_exit(code) };
            }
            nix::unistd::ForkResult::Parent { child } => {
                for i in 0..20 {
                    store.append(&entry(&format!("parent-{i}"), 1)).unwrap();
                }
                let status = nix::sys::wait::waitpid(child, None).unwrap();
                assert!(matches!(
                    status,
                    nix::sys::wait::WaitStatus::Exited(_, 0)
                ));

                let entries = store.snapshot().unwrap();
                assert_eq!(entries.len(), 40);
                // No torn writes: every command is one writer's, whole.
                for e in &entries {
                    assert!(
                        e.command.starts_with("parent-") || e.command.starts_with("child-"),
                        "torn entry: {:?}",
                        e.command
                    );
                }
                store.destroy().unwrap();
            }
        }
    }

    #[test]
    fn empty_log_snapshot_is_empty() {
        init();
        let name = test_name("empty");
        let store = HistoryStore::open_named(&name).unwrap();
        assert!(store.snapshot().unwrap().is_empty());
        store.destroy().unwrap();
    }
}
