use nix::fcntl::OFlag;
use nix::sys::mman::{mmap, munmap, shm_open, shm_unlink, MapFlags, ProtFlags};
use nix::sys::stat::{fstat, Mode};
use nix::unistd::{close, ftruncate};
use std::num::NonZeroUsize;
use std::os::unix::io::RawFd;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const SIZE_WAIT_MS: u64 = 1;
const SIZE_WAIT_TRIES: usize = 1000;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("failed to open shared segment {name}: {source}")]
    Open { name: String, source: nix::Error },

    #[error("failed to size shared segment {name}: {source}")]
    Resize { name: String, source: nix::Error },

    #[error("failed to map shared segment {name}: {source}")]
    Map { name: String, source: nix::Error },

    #[error("failed to unlink shared segment {name}: {source}")]
    Unlink { name: String, source: nix::Error },

    #[error("shared segment {0} was never initialized by its creator")]
    NotInitialized(String),

    #[error("failed to initialize log semaphore: {0}")]
    Semaphore(std::io::Error),

    #[error("failed to lock log semaphore: {0}")]
    Lock(std::io::Error),
}

/// A mapping of one named POSIX shared memory object. Whichever process
/// wins the O_EXCL create is the segment's owner and is responsible for
/// unlinking it on shutdown.
pub(crate) struct SharedSegment {
    name: String,
    ptr: *mut libc::c_void,
    len: usize,
    created: bool,
}

impl SharedSegment {
    pub(crate) fn open(name: &str, len: usize) -> Result<Self, HistoryError> {
        let mode = Mode::S_IRUSR | Mode::S_IWUSR;
        let (fd, created) =
            match shm_open(name, OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR, mode) {
                Ok(fd) => (fd, true),
                Err(nix::errno::Errno::EEXIST) => {
                    let fd = shm_open(name, OFlag::O_RDWR, mode).map_err(|source| {
                        HistoryError::Open {
                            name: name.to_string(),
                            source,
                        }
                    })?;
                    (fd, false)
                }
                Err(source) => {
                    return Err(HistoryError::Open {
                        name: name.to_string(),
                        source,
                    })
                }
            };
        debug!("opened segment {} created:{} len:{}", name, created, len);

        if created {
            if let Err(source) = ftruncate(fd, len as libc::off_t) {
                let _ = close(fd);
                let _ = shm_unlink(name);
                return Err(HistoryError::Resize {
                    name: name.to_string(),
                    source,
                });
            }
        } else if let Err(err) = wait_sized(fd, name, len) {
            let _ = close(fd);
            return Err(err);
        }

        let length = NonZeroUsize::new(len).ok_or(HistoryError::Map {
            name: name.to_string(),
            source: nix::errno::Errno::EINVAL,
        })?;
        let mapped = unsafe {
            mmap(
                None,
                length,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                fd,
                0,
            )
        };
        // The mapping keeps the segment alive without the descriptor.
        let _ = close(fd);
        let ptr = match mapped {
            Ok(ptr) => ptr,
            Err(source) => {
                if created {
                    let _ = shm_unlink(name);
                }
                return Err(HistoryError::Map {
                    name: name.to_string(),
                    source,
                });
            }
        };

        Ok(SharedSegment {
            name: name.to_string(),
            ptr,
            len,
            created,
        })
    }

    pub(crate) fn as_ptr(&self) -> *mut libc::c_void {
        self.ptr
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn created(&self) -> bool {
        self.created
    }

    /// Remove the segment name from the host. Existing mappings in this
    /// and sibling processes remain valid until they are unmapped.
    pub(crate) fn unlink(&self) -> Result<(), HistoryError> {
        debug!("unlinking segment {}", self.name);
        shm_unlink(self.name.as_str()).map_err(|source| HistoryError::Unlink {
            name: self.name.clone(),
            source,
        })
    }
}

/// An attacher can open the name after the creator's `shm_open` but
/// before its `ftruncate`; mapping a zero-length object then faults on
/// first access. Wait briefly for the object to reach its full size.
fn wait_sized(fd: RawFd, name: &str, len: usize) -> Result<(), HistoryError> {
    for _ in 0..SIZE_WAIT_TRIES {
        let stat = fstat(fd).map_err(|source| HistoryError::Open {
            name: name.to_string(),
            source,
        })?;
        if stat.st_size >= len as libc::off_t {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(SIZE_WAIT_MS));
    }
    debug!("segment {} never reached {} bytes", name, len);
    Err(HistoryError::NotInitialized(name.to_string()))
}

impl Drop for SharedSegment {
    fn drop(&mut self) {
        if let Err(err) = unsafe { munmap(self.ptr, self.len) } {
            tracing::warn!("failed to unmap segment {}: {}", self.name, err);
        }
    }
}
