use crate::shell::shutdown_requested;
use anyhow::Result;
use libc::STDIN_FILENO;
use nix::unistd::read;
use tracing::debug;

#[derive(Debug, PartialEq, Eq)]
pub enum ReadLine {
    Line(String),
    Eof,
    /// A SIGINT arrived while blocked in read; the shutdown flag is set.
    Interrupted,
}

/// Read one line from stdin with a plain blocking read. std's buffered
/// readers transparently retry EINTR, which would swallow the interrupt
/// the shutdown path depends on, so this reads through the raw
/// descriptor instead.
pub fn read_line() -> Result<ReadLine> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match read(STDIN_FILENO, &mut byte) {
            Ok(0) => {
                debug!("eof on stdin");
                if line.is_empty() {
                    return Ok(ReadLine::Eof);
                }
                return Ok(ReadLine::Line(String::from_utf8_lossy(&line).into_owned()));
            }
            Ok(_) => {
                if byte[0] == b'\n' {
                    return Ok(ReadLine::Line(String::from_utf8_lossy(&line).into_owned()));
                }
                line.push(byte[0]);
            }
            Err(nix::errno::Errno::EINTR) => {
                if shutdown_requested() {
                    return Ok(ReadLine::Interrupted);
                }
            }
            Err(err) => {
                return Err(anyhow::anyhow!("failed to read input: {}", err));
            }
        }
    }
}
