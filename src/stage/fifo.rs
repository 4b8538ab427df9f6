// src/stage/fifo.rs

//! Named pipe helpers.
//!
//! Opening a FIFO normally blocks until the other side shows up. Both ends
//! are opened with `O_NONBLOCK` and switched back to blocking mode right
//! away, so the supervisor can never hang in `open(2)`:
//!
//! - the read end opens immediately even without a writer;
//! - the write end fails with `ENXIO` instead of blocking when nobody
//!   holds the read end.

use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use tracing::debug;

use crate::errors::{PackpipeError, Result};

/// Create a FIFO readable and writable by the current user only.
pub fn create_fifo(path: &Path) -> Result<()> {
    mkfifo(path, Mode::S_IRUSR | Mode::S_IWUSR).map_err(|e| {
        PackpipeError::resource(path, format!("creating FIFO failed: {e}"))
    })?;
    debug!(fifo = %path.display(), "created FIFO");
    Ok(())
}

/// Open the read end of a FIFO without waiting for a writer.
///
/// Note that a blocking read on this end returns EOF while no writer has
/// the FIFO open, so callers should open the write end before handing the
/// reader to a consumer.
pub fn open_reader(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .custom_flags(OFlag::O_NONBLOCK.bits())
        .open(path)
        .map_err(|e| PackpipeError::resource(path, format!("opening FIFO for reading: {e}")))?;
    clear_nonblocking(&file, path)?;
    Ok(file)
}

/// Open the write end of a FIFO; fails if no reader currently holds it.
pub fn open_writer(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .write(true)
        .custom_flags(OFlag::O_NONBLOCK.bits())
        .open(path)
        .map_err(|e| {
            let message = if e.raw_os_error() == Some(Errno::ENXIO as i32) {
                "opening FIFO for writing: no process has it open for reading".to_string()
            } else {
                format!("opening FIFO for writing: {e}")
            };
            PackpipeError::resource(path, message)
        })?;
    clear_nonblocking(&file, path)?;
    Ok(file)
}

fn clear_nonblocking(file: &File, path: &Path) -> Result<()> {
    let fd = file.as_raw_fd();
    let flags = fcntl(fd, FcntlArg::F_GETFL)
        .map_err(|e| PackpipeError::resource(path, format!("reading FIFO flags: {e}")))?;
    let mut flags = OFlag::from_bits_truncate(flags);
    flags.remove(OFlag::O_NONBLOCK);
    fcntl(fd, FcntlArg::F_SETFL(flags))
        .map_err(|e| PackpipeError::resource(path, format!("clearing O_NONBLOCK: {e}")))?;
    Ok(())
}
