//! Streaming SHA-512 file fingerprints with a bounded buffer.
//!
//! # Overview
//!
//! [`fingerprint_file`] turns a canonical path and its known size into a
//! [`Fingerprint`]. Files longer than the digest are streamed through
//! SHA-512 in chunks of at most 10 MiB; files no longer than the digest are
//! self-identifying, so their raw bytes become the digest directly (padded
//! to the full hex width) and no hashing work is done. Empty files share a
//! sentinel fingerprint.
//!
//! Opening the file and allocating the stream buffer follow the same
//! transient-error retry discipline as the directory enumerator.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use sha2::{Digest, Sha512};

use crate::error::is_transient;

use super::enumerator::RETRY_DELAY;
use super::groups::Fingerprint;

/// Output length of the digest in bytes; hex strings are twice this long.
pub const DIGEST_LENGTH: usize = 64;

/// Upper bound on the streaming buffer.
pub(crate) const MAX_BUFFER: u64 = 10 * 1024 * 1024;

/// Uppercase hex, two characters per byte.
fn to_upper_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // Writing to a String cannot fail.
        let _ = write!(out, "{byte:02X}");
    }
    out
}

/// Fail with `Interrupted` if cancellation fired, else sleep one retry slot.
fn retry_sleep(cancel: &AtomicBool) -> io::Result<()> {
    if cancel.load(Ordering::SeqCst) {
        return Err(io::Error::new(
            io::ErrorKind::Interrupted,
            "scan cancelled during retry",
        ));
    }
    std::thread::sleep(RETRY_DELAY);
    Ok(())
}

/// Open a file for reading, absorbing transient resource errors.
fn open_with_retry(path: &Path, cancel: &AtomicBool) -> io::Result<File> {
    loop {
        match File::open(path) {
            Ok(file) => return Ok(file),
            Err(e) if is_transient(&e) => {
                log::debug!("Transient open error for {}: {}; retrying", path.display(), e);
                retry_sleep(cancel)?;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Allocate the stream buffer, absorbing allocation failures with the same
/// retry discipline as a transient open error.
fn alloc_buffer(capacity: usize, cancel: &AtomicBool) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    while let Err(e) = buf.try_reserve_exact(capacity) {
        log::warn!("Buffer allocation of {capacity} bytes failed ({e}); retrying");
        retry_sleep(cancel)?;
    }
    buf.resize(capacity, 0);
    Ok(buf)
}

/// Compute the `(size, digest)` fingerprint of a regular file.
///
/// `size` must be the byte length observed by the classifier; a file that
/// delivers a different number of bytes fails with an
/// [`io::ErrorKind::UnexpectedEof`] error (it changed during the scan).
///
/// The cancellation flag is consulted at every stream iteration and inside
/// every retry sleep; a raised flag fails with [`io::ErrorKind::Interrupted`].
///
/// # Errors
///
/// Any non-transient open or read failure, a short or long read, or
/// cancellation.
pub fn fingerprint_file(path: &Path, size: u64, cancel: &AtomicBool) -> io::Result<Fingerprint> {
    let mut file = open_with_retry(path, cancel)?;

    if size == 0 {
        return Ok(Fingerprint::empty_file());
    }

    // Content no longer than the digest is self-identifying; hashing it
    // would lose no information and cost digest startup.
    if size <= DIGEST_LENGTH as u64 {
        let mut content = vec![0u8; size as usize];
        file.read_exact(&mut content)?;
        let digest = format!("{:0>width$}", to_upper_hex(&content), width = DIGEST_LENGTH * 2);
        return Ok(Fingerprint::new(size, digest));
    }

    let capacity = size.min(MAX_BUFFER) as usize;
    let mut buf = alloc_buffer(capacity, cancel)?;
    let mut hasher = Sha512::new();
    let mut total: u64 = 0;

    loop {
        if cancel.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::Interrupted,
                "scan cancelled during hashing",
            ));
        }

        match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buf[..n]);
                total += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    if total != size {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "{} delivered {} bytes, expected {}",
                path.display(),
                total,
                size
            ),
        ));
    }

    let digest = to_upper_hex(hasher.finalize().as_slice());
    Ok(Fingerprint::new(size, digest))
}
