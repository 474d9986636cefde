//! dupescan - content-addressed duplicate file detection.
//!
//! A concurrent scan-and-group engine: directory trees are walked with a
//! retrying enumerator, accepted files are fingerprinted with SHA-512
//! across a worker pool, and byte-identical files are grouped by their
//! `(size, digest)` fingerprint. A secondary mode yields one representative
//! per distinct content.

pub mod cli;
pub mod error;
pub mod logging;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod text;
