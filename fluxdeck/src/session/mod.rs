//! Session directories and the runs they hold.
//!
//! A session is a timestamped directory under the output base directory.
//! Each run inside it gets `run_<n>/` with a `run_info.json` record.
//!
//! Concurrency: one writer per session directory is assumed. There are no
//! file locks. Run directories are claimed with a non-recursive create, so
//! racing invocations never share a run id, but their counter writes may
//! interleave; allocation reads both the counter and the existing run
//! directories to stay ahead of either.

mod directory;
mod record;

pub use directory::{Session, SessionStore};
pub use record::RunHandle;

#[cfg(test)]
pub use record::read_record;
