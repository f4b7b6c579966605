//! Running external programs.

mod spawn;

pub use spawn::{spawn_process_with, ProcessOptions, ProcessOutput};
