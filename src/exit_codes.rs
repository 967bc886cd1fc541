//! Process exit codes of the `known-good` binary.
//!
//! - `0`: success
//! - `1`: general error
//! - `2`: invalid command-line usage (reported by clap), or a partial
//!   failure of `update-latest` where at least one module failed to resolve
//! - `3`: fatal `update-latest` error (registry unreadable or empty, no
//!   usable resolver backend)

pub const SUCCESS: u8 = 0;
pub const ERROR: u8 = 1;
pub const PARTIAL_FAILURE: u8 = 2;
pub const FATAL: u8 = 3;
