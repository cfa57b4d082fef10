//! Wire encodings for the two daemons.
//!
//! - `dis`: binary self-delimiting primitives for the batch server (TCP)
//! - `pipe`: `|`-terminated text records for the auth daemon (Unix socket)

pub mod dis;
pub mod pipe;

pub use dis::DecodeError;
pub use pipe::FormatError;
