//! Batch server client.
//!
//! - `connection`: typestate TCP connection (unauthorized -> authorized)
//! - `status`: STATUS_JOB request encoding and reply decoding

pub mod connection;
pub mod status;

pub use connection::{Authorized, BatchConnection, Unauthorized};
