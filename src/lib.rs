//! Read-only monitoring client for PBS/Torque batch servers.
//!
//! A status query resolves the active server through the local auth daemon,
//! opens a TCP connection, has the auth daemon authorize that connection,
//! then sends STATUS_JOB and decodes the reply.

pub mod auth;
pub mod batch;
pub mod cli;
pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod wire;

pub use client::{JobSource, StatusClient, StatusReport};
pub use error::{Error, Result};
