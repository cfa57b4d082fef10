use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::auth::AuthError;
use crate::wire::DecodeError;

/// Failure of one status query. The first error ends the query; no jobs are
/// returned alongside it.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to connect to batch server {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("unrecognized protocol: type={kind} ver={version}")]
    ProtocolMismatch { kind: i64, version: i64 },

    #[error("batch server returned code={code} aux={aux}")]
    Batch { code: i64, aux: i64 },

    #[error("unrecognized reply choice={0}")]
    UnrecognizedChoice(i64),

    #[error("malformed reply: {0}")]
    Decode(#[from] DecodeError),

    #[error("failed to send request: {0}")]
    Io(#[from] io::Error),

    #[error("{stage} timed out after {after:?}")]
    Timeout {
        stage: &'static str,
        after: Duration,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
