//! STATUS_JOB request and reply.
//!
//! The reply carries no field tags. Fields are read in exactly the order the
//! server writes them:
//!
//! ```text
//! type version code aux choice
//! count { objtype id attrcount { size name has_resource [resource] value op } }
//! ```

use std::collections::HashMap;

use tokio::io::AsyncRead;
use tracing::{debug, trace};

use crate::core::Job;
use crate::error::{Error, Result};
use crate::wire::dis;

pub const PROTOCOL_TYPE: i64 = 2;
pub const PROTOCOL_VERSION: i64 = 2;
pub const OP_STATUS_JOB: i64 = 19;
pub const REPLY_CHOICE_STATUS: i64 = 6;

/// Cap on up-front allocation; counts come from the peer.
const PREALLOC_LIMIT: u64 = 1024;

/// Encode a request for every job visible to `username`.
pub fn encode_request(username: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32 + username.len());
    dis::put_int(&mut buf, PROTOCOL_TYPE);
    dis::put_int(&mut buf, PROTOCOL_VERSION);
    dis::put_int(&mut buf, OP_STATUS_JOB);
    dis::put_str(&mut buf, username);
    // Empty id selects all jobs.
    dis::put_str(&mut buf, "");
    // No attribute filter.
    dis::put_uint(&mut buf, 0);
    // No request extension.
    dis::put_uint(&mut buf, 0);
    buf
}

/// Decode a complete status reply.
pub async fn read_reply<R>(r: &mut R) -> Result<Vec<Job>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let choice = read_header(r).await?;
    if choice != REPLY_CHOICE_STATUS {
        return Err(Error::UnrecognizedChoice(choice));
    }

    let count = dis::read_uint(r).await?;
    debug!(count, "Reading job status reply");

    let mut jobs = Vec::with_capacity(count.min(PREALLOC_LIMIT) as usize);
    for _ in 0..count {
        let _objtype = dis::read_uint(r).await?;
        let id = dis::read_string(r).await?;
        let attrs = read_attr_list(r).await?;
        trace!(job = %id, attrs = attrs.len(), "Decoded job");
        jobs.push(Job { id, attrs });
    }

    Ok(jobs)
}

/// Returns the reply choice once type, version and result code check out.
async fn read_header<R>(r: &mut R) -> Result<i64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let kind = dis::read_int(r).await?;
    let version = dis::read_int(r).await?;
    if kind != PROTOCOL_TYPE || version != PROTOCOL_VERSION {
        return Err(Error::ProtocolMismatch { kind, version });
    }

    let code = dis::read_int(r).await?;
    let aux = dis::read_int(r).await?;
    if code != 0 {
        return Err(Error::Batch { code, aux });
    }

    Ok(dis::read_int(r).await?)
}

async fn read_attr_list<R>(r: &mut R) -> Result<HashMap<String, String>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let count = dis::read_uint(r).await?;
    let mut attrs = HashMap::with_capacity(count.min(PREALLOC_LIMIT) as usize);

    for _ in 0..count {
        let _size = dis::read_uint(r).await?;
        let name = dis::read_string(r).await?;
        let has_resource = dis::read_int(r).await?;
        let resource = if has_resource != 0 {
            Some(dis::read_string(r).await?)
        } else {
            None
        };
        let value = dis::read_string(r).await?;
        let _op = dis::read_uint(r).await?;

        // Duplicate keys: the later value wins.
        attrs.insert(Job::attr_key(&name, resource.as_deref()), value);
    }

    Ok(attrs)
}
