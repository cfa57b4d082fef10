//! DIS primitive encoding used on the batch server TCP channel.
//!
//! Every value is self-delimiting. An integer is written as its sign and
//! decimal magnitude, preceded by as many digit-count prefixes as needed to
//! tell the reader how long the next run of digits is:
//!
//! ```text
//!   0           -> +0
//!   19          -> 2+19
//!   1234567890  -> 210+1234567890
//! ```
//!
//! A string is an unsigned integer length followed by that many raw bytes.

use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Largest magnitude a 64-bit value can need.
const MAX_DIGITS: u64 = 20;

/// Count prefixes never nest deeper than this for 64-bit values.
const MAX_PREFIX_DEPTH: usize = 4;

/// Upper bound on a decoded string.
pub const MAX_STRING_LEN: u64 = 64 * 1024 * 1024;

/// Error returned when a DIS value cannot be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unexpected end of stream")]
    UnexpectedEof,
    #[error("read failed: {0}")]
    Io(#[source] io::Error),
    #[error("unexpected byte {0:#04x}")]
    UnexpectedByte(u8),
    #[error("digit count has a leading zero")]
    LeadingZero,
    #[error("integer does not fit in 64 bits")]
    Overflow,
    #[error("negative value where an unsigned one was expected")]
    BadSign,
    #[error("string of {0} bytes exceeds limit")]
    TooLong(u64),
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    #[error("digit count prefixes nested too deep")]
    TooDeep,
}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::UnexpectedEof
        } else {
            DecodeError::Io(e)
        }
    }
}

/// Append the encoding of a signed integer.
pub fn put_int(buf: &mut Vec<u8>, value: i64) {
    put_magnitude(buf, value < 0, value.unsigned_abs());
}

/// Append the encoding of an unsigned integer.
pub fn put_uint(buf: &mut Vec<u8>, value: u64) {
    put_magnitude(buf, false, value);
}

/// Append the encoding of a byte string.
pub fn put_bytes(buf: &mut Vec<u8>, value: &[u8]) {
    put_uint(buf, value.len() as u64);
    buf.extend_from_slice(value);
}

/// Append the encoding of a string.
pub fn put_str(buf: &mut Vec<u8>, value: &str) {
    put_bytes(buf, value.as_bytes());
}

/// Encode a signed integer into a fresh buffer.
pub fn encode_int(value: i64) -> Vec<u8> {
    let mut buf = Vec::new();
    put_int(&mut buf, value);
    buf
}

/// Encode a string into a fresh buffer.
pub fn encode_str(value: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    put_str(&mut buf, value);
    buf
}

fn put_magnitude(buf: &mut Vec<u8>, negative: bool, magnitude: u64) {
    let digits = magnitude.to_string();

    // Prefixes are produced innermost first and written in reverse.
    let mut prefixes = Vec::new();
    let mut count = digits.len();
    while count > 1 {
        let prefix = count.to_string();
        count = prefix.len();
        prefixes.push(prefix);
    }

    for prefix in prefixes.iter().rev() {
        buf.extend_from_slice(prefix.as_bytes());
    }
    buf.push(if negative { b'-' } else { b'+' });
    buf.extend_from_slice(digits.as_bytes());
}

/// Read one signed integer, consuming exactly its bytes.
pub async fn read_int<R>(r: &mut R) -> Result<i64, DecodeError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let (negative, magnitude) = read_magnitude(r).await?;

    if negative {
        if magnitude > i64::MAX as u64 + 1 {
            return Err(DecodeError::Overflow);
        }
        Ok((magnitude as i64).wrapping_neg())
    } else {
        i64::try_from(magnitude).map_err(|_| DecodeError::Overflow)
    }
}

/// Read one unsigned integer, consuming exactly its bytes.
pub async fn read_uint<R>(r: &mut R) -> Result<u64, DecodeError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    match read_magnitude(r).await? {
        (true, 0) => Ok(0),
        (true, _) => Err(DecodeError::BadSign),
        (false, magnitude) => Ok(magnitude),
    }
}

/// Read one length-prefixed byte string.
pub async fn read_bytes<R>(r: &mut R) -> Result<Vec<u8>, DecodeError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let len = read_uint(r).await?;
    if len > MAX_STRING_LEN {
        return Err(DecodeError::TooLong(len));
    }

    let mut data = vec![0u8; len as usize];
    r.read_exact(&mut data).await?;
    Ok(data)
}

/// Read one length-prefixed string. The payload must be UTF-8.
pub async fn read_string<R>(r: &mut R) -> Result<String, DecodeError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let data = read_bytes(r).await?;
    String::from_utf8(data).map_err(|_| DecodeError::InvalidUtf8)
}

async fn read_magnitude<R>(r: &mut R) -> Result<(bool, u64), DecodeError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut count: u64 = 1;

    for _ in 0..=MAX_PREFIX_DEPTH {
        let c = r.read_u8().await?;
        match c {
            b'+' | b'-' => {
                let magnitude = read_digits(r, count, 0).await?;
                return Ok((c == b'-', magnitude));
            }
            b'0' => return Err(DecodeError::LeadingZero),
            b'1'..=b'9' => {
                count = read_digits(r, count - 1, u64::from(c - b'0')).await?;
                if count > MAX_DIGITS {
                    return Err(DecodeError::Overflow);
                }
            }
            other => return Err(DecodeError::UnexpectedByte(other)),
        }
    }

    Err(DecodeError::TooDeep)
}

async fn read_digits<R>(r: &mut R, count: u64, mut acc: u64) -> Result<u64, DecodeError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    for _ in 0..count {
        let c = r.read_u8().await?;
        if !c.is_ascii_digit() {
            return Err(DecodeError::UnexpectedByte(c));
        }
        acc = acc
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(c - b'0')))
            .ok_or(DecodeError::Overflow)?;
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_small_ints() {
        assert_eq!(encode_int(0), b"+0");
        assert_eq!(encode_int(5), b"+5");
        assert_eq!(encode_int(-7), b"-7");
        assert_eq!(encode_int(19), b"2+19");
        assert_eq!(encode_int(-300), b"3-300");
    }

    #[test]
    fn test_encode_nested_prefix() {
        assert_eq!(encode_int(1234567890), b"210+1234567890");
        assert_eq!(encode_int(123456789012), b"212+123456789012");
        assert_eq!(encode_int(i64::MIN), b"219-9223372036854775808");
    }

    #[test]
    fn test_encode_strings() {
        assert_eq!(encode_str(""), b"+0");
        assert_eq!(encode_str("alice"), b"+5alice");
        assert_eq!(encode_str("resources_used"), b"214+resources_used");
    }

    #[tokio::test]
    async fn test_read_int_leaves_stream_at_next_value() {
        let mut input: &[u8] = b"2+19-3+0trailing";

        assert_eq!(read_int(&mut input).await.unwrap(), 19);
        assert_eq!(read_int(&mut input).await.unwrap(), -3);
        assert_eq!(read_int(&mut input).await.unwrap(), 0);
        assert_eq!(input, b"trailing");
    }

    #[tokio::test]
    async fn test_int_extremes_round_trip() {
        for value in [i64::MIN, i64::MIN + 1, -10, -1, 9, 10, 99, 100, i64::MAX] {
            let bytes = encode_int(value);
            let mut input: &[u8] = &bytes;
            assert_eq!(read_int(&mut input).await.unwrap(), value, "value {value}");
            assert!(input.is_empty());
        }
    }

    #[tokio::test]
    async fn test_string_with_arbitrary_bytes() {
        let payload: Vec<u8> = (0u8..=255).collect();
        let mut buf = Vec::new();
        put_bytes(&mut buf, &payload);
        put_str(&mut buf, "next");

        let mut input: &[u8] = &buf;
        assert_eq!(read_bytes(&mut input).await.unwrap(), payload);
        assert_eq!(read_string(&mut input).await.unwrap(), "next");
        assert!(input.is_empty());
    }

    #[tokio::test]
    async fn test_truncated_int() {
        let mut input: &[u8] = b"3+12";
        assert!(matches!(
            read_int(&mut input).await,
            Err(DecodeError::UnexpectedEof)
        ));

        let mut empty: &[u8] = b"";
        assert!(matches!(
            read_int(&mut empty).await,
            Err(DecodeError::UnexpectedEof)
        ));
    }

    #[tokio::test]
    async fn test_truncated_string() {
        let mut input: &[u8] = b"+9short";
        assert!(matches!(
            read_string(&mut input).await,
            Err(DecodeError::UnexpectedEof)
        ));
    }

    #[tokio::test]
    async fn test_malformed_ints() {
        let mut leading_zero: &[u8] = b"02+19";
        assert!(matches!(
            read_int(&mut leading_zero).await,
            Err(DecodeError::LeadingZero)
        ));

        let mut junk: &[u8] = b"x";
        assert!(matches!(
            read_int(&mut junk).await,
            Err(DecodeError::UnexpectedByte(b'x'))
        ));

        let mut bad_digit: &[u8] = b"2+1a";
        assert!(matches!(
            read_int(&mut bad_digit).await,
            Err(DecodeError::UnexpectedByte(b'a'))
        ));

        let mut too_long: &[u8] = b"221+1234567890123456789012";
        assert!(matches!(
            read_int(&mut too_long).await,
            Err(DecodeError::Overflow)
        ));

        let mut too_big: &[u8] = b"219+9223372036854775808";
        assert!(matches!(
            read_int(&mut too_big).await,
            Err(DecodeError::Overflow)
        ));
    }

    #[tokio::test]
    async fn test_unsigned_rejects_negative() {
        let mut input: &[u8] = b"-4";
        assert!(matches!(
            read_uint(&mut input).await,
            Err(DecodeError::BadSign)
        ));

        let mut zero: &[u8] = b"-0";
        assert_eq!(read_uint(&mut zero).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_utf8() {
        let mut buf = Vec::new();
        put_bytes(&mut buf, &[0xff, 0xfe]);
        let mut input: &[u8] = &buf;
        assert!(matches!(
            read_string(&mut input).await,
            Err(DecodeError::InvalidUtf8)
        ));
    }

    #[tokio::test]
    async fn test_oversized_length_is_rejected_before_allocating() {
        let mut buf = Vec::new();
        put_uint(&mut buf, MAX_STRING_LEN + 1);
        let mut input: &[u8] = &buf;
        assert!(matches!(
            read_bytes(&mut input).await,
            Err(DecodeError::TooLong(_))
        ));
    }
}
