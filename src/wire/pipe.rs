//! Pipe-delimited records spoken to the authentication daemon.
//!
//! Every field is terminated by `|`, including the last one. Integers are
//! decimal text and strings are written raw. There is no escaping, so a
//! string containing `|` cannot be represented.

use thiserror::Error;

pub const DELIMITER: char = '|';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("record ended before field {0}")]
    MissingField(usize),
    #[error("field {index} is not an integer: {value:?}")]
    InvalidInt { index: usize, value: String },
}

/// Builds a request record field by field.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: String,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_int(&mut self, value: i64) -> &mut Self {
        self.buf.push_str(&value.to_string());
        self.buf.push(DELIMITER);
        self
    }

    pub fn put_str(&mut self, value: &str) -> &mut Self {
        self.buf.push_str(value);
        self.buf.push(DELIMITER);
        self
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

/// Consumes a response record left to right.
#[derive(Debug)]
pub struct Decoder<'a> {
    rest: &'a str,
    index: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(record: &'a str) -> Self {
        Self {
            rest: record,
            index: 0,
        }
    }

    pub fn get_str(&mut self) -> Result<&'a str, FormatError> {
        let (field, rest) = self
            .rest
            .split_once(DELIMITER)
            .ok_or(FormatError::MissingField(self.index))?;
        self.rest = rest;
        self.index += 1;
        Ok(field)
    }

    pub fn get_int(&mut self) -> Result<i64, FormatError> {
        let index = self.index;
        let field = self.get_str()?;
        field.parse().map_err(|_| FormatError::InvalidInt {
            index,
            value: field.to_string(),
        })
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a str {
        self.rest
    }
}

/// Number of complete fields in a partially received record.
pub fn field_count(record: &[u8]) -> usize {
    record.iter().filter(|&&b| b == DELIMITER as u8).count()
}
