/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! A simple big endian byte reader
//!
//! Container formats store their box headers big endian, this
//! reader is enough to walk them without copying.
use core::fmt::{Debug, Display, Formatter};

/// Errors from reading past the end of the stream
pub enum ByteIoError {
    // requested, remaining
    NotEnoughBytes(usize, usize),
    Generic(&'static str)
}

impl Debug for ByteIoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            ByteIoError::NotEnoughBytes(expected, found) => {
                writeln!(f, "Not enough bytes, expected {expected} but found {found}")
            }
            ByteIoError::Generic(err) => {
                writeln!(f, "Generic I/O error: {err}")
            }
        }
    }
}

impl Display for ByteIoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

impl std::error::Error for ByteIoError {}

/// A reader over a borrowed byte slice
#[derive(Copy, Clone)]
pub struct ByteReader<'a> {
    stream:   &'a [u8],
    position: usize
}

impl<'a> ByteReader<'a> {
    pub const fn new(stream: &'a [u8]) -> ByteReader<'a> {
        ByteReader {
            stream,
            position: 0
        }
    }

    /// Current position from the start of the stream
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Bytes left to read
    pub const fn remaining(&self) -> usize {
        self.stream.len().saturating_sub(self.position)
    }

    /// True if no more bytes can be read
    pub const fn eof(&self) -> bool {
        self.remaining() == 0
    }

    /// Look at the next `n` bytes without consuming them
    pub fn peek(&self, n: usize) -> Result<&'a [u8], ByteIoError> {
        if self.remaining() < n {
            return Err(ByteIoError::NotEnoughBytes(n, self.remaining()));
        }
        Ok(&self.stream[self.position..self.position + n])
    }

    /// Read `n` bytes, advancing the position
    pub fn get_bytes(&mut self, n: usize) -> Result<&'a [u8], ByteIoError> {
        let bytes = self.peek(n)?;
        self.position += n;
        Ok(bytes)
    }

    /// Read a fixed number of bytes into an array
    pub fn get_fixed_bytes<const N: usize>(&mut self) -> Result<[u8; N], ByteIoError> {
        let mut out = [0; N];
        out.copy_from_slice(self.get_bytes(N)?);
        Ok(out)
    }

    pub fn get_u8(&mut self) -> Result<u8, ByteIoError> {
        Ok(self.get_fixed_bytes::<1>()?[0])
    }

    pub fn get_u32_be(&mut self) -> Result<u32, ByteIoError> {
        Ok(u32::from_be_bytes(self.get_fixed_bytes()?))
    }

    pub fn get_u64_be(&mut self) -> Result<u64, ByteIoError> {
        Ok(u64::from_be_bytes(self.get_fixed_bytes()?))
    }

    /// Skip `n` bytes
    pub fn skip(&mut self, n: usize) -> Result<(), ByteIoError> {
        self.get_bytes(n).map(|_| ())
    }

    /// Consume everything that remains
    pub fn rest(&mut self) -> &'a [u8] {
        let start = self.position.min(self.stream.len());
        self.position = self.stream.len();
        &self.stream[start..]
    }
}
