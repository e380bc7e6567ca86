use crate::{Error, ErrorKind};

/// A slice-level read failure, before any positional context is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadError {
    Eof,
    InvalidGamma,
}

impl ReadError {
    #[inline]
    #[must_use]
    pub(crate) fn at(self, offset: usize) -> Error {
        match self {
            ReadError::Eof => Error::new(ErrorKind::Eof { offset }),
            ReadError::InvalidGamma => Error::new(ErrorKind::InvalidGamma { offset }),
        }
    }
}

#[inline]
pub(crate) fn split_array<const N: usize>(data: &[u8]) -> Result<([u8; N], &[u8]), ReadError> {
    match data.split_first_chunk::<N>() {
        Some((head, rest)) => Ok((*head, rest)),
        None => Err(ReadError::Eof),
    }
}

#[inline]
pub(crate) fn read_bytes(data: &[u8], n: usize) -> Result<(&[u8], &[u8]), ReadError> {
    if n <= data.len() {
        Ok(data.split_at(n))
    } else {
        Err(ReadError::Eof)
    }
}

#[inline]
pub(crate) fn read_u8(data: &[u8]) -> Result<(u8, &[u8]), ReadError> {
    let (&first, rest) = data.split_first().ok_or(ReadError::Eof)?;
    Ok((first, rest))
}

#[inline]
pub(crate) fn read_u16(data: &[u8]) -> Result<(u16, &[u8]), ReadError> {
    let (head, rest) = split_array::<2>(data)?;
    Ok((u16::from_be_bytes(head), rest))
}

#[inline]
pub(crate) fn read_u24(data: &[u8]) -> Result<(u32, &[u8]), ReadError> {
    let (head, rest) = split_array::<3>(data)?;
    Ok((
        u32::from(head[0]) << 16 | u32::from(head[1]) << 8 | u32::from(head[2]),
        rest,
    ))
}

#[inline]
pub(crate) fn read_u32(data: &[u8]) -> Result<(u32, &[u8]), ReadError> {
    let (head, rest) = split_array::<4>(data)?;
    Ok((u32::from_be_bytes(head), rest))
}

#[inline]
pub(crate) fn read_u64(data: &[u8]) -> Result<(u64, &[u8]), ReadError> {
    let (head, rest) = split_array::<8>(data)?;
    Ok((u64::from_be_bytes(head), rest))
}

/// Decodes a simple-gamma variable length integer.
///
/// The number of leading set bits in the first byte selects how many bytes
/// the value occupies in total (1 to 5); the all-set 5 bit prefix is
/// reserved. Returns the decoded value together with the number of bytes the
/// encoding occupied, as table and record bookkeeping needs both.
pub(crate) fn read_gamma(data: &[u8]) -> Result<((u32, usize), &[u8]), ReadError> {
    let (first, rest) = read_u8(data)?;
    if first & 0x80 == 0 {
        return Ok(((u32::from(first), 1), rest));
    }
    if first & 0x40 == 0 {
        let (next, rest) = read_u8(rest)?;
        return Ok(((u32::from(first & 0x3F) << 8 | u32::from(next), 2), rest));
    }
    if first & 0x20 == 0 {
        let (next, rest) = read_u16(rest)?;
        return Ok(((u32::from(first & 0x1F) << 16 | u32::from(next), 3), rest));
    }
    if first & 0x10 == 0 {
        let (next, rest) = read_u24(rest)?;
        return Ok(((u32::from(first & 0x0F) << 24 | next, 4), rest));
    }
    if first & 0x08 != 0 {
        return Err(ReadError::InvalidGamma);
    }
    let (value, rest) = read_u32(rest)?;
    Ok(((value, 5), rest))
}

/// Reads a gamma length prefixed UTF-8 string.
pub(crate) fn read_string(data: &[u8]) -> Result<(String, &[u8]), ReadError> {
    let ((len, _), rest) = read_gamma(data)?;
    let (bytes, rest) = read_bytes(rest, len as usize)?;
    Ok((String::from_utf8_lossy(bytes).into_owned(), rest))
}

/// Sequential cursor over a byte slice.
///
/// All integer reads are big-endian. Failures carry the byte offset from the
/// start of the slice.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    original_length: usize,
}

impl<'a> ByteReader<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            original_length: data.len(),
        }
    }

    /// Number of bytes consumed so far
    #[inline]
    pub fn position(&self) -> usize {
        self.original_length - self.data.len()
    }

    #[inline]
    pub fn remaining(&self) -> &'a [u8] {
        self.data
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    fn err_position(&self, err: ReadError) -> Error {
        err.at(self.position())
    }

    /// Reads exactly `n` bytes
    #[inline]
    pub fn read(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let (result, rest) = read_bytes(self.data, n).map_err(|e| self.err_position(e))?;
        self.data = rest;
        Ok(result)
    }

    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let (result, rest) = split_array::<N>(self.data).map_err(|e| self.err_position(e))?;
        self.data = rest;
        Ok(result)
    }

    #[inline]
    pub fn u8(&mut self) -> Result<u8, Error> {
        let (result, rest) = read_u8(self.data).map_err(|e| self.err_position(e))?;
        self.data = rest;
        Ok(result)
    }

    #[inline]
    pub fn u16(&mut self) -> Result<u16, Error> {
        let (result, rest) = read_u16(self.data).map_err(|e| self.err_position(e))?;
        self.data = rest;
        Ok(result)
    }

    #[inline]
    pub fn u24(&mut self) -> Result<u32, Error> {
        let (result, rest) = read_u24(self.data).map_err(|e| self.err_position(e))?;
        self.data = rest;
        Ok(result)
    }

    #[inline]
    pub fn u32(&mut self) -> Result<u32, Error> {
        let (result, rest) = read_u32(self.data).map_err(|e| self.err_position(e))?;
        self.data = rest;
        Ok(result)
    }

    #[inline]
    pub fn u64(&mut self) -> Result<u64, Error> {
        let (result, rest) = read_u64(self.data).map_err(|e| self.err_position(e))?;
        self.data = rest;
        Ok(result)
    }

    /// Reads a gamma encoded integer, returning the value and its encoded
    /// length in bytes
    #[inline]
    pub fn gamma(&mut self) -> Result<(u32, usize), Error> {
        let (result, rest) = read_gamma(self.data).map_err(|e| self.err_position(e))?;
        self.data = rest;
        Ok(result)
    }

    /// Reads a gamma length prefixed UTF-8 string
    #[inline]
    pub fn string(&mut self) -> Result<String, Error> {
        let (result, rest) = read_string(self.data).map_err(|e| self.err_position(e))?;
        self.data = rest;
        Ok(result)
    }
}
