use std::fmt;
use std::io::{self, Read};

use crate::buf::padding_to;
use crate::error::{ErrorKind, Result};
use crate::frame::Frame;
use crate::proto::Endianness;
use crate::{de, ser, Type, Value};

/// A cursor over a growable byte buffer providing aligned reads and writes.
///
/// Writes always append to the end of the buffer while reads advance a
/// separate read position. Alignment is computed relative to a movable
/// *base*, which is the start of the message currently being read or
/// written.
///
/// Every read either succeeds or leaves the read position untouched. When
/// there aren't enough bytes buffered the error is a *not enough data* error
/// and the same read can be retried once more bytes have been appended.
///
/// # Examples
///
/// ```
/// use dbus_stream::{Endianness, Marshaller, Type, Value};
///
/// let mut buf = Marshaller::new(Endianness::LITTLE);
/// buf.write_value(&Value::from(1u8), &Type::Byte)?;
/// buf.write_value(&Value::from(2u32), &Type::UInt32)?;
/// assert_eq!(buf.written(), &[1, 0, 0, 0, 2, 0, 0, 0]);
///
/// assert_eq!(buf.read_value(&Type::Byte)?, Value::from(1u8));
/// assert_eq!(buf.read_value(&Type::UInt32)?, Value::from(2u32));
/// # Ok::<_, dbus_stream::Error>(())
/// ```
pub struct Marshaller {
    data: Vec<u8>,
    read: usize,
    base: usize,
    limit: Option<usize>,
    endianness: Endianness,
}

impl Marshaller {
    /// Construct a new empty buffer using the given byte order.
    pub fn new(endianness: Endianness) -> Self {
        Self {
            data: Vec::new(),
            read: 0,
            base: 0,
            limit: None,
            endianness,
        }
    }

    /// Construct a buffer over bytes that have already been received.
    pub fn from_bytes(endianness: Endianness, bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec(),
            read: 0,
            base: 0,
            limit: None,
            endianness,
        }
    }

    /// The byte order used for reads and writes.
    #[inline]
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Change the byte order, used when a message declares its own.
    #[inline]
    pub fn set_endianness(&mut self, endianness: Endianness) {
        self.endianness = endianness;
    }

    /// The current read position.
    #[inline]
    pub fn tell(&self) -> usize {
        self.read
    }

    /// Move the read position to `pos`.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is beyond the written data.
    #[inline]
    pub fn seek(&mut self, pos: usize) {
        assert!(pos <= self.data.len(), "seek out of bounds");
        self.read = pos;
    }

    /// Skip `n` bytes of input.
    pub fn discard(&mut self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(ErrorKind::NotEnoughData.into());
        }

        self.read += n;
        Ok(())
    }

    /// The position alignment is computed relative to.
    #[inline]
    pub fn base(&self) -> usize {
        self.base
    }

    /// Set the position alignment is computed relative to.
    ///
    /// Positions before the base count as aligned.
    #[inline]
    pub fn set_base(&mut self, base: usize) {
        self.base = base;
    }

    /// Restrict reads to the bytes before `limit`, or lift the restriction.
    ///
    /// Reads which would cross the limit fail the same way as reads past the
    /// end of the buffer.
    #[inline]
    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
    }

    /// The bytes which are readable, taking the limit into account.
    #[inline]
    fn readable(&self) -> &[u8] {
        match self.limit {
            Some(limit) => &self.data[..limit.min(self.data.len())],
            None => &self.data,
        }
    }

    /// The number of bytes in the buffer which haven't been read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.readable().len().saturating_sub(self.read)
    }

    /// The bytes in the buffer which haven't been read.
    #[inline]
    pub fn get(&self) -> &[u8] {
        self.readable().get(self.read..).unwrap_or_default()
    }

    /// All bytes written to the buffer, including those already read.
    #[inline]
    pub fn written(&self) -> &[u8] {
        &self.data
    }

    /// Total number of bytes written.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Test if nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drop everything before the read position, moving the remainder to the
    /// front of the buffer.
    pub fn compact(&mut self) {
        if self.read == 0 {
            return;
        }

        self.data.drain(..self.read);
        self.base = self.base.saturating_sub(self.read);
        self.limit = self.limit.map(|limit| limit.saturating_sub(self.read));
        self.read = 0;
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.data.clear();
        self.read = 0;
        self.base = 0;
        self.limit = None;
    }

    /// Consume the buffer into the written bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Append raw bytes.
    #[inline]
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Append raw bytes followed by a NUL byte.
    pub(crate) fn extend_from_slice_nul(&mut self, bytes: &[u8]) {
        self.data.reserve(bytes.len() + 1);
        self.data.extend_from_slice(bytes);
        self.data.push(0);
    }

    /// Read at most `n` bytes from `reader` onto the end of the buffer.
    pub(crate) fn read_from<R>(&mut self, mut reader: R, n: usize) -> io::Result<usize>
    where
        R: Read,
    {
        let len = self.data.len();
        self.data.resize(len + n, 0);

        match reader.read(&mut self.data[len..]) {
            Ok(read) => {
                self.data.truncate(len + read);
                Ok(read)
            }
            Err(error) => {
                self.data.truncate(len);
                Err(error)
            }
        }
    }

    /// Write zeroed padding until the write position is aligned to `align`.
    pub fn write_pad(&mut self, align: usize) {
        let padding = padding_to(self.data.len().saturating_sub(self.base), align);
        self.data.resize(self.data.len() + padding, 0);
    }

    /// Skip padding until the read position is aligned to `align`.
    ///
    /// Padding bytes must be zero.
    pub fn read_pad(&mut self, align: usize) -> Result<()> {
        let padding = self.read_padding(align);

        let Some(bytes) = self.readable().get(self.read..self.read + padding) else {
            return Err(ErrorKind::NotEnoughData.into());
        };

        if bytes.iter().any(|&b| b != 0) {
            return Err(ErrorKind::NonZeroPadding.into());
        }

        self.read += padding;
        Ok(())
    }

    #[inline]
    fn read_padding(&self, align: usize) -> usize {
        padding_to(self.read.saturating_sub(self.base), align)
    }

    /// Store a frame after padding to its alignment, returning the position
    /// it was written at.
    pub(crate) fn store<T>(&mut self, frame: T) -> usize
    where
        T: Frame,
    {
        self.write_pad(T::SIZE);
        let at = self.data.len();
        frame.store(self.endianness, &mut self.data);
        at
    }

    /// Overwrite a frame previously written at `at`.
    pub(crate) fn store_at<T>(&mut self, at: usize, frame: T)
    where
        T: Frame,
    {
        frame.store_at(self.endianness, &mut self.data[at..at + T::SIZE]);
    }

    /// Load a frame after skipping padding to its alignment.
    ///
    /// Nothing is consumed unless the whole frame is available.
    pub(crate) fn load<T>(&mut self) -> Result<T>
    where
        T: Frame,
    {
        let start = self.read + self.read_padding(T::SIZE);

        let Some(bytes) = self.readable().get(start..start + T::SIZE) else {
            return Err(ErrorKind::NotEnoughData.into());
        };

        let frame = T::load(bytes, self.endianness);
        self.read = start + T::SIZE;
        Ok(frame)
    }

    /// Load `len` bytes followed by a NUL terminator, returning the bytes
    /// without the terminator.
    pub(crate) fn load_slice_nul(&mut self, len: usize) -> Result<&[u8]> {
        let start = self.read;

        let Some(&terminator) = self.readable().get(start + len) else {
            return Err(ErrorKind::NotEnoughData.into());
        };

        if terminator != 0 {
            return Err(ErrorKind::NotNullTerminated.into());
        }

        self.read += len + 1;
        Ok(&self.data[start..start + len])
    }

    /// Encode `value` as `ty` at the end of the buffer.
    ///
    /// On error the buffer is truncated to where it was before the call.
    pub fn write_value(&mut self, value: &Value, ty: &Type) -> Result<()> {
        let len = self.data.len();

        if let Err(error) = ser::encode(self, value, ty) {
            self.data.truncate(len);
            return Err(error);
        }

        Ok(())
    }

    /// Decode a value of type `ty` at the read position.
    ///
    /// On error the read position is restored to where it was before the
    /// call.
    pub fn read_value(&mut self, ty: &Type) -> Result<Value> {
        let start = self.read;

        match de::decode(self, ty) {
            Ok(value) => Ok(value),
            Err(error) => {
                self.read = start;
                Err(error)
            }
        }
    }
}

impl fmt::Debug for Marshaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marshaller")
            .field("len", &self.data.len())
            .field("read", &self.read)
            .field("base", &self.base)
            .field("limit", &self.limit)
            .field("endianness", &self.endianness)
            .finish()
    }
}
