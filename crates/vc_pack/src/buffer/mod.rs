//! The byte region the engine reads from and writes to.
//!
//! A [`SerializerBuffer`] tracks a cursor (`position`), a high-water mark
//! (`length`) and the size of its storage (`capacity`), keeping
//! `0 <= position <= length <= capacity <= limit` at all times.
//!
//! Storage is one of:
//! - an owned allocation, used for small buffers;
//! - a [`PooledBlock`] rented from the [`BufferPool`] once the buffer
//!   reaches the pooling threshold;
//! - an externally supplied fixed slice, which never grows.
//!
//! Any mutating call may move the storage, so slices obtained from the
//! buffer must not be kept across calls (the borrow checker enforces this).

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Range;

use crate::options::{DEFAULT_POOL_THRESHOLD, MAX_CAPACITY, MIN_GROWTH};
use crate::varint;
use crate::{PackError, PackResult};

// -----------------------------------------------------------------------------
// Modules

mod io;
mod pool;

// -----------------------------------------------------------------------------
// Exports

pub use pool::{BufferPool, DEFAULT_RETAINED, PooledBlock};

// -----------------------------------------------------------------------------
// BufferPolicy

/// Growth and pooling limits of a [`SerializerBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPolicy {
    /// Capacity ceiling, never above [`MAX_CAPACITY`].
    pub limit: usize,
    /// Storage at or above this size is rented from the shared pool.
    pub pool_threshold: usize,
}

impl Default for BufferPolicy {
    fn default() -> Self {
        Self {
            limit: MAX_CAPACITY,
            pool_threshold: DEFAULT_POOL_THRESHOLD,
        }
    }
}

// -----------------------------------------------------------------------------
// Storage

enum Storage {
    Owned(Vec<u8>),
    Pooled(PooledBlock),
    Fixed(Box<[u8]>),
}

impl Storage {
    #[inline]
    fn bytes(&self) -> &[u8] {
        match self {
            Storage::Owned(vec) => vec,
            Storage::Pooled(block) => block,
            Storage::Fixed(slice) => slice,
        }
    }

    #[inline]
    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Storage::Owned(vec) => vec,
            Storage::Pooled(block) => block,
            Storage::Fixed(slice) => slice,
        }
    }
}

// -----------------------------------------------------------------------------
// SerializerBuffer

/// A growable byte region with a read/write cursor.
///
/// Writes land at `position` and raise `length` when they pass it.
/// Reads are bounded by `length`.
///
/// # Examples
///
/// ```
/// use vc_pack::buffer::SerializerBuffer;
///
/// let mut buf = SerializerBuffer::new();
/// buf.write_bytes(b"abc").unwrap();
/// buf.write_varint(300).unwrap();
/// assert_eq!(buf.length(), 5);
///
/// buf.set_position(0).unwrap();
/// assert_eq!(buf.read_bytes(3).unwrap(), b"abc");
/// assert_eq!(buf.read_varint().unwrap(), 300);
/// assert!(buf.read_u8().unwrap_err().is_end_of_data());
/// ```
pub struct SerializerBuffer {
    storage: Storage,
    position: usize,
    length: usize,
    read_only: bool,
    policy: BufferPolicy,
}

impl Default for SerializerBuffer {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SerializerBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.storage {
            Storage::Owned(_) => "owned",
            Storage::Pooled(_) => "pooled",
            Storage::Fixed(_) => "fixed",
        };
        f.debug_struct("SerializerBuffer")
            .field("storage", &kind)
            .field("position", &self.position)
            .field("length", &self.length)
            .field("capacity", &self.capacity())
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl SerializerBuffer {
    /// Creates an empty buffer with the default policy.
    ///
    /// No memory is allocated until the first write.
    #[inline]
    pub const fn new() -> Self {
        Self {
            storage: Storage::Owned(Vec::new()),
            position: 0,
            length: 0,
            read_only: false,
            policy: BufferPolicy {
                limit: MAX_CAPACITY,
                pool_threshold: DEFAULT_POOL_THRESHOLD,
            },
        }
    }

    /// Creates an empty buffer with the given policy and initial capacity.
    pub fn with_policy(policy: BufferPolicy, capacity: usize) -> PackResult<Self> {
        let policy = BufferPolicy {
            limit: policy.limit.min(MAX_CAPACITY),
            ..policy
        };
        let mut buffer = Self {
            policy,
            ..Self::new()
        };
        if capacity > 0 {
            buffer.reserve_total(capacity)?;
        }
        Ok(buffer)
    }

    /// Wraps existing bytes; the whole vector becomes readable data.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let length = data.len();
        Self {
            storage: Storage::Owned(data),
            length,
            ..Self::new()
        }
    }

    /// Wraps externally supplied storage that never grows.
    ///
    /// The buffer starts empty; writes beyond the slice fail with
    /// [`PackError::CapacityExceeded`].
    pub fn fixed(storage: Box<[u8]>) -> Self {
        Self {
            storage: Storage::Fixed(storage),
            ..Self::new()
        }
    }

    /// Wraps bytes that may only be read.
    pub fn read_only(data: Vec<u8>) -> Self {
        Self {
            read_only: true,
            ..Self::from_vec(data)
        }
    }

    // -------------------------------------------------------------------------
    // Accessors

    /// Current cursor.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Logical length, the high-water mark of written data.
    #[inline]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Size of the backing storage.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.bytes().len()
    }

    /// Bytes between `position` and `length`.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.length - self.position
    }

    #[inline]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[inline]
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    #[inline]
    pub const fn policy(&self) -> BufferPolicy {
        self.policy
    }

    /// Returns `true` if the storage is rented from the pool.
    #[inline]
    pub fn is_pooled(&self) -> bool {
        matches!(self.storage, Storage::Pooled(_))
    }

    /// The logical content, `[0, length)`.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.storage.bytes()[..self.length]
    }

    /// The unread content, `[position, length)`.
    #[inline]
    pub fn unread(&self) -> &[u8] {
        &self.storage.bytes()[self.position..self.length]
    }

    /// Copies the logical content out.
    #[inline]
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Moves the cursor, failing with `OutOfRange` outside `[0, length]`.
    pub fn set_position(&mut self, position: usize) -> PackResult<()> {
        if position > self.length {
            return Err(PackError::OutOfRange {
                position,
                length: self.length,
            });
        }
        self.position = position;
        Ok(())
    }

    /// Truncates or extends the logical length.
    ///
    /// Extending grows the storage if needed and zero fills the new region.
    /// The cursor is clamped into the new length.
    pub fn set_length(&mut self, length: usize) -> PackResult<()> {
        self.check_writable()?;
        if length > self.length {
            self.reserve_total(length)?;
            let old = self.length;
            self.storage.bytes_mut()[old..length].fill(0);
        }
        self.length = length;
        self.position = self.position.min(length);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Capacity

    #[inline]
    fn check_writable(&self) -> PackResult<()> {
        if self.read_only {
            Err(PackError::ReadOnlyViolation)
        } else {
            Ok(())
        }
    }

    /// Guarantees room for `n` more bytes at the current position.
    pub fn ensure_writable(&mut self, n: usize) -> PackResult<()> {
        self.check_writable()?;
        let required = self
            .position
            .checked_add(n)
            .ok_or(PackError::CapacityExceeded {
                requested: usize::MAX,
                limit: self.policy.limit,
            })?;
        self.reserve_total(required)
    }

    /// Guarantees `n` unread bytes before `length`.
    #[inline]
    pub fn ensure_readable(&self, n: usize) -> PackResult<()> {
        let available = self.remaining();
        if n > available {
            Err(PackError::end_of_data(n, available))
        } else {
            Ok(())
        }
    }

    fn reserve_total(&mut self, required: usize) -> PackResult<()> {
        let capacity = self.capacity();
        if required <= capacity {
            return Ok(());
        }

        let limit = match self.storage {
            Storage::Fixed(_) => capacity,
            _ => self.policy.limit,
        };
        if required > limit {
            return Err(PackError::CapacityExceeded {
                requested: required,
                limit,
            });
        }

        let target = required
            .max(capacity.saturating_mul(2))
            .max(MIN_GROWTH)
            .min(limit);
        self.regrow(target);
        Ok(())
    }

    fn regrow(&mut self, target: usize) {
        let pooled_size = target.checked_next_power_of_two();

        let mut storage = match pooled_size {
            Some(size) if target >= self.policy.pool_threshold && size <= self.policy.limit => {
                Storage::Pooled(BufferPool::shared().rent(size))
            }
            _ => Storage::Owned(vec![0u8; target]),
        };

        log::debug!(
            "growing buffer from {} to {} bytes",
            self.capacity(),
            storage.bytes().len()
        );

        let length = self.length;
        storage.bytes_mut()[..length].copy_from_slice(&self.storage.bytes()[..length]);
        // The previous block, if pooled, goes back to the pool here.
        self.storage = storage;
    }

    // -------------------------------------------------------------------------
    // Structural edits

    /// Opens `n` zero bytes at `at`, shifting `[at, length)` right.
    ///
    /// The cursor moves with the data if it sits at or after `at`.
    pub fn insert_gap(&mut self, at: usize, n: usize) -> PackResult<()> {
        self.check_writable()?;
        if at > self.length {
            return Err(PackError::OutOfRange {
                position: at,
                length: self.length,
            });
        }
        if n == 0 {
            return Ok(());
        }

        let length = self.length;
        self.reserve_total(length + n)?;
        let bytes = self.storage.bytes_mut();
        bytes.copy_within(at..length, at + n);
        bytes[at..at + n].fill(0);

        self.length += n;
        if self.position >= at {
            self.position += n;
        }
        Ok(())
    }

    /// Removes `n` bytes at `at`, shifting the tail left.
    pub fn delete(&mut self, at: usize, n: usize) -> PackResult<()> {
        self.check_writable()?;
        let end = at.checked_add(n).filter(|&end| end <= self.length).ok_or(
            PackError::OutOfRange {
                position: at.saturating_add(n),
                length: self.length,
            },
        )?;

        let length = self.length;
        self.storage.bytes_mut().copy_within(end..length, at);
        self.length -= n;

        if self.position >= end {
            self.position -= n;
        } else if self.position > at {
            self.position = at;
        }
        Ok(())
    }

    /// Keeps only `range` of the logical content, moved to the front.
    ///
    /// The cursor keeps pointing at the same byte when it lies inside
    /// `range`, otherwise it is clamped to the new bounds.
    pub fn slice(&mut self, range: Range<usize>) -> PackResult<()> {
        self.check_writable()?;
        if range.start > range.end || range.end > self.length {
            return Err(PackError::OutOfRange {
                position: range.end,
                length: self.length,
            });
        }

        self.storage.bytes_mut().copy_within(range.clone(), 0);
        self.length = range.end - range.start;
        self.position = self.position.clamp(range.start, range.end) - range.start;
        Ok(())
    }

    /// Empties the buffer, keeping its storage.
    #[inline]
    pub fn reset(&mut self) {
        self.position = 0;
        self.length = 0;
    }

    /// Takes the logical content out, leaving the buffer empty.
    pub fn take_vec(&mut self) -> Vec<u8> {
        let out = self.to_vec();
        self.reset();
        out
    }

    // -------------------------------------------------------------------------
    // Writing

    /// Writes `bytes` at the cursor and advances it.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> PackResult<()> {
        self.ensure_writable(bytes.len())?;
        let start = self.position;
        let end = start + bytes.len();
        self.storage.bytes_mut()[start..end].copy_from_slice(bytes);
        self.position = end;
        self.length = self.length.max(end);
        Ok(())
    }

    /// Overwrites already written bytes without moving the cursor.
    pub fn write_at(&mut self, at: usize, bytes: &[u8]) -> PackResult<()> {
        self.check_writable()?;
        let end = at + bytes.len();
        if end > self.length {
            return Err(PackError::OutOfRange {
                position: end,
                length: self.length,
            });
        }
        self.storage.bytes_mut()[at..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Writes `n` zero bytes.
    pub fn write_zeros(&mut self, n: usize) -> PackResult<()> {
        self.ensure_writable(n)?;
        let start = self.position;
        self.storage.bytes_mut()[start..start + n].fill(0);
        self.position += n;
        self.length = self.length.max(self.position);
        Ok(())
    }

    /// Hands the next `n` bytes to `f` for in-place filling.
    pub fn write_with(&mut self, n: usize, f: impl FnOnce(&mut [u8])) -> PackResult<()> {
        self.ensure_writable(n)?;
        let start = self.position;
        f(&mut self.storage.bytes_mut()[start..start + n]);
        self.position += n;
        self.length = self.length.max(self.position);
        Ok(())
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) -> PackResult<()> {
        self.write_bytes(&[value])
    }

    #[inline]
    pub fn write_u16_le(&mut self, value: u16) -> PackResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    #[inline]
    pub fn write_u32_le(&mut self, value: u32) -> PackResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    #[inline]
    pub fn write_u64_le(&mut self, value: u64) -> PackResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes an unsigned varint.
    #[inline]
    pub fn write_varint(&mut self, value: u64) -> PackResult<()> {
        let mut out = [0u8; varint::MAX_VARINT_LEN];
        let len = varint::encode_u64(value, &mut out);
        self.write_bytes(&out[..len])
    }

    /// Writes a zig-zag signed varint.
    #[inline]
    pub fn write_zigzag(&mut self, value: i64) -> PackResult<()> {
        self.write_varint(varint::zigzag_i64(value))
    }

    // -------------------------------------------------------------------------
    // Reading

    /// Reads the next byte without consuming it.
    #[inline]
    pub fn peek_u8(&self) -> PackResult<u8> {
        self.ensure_readable(1)?;
        Ok(self.storage.bytes()[self.position])
    }

    #[inline]
    pub fn read_u8(&mut self) -> PackResult<u8> {
        let byte = self.peek_u8()?;
        self.position += 1;
        Ok(byte)
    }

    /// Reads `n` bytes and advances the cursor.
    pub fn read_bytes(&mut self, n: usize) -> PackResult<&[u8]> {
        self.ensure_readable(n)?;
        let start = self.position;
        self.position += n;
        Ok(&self.storage.bytes()[start..start + n])
    }

    /// Reads a fixed number of bytes.
    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> PackResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    #[inline]
    pub fn read_u16_le(&mut self) -> PackResult<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    #[inline]
    pub fn read_u32_le(&mut self) -> PackResult<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    #[inline]
    pub fn read_u64_le(&mut self) -> PackResult<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Reads an unsigned 64-bit varint.
    pub fn read_varint(&mut self) -> PackResult<u64> {
        let (value, len) = varint::decode_u64(self.unread())?;
        self.position += len;
        Ok(value)
    }

    /// Reads an unsigned varint that must fit in 32 bits.
    pub fn read_varint_u32(&mut self) -> PackResult<u32> {
        let (value, len) = varint::decode_u32(self.unread())?;
        self.position += len;
        Ok(value)
    }

    /// Reads a zig-zag signed varint.
    #[inline]
    pub fn read_zigzag(&mut self) -> PackResult<i64> {
        self.read_varint().map(varint::unzigzag_i64)
    }

    // -------------------------------------------------------------------------
    // Rollback

    /// Restores a saved cursor and length after a failed call.
    ///
    /// Unlike `set_length` this never grows and ignores the read-only flag,
    /// it only drops data written after the save point.
    pub(crate) fn rewind(&mut self, position: usize, length: usize) {
        self.length = self.length.min(length);
        self.position = position.min(self.length);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::{BufferPolicy, SerializerBuffer};
    use crate::PackError;

    #[test]
    fn grows_geometrically_from_minimum() {
        let mut buf = SerializerBuffer::new();
        assert_eq!(buf.capacity(), 0);

        buf.write_u8(1).unwrap();
        assert_eq!(buf.capacity(), 256);

        buf.write_zeros(256).unwrap();
        assert_eq!(buf.capacity(), 512);
        assert_eq!(buf.length(), 257);
        assert_eq!(buf.as_slice()[0], 1);
    }

    #[test]
    fn respects_capacity_limit() {
        let policy = BufferPolicy {
            limit: 300,
            ..BufferPolicy::default()
        };
        let mut buf = SerializerBuffer::with_policy(policy, 0).unwrap();

        buf.write_zeros(200).unwrap();
        buf.write_zeros(100).unwrap();
        assert_eq!(buf.capacity(), 300);

        let err = buf.write_u8(0).unwrap_err();
        assert!(matches!(
            err,
            PackError::CapacityExceeded {
                requested: 301,
                limit: 300
            }
        ));
    }

    #[test]
    fn large_storage_is_pooled() {
        let policy = BufferPolicy {
            pool_threshold: 1024,
            ..BufferPolicy::default()
        };
        let mut buf = SerializerBuffer::with_policy(policy, 16).unwrap();
        assert!(!buf.is_pooled());

        buf.write_zeros(1500).unwrap();
        assert!(buf.is_pooled());
        assert!(buf.capacity().is_power_of_two());
    }

    #[test]
    fn fixed_storage_never_grows() {
        let mut buf = SerializerBuffer::fixed(vec![0u8; 4].into_boxed_slice());
        buf.write_u32_le(7).unwrap();

        let err = buf.write_u8(1).unwrap_err();
        assert!(matches!(err, PackError::CapacityExceeded { limit: 4, .. }));
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn read_only_rejects_mutation() {
        let mut buf = SerializerBuffer::read_only(vec![1, 2, 3]);
        assert!(matches!(buf.write_u8(0), Err(PackError::ReadOnlyViolation)));
        assert!(matches!(buf.set_length(1), Err(PackError::ReadOnlyViolation)));
        assert_eq!(buf.read_u8().unwrap(), 1);
    }

    #[test]
    fn position_and_length_bounds() {
        let mut buf = SerializerBuffer::from_vec(vec![1, 2, 3, 4]);
        assert!(matches!(
            buf.set_position(5),
            Err(PackError::OutOfRange {
                position: 5,
                length: 4
            })
        ));

        buf.set_position(4).unwrap();
        buf.set_length(2).unwrap();
        assert_eq!(buf.position(), 2);

        buf.set_length(6).unwrap();
        assert_eq!(buf.as_slice(), &[1, 2, 0, 0, 0, 0]);

        assert!(buf.read_bytes(5).unwrap_err().is_end_of_data());
    }

    #[test]
    fn insert_and_delete_shift_data_and_cursor() {
        let mut buf = SerializerBuffer::new();
        buf.write_bytes(&[1, 2, 3, 4]).unwrap();

        buf.insert_gap(1, 2).unwrap();
        assert_eq!(buf.as_slice(), &[1, 0, 0, 2, 3, 4]);
        assert_eq!(buf.position(), 6);

        buf.delete(1, 2).unwrap();
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(buf.position(), 4);

        buf.set_position(2).unwrap();
        buf.delete(1, 2).unwrap();
        assert_eq!(buf.as_slice(), &[1, 4]);
        assert_eq!(buf.position(), 1);
    }

    #[test]
    fn slice_keeps_range() {
        let mut buf = SerializerBuffer::from_vec(vec![0, 1, 2, 3, 4, 5]);
        buf.set_position(3).unwrap();

        buf.slice(2..5).unwrap();
        assert_eq!(buf.as_slice(), &[2, 3, 4]);
        assert_eq!(buf.position(), 1);
    }

    #[test]
    fn overwrite_keeps_length() {
        let mut buf = SerializerBuffer::new();
        buf.write_bytes(&[9, 9, 9]).unwrap();
        buf.write_at(1, &[5]).unwrap();
        assert_eq!(buf.as_slice(), &[9, 5, 9]);
        assert!(buf.write_at(3, &[0]).is_err());

        buf.set_position(0).unwrap();
        buf.write_u8(1).unwrap();
        assert_eq!(buf.length(), 3);
    }

    #[test]
    fn rewind_drops_tail() {
        let mut buf = SerializerBuffer::new();
        buf.write_bytes(&[1, 2]).unwrap();
        buf.write_bytes(&[3, 4, 5]).unwrap();
        buf.rewind(2, 2);
        assert_eq!(buf.as_slice(), &[1, 2]);
        assert_eq!(buf.position(), 2);

        assert_eq!(buf.take_vec(), vec![1, 2]);
        assert_eq!(buf.length(), 0);
    }
}
