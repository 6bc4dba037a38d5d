use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

// -----------------------------------------------------------------------------
// BufferPool

const BUCKETS: usize = usize::BITS as usize;

/// Default number of blocks kept per size class.
pub const DEFAULT_RETAINED: usize = 4;

/// A pool of large byte blocks, bucketed by power-of-two size.
///
/// Blocks are handed out as [`PooledBlock`], which give their storage back
/// when dropped. Each bucket keeps at most `retained` idle blocks, any
/// surplus is freed.
///
/// The pool is usually accessed through [`BufferPool::shared`], but a
/// `static` pool can be declared for isolated use.
///
/// # Examples
///
/// ```
/// use vc_pack::buffer::BufferPool;
///
/// static POOL: BufferPool = BufferPool::new(2);
///
/// let block = POOL.rent(100_000);
/// assert_eq!(block.len(), 131_072);
/// drop(block);
/// assert_eq!(POOL.idle_blocks(), 1);
/// ```
pub struct BufferPool {
    buckets: [Mutex<Vec<Vec<u8>>>; BUCKETS],
    retained: usize,
}

impl BufferPool {
    /// Creates an empty pool keeping at most `retained` blocks per size class.
    pub const fn new(retained: usize) -> Self {
        Self {
            buckets: [const { Mutex::new(Vec::new()) }; BUCKETS],
            retained,
        }
    }

    /// The process-wide pool used by growing buffers.
    pub fn shared() -> &'static BufferPool {
        static SHARED: BufferPool = BufferPool::new(DEFAULT_RETAINED);
        &SHARED
    }

    #[inline]
    fn bucket_of(size: usize) -> usize {
        size.trailing_zeros() as usize
    }

    /// Rents a zeroed block of at least `min_len` bytes.
    ///
    /// The block length is `min_len` rounded up to a power of two.
    pub fn rent(&'static self, min_len: usize) -> PooledBlock {
        let size = min_len.max(1).next_power_of_two();
        let bucket = &self.buckets[Self::bucket_of(size)];

        let reused = bucket.lock().unwrap_or_else(PoisonError::into_inner).pop();
        let data = match reused {
            Some(mut data) => {
                data.fill(0);
                log::debug!("reusing pooled block of {size} bytes");
                data
            }
            None => {
                log::debug!("allocating pooled block of {size} bytes");
                vec![0u8; size]
            }
        };

        PooledBlock { data, pool: self }
    }

    fn give_back(&self, data: Vec<u8>) {
        let size = data.len();
        if !size.is_power_of_two() {
            return;
        }

        let mut bucket = self.buckets[Self::bucket_of(size)]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if bucket.len() < self.retained {
            log::debug!("returning block of {size} bytes to the pool");
            bucket.push(data);
        }
    }

    /// Number of idle blocks across all size classes.
    pub fn idle_blocks(&self) -> usize {
        self.buckets
            .iter()
            .map(|bucket| bucket.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    /// Frees every idle block.
    pub fn clear(&self) {
        for bucket in &self.buckets {
            bucket.lock().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("retained", &self.retained)
            .field("idle_blocks", &self.idle_blocks())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// PooledBlock

/// Storage rented from a [`BufferPool`].
///
/// Returned to its pool exactly once, when dropped.
pub struct PooledBlock {
    data: Vec<u8>,
    pool: &'static BufferPool,
}

impl Deref for PooledBlock {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for PooledBlock {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for PooledBlock {
    fn drop(&mut self) {
        self.pool.give_back(core::mem::take(&mut self.data));
    }
}

impl fmt::Debug for PooledBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBlock")
            .field("len", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::BufferPool;

    #[test]
    fn rent_rounds_to_power_of_two() {
        static POOL: BufferPool = BufferPool::new(1);

        let block = POOL.rent(65_537);
        assert_eq!(block.len(), 131_072);
        assert!(block.iter().all(|&b| b == 0));
    }

    #[test]
    fn returned_blocks_are_reused_and_zeroed() {
        static POOL: BufferPool = BufferPool::new(1);

        let mut block = POOL.rent(1024);
        block[0] = 0xAA;
        drop(block);
        assert_eq!(POOL.idle_blocks(), 1);

        let block = POOL.rent(1000);
        assert_eq!(POOL.idle_blocks(), 0);
        assert_eq!(block[0], 0);
    }

    #[test]
    fn surplus_blocks_are_freed() {
        static POOL: BufferPool = BufferPool::new(1);

        let a = POOL.rent(4096);
        let b = POOL.rent(4096);
        drop(a);
        drop(b);
        assert_eq!(POOL.idle_blocks(), 1);

        POOL.clear();
        assert_eq!(POOL.idle_blocks(), 0);
    }
}
