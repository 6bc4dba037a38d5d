use alloc::sync::Arc;
use core::fmt;

use crate::buffer::BufferPolicy;
use crate::codec::BackingCodec;
use crate::registry::SharedRegistry;

/// Absolute capacity ceiling of a buffer, in bytes.
pub const MAX_CAPACITY: usize = 0x7FFF_FFC7;

/// Storage at or above this size is rented from the shared pool.
pub const DEFAULT_POOL_THRESHOLD: usize = 64 * 1024;

/// Default nesting limit of objects and shared references.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// The smallest capacity a growing buffer jumps to.
pub(crate) const MIN_GROWTH: usize = 256;

// -----------------------------------------------------------------------------
// PackOptions

/// Configuration of a [`Packer`](crate::Packer).
///
/// # Examples
///
/// ```
/// use vc_pack::{PackError, PackOptions, Packer};
///
/// let options = PackOptions::new()
///     .with_capacity_limit(4)
///     .with_max_depth(16);
/// let mut packer = Packer::with_options(options).unwrap();
///
/// packer.serialize(&7u32).unwrap();
/// let err = packer.serialize(&u64::MAX).unwrap_err();
/// assert!(matches!(err, PackError::CapacityExceeded { limit: 4, .. }));
/// ```
#[derive(Clone)]
pub struct PackOptions {
    pub(crate) max_capacity: usize,
    pub(crate) capacity_limit: Option<usize>,
    pub(crate) pool_threshold: usize,
    pub(crate) max_depth: usize,
    pub(crate) initial_capacity: usize,
    pub(crate) registry: Option<SharedRegistry>,
    pub(crate) codec: Option<Arc<dyn BackingCodec>>,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PackOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackOptions")
            .field("max_capacity", &self.max_capacity)
            .field("capacity_limit", &self.capacity_limit)
            .field("pool_threshold", &self.pool_threshold)
            .field("max_depth", &self.max_depth)
            .field("initial_capacity", &self.initial_capacity)
            .field("custom_registry", &self.registry.is_some())
            .field("codec", &self.codec.as_ref().map(|codec| codec.name()))
            .finish()
    }
}

impl PackOptions {
    /// Default options.
    ///
    /// The `json` feature installs [`JsonCodec`](crate::codec::JsonCodec)
    /// as the backing codec.
    pub fn new() -> Self {
        Self {
            max_capacity: MAX_CAPACITY,
            capacity_limit: None,
            pool_threshold: DEFAULT_POOL_THRESHOLD,
            max_depth: DEFAULT_MAX_DEPTH,
            initial_capacity: 0,
            registry: None,
            codec: default_codec(),
        }
    }

    /// Lowers the capacity ceiling, clamped to [`MAX_CAPACITY`].
    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity.min(MAX_CAPACITY);
        self
    }

    /// Sets an additional capacity ceiling, for example a message size cap.
    pub fn with_capacity_limit(mut self, limit: usize) -> Self {
        self.capacity_limit = Some(limit);
        self
    }

    pub fn with_pool_threshold(mut self, threshold: usize) -> Self {
        self.pool_threshold = threshold;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Capacity allocated up front.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Uses `registry` instead of [`SharedRegistry::global`].
    pub fn with_registry(mut self, registry: SharedRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn BackingCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Removes the backing codec.
    pub fn without_codec(mut self) -> Self {
        self.codec = None;
        self
    }

    /// The buffer policy these options describe.
    pub fn buffer_policy(&self) -> BufferPolicy {
        let limit = match self.capacity_limit {
            Some(limit) => limit.min(self.max_capacity),
            None => self.max_capacity,
        };
        BufferPolicy {
            limit,
            pool_threshold: self.pool_threshold,
        }
    }

    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

#[cfg(feature = "json")]
fn default_codec() -> Option<Arc<dyn BackingCodec>> {
    Some(Arc::new(crate::codec::JsonCodec))
}

#[cfg(not(feature = "json"))]
fn default_codec() -> Option<Arc<dyn BackingCodec>> {
    None
}

#[cfg(test)]
mod tests {
    use super::{MAX_CAPACITY, PackOptions};
    use crate::Packer;
    use crate::buffer::SerializerBuffer;
    use crate::registry::{SharedRegistry, Tagged, TypeRegistry};

    #[test]
    fn options_can_be_handed_to_workers() {
        fn assert_send_sync<T: Send + Sync>(_: &T) {}

        let registry = SharedRegistry::new(TypeRegistry::empty());
        let options = PackOptions::new().with_registry(registry.clone());
        assert_send_sync(&options);

        let worker = std::thread::spawn(move || {
            let mut packer = Packer::with_options(options).unwrap();
            packer.serialize(&Tagged::new(3u16)).unwrap();
            packer.get_buffer().to_vec()
        });
        let bytes = worker.join().unwrap();
        assert!(registry.read().get_with_name("u16").is_some());

        let options = PackOptions::new().with_registry(registry);
        let mut packer = Packer::with_options(options).unwrap();
        packer.set_buffer(SerializerBuffer::from_vec(bytes));
        let tagged = packer.deserialize::<Tagged>().unwrap();
        assert_eq!(tagged.downcast_ref::<u16>(), Some(&3));
    }

    #[test]
    fn limits_combine_to_smallest() {
        let options = PackOptions::new();
        assert_eq!(options.buffer_policy().limit, MAX_CAPACITY);

        let options = PackOptions::new()
            .with_max_capacity(usize::MAX)
            .with_capacity_limit(1024);
        assert_eq!(options.buffer_policy().limit, 1024);

        let options = PackOptions::new()
            .with_max_capacity(512)
            .with_capacity_limit(1024);
        assert_eq!(options.buffer_policy().limit, 512);
    }
}
