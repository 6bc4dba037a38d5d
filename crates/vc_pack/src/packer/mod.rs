//! The engine walking values into and out of a buffer.
//!
//! A [`Packer`] owns a [`SerializerBuffer`] and the per-call state of an
//! object walk:
//!
//! - the stack of open length frames, whose headers are backpatched when
//!   the framed payload is complete;
//! - the identity table of shared references (`Rc`, `Arc`), so that an
//!   instance reached twice is written once and referenced by ordinal
//!   afterwards;
//! - the nesting depth.
//!
//! This state lives for exactly one root call (`serialize`, `deserialize`
//! and their variants). A failed root call restores the cursor and length
//! it started with, so the packer stays usable.
//!
//! A packer is not meant to be shared between threads; use one per thread.

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use core::fmt;

use crate::buffer::SerializerBuffer;
use crate::codec::BackingCodec;
use crate::header::{self, MapHeader, Splice, StringHeader};
use crate::registry::{DispatchEntry, SharedRegistry};
use crate::{NullForm, Pack, PackError, PackObject, PackOptions, PackResult};

// -----------------------------------------------------------------------------
// Modules

mod frame;
mod refs;

// -----------------------------------------------------------------------------
// Exports

use frame::{FrameStack, LengthFrame};
use refs::RefTable;

pub use refs::RefSlot;

// -----------------------------------------------------------------------------
// Packer

/// The binary packing engine.
///
/// A packer is `!Send`: while decoding it holds the `Rc` instances of the
/// current root call for back-references. For parallel work, move the
/// `Send + Sync` parts ([`PackOptions`], [`SharedRegistry`], the bytes)
/// to each worker and build one packer there with
/// [`with_options`](Self::with_options).
///
/// # Examples
///
/// ```
/// use vc_pack::Packer;
///
/// let mut packer = Packer::new();
/// packer.serialize(&true).unwrap();
/// packer.serialize(&false).unwrap();
/// assert_eq!(packer.length(), 2);
///
/// packer.set_position(0).unwrap();
/// assert!(packer.deserialize::<bool>().unwrap());
/// assert!(!packer.deserialize::<bool>().unwrap());
/// ```
pub struct Packer {
    buffer: SerializerBuffer,
    raw: bool,
    roots: usize,
    depth: usize,
    max_depth: usize,
    unwound: usize,
    frames: FrameStack,
    refs: RefTable,
    registry: SharedRegistry,
    codec: Option<Arc<dyn BackingCodec>>,
    #[cfg(all(debug_assertions, feature = "debug"))]
    path: Vec<&'static str>,
}

impl Default for Packer {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Packer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packer")
            .field("buffer", &self.buffer)
            .field("raw", &self.raw)
            .field("max_depth", &self.max_depth)
            .field("codec", &self.codec.as_ref().map(|codec| codec.name()))
            .finish_non_exhaustive()
    }
}

impl Packer {
    /// Creates a packer with default options over an empty buffer.
    pub fn new() -> Self {
        Self::from_parts(SerializerBuffer::new(), PackOptions::new())
    }

    /// Creates a packer over an empty buffer configured by `options`.
    ///
    /// Fails if the initial capacity exceeds the configured limit.
    pub fn with_options(options: PackOptions) -> PackResult<Self> {
        let buffer = SerializerBuffer::with_policy(options.buffer_policy(), options.initial_capacity)?;
        Ok(Self::from_parts(buffer, options))
    }

    /// Creates a packer reading and writing `buffer`.
    pub fn with_buffer(buffer: SerializerBuffer) -> Self {
        Self::from_parts(buffer, PackOptions::new())
    }

    /// Creates a packer decoding `bytes`.
    #[inline]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::with_buffer(SerializerBuffer::from_vec(bytes))
    }

    fn from_parts(buffer: SerializerBuffer, options: PackOptions) -> Self {
        Self {
            buffer,
            raw: false,
            roots: 0,
            depth: 0,
            max_depth: options.max_depth,
            unwound: 0,
            frames: FrameStack::default(),
            refs: RefTable::default(),
            registry: options
                .registry
                .unwrap_or_else(|| SharedRegistry::global().clone()),
            codec: options.codec,
            #[cfg(all(debug_assertions, feature = "debug"))]
            path: Vec::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Root calls

    /// Writes `value` at the cursor.
    pub fn serialize<T: Pack>(&mut self, value: &T) -> PackResult<()> {
        self.registry.ensure::<T>();
        self.root(false, |p| value.encode(p))
    }

    /// Writes `value` without any null or length header.
    ///
    /// Objects are not framed, shared references are written inline and
    /// sequences carry no count. Raw data can only be read back by
    /// [`deserialize_raw`](Self::deserialize_raw) with the same type, and a
    /// raw sequence extends to the end of the data.
    pub fn serialize_raw<T: Pack>(&mut self, value: &T) -> PackResult<()> {
        self.registry.ensure::<T>();
        self.root(true, |p| value.encode(p))
    }

    /// Reads a `T` at the cursor.
    pub fn deserialize<T: Pack>(&mut self) -> PackResult<T> {
        self.registry.ensure::<T>();
        self.root(false, T::decode)
    }

    /// Reads a `T` written by [`serialize_raw`](Self::serialize_raw).
    pub fn deserialize_raw<T: Pack>(&mut self) -> PackResult<T> {
        self.registry.ensure::<T>();
        self.root(true, T::decode)
    }

    /// Writes a value whose concrete type is only known at runtime.
    ///
    /// The type must be registered in this packer's registry.
    pub fn serialize_dyn(&mut self, value: &dyn Any) -> PackResult<()> {
        let entry = self.entry_by_id(value.type_id())?;
        self.root(false, |p| (entry.encode)(value, p))
    }

    /// Reads a value of the registered type `type_id`.
    pub fn deserialize_dyn(&mut self, type_id: TypeId) -> PackResult<Box<dyn Any>> {
        let entry = self.entry_by_id(type_id)?;
        self.root(false, |p| (entry.decode)(p))
    }

    fn entry_by_id(&self, type_id: TypeId) -> PackResult<DispatchEntry> {
        self.registry
            .read()
            .get(type_id)
            .copied()
            .ok_or_else(|| PackError::UnregisteredType {
                type_name: format!("{type_id:?}").into(),
            })
    }

    fn root<R>(&mut self, raw: bool, f: impl FnOnce(&mut Self) -> PackResult<R>) -> PackResult<R> {
        let outer_raw = core::mem::replace(&mut self.raw, raw);

        if self.roots > 0 {
            self.roots += 1;
            let result = f(self);
            self.roots -= 1;
            self.raw = outer_raw;
            return result;
        }

        let position = self.buffer.position();
        let length = self.buffer.length();

        self.roots = 1;
        let result = f(self);
        self.roots = 0;
        self.raw = outer_raw;

        let unwound = core::mem::take(&mut self.unwound);
        self.reset_walk_state();

        if let Err(err) = &result {
            self.buffer.rewind(position, length);
            if unwound > 0 {
                log::warn!(
                    "root call failed, unwound {unwound} length frame(s) and restored position {position}: {err}"
                );
            } else {
                log::debug!("root call failed, restored position {position}: {err}");
            }
        }
        result
    }

    fn reset_walk_state(&mut self) {
        self.frames.clear();
        self.refs.clear();
        self.depth = 0;
        #[cfg(all(debug_assertions, feature = "debug"))]
        self.path.clear();
    }

    // -------------------------------------------------------------------------
    // Buffer access

    #[inline]
    pub fn position(&self) -> usize {
        self.buffer.position()
    }

    #[inline]
    pub fn set_position(&mut self, position: usize) -> PackResult<()> {
        self.buffer.set_position(position)
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.buffer.length()
    }

    #[inline]
    pub fn set_length(&mut self, length: usize) -> PackResult<()> {
        self.buffer.set_length(length)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Unread bytes before the logical end.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.remaining()
    }

    /// The written bytes, `[0, length)`.
    #[inline]
    pub fn get_buffer(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Replaces the buffer, returning the previous one.
    pub fn set_buffer(&mut self, buffer: SerializerBuffer) -> SerializerBuffer {
        core::mem::replace(&mut self.buffer, buffer)
    }

    #[inline]
    pub fn buffer(&self) -> &SerializerBuffer {
        &self.buffer
    }

    #[inline]
    pub fn buffer_mut(&mut self) -> &mut SerializerBuffer {
        &mut self.buffer
    }

    #[inline]
    pub fn into_buffer(self) -> SerializerBuffer {
        self.buffer
    }

    /// Returns `true` inside a raw root call.
    #[inline]
    pub fn is_raw(&self) -> bool {
        self.raw
    }

    #[inline]
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    // -------------------------------------------------------------------------
    // Primitives

    #[inline]
    pub fn write_u8(&mut self, value: u8) -> PackResult<()> {
        self.buffer.write_u8(value)
    }

    #[inline]
    pub fn read_u8(&mut self) -> PackResult<u8> {
        self.buffer.read_u8()
    }

    #[inline]
    pub fn peek_u8(&self) -> PackResult<u8> {
        self.buffer.peek_u8()
    }

    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> PackResult<()> {
        self.buffer.write_bytes(bytes)
    }

    #[inline]
    pub fn read_bytes(&mut self, n: usize) -> PackResult<&[u8]> {
        self.buffer.read_bytes(n)
    }

    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> PackResult<[u8; N]> {
        self.buffer.read_array()
    }

    #[inline]
    pub fn write_varint(&mut self, value: u64) -> PackResult<()> {
        self.buffer.write_varint(value)
    }

    #[inline]
    pub fn read_varint(&mut self) -> PackResult<u64> {
        self.buffer.read_varint()
    }

    #[inline]
    pub fn read_varint_u32(&mut self) -> PackResult<u32> {
        self.buffer.read_varint_u32()
    }

    #[inline]
    pub fn write_zigzag(&mut self, value: i64) -> PackResult<()> {
        self.buffer.write_zigzag(value)
    }

    #[inline]
    pub fn read_zigzag(&mut self) -> PackResult<i64> {
        self.buffer.read_zigzag()
    }

    // -------------------------------------------------------------------------
    // Headers

    #[inline]
    pub fn write_map_header(&mut self, header: MapHeader) -> PackResult<()> {
        header::write_map_header(&mut self.buffer, header)
    }

    #[inline]
    pub fn read_map_header(&mut self) -> PackResult<MapHeader> {
        header::read_map_header(&mut self.buffer)
    }

    /// Inspects the upcoming map header without consuming it.
    #[inline]
    pub fn peek_map_header(&self) -> PackResult<MapHeader> {
        header::peek_map_header(&self.buffer)
    }

    #[inline]
    pub fn write_string_header(&mut self, header: StringHeader) -> PackResult<()> {
        header::write_string_header(&mut self.buffer, header)
    }

    #[inline]
    pub fn read_string_header(&mut self) -> PackResult<StringHeader> {
        header::read_string_header(&mut self.buffer)
    }

    /// Inspects the upcoming string header without consuming it.
    #[inline]
    pub fn peek_string_header(&self) -> PackResult<StringHeader> {
        header::peek_string_header(&self.buffer)
    }

    /// Writes a sequence count, omitted in raw mode.
    pub fn write_count(&mut self, count: usize) -> PackResult<()> {
        let limit = self.buffer.policy().limit;
        if count > limit {
            return Err(PackError::CapacityExceeded {
                requested: count,
                limit,
            });
        }
        if self.raw {
            Ok(())
        } else {
            self.write_map_header(MapHeader::Length(count))
        }
    }

    /// Reads a sequence count; `None` in raw mode, where the sequence
    /// extends to the end of the data.
    pub fn read_count(&mut self) -> PackResult<Option<usize>> {
        if self.raw {
            return Ok(None);
        }
        match self.read_map_header()? {
            MapHeader::Length(count) if count > self.buffer.policy().limit => Err(
                PackError::invalid(format!("sequence of {count} elements exceeds the capacity limit")),
            ),
            MapHeader::Length(count) => Ok(Some(count)),
            MapHeader::Null => Err(PackError::invalid("null header where a sequence was expected")),
            MapHeader::Circular(_) => Err(PackError::invalid(
                "back-reference where a sequence was expected",
            )),
        }
    }

    // -------------------------------------------------------------------------
    // Strings

    /// Writes `value` behind a string header, or bare in raw mode.
    pub fn write_str(&mut self, value: &str) -> PackResult<()> {
        if self.raw {
            self.buffer.write_bytes(value.as_bytes())
        } else {
            header::write_str(&mut self.buffer, value)
        }
    }

    /// Reads a string; `None` for a null header.
    pub fn read_string(&mut self) -> PackResult<Option<String>> {
        if self.raw {
            let bytes = self.buffer.read_bytes(self.buffer.remaining())?;
            let text = core::str::from_utf8(bytes)
                .map_err(|_| PackError::invalid("string payload is not valid UTF-8"))?;
            return Ok(Some(text.to_string()));
        }
        header::read_string(&mut self.buffer)
    }

    /// Writes UTF-16 code units as UTF-8, see [`header::write_utf16`].
    pub fn write_utf16(&mut self, units: &[u16]) -> PackResult<()> {
        if self.raw {
            for ch in char::decode_utf16(units.iter().copied()) {
                let mut utf8 = [0u8; 4];
                let ch = ch.unwrap_or(char::REPLACEMENT_CHARACTER);
                self.buffer.write_bytes(ch.encode_utf8(&mut utf8).as_bytes())?;
            }
            return Ok(());
        }
        if let Some(Splice { at, len }) = header::write_utf16(&mut self.buffer, units)? {
            self.frames.shift(at, len);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Length frames

    fn enter(&mut self) -> PackResult<()> {
        if self.depth >= self.max_depth {
            return Err(PackError::DepthLimitExceeded {
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    #[inline]
    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Runs `f` inside a length frame.
    ///
    /// A one byte placeholder header is written first. When `f` returns,
    /// the real payload length is written back, splicing in extra header
    /// bytes if the length no longer fits inline. In raw mode `f` runs
    /// without a frame.
    pub fn encode_framed<R>(&mut self, f: impl FnOnce(&mut Self) -> PackResult<R>) -> PackResult<R> {
        if self.raw {
            return f(self);
        }

        let header_at = self.buffer.position();
        self.buffer.write_u8(header::EMPTY_MAP)?;
        self.frames.push(LengthFrame {
            header_at,
            reserved: 1,
        });

        match f(self) {
            Ok(value) => {
                self.close_frame()?;
                Ok(value)
            }
            Err(err) => {
                self.frames.pop();
                self.unwound += 1;
                Err(err)
            }
        }
    }

    fn close_frame(&mut self) -> PackResult<()> {
        let frame = self
            .frames
            .pop()
            .ok_or(PackError::invalid("no open length frame"))?;

        let payload_at = frame.payload_at();
        let len = self
            .buffer
            .position()
            .checked_sub(payload_at)
            .ok_or(PackError::invalid("cursor moved before an open length frame"))?;

        let header = MapHeader::Length(len);
        let needed = header::map_header_width(header);
        if needed > frame.reserved {
            let extra = needed - frame.reserved;
            self.buffer.insert_gap(payload_at, extra)?;
            self.frames.shift(payload_at, extra);
            log::trace!(
                "widened length header at {} by {extra} bytes for a {len} byte payload",
                frame.header_at
            );
        }

        let mut out = [0u8; 11];
        let used = header::encode_map_header(header, &mut out);
        self.buffer.write_at(frame.header_at, &out[..used])
    }

    /// Runs `f` over the payload of a length frame.
    ///
    /// Bytes the frame holds beyond what `f` reads are skipped; reading
    /// past the frame fails with `InvalidEncoding`.
    pub fn decode_framed<R>(&mut self, f: impl FnOnce(&mut Self) -> PackResult<R>) -> PackResult<R> {
        if self.raw {
            return f(self);
        }

        match self.read_map_header()? {
            MapHeader::Length(len) => {
                self.buffer.ensure_readable(len)?;
                let end = self.buffer.position() + len;
                let value = f(self)?;

                let at = self.buffer.position();
                if at > end {
                    return Err(PackError::invalid(format!(
                        "payload overran its length frame by {} bytes",
                        at - end
                    )));
                }
                self.buffer.set_position(end)?;
                Ok(value)
            }
            MapHeader::Null => Err(PackError::invalid("null header where a value was expected")),
            MapHeader::Circular(_) => Err(PackError::invalid(
                "back-reference where a value was expected",
            )),
        }
    }

    // -------------------------------------------------------------------------
    // Objects

    /// Writes a derived object: a length frame around its fields.
    pub fn encode_object<T: PackObject>(&mut self, value: &T) -> PackResult<()> {
        self.walk::<T, _>(|p| p.encode_framed(|p| value.encode_fields(p)))
    }

    /// Reads a derived object written by [`encode_object`](Self::encode_object).
    pub fn decode_object<T: PackObject>(&mut self) -> PackResult<T> {
        self.walk::<T, _>(|p| p.decode_framed(T::decode_fields))
    }

    /// Runs one level of an object walk: depth accounting, the debug type
    /// path and wrapping of failures into `DataCorruption`.
    fn walk<T: Pack, R>(&mut self, f: impl FnOnce(&mut Self) -> PackResult<R>) -> PackResult<R> {
        self.enter()?;
        #[cfg(all(debug_assertions, feature = "debug"))]
        self.path.push(T::type_path());

        let result = match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                let trace = self.trace();
                Err(err.corrupted(T::type_path(), trace))
            }
        };

        #[cfg(all(debug_assertions, feature = "debug"))]
        self.path.pop();
        self.leave();
        result
    }

    #[cfg(all(debug_assertions, feature = "debug"))]
    fn trace(&self) -> Box<str> {
        if self.path.is_empty() {
            return Box::from("");
        }
        format!(" (path: {})", self.path.join(" -> ")).into_boxed_str()
    }

    #[cfg(not(all(debug_assertions, feature = "debug")))]
    #[inline]
    fn trace(&self) -> Box<str> {
        Box::from("")
    }

    // -------------------------------------------------------------------------
    // Shared references

    /// Writes the instance behind `value`, or a back-reference if this
    /// allocation was already written in the current root call.
    pub fn encode_rc<T: Pack>(&mut self, value: &Rc<T>) -> PackResult<()> {
        self.encode_shared(Rc::as_ptr(value).addr(), &**value)
    }

    /// Arc counterpart of [`encode_rc`](Self::encode_rc).
    pub fn encode_arc<T: Pack>(&mut self, value: &Arc<T>) -> PackResult<()> {
        self.encode_shared(Arc::as_ptr(value).addr(), &**value)
    }

    fn encode_shared<T: Pack>(&mut self, addr: usize, value: &T) -> PackResult<()> {
        if self.raw {
            return value.encode(self);
        }
        if let Some(index) = self.refs.visit(addr)? {
            return self.write_map_header(MapHeader::Circular(index));
        }

        self.enter()?;
        let result = if Self::frames_shared::<T>() {
            self.encode_framed(|p| value.encode(p))
        } else {
            value.encode(self)
        };
        self.leave();
        result
    }

    /// Payloads that may not start with a length or null map header are
    /// framed, so that their first byte is never taken for a back-reference.
    #[inline]
    const fn frames_shared<T: Pack>() -> bool {
        T::SHARED || !matches!(T::NULL_FORM, NullForm::Map)
    }

    /// Reads the payload of a shared instance's first occurrence.
    pub fn decode_shared<T: Pack>(&mut self) -> PackResult<T> {
        if !self.raw && Self::frames_shared::<T>() {
            self.decode_framed(T::decode)
        } else {
            T::decode(self)
        }
    }

    fn take_back_reference(&mut self) -> PackResult<Option<u32>> {
        if self.raw || self.buffer.peek_u8()? != header::CIRCULAR_MAP {
            return Ok(None);
        }
        match self.read_map_header()? {
            MapHeader::Circular(index) => Ok(Some(index)),
            _ => Err(PackError::invalid("malformed back-reference")),
        }
    }

    /// Reads an `Rc<T>`, resolving back-references to the instance
    /// materialized earlier in the same root call.
    pub fn decode_rc<T: Pack>(&mut self) -> PackResult<Rc<T>> {
        if self.raw {
            return T::decode(self).map(Rc::new);
        }
        if let Some(index) = self.take_back_reference()? {
            return self.refs.resolve::<Rc<T>>(index);
        }

        self.enter()?;
        let slot = self.refs.reserve();
        let result = T::decode_rc(self, slot);
        self.leave();
        result
    }

    /// Arc counterpart of [`decode_rc`](Self::decode_rc).
    pub fn decode_arc<T: Pack>(&mut self) -> PackResult<Arc<T>> {
        if self.raw {
            return T::decode(self).map(Arc::new);
        }
        if let Some(index) = self.take_back_reference()? {
            return self.refs.resolve::<Arc<T>>(index);
        }

        self.enter()?;
        let slot = self.refs.reserve();
        let result = self.decode_shared::<T>().map(|value| {
            let value = Arc::new(value);
            self.refs.bind(slot, Box::new(Arc::clone(&value)));
            value
        });
        self.leave();
        result
    }

    /// Makes `value` the target of back-references to `slot`.
    pub fn bind_ref<P: Any>(&mut self, slot: RefSlot, value: P) {
        self.refs.bind(slot, Box::new(value));
    }

    // -------------------------------------------------------------------------
    // Backing codec

    /// The configured backing codec, if any.
    pub fn codec(&self) -> Option<&Arc<dyn BackingCodec>> {
        self.codec.as_ref()
    }

    pub fn set_codec(&mut self, codec: Option<Arc<dyn BackingCodec>>) {
        self.codec = codec;
    }

    fn require_codec(&self) -> PackResult<Arc<dyn BackingCodec>> {
        self.codec.clone().ok_or_else(|| PackError::Codec {
            codec: "none",
            message: "no backing codec configured".to_string(),
        })
    }

    /// Writes `value` with the backing codec, sharing this buffer and cursor.
    ///
    /// Usable as a root call or from inside a [`Pack`] impl.
    pub fn serialize_with_codec<T: serde_core::Serialize>(&mut self, value: &T) -> PackResult<()> {
        let codec = self.require_codec()?;
        self.root(false, |p| codec.encode(&mut p.buffer, value))
    }

    /// Reads a value written by [`serialize_with_codec`](Self::serialize_with_codec).
    pub fn deserialize_with_codec<T: serde_core::de::DeserializeOwned>(&mut self) -> PackResult<T> {
        let codec = self.require_codec()?;
        let name = codec.name();
        self.root(false, |p| {
            let mut out = None;
            codec.decode(&mut p.buffer, &mut |de| {
                let value = erased_serde::deserialize::<T>(de).map_err(|err| PackError::Codec {
                    codec: name,
                    message: err.to_string(),
                })?;
                out = Some(value);
                Ok(())
            })?;
            out.ok_or_else(|| PackError::Codec {
                codec: name,
                message: "codec produced no value".to_string(),
            })
        })
    }
}
