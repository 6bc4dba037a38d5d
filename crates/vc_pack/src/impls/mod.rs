//! [`Pack`](crate::Pack) implementations of standard types.
//!
//! | Types | Layout |
//! |-------|--------|
//! | `u16`..`u64`, `usize` | varint |
//! | `i16`..`i64`, `isize` | zig-zag varint |
//! | `u8`, `i8`, `f32`, `f64`, `u128`, `i128` | little-endian bytes |
//! | `bool` | `0` or `1` |
//! | `char` | varint scalar value |
//! | `String`, [`Utf16String`] | string header, UTF-8 bytes |
//! | `Vec`, `VecDeque`, sets | map header count, items |
//! | `[T; N]`, tuples | items only |
//! | `HashMap`, `BTreeMap` | map header count, key/value pairs |
//! | [`Grouping`] | key, then values as a `Vec` |
//! | `Option<T>` | null form of `T`, see [`NullForm`](crate::NullForm) |
//! | `Box<T>`, `RefCell<T>` | as `T` |
//! | `Rc<T>`, `Arc<T>` | first occurrence, then back-references |
//!
//! Sequences of fixed-width scalars are copied as one little-endian run,
//! `Vec<u8>` as raw bytes and `Vec<char>` as UTF-8.

// -----------------------------------------------------------------------------
// Modules

mod map;
mod pointer;
mod scalar;
mod sequence;
mod string;

// -----------------------------------------------------------------------------
// Exports

pub use map::Grouping;
pub use string::Utf16String;
