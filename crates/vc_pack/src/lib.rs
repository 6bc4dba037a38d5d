//! A compact, self-describing binary packing engine.
//!
//! Values are converted to and from a binary wire format without a separate
//! schema step. The type itself describes how it is packed, through the
//! [`Pack`] trait, usually implemented by `#[derive(Pack)]`.
//!
//! - [`varint`]: zig-zag variable-length integers.
//! - [`buffer`]: the growable byte region, with pooled or fixed storage.
//! - [`header`]: sequence/object length headers and string headers.
//! - [`registry`]: the runtime dispatch table and type descriptors.
//! - [`Packer`]: the engine walking object graphs, with shared reference
//!   tracking and length-frame backpatching.
//! - [`codec`]: the bridge to alternate backing codecs such as JSON.
//!
//! # Examples
//!
//! ```
//! use vc_pack::{Pack, Packer};
//!
//! #[derive(Pack, Debug, PartialEq)]
//! struct Product {
//!     name: String,
//!     price: f64,
//! }
//!
//! let mut packer = Packer::new();
//! packer.serialize(&Product { name: "PC".into(), price: 450.0 }).unwrap();
//!
//! packer.set_position(0).unwrap();
//! let product: Product = packer.deserialize().unwrap();
//! assert_eq!(product.name, "PC");
//! assert_eq!(product.price, 450.0);
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// Extern Self

// Derived code names this crate through its manifest path,
// so the crate also has to be reachable as `vc_pack` from inside.
extern crate self as vc_pack;

extern crate alloc;
extern crate std;

// -----------------------------------------------------------------------------
// Modules

mod error;
mod hash;
mod options;
mod pack;

pub mod buffer;
pub mod codec;
pub mod header;
pub mod impls;
pub mod packer;
pub mod registry;
pub mod varint;

// -----------------------------------------------------------------------------
// Top-Level exports

#[doc(hidden)]
pub mod __macro_exports;

pub use error::{PackError, PackResult};
pub use options::{DEFAULT_MAX_DEPTH, DEFAULT_POOL_THRESHOLD, MAX_CAPACITY, PackOptions};
pub use pack::{Flat, NullForm, Pack, PackObject, Shape, decode_flat_seq, encode_flat_seq};
pub use packer::Packer;

pub use vc_pack_derive as derive;
pub use vc_pack_derive::Pack;
