//! Facade crate of the `vc_binary` workspace.
//!
//! Re-exports the binary packing engine so downstream crates only need one
//! dependency. Derived code resolves `::vc_binary::pack` automatically when
//! this crate is used instead of `vc_pack` directly.
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use vc_pack as pack;
