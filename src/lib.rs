//! Self-describing binary value trees.
//!
//! A tree of typed values (scalars, vectors, blobs, collections, documents,
//! key material, and transform-wrapped sub-trees) is written as a sequence of
//! generic records.  Each record starts with a 16-bit discriminator that a
//! [`Registry`] maps to the value's concrete type, so data can be read back
//! without an external schema.
//!
//! ```
//! use sigils::{codec::BufferCodec, structured::Document, Element, Registry, Value};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(Registry::with_builtins());
//! let mut doc = Document::new();
//! doc.put("answer", 42i32).unwrap();
//!
//! let value = Value::from(Element::Doc(doc));
//! let bytes = BufferCodec::encode(&value, &registry).unwrap();
//! assert_eq!(bytes.len(), value.total_size());
//! assert_eq!(BufferCodec::decode(bytes, &registry).unwrap(), value);
//! ```

/// Internal Macros
#[macro_use]
mod macros;

pub mod basic;
mod builder;
pub mod codec;
pub mod collections;
pub mod crypto;
mod error;
pub mod misc;
mod registry;
pub mod structured;
pub mod transform;
mod util;
mod value;

pub use self::{builder::*, error::*, registry::*, value::*};
