//! Variants that hold another value in transformed form.
//!
//! Every transform packs its inner value the same way: the complete generic
//! record of the value (discriminator, name, explicit length and payload) is
//! written into a buffer of exactly [`Value::total_size()`] bytes, and those
//! bytes are then compressed or encrypted.  Unpacking inverts the transform
//! and reads the record back, so the inner value's type survives without any
//! outside hint.
//!
//! Packing happens when the transform value is constructed.  Only the packed
//! bytes are persisted, which keeps `byte_size()` exact and infallible.

mod cipher;
mod compression;
mod encryption;

pub use self::{cipher::*, compression::*, encryption::*};

use crate::{
  codec::{BufferCodec, Decoder}, registry::Registry, util::LogErr, CodecErr, Transform,
  Value,
};
use log::Level;
use std::sync::Arc;

/// Writes the generic record of `value` into an exactly sized buffer.
pub(crate) fn pack(value: &Value, registry: &Arc<Registry>) -> Result<Vec<u8>, CodecErr> {
  BufferCodec::encode(value, registry)
}

/// Reads back the one record held in `bytes`, continuing from nesting level
/// `depth` of the enclosing decode.
///
/// Any failure other than [`CodecErr::TooDeep`], including trailing bytes, is
/// reported as a failure of `transform`.
pub(crate) fn unpack(
  bytes: Vec<u8>,
  registry: &Arc<Registry>,
  transform: Transform,
  depth: usize,
) -> Result<Value, CodecErr> {
  let mut buffer = BufferCodec::from_bytes(bytes, Arc::clone(registry));
  buffer.set_depth(depth);
  buffer
    .decode_whole()
    .log_err(Level::Debug)
    .map_err(|e| match e {
      CodecErr::TooDeep { .. } => e,
      _ => err!(debug, CodecErr::TransformFailure(transform)),
    })
}
