use crate::{
  codec::{Decoder, Encoder},
  registry::Registry,
  transform::{pack, unpack},
  util::debug::ShortHexDump,
  CodecErr, FinalSize, Payload, Transform, Value,
};
use std::{
  fmt::{Debug, Formatter},
  hash::{Hash, Hasher},
  mem::size_of,
  sync::Arc,
};

/// The zstd level used by [`Compressed::new()`].
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Largest original size a compressed blob may declare.  Inflating allocates
/// this much up front, so larger claims are rejected as corrupt.
pub const MAX_INFLATED_LEN: usize = 256 * 1024 * 1024;

/// A value stored compressed.
///
/// ```text
/// original_capacity : int32
/// compressed_length : int32
/// compressed_bytes
/// ```
///
/// The compressed bytes are a zstd frame with a content checksum, so damage
/// to them is detected when the value is decoded.  The decoded value is held
/// in memory; equality and hashing are those of the inner value.
#[derive(Clone)]
pub struct Compressed {
  value:    Box<Value>,
  capacity: usize,
  packed:   Vec<u8>,
}

impl Compressed {
  /// Compresses `value` at [`DEFAULT_COMPRESSION_LEVEL`].
  pub fn new(value: impl Into<Value>, registry: &Arc<Registry>) -> Result<Compressed, CodecErr> {
    Compressed::with_level(value, DEFAULT_COMPRESSION_LEVEL, registry)
  }

  /// Compresses `value` at zstd level `level`.
  pub fn with_level(
    value: impl Into<Value>,
    level: i32,
    registry: &Arc<Registry>,
  ) -> Result<Compressed, CodecErr> {
    let value = value.into();
    let raw = pack(&value, registry)?;
    if raw.len() > MAX_INFLATED_LEN {
      return Err(err!(debug, CodecErr::TooLarge(raw.len())));
    }
    let mut compressor =
      zstd::bulk::Compressor::new(level).map_err(|e| err!(debug, CodecErr::from(e)))?;
    compressor
      .include_checksum(true)
      .map_err(|e| err!(debug, CodecErr::from(e)))?;
    let packed = compressor
      .compress(&raw)
      .map_err(|e| err!(debug, CodecErr::from(e)))?;
    log::trace!("Compressed {} bytes to {}", raw.len(), packed.len());

    Ok(Compressed {
      value: Box::new(value),
      capacity: raw.len(),
      packed,
    })
  }

  pub fn value(&self) -> &Value {
    &self.value
  }

  pub fn into_value(self) -> Value {
    *self.value
  }

  /// Size of the inner value's record before compression.
  pub fn original_len(&self) -> usize {
    self.capacity
  }

  /// The compressed bytes, as persisted.
  pub fn compressed(&self) -> &[u8] {
    &self.packed
  }
}

impl Payload for Compressed {
  const FINAL_SIZE: FinalSize = FinalSize::Variable;

  fn byte_size(&self) -> usize {
    2 * size_of::<i32>() + self.packed.len()
  }

  fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
    enc.write_len(self.capacity)?;
    enc.write_blob(&self.packed)
  }

  fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
    let capacity = dec.read_len()?;
    let packed = dec.read_blob()?;
    if capacity > MAX_INFLATED_LEN {
      return Err(err!(debug, CodecErr::TransformFailure(Transform::Inflate)));
    }

    let raw = zstd::bulk::decompress(&packed, capacity).map_err(|e| {
      log::debug!("Inflate failed: {e}");
      err!(debug, CodecErr::TransformFailure(Transform::Inflate))
    })?;
    if raw.len() != capacity {
      return Err(err!(debug, CodecErr::TransformFailure(Transform::Inflate)));
    }
    let value = unpack(raw, dec.registry(), Transform::Inflate, dec.depth())?;

    Ok(Compressed {
      value: Box::new(value),
      capacity,
      packed,
    })
  }

  fn same(&self, other: &Self) -> bool {
    self.value == other.value
  }

  fn hash_into<H: Hasher>(&self, state: &mut H) {
    self.value.hash(state)
  }
}

impl Debug for Compressed {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Compressed")
      .field("value", &self.value)
      .field("original_len", &self.capacity)
      .field("packed", &ShortHexDump(&self.packed, 4))
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    codec::{record::MAX_DEPTH, BufferCodec},
    collections::List,
    util::{builtins, round_trip},
    Element, Tag,
  };

  fn wrap_in_lists(mut element: Element, levels: usize) -> Element {
    for _ in 0..levels {
      element = Element::List(vec![element].into());
    }
    element
  }

  #[test]
  fn compresses_repetitive_values() -> Result<(), CodecErr> {
    let registry = builtins();
    let list: List = (0..500).map(|_| Element::from("all work and no play")).collect();
    let compressed = Compressed::new(Element::List(list.clone()), &registry)?;
    assert!(compressed.compressed().len() < compressed.original_len() / 10);
    assert_eq!(compressed.value(), &Value::Element(Element::List(list)));

    let bytes = round_trip(&Element::Compressed(compressed.clone()).into(), &registry);
    assert_eq!(bytes.len(), 2 + 8 + compressed.byte_size());
    Ok(())
  }

  #[test]
  fn same_input_same_bytes() -> Result<(), CodecErr> {
    let registry = builtins();
    let tag = Tag::new("answer", 42i64)?;
    let a = Compressed::new(tag.clone(), &registry)?;
    let b = Compressed::new(tag, &registry)?;
    assert_eq!(a.compressed(), b.compressed());
    Ok(())
  }

  #[test]
  fn corrupt_payload_fails_to_inflate() -> Result<(), CodecErr> {
    let registry = builtins();
    let compressed = Compressed::new(Element::Int(7), &registry)?;
    let mut bytes =
      BufferCodec::encode(&Element::Compressed(compressed).into(), &registry)?;
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    assert_eq!(
      BufferCodec::decode(bytes, &registry),
      Err(CodecErr::TransformFailure(Transform::Inflate))
    );
    Ok(())
  }

  #[test]
  fn oversized_claims_are_rejected() -> Result<(), CodecErr> {
    let registry = builtins();
    let compressed = Compressed::new(Element::Int(7), &registry)?;
    let mut bytes =
      BufferCodec::encode(&Element::Compressed(compressed).into(), &registry)?;
    // original_capacity follows the discriminator and explicit length.
    bytes[10..14].copy_from_slice(&i32::MAX.to_be_bytes());
    assert_eq!(
      BufferCodec::decode(bytes, &registry),
      Err(CodecErr::TransformFailure(Transform::Inflate))
    );
    Ok(())
  }

  #[test]
  fn inner_records_count_towards_the_depth_limit() -> Result<(), CodecErr> {
    let registry = builtins();
    let compressed =
      Compressed::new(wrap_in_lists(Element::Int(1), MAX_DEPTH / 2), &registry)?;
    let alone = BufferCodec::encode(&Element::Compressed(compressed.clone()).into(), &registry)?;
    assert!(BufferCodec::decode(alone, &registry).is_ok());

    let outer = wrap_in_lists(Element::Compressed(compressed), MAX_DEPTH / 2);
    let bytes = BufferCodec::encode(&outer.into(), &registry)?;
    assert_eq!(
      BufferCodec::decode(bytes, &registry),
      Err(CodecErr::TooDeep { max_depth: MAX_DEPTH })
    );
    Ok(())
  }
}
