//! Element-keyed maps with self-delimiting entries.
//!
//! ```text
//! count           : int32
//! per entry:
//!   entry_length  : int64   (bytes after this field, for this entry)
//!   key_disc      : int16
//!   value_disc    : int16   (0 = absent value)
//!   key_payload
//!   value_payload (only if value_disc != 0)
//! ```
//!
//! An entry whose key or value discriminator is unknown to the decoding
//! registry is skipped using `entry_length`, and decoding continues with the
//! next entry.

use crate::{
  builder::Builder,
  codec::{record, Decoder, Encoder},
  collections::{unordered_hash, MAX_PREALLOC},
  registry::{VariantType, NULL_DISCRIMINATOR},
  CodecErr, Element, FinalSize, Payload,
};
use std::{
  collections::HashMap,
  fmt::{Debug, Formatter},
  hash::{Hash, Hasher},
  mem::size_of,
  sync::Arc,
};

/// Bytes of an entry's two discriminators.
const ENTRY_DISCRIMINATORS_LEN: usize = 2 * size_of::<u16>();

/// A mapping from element keys to optional element values.
///
/// Keys are unique by element equality.  Iteration follows insertion order;
/// equality and hashing do not depend on it.
#[derive(Clone, Default)]
pub struct Map {
  entries: Vec<(Element, Option<Element>)>,
  index:   HashMap<Element, usize>,
}

impl Map {
  pub fn new() -> Map {
    Map::default()
  }

  /// Binds `key` to `value`, returning the previous binding if there was one.
  pub fn insert(
    &mut self,
    key: impl Into<Element>,
    value: Option<Element>,
  ) -> Option<Option<Element>> {
    let key = key.into();
    match self.position(&key) {
      Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
      None => {
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
      },
    }
  }

  /// The binding for `key`: `None` if absent, `Some(None)` if bound to no
  /// value.
  pub fn get(&self, key: &Element) -> Option<Option<&Element>> {
    self.position(key).map(|index| self.entries[index].1.as_ref())
  }

  pub fn get_mut(&mut self, key: &Element) -> Option<&mut Option<Element>> {
    let index = self.position(key)?;
    Some(&mut self.entries[index].1)
  }

  pub fn contains_key(&self, key: &Element) -> bool {
    self.position(key).is_some()
  }

  pub fn remove(&mut self, key: &Element) -> Option<Option<Element>> {
    let i = self.index.remove(key)?;
    let (_, value) = self.entries.remove(i);
    for slot in self.index.values_mut() {
      if *slot > i {
        *slot -= 1;
      }
    }
    Some(value)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&Element, Option<&Element>)> {
    self.entries.iter().map(|(k, v)| (k, v.as_ref()))
  }

  pub fn keys(&self) -> impl Iterator<Item = &Element> {
    self.entries.iter().map(|(k, _)| k)
  }

  fn position(&self, key: &Element) -> Option<usize> {
    self.index.get(key).copied()
  }
}

fn entry_len(key: &Element, value: Option<&Element>) -> usize {
  ENTRY_DISCRIMINATORS_LEN + key.byte_size() + value.map_or(0, Element::byte_size)
}

fn code_for<E: Encoder + ?Sized>(enc: &E, element: &Element) -> Result<u16, CodecErr> {
  let variant = VariantType::element(element.kind());
  match enc.registry().discriminator_of(variant) {
    NULL_DISCRIMINATOR => Err(err!(debug, CodecErr::NoMatchingDiscriminator(variant))),
    code => Ok(code),
  }
}

/// The builder for an entry member, or `None` if `code` cannot be decoded
/// here (unregistered, or registered for a tag shape).
fn member_builder(dec: &dyn Decoder, code: u16) -> Option<Arc<dyn Builder>> {
  let registry = dec.registry();
  if !registry.contains_code(code) {
    return None;
  }
  registry.builder_for(code).ok().filter(|builder| !builder.is_named())
}

fn build_member(builder: &dyn Builder, dec: &mut dyn Decoder) -> Result<Element, CodecErr> {
  match record::nested(dec, |dec| builder.build(None, dec))? {
    crate::Value::Element(element) => Ok(element),
    crate::Value::Tag(_) => Err(err!(debug, CodecErr::UnexpectedTag)),
  }
}

impl PartialEq for Map {
  fn eq(&self, other: &Self) -> bool {
    self.entries.len() == other.entries.len()
      && self.iter().all(|(k, v)| other.get(k) == Some(v))
  }
}

impl Eq for Map {}

impl Hash for Map {
  fn hash<H: Hasher>(&self, state: &mut H) {
    unordered_hash(self.entries.iter(), state)
  }
}

impl Debug for Map {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_map().entries(self.iter()).finish()
  }
}

impl FromIterator<(Element, Option<Element>)> for Map {
  fn from_iter<T: IntoIterator<Item = (Element, Option<Element>)>>(iter: T) -> Self {
    let mut map = Map::new();
    for (k, v) in iter {
      map.insert(k, v);
    }
    map
  }
}

impl Payload for Map {
  const FINAL_SIZE: FinalSize = FinalSize::Variable;

  fn byte_size(&self) -> usize {
    size_of::<i32>()
      + self
        .iter()
        .map(|(k, v)| size_of::<i64>() + entry_len(k, v))
        .sum::<usize>()
  }

  fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
    enc.write_len(self.entries.len())?;
    for (key, value) in self.iter() {
      let key_code = code_for(enc, key)?;
      let value_code = match value {
        Some(value) => code_for(enc, value)?,
        None => NULL_DISCRIMINATOR,
      };
      let len = entry_len(key, value);
      enc.write_i64(i64::try_from(len).map_err(|_| err!(debug, CodecErr::TooLarge(len)))?)?;
      enc.write_u16(key_code)?;
      enc.write_u16(value_code)?;
      key.serialize(enc)?;
      if let Some(value) = value {
        value.serialize(enc)?;
      }
    }
    Ok(())
  }

  fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
    let count = dec.read_len()?;
    let capacity = count.min(MAX_PREALLOC);
    let mut map = Map {
      entries: Vec::with_capacity(capacity),
      index:   HashMap::with_capacity(capacity),
    };
    for _ in 0..count {
      let declared = dec.read_i64()?;
      let declared = u64::try_from(declared)
        .map_err(|_| err!(debug, CodecErr::NegativeLength(declared)))?;
      let start = dec.bytes_read();
      let key_code = dec.read_u16()?;
      let value_code = dec.read_u16()?;

      let key_builder = member_builder(dec, key_code);
      let value_builder = match value_code {
        NULL_DISCRIMINATOR => Some(None),
        code => member_builder(dec, code).map(Some),
      };
      let (key_builder, value_builder) = match (key_builder, value_builder) {
        (Some(k), Some(v)) => (k, v),
        _ => {
          log::warn!(
            "Skipping map entry with unknown discriminator (key {key_code}, value \
             {value_code})"
          );
          let rest = declared
            .checked_sub(ENTRY_DISCRIMINATORS_LEN as u64)
            .ok_or_else(|| {
              err!(
                debug,
                CodecErr::LengthMismatch {
                  declared,
                  consumed: ENTRY_DISCRIMINATORS_LEN as u64,
                }
              )
            })?;
          dec.skip(rest)?;
          continue;
        },
      };

      let key = build_member(key_builder.as_ref(), dec)?;
      let value = match value_builder {
        Some(builder) => Some(build_member(builder.as_ref(), dec)?),
        None => None,
      };
      let consumed = dec.bytes_read() - start;
      if consumed != declared {
        return Err(err!(debug, CodecErr::LengthMismatch { declared, consumed }));
      }
      map.insert(key, value);
    }
    Ok(map)
  }

  identity_by_eq!();
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    codec::{BufferCodec, StreamReader, StreamWriter},
    registry::Registry,
    util::{builtins, init_test_logger, round_trip},
    Kind,
  };
  use uuid::Uuid;

  fn sample() -> Map {
    let mut map = Map::new();
    map.insert(1i32, Some(Element::from("one")));
    map.insert(Uuid::from_u128(7), Some(Element::Long(-7)));
    map.insert("absent", None);
    map
  }

  #[test]
  fn map_round_trip() {
    let registry = builtins();
    round_trip(&Element::Map(sample()).into(), &registry);
  }

  #[test]
  fn bindings() {
    let mut map = sample();
    assert_eq!(map.get(&Element::from("absent")), Some(None));
    assert_eq!(map.get(&Element::Int(2)), None);
    assert_eq!(
      map.insert(1i32, Some(Element::Bool(true))),
      Some(Some(Element::from("one")))
    );
    assert_eq!(map.len(), 3);
    assert_eq!(map.remove(&Element::Int(1)), Some(Some(Element::Bool(true))));
    assert!(!map.contains_key(&Element::Int(1)));
  }

  #[test]
  fn unknown_entry_is_skipped() {
    init_test_logger();
    let writer_registry = builtins();
    let mut writer = StreamWriter::new(Vec::new(), Arc::clone(&writer_registry));
    writer.write_element(&Element::Map(sample())).unwrap();
    writer.write_element(&Element::Int(0x5E17)).unwrap();
    let bytes = writer.into_inner();

    let mut reader_registry = Registry::with_builtins();
    reader_registry.unregister(VariantType::element(Kind::Uuid));
    let reader_registry = Arc::new(reader_registry);

    let mut reader = StreamReader::new(&bytes[..], Arc::clone(&reader_registry));
    let map = match reader.read_element().unwrap() {
      Some(Element::Map(map)) => map,
      other => panic!("{other:?}"),
    };
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&Element::Int(1)), Some(Some(&Element::from("one"))));
    assert_eq!(map.get(&Element::from("absent")), Some(None));
    assert_eq!(reader.read_element().unwrap(), Some(Element::Int(0x5E17)));

    let mut buffer = BufferCodec::from_bytes(bytes, reader_registry);
    assert!(matches!(buffer.read_element(), Ok(Some(Element::Map(_)))));
    assert_eq!(buffer.read_element().unwrap(), Some(Element::Int(0x5E17)));
    assert_eq!(buffer.remaining(), 0);
  }

  #[test]
  fn unregistered_key_cannot_be_written() {
    let mut registry = Registry::with_builtins();
    registry.unregister(VariantType::element(Kind::Uuid));
    let element = Element::Map(sample());
    let mut buf = BufferCodec::new(element.byte_size() + 10, Arc::new(registry));
    assert_eq!(
      buf.write_element(&element),
      Err(CodecErr::NoMatchingDiscriminator(VariantType::element(Kind::Uuid)))
    );
  }

  #[test]
  fn removal_keeps_lookups_consistent() {
    let mut map: Map = (0..5)
      .map(|i| (Element::Int(i), Some(Element::Long(i.into()))))
      .collect();
    assert_eq!(map.remove(&Element::Int(1)), Some(Some(Element::Long(1))));
    assert_eq!(map.get(&Element::Int(4)), Some(Some(&Element::Long(4))));
    assert_eq!(map.insert(4i32, None), Some(Some(Element::Long(4))));
    assert_eq!(map.insert(9i32, None), None);
    let keys: Vec<_> = map.keys().filter_map(Element::as_i64).collect();
    assert_eq!(keys, vec![0, 2, 3, 4, 9]);
  }

  #[test]
  fn large_map_decodes() -> Result<(), CodecErr> {
    let registry = builtins();
    let count = 50_000;
    let map: Map = (0..count)
      .map(|i| (Element::Int(i), Some(Element::from(i.to_string()))))
      .collect();
    let bytes = BufferCodec::encode(&Element::Map(map.clone()).into(), &registry)?;
    let decoded = match BufferCodec::decode(bytes, &registry)? {
      crate::Value::Element(Element::Map(decoded)) => decoded,
      other => panic!("{other:?}"),
    };
    assert_eq!(decoded.len(), count as usize);
    assert_eq!(
      decoded.get(&Element::Int(count - 1)),
      Some(Some(&Element::from((count - 1).to_string())))
    );
    assert_eq!(decoded, map);
    Ok(())
  }

  #[test]
  fn nested_keys_count_towards_the_depth_limit() -> Result<(), CodecErr> {
    let registry = builtins();
    let mut key = Element::Int(0);
    for _ in 0..record::MAX_DEPTH {
      key = Element::List(vec![key].into());
    }
    let mut map = Map::new();
    map.insert(key, None);
    let bytes = BufferCodec::encode(&Element::Map(map).into(), &registry)?;
    assert_eq!(
      BufferCodec::decode(bytes, &registry),
      Err(CodecErr::TooDeep {
        max_depth: record::MAX_DEPTH,
      })
    );
    Ok(())
  }
}
