//! Documents: name-keyed collections of [`Tag`]s.

use crate::{
  basic::{Mat4f, Quat, Vec2, Vec3, Vec4},
  codec::{Decoder, Encoder},
  collections::{unordered_hash, Array, List, Map, Set, MAX_PREALLOC},
  total_size, CodecErr, Element, FinalSize, Payload, Tag,
};
use std::{
  collections::HashMap,
  fmt::{Debug, Formatter},
  hash::{Hash, Hasher},
  mem::size_of,
};
use uuid::Uuid;

/// A mapping from unique names to tags.
///
/// Insertion under an existing name replaces that entry in place, so
/// iteration (and the encoded order) follows first insertion.  Equality and
/// hashing ignore order.
///
/// ```
/// use sigils::structured::Document;
///
/// let mut doc = Document::new();
/// doc.put("count", 42i32).unwrap();
/// doc.put("label", "x").unwrap();
/// assert_eq!(doc.extract_int("count"), Some(42));
/// assert_eq!(doc.extract_long("count"), Some(42));
/// assert_eq!(doc.extract_string("label"), Some("x"));
/// assert_eq!(doc.get_value("missing"), None);
/// ```
#[derive(Clone, Default)]
pub struct Document {
  tags:  Vec<Tag>,
  index: HashMap<String, usize>,
}

impl Document {
  pub fn new() -> Document {
    Document::default()
  }

  pub fn len(&self) -> usize {
    self.tags.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tags.is_empty()
  }

  /// Adds `tag`, returning the tag it replaced.
  pub fn insert(&mut self, tag: Tag) -> Option<Tag> {
    match self.index.get(tag.name()) {
      Some(&i) => Some(std::mem::replace(&mut self.tags[i], tag)),
      None => {
        self.index.insert(tag.name().to_owned(), self.tags.len());
        self.tags.push(tag);
        None
      },
    }
  }

  /// Adds `value` under `name`, returning the tag it replaced.
  pub fn put(
    &mut self,
    name: impl Into<String>,
    value: impl Into<Element>,
  ) -> Result<Option<Tag>, CodecErr> {
    Ok(self.insert(Tag::new(name, value)?))
  }

  pub fn get(&self, name: &str) -> Option<&Tag> {
    self.index.get(name).map(|&i| &self.tags[i])
  }

  pub fn get_value(&self, name: &str) -> Option<&Element> {
    self.get(name).map(Tag::value)
  }

  /// Mutable access to the value under `name`.  Names are only changed via
  /// [`Document::rename()`], which keeps the index consistent.
  pub fn get_value_mut(&mut self, name: &str) -> Option<&mut Element> {
    let i = *self.index.get(name)?;
    Some(self.tags[i].value_mut())
  }

  pub fn contains(&self, name: &str) -> bool {
    self.index.contains_key(name)
  }

  pub fn remove(&mut self, name: &str) -> Option<Tag> {
    let i = self.index.remove(name)?;
    let tag = self.tags.remove(i);
    for slot in self.index.values_mut() {
      if *slot > i {
        *slot -= 1;
      }
    }
    Some(tag)
  }

  /// Moves the entry `from` to the name `to`, replacing any entry already
  /// there.  Returns `false` if `from` is absent.
  pub fn rename(&mut self, from: &str, to: &str) -> Result<bool, CodecErr> {
    match self.get(from) {
      None => Ok(false),
      Some(tag) => {
        let renamed = Tag::new(to, tag.value().clone())?;
        self.remove(from);
        self.insert(renamed);
        Ok(true)
      },
    }
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
    self.tags.iter()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.tags.iter().map(Tag::name)
  }

  /// Any integer or float under `name`, converted to `i8` if it fits.
  pub fn extract_byte(&self, name: &str) -> Option<i8> {
    self.extract_i64(name).and_then(|v| i8::try_from(v).ok())
  }

  /// Any integer or float under `name`, converted to `i16` if it fits.
  pub fn extract_short(&self, name: &str) -> Option<i16> {
    self.extract_i64(name).and_then(|v| i16::try_from(v).ok())
  }

  /// Any integer or float under `name`, converted to `i32` if it fits.
  pub fn extract_int(&self, name: &str) -> Option<i32> {
    self.extract_i64(name).and_then(|v| i32::try_from(v).ok())
  }

  /// Any integer or float under `name`, as `i64`.
  pub fn extract_long(&self, name: &str) -> Option<i64> {
    self.extract_i64(name)
  }

  /// Any integer or float under `name`, as `f32`.
  pub fn extract_float(&self, name: &str) -> Option<f32> {
    self.get_value(name)?.as_f64().map(|v| v as f32)
  }

  /// Any integer or float under `name`, as `f64`.
  pub fn extract_double(&self, name: &str) -> Option<f64> {
    self.get_value(name)?.as_f64()
  }

  pub fn extract_bool(&self, name: &str) -> Option<bool> {
    match self.get_value(name)? {
      Element::Bool(v) => Some(*v),
      _ => None,
    }
  }

  pub fn extract_string(&self, name: &str) -> Option<&str> {
    match self.get_value(name)? {
      Element::String(v) => Some(v.as_str()),
      _ => None,
    }
  }

  fn extract_i64(&self, name: &str) -> Option<i64> {
    self.get_value(name)?.as_i64()
  }

  doc_accessors!(Bytes, Vec<u8>, extract_bytes, get_or_insert_bytes);
  doc_accessors!(Uuid, Uuid, extract_uuid, get_or_insert_uuid);
  doc_accessors!(Vec2i, Vec2<i32>, extract_vec2i, get_or_insert_vec2i);
  doc_accessors!(Vec3i, Vec3<i32>, extract_vec3i, get_or_insert_vec3i);
  doc_accessors!(Vec4i, Vec4<i32>, extract_vec4i, get_or_insert_vec4i);
  doc_accessors!(Vec2f, Vec2<f32>, extract_vec2f, get_or_insert_vec2f);
  doc_accessors!(Vec3f, Vec3<f32>, extract_vec3f, get_or_insert_vec3f);
  doc_accessors!(Vec4f, Vec4<f32>, extract_vec4f, get_or_insert_vec4f);
  doc_accessors!(Vec2d, Vec2<f64>, extract_vec2d, get_or_insert_vec2d);
  doc_accessors!(Vec3d, Vec3<f64>, extract_vec3d, get_or_insert_vec3d);
  doc_accessors!(Vec4d, Vec4<f64>, extract_vec4d, get_or_insert_vec4d);
  doc_accessors!(Quatf, Quat<f32>, extract_quatf, get_or_insert_quatf);
  doc_accessors!(Quatd, Quat<f64>, extract_quatd, get_or_insert_quatd);
  doc_accessors!(Mat4f, Mat4f, extract_mat4f, get_or_insert_mat4f);
  doc_accessors!(Array, Array, extract_array, get_or_insert_array);
  doc_accessors!(List, List, extract_list, get_or_insert_list);
  doc_accessors!(Set, Set, extract_set, get_or_insert_set);
  doc_accessors!(Map, Map, extract_map, get_or_insert_map);
  doc_accessors!(Doc, Document, extract_doc, get_or_insert_doc);
}

impl PartialEq for Document {
  fn eq(&self, other: &Self) -> bool {
    self.tags.len() == other.tags.len()
      && self.tags.iter().all(|tag| other.get(tag.name()) == Some(tag))
  }
}

impl Eq for Document {}

impl Hash for Document {
  fn hash<H: Hasher>(&self, state: &mut H) {
    unordered_hash(self.tags.iter(), state)
  }
}

impl Debug for Document {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_map()
      .entries(self.tags.iter().map(|tag| (tag.name(), tag.value())))
      .finish()
  }
}

impl FromIterator<Tag> for Document {
  fn from_iter<T: IntoIterator<Item = Tag>>(iter: T) -> Self {
    let mut doc = Document::new();
    for tag in iter {
      doc.insert(tag);
    }
    doc
  }
}

impl IntoIterator for Document {
  type Item = Tag;
  type IntoIter = std::vec::IntoIter<Tag>;

  fn into_iter(self) -> Self::IntoIter {
    self.tags.into_iter()
  }
}

/// `int32 count` followed by one tag record per entry.
impl Payload for Document {
  const FINAL_SIZE: FinalSize = FinalSize::Variable;

  fn byte_size(&self) -> usize {
    size_of::<i32>()
      + self
        .tags
        .iter()
        .map(|tag| total_size(tag.value(), Some(tag.name())))
        .sum::<usize>()
  }

  fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
    enc.write_len(self.tags.len())?;
    for tag in self.tags.iter() {
      enc.write_tag(tag)?;
    }
    Ok(())
  }

  fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
    let count = dec.read_len()?;
    let mut doc = Document {
      tags:  Vec::with_capacity(count.min(MAX_PREALLOC)),
      index: HashMap::with_capacity(count.min(MAX_PREALLOC)),
    };
    for _ in 0..count {
      let tag = dec.read_tag().map_err(|err| {
        if err.is_unknown_discriminator() {
          log::warn!("Cannot skip document entry with {err:?}; decode aborted");
        }
        err
      })?;
      match tag {
        Some(tag) => {
          if let Some(old) = doc.insert(tag) {
            log::debug!("Duplicate document entry {:?} replaced", old.name());
          }
        },
        None => return Err(err!(debug, CodecErr::UnexpectedNull)),
      }
    }
    Ok(doc)
  }

  identity_by_eq!();
}
