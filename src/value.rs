//! The variant model: [`Element`] (anonymous), [`Named`] / [`Tag`] (named), and
//! [`Value`] (either shape), together with the size protocol.

use crate::{
  basic::{Mat4f, Quat, Vec2, Vec3, Vec4},
  codec::{Decoder, Encoder},
  collections::{Array, List, Map, Set},
  crypto::{InitVector, PrivateKey, PublicKey, SecretKey},
  misc::{ClassRef, FileRef, UriRef},
  structured::Document,
  transform::{Ciphered, Compressed, Encrypted},
  CodecErr,
};
use std::{
  fmt::{Debug, Formatter},
  hash::{Hash, Hasher},
};
use uuid::Uuid;

/// Largest name, in UTF-8 bytes, that fits the signed 16-bit name length.
pub const MAX_NAME_LEN: usize = i16::MAX as usize;

/// Size of the discriminator field of a record.
pub(crate) const DISCRIMINATOR_LEN: usize = 2;
/// Size of the name length field of a tag record.
pub(crate) const NAME_LEN_LEN: usize = 2;
/// Size of the explicit length field of a variable-size record.
pub(crate) const EXPLICIT_LEN_LEN: usize = 8;

/// The payload size class of a variant.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FinalSize {
  /// Every instance of the variant has exactly this many payload bytes.
  Fixed(usize),
  /// The size depends on the instance; records carry an explicit length.
  Variable,
}

impl FinalSize {
  /// `true` for [`FinalSize::Variable`].
  pub const fn is_variable(self) -> bool {
    matches!(self, FinalSize::Variable)
  }

  /// The fixed size, if there is one.
  pub const fn fixed(self) -> Option<usize> {
    match self {
      FinalSize::Fixed(size) => Some(size),
      FinalSize::Variable => None,
    }
  }
}

/// The payload half of a variant: how one instance is sized, written, read,
/// and compared.
///
/// Implementors must guarantee that `serialize()` writes exactly
/// `byte_size()` bytes, and that `byte_size()` equals the fixed size whenever
/// `FINAL_SIZE` is [`FinalSize::Fixed`].
pub trait Payload: Sized {
  /// Size class shared by every instance.
  const FINAL_SIZE: FinalSize;

  /// Exact number of bytes `serialize()` will write.
  fn byte_size(&self) -> usize;

  /// Writes the payload.
  fn serialize<E>(&self, enc: &mut E) -> Result<(), CodecErr>
  where
    E: Encoder + ?Sized;

  /// Reads a payload written by `serialize()`.
  fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr>;

  /// Value identity, used by [`Element`]'s `PartialEq`.
  fn same(&self, other: &Self) -> bool;

  /// Hash consistent with [`Payload::same()`].
  fn hash_into<H: Hasher>(&self, state: &mut H);
}

define_elements! {
  /// Signed 8-bit integer.
  Byte(i8) = 1,
  /// Signed 16-bit integer.
  Short(i16) = 2,
  /// Signed 32-bit integer.
  Int(i32) = 3,
  /// Signed 64-bit integer.
  Long(i64) = 4,
  /// 32-bit float.
  Float(f32) = 5,
  /// 64-bit float.
  Double(f64) = 6,
  /// Boolean.
  Bool(bool) = 7,
  /// UTF-8 string.
  String(String) = 8,
  /// Opaque byte container.
  Bytes(Vec<u8>) = 9,
  /// UUID, as two 64-bit words.
  Uuid(Uuid) = 10,
  Vec2i(Vec2<i32>) = 11,
  Vec3i(Vec3<i32>) = 12,
  Vec4i(Vec4<i32>) = 13,
  Vec2l(Vec2<i64>) = 14,
  Vec3l(Vec3<i64>) = 15,
  Vec4l(Vec4<i64>) = 16,
  Vec2f(Vec2<f32>) = 17,
  Vec3f(Vec3<f32>) = 18,
  Vec4f(Vec4<f32>) = 19,
  Vec2d(Vec2<f64>) = 20,
  Vec3d(Vec3<f64>) = 21,
  Vec4d(Vec4<f64>) = 22,
  /// Fixed-length array whose slots may be empty.
  Array(Array) = 23,
  /// Ordered, growable list.
  List(List) = 24,
  /// Name-keyed document of tags.
  Doc(Document) = 25,
  /// Element keys to optional element values.
  Map(Map) = 26,
  /// Unordered set, unique by value.
  Set(Set) = 27,
  Quatf(Quat<f32>) = 28,
  Quatd(Quat<f64>) = 29,
  /// 4x4 float matrix.
  Mat4f(Mat4f) = 30,
  /// Asymmetric private key.
  PrivateKey(PrivateKey) = 31,
  /// Asymmetric public key.
  PublicKey(PublicKey) = 32,
  /// Symmetric secret key.
  SecretKey(SecretKey) = 33,
  /// Initialization vector.
  InitVector(InitVector) = 34,
  /// Reference to a variant type by name.
  Class(ClassRef) = 35,
  /// Value stored in an external file.
  File(FileRef) = 36,
  /// Value stored behind a URI.
  Uri(UriRef) = 37,
  /// Value stored compressed.
  Compressed(Compressed) = 38,
  /// Value stored under a stream cipher.
  Ciphered(Ciphered) = 39,
  /// Value stored under authenticated encryption.
  Encrypted(Encrypted) = 40,
}

impl PartialEq for Element {
  fn eq(&self, other: &Self) -> bool {
    self.same_payload(other)
  }
}

impl Eq for Element {}

impl Hash for Element {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.kind().hash(state);
    self.hash_payload(state);
  }
}

impl From<&str> for Element {
  fn from(src: &str) -> Self {
    Element::String(src.into())
  }
}

impl From<&[u8]> for Element {
  fn from(src: &[u8]) -> Self {
    Element::Bytes(src.into())
  }
}

impl Element {
  /// The payload size class of this element's kind.
  pub fn final_size(&self) -> FinalSize {
    self.kind().final_size()
  }

  /// Promotes this element to a tag.
  pub fn to_tag(self, name: impl Into<String>) -> Result<Tag, CodecErr> {
    Named::new(name, self)
  }

  /// Widens any numeric scalar to `i64`.  Floats are truncated toward zero.
  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Element::Byte(v) => Some(i64::from(*v)),
      Element::Short(v) => Some(i64::from(*v)),
      Element::Int(v) => Some(i64::from(*v)),
      Element::Long(v) => Some(*v),
      Element::Float(v) => Some(*v as i64),
      Element::Double(v) => Some(*v as i64),
      _ => None,
    }
  }

  /// Widens any numeric scalar to `f64`.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Element::Byte(v) => Some(f64::from(*v)),
      Element::Short(v) => Some(f64::from(*v)),
      Element::Int(v) => Some(f64::from(*v)),
      Element::Long(v) => Some(*v as f64),
      Element::Float(v) => Some(f64::from(*v)),
      Element::Double(v) => Some(*v),
      _ => None,
    }
  }
}

/// A value with an attached, non-empty name.
///
/// The payload encoding is that of `V`; the name participates in equality
/// and hashing together with the value.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Named<V> {
  name:  String,
  value: V,
}

/// The named shape of an [`Element`]: a document entry.
pub type Tag = Named<Element>;

impl<V> Named<V> {
  /// Attaches `name` to `value`.
  ///
  /// Fails with [`CodecErr::EmptyName`] or [`CodecErr::NameTooLong`].
  pub fn new(
    name: impl Into<String>,
    value: impl Into<V>,
  ) -> Result<Named<V>, CodecErr> {
    let name = name.into();
    check_name(&name)?;
    Ok(Named {
      name,
      value: value.into(),
    })
  }

  /// The tag's name.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Renames the tag.
  pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), CodecErr> {
    let name = name.into();
    check_name(&name)?;
    self.name = name;
    Ok(())
  }

  /// The tagged value.
  pub fn value(&self) -> &V {
    &self.value
  }

  /// The tagged value, mutably.
  pub fn value_mut(&mut self) -> &mut V {
    &mut self.value
  }

  /// Drops the name.
  pub fn into_value(self) -> V {
    self.value
  }

  /// Splits into name and value.
  pub fn into_parts(self) -> (String, V) {
    (self.name, self.value)
  }
}

impl Named<Element> {
  /// Converts back to the anonymous shape.
  pub fn to_element(self) -> Element {
    self.value
  }
}

impl<V: Debug> Debug for Named<V> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:?}: {:?}", self.name, self.value)
  }
}

fn check_name(name: &str) -> Result<(), CodecErr> {
  if name.is_empty() {
    Err(err!(debug, CodecErr::EmptyName))
  } else if name.len() > MAX_NAME_LEN {
    Err(err!(debug, CodecErr::NameTooLong(name.len())))
  } else {
    Ok(())
  }
}

/// The content of one generic record: an element or a tag.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Value {
  /// Anonymous shape.
  Element(Element),
  /// Named shape.
  Tag(Tag),
}

impl Value {
  /// The underlying element, whichever the shape.
  pub fn element(&self) -> &Element {
    match self {
      Value::Element(element) => element,
      Value::Tag(tag) => tag.value(),
    }
  }

  /// The name, for tags.
  pub fn name(&self) -> Option<&str> {
    match self {
      Value::Element(_) => None,
      Value::Tag(tag) => Some(tag.name()),
    }
  }

  /// Drops the name, if any.
  pub fn to_element(self) -> Element {
    match self {
      Value::Element(element) => element,
      Value::Tag(tag) => tag.to_element(),
    }
  }

  /// Attaches (or replaces) a name.
  pub fn to_tag(self, name: impl Into<String>) -> Result<Tag, CodecErr> {
    self.to_element().to_tag(name)
  }

  /// Exact payload size, excluding the record header.
  pub fn byte_size(&self) -> usize {
    self.element().byte_size()
  }

  /// The payload size class.
  pub fn final_size(&self) -> FinalSize {
    self.element().final_size()
  }

  /// Size of the complete generic record for this value.
  pub fn total_size(&self) -> usize {
    total_size(self.element(), self.name())
  }
}

impl From<Element> for Value {
  fn from(src: Element) -> Self {
    Value::Element(src)
  }
}

impl From<Tag> for Value {
  fn from(src: Tag) -> Self {
    Value::Tag(src)
  }
}

/// Size of the generic record holding `element`, named `name` if it is a tag.
///
/// `2 + byte_size + (8 if variable) + (2 + utf8 name length if named)`.
pub fn total_size(element: &Element, name: Option<&str>) -> usize {
  let explicit_len = if element.final_size().is_variable() {
    EXPLICIT_LEN_LEN
  } else {
    0
  };
  let name_len = name.map_or(0, |name| NAME_LEN_LEN + name.len());
  DISCRIMINATOR_LEN + element.byte_size() + explicit_len + name_len
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn fixed_kinds_report_fixed_sizes() {
    let fixed: Vec<Element> = vec![
      Element::Byte(-3),
      Element::Short(300),
      Element::Int(-70_000),
      Element::Long(1 << 40),
      Element::Float(1.5),
      Element::Double(-2.25),
      Element::Bool(true),
      Element::Uuid(Uuid::from_u128(0x1234)),
      Vec2::new(1i32, 2).into(),
      Vec3::new(1i64, 2, 3).into(),
      Vec4::new(1.0f32, 2.0, 3.0, 4.0).into(),
      Quat::new(0.0f64, 0.0, 0.0, 1.0).into(),
      Mat4f::IDENTITY.into(),
    ];
    for element in fixed {
      let size = element.final_size().fixed().unwrap();
      assert_eq!(element.byte_size(), size, "{:?}", element.kind());
      assert_eq!(total_size(&element, None), 2 + size);
    }
  }

  #[test]
  fn total_size_counts_header_fields() {
    let s = Element::from("abc");
    // 4 byte length prefix plus content.
    assert_eq!(s.byte_size(), 7);
    assert_eq!(total_size(&s, None), 2 + 8 + 7);
    assert_eq!(total_size(&s, Some("label")), 2 + 2 + 5 + 8 + 7);
    assert_eq!(total_size(&Element::Int(1), Some("n")), 2 + 2 + 1 + 4);
  }

  #[test]
  fn names_must_be_present() {
    assert_eq!(Tag::new("", 1i32).unwrap_err(), CodecErr::EmptyName);
    let long = "x".repeat(MAX_NAME_LEN + 1);
    assert_eq!(
      Tag::new(long, 1i32).unwrap_err(),
      CodecErr::NameTooLong(MAX_NAME_LEN + 1)
    );
  }

  #[test]
  fn tag_identity_includes_name() {
    let a = Tag::new("a", 1i32).unwrap();
    let b = Tag::new("b", 1i32).unwrap();
    assert_ne!(a, b);
    assert_eq!(a.clone().to_element(), b.clone().to_element());

    let mut set = HashSet::new();
    set.insert(a.clone());
    set.insert(b);
    set.insert(a);
    assert_eq!(set.len(), 2);
  }

  #[test]
  fn floats_compare_by_bits() {
    assert_eq!(Element::Double(f64::NAN), Element::Double(f64::NAN));
    assert_ne!(Element::Float(0.0), Element::Float(-0.0));
    assert_ne!(Element::Int(1), Element::Long(1));
  }

  #[test]
  fn kinds_round_trip_through_codes_and_names() {
    for &kind in Kind::ALL {
      assert_eq!(Kind::from_code(kind.code()), Some(kind));
      assert_eq!(Kind::from_name(kind.name()), Some(kind));
    }
    assert_eq!(Kind::Doc.code(), 25);
    assert_eq!(Kind::from_code(0), None);
  }
}
