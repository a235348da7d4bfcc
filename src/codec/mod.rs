//! Low-level readers and writers.
//!
//! Two backends implement the same primitive contract:
//!
//! - [`BufferCodec`]: a capacity-bounded, pre-sized buffer with independent
//!   read and write cursors.  Used whenever an exactly sized serialized form is
//!   needed, e.g. before compressing or encrypting a nested value.
//! - [`StreamReader`] / [`StreamWriter`]: sequential access to a one-way
//!   [`std::io::Read`] source or [`std::io::Write`] sink.
//!
//! All multi-byte fields are big-endian.  Both backends produce identical
//! bytes for identical input.

mod buffer;
pub mod record;
mod stream;

pub use self::{buffer::*, stream::*};

use crate::{
  registry::Registry, util::OkOrLog, CodecErr, Element, Tag, Value,
  MAX_NAME_LEN,
};
use log::Level;
use std::sync::Arc;

/// Bytes requested from a source per read when the final length of a blob is
/// only known from an untrusted length prefix.
const READ_CHUNK_LEN: usize = 64 * 1024;

/// The write half of the codec contract.
pub trait Encoder {
  /// The registry used to look up discriminators.
  fn registry(&self) -> &Arc<Registry>;

  /// Writes `bytes` verbatim.
  fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecErr>;

  /// Total bytes written so far.
  fn bytes_written(&self) -> u64;

  fn write_u8(&mut self, value: u8) -> Result<(), CodecErr> {
    self.write_bytes(&[value])
  }

  fn write_i8(&mut self, value: i8) -> Result<(), CodecErr> {
    self.write_bytes(&value.to_be_bytes())
  }

  fn write_i16(&mut self, value: i16) -> Result<(), CodecErr> {
    self.write_bytes(&value.to_be_bytes())
  }

  fn write_u16(&mut self, value: u16) -> Result<(), CodecErr> {
    self.write_bytes(&value.to_be_bytes())
  }

  fn write_i32(&mut self, value: i32) -> Result<(), CodecErr> {
    self.write_bytes(&value.to_be_bytes())
  }

  fn write_u32(&mut self, value: u32) -> Result<(), CodecErr> {
    self.write_bytes(&value.to_be_bytes())
  }

  fn write_i64(&mut self, value: i64) -> Result<(), CodecErr> {
    self.write_bytes(&value.to_be_bytes())
  }

  fn write_u64(&mut self, value: u64) -> Result<(), CodecErr> {
    self.write_bytes(&value.to_be_bytes())
  }

  fn write_f32(&mut self, value: f32) -> Result<(), CodecErr> {
    self.write_bytes(&value.to_bits().to_be_bytes())
  }

  fn write_f64(&mut self, value: f64) -> Result<(), CodecErr> {
    self.write_bytes(&value.to_bits().to_be_bytes())
  }

  fn write_bool(&mut self, value: bool) -> Result<(), CodecErr> {
    self.write_u8(u8::from(value))
  }

  /// Writes a length or count as a signed 32-bit integer.
  fn write_len(&mut self, len: usize) -> Result<(), CodecErr> {
    let len =
      i32::try_from(len).map_err(|_| err!(debug, CodecErr::TooLarge(len)))?;
    self.write_i32(len)
  }

  /// Writes an `int32` length followed by the UTF-8 bytes of `value`.
  fn write_string(&mut self, value: &str) -> Result<(), CodecErr> {
    self.write_blob(value.as_bytes())
  }

  /// Writes an `int16` length followed by the UTF-8 bytes of `value`.
  fn write_short_string(&mut self, value: &str) -> Result<(), CodecErr> {
    let len = value.len();
    if len > MAX_NAME_LEN {
      return Err(err!(debug, CodecErr::NameTooLong(len)));
    }
    self.write_i16(len as i16)?;
    self.write_bytes(value.as_bytes())
  }

  /// Writes an `int32` length followed by `bytes`.
  fn write_blob(&mut self, bytes: &[u8]) -> Result<(), CodecErr> {
    self.write_len(bytes.len())?;
    self.write_bytes(bytes)
  }

  /// Writes the generic record of an anonymous element.
  fn write_element(&mut self, element: &Element) -> Result<(), CodecErr> {
    record::write_record(self, element, None)
  }

  /// Writes the generic record of a tag.
  fn write_tag(&mut self, tag: &Tag) -> Result<(), CodecErr> {
    record::write_record(self, tag.value(), Some(tag.name()))
  }

  /// Writes the generic record of either shape.
  fn write_value(&mut self, value: &Value) -> Result<(), CodecErr> {
    record::write_record(self, value.element(), value.name())
  }

  /// Writes the null record: a zero discriminator and nothing else.
  fn write_null(&mut self) -> Result<(), CodecErr> {
    self.write_u16(crate::registry::NULL_DISCRIMINATOR)
  }

  /// Writes `element`'s record, or the null record for `None`.
  fn write_optional(&mut self, element: Option<&Element>) -> Result<(), CodecErr> {
    match element {
      Some(element) => self.write_element(element),
      None => self.write_null(),
    }
  }
}

/// The read half of the codec contract.
pub trait Decoder {
  /// The registry used to find builders.
  fn registry(&self) -> &Arc<Registry>;

  /// Fills `target` completely, or fails.
  fn read_bytes(&mut self, target: &mut [u8]) -> Result<(), CodecErr>;

  /// Discards exactly `len` bytes.
  fn skip(&mut self, len: u64) -> Result<(), CodecErr>;

  /// Total bytes consumed so far.
  fn bytes_read(&self) -> u64;

  /// Number of records currently open around the read cursor.
  fn depth(&self) -> usize;

  /// Overwrites the nesting depth.  Only [`record`] and the transforms,
  /// which decode their inner bytes with a fresh buffer, should call this.
  fn set_depth(&mut self, depth: usize);

  /// Reads one generic record.  Returns `None` for the null record.
  ///
  /// Backends implement this by handing themselves to
  /// [`record::read_record()`].
  fn read_value(&mut self) -> Result<Option<Value>, CodecErr>;

  fn read_u8(&mut self) -> Result<u8, CodecErr> {
    let mut bytes = [0u8; 1];
    self.read_bytes(&mut bytes)?;
    Ok(bytes[0])
  }

  fn read_i8(&mut self) -> Result<i8, CodecErr> {
    let mut bytes = [0u8; 1];
    self.read_bytes(&mut bytes)?;
    Ok(i8::from_be_bytes(bytes))
  }

  fn read_i16(&mut self) -> Result<i16, CodecErr> {
    let mut bytes = [0u8; 2];
    self.read_bytes(&mut bytes)?;
    Ok(i16::from_be_bytes(bytes))
  }

  fn read_u16(&mut self) -> Result<u16, CodecErr> {
    let mut bytes = [0u8; 2];
    self.read_bytes(&mut bytes)?;
    Ok(u16::from_be_bytes(bytes))
  }

  fn read_i32(&mut self) -> Result<i32, CodecErr> {
    let mut bytes = [0u8; 4];
    self.read_bytes(&mut bytes)?;
    Ok(i32::from_be_bytes(bytes))
  }

  fn read_u32(&mut self) -> Result<u32, CodecErr> {
    let mut bytes = [0u8; 4];
    self.read_bytes(&mut bytes)?;
    Ok(u32::from_be_bytes(bytes))
  }

  fn read_i64(&mut self) -> Result<i64, CodecErr> {
    let mut bytes = [0u8; 8];
    self.read_bytes(&mut bytes)?;
    Ok(i64::from_be_bytes(bytes))
  }

  fn read_u64(&mut self) -> Result<u64, CodecErr> {
    let mut bytes = [0u8; 8];
    self.read_bytes(&mut bytes)?;
    Ok(u64::from_be_bytes(bytes))
  }

  fn read_f32(&mut self) -> Result<f32, CodecErr> {
    Ok(f32::from_bits(self.read_u32()?))
  }

  fn read_f64(&mut self) -> Result<f64, CodecErr> {
    Ok(f64::from_bits(self.read_u64()?))
  }

  /// Reads a boolean byte.  Anything other than `0` or `1` is rejected.
  fn read_bool(&mut self) -> Result<bool, CodecErr> {
    match self.read_u8()? {
      0 => Ok(false),
      1 => Ok(true),
      _ => Err(err!(debug, CodecErr::IllegalValue)),
    }
  }

  /// Reads a signed 32-bit length or count, rejecting negative values.
  fn read_len(&mut self) -> Result<usize, CodecErr> {
    let len = self.read_i32()?;
    usize::try_from(len)
      .map_err(|_| err!(debug, CodecErr::NegativeLength(i64::from(len))))
  }

  /// Reads exactly `len` bytes into a new vector.
  ///
  /// The vector grows as bytes arrive rather than trusting `len` up front, so
  /// a corrupt length fails with an end-of-data error instead of a huge
  /// allocation.
  fn read_vec(&mut self, len: usize) -> Result<Vec<u8>, CodecErr> {
    let mut bytes = Vec::with_capacity(len.min(READ_CHUNK_LEN));
    while bytes.len() < len {
      let start = bytes.len();
      let chunk = (len - start).min(READ_CHUNK_LEN);
      bytes.resize(start + chunk, 0);
      self.read_bytes(&mut bytes[start..])?;
    }
    Ok(bytes)
  }

  /// Reads an `int32` length followed by that many bytes.
  fn read_blob(&mut self) -> Result<Vec<u8>, CodecErr> {
    let len = self.read_len()?;
    self.read_vec(len)
  }

  /// Reads an `int32`-length-prefixed UTF-8 string.
  fn read_string(&mut self) -> Result<String, CodecErr> {
    let bytes = self.read_blob()?;
    Ok(String::from_utf8(bytes)?)
  }

  /// Reads an `int16`-length-prefixed UTF-8 string.
  fn read_short_string(&mut self) -> Result<String, CodecErr> {
    let len = self.read_i16()?;
    let len = usize::try_from(len)
      .map_err(|_| err!(debug, CodecErr::NegativeLength(i64::from(len))))?;
    let bytes = self.read_vec(len)?;
    Ok(String::from_utf8(bytes)?)
  }

  /// Reads a record that must be an element, or null.
  fn read_element(&mut self) -> Result<Option<Element>, CodecErr> {
    match self.read_value()? {
      Some(Value::Element(element)) => Ok(Some(element)),
      Some(Value::Tag(_)) => Err(err!(debug, CodecErr::UnexpectedTag)),
      None => Ok(None),
    }
  }

  /// Reads a record that must be a tag, or null.
  fn read_tag(&mut self) -> Result<Option<Tag>, CodecErr> {
    match self.read_value()? {
      Some(Value::Tag(tag)) => Ok(Some(tag)),
      Some(Value::Element(_)) => Err(err!(debug, CodecErr::UnexpectedElement)),
      None => Ok(None),
    }
  }

  /// Reads a record that must be a non-null element.
  fn read_required_element(&mut self) -> Result<Element, CodecErr> {
    self
      .read_element()?
      .ok_or_log(Level::Debug, CodecErr::UnexpectedNull)
  }
}
