use crate::{
  codec::{record, Decoder, Encoder},
  registry::Registry,
  util::debug::HexDump,
  CodecErr, Value,
};
use std::{
  fmt::{Debug, Formatter},
  sync::Arc,
};

/// A capacity-bounded buffer with independent read and write cursors.
///
/// The capacity is fixed at creation.  Callers size it with
/// [`Value::total_size()`], so a well-formed encode never overflows; if one
/// does, the write fails with [`CodecErr::BufferOverflow`] and nothing is
/// written.
#[derive(Clone)]
pub struct BufferCodec {
  data:      Vec<u8>,
  read_pos:  usize,
  write_pos: usize,
  depth:     usize,
  registry:  Arc<Registry>,
}

impl BufferCodec {
  /// Creates an empty buffer holding up to `capacity` bytes.
  pub fn new(capacity: usize, registry: Arc<Registry>) -> BufferCodec {
    BufferCodec {
      data: vec![0u8; capacity],
      read_pos: 0,
      write_pos: 0,
      depth: 0,
      registry,
    }
  }

  /// Creates an empty buffer exactly large enough for the record of `value`.
  pub fn for_value(value: &Value, registry: Arc<Registry>) -> BufferCodec {
    BufferCodec::new(value.total_size(), registry)
  }

  /// Wraps already encoded bytes for reading.  The buffer is full.
  pub fn from_bytes(bytes: Vec<u8>, registry: Arc<Registry>) -> BufferCodec {
    let write_pos = bytes.len();
    BufferCodec {
      data: bytes,
      read_pos: 0,
      write_pos,
      depth: 0,
      registry,
    }
  }

  /// Encodes `value` into a buffer of exactly its record size and returns
  /// the bytes.
  pub fn encode(value: &Value, registry: &Arc<Registry>) -> Result<Vec<u8>, CodecErr> {
    let mut buffer = BufferCodec::for_value(value, Arc::clone(registry));
    buffer.write_value(value)?;
    if buffer.writable() != 0 {
      return Err(err!(
        error,
        CodecErr::SizeMismatch {
          expected: buffer.capacity() as u64,
          written:  buffer.write_pos as u64,
        }
      ));
    }
    Ok(buffer.into_bytes())
  }

  /// Decodes exactly one non-null record occupying all of `bytes`.
  pub fn decode(bytes: Vec<u8>, registry: &Arc<Registry>) -> Result<Value, CodecErr> {
    BufferCodec::from_bytes(bytes, Arc::clone(registry)).decode_whole()
  }

  /// Decodes the one record that fills this buffer, starting at the current
  /// nesting depth.
  pub(crate) fn decode_whole(mut self) -> Result<Value, CodecErr> {
    let value = self
      .read_value()?
      .ok_or_else(|| err!(debug, CodecErr::UnexpectedNull))?;
    if self.remaining() != 0 {
      return Err(err!(
        debug,
        CodecErr::LengthMismatch {
          declared: self.write_pos as u64,
          consumed: self.read_pos as u64,
        }
      ));
    }
    Ok(value)
  }

  /// The registry shared by both halves of the codec.
  pub fn registry(&self) -> &Arc<Registry> {
    &self.registry
  }

  /// Total size of the buffer.
  pub fn capacity(&self) -> usize {
    self.data.len()
  }

  /// Bytes written but not yet read.
  pub fn remaining(&self) -> usize {
    self.write_pos - self.read_pos
  }

  /// Bytes that can still be written.
  pub fn writable(&self) -> usize {
    self.data.len() - self.write_pos
  }

  /// Current read cursor.
  pub fn read_position(&self) -> usize {
    self.read_pos
  }

  /// Current write cursor.
  pub fn write_position(&self) -> usize {
    self.write_pos
  }

  /// Moves the read cursor back to the start.
  pub fn rewind(&mut self) {
    self.read_pos = 0;
  }

  /// Empties the buffer, keeping its capacity.
  pub fn clear(&mut self) {
    self.read_pos = 0;
    self.write_pos = 0;
  }

  /// The bytes written so far.
  pub fn as_bytes(&self) -> &[u8] {
    &self.data[..self.write_pos]
  }

  /// Consumes the buffer, returning the bytes written.
  pub fn into_bytes(mut self) -> Vec<u8> {
    self.data.truncate(self.write_pos);
    self.data
  }
}

impl Encoder for BufferCodec {
  fn registry(&self) -> &Arc<Registry> {
    &self.registry
  }

  fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecErr> {
    let end = self.write_pos + bytes.len();
    match self.data.get_mut(self.write_pos..end) {
      Some(target) => {
        target.copy_from_slice(bytes);
        self.write_pos = end;
        Ok(())
      },
      None => Err(err!(
        error,
        CodecErr::BufferOverflow {
          needed:   end,
          capacity: self.data.len(),
        }
      )),
    }
  }

  fn bytes_written(&self) -> u64 {
    self.write_pos as u64
  }
}

impl Decoder for BufferCodec {
  fn registry(&self) -> &Arc<Registry> {
    &self.registry
  }

  fn read_bytes(&mut self, target: &mut [u8]) -> Result<(), CodecErr> {
    let end = self.read_pos + target.len();
    if end > self.write_pos {
      return Err(err!(
        debug,
        CodecErr::UnexpectedEof {
          needed:    target.len(),
          available: self.remaining(),
        }
      ));
    }
    target.copy_from_slice(&self.data[self.read_pos..end]);
    self.read_pos = end;
    Ok(())
  }

  fn skip(&mut self, len: u64) -> Result<(), CodecErr> {
    let remaining = self.remaining();
    match usize::try_from(len) {
      Ok(len) if len <= remaining => {
        self.read_pos += len;
        Ok(())
      },
      _ => Err(err!(
        debug,
        CodecErr::UnexpectedEof {
          needed:    usize::try_from(len).unwrap_or(usize::MAX),
          available: remaining,
        }
      )),
    }
  }

  fn bytes_read(&self) -> u64 {
    self.read_pos as u64
  }

  fn depth(&self) -> usize {
    self.depth
  }

  fn set_depth(&mut self, depth: usize) {
    self.depth = depth;
  }

  fn read_value(&mut self) -> Result<Option<Value>, CodecErr> {
    record::read_record(self)
  }
}

impl Debug for BufferCodec {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BufferCodec")
      .field("capacity", &self.capacity())
      .field("read_pos", &self.read_pos)
      .field("write_pos", &self.write_pos)
      .field("depth", &self.depth)
      .field("data", &HexDump(self.as_bytes()))
      .finish()
  }
}
