use crate::{
  builder::{attach_name, Builder},
  codec::{Decoder, Encoder},
  crypto::Cipher,
  registry::{Registry, VariantType},
  transform::{pack, unpack},
  util::{debug::ShortHexDump, OkOrLog},
  CodecErr, FinalSize, Kind, Payload, Transform, Value,
};
use log::Level;
use std::{
  fmt::{Debug, Formatter},
  hash::{Hash, Hasher},
  mem::size_of,
  sync::Arc,
};

/// A value stored under a symmetric stream cipher.
///
/// ```text
/// ciphertext_length : int32
/// ciphertext
/// ```
///
/// The cipher itself is not persisted.  A decoded `Ciphered` is sealed: it
/// holds only the ciphertext until [`Ciphered::open()`] is called with the
/// same cipher, or until a [`CipherBuilder`] opens it during decode.
///
/// Equality and hashing are those of the ciphertext.
#[derive(Clone)]
pub struct Ciphered {
  ciphertext: Vec<u8>,
  opened:     Option<Box<Value>>,
}

impl Ciphered {
  /// Packs and enciphers `value`.  The result is already open.
  pub fn seal(
    value: impl Into<Value>,
    cipher: &dyn Cipher,
    registry: &Arc<Registry>,
  ) -> Result<Ciphered, CodecErr> {
    let value = value.into();
    let ciphertext = cipher.encrypt(&pack(&value, registry)?)?;
    Ok(Ciphered {
      ciphertext,
      opened: Some(Box::new(value)),
    })
  }

  /// Deciphers and decodes the inner value, unless that was already done.
  ///
  /// Fails with [`CodecErr::TransformFailure`] if the deciphered bytes are
  /// not exactly one record, which is what a wrong cipher produces.
  pub fn open(
    &mut self,
    cipher: &dyn Cipher,
    registry: &Arc<Registry>,
  ) -> Result<&Value, CodecErr> {
    self.open_at(cipher, registry, 0)
  }

  fn open_at(
    &mut self,
    cipher: &dyn Cipher,
    registry: &Arc<Registry>,
    depth: usize,
  ) -> Result<&Value, CodecErr> {
    if self.opened.is_none() {
      let raw = cipher.decrypt(&self.ciphertext)?;
      let value = unpack(raw, registry, Transform::Decipher, depth)?;
      self.opened = Some(Box::new(value));
    }
    self
      .opened
      .as_deref()
      .ok_or_log(Level::Error, CodecErr::UnexpectedNull)
  }

  /// The inner value, if open.
  pub fn value(&self) -> Option<&Value> {
    self.opened.as_deref()
  }

  pub fn is_open(&self) -> bool {
    self.opened.is_some()
  }

  /// Forgets the deciphered value, keeping only the ciphertext.
  pub fn close(&mut self) {
    self.opened = None;
  }

  pub fn ciphertext(&self) -> &[u8] {
    &self.ciphertext
  }

  pub fn into_value(self) -> Option<Value> {
    self.opened.map(|value| *value)
  }
}

impl Payload for Ciphered {
  const FINAL_SIZE: FinalSize = FinalSize::Variable;

  fn byte_size(&self) -> usize {
    size_of::<i32>() + self.ciphertext.len()
  }

  fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
    enc.write_blob(&self.ciphertext)
  }

  fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
    Ok(Ciphered {
      ciphertext: dec.read_blob()?,
      opened:     None,
    })
  }

  fn same(&self, other: &Self) -> bool {
    self.ciphertext == other.ciphertext
  }

  fn hash_into<H: Hasher>(&self, state: &mut H) {
    self.ciphertext.hash(state)
  }
}

impl Debug for Ciphered {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Ciphered")
      .field("ciphertext", &ShortHexDump(&self.ciphertext, 4))
      .field("opened", &self.opened)
      .finish()
  }
}

/// Decodes [`Ciphered`] records and opens them immediately with a cipher it
/// holds.
///
/// Install with [`CipherBuilder::install()`], which replaces the default
/// builders of both shapes while keeping their codes.
#[derive(Clone)]
pub struct CipherBuilder {
  variant: VariantType,
  cipher:  Arc<dyn Cipher + Send + Sync>,
}

impl CipherBuilder {
  pub fn new(named: bool, cipher: Arc<dyn Cipher + Send + Sync>) -> CipherBuilder {
    CipherBuilder {
      variant: VariantType::new(Kind::Ciphered, named),
      cipher,
    }
  }

  /// Replaces the `Ciphered` builders of `registry`.  Returns `false` if
  /// either shape is not registered.
  pub fn install(registry: &mut Registry, cipher: Arc<dyn Cipher + Send + Sync>) -> bool {
    [false, true].into_iter().all(|named| {
      let builder = CipherBuilder::new(named, Arc::clone(&cipher));
      registry.replace_builder(builder.variant, Arc::new(builder))
    })
  }
}

impl Builder for CipherBuilder {
  fn build(&self, name: Option<String>, dec: &mut dyn Decoder) -> Result<Value, CodecErr> {
    let mut ciphered = Ciphered::deserialize(dec)?;
    ciphered.open_at(self.cipher.as_ref(), dec.registry(), dec.depth())?;
    attach_name(self.variant.is_named(), name, Value::Element(ciphered.into()))
  }

  fn final_size_hint(&self) -> FinalSize {
    FinalSize::Variable
  }

  fn is_named(&self) -> bool {
    self.variant.is_named()
  }
}

impl Debug for CipherBuilder {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CipherBuilder")
      .field("variant", &self.variant)
      .finish_non_exhaustive()
  }
}
