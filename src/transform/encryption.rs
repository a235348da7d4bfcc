use crate::{
  builder::{attach_name, Builder},
  codec::{Decoder, Encoder},
  crypto::{DecryptionKey, EncryptionKey},
  registry::{Registry, VariantType},
  transform::{pack, unpack},
  util::{debug::ShortHexDump, OkOrLog},
  CodecErr, FinalSize, Kind, Payload, Transform, Value,
};
use log::Level;
use rand::{CryptoRng, RngCore};
use std::{
  fmt::{Debug, Formatter},
  hash::{Hash, Hasher},
  mem::size_of,
  sync::Arc,
};

/// A value stored under authenticated encryption.
///
/// ```text
/// sealed_length : int32
/// sealed        : nonce_length:u8, nonce, ciphertext, mac
/// ```
///
/// The sealed bytes are produced by an [`EncryptionKey`] and carry
/// everything needed to decrypt them except the [`DecryptionKey`].  A decoded
/// `Encrypted` stays sealed until [`Encrypted::open()`] is called, or until a
/// [`DecryptingBuilder`] opens it during decode.
///
/// Equality and hashing are those of the sealed bytes.
#[derive(Clone)]
pub struct Encrypted {
  sealed: Vec<u8>,
  opened: Option<Box<Value>>,
}

impl Encrypted {
  /// Packs and encrypts `value` to `key`.  The result is already open.
  pub fn seal<K, R>(
    value: impl Into<Value>,
    key: &K,
    rng: R,
    registry: &Arc<Registry>,
  ) -> Result<Encrypted, CodecErr>
  where
    K: EncryptionKey + ?Sized,
    R: RngCore + CryptoRng,
  {
    let value = value.into();
    let sealed = key.encrypt(rng, &pack(&value, registry)?)?;
    Ok(Encrypted {
      sealed,
      opened: Some(Box::new(value)),
    })
  }

  /// Decrypts and decodes the inner value, unless that was already done.
  ///
  /// Fails with [`CodecErr::TransformFailure`] for the wrong key or altered
  /// bytes.  The value stays sealed in that case.
  pub fn open(
    &mut self,
    key: &dyn DecryptionKey,
    registry: &Arc<Registry>,
  ) -> Result<&Value, CodecErr> {
    self.open_at(key, registry, 0)
  }

  fn open_at(
    &mut self,
    key: &dyn DecryptionKey,
    registry: &Arc<Registry>,
    depth: usize,
  ) -> Result<&Value, CodecErr> {
    if self.opened.is_none() {
      let raw = key.decrypt(&self.sealed)?;
      let value = unpack(raw, registry, Transform::Decrypt, depth)?;
      self.opened = Some(Box::new(value));
    }
    self
      .opened
      .as_deref()
      .ok_or_log(Level::Error, CodecErr::UnexpectedNull)
  }

  pub fn value(&self) -> Option<&Value> {
    self.opened.as_deref()
  }

  pub fn is_open(&self) -> bool {
    self.opened.is_some()
  }

  pub fn close(&mut self) {
    self.opened = None;
  }

  pub fn sealed(&self) -> &[u8] {
    &self.sealed
  }

  pub fn into_value(self) -> Option<Value> {
    self.opened.map(|value| *value)
  }
}

impl Payload for Encrypted {
  const FINAL_SIZE: FinalSize = FinalSize::Variable;

  fn byte_size(&self) -> usize {
    size_of::<i32>() + self.sealed.len()
  }

  fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
    enc.write_blob(&self.sealed)
  }

  fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
    Ok(Encrypted {
      sealed: dec.read_blob()?,
      opened: None,
    })
  }

  fn same(&self, other: &Self) -> bool {
    self.sealed == other.sealed
  }

  fn hash_into<H: Hasher>(&self, state: &mut H) {
    self.sealed.hash(state)
  }
}

impl Debug for Encrypted {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Encrypted")
      .field("sealed", &ShortHexDump(&self.sealed, 4))
      .field("opened", &self.opened)
      .finish()
  }
}

/// Decodes [`Encrypted`] records and opens them immediately with a key it
/// holds.
#[derive(Clone)]
pub struct DecryptingBuilder {
  variant: VariantType,
  key:     Arc<dyn DecryptionKey + Send + Sync>,
}

impl DecryptingBuilder {
  pub fn new(named: bool, key: Arc<dyn DecryptionKey + Send + Sync>) -> DecryptingBuilder {
    DecryptingBuilder {
      variant: VariantType::new(Kind::Encrypted, named),
      key,
    }
  }

  /// Replaces the `Encrypted` builders of `registry`.  Returns `false` if
  /// either shape is not registered.
  pub fn install(registry: &mut Registry, key: Arc<dyn DecryptionKey + Send + Sync>) -> bool {
    [false, true].into_iter().all(|named| {
      let builder = DecryptingBuilder::new(named, Arc::clone(&key));
      registry.replace_builder(builder.variant, Arc::new(builder))
    })
  }
}

impl Builder for DecryptingBuilder {
  fn build(&self, name: Option<String>, dec: &mut dyn Decoder) -> Result<Value, CodecErr> {
    let mut encrypted = Encrypted::deserialize(dec)?;
    encrypted.open_at(self.key.as_ref(), dec.registry(), dec.depth())?;
    attach_name(self.variant.is_named(), name, Value::Element(encrypted.into()))
  }

  fn final_size_hint(&self) -> FinalSize {
    FinalSize::Variable
  }

  fn is_named(&self) -> bool {
    self.variant.is_named()
  }
}

impl Debug for DecryptingBuilder {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DecryptingBuilder")
      .field("variant", &self.variant)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    codec::BufferCodec,
    crypto::AesKey,
    structured::Document,
    util::{builtins, init_test_logger, round_trip},
    Element,
  };
  use rand::rngs::OsRng;
  use x25519_dalek::{PublicKey, StaticSecret};

  fn sample() -> Document {
    let mut doc = Document::new();
    doc.put("user", "ada").unwrap();
    doc.put("uid", 1815i32).unwrap();
    doc
  }

  #[test]
  fn x25519_round_trip() -> Result<(), CodecErr> {
    init_test_logger();
    let registry = builtins();
    let sk = StaticSecret::random_from_rng(OsRng);
    let pk = PublicKey::from(&sk);

    let encrypted = Encrypted::seal(Element::Doc(sample()), &pk, OsRng, &registry)?;
    let inner_len = Value::from(Element::Doc(sample())).total_size();
    assert_eq!(encrypted.sealed().len(), inner_len + pk.overhead());

    let bytes = round_trip(&Element::Encrypted(encrypted.clone()).into(), &registry);
    let mut decoded = match BufferCodec::decode(bytes, &registry)? {
      Value::Element(Element::Encrypted(decoded)) => decoded,
      other => panic!("{other:?}"),
    };
    assert!(!decoded.is_open());
    assert_eq!(
      decoded.open(&sk, &registry)?,
      &Value::Element(Element::Doc(sample()))
    );
    Ok(())
  }

  #[test]
  fn tampering_is_detected() -> Result<(), CodecErr> {
    let registry = builtins();
    let key = AesKey::new(OsRng);
    let encrypted = Encrypted::seal(Element::Long(-1), &key, OsRng, &registry)?;
    let mut bytes = BufferCodec::encode(&Element::Encrypted(encrypted).into(), &registry)?;
    // Flip a byte inside the ciphertext, past the length prefixes and IV.
    let index = 2 + 8 + 4 + 1 + 16;
    bytes[index] ^= 0x40;

    let mut sealed = match BufferCodec::decode(bytes, &registry)? {
      Value::Element(Element::Encrypted(sealed)) => sealed,
      other => panic!("{other:?}"),
    };
    assert_eq!(
      sealed.open(&key, &registry),
      Err(CodecErr::TransformFailure(Transform::Decrypt))
    );
    Ok(())
  }

  #[test]
  fn decrypting_builder_opens_nested_values() -> Result<(), CodecErr> {
    let plain = builtins();
    let key = AesKey::new(OsRng);
    let encrypted = Encrypted::seal(Element::Doc(sample()), &key, OsRng, &plain)?;
    let mut outer = Document::new();
    outer.put("secret", encrypted)?;
    let bytes = BufferCodec::encode(&Element::Doc(outer).into(), &plain)?;

    let mut wrong = Registry::with_builtins();
    DecryptingBuilder::install(&mut wrong, Arc::new(AesKey::new(OsRng)));
    assert_eq!(
      BufferCodec::decode(bytes.clone(), &Arc::new(wrong)),
      Err(CodecErr::TransformFailure(Transform::Decrypt))
    );

    let mut keyed = Registry::with_builtins();
    assert!(DecryptingBuilder::install(&mut keyed, Arc::new(key)));
    let outer = match BufferCodec::decode(bytes, &Arc::new(keyed))? {
      Value::Element(Element::Doc(outer)) => outer,
      other => panic!("{other:?}"),
    };
    match outer.get_value("secret") {
      Some(Element::Encrypted(inner)) => {
        assert_eq!(inner.value(), Some(&Value::Element(Element::Doc(sample()))))
      },
      other => panic!("{other:?}"),
    }
    Ok(())
  }
}
