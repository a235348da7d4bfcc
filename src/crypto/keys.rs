//! Key material payloads.
//!
//! Asymmetric keys carry a one byte inner type tag followed by their
//! components, each an `int32` length and two's-complement big-endian bytes:
//!
//! | tag | private                         | public                         |
//! |-----|---------------------------------|--------------------------------|
//! | 1   | RSA `modulus, private_exponent` | RSA `modulus, public_exponent` |
//! | 2   | DSA `x, p, q, g`                | DSA `y, p, q, g`               |
use crate::{
  codec::{Decoder, Encoder},
  crypto::{AesIv, AesKey},
  util::debug::ShortHexDump,
  CodecErr, FinalSize, Payload,
};
use std::{
  fmt::{Debug, Formatter},
  mem::size_of,
};

const RSA_KEY_TYPE: u8 = 1;
const DSA_KEY_TYPE: u8 = 2;

/// An arbitrary precision signed integer, held as its minimal
/// two's-complement big-endian bytes.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct BigInteger(Vec<u8>);

impl BigInteger {
  /// Interprets `bytes` as a two's-complement big-endian integer.
  pub fn from_signed_bytes(bytes: &[u8]) -> BigInteger {
    // Drop sign-extension bytes that do not change the value.
    let mut start = 0;
    while start + 1 < bytes.len() {
      let (lead, next) = (bytes[start], bytes[start + 1]);
      if (lead == 0x00 && next < 0x80) || (lead == 0xFF && next >= 0x80) {
        start += 1;
      } else {
        break;
      }
    }
    match &bytes[start..] {
      [] => BigInteger(vec![0]),
      minimal => BigInteger(minimal.to_vec()),
    }
  }

  /// Interprets `bytes` as an unsigned big-endian magnitude.
  pub fn from_unsigned_bytes(bytes: &[u8]) -> BigInteger {
    let mut signed = Vec::with_capacity(bytes.len() + 1);
    signed.push(0);
    signed.extend_from_slice(bytes);
    BigInteger::from_signed_bytes(&signed)
  }

  /// Minimal two's-complement big-endian bytes.  Zero is a single `0x00`.
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }

  pub fn is_negative(&self) -> bool {
    self.0[0] >= 0x80
  }
}

impl From<i64> for BigInteger {
  fn from(src: i64) -> Self {
    BigInteger::from_signed_bytes(&src.to_be_bytes())
  }
}

impl From<u64> for BigInteger {
  fn from(src: u64) -> Self {
    BigInteger::from_unsigned_bytes(&src.to_be_bytes())
  }
}

impl Debug for BigInteger {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "BigInteger({:?})", ShortHexDump(&self.0, 8))
  }
}

fn component_size(component: &BigInteger) -> usize {
  size_of::<i32>() + component.0.len()
}

fn write_components<E: Encoder + ?Sized>(
  enc: &mut E,
  key_type: u8,
  components: &[&BigInteger],
) -> Result<(), CodecErr> {
  enc.write_u8(key_type)?;
  for component in components {
    enc.write_blob(&component.0)?;
  }
  Ok(())
}

fn read_component(dec: &mut dyn Decoder) -> Result<BigInteger, CodecErr> {
  let bytes = dec.read_blob()?;
  if bytes.is_empty() {
    return Err(err!(debug, CodecErr::IllegalValue));
  }
  Ok(BigInteger::from_signed_bytes(&bytes))
}

/// An asymmetric private key.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum PrivateKey {
  Rsa {
    modulus:          BigInteger,
    private_exponent: BigInteger,
  },
  Dsa {
    x: BigInteger,
    p: BigInteger,
    q: BigInteger,
    g: BigInteger,
  },
}

impl PrivateKey {
  fn parts(&self) -> (u8, Vec<&BigInteger>) {
    match self {
      PrivateKey::Rsa {
        modulus,
        private_exponent,
      } => (RSA_KEY_TYPE, vec![modulus, private_exponent]),
      PrivateKey::Dsa { x, p, q, g } => (DSA_KEY_TYPE, vec![x, p, q, g]),
    }
  }
}

impl Payload for PrivateKey {
  const FINAL_SIZE: FinalSize = FinalSize::Variable;

  fn byte_size(&self) -> usize {
    let (_, components) = self.parts();
    size_of::<u8>() + components.into_iter().map(component_size).sum::<usize>()
  }

  fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
    let (key_type, components) = self.parts();
    write_components(enc, key_type, &components)
  }

  fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
    match dec.read_u8()? {
      RSA_KEY_TYPE => Ok(PrivateKey::Rsa {
        modulus:          read_component(dec)?,
        private_exponent: read_component(dec)?,
      }),
      DSA_KEY_TYPE => Ok(PrivateKey::Dsa {
        x: read_component(dec)?,
        p: read_component(dec)?,
        q: read_component(dec)?,
        g: read_component(dec)?,
      }),
      other => Err(err!(debug, CodecErr::UnknownKeyType(other))),
    }
  }

  identity_by_eq!();
}

/// An asymmetric public key.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum PublicKey {
  Rsa {
    modulus:         BigInteger,
    public_exponent: BigInteger,
  },
  Dsa {
    y: BigInteger,
    p: BigInteger,
    q: BigInteger,
    g: BigInteger,
  },
}

impl PublicKey {
  fn parts(&self) -> (u8, Vec<&BigInteger>) {
    match self {
      PublicKey::Rsa {
        modulus,
        public_exponent,
      } => (RSA_KEY_TYPE, vec![modulus, public_exponent]),
      PublicKey::Dsa { y, p, q, g } => (DSA_KEY_TYPE, vec![y, p, q, g]),
    }
  }
}

impl Payload for PublicKey {
  const FINAL_SIZE: FinalSize = FinalSize::Variable;

  fn byte_size(&self) -> usize {
    let (_, components) = self.parts();
    size_of::<u8>() + components.into_iter().map(component_size).sum::<usize>()
  }

  fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
    let (key_type, components) = self.parts();
    write_components(enc, key_type, &components)
  }

  fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
    match dec.read_u8()? {
      RSA_KEY_TYPE => Ok(PublicKey::Rsa {
        modulus:         read_component(dec)?,
        public_exponent: read_component(dec)?,
      }),
      DSA_KEY_TYPE => Ok(PublicKey::Dsa {
        y: read_component(dec)?,
        p: read_component(dec)?,
        q: read_component(dec)?,
        g: read_component(dec)?,
      }),
      other => Err(err!(debug, CodecErr::UnknownKeyType(other))),
    }
  }

  identity_by_eq!();
}

/// A symmetric key: an algorithm name and the raw key bytes.
///
/// Payload: `int16` length and UTF-8 algorithm, then `int32` length and key.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct SecretKey {
  pub algorithm: String,
  pub key:       Vec<u8>,
}

impl SecretKey {
  pub fn new(algorithm: impl Into<String>, key: impl Into<Vec<u8>>) -> SecretKey {
    SecretKey {
      algorithm: algorithm.into(),
      key:       key.into(),
    }
  }
}

impl From<&AesKey> for SecretKey {
  fn from(src: &AesKey) -> Self {
    SecretKey::new("AES", src.bytes())
  }
}

impl TryFrom<&SecretKey> for AesKey {
  type Error = CodecErr;

  fn try_from(value: &SecretKey) -> Result<Self, Self::Error> {
    AesKey::from_bytes(&value.key)
  }
}

impl Debug for SecretKey {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "SecretKey({}, {} bytes)", self.algorithm, self.key.len())
  }
}

impl Payload for SecretKey {
  const FINAL_SIZE: FinalSize = FinalSize::Variable;

  fn byte_size(&self) -> usize {
    size_of::<i16>() + self.algorithm.len() + size_of::<i32>() + self.key.len()
  }

  fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
    enc.write_short_string(&self.algorithm)?;
    enc.write_blob(&self.key)
  }

  fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
    Ok(SecretKey {
      algorithm: dec.read_short_string()?,
      key:       dec.read_blob()?,
    })
  }

  identity_by_eq!();
}

/// An initialization vector.  Payload: `int32` length and bytes.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct InitVector(pub Vec<u8>);

impl From<&AesIv> for InitVector {
  fn from(src: &AesIv) -> Self {
    InitVector(src.bytes().to_vec())
  }
}

impl TryFrom<&InitVector> for AesIv {
  type Error = CodecErr;

  fn try_from(value: &InitVector) -> Result<Self, Self::Error> {
    AesIv::from_bytes(&value.0)
  }
}

impl Debug for InitVector {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "InitVector({:?})", ShortHexDump(&self.0, 4))
  }
}

impl Payload for InitVector {
  const FINAL_SIZE: FinalSize = FinalSize::Variable;

  fn byte_size(&self) -> usize {
    self.0.byte_size()
  }

  fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
    self.0.serialize(enc)
  }

  fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
    Ok(InitVector(Vec::<u8>::deserialize(dec)?))
  }

  identity_by_eq!();
}
