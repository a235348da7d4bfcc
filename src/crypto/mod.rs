//! Cryptographic key material and the cipher collaborators used by the
//! transform wrappers.
//!
//! - Key payloads: [`PrivateKey`] / [`PublicKey`] (RSA or DSA, big-integer
//!   components), [`SecretKey`], [`InitVector`].
//! - [`Cipher`]: a symmetric stream cipher applied byte for byte, used by
//!   [`Ciphered`](crate::transform::Ciphered).  [`AesCtrCipher`] is the
//!   provided implementation.
//! - [`EncryptionKey`] / [`DecryptionKey`]: authenticated encryption used by
//!   [`Encrypted`](crate::transform::Encrypted).  Implemented for [`AesKey`]
//!   and for X25519 key pairs.

mod aes;
mod keys;
mod x25519;

pub use self::{aes::*, keys::*, x25519::*};

use crate::CodecErr;
use rand::{CryptoRng, RngCore};

/// A symmetric stream cipher.  Output has the same length as input.
///
/// Implementations must start from a fresh keystream on every call, so that
/// a cipher can be shared between encode and decode calls.
pub trait Cipher {
  fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CodecErr>;

  fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CodecErr>;
}

/// A key capable of performing authenticated encryption.
pub trait EncryptionKey {
  /// Bytes `encrypt()` adds to the length of its input.
  fn overhead(&self) -> usize;

  /// Encrypts `plaintext`, returning self-contained sealed bytes: everything
  /// the matching [`DecryptionKey`] needs besides itself.
  fn encrypt<R: RngCore + CryptoRng>(
    &self,
    rng: R,
    plaintext: &[u8],
  ) -> Result<Vec<u8>, CodecErr>;
}

/// A key capable of reversing [`EncryptionKey::encrypt()`].
pub trait DecryptionKey {
  /// Fails with [`CodecErr::TransformFailure`] if `sealed` was not produced
  /// for this key or has been altered.
  fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, CodecErr>;
}

#[cfg(test)]
pub(crate) const TEST_PLAINTEXT: &[u8] =
  b"It was a bright cold day in April, and the clocks were striking thirteen.";
