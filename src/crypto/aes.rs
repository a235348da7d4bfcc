//! AES-256 in CTR mode, with a BLAKE3 hash of the plaintext as the message
//! authentication code (MAC-then-encrypt).
use crate::{
  crypto::{Cipher, DecryptionKey, EncryptionKey},
  util::debug::ShortHexDump,
  CodecErr, Transform,
};
use aes::cipher::{KeyIvInit, StreamCipher};
use std::fmt::{Debug, Formatter};
use rand::{CryptoRng, RngCore};

/// The size of an AES block (independent of key length).
pub(crate) const AES_BLOCK_SIZE: usize = 16;

/// The size of an AES-256 key.
pub const AES_KEY_LEN: usize = 32;

/// The size of an [`AesMac`].
pub const AES_MAC_LEN: usize = blake3::OUT_LEN;

type Aes256Ctr = ctr::Ctr128BE<::aes::Aes256>;

/// An AES-256 key.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct AesKey([u8; AES_KEY_LEN]);

impl AesKey {
  /// Generate a new random AES key
  pub fn new<R>(mut rng: R) -> AesKey
  where
    R: RngCore + CryptoRng,
  {
    let mut key = AesKey([0u8; AES_KEY_LEN]);
    rng.fill_bytes(&mut key.0[..]);
    key
  }

  /// Returns the bytes of the key as a byte slice.
  pub fn bytes(&self) -> &[u8] {
    &self.0[..]
  }

  /// Creates a new key from a 32-byte byte slice (256-bit key).
  pub fn from_bytes(bytes: &[u8]) -> Result<AesKey, CodecErr> {
    let bytes: [u8; AES_KEY_LEN] = bytes
      .try_into()
      .map_err(|_| err!(trace, CodecErr::CryptoKeyLength))?;
    Ok(AesKey(bytes))
  }
}

impl From<[u8; AES_KEY_LEN]> for AesKey {
  fn from(src: [u8; AES_KEY_LEN]) -> Self {
    AesKey(src)
  }
}

impl Debug for AesKey {
  fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
    write!(f, "AesKey({:?})", ShortHexDump(&self.0[..4], 4))
  }
}

/// An AES initialization vector.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct AesIv([u8; AES_BLOCK_SIZE]);

impl AesIv {
  /// Generate a new random IV
  pub fn new<R>(mut rng: R) -> AesIv
  where
    R: RngCore + CryptoRng,
  {
    let mut iv = AesIv([0u8; AES_BLOCK_SIZE]);
    rng.fill_bytes(&mut iv.0[..]);
    iv
  }

  /// Generates an IV based on hashing an ephemeral key.
  ///
  /// Take care that this function is not used with a static (predictable) key,
  /// such as those based on passwords, as this enables a variety of
  /// cryptographic attacks.
  pub fn from_ephemeral_key(key: &AesKey) -> AesIv {
    let key_hash = blake3::hash(key.bytes());
    let mut iv = AesIv([0u8; AES_BLOCK_SIZE]);
    iv.0.copy_from_slice(&key_hash.as_bytes()[..AES_BLOCK_SIZE]);
    iv
  }

  pub fn from_bytes(bytes: &[u8]) -> Result<AesIv, CodecErr> {
    let bytes: [u8; AES_BLOCK_SIZE] = bytes
      .try_into()
      .map_err(|_| err!(trace, CodecErr::CryptoKeyLength))?;
    Ok(AesIv(bytes))
  }

  /// The contents of the initialization vector, as a slice of 16 bytes.
  pub fn bytes(&self) -> &[u8] {
    &self.0[..]
  }
}

impl From<[u8; AES_BLOCK_SIZE]> for AesIv {
  fn from(src: [u8; AES_BLOCK_SIZE]) -> Self {
    AesIv(src)
  }
}

impl Debug for AesIv {
  fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
    write!(f, "AesIV({:?})", ShortHexDump(&self.0[..], 4))
  }
}

/// A message authentication code: the encrypted BLAKE3 hash of the
/// plaintext.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct AesMac(pub(crate) [u8; AES_MAC_LEN]);

impl Debug for AesMac {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "AesMac({:?})", &ShortHexDump(&self.0[..], 4))
  }
}

/// Common AES-256 encryption function.
///
/// Encrypts data in place and returns the [`AesMac`].
pub fn aes_256ctr_encrypt(key: &AesKey, iv: &AesIv, data: &mut [u8]) -> AesMac {
  let hash = blake3::hash(data);
  let mut crypter = Aes256Ctr::new(key.bytes().into(), iv.bytes().into());
  crypter.apply_keystream(data);
  let mut mac = AesMac(*hash.as_bytes());
  crypter.apply_keystream(&mut mac.0[..]);
  mac
}

/// Common AES-256 decryption function.
///
/// Decrypts the data in place.  Returns an error if the ciphertext is invalid,
/// in which case `data` will then contain the invalid plaintext.
pub fn aes_256ctr_decrypt(
  key: &AesKey,
  iv: &AesIv,
  stored_mac: &AesMac,
  data: &mut [u8],
) -> Result<(), CodecErr> {
  let mut crypter = Aes256Ctr::new(key.bytes().into(), iv.bytes().into());
  crypter.apply_keystream(data);
  let mut decrypted_mac = *stored_mac;
  crypter.apply_keystream(&mut decrypted_mac.0[..]);
  // `blake3::Hash` equality is constant time.
  if blake3::hash(data) == blake3::Hash::from(decrypted_mac.0) {
    Ok(())
  } else {
    Err(err!(trace, CodecErr::TransformFailure(Transform::Decrypt)))
  }
}

/// Splits sealed bytes of the form `nonce_len:u8, nonce, ciphertext, mac`.
pub(crate) fn split_sealed(
  sealed: &[u8],
  nonce_len: usize,
) -> Result<(&[u8], &[u8], AesMac), CodecErr> {
  let malformed = || err!(debug, CodecErr::TransformFailure(Transform::Decrypt));
  let (&declared, rest) = sealed.split_first().ok_or_else(malformed)?;
  if usize::from(declared) != nonce_len || rest.len() < nonce_len + AES_MAC_LEN {
    return Err(malformed());
  }
  let (nonce, rest) = rest.split_at(nonce_len);
  let (ciphertext, mac) = rest.split_at(rest.len() - AES_MAC_LEN);
  let mut mac_bytes = [0u8; AES_MAC_LEN];
  mac_bytes.copy_from_slice(mac);
  Ok((nonce, ciphertext, AesMac(mac_bytes)))
}

/// Joins `nonce_len:u8, nonce, ciphertext, mac`.
pub(crate) fn join_sealed(nonce: &[u8], ciphertext: &[u8], mac: &AesMac) -> Vec<u8> {
  let mut sealed = Vec::with_capacity(1 + nonce.len() + ciphertext.len() + AES_MAC_LEN);
  sealed.push(nonce.len() as u8);
  sealed.extend_from_slice(nonce);
  sealed.extend_from_slice(ciphertext);
  sealed.extend_from_slice(&mac.0);
  sealed
}

/// Sealed layout: `16u8, iv[16], ciphertext, mac[32]`.  A fresh random IV is
/// drawn for every call.
impl EncryptionKey for AesKey {
  fn overhead(&self) -> usize {
    1 + AES_BLOCK_SIZE + AES_MAC_LEN
  }

  fn encrypt<R: RngCore + CryptoRng>(
    &self,
    rng: R,
    plaintext: &[u8],
  ) -> Result<Vec<u8>, CodecErr> {
    let iv = AesIv::new(rng);
    let mut data = plaintext.to_vec();
    let mac = aes_256ctr_encrypt(self, &iv, &mut data);
    Ok(join_sealed(iv.bytes(), &data, &mac))
  }
}

impl DecryptionKey for AesKey {
  fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, CodecErr> {
    let (iv, ciphertext, mac) = split_sealed(sealed, AES_BLOCK_SIZE)?;
    let iv = AesIv::from_bytes(iv)?;
    let mut data = ciphertext.to_vec();
    aes_256ctr_decrypt(self, &iv, &mac, &mut data)?;
    Ok(data)
  }
}

/// Unauthenticated AES-256-CTR with a fixed key and IV.
///
/// Each call starts a fresh keystream at `iv`, so encrypting the same
/// plaintext twice yields the same ciphertext.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AesCtrCipher {
  key: AesKey,
  iv:  AesIv,
}

impl AesCtrCipher {
  pub fn new(key: AesKey, iv: AesIv) -> AesCtrCipher {
    AesCtrCipher { key, iv }
  }

  fn apply(&self, input: &[u8]) -> Vec<u8> {
    let mut data = input.to_vec();
    let mut crypter = Aes256Ctr::new(self.key.bytes().into(), self.iv.bytes().into());
    crypter.apply_keystream(&mut data);
    data
  }
}

impl Cipher for AesCtrCipher {
  fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CodecErr> {
    Ok(self.apply(plaintext))
  }

  fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CodecErr> {
    Ok(self.apply(ciphertext))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{crypto::TEST_PLAINTEXT, util::init_test_logger};
  use rand::rngs::OsRng;

  #[test]
  fn aes_crypt() -> Result<(), CodecErr> {
    init_test_logger();
    let mut buffer = Vec::from(TEST_PLAINTEXT);

    let key = AesKey::new(OsRng);
    let iv = AesIv::new(OsRng);
    dbg!(&key, &iv);

    let mac = aes_256ctr_encrypt(&key, &iv, &mut buffer[..]);
    println!("Ciphertext: {:?}", ShortHexDump(buffer.as_slice(), 4));
    assert_ne!(&buffer[..], TEST_PLAINTEXT);

    aes_256ctr_decrypt(&key, &iv, &mac, &mut buffer[..])?;
    assert_eq!(&buffer[..], TEST_PLAINTEXT);
    Ok(())
  }

  #[test]
  fn sealed_layout_and_tamper() -> Result<(), CodecErr> {
    let key = AesKey::new(OsRng);
    let mut sealed = key.encrypt(OsRng, TEST_PLAINTEXT)?;
    assert_eq!(sealed.len(), TEST_PLAINTEXT.len() + key.overhead());
    assert_eq!(sealed[0], 16);
    assert_eq!(key.decrypt(&sealed)?, TEST_PLAINTEXT);

    sealed[20] ^= 0x01;
    assert_eq!(
      key.decrypt(&sealed),
      Err(CodecErr::TransformFailure(Transform::Decrypt))
    );
    assert_eq!(
      key.decrypt(&sealed[..10]),
      Err(CodecErr::TransformFailure(Transform::Decrypt))
    );
    let other = AesKey::new(OsRng);
    sealed[20] ^= 0x01;
    assert!(other.decrypt(&sealed).is_err());
    Ok(())
  }

  #[test]
  fn ctr_cipher_is_deterministic() -> Result<(), CodecErr> {
    let cipher = AesCtrCipher::new(AesKey::from([7u8; 32]), AesIv::from([1u8; 16]));
    let a = cipher.encrypt(TEST_PLAINTEXT)?;
    let b = cipher.encrypt(TEST_PLAINTEXT)?;
    assert_eq!(a, b);
    assert_eq!(a.len(), TEST_PLAINTEXT.len());
    assert_eq!(cipher.decrypt(&a)?, TEST_PLAINTEXT);
    Ok(())
  }

  #[test]
  fn key_lengths_are_checked() {
    assert_eq!(AesKey::from_bytes(&[0u8; 31]), Err(CodecErr::CryptoKeyLength));
    assert_eq!(AesIv::from_bytes(&[0u8; 17]), Err(CodecErr::CryptoKeyLength));
  }
}
