//! Hybrid encryption to an X25519 public key: an ephemeral Diffie-Hellman
//! exchange yields an AES-256 key (SHA3-256 of the shared secret), which
//! seals the data as in [`AesKey`].
use crate::{
  crypto::{
    aes::{join_sealed, split_sealed, AES_MAC_LEN},
    aes_256ctr_decrypt, aes_256ctr_encrypt, AesIv, AesKey, DecryptionKey,
    EncryptionKey,
  },
  CodecErr,
};
use rand::{CryptoRng, RngCore};
use sha3::{Digest, Sha3_256};
use x25519_dalek::{EphemeralSecret, PublicKey, SharedSecret, StaticSecret};

/// The length of X25519 public and private keys
pub const X25519_KEY_LEN: usize = 32;

fn shared_key(ss: &SharedSecret) -> Result<(AesKey, AesIv), CodecErr> {
  let ss_hash = Sha3_256::digest(ss.as_bytes());
  let key = AesKey::from_bytes(&ss_hash[..])?;
  let iv = AesIv::from_ephemeral_key(&key);
  Ok((key, iv))
}

/// Sealed layout: `32u8, ephemeral_public_key[32], ciphertext, mac[32]`.
impl EncryptionKey for PublicKey {
  fn overhead(&self) -> usize {
    1 + X25519_KEY_LEN + AES_MAC_LEN
  }

  fn encrypt<R: RngCore + CryptoRng>(
    &self,
    rng: R,
    plaintext: &[u8],
  ) -> Result<Vec<u8>, CodecErr> {
    let eph_sk = EphemeralSecret::random_from_rng(rng);
    let eph_pk = PublicKey::from(&eph_sk);
    let (key, iv) = shared_key(&eph_sk.diffie_hellman(self))?;

    let mut data = plaintext.to_vec();
    let mac = aes_256ctr_encrypt(&key, &iv, &mut data);
    Ok(join_sealed(eph_pk.as_bytes(), &data, &mac))
  }
}

impl DecryptionKey for StaticSecret {
  fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, CodecErr> {
    let (eph_pk, ciphertext, mac) = split_sealed(sealed, X25519_KEY_LEN)?;
    let mut eph_pk_bytes = [0u8; X25519_KEY_LEN];
    eph_pk_bytes.copy_from_slice(eph_pk);
    let eph_pk = PublicKey::from(eph_pk_bytes);
    let (key, iv) = shared_key(&self.diffie_hellman(&eph_pk))?;

    let mut data = ciphertext.to_vec();
    aes_256ctr_decrypt(&key, &iv, &mac, &mut data)?;
    Ok(data)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{crypto::TEST_PLAINTEXT, util::init_test_logger, Transform};
  use rand::rngs::OsRng;

  /// Test round-trip encryption/decryption using an X25519 key.
  #[test]
  fn x25519_crypto() -> Result<(), CodecErr> {
    init_test_logger();
    let sk = StaticSecret::random_from_rng(OsRng);
    let pk = PublicKey::from(&sk);

    let sealed = pk.encrypt(OsRng, TEST_PLAINTEXT)?;
    assert_eq!(sealed.len(), TEST_PLAINTEXT.len() + pk.overhead());
    assert_eq!(sealed[0], 32);
    assert_eq!(sk.decrypt(&sealed)?, TEST_PLAINTEXT);

    let stranger = StaticSecret::random_from_rng(OsRng);
    assert_eq!(
      stranger.decrypt(&sealed),
      Err(CodecErr::TransformFailure(Transform::Decrypt))
    );
    Ok(())
  }
}
