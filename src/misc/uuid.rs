use crate::{
  codec::{Decoder, Encoder},
  CodecErr, FinalSize, Payload,
};
use std::mem::size_of;
use uuid::Uuid;

/// Two big-endian 64-bit words, most significant first: the RFC 4122 byte
/// order.
impl Payload for Uuid {
  const FINAL_SIZE: FinalSize = FinalSize::Fixed(size_of::<Uuid>());

  fn byte_size(&self) -> usize {
    size_of::<Uuid>()
  }

  fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
    let (msb, lsb) = self.as_u64_pair();
    enc.write_u64(msb)?;
    enc.write_u64(lsb)
  }

  fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
    let msb = dec.read_u64()?;
    let lsb = dec.read_u64()?;
    Ok(Uuid::from_u64_pair(msb, lsb))
  }

  identity_by_eq!();
}

#[cfg(test)]
mod tests {
  use crate::{
    util::{builtins, round_trip},
    Element,
  };
  use uuid::Uuid;

  #[test]
  fn uuid_bytes_are_rfc_order() {
    let uuid = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
    let bytes = round_trip(&Element::Uuid(uuid).into(), &builtins());
    assert_eq!(&bytes[..2], &[0, 10]);
    assert_eq!(&bytes[2..], uuid.as_bytes());
  }
}
