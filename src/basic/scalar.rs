use crate::{
  codec::{Decoder, Encoder},
  CodecErr, FinalSize, Payload,
};
use std::{hash::Hasher, mem::size_of};

/// Big-endian two's-complement integers.
macro_rules! int_payload {
  ($($ty:ty => $write:ident, $read:ident;)*) => {$(
    impl Payload for $ty {
      const FINAL_SIZE: FinalSize = FinalSize::Fixed(size_of::<$ty>());

      fn byte_size(&self) -> usize {
        size_of::<$ty>()
      }

      fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
        enc.$write(*self)
      }

      fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
        dec.$read()
      }

      identity_by_eq!();
    }
  )*};
}

int_payload! {
  i8 => write_i8, read_i8;
  i16 => write_i16, read_i16;
  i32 => write_i32, read_i32;
  i64 => write_i64, read_i64;
  bool => write_bool, read_bool;
}

/// IEEE-754 floats.  Identity is by bit pattern.
macro_rules! float_payload {
  ($($ty:ty => $write:ident, $read:ident;)*) => {$(
    impl Payload for $ty {
      const FINAL_SIZE: FinalSize = FinalSize::Fixed(size_of::<$ty>());

      fn byte_size(&self) -> usize {
        size_of::<$ty>()
      }

      fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
        enc.$write(*self)
      }

      fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
        dec.$read()
      }

      fn same(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
      }

      fn hash_into<H: Hasher>(&self, state: &mut H) {
        ::core::hash::Hash::hash(&self.to_bits(), state)
      }
    }
  )*};
}

float_payload! {
  f32 => write_f32, read_f32;
  f64 => write_f64, read_f64;
}

/// `int32` byte length followed by UTF-8.
impl Payload for String {
  const FINAL_SIZE: FinalSize = FinalSize::Variable;

  fn byte_size(&self) -> usize {
    size_of::<i32>() + self.len()
  }

  fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
    enc.write_string(self)
  }

  fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
    dec.read_string()
  }

  identity_by_eq!();
}

/// `int32` byte length followed by the bytes.
impl Payload for Vec<u8> {
  const FINAL_SIZE: FinalSize = FinalSize::Variable;

  fn byte_size(&self) -> usize {
    size_of::<i32>() + self.len()
  }

  fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
    enc.write_blob(self)
  }

  fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
    dec.read_blob()
  }

  identity_by_eq!();
}
