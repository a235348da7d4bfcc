use crate::{
  codec::{Decoder, Encoder},
  CodecErr, FinalSize, Payload,
};
use std::{
  fmt::Debug,
  hash::{Hash, Hasher},
  mem::size_of,
};

/// A scalar that may appear as a vector, quaternion or matrix component.
///
/// Float components compare and hash by bit pattern.
pub trait Component: Copy + Debug + Default + Send + Sync + 'static {
  /// Encoded size of one component.
  const SIZE: usize;

  fn write<E: Encoder + ?Sized>(self, enc: &mut E) -> Result<(), CodecErr>;

  fn read(dec: &mut dyn Decoder) -> Result<Self, CodecErr>;

  fn same(self, other: Self) -> bool;

  fn hash_into<H: Hasher>(self, state: &mut H);
}

macro_rules! component {
  ($($ty:ty => $write:ident, $read:ident, $bits:expr;)*) => {$(
    impl Component for $ty {
      const SIZE: usize = size_of::<$ty>();

      fn write<E: Encoder + ?Sized>(self, enc: &mut E) -> Result<(), CodecErr> {
        enc.$write(self)
      }

      fn read(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
        dec.$read()
      }

      fn same(self, other: Self) -> bool {
        let bits: fn($ty) -> _ = $bits;
        bits(self) == bits(other)
      }

      fn hash_into<H: Hasher>(self, state: &mut H) {
        let bits: fn($ty) -> _ = $bits;
        bits(self).hash(state)
      }
    }
  )*};
}

component! {
  i32 => write_i32, read_i32, |v| v;
  i64 => write_i64, read_i64, |v| v;
  f32 => write_f32, read_f32, f32::to_bits;
  f64 => write_f64, read_f64, f64::to_bits;
}

/// Generates a fixed-arity component struct.  The payload is each component
/// in declaration order.
macro_rules! vector {
  ($(#[$meta:meta])* $name:ident { $($field:ident),+ } = $arity:literal) => {
    $(#[$meta])*
    #[derive(Copy, Clone, Debug, Default)]
    pub struct $name<T> {
      $(pub $field: T,)+
    }

    impl<T: Component> $name<T> {
      pub const fn new($($field: T),+) -> $name<T> {
        $name { $($field),+ }
      }

      /// Components in declaration order.
      pub fn to_array(self) -> [T; $arity] {
        [$(self.$field),+]
      }
    }

    impl<T: Component> From<[T; $arity]> for $name<T> {
      fn from(src: [T; $arity]) -> Self {
        let [$($field),+] = src;
        $name { $($field),+ }
      }
    }

    impl<T: Component> PartialEq for $name<T> {
      fn eq(&self, other: &Self) -> bool {
        true $(&& self.$field.same(other.$field))+
      }
    }

    impl<T: Component> Eq for $name<T> {}

    impl<T: Component> Hash for $name<T> {
      fn hash<H: Hasher>(&self, state: &mut H) {
        $(self.$field.hash_into(state);)+
      }
    }

    impl<T: Component> Payload for $name<T> {
      const FINAL_SIZE: FinalSize = FinalSize::Fixed($arity * T::SIZE);

      fn byte_size(&self) -> usize {
        $arity * T::SIZE
      }

      fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
        $(self.$field.write(enc)?;)+
        Ok(())
      }

      fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
        Ok($name { $($field: T::read(dec)?),+ })
      }

      identity_by_eq!();
    }
  };
}

vector! {
  /// Two-component vector.
  Vec2 { x, y } = 2
}

vector! {
  /// Three-component vector.
  Vec3 { x, y, z } = 3
}

vector! {
  /// Four-component vector.
  Vec4 { x, y, z, w } = 4
}

vector! {
  /// Rotation quaternion, `w` last.
  Quat { x, y, z, w } = 4
}

/// A 4x4 matrix of `f32`, row-major.
#[derive(Copy, Clone, Debug)]
pub struct Mat4f(pub [f32; 16]);

impl Mat4f {
  pub const IDENTITY: Mat4f = Mat4f([
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
  ]);

  /// Component at `row`, `col`, or `None` if either is 4 or greater.
  pub fn get(&self, row: usize, col: usize) -> Option<f32> {
    Mat4f::offset(row, col).ok().map(|index| self.0[index])
  }

  pub fn set(&mut self, row: usize, col: usize, value: f32) -> Result<(), CodecErr> {
    let index = Mat4f::offset(row, col)?;
    self.0[index] = value;
    Ok(())
  }

  fn offset(row: usize, col: usize) -> Result<usize, CodecErr> {
    if row < 4 && col < 4 {
      Ok(row * 4 + col)
    } else {
      Err(CodecErr::OutOfBounds {
        index:  row.saturating_mul(4).saturating_add(col),
        length: 16,
      })
    }
  }
}

impl Default for Mat4f {
  fn default() -> Self {
    Mat4f::IDENTITY
  }
}

impl PartialEq for Mat4f {
  fn eq(&self, other: &Self) -> bool {
    self.0.iter().zip(other.0.iter()).all(|(a, b)| Component::same(*a, *b))
  }
}

impl Eq for Mat4f {}

impl Hash for Mat4f {
  fn hash<H: Hasher>(&self, state: &mut H) {
    for v in self.0 {
      Component::hash_into(v, state);
    }
  }
}

impl Payload for Mat4f {
  const FINAL_SIZE: FinalSize = FinalSize::Fixed(16 * size_of::<f32>());

  fn byte_size(&self) -> usize {
    16 * size_of::<f32>()
  }

  fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
    for v in self.0 {
      enc.write_f32(v)?;
    }
    Ok(())
  }

  fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
    let mut values = [0f32; 16];
    for v in values.iter_mut() {
      *v = dec.read_f32()?;
    }
    Ok(Mat4f(values))
  }

  identity_by_eq!();
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    util::{builtins, round_trip},
    Element, Kind,
  };

  #[test]
  fn vectors_round_trip() {
    let registry = builtins();
    let elements: Vec<Element> = vec![
      Vec2::new(i32::MIN, 1).into(),
      Vec3::new(1i32, 2, 3).into(),
      Vec4::new(-1i64, 0, 1, 2).into(),
      Vec3::new(0.5f32, f32::INFINITY, -0.0).into(),
      Vec2::new(1.0f64, 2.0).into(),
      Quat::new(0.0f32, 0.0, 0.0, 1.0).into(),
      Quat::new(0.5f64, 0.5, 0.5, 0.5).into(),
      Mat4f::IDENTITY.into(),
    ];
    for element in elements {
      round_trip(&element.into(), &registry);
    }
  }

  #[test]
  fn vector_sizes_follow_component_width() {
    assert_eq!(Kind::Vec3i.final_size(), FinalSize::Fixed(12));
    assert_eq!(Kind::Vec3l.final_size(), FinalSize::Fixed(24));
    assert_eq!(Kind::Vec4d.final_size(), FinalSize::Fixed(32));
    assert_eq!(Kind::Quatf.final_size(), FinalSize::Fixed(16));
    assert_eq!(Kind::Mat4f.final_size(), FinalSize::Fixed(64));
  }

  #[test]
  fn matrix_access() {
    let mut m = Mat4f::IDENTITY;
    m.set(0, 3, 5.0).unwrap();
    assert_eq!(m.get(0, 3), Some(5.0));
    assert_eq!(m.get(3, 3), Some(1.0));
    assert_ne!(m, Mat4f::IDENTITY);
    assert_eq!(Vec2::from([1i32, 2]).to_array(), [1, 2]);
  }

  #[test]
  fn matrix_access_out_of_range_is_an_error() {
    let mut m = Mat4f::IDENTITY;
    assert_eq!(m.get(4, 0), None);
    assert_eq!(m.get(0, 4), None);
    assert_eq!(
      m.set(3, 4, 1.0),
      Err(CodecErr::OutOfBounds {
        index:  16,
        length: 16,
      })
    );
    assert_eq!(m, Mat4f::IDENTITY);
  }

  #[test]
  fn matrix_equality_is_bitwise() {
    let mut nan = Mat4f::IDENTITY;
    nan.set(1, 1, f32::NAN).unwrap();
    assert_eq!(nan, nan);
    let mut negative_zero = Mat4f::IDENTITY;
    negative_zero.set(0, 1, -0.0).unwrap();
    assert_ne!(negative_zero, Mat4f::IDENTITY);
  }
}
