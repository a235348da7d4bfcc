use crate::{
  codec::{Decoder, Encoder},
  collections::{read_member, MAX_PREALLOC},
  total_size, CodecErr, Element, FinalSize, Kind, Payload, DISCRIMINATOR_LEN,
};
use std::mem::size_of;

/// A fixed-length sequence whose slots may be empty.
///
/// On the wire each slot is a full element record, and an empty slot is the
/// null record.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Array {
  slots: Vec<Option<Element>>,
}

impl Array {
  /// Creates an array of `len` empty slots.
  pub fn new(len: usize) -> Array {
    Array {
      slots: vec![None; len],
    }
  }

  pub fn len(&self) -> usize {
    self.slots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }

  /// The element in slot `index`, if the slot exists and is filled.
  pub fn get(&self, index: usize) -> Option<&Element> {
    self.slots.get(index).and_then(Option::as_ref)
  }

  pub fn get_mut(&mut self, index: usize) -> Option<&mut Element> {
    self.slots.get_mut(index).and_then(Option::as_mut)
  }

  /// Fills (or empties, with `None`) slot `index`, returning what was there.
  pub fn set(
    &mut self,
    index: usize,
    element: Option<Element>,
  ) -> Result<Option<Element>, CodecErr> {
    let length = self.slots.len();
    match self.slots.get_mut(index) {
      Some(slot) => Ok(std::mem::replace(slot, element)),
      None => Err(err!(debug, CodecErr::OutOfBounds { index, length })),
    }
  }

  /// Empties slot `index`, returning its element.
  pub fn take(&mut self, index: usize) -> Option<Element> {
    self.slots.get_mut(index).and_then(Option::take)
  }

  /// Every slot in order, empty ones included.
  pub fn slots(&self) -> impl ExactSizeIterator<Item = Option<&Element>> {
    self.slots.iter().map(Option::as_ref)
  }

  /// Number of filled slots.
  pub fn filled(&self) -> usize {
    self.slots.iter().filter(|slot| slot.is_some()).count()
  }
}

impl From<Vec<Option<Element>>> for Array {
  fn from(slots: Vec<Option<Element>>) -> Self {
    Array { slots }
  }
}

impl FromIterator<Option<Element>> for Array {
  fn from_iter<T: IntoIterator<Item = Option<Element>>>(iter: T) -> Self {
    Array {
      slots: iter.into_iter().collect(),
    }
  }
}

impl Payload for Array {
  const FINAL_SIZE: FinalSize = FinalSize::Variable;

  fn byte_size(&self) -> usize {
    size_of::<i32>()
      + self
        .slots
        .iter()
        .map(|slot| match slot {
          Some(element) => total_size(element, None),
          None => DISCRIMINATOR_LEN,
        })
        .sum::<usize>()
  }

  fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
    enc.write_len(self.slots.len())?;
    for slot in self.slots.iter() {
      enc.write_optional(slot.as_ref())?;
    }
    Ok(())
  }

  fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
    let len = dec.read_len()?;
    let mut slots = Vec::with_capacity(len.min(MAX_PREALLOC));
    for _ in 0..len {
      slots.push(read_member(dec, Kind::Array)?);
    }
    Ok(Array { slots })
  }

  identity_by_eq!();
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::{builtins, round_trip};

  #[test]
  fn empty_slots_survive() {
    let registry = builtins();
    let mut array = Array::new(3);
    array.set(1, Some(Element::from("mid"))).unwrap();
    assert_eq!(array.filled(), 1);
    let bytes = round_trip(&Element::Array(array.clone()).into(), &registry);
    // disc + explicit len + count + null + string record + null
    assert_eq!(bytes.len(), 2 + 8 + 4 + 2 + (2 + 8 + 7) + 2);
    assert_eq!(array.get(0), None);
    assert_eq!(array.get(1), Some(&Element::from("mid")));
  }

  #[test]
  fn out_of_bounds_set() {
    let mut array = Array::new(1);
    assert_eq!(
      array.set(4, None),
      Err(CodecErr::OutOfBounds {
        index:  4,
        length: 1,
      })
    );
    assert_eq!(array.take(0), None);
  }

  #[test]
  fn tags_are_not_members() {
    let registry = builtins();
    let tag = crate::Tag::new("x", 1i32).unwrap();
    let mut buf = crate::codec::BufferCodec::new(64, registry);
    buf.write_len(1).unwrap();
    buf.write_tag(&tag).unwrap();
    assert_eq!(Array::deserialize(&mut buf), Err(CodecErr::UnexpectedTag));
  }
}
