use crate::{
  codec::{Decoder, Encoder},
  collections::{read_member, MAX_PREALLOC},
  total_size, CodecErr, Element, FinalSize, Kind, Payload,
};
use std::{mem::size_of, ops::Deref};

/// An ordered, growable sequence of elements.  Members are never null.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct List(Vec<Element>);

impl List {
  pub fn new() -> List {
    List(Vec::new())
  }

  pub fn push(&mut self, element: impl Into<Element>) {
    self.0.push(element.into())
  }

  pub fn insert(&mut self, index: usize, element: impl Into<Element>) -> Result<(), CodecErr> {
    let length = self.0.len();
    if index > length {
      return Err(err!(debug, CodecErr::OutOfBounds { index, length }));
    }
    self.0.insert(index, element.into());
    Ok(())
  }

  pub fn remove(&mut self, index: usize) -> Option<Element> {
    if index < self.0.len() {
      Some(self.0.remove(index))
    } else {
      None
    }
  }

  pub fn get_mut(&mut self, index: usize) -> Option<&mut Element> {
    self.0.get_mut(index)
  }

  pub fn into_vec(self) -> Vec<Element> {
    self.0
  }
}

impl Deref for List {
  type Target = [Element];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl From<Vec<Element>> for List {
  fn from(src: Vec<Element>) -> Self {
    List(src)
  }
}

impl FromIterator<Element> for List {
  fn from_iter<T: IntoIterator<Item = Element>>(iter: T) -> Self {
    List(iter.into_iter().collect())
  }
}

impl IntoIterator for List {
  type Item = Element;
  type IntoIter = std::vec::IntoIter<Element>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.into_iter()
  }
}

impl Payload for List {
  const FINAL_SIZE: FinalSize = FinalSize::Variable;

  fn byte_size(&self) -> usize {
    size_of::<i32>()
      + self
        .0
        .iter()
        .map(|element| total_size(element, None))
        .sum::<usize>()
  }

  fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
    enc.write_len(self.0.len())?;
    for element in self.0.iter() {
      enc.write_element(element)?;
    }
    Ok(())
  }

  fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
    let count = dec.read_len()?;
    let mut members = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
      match read_member(dec, Kind::List)? {
        Some(element) => members.push(element),
        None => return Err(err!(debug, CodecErr::UnexpectedNull)),
      }
    }
    Ok(List(members))
  }

  identity_by_eq!();
}
