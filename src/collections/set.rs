use crate::{
  codec::{Decoder, Encoder},
  collections::{read_member, unordered_hash, MAX_PREALLOC},
  total_size, CodecErr, Element, FinalSize, Kind, Payload,
};
use std::{
  collections::HashMap,
  fmt::{Debug, Formatter},
  hash::{Hash, Hasher},
  mem::size_of,
};

/// An unordered collection of distinct elements.
///
/// Iteration follows insertion order, but equality and hashing do not depend
/// on it.
#[derive(Clone, Default)]
pub struct Set {
  members: Vec<Element>,
  index:   HashMap<Element, usize>,
}

impl Set {
  pub fn new() -> Set {
    Set::default()
  }

  fn with_capacity(capacity: usize) -> Set {
    Set {
      members: Vec::with_capacity(capacity),
      index:   HashMap::with_capacity(capacity),
    }
  }

  /// Adds `element`, returning `false` if an equal element was present.
  pub fn insert(&mut self, element: impl Into<Element>) -> bool {
    let element = element.into();
    if self.index.contains_key(&element) {
      return false;
    }
    self.index.insert(element.clone(), self.members.len());
    self.members.push(element);
    true
  }

  pub fn contains(&self, element: &Element) -> bool {
    self.index.contains_key(element)
  }

  pub fn remove(&mut self, element: &Element) -> bool {
    let Some(i) = self.index.remove(element) else {
      return false;
    };
    self.members.swap_remove(i);
    if let Some(moved) = self.members.get(i) {
      self.index.insert(moved.clone(), i);
    }
    true
  }

  pub fn len(&self) -> usize {
    self.members.len()
  }

  pub fn is_empty(&self) -> bool {
    self.members.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Element> {
    self.members.iter()
  }
}

impl PartialEq for Set {
  fn eq(&self, other: &Self) -> bool {
    self.len() == other.len() && self.members.iter().all(|e| other.contains(e))
  }
}

impl Eq for Set {}

impl Debug for Set {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_set().entries(self.members.iter()).finish()
  }
}

impl Hash for Set {
  fn hash<H: Hasher>(&self, state: &mut H) {
    unordered_hash(self.members.iter(), state)
  }
}

impl FromIterator<Element> for Set {
  fn from_iter<T: IntoIterator<Item = Element>>(iter: T) -> Self {
    let mut set = Set::new();
    for element in iter {
      set.insert(element);
    }
    set
  }
}

impl Payload for Set {
  const FINAL_SIZE: FinalSize = FinalSize::Variable;

  fn byte_size(&self) -> usize {
    size_of::<i32>()
      + self
        .members
        .iter()
        .map(|element| total_size(element, None))
        .sum::<usize>()
  }

  fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
    enc.write_len(self.members.len())?;
    for element in self.members.iter() {
      enc.write_element(element)?;
    }
    Ok(())
  }

  fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
    let count = dec.read_len()?;
    let mut set = Set::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
      match read_member(dec, Kind::Set)? {
        Some(element) => {
          if !set.insert(element) {
            log::debug!("Dropped duplicate set member");
          }
        },
        None => return Err(err!(debug, CodecErr::UnexpectedNull)),
      }
    }
    Ok(set)
  }

  identity_by_eq!();
}
