//! Collection types: arrays with empty slots, lists, sets, and maps.
//!
//! Members are anonymous [`Element`]s.  Array, list and set payloads carry no
//! per-member length, so a member whose discriminator is unknown cannot be
//! skipped: decoding the whole collection fails.  Map entries carry their own
//! length and survive unknown members (see [`Map`]).

mod array;
mod list;
mod map;
mod set;

pub use self::{array::*, list::*, map::*, set::*};

use crate::{codec::Decoder, CodecErr, Element, Kind};
use siphasher::sip::SipHasher13;
use std::hash::{Hash, Hasher};

/// Largest number of members reserved up front from an untrusted count.
pub(crate) const MAX_PREALLOC: usize = 1024;

/// Reads one member record for a collection of kind `container`.
///
/// An unknown discriminator loses the remainder of the stream, so it is
/// logged here and propagated.
pub(crate) fn read_member(
  dec: &mut dyn Decoder,
  container: Kind,
) -> Result<Option<Element>, CodecErr> {
  dec.read_element().map_err(|err| {
    if err.is_unknown_discriminator() {
      log::warn!("Cannot skip {container:?} member with {err:?}; decode aborted");
    }
    err
  })
}

/// An order-independent hash of `items`: the wrapping sum of each item's own
/// SipHash-1-3.
pub(crate) fn unordered_hash<'a, T, I, H>(items: I, state: &mut H)
where
  T: Hash + 'a,
  I: ExactSizeIterator<Item = &'a T>,
  H: Hasher,
{
  state.write_usize(items.len());
  let mut sum = 0u64;
  for item in items {
    let mut hasher = SipHasher13::new();
    item.hash(&mut hasher);
    sum = sum.wrapping_add(hasher.finish());
  }
  state.write_u64(sum);
}
