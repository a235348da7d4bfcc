//! Generic record framing.
//!
//! ```text
//! discriminator   : int16   (0 = null; nothing follows)
//! name_length     : int16   (tags only)
//! name_bytes      : utf8    (tags only)
//! explicit_length : int64   (variable-size variants only)
//! payload         : exactly byte_size() bytes
//! ```

use crate::{
  codec::{Decoder, Encoder},
  registry::{VariantType, NULL_DISCRIMINATOR},
  CodecErr, Element, FinalSize, Value,
};

/// How many records may be open inside one another while decoding.
///
/// Every level costs several stack frames, so the limit has to hold on a
/// default 2 MiB thread stack in an unoptimized build.
pub const MAX_DEPTH: usize = 64;

/// Writes the record for `element`, as a tag if `name` is given.
///
/// Fails with [`CodecErr::NoMatchingDiscriminator`] if the encoder's registry
/// has no code for the element's variant type; nothing is written in that
/// case.
pub fn write_record<E>(
  enc: &mut E,
  element: &Element,
  name: Option<&str>,
) -> Result<(), CodecErr>
where
  E: Encoder + ?Sized,
{
  let variant = VariantType::new(element.kind(), name.is_some());
  let code = enc.registry().discriminator_of(variant);
  if code == NULL_DISCRIMINATOR {
    return Err(err!(debug, CodecErr::NoMatchingDiscriminator(variant)));
  }

  enc.write_u16(code)?;
  if let Some(name) = name {
    enc.write_short_string(name)?;
  }
  let size = element.byte_size();
  if element.final_size().is_variable() {
    let explicit =
      i64::try_from(size).map_err(|_| err!(debug, CodecErr::TooLarge(size)))?;
    enc.write_i64(explicit)?;
  }

  let start = enc.bytes_written();
  element.serialize(enc)?;
  let written = enc.bytes_written() - start;
  if written != size as u64 {
    return Err(err!(
      error,
      CodecErr::SizeMismatch {
        expected: size as u64,
        written,
      }
    ));
  }
  Ok(())
}

/// Reads one record, returning `None` for the null record.
///
/// The payload must consume exactly the declared explicit length (variable
/// variants) or the builder's fixed size, otherwise the stream is considered
/// corrupt and [`CodecErr::LengthMismatch`] is returned.  Records nested more
/// than [`MAX_DEPTH`] deep fail with [`CodecErr::TooDeep`].
pub fn read_record(dec: &mut dyn Decoder) -> Result<Option<Value>, CodecErr> {
  let code = dec.read_u16()?;
  if code == NULL_DISCRIMINATOR {
    return Ok(None);
  }
  let builder = dec.registry().builder_for(code)?;

  let name = if builder.is_named() {
    Some(dec.read_short_string()?)
  } else {
    None
  };
  let declared = match builder.final_size_hint() {
    FinalSize::Fixed(size) => size as u64,
    FinalSize::Variable => {
      let len = dec.read_i64()?;
      u64::try_from(len).map_err(|_| err!(debug, CodecErr::NegativeLength(len)))?
    },
  };

  let start = dec.bytes_read();
  let value = nested(dec, |dec| builder.build(name, dec))?;
  let consumed = dec.bytes_read() - start;
  if consumed != declared {
    return Err(err!(
      debug,
      CodecErr::LengthMismatch { declared, consumed }
    ));
  }
  log::trace!("Read record {code} ({consumed} bytes)");
  Ok(Some(value))
}

/// Runs `read` one nesting level deeper than `dec` currently is.
pub(crate) fn nested<T>(
  dec: &mut dyn Decoder,
  read: impl FnOnce(&mut dyn Decoder) -> Result<T, CodecErr>,
) -> Result<T, CodecErr> {
  let depth = dec.depth();
  if depth >= MAX_DEPTH {
    return Err(err!(debug, CodecErr::TooDeep { max_depth: MAX_DEPTH }));
  }
  dec.set_depth(depth + 1);
  let result = read(dec);
  dec.set_depth(depth);
  result
}
