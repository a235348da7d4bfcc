use crate::registry::VariantType;
use crate::value::Kind;
use std::{
  fmt::{Debug, Display, Formatter},
  io,
  num::TryFromIntError,
  str::Utf8Error,
  string::FromUtf8Error,
};

/// Which transform failed to invert its input.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Transform {
  /// The compressed bytes could not be inflated back to the original record.
  Inflate,
  /// The deciphered bytes did not form a valid record.
  Decipher,
  /// Authenticated decryption failed (wrong key or tampered ciphertext).
  Decrypt,
}

/// Various errors associated with encoding and decoding values.
//
// Note: Kept `Copy` so that errors can be compared in tests and cheaply
// returned from primitive reads.  I/O errors are reduced to their kind.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CodecErr {
  /// Decode encountered a discriminator with no registered builder.
  UnknownDiscriminator(u16),

  /// Encode was asked to write a value whose type has no discriminator in the
  /// active registry.
  NoMatchingDiscriminator(VariantType),

  /// Inflating or decrypting a transform blob failed.
  TransformFailure(Transform),

  /// The underlying stream reported an error.
  IoFailure(io::ErrorKind),

  /// The source ended before a read could be satisfied.
  UnexpectedEof {
    needed:    usize,
    available: usize,
  },

  /// A blocking read gave up after the configured timeout.
  TimedOut {
    needed: usize,
    read:   usize,
  },

  /// A write would have run past the end of a bounded buffer.
  BufferOverflow {
    needed:   usize,
    capacity: usize,
  },

  /// A length or count field held a negative value.
  NegativeLength(i64),

  /// Records were nested deeper than the decoder allows.
  TooDeep {
    max_depth: usize,
  },

  /// A record declared one length but its builder consumed another.
  LengthMismatch {
    declared: u64,
    consumed: u64,
  },

  /// A value wrote a different number of bytes than its `byte_size()`.
  SizeMismatch {
    expected: u64,
    written:  u64,
  },

  /// The encoded data contained a value which is not allowed.
  IllegalValue,

  /// Tag names must not be empty.
  EmptyName,

  /// Tag names must fit in a signed 16-bit length.
  NameTooLong(usize),

  /// Lengths and counts must fit in a signed 32-bit integer.
  TooLarge(usize),

  /// A tag record appeared where only elements are allowed.
  UnexpectedTag,

  /// An element record appeared where only tags are allowed.
  UnexpectedElement,

  /// A null record appeared where a value was required.
  UnexpectedNull,

  /// A value of one kind was found where another was required.
  UnexpectedKind {
    expected: Kind,
    observed: Kind,
  },

  /// Index past the end of an array.
  OutOfBounds {
    index:  usize,
    length: usize,
  },

  /// The inner type tag of an asymmetric key was not recognised.
  UnknownKeyType(u8),

  /// A key was provided that did not have the correct number of bytes for the
  /// algorithm used.
  CryptoKeyLength,

  /// Only `file:` URIs can be opened without a caller supplied opener.
  UnsupportedUriScheme,

  /// A builder was registered under a tag code but was handed no name, or the
  /// reverse.
  NameShapeMismatch,
}

impl Display for CodecErr {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    Debug::fmt(self, f)
  }
}

impl std::error::Error for CodecErr {}

impl From<io::Error> for CodecErr {
  fn from(src: io::Error) -> Self {
    match src.kind() {
      io::ErrorKind::UnexpectedEof => CodecErr::UnexpectedEof {
        needed:    0,
        available: 0,
      },
      kind => CodecErr::IoFailure(kind),
    }
  }
}

impl From<Utf8Error> for CodecErr {
  fn from(_src: Utf8Error) -> Self {
    CodecErr::IllegalValue
  }
}

impl From<FromUtf8Error> for CodecErr {
  fn from(_src: FromUtf8Error) -> Self {
    CodecErr::IllegalValue
  }
}

impl From<TryFromIntError> for CodecErr {
  fn from(_value: TryFromIntError) -> Self {
    CodecErr::IllegalValue
  }
}

impl CodecErr {
  /// Returns `true` for the error kinds that a decoder may treat as the loss
  /// of a single value rather than a corrupted stream.
  pub fn is_unknown_discriminator(&self) -> bool {
    matches!(self, CodecErr::UnknownDiscriminator(_))
  }
}
