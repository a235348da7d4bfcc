/// A macro wrapper for returning an [`Result::Err`] that allows logging of
/// errors.
///
/// In debug builds, before the error is handed back, a call is made to the
/// [`log`] macro for `$level` describing the error and where it came from.
/// With the `backtrace` feature enabled a stack backtrace follows at the
/// same level.
///
/// Usage:  `err!(trace, U) -> U`.
macro_rules! err {
  ($level:ident, $error:expr) => {{
    let error = $error;

    #[cfg(debug_assertions)]
    {
      ::log::$level!("{}:{}: {:?}", file!(), line!(), &error);
      #[cfg(feature = "backtrace")]
      {
        if ::log::log_enabled!(::log::Level::Trace) {
          let bt = ::backtrace::Backtrace::new();
          ::log::$level!("{:?}", bt);
        }
      }
    }

    error
  }};
}

/// Implements the identity half of [`Payload`] for types whose own `Eq` and
/// `Hash` already describe value identity.
macro_rules! identity_by_eq {
  () => {
    fn same(&self, other: &Self) -> bool {
      self == other
    }

    fn hash_into<H: ::core::hash::Hasher>(&self, state: &mut H) {
      ::core::hash::Hash::hash(self, state)
    }
  };
}

/// Generates the [`Element`] sum type and its [`Kind`] from one table.
///
/// Each row names the variant, its payload type (which must implement
/// [`Payload`]), and the stable element discriminator assigned to it by the
/// default registry.  Codes are persisted on disk, so rows may be added but
/// never renumbered.
///
/// # Generated items
///
/// - `Element`, with one arm per row and `From<payload>` for each payload.
/// - `Kind`, a fieldless mirror of `Element` whose `u16` value is the default
///   element code.
/// - Dispatch for `kind()`, `byte_size()`, `serialize()` and the payload
///   identity used by `PartialEq` and `Hash`.
/// - `Kind::read_element()`, the decode half used by builders.
macro_rules! define_elements {
  ($(
    $(#[$meta:meta])*
    $variant:ident($payload:ty) = $code:literal
  ),* $(,)?) => {
    /// An anonymous value: valid as a member of a collection or as a map key
    /// or value.
    ///
    /// Equality and hashing are by value only.  Floating point components
    /// compare by their bit patterns, so `NaN` equals itself and `0.0` differs
    /// from `-0.0`.
    #[derive(Clone, Debug)]
    pub enum Element {
      $(
        $(#[$meta])*
        $variant($payload),
      )*
    }

    /// The kind of an [`Element`], without its payload.
    ///
    /// The numeric value of each kind is its element discriminator in the
    /// default registry.
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
    #[repr(u16)]
    pub enum Kind {
      $(
        $(#[$meta])*
        $variant = $code,
      )*
    }

    impl Kind {
      /// Every kind, in discriminator order.
      pub const ALL: &'static [Kind] = &[$(Kind::$variant),*];

      /// The element discriminator assigned by the default registry.
      pub const fn code(self) -> u16 {
        self as u16
      }

      /// Looks up a kind by its default element discriminator.
      pub fn from_code(code: u16) -> Option<Kind> {
        match code {
          $($code => Some(Kind::$variant),)*
          _ => None,
        }
      }

      /// Stable, human readable name of the kind.
      pub const fn name(self) -> &'static str {
        match self {
          $(Kind::$variant => stringify!($variant),)*
        }
      }

      /// Inverse of [`Kind::name()`].
      pub fn from_name(name: &str) -> Option<Kind> {
        match name {
          $(stringify!($variant) => Some(Kind::$variant),)*
          _ => None,
        }
      }

      /// The payload size shared by every instance of this kind, if any.
      pub const fn final_size(self) -> FinalSize {
        match self {
          $(Kind::$variant => <$payload as Payload>::FINAL_SIZE,)*
        }
      }

      /// Reads the payload of an element of this kind.
      pub(crate) fn read_element(
        self,
        dec: &mut dyn Decoder,
      ) -> Result<Element, CodecErr> {
        match self {
          $(Kind::$variant => {
            Ok(Element::$variant(<$payload as Payload>::deserialize(dec)?))
          },)*
        }
      }
    }

    impl Element {
      /// The kind of this element.
      pub fn kind(&self) -> Kind {
        match self {
          $(Element::$variant(_) => Kind::$variant,)*
        }
      }

      /// Exact number of payload bytes [`Element::serialize()`] will write.
      pub fn byte_size(&self) -> usize {
        match self {
          $(Element::$variant(inner) => Payload::byte_size(inner),)*
        }
      }

      /// Writes the payload (no record header) of this element.
      pub fn serialize<E>(&self, enc: &mut E) -> Result<(), CodecErr>
      where
        E: Encoder + ?Sized,
      {
        match self {
          $(Element::$variant(inner) => Payload::serialize(inner, enc),)*
        }
      }

      fn same_payload(&self, other: &Element) -> bool {
        match (self, other) {
          $((Element::$variant(a), Element::$variant(b)) => Payload::same(a, b),)*
          _ => false,
        }
      }

      fn hash_payload<H: ::core::hash::Hasher>(&self, state: &mut H) {
        match self {
          $(Element::$variant(inner) => Payload::hash_into(inner, state),)*
        }
      }
    }

    $(
      impl From<$payload> for Element {
        fn from(src: $payload) -> Self {
          Element::$variant(src)
        }
      }
    )*
  };
}

/// Generates the typed [`Document`] accessors for one variant.
///
/// - `extract_*` returns a copy or reference to the tag's value if it is of
///   the expected kind.
/// - `get_or_insert_*` returns a mutable reference, inserting `default` first
///   if the name is absent.
macro_rules! doc_accessors {
  ($variant:ident, $ty:ty, $extract:ident, $get_or_insert:ident) => {
    #[doc = concat!("Returns the `", stringify!($variant), "` stored under `name`, if any.")]
    pub fn $extract(&self, name: &str) -> Option<&$ty> {
      match self.get_value(name) {
        Some($crate::Element::$variant(inner)) => Some(inner),
        _ => None,
      }
    }

    #[doc = concat!("Returns the `", stringify!($variant), "` stored under `name`, inserting `default` if the name is absent.")]
    ///
    /// Returns [`CodecErr::UnexpectedKind`] if the name is already bound to a
    /// value of another kind.
    pub fn $get_or_insert(
      &mut self,
      name: &str,
      default: impl FnOnce() -> $ty,
    ) -> Result<&mut $ty, CodecErr> {
      if !self.contains(name) {
        self.put(name, $crate::Element::$variant(default()))?;
      }
      match self.get_value_mut(name) {
        Some($crate::Element::$variant(inner)) => Ok(inner),
        Some(other) => Err(err!(
          debug,
          CodecErr::UnexpectedKind {
            expected: $crate::Kind::$variant,
            observed: other.kind(),
          }
        )),
        None => Err(err!(error, CodecErr::UnexpectedNull)),
      }
    }
  };
}
