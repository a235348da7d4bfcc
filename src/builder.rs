//! Decode factories, one per registered variant type.

use crate::{
  codec::Decoder, registry::VariantType, CodecErr, FinalSize, Named, Value,
};

/// A decode factory for one variant type.
///
/// The generic record reader (see [`crate::codec::record`]) consults
/// [`Builder::is_named()`] and [`Builder::final_size_hint()`] to know which
/// header fields follow the discriminator, then hands the payload over to
/// [`Builder::build()`].
pub trait Builder: Send + Sync {
  /// Reads one payload from `dec`.
  ///
  /// `name` is `Some` exactly when [`Builder::is_named()`] is `true`.
  fn build(
    &self,
    name: Option<String>,
    dec: &mut dyn Decoder,
  ) -> Result<Value, CodecErr>;

  /// The fixed payload size shared by every value this builder produces, or
  /// [`FinalSize::Variable`] if each record carries an explicit length.
  fn final_size_hint(&self) -> FinalSize;

  /// `true` if records for this builder carry a name.
  fn is_named(&self) -> bool;
}

/// The default builder: reads the payload of one kind, in either shape.
#[derive(Copy, Clone, Debug)]
pub struct ElementBuilder {
  variant: VariantType,
}

impl ElementBuilder {
  /// Creates the builder for `variant`.
  pub fn new(variant: VariantType) -> ElementBuilder {
    ElementBuilder { variant }
  }
}

impl Builder for ElementBuilder {
  fn build(
    &self,
    name: Option<String>,
    dec: &mut dyn Decoder,
  ) -> Result<Value, CodecErr> {
    let element = self.variant.kind().read_element(dec)?;
    attach_name(self.variant.is_named(), name, element.into())
  }

  fn final_size_hint(&self) -> FinalSize {
    self.variant.kind().final_size()
  }

  fn is_named(&self) -> bool {
    self.variant.is_named()
  }
}

/// Wraps a freshly built element in the shape the builder promised.
pub(crate) fn attach_name(
  named: bool,
  name: Option<String>,
  value: Value,
) -> Result<Value, CodecErr> {
  match (named, name, value) {
    (true, Some(name), Value::Element(element)) => {
      Ok(Value::Tag(Named::new(name, element)?))
    },
    (false, None, value @ Value::Element(_)) => Ok(value),
    _ => Err(err!(debug, CodecErr::NameShapeMismatch)),
  }
}
