//! The discriminator registry: a two-way lookup between concrete variant types
//! and the 16-bit codes that identify them on the wire.

use crate::{
  builder::{Builder, ElementBuilder},
  util::OkOrLog,
  CodecErr, Kind,
};
use log::Level;
use std::{
  collections::HashMap,
  fmt::{Debug, Formatter},
  sync::Arc,
};

/// Discriminator reserved for "absent / null".  Never assignable.
pub const NULL_DISCRIMINATOR: u16 = 0;

/// Offset added to a kind's element code to obtain its tag code in the
/// default registry.
pub const TAG_CODE_OFFSET: u16 = 100;

/// A concrete variant type: a kind in either its anonymous (element) or named
/// (tag) shape.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct VariantType {
  kind:  Kind,
  named: bool,
}

impl VariantType {
  /// The element (anonymous) shape of `kind`.
  pub const fn element(kind: Kind) -> VariantType {
    VariantType { kind, named: false }
  }

  /// The tag (named) shape of `kind`.
  pub const fn tag(kind: Kind) -> VariantType {
    VariantType { kind, named: true }
  }

  /// Creates a variant type from its parts.
  pub const fn new(kind: Kind, named: bool) -> VariantType {
    VariantType { kind, named }
  }

  /// The variant's kind.
  pub const fn kind(self) -> Kind {
    self.kind
  }

  /// `true` iff this is the tag shape.
  pub const fn is_named(self) -> bool {
    self.named
  }

  /// The code this type is assigned in the default registry.
  pub const fn default_code(self) -> u16 {
    if self.named {
      self.kind.code() + TAG_CODE_OFFSET
    } else {
      self.kind.code()
    }
  }

  /// Stable type name, e.g. `"IntElement"` or `"DocTag"`.
  ///
  /// These names are what an external discriminator table persists next to
  /// each code.
  pub fn type_name(self) -> String {
    let suffix = if self.named { "Tag" } else { "Element" };
    format!("{}{}", self.kind.name(), suffix)
  }

  /// Inverse of [`VariantType::type_name()`].
  pub fn from_type_name(name: &str) -> Option<VariantType> {
    if let Some(kind) = name.strip_suffix("Element") {
      Kind::from_name(kind).map(VariantType::element)
    } else if let Some(kind) = name.strip_suffix("Tag") {
      Kind::from_name(kind).map(VariantType::tag)
    } else {
      None
    }
  }
}

/// Bidirectional map between [`VariantType`]s and discriminator codes, holding
/// the decode [`Builder`] for each code.
///
/// A registry is normally built once and then shared read-only (behind an
/// [`Arc`]) by every codec that uses it.  Registration while codecs are in
/// use must be serialized by the caller.
#[derive(Clone, Default)]
pub struct Registry {
  codes:    HashMap<VariantType, u16>,
  builders: HashMap<u16, (VariantType, Arc<dyn Builder>)>,
}

impl Registry {
  /// Creates an empty registry.
  pub fn new() -> Registry {
    Registry::default()
  }

  /// Creates a registry holding every built-in variant, in both shapes, at
  /// its default code.
  pub fn with_builtins() -> Registry {
    let mut registry = Registry::new();
    for &kind in Kind::ALL {
      for vt in [VariantType::element(kind), VariantType::tag(kind)] {
        registry.register(vt, Arc::new(ElementBuilder::new(vt)), vt.default_code());
      }
    }
    registry
  }

  /// Rebuilds a registry from a persisted `(code, type name)` table, using
  /// the built-in builders.
  ///
  /// Rows naming unknown types are skipped and logged, as are rows rejected
  /// by [`Registry::register()`].
  pub fn from_table<'a, I>(table: I) -> Registry
  where
    I: IntoIterator<Item = (u16, &'a str)>,
  {
    let mut registry = Registry::new();
    for (code, name) in table {
      match VariantType::from_type_name(name) {
        Some(vt) => {
          if !registry.register(vt, Arc::new(ElementBuilder::new(vt)), code) {
            log::warn!("Discriminator table row {code} => {name} rejected");
          }
        },
        None => log::warn!("Discriminator table names unknown type {name:?}"),
      }
    }
    registry
  }

  /// Lists `(code, type name)` for every registered type, ordered by code.
  pub fn table(&self) -> Vec<(u16, String)> {
    let mut rows: Vec<(u16, String)> = self
      .builders
      .iter()
      .map(|(code, (vt, _))| (*code, vt.type_name()))
      .collect();
    rows.sort();
    rows
  }

  /// Registers `builder` for `variant` under `code`.
  ///
  /// Does nothing and returns `false` if `code` is zero, if `variant` is
  /// already registered, or if `code` is already taken by another type.
  pub fn register(
    &mut self,
    variant: VariantType,
    builder: Arc<dyn Builder>,
    code: u16,
  ) -> bool {
    if code == NULL_DISCRIMINATOR
      || self.codes.contains_key(&variant)
      || self.builders.contains_key(&code)
    {
      return false;
    }
    self.codes.insert(variant, code);
    self.builders.insert(code, (variant, builder));
    true
  }

  /// Removes `variant` in both directions, returning the code it held.
  pub fn unregister(&mut self, variant: VariantType) -> Option<u16> {
    let code = self.codes.remove(&variant)?;
    self.builders.remove(&code);
    Some(code)
  }

  /// Swaps the builder registered for `variant`, keeping its code.
  ///
  /// Returns `false` if `variant` is not registered.
  pub fn replace_builder(
    &mut self,
    variant: VariantType,
    builder: Arc<dyn Builder>,
  ) -> bool {
    match self.codes.get(&variant) {
      Some(code) => {
        self.builders.insert(*code, (variant, builder));
        true
      },
      None => false,
    }
  }

  /// The code for `variant`, or [`NULL_DISCRIMINATOR`] if unregistered.
  pub fn discriminator_of(&self, variant: VariantType) -> u16 {
    self.codes.get(&variant).copied().unwrap_or(NULL_DISCRIMINATOR)
  }

  /// The type registered under `code`, if any.
  pub fn variant_of(&self, code: u16) -> Option<VariantType> {
    self.builders.get(&code).map(|(vt, _)| *vt)
  }

  /// `true` iff a builder is registered for `code`.
  pub fn contains_code(&self, code: u16) -> bool {
    self.builders.contains_key(&code)
  }

  /// The builder registered for `code`.
  pub fn builder_for(&self, code: u16) -> Result<Arc<dyn Builder>, CodecErr> {
    self
      .builders
      .get(&code)
      .map(|(_, builder)| Arc::clone(builder))
      .ok_or_log(Level::Debug, CodecErr::UnknownDiscriminator(code))
  }

  /// Number of registered types.
  pub fn len(&self) -> usize {
    self.codes.len()
  }

  /// `true` iff nothing is registered.
  pub fn is_empty(&self) -> bool {
    self.codes.is_empty()
  }
}

impl Debug for Registry {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let mut map = f.debug_map();
    for (code, name) in self.table() {
      map.entry(&code, &name);
    }
    map.finish()
  }
}
