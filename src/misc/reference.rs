//! References: to a variant type by name, and to values stored in a file or
//! behind a URI.
//!
//! [`FileRef`] and [`UriRef`] persist only their location.  The referenced
//! value is loaded on demand into an in-memory cache, which can be dropped
//! with `unload()` and rebuilt later from the source.

use crate::{
  codec::{Decoder, Encoder, StreamReader, StreamWriter},
  registry::{Registry, VariantType},
  util::OkOrLog,
  CodecErr, FinalSize, Payload, Value,
};
use log::Level;
use std::{
  fmt::{Debug, Formatter},
  fs::File,
  hash::{Hash, Hasher},
  io::{BufReader, BufWriter, Read},
  path::Path,
  sync::Arc,
};

/// Reads the single record stored in `source`.
fn read_single<R: Read>(source: R, registry: &Arc<Registry>) -> Result<Value, CodecErr> {
  let mut reader = StreamReader::new(source, Arc::clone(registry));
  reader
    .read_value()?
    .ok_or_log(Level::Debug, CodecErr::UnexpectedNull)
}

/// A reference to a variant type by its stable type name, e.g. `"IntTag"`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ClassRef(pub String);

impl ClassRef {
  pub fn new(type_name: impl Into<String>) -> ClassRef {
    ClassRef(type_name.into())
  }

  pub fn type_name(&self) -> &str {
    &self.0
  }

  /// The variant type named, if the name is known.
  pub fn resolve(&self) -> Option<VariantType> {
    VariantType::from_type_name(&self.0)
  }
}

impl From<VariantType> for ClassRef {
  fn from(src: VariantType) -> Self {
    ClassRef(src.type_name())
  }
}

/// Payloads that are a single `int32`-length-prefixed string.
macro_rules! string_payload {
  ($ty:ty, $field:tt, $make:path) => {
    impl Payload for $ty {
      const FINAL_SIZE: FinalSize = FinalSize::Variable;

      fn byte_size(&self) -> usize {
        self.$field.byte_size()
      }

      fn serialize<E: Encoder + ?Sized>(&self, enc: &mut E) -> Result<(), CodecErr> {
        enc.write_string(&self.$field)
      }

      fn deserialize(dec: &mut dyn Decoder) -> Result<Self, CodecErr> {
        Ok($make(dec.read_string()?))
      }

      identity_by_eq!();
    }
  };
}

string_payload!(ClassRef, 0, ClassRef);
string_payload!(FileRef, path, FileRef::new);
string_payload!(UriRef, uri, UriRef::new);

/// A value stored, as one generic record, in a file.
///
/// Identity is the path alone; the cache does not participate.
#[derive(Clone)]
pub struct FileRef {
  path:  String,
  cache: Option<Box<Value>>,
}

impl FileRef {
  pub fn new(path: impl Into<String>) -> FileRef {
    FileRef {
      path:  path.into(),
      cache: None,
    }
  }

  pub fn path(&self) -> &Path {
    Path::new(&self.path)
  }

  /// The referenced value, reading the file if it is not cached.
  pub fn load(&mut self, registry: &Arc<Registry>) -> Result<&Value, CodecErr> {
    if self.cache.is_none() {
      self.reload(registry)?;
    }
    self
      .cache
      .as_deref()
      .ok_or_log(Level::Error, CodecErr::UnexpectedNull)
  }

  /// Re-reads the file, replacing the cache.
  pub fn reload(&mut self, registry: &Arc<Registry>) -> Result<&Value, CodecErr> {
    let file = File::open(&self.path).map_err(|e| err!(debug, CodecErr::from(e)))?;
    let value = read_single(BufReader::new(file), registry)?;
    log::debug!("Loaded {:?} from {}", value.element().kind(), self.path);
    Ok(self.cache.insert(Box::new(value)))
  }

  /// Writes `value` to the file and caches it.
  pub fn store(&mut self, value: Value, registry: &Arc<Registry>) -> Result<(), CodecErr> {
    let file = File::create(&self.path).map_err(|e| err!(debug, CodecErr::from(e)))?;
    let mut writer = StreamWriter::new(BufWriter::new(file), Arc::clone(registry));
    writer.write_value(&value)?;
    writer.flush()?;
    self.cache = Some(Box::new(value));
    Ok(())
  }

  /// Drops the cached value.  The file is untouched.
  pub fn unload(&mut self) -> Option<Value> {
    self.cache.take().map(|value| *value)
  }

  pub fn is_loaded(&self) -> bool {
    self.cache.is_some()
  }

  pub fn cached(&self) -> Option<&Value> {
    self.cache.as_deref()
  }
}

impl PartialEq for FileRef {
  fn eq(&self, other: &Self) -> bool {
    self.path == other.path
  }
}

impl Eq for FileRef {}

impl Hash for FileRef {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.path.hash(state)
  }
}

impl Debug for FileRef {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FileRef")
      .field("path", &self.path)
      .field("loaded", &self.is_loaded())
      .finish()
  }
}

/// A value stored, as one generic record, behind a URI.
///
/// `file:` URIs are opened directly.  Other schemes need a caller-supplied
/// opener, see [`UriRef::load_with()`].
#[derive(Clone)]
pub struct UriRef {
  uri:   String,
  cache: Option<Box<Value>>,
}

/// Opens a URI for reading.
pub type UriOpener<'a> = dyn FnMut(&str) -> Result<Box<dyn Read>, CodecErr> + 'a;

impl UriRef {
  pub fn new(uri: impl Into<String>) -> UriRef {
    UriRef {
      uri:   uri.into(),
      cache: None,
    }
  }

  pub fn uri(&self) -> &str {
    &self.uri
  }

  /// The scheme, without the trailing `:`.
  pub fn scheme(&self) -> Option<&str> {
    let (scheme, _) = self.uri.split_once(':')?;
    let valid = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
      && scheme
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
  }

  /// The local path of a `file:` URI.
  pub fn file_path(&self) -> Option<&Path> {
    if !self.scheme()?.eq_ignore_ascii_case("file") {
      return None;
    }
    let rest = &self.uri[5..];
    let path = match rest.strip_prefix("//") {
      Some(authority_and_path) => match authority_and_path.find('/') {
        Some(slash) => {
          let (authority, path) = authority_and_path.split_at(slash);
          if !(authority.is_empty() || authority.eq_ignore_ascii_case("localhost")) {
            return None;
          }
          path
        },
        None => return None,
      },
      None => rest,
    };
    Some(Path::new(path))
  }

  /// The referenced value, opening `file:` URIs if it is not cached.
  pub fn load(&mut self, registry: &Arc<Registry>) -> Result<&Value, CodecErr> {
    if self.cache.is_none() {
      self.reload(registry)?;
    }
    self
      .cache
      .as_deref()
      .ok_or_log(Level::Error, CodecErr::UnexpectedNull)
  }

  /// Re-reads a `file:` URI, replacing the cache.
  pub fn reload(&mut self, registry: &Arc<Registry>) -> Result<&Value, CodecErr> {
    let path = self
      .file_path()
      .ok_or_log(Level::Debug, CodecErr::UnsupportedUriScheme)?;
    let file = File::open(path).map_err(|e| err!(debug, CodecErr::from(e)))?;
    let value = read_single(BufReader::new(file), registry)?;
    Ok(self.cache.insert(Box::new(value)))
  }

  /// Re-reads the URI through `opener`, replacing the cache.
  pub fn load_with(
    &mut self,
    registry: &Arc<Registry>,
    opener: &mut UriOpener<'_>,
  ) -> Result<&Value, CodecErr> {
    let source = opener(&self.uri)?;
    let value = read_single(source, registry)?;
    log::debug!("Loaded {:?} from {}", value.element().kind(), self.uri);
    Ok(self.cache.insert(Box::new(value)))
  }

  pub fn unload(&mut self) -> Option<Value> {
    self.cache.take().map(|value| *value)
  }

  pub fn is_loaded(&self) -> bool {
    self.cache.is_some()
  }

  pub fn cached(&self) -> Option<&Value> {
    self.cache.as_deref()
  }
}

impl PartialEq for UriRef {
  fn eq(&self, other: &Self) -> bool {
    self.uri == other.uri
  }
}

impl Eq for UriRef {}

impl Hash for UriRef {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.uri.hash(state)
  }
}

impl Debug for UriRef {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("UriRef")
      .field("uri", &self.uri)
      .field("loaded", &self.is_loaded())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    codec::BufferCodec,
    util::{builtins, init_test_logger, round_trip},
    Element, Kind, Tag,
  };

  #[test]
  fn class_refs_resolve() {
    let class = ClassRef::from(VariantType::tag(Kind::Map));
    assert_eq!(class.type_name(), "MapTag");
    assert_eq!(class.resolve(), Some(VariantType::tag(Kind::Map)));
    assert_eq!(ClassRef::new("Widget").resolve(), None);
    round_trip(&Element::Class(class).into(), &builtins());
  }

  #[test]
  fn file_ref_loads_lazily() -> Result<(), CodecErr> {
    init_test_logger();
    let registry = builtins();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("value.bin");
    let path = path.to_str().unwrap();

    let stored = Value::Tag(Tag::new("greeting", "hello")?);
    FileRef::new(path).store(stored.clone(), &registry)?;

    let mut file_ref = FileRef::new(path);
    assert!(!file_ref.is_loaded());
    assert_eq!(file_ref.load(&registry)?, &stored);
    assert!(file_ref.is_loaded());

    // Only the path is encoded; the decoded reference starts unloaded.
    let element = Element::File(file_ref.clone());
    let bytes = round_trip(&element.into(), &registry);
    match BufferCodec::decode(bytes, &registry)? {
      Value::Element(Element::File(decoded)) => {
        assert_eq!(decoded, file_ref);
        assert!(!decoded.is_loaded());
      },
      other => panic!("{other:?}"),
    }

    assert_eq!(file_ref.unload(), Some(stored));
    assert_eq!(file_ref.cached(), None);
    Ok(())
  }

  #[test]
  fn missing_file_is_io_failure() {
    let mut file_ref = FileRef::new("/definitely/not/here.bin");
    assert_eq!(
      file_ref.load(&builtins()).unwrap_err(),
      CodecErr::IoFailure(std::io::ErrorKind::NotFound)
    );
  }

  #[test]
  fn uri_schemes() -> Result<(), CodecErr> {
    let registry = builtins();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("uri.bin");
    FileRef::new(path.to_str().unwrap()).store(Element::Long(9).into(), &registry)?;

    let mut local = UriRef::new(format!("file://{}", path.display()));
    assert_eq!(local.scheme(), Some("file"));
    assert_eq!(local.load(&registry)?, &Value::Element(Element::Long(9)));

    let mut remote = UriRef::new("https://example.invalid/value");
    assert_eq!(remote.file_path(), None);
    assert_eq!(
      remote.load(&registry).unwrap_err(),
      CodecErr::UnsupportedUriScheme
    );

    let bytes = BufferCodec::encode(&Element::Short(3).into(), &registry)?;
    let mut opener = |uri: &str| -> Result<Box<dyn Read>, CodecErr> {
      assert!(uri.starts_with("https:"));
      Ok(Box::new(std::io::Cursor::new(bytes.clone())))
    };
    assert_eq!(
      remote.load_with(&registry, &mut opener)?,
      &Value::Element(Element::Short(3))
    );
    assert!(remote.is_loaded());
    Ok(())
  }
}
