use rand::rngs::OsRng;
use sigils::{
  basic::{Mat4f, Quat, Vec2, Vec3, Vec4},
  codec::{BufferCodec, Decoder, Encoder, StreamReader, StreamWriter},
  collections::{Array, Map, Set},
  crypto::{AesIv, AesKey, BigInteger, InitVector, PrivateKey, PublicKey, SecretKey},
  misc::{ClassRef, FileRef, UriRef},
  structured::Document,
  CodecErr, Element, FinalSize, Kind, Registry, Tag, Value, VariantType,
};
use std::sync::Arc;
use uuid::Uuid;

fn one_of_each() -> Vec<Element> {
  let mut array = Array::new(3);
  array.set(0, Some(Element::Int(1))).unwrap();
  array.set(2, Some(Element::from("last"))).unwrap();

  let mut set = Set::new();
  set.insert(Element::Long(5));
  set.insert(Element::Bool(true));

  let mut map = Map::new();
  map.insert(Element::Short(1), Some(Element::Double(0.5)));
  map.insert(Element::from("nothing"), None);

  let mut doc = Document::new();
  doc.put("name", "voyager").unwrap();
  doc.put("mass", 721.9f64).unwrap();

  vec![
    Element::Byte(-7),
    Element::Short(i16::MIN),
    Element::Int(8_675_309),
    Element::Long(i64::MAX),
    Element::Float(3.5),
    Element::Double(f64::INFINITY),
    Element::Bool(true),
    Element::from("unicode \u{1F980}"),
    Element::from(&[0u8, 1, 2, 3][..]),
    Element::Uuid(Uuid::from_u128(0x0123_4567_89AB_CDEF_0123_4567_89AB_CDEF)),
    Vec2::new(1i32, -1).into(),
    Vec3::new(1i32, 2, 3).into(),
    Vec4::new(1i32, 2, 3, 4).into(),
    Vec2::new(1i64 << 40, 0).into(),
    Vec3::new(0i64, -1, 1).into(),
    Vec4::new(9i64, 8, 7, 6).into(),
    Vec2::new(0.5f32, 0.25).into(),
    Vec3::new(1.0f32, 0.0, -1.0).into(),
    Vec4::new(0.1f32, 0.2, 0.3, 0.4).into(),
    Vec2::new(1e300f64, -1e-300).into(),
    Vec3::new(0.0f64, -0.0, 1.0).into(),
    Vec4::new(4.0f64, 3.0, 2.0, 1.0).into(),
    Element::Array(array),
    Element::List(vec![Element::Int(1), Element::from("two")].into()),
    Element::Doc(doc),
    Element::Map(map),
    Element::Set(set),
    Quat::new(0.0f32, 0.0, 0.0, 1.0).into(),
    Quat::new(0.5f64, 0.5, 0.5, 0.5).into(),
    Mat4f::IDENTITY.into(),
    Element::PrivateKey(PrivateKey::Dsa {
      x: BigInteger::from(17i64),
      p: BigInteger::from(23i64),
      q: BigInteger::from(11i64),
      g: BigInteger::from(4i64),
    }),
    Element::PublicKey(PublicKey::Rsa {
      modulus:         BigInteger::from_unsigned_bytes(&[0xC3, 0x51, 0x07]),
      public_exponent: BigInteger::from(65_537i64),
    }),
    Element::SecretKey(SecretKey::from(&AesKey::new(OsRng))),
    Element::InitVector(InitVector::from(&AesIv::new(OsRng))),
    Element::Class(ClassRef::new("DocTag")),
    Element::File(FileRef::new("/var/lib/sigils/state.bin")),
    Element::Uri(UriRef::new("https://example.invalid/telemetry")),
  ]
}

/// Encodes through both backends and decodes through both.
fn check(value: &Value, registry: &Arc<Registry>) {
  let mut writer = StreamWriter::new(Vec::new(), Arc::clone(registry));
  writer.write_value(value).unwrap();
  let streamed = writer.into_inner();
  let buffered = BufferCodec::encode(value, registry).unwrap();
  assert_eq!(streamed, buffered, "{value:?}");
  assert_eq!(buffered.len(), value.total_size(), "{value:?}");

  let mut reader = StreamReader::new(&streamed[..], Arc::clone(registry));
  assert_eq!(reader.read_value().unwrap().as_ref(), Some(value));
  assert_eq!(BufferCodec::decode(buffered, registry).unwrap(), *value);
}

#[test]
fn every_kind_round_trips() {
  let registry = Arc::new(Registry::with_builtins());
  let elements = one_of_each();
  let kinds: Vec<Kind> = elements.iter().map(Element::kind).collect();
  // Transforms are covered separately.
  assert_eq!(kinds.len(), Kind::ALL.len() - 3);

  for element in elements {
    check(&element.clone().into(), &registry);
    check(&element.to_tag("as_tag").unwrap().into(), &registry);
  }
}

#[test]
fn fixed_kinds_match_their_final_size() {
  for element in one_of_each() {
    match element.final_size() {
      FinalSize::Fixed(size) => {
        assert_eq!(element.byte_size(), size, "{:?}", element.kind());
        assert_eq!(Value::from(element).total_size(), 2 + size);
      },
      FinalSize::Variable => {
        let byte_size = element.byte_size();
        assert_eq!(Value::from(element).total_size(), 2 + 8 + byte_size);
      },
    }
  }
}

#[test]
fn sequential_records_share_a_stream() -> Result<(), CodecErr> {
  let registry = Arc::new(Registry::with_builtins());
  let mut writer = StreamWriter::new(Vec::new(), Arc::clone(&registry));
  writer.write_element(&Element::Int(1))?;
  writer.write_null()?;
  writer.write_tag(&Tag::new("second", "two")?)?;
  writer.write_optional(None)?;
  let bytes = writer.into_inner();

  let mut reader = StreamReader::new(&bytes[..], registry);
  assert_eq!(reader.read_element()?, Some(Element::Int(1)));
  assert_eq!(reader.read_element()?, None);
  assert_eq!(reader.read_element(), Err(CodecErr::UnexpectedTag));
  assert_eq!(reader.read_tag()?, None);
  assert_eq!(reader.bytes_read(), bytes.len() as u64);
  Ok(())
}

#[test]
fn custom_discriminator_table() -> Result<(), CodecErr> {
  let table = [(900u16, "IntElement"), (901, "StringTag"), (902, "DocElement")];
  let registry = Arc::new(Registry::from_table(table));
  assert_eq!(registry.len(), 3);
  assert_eq!(registry.discriminator_of(VariantType::element(Kind::Int)), 900);

  let bytes = BufferCodec::encode(&Element::Int(4).into(), &registry)?;
  assert_eq!(&bytes[..2], &900u16.to_be_bytes());
  assert_eq!(
    BufferCodec::encode(&Element::Long(4).into(), &registry),
    Err(CodecErr::NoMatchingDiscriminator(VariantType::element(Kind::Long)))
  );

  // Data written under one table cannot be read under another.
  let defaults = Arc::new(Registry::with_builtins());
  assert_eq!(
    BufferCodec::decode(bytes, &defaults),
    Err(CodecErr::UnknownDiscriminator(900))
  );
  Ok(())
}
