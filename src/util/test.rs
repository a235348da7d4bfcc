//! Code useful for testing.
use crate::{
  codec::{BufferCodec, Decoder, Encoder, StreamReader, StreamWriter},
  registry::Registry,
  Value,
};
use std::sync::{
  atomic::{AtomicBool, Ordering::SeqCst},
  Arc,
};

/// Tracks whether the global default logger is initialized.
static LOGGER_INIT: AtomicBool = AtomicBool::new(false);

/// Ensures the test logger is initialized.
///
/// This function uses atomics to ensure that the test logger is only
/// ever initialized once.
pub(crate) fn init_test_logger() {
  if LOGGER_INIT
    .compare_exchange(false, true, SeqCst, SeqCst)
    .is_ok()
  {
    let result = env_logger::Builder::from_default_env()
      .is_test(true)
      .format_timestamp_nanos()
      .try_init();
    if result.is_ok() {
      log::info!("Initialized test logger");
    }
  }
}

/// Encodes `value` with both backends, checks they agree byte for byte and
/// that each decodes to `value`, and returns the encoded bytes.
pub(crate) fn round_trip(value: &Value, registry: &Arc<Registry>) -> Vec<u8> {
  init_test_logger();
  let mut buffer = BufferCodec::for_value(value, Arc::clone(registry));
  buffer.write_value(value).unwrap();
  assert_eq!(buffer.writable(), 0, "{value:?}");

  let mut writer = StreamWriter::new(Vec::new(), Arc::clone(registry));
  writer.write_value(value).unwrap();
  let streamed = writer.into_inner();
  assert_eq!(buffer.as_bytes(), &streamed[..]);

  assert_eq!(buffer.read_value().unwrap().as_ref(), Some(value));
  assert_eq!(buffer.remaining(), 0);

  let mut reader = StreamReader::new(&streamed[..], Arc::clone(registry));
  assert_eq!(reader.read_value().unwrap().as_ref(), Some(value));
  assert_eq!(reader.bytes_read(), streamed.len() as u64);
  streamed
}

/// A shared registry of the built-in variants.
pub(crate) fn builtins() -> Arc<Registry> {
  Arc::new(Registry::with_builtins())
}
