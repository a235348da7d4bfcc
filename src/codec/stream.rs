use crate::{
  codec::{record, Decoder, Encoder},
  registry::Registry,
  CodecErr, Value,
};
use std::{
  io::{ErrorKind, Read, Write},
  sync::Arc,
  thread,
  time::{Duration, Instant},
};

/// Size of the scratch buffer used to discard skipped bytes.
const SKIP_CHUNK_LEN: usize = 4096;

/// Blocking behaviour of a [`StreamReader`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StreamConfig {
  /// Upper bound on how long a single primitive read may wait for data.
  /// `None` waits indefinitely.
  pub read_timeout:  Option<Duration>,
  /// Pause between attempts while the source reports no data available.
  pub poll_interval: Duration,
}

impl Default for StreamConfig {
  fn default() -> Self {
    StreamConfig {
      read_timeout:  None,
      poll_interval: Duration::from_millis(1),
    }
  }
}

impl StreamConfig {
  pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
    self.read_timeout = Some(timeout);
    self
  }

  pub fn with_poll_interval(mut self, interval: Duration) -> Self {
    self.poll_interval = interval;
    self
  }
}

/// Result of one non-blocking read attempt.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Availability {
  /// This many bytes were read.  Never zero unless the target was empty.
  Bytes(usize),
  /// The source has nothing to offer right now, but is not finished.
  NotReady,
  /// The source is exhausted.
  End,
}

/// How a [`StreamReader::read_fully()`] call finished.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReadStatus {
  Complete,
  TimedOut,
  EndOfStream,
}

/// Bytes read by a blocking read, and why it stopped.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ReadOutcome {
  pub read:   usize,
  pub status: ReadStatus,
}

impl ReadOutcome {
  pub fn is_complete(&self) -> bool {
    self.status == ReadStatus::Complete
  }
}

/// Sequential decoder over a one-way byte source.
///
/// Sources that report [`ErrorKind::WouldBlock`], [`ErrorKind::TimedOut`] or
/// [`ErrorKind::Interrupted`] are treated as "not ready yet" and polled again
/// after [`StreamConfig::poll_interval`].
#[derive(Debug)]
pub struct StreamReader<R> {
  inner:    R,
  registry: Arc<Registry>,
  config:   StreamConfig,
  read:     u64,
  depth:    usize,
}

impl<R: Read> StreamReader<R> {
  pub fn new(inner: R, registry: Arc<Registry>) -> StreamReader<R> {
    StreamReader::with_config(inner, registry, StreamConfig::default())
  }

  pub fn with_config(
    inner: R,
    registry: Arc<Registry>,
    config: StreamConfig,
  ) -> StreamReader<R> {
    StreamReader {
      inner,
      registry,
      config,
      read: 0,
      depth: 0,
    }
  }

  pub fn config(&self) -> &StreamConfig {
    &self.config
  }

  pub fn set_config(&mut self, config: StreamConfig) {
    self.config = config;
  }

  pub fn registry(&self) -> &Arc<Registry> {
    &self.registry
  }

  pub fn get_ref(&self) -> &R {
    &self.inner
  }

  pub fn into_inner(self) -> R {
    self.inner
  }

  /// Makes one read attempt without waiting.
  pub fn try_read(&mut self, target: &mut [u8]) -> Result<Availability, CodecErr> {
    if target.is_empty() {
      return Ok(Availability::Bytes(0));
    }
    match self.inner.read(target) {
      Ok(0) => Ok(Availability::End),
      Ok(n) => {
        self.read += n as u64;
        Ok(Availability::Bytes(n))
      },
      Err(e)
        if matches!(
          e.kind(),
          ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
        ) =>
      {
        Ok(Availability::NotReady)
      },
      Err(e) => Err(err!(debug, CodecErr::from(e))),
    }
  }

  /// Blocks until `target` is full or the source ends.
  pub fn read_fully(&mut self, target: &mut [u8]) -> Result<ReadOutcome, CodecErr> {
    self.fill(target, None)
  }

  /// Blocks until `target` is full, the source ends, or `timeout` elapses.
  ///
  /// Running out of time is not an error: the outcome reports how many bytes
  /// arrived in time.
  pub fn read_fully_timeout(
    &mut self,
    target: &mut [u8],
    timeout: Duration,
  ) -> Result<ReadOutcome, CodecErr> {
    self.fill(target, Some(Instant::now() + timeout))
  }

  fn fill(
    &mut self,
    target: &mut [u8],
    deadline: Option<Instant>,
  ) -> Result<ReadOutcome, CodecErr> {
    let mut filled = 0;
    while filled < target.len() {
      match self.try_read(&mut target[filled..])? {
        Availability::Bytes(n) => filled += n,
        Availability::End => {
          return Ok(ReadOutcome {
            read:   filled,
            status: ReadStatus::EndOfStream,
          })
        },
        Availability::NotReady => {
          let pause = match deadline {
            Some(deadline) => {
              let now = Instant::now();
              if now >= deadline {
                break;
              }
              self.config.poll_interval.min(deadline - now)
            },
            None => self.config.poll_interval,
          };
          thread::sleep(pause);
        },
      }
    }

    let status = if filled == target.len() {
      ReadStatus::Complete
    } else {
      ReadStatus::TimedOut
    };
    Ok(ReadOutcome {
      read: filled,
      status,
    })
  }
}

impl<R: Read> Decoder for StreamReader<R> {
  fn registry(&self) -> &Arc<Registry> {
    &self.registry
  }

  fn read_bytes(&mut self, target: &mut [u8]) -> Result<(), CodecErr> {
    let outcome = match self.config.read_timeout {
      Some(timeout) => self.read_fully_timeout(target, timeout)?,
      None => self.read_fully(target)?,
    };
    match outcome.status {
      ReadStatus::Complete => Ok(()),
      ReadStatus::EndOfStream => Err(err!(
        debug,
        CodecErr::UnexpectedEof {
          needed:    target.len(),
          available: outcome.read,
        }
      )),
      ReadStatus::TimedOut => Err(err!(
        debug,
        CodecErr::TimedOut {
          needed: target.len(),
          read:   outcome.read,
        }
      )),
    }
  }

  fn skip(&mut self, len: u64) -> Result<(), CodecErr> {
    let mut scratch = [0u8; SKIP_CHUNK_LEN];
    let mut left = len;
    while left > 0 {
      let chunk = left.min(SKIP_CHUNK_LEN as u64) as usize;
      self.read_bytes(&mut scratch[..chunk])?;
      left -= chunk as u64;
    }
    Ok(())
  }

  fn bytes_read(&self) -> u64 {
    self.read
  }

  fn depth(&self) -> usize {
    self.depth
  }

  fn set_depth(&mut self, depth: usize) {
    self.depth = depth;
  }

  fn read_value(&mut self) -> Result<Option<Value>, CodecErr> {
    record::read_record(self)
  }
}

/// Sequential encoder over a one-way byte sink.
#[derive(Debug)]
pub struct StreamWriter<W> {
  inner:    W,
  registry: Arc<Registry>,
  written:  u64,
}

impl<W: Write> StreamWriter<W> {
  pub fn new(inner: W, registry: Arc<Registry>) -> StreamWriter<W> {
    StreamWriter {
      inner,
      registry,
      written: 0,
    }
  }

  pub fn registry(&self) -> &Arc<Registry> {
    &self.registry
  }

  pub fn flush(&mut self) -> Result<(), CodecErr> {
    self.inner.flush().map_err(|e| err!(debug, CodecErr::from(e)))
  }

  pub fn get_ref(&self) -> &W {
    &self.inner
  }

  pub fn into_inner(self) -> W {
    self.inner
  }
}

impl<W: Write> Encoder for StreamWriter<W> {
  fn registry(&self) -> &Arc<Registry> {
    &self.registry
  }

  fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecErr> {
    self
      .inner
      .write_all(bytes)
      .map_err(|e| err!(debug, CodecErr::from(e)))?;
    self.written += bytes.len() as u64;
    Ok(())
  }

  fn bytes_written(&self) -> u64 {
    self.written
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{util::init_test_logger, Element};
  use std::{collections::VecDeque, io};

  /// A source that hands out scripted chunks, reporting `WouldBlock` for each
  /// `None`, and end of stream once the script is exhausted if `ends`.
  struct Trickle {
    script: VecDeque<Option<Vec<u8>>>,
    ends:   bool,
  }

  impl Read for Trickle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
      match self.script.pop_front() {
        Some(Some(mut chunk)) => {
          let n = chunk.len().min(buf.len());
          buf[..n].copy_from_slice(&chunk[..n]);
          if n < chunk.len() {
            self.script.push_front(Some(chunk.split_off(n)));
          }
          Ok(n)
        },
        Some(None) => Err(io::ErrorKind::WouldBlock.into()),
        None if self.ends => Ok(0),
        None => Err(io::ErrorKind::WouldBlock.into()),
      }
    }
  }

  fn registry() -> Arc<Registry> {
    Arc::new(Registry::with_builtins())
  }

  #[test]
  fn waits_through_would_block() -> Result<(), CodecErr> {
    let source = Trickle {
      script: vec![Some(vec![0]), None, None, Some(vec![0, 0, 42])].into(),
      ends:   true,
    };
    let mut reader = StreamReader::new(source, registry());
    assert_eq!(reader.read_i32()?, 42);
    assert_eq!(reader.bytes_read(), 4);
    Ok(())
  }

  #[test]
  fn timeout_returns_partial_count() -> Result<(), CodecErr> {
    init_test_logger();
    let source = Trickle {
      script: vec![Some(vec![1, 2, 3])].into(),
      ends:   false,
    };
    let mut reader = StreamReader::new(source, registry());
    let mut target = [0u8; 8];
    let outcome =
      reader.read_fully_timeout(&mut target, Duration::from_millis(20))?;
    assert_eq!(
      outcome,
      ReadOutcome {
        read:   3,
        status: ReadStatus::TimedOut,
      }
    );
    assert_eq!(&target[..3], &[1, 2, 3]);
    Ok(())
  }

  #[test]
  fn configured_timeout_fails_primitive_reads() {
    let source = Trickle {
      script: vec![Some(vec![0, 0])].into(),
      ends:   false,
    };
    let config = StreamConfig::default()
      .with_read_timeout(Duration::from_millis(10))
      .with_poll_interval(Duration::from_millis(2));
    let mut reader = StreamReader::with_config(source, registry(), config);
    assert_eq!(
      reader.read_i64(),
      Err(CodecErr::TimedOut { needed: 8, read: 2 })
    );
  }

  #[test]
  fn end_of_stream_is_reported() -> Result<(), CodecErr> {
    let mut reader = StreamReader::new(&[7u8, 8][..], registry());
    let mut target = [0u8; 4];
    let outcome = reader.read_fully(&mut target)?;
    assert_eq!(outcome.read, 2);
    assert_eq!(outcome.status, ReadStatus::EndOfStream);
    assert_eq!(reader.try_read(&mut target)?, Availability::End);
    Ok(())
  }

  #[test]
  fn writer_counts_bytes() -> Result<(), CodecErr> {
    let mut writer = StreamWriter::new(Vec::new(), registry());
    writer.write_element(&Element::Short(5))?;
    writer.write_null()?;
    assert_eq!(writer.bytes_written(), 6);
    assert_eq!(writer.into_inner(), vec![0, 2, 0, 5, 0, 0]);
    Ok(())
  }

  #[test]
  fn skip_discards_exactly() -> Result<(), CodecErr> {
    let bytes: Vec<u8> = (0..10_000u32).map(|i| i as u8).collect();
    let mut reader = StreamReader::new(&bytes[..], registry());
    reader.skip(9_999)?;
    assert_eq!(reader.read_u8()?, (9_999u32 as u8));
    assert!(reader.skip(1).is_err());
    Ok(())
  }
}
