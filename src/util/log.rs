use log::{Level, STATIC_MAX_LEVEL};
use std::fmt::Debug;

/// When enabling backtraces (but not feature `backtrace_full`), the number of
/// stack frames to log.
#[cfg(feature = "backtrace")]
const SHORT_BACKTRACE_LOG_FRAMES: usize = 2;

/// Utility trait for error reporting, primarily used with [`Option`].
///
/// This provides an alternative to `Option`'s `ok_or()` and `ok_or_else()`:
///
/// - With `ok_or`, the error is not reported at the point it is generated,
///   and reporting it inside the argument would evaluate it eagerly.
/// - `ok_or_else` fixes that, but needs a closure at every call site.
///
/// The error is logged at `level`, followed by a backtrace at the `trace`
/// level if the `backtrace` feature is enabled.
pub(crate) trait OkOrLog<O, E>: Sized
where
  E: Debug,
{
  fn ok_or_log(self, level: Level, error: E) -> Result<O, E>;
}

impl<O, E> OkOrLog<O, E> for Option<O>
where
  E: Debug,
{
  #[inline(always)]
  fn ok_or_log(self, level: Level, error: E) -> Result<O, E> {
    match self {
      Some(value) => Ok(value),
      None => {
        report(level, &error);
        Err(error)
      },
    }
  }
}

/// Logs the error half of a [`Result`] on its way through.
pub(crate) trait LogErr<O, E>
where
  E: Debug,
{
  fn log_err(self, level: Level) -> Result<O, E>;
}

impl<O, E> LogErr<O, E> for Result<O, E>
where
  E: Debug,
{
  #[inline(always)]
  fn log_err(self, level: Level) -> Result<O, E> {
    if let Err(error) = &self {
      report(level, error);
    }
    self
  }
}

fn report<E: Debug>(level: Level, error: &E) {
  // Const comparison allows dead code elimination.
  if level > STATIC_MAX_LEVEL {
    return;
  }
  log::log!(level, "{:?}", error);
  #[cfg(feature = "backtrace")]
  {
    if log::log_enabled!(Level::Trace) {
      let mut bt = backtrace::Backtrace::new_unresolved();
      bt.resolve();
      if cfg!(feature = "backtrace_full") {
        log::trace!("{:?}", bt);
      } else {
        for frame in bt.frames().iter().skip(1).take(SHORT_BACKTRACE_LOG_FRAMES) {
          log::trace!("{frame:?}");
        }
      }
    }
  }
}
