use std::fmt::{Debug, Display, Formatter, Write};

/// A container for `&[u8]` that formats itself as a hex dump on output via
/// [`Debug`] and [`Display`].
pub(crate) struct HexDump<'a>(pub &'a [u8]);

impl<'a> Display for HexDump<'a> {
  fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
    Debug::fmt(self, f)
  }
}

impl<'a> Debug for HexDump<'a> {
  fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
    let mut b = f.debug_struct("[u8]");
    let mut line = String::with_capacity(100);
    let mut start = 0usize;

    for (count, &byte) in self.0.iter().enumerate() {
      // End of line
      if (count % 32) == 0 && count != 0 {
        let linenum = format!("{:04X?}", start);
        b.field(linenum.as_str(), &line.as_str());
        start += 32;
        line.clear();
      }
      if (count % 8) == 0 && count != start {
        write!(&mut line, " ")?;
      }
      if (count % 4) == 0 && count != start {
        write!(&mut line, " ")?;
      }
      write!(&mut line, "{:02X?}", byte)?;
    }
    // Last remaining line
    if !line.is_empty() {
      let linenum = format!("{:04X?}", start);
      b.field(linenum.as_str(), &line.as_str());
    }

    b.finish()
  }
}

/// Hex dump for short (i.e., single-line) byte strings such as keys and
/// initialization vectors.
///
/// The output is a continuous string of hex digits, interleaved by a `:`
/// every `self.1` bytes.  Anything longer than `MAX_SHORT_DUMP` bytes is
/// elided.
pub(crate) struct ShortHexDump<'a>(pub &'a [u8], pub usize);

const MAX_SHORT_DUMP: usize = 64;

impl<'a> Debug for ShortHexDump<'a> {
  fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
    let shown = &self.0[..self.0.len().min(MAX_SHORT_DUMP)];
    for (i, byte) in shown.iter().enumerate() {
      if self.1 != 0 && i != 0 && (i % self.1) == 0 {
        write!(f, ":")?;
      }
      write!(f, "{:02X}", byte)?;
    }
    if shown.len() < self.0.len() {
      write!(f, "..(+{} bytes)", self.0.len() - shown.len())?;
    }
    Ok(())
  }
}

impl<'a> Display for ShortHexDump<'a> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    Debug::fmt(self, f)
  }
}
