//! Structured data: name-keyed documents of tags.

mod doc;

pub use self::doc::*;
