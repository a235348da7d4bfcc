//! Miscellaneous variants: UUIDs, type references, and references to values
//! stored outside the tree.

mod reference;
mod uuid;

pub use self::reference::*;
