//! Scalars, strings, byte containers, fixed-size vectors and matrices.
//!
//! Every type here is a plain Rust value; the [`Payload`](crate::Payload)
//! impls describe its wire form.
mod scalar;
mod vector;

pub use self::vector::*;
