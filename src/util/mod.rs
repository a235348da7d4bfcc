//! Misc non-public utility code for the crate itself.
pub(crate) mod debug;
mod log;

#[cfg(test)]
mod test;

pub(crate) use self::log::*;
#[cfg(test)]
pub(crate) use self::test::*;
