#![doc = include_str!("../README.md")]

#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::style,
    clippy::perf,
    clippy::complexity,
    clippy::correctness,
    rust_2018_idioms
)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::use_self,
    clippy::type_complexity
)]

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

#[macro_use]
pub mod errors;
pub mod armor;
pub mod composed;
pub mod crypto;
pub mod packet;
pub mod parsing;
pub mod ser;
pub mod types;
pub mod util;

// reexports for easier use
pub use self::composed::*;
pub use self::packet::{Signature, SignatureV3};

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
