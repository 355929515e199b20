//! This is a [bit banging] two-wire bus (I2C) master built on the
//! [`embedded-hal`] digital pin traits.
//!
//! [bit banging]: https://en.wikipedia.org/wiki/Bit_banging
//! [`embedded-hal`]: https://github.com/rust-embedded/embedded-hal
//!
//! - [`i2c`]: the bus engine and its addressed read/write transactions
//! - [`pin`]: direction switching for the data line
//! - [`timing`]: minimum hold times between line transitions
//!
//! ## Usage examples
//!
//! See the example in the [`i2c`] module documentation

#![no_std]
#![deny(missing_docs)]

#[cfg(test)]
extern crate std;

pub mod i2c;
pub mod pin;
#[cfg(test)]
mod sim;
pub mod timing;
