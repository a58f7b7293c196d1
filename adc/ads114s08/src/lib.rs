#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate num_derive;

// This mod MUST go first, so that the others see its macros.
#[macro_use]
mod fmt;

mod driver;
mod errors;
pub mod opcode;
pub mod regs;

#[cfg(feature = "emulator")]
pub mod emulator;

#[derive(Copy, Clone, Debug, PartialEq, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PartNumber {
    Ads114s08 = 0x04,
    Ads114s06 = 0x05,
}

impl PartNumber {
    /// Number of analog inputs on this part.
    pub const fn num_channels(&self) -> u8 {
        match self {
            PartNumber::Ads114s08 => 12,
            PartNumber::Ads114s06 => 6,
        }
    }
}

pub use self::{driver::Driver, errors::DriverError};
