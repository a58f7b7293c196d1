//! Bus-level emulation of the ADS114S08.
//!
//! The emulated chip is a synchronous function of the byte stream it is
//! clocked with: one [`Emulator::clock`] call exchanges one byte in each
//! direction, exactly like eight SCLK cycles on a real bus. [`EmulatedSpi`]
//! wraps the chip in the `embedded-hal` SPI device traits so the driver can
//! run against it unchanged.

mod bus;
mod engine;
mod readings;
mod register_file;

pub use bus::EmulatedSpi;
pub use engine::{Emulator, NUM_CHANNELS};
pub use readings::ReadingGenerator;
pub use register_file::RegisterFile;
