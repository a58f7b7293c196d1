use core::convert::Infallible;

use embedded_hal::spi::{ErrorType, Operation, SpiDevice};

use super::Emulator;

/// SPI transport backed by the emulated chip instead of hardware.
///
/// Every transaction operation is broken down into byte-at-a-time full-duplex
/// exchanges; read operations clock out NOP bytes the way a controller holds
/// its data line low during readback. The emulated bus cannot fail, so both
/// the blocking and the async device traits are implemented with
/// [`Infallible`] as the error type.
pub struct EmulatedSpi {
    emulator: Emulator,
}

impl EmulatedSpi {
    pub fn new(emulator: Emulator) -> Self {
        Self { emulator }
    }

    /// Access to the chip for out-of-band control, e.g. a power-on reset or
    /// a channel snapshot in a test.
    pub fn emulator_mut(&mut self) -> &mut Emulator {
        &mut self.emulator
    }

    fn run(&mut self, operations: &mut [Operation<'_, u8>]) {
        for operation in operations {
            match operation {
                Operation::Read(buffer) => {
                    for byte in buffer.iter_mut() {
                        *byte = self.emulator.clock(0x00);
                    }
                }
                Operation::Write(buffer) => {
                    for byte in buffer.iter() {
                        self.emulator.clock(*byte);
                    }
                }
                Operation::Transfer(rx, tx) => {
                    // The longer side wins; missing send bytes go out as
                    // zero and surplus received bytes are dropped, per the
                    // trait contract.
                    for index in 0..rx.len().max(tx.len()) {
                        let output = self.emulator.clock(tx.get(index).copied().unwrap_or(0));
                        if let Some(slot) = rx.get_mut(index) {
                            *slot = output;
                        }
                    }
                }
                Operation::TransferInPlace(buffer) => {
                    for byte in buffer.iter_mut() {
                        *byte = self.emulator.clock(*byte);
                    }
                }
                // The emulated chip has no notion of time; readiness is
                // modeled by the startup busy flag, not by elapsed delays.
                Operation::DelayNs(_) => {}
            }
        }
    }
}

impl ErrorType for EmulatedSpi {
    type Error = Infallible;
}

impl SpiDevice for EmulatedSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        self.run(operations);
        Ok(())
    }
}

impl embedded_hal_async::spi::SpiDevice for EmulatedSpi {
    async fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        self.run(operations);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal::spi::SpiDevice;

    use super::*;

    #[test]
    fn transfer_is_full_duplex() {
        let mut bus = EmulatedSpi::new(Emulator::new());
        let expected = bus.emulator_mut().channel_reading(0);

        let tx = [0x12, 0x00, 0x00];
        let mut rx = [0xFF; 3];
        bus.transfer(&mut rx, &tx).unwrap();

        assert_eq!(0, rx[0]);
        assert_eq!(expected, u16::from_be_bytes([rx[1], rx[2]]));
    }

    #[test]
    fn write_then_read_continues_the_exchange() {
        let mut bus = EmulatedSpi::new(Emulator::new());

        // RREG for three registers starting at INPMUX, then clock the
        // responses out with a plain read.
        bus.write(&[0x22, 0x02]).unwrap();
        let mut values = [0; 3];
        bus.read(&mut values).unwrap();

        assert_eq!([0x01, 0x00, 0x14], values);
    }

    #[test]
    fn uneven_transfer_pads_and_truncates() {
        let mut bus = EmulatedSpi::new(Emulator::new());

        // Longer rx than tx: the tail is clocked with zeros.
        let mut rx = [0xFF; 4];
        bus.transfer(&mut rx, &[0x22, 0x00]).unwrap();
        assert_eq!([0, 0, 0x01, 0], rx);
    }
}
