use embedded_hal_async::{
    delay::DelayNs,
    spi::{Operation, SpiDevice},
};
use num_traits::FromPrimitive;

use crate::{
    errors::DriverError,
    opcode::Command,
    regs::{Channel, Id, Inpmux, Register, RegisterAddress, Status},
    PartNumber,
};

/// Oscillator period in nanoseconds, rounded up from 1 / 4.096 MHz.
const T_CLK_NS: u32 = 245;
/// The device releases its reset state after 4096 tCLK.
const RESET_RELEASE_CLOCKS: u32 = 4096;
/// Attempts before giving up on the startup busy flag.
const BUSY_POLL_ATTEMPTS: u8 = 10;
/// Interval between busy polls.
const BUSY_POLL_INTERVAL_US: u32 = 100;

pub struct Driver<Spi, Delay>
where
    Spi: SpiDevice,
    Delay: DelayNs,
{
    spi: Spi,
    delay: Delay,
    part_number: Option<PartNumber>,
}

impl<Spi, Delay> Driver<Spi, Delay>
where
    Spi: SpiDevice,
    Delay: DelayNs,
{
    pub const fn new(spi: Spi, delay: Delay) -> Self {
        Self {
            spi,
            delay,
            part_number: None,
        }
    }

    /// Part number detected by [`init`](Self::init), if any.
    pub const fn part_number(&self) -> Option<PartNumber> {
        self.part_number
    }

    /// Number of analog inputs on the detected part, 0 before initialization.
    pub fn num_channels(&self) -> u8 {
        self.part_number.map_or(0, |part| part.num_channels())
    }

    /// Bring the device to a known state.
    ///
    /// Waits for the startup busy flag to clear, clears the power-on-reset
    /// flag, identifies the part from the ID register, then resets the device
    /// and selects channel 0.
    pub async fn init(&mut self) -> Result<PartNumber, DriverError> {
        self.wait_ready().await?;

        // Clear the power-on-reset flag.
        self.write_reg(Status(0x00)).await?;

        let id: Id = self.read_reg().await?;
        let part_number =
            PartNumber::from_u8(id.dev_id()).ok_or(DriverError::InvalidPartNumber)?;
        self.part_number = Some(part_number);
        info!(
            "detected part id {} with {} channels",
            id.dev_id(),
            part_number.num_channels()
        );

        self.reset().await?;
        self.set_channel(Channel::Ain0).await?;

        Ok(part_number)
    }

    /// Reset the device and wait out the reset release time.
    pub async fn reset(&mut self) -> Result<(), DriverError> {
        self.strobe(Command::Reset).await?;
        self.delay.delay_ns(RESET_RELEASE_CLOCKS * T_CLK_NS).await;
        Ok(())
    }

    /// Start conversions.
    pub async fn start_conversions(&mut self) -> Result<(), DriverError> {
        self.strobe(Command::Start).await
    }

    /// Stop conversions.
    pub async fn stop_conversions(&mut self) -> Result<(), DriverError> {
        self.strobe(Command::Stop).await
    }

    /// Issue a single-byte command.
    pub async fn strobe(&mut self, command: Command) -> Result<(), DriverError> {
        self.spi.write(&[command.as_u8()]).await?;
        Ok(())
    }

    /// Read a single register value.
    pub async fn read_register(&mut self, address: RegisterAddress) -> Result<u8, DriverError> {
        let tx = [
            Command::Rreg(address).as_u8(),
            Command::count_byte(1),
            Command::Nop.as_u8(),
        ];
        let mut rx = [0; 3];
        self.spi.transfer(&mut rx, &tx).await?;
        Ok(rx[2])
    }

    /// Read a single register as its typed representation.
    pub async fn read_reg<R: Register>(&mut self) -> Result<R, DriverError> {
        let value = self.read_register(R::ADDRESS).await?;
        Ok(R::from_value(value))
    }

    /// Read a sequence of registers starting at `first`, one value per buffer
    /// byte, in ascending address order.
    pub async fn read_registers(
        &mut self,
        first: RegisterAddress,
        buffer: &mut [u8],
    ) -> Result<(), DriverError> {
        if buffer.is_empty() {
            return Ok(());
        }
        assert!(buffer.len() <= 32);

        let header = [
            Command::Rreg(first).as_u8(),
            Command::count_byte(buffer.len() as u8),
        ];
        self.spi
            .transaction(&mut [Operation::Write(&header), Operation::Read(buffer)])
            .await?;
        Ok(())
    }

    /// Write a single register value.
    pub async fn write_register(
        &mut self,
        address: RegisterAddress,
        value: u8,
    ) -> Result<(), DriverError> {
        let tx = [
            Command::Wreg(address).as_u8(),
            Command::count_byte(1),
            value,
        ];
        self.spi.write(&tx).await?;
        Ok(())
    }

    /// Write a single register from its typed representation.
    pub async fn write_reg<R: Register>(&mut self, reg: R) -> Result<(), DriverError> {
        self.write_register(R::ADDRESS, reg.value()).await
    }

    /// Write a sequence of registers starting at `first`.
    pub async fn write_registers(
        &mut self,
        first: RegisterAddress,
        values: &[u8],
    ) -> Result<(), DriverError> {
        if values.is_empty() {
            return Ok(());
        }
        assert!(values.len() <= 32);

        let header = [
            Command::Wreg(first).as_u8(),
            Command::count_byte(values.len() as u8),
        ];
        self.spi
            .transaction(&mut [Operation::Write(&header), Operation::Write(values)])
            .await?;
        Ok(())
    }

    /// Fetch the latest conversion result from the data-holding register.
    pub async fn read_data(&mut self) -> Result<u16, DriverError> {
        let tx = [
            Command::Rdata.as_u8(),
            Command::Nop.as_u8(),
            Command::Nop.as_u8(),
        ];
        let mut rx = [0; 3];
        self.spi.transfer(&mut rx, &tx).await?;
        Ok(u16::from_be_bytes([rx[1], rx[2]]))
    }

    /// Select the positive input for a single-ended conversion against
    /// analog common.
    pub async fn set_channel(&mut self, positive: Channel) -> Result<(), DriverError> {
        self.set_channel_pair(positive, Channel::Common).await
    }

    /// Select both inputs of the multiplexer.
    pub async fn set_channel_pair(
        &mut self,
        positive: Channel,
        negative: Channel,
    ) -> Result<(), DriverError> {
        let mut inpmux = Inpmux(0);
        inpmux.set_muxp(positive as u8);
        inpmux.set_muxn(negative as u8);
        self.write_reg(inpmux).await
    }

    async fn wait_ready(&mut self) -> Result<(), DriverError> {
        for _ in 0..BUSY_POLL_ATTEMPTS {
            let status: Status = self.read_reg().await?;
            if !status.busy() {
                return Ok(());
            }
            debug!("device busy, polling again");
            self.delay.delay_us(BUSY_POLL_INTERVAL_US).await;
        }
        warn!("device still busy after {} polls", BUSY_POLL_ATTEMPTS);
        Err(DriverError::Timeout)
    }
}

#[cfg(test)]
fn lenient_delay() -> embedded_hal_async_mocks::delay::MockDelay {
    let mut delay = embedded_hal_async_mocks::delay::MockDelay::new();
    delay.expect_delay_ns().return_const(());
    delay.expect_delay_us().return_const(());
    delay.expect_delay_ms().return_const(());
    delay
}

#[cfg(test)]
mod tests {
    use embedded_hal_async_mocks::{delay::MockDelay, spi::MockSpiDevice};
    use mockall::Sequence;

    use super::*;

    #[tokio::test]
    async fn read_register_frames_the_command() {
        let mut seq = Sequence::new();
        let mut spi = MockSpiDevice::new();
        spi.expect_exchange(&mut seq, &[0x22, 0x00, 0x00], &[0x00, 0x00, 0xAB]);

        let mut driver = Driver::new(spi, lenient_delay());
        let value = driver
            .read_register(RegisterAddress::Inpmux)
            .await
            .unwrap();
        assert_eq!(0xAB, value);
    }

    #[tokio::test]
    async fn write_register_frames_the_command() {
        let mut seq = Sequence::new();
        let mut spi = MockSpiDevice::new();
        spi.expect_write(&mut seq, &[0x44, 0x00, 0x5A]);

        let mut driver = Driver::new(spi, lenient_delay());
        driver
            .write_register(RegisterAddress::Datarate, 0x5A)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn multi_register_read_uses_one_transaction() {
        let mut seq = Sequence::new();
        let mut spi = MockSpiDevice::new();
        spi.expect_command_response(&mut seq, &[0x22, 0x02], &[0x01, 0x02, 0x03]);

        let mut driver = Driver::new(spi, lenient_delay());
        let mut buffer = [0; 3];
        driver
            .read_registers(RegisterAddress::Inpmux, &mut buffer)
            .await
            .unwrap();
        assert_eq!([0x01, 0x02, 0x03], buffer);
    }

    #[tokio::test]
    async fn multi_register_write_uses_one_transaction() {
        let mut seq = Sequence::new();
        let mut spi = MockSpiDevice::new();
        spi.expect_transaction()
            .withf(|operations| match operations {
                [Operation::Write(header), Operation::Write(values)] => {
                    *header == [0x45, 0x01] && *values == [0xAA, 0xBB]
                }
                _ => false,
            })
            .times(1)
            .in_sequence(&mut seq)
            .return_const(Ok(()));

        let mut driver = Driver::new(spi, lenient_delay());
        driver
            .write_registers(RegisterAddress::Ref, &[0xAA, 0xBB])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn read_data_assembles_big_endian() {
        let mut seq = Sequence::new();
        let mut spi = MockSpiDevice::new();
        spi.expect_exchange(&mut seq, &[0x12, 0x00, 0x00], &[0x00, 0x12, 0x34]);

        let mut driver = Driver::new(spi, lenient_delay());
        assert_eq!(0x1234, driver.read_data().await.unwrap());
    }

    #[tokio::test]
    async fn set_channel_writes_the_multiplexer() {
        let mut seq = Sequence::new();
        let mut spi = MockSpiDevice::new();
        spi.expect_write(&mut seq, &[0x42, 0x00, 0x7C]);

        let mut driver = Driver::new(spi, lenient_delay());
        driver.set_channel(Channel::Ain7).await.unwrap();
    }

    #[tokio::test]
    async fn reset_strobes_and_waits_for_release() {
        let mut seq = Sequence::new();
        let mut spi = MockSpiDevice::new();
        spi.expect_write(&mut seq, &[0x06]);

        let mut delay = MockDelay::new();
        delay
            .expect_delay_ns()
            .withf(|ns| *ns == RESET_RELEASE_CLOCKS * T_CLK_NS)
            .times(1)
            .return_const(());

        let mut driver = Driver::new(spi, delay);
        driver.reset().await.unwrap();
    }
}

#[cfg(all(test, feature = "emulator"))]
mod emulator_tests {
    use embedded_hal_async_mocks::delay::MockDelay;

    use crate::emulator::{EmulatedSpi, Emulator};

    use super::*;

    #[tokio::test]
    async fn init_reports_part_number_and_channel_count() {
        let bus = EmulatedSpi::new(Emulator::new());
        let mut driver = Driver::new(bus, lenient_delay());

        assert_eq!(None, driver.part_number());
        assert_eq!(0, driver.num_channels());

        let part_number = driver.init().await.unwrap();

        assert_eq!(PartNumber::Ads114s08, part_number);
        assert_eq!(Some(PartNumber::Ads114s08), driver.part_number());
        assert_eq!(12, driver.num_channels());
    }

    #[tokio::test]
    async fn init_polls_the_busy_flag_until_it_clears() {
        let mut delay = MockDelay::new();
        // The chip holds its busy flag for three status reads, so the fourth
        // read succeeds after exactly three poll intervals.
        delay
            .expect_delay_us()
            .withf(|us| *us == BUSY_POLL_INTERVAL_US)
            .times(3)
            .return_const(());
        delay.expect_delay_ns().return_const(());

        let bus = EmulatedSpi::new(Emulator::with_startup_delay());
        let mut driver = Driver::new(bus, delay);

        driver.init().await.unwrap();
    }

    #[tokio::test]
    async fn channel_readings_are_stable_across_rereads() {
        let bus = EmulatedSpi::new(Emulator::new());
        let mut driver = Driver::new(bus, lenient_delay());
        driver.init().await.unwrap();

        let channels = [
            Channel::Ain0,
            Channel::Ain1,
            Channel::Ain2,
            Channel::Ain4,
            Channel::Ain11,
            Channel::Ain6,
            Channel::Ain8,
            Channel::Ain5,
            Channel::Ain10,
            Channel::Ain9,
            Channel::Ain3,
            Channel::Ain7,
        ];

        let mut readings = [0u16; 12];
        for channel in channels {
            driver.set_channel(channel).await.unwrap();
            readings[channel as usize] = driver.read_data().await.unwrap();
        }

        for channel in channels.iter().rev() {
            driver.set_channel(*channel).await.unwrap();
            assert_eq!(
                readings[*channel as usize],
                driver.read_data().await.unwrap()
            );
        }
    }

    #[tokio::test]
    async fn readings_match_the_chip_snapshot() {
        let bus = EmulatedSpi::new(Emulator::new());
        let mut driver = Driver::new(bus, lenient_delay());
        driver.init().await.unwrap();

        for channel in 0..12 {
            let expected = driver.spi.emulator_mut().channel_reading(channel);
            driver
                .set_channel(Channel::from_usize(channel).unwrap())
                .await
                .unwrap();
            assert_eq!(expected, driver.read_data().await.unwrap());
        }
    }

    #[tokio::test]
    async fn register_write_read_round_trip() {
        let bus = EmulatedSpi::new(Emulator::new());
        let mut driver = Driver::new(bus, lenient_delay());
        driver.init().await.unwrap();

        for value in (0..=255u8).rev() {
            for raw in 0..crate::regs::REGISTER_COUNT {
                let address = RegisterAddress::from_usize(raw).unwrap();
                driver.write_register(address, value).await.unwrap();
                assert_eq!(value, driver.read_register(address).await.unwrap());
            }
        }
    }
}
