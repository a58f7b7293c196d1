#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// The SPI transport failed.
    Spi,
    /// The device did not leave its startup busy state in time.
    Timeout,
    /// The ID register did not identify a supported part.
    InvalidPartNumber,
}

impl<SpiError> From<SpiError> for DriverError
where
    SpiError: embedded_hal_async::spi::Error,
{
    fn from(_value: SpiError) -> Self {
        Self::Spi
    }
}
