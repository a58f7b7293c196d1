use embedded_hal_async::spi::{self, Operation};
use mockall::{mock, Sequence};

#[derive(Debug, Clone, Copy)]
pub struct SpiError;

impl spi::Error for SpiError {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

mock! {
    #[derive(Debug)]
    pub SpiDevice<Word: Copy + 'static = u8> { }

    impl<Word: Copy + 'static> spi::SpiDevice<Word> for SpiDevice<Word> {
        async fn transaction<'a>(&mut self, operations: &mut [spi::Operation<'a, Word>]) -> Result<(), SpiError>;
    }

    impl<Word: Copy + 'static> spi::ErrorType for SpiDevice<Word> {
        type Error = SpiError;
    }
}

/// Expectation helpers for drivers that talk to their chip in byte-exchange
/// transactions.
impl MockSpiDevice<u8> {
    /// Expect one transaction consisting of a single write of `tx`.
    pub fn expect_write(&mut self, seq: &mut Sequence, tx: &'static [u8]) {
        self.expect_transaction()
            .withf(move |operations| match operations {
                [Operation::Write(actual)] => *actual == tx,
                _ => false,
            })
            .times(1)
            .in_sequence(seq)
            .return_const(Ok(()));
    }

    /// Expect one transaction consisting of a single full-duplex transfer of
    /// `tx`, answering with `rx`.
    pub fn expect_exchange(&mut self, seq: &mut Sequence, tx: &'static [u8], rx: &'static [u8]) {
        self.expect_transaction()
            .withf(move |operations| match operations {
                [Operation::Transfer(actual_rx, actual_tx)] => {
                    *actual_tx == tx && actual_rx.len() == rx.len()
                }
                _ => false,
            })
            .times(1)
            .in_sequence(seq)
            .returning(move |operations| {
                if let [Operation::Transfer(dest, _)] = operations {
                    dest.copy_from_slice(rx);
                }
                Ok(())
            });
    }

    /// Expect one transaction that writes a command `header` and then reads
    /// back as many bytes as `response` holds, answering with `response`.
    pub fn expect_command_response(
        &mut self,
        seq: &mut Sequence,
        header: &'static [u8],
        response: &'static [u8],
    ) {
        self.expect_transaction()
            .withf(move |operations| match operations {
                [Operation::Write(actual), Operation::Read(buffer)] => {
                    *actual == header && buffer.len() == response.len()
                }
                _ => false,
            })
            .times(1)
            .in_sequence(seq)
            .returning(move |operations| {
                if let [_, Operation::Read(buffer)] = operations {
                    buffer.copy_from_slice(response);
                }
                Ok(())
            });
    }
}
