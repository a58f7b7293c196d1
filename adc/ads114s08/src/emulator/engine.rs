use heapless::Deque;
use num_traits::FromPrimitive;

use crate::{
    opcode::{Command, ADDRESS_MASK, COUNT_MASK, RREG_PREFIX, WREG_PREFIX},
    regs::{Channel, Inpmux, Register, RegisterAddress, Status},
};

use super::{readings::ReadingGenerator, register_file::RegisterFile};

/// Number of analog inputs on the emulated part.
pub const NUM_CHANNELS: usize = 12;

/// A command stream that keeps queueing conversion data without draining it
/// saturates here; the surplus is absorbed like any other malformed input.
const OUTPUT_QUEUE_DEPTH: usize = 8;

/// The startup busy flag stays high for this many STATUS reads after reset.
const STARTUP_BUSY_READS: u8 = 3;

/// Command decoding state. Exactly one variant is active at a time.
#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    /// Waiting for the first byte of a command.
    Idle,
    /// An RREG/WREG first byte was seen; the next byte is the register count.
    AwaitingCount { write: bool },
    /// Shifting out register values on the following clocks.
    Reading { remaining: u8 },
    /// Consuming register values on the following clocks.
    Writing { remaining: u8 },
}

/// Emulated ADS114S08 behind a serial bus.
///
/// The emulator never fails and never panics: a real peripheral has no side
/// channel to report protocol violations, so out-of-range addresses read as
/// zero, dropped writes still consume their slot in the byte stream, and
/// unrecognized command bytes are absorbed.
pub struct Emulator {
    state: State,
    reg_pointer: u8,
    registers: RegisterFile,
    output: Deque<u8, OUTPUT_QUEUE_DEPTH>,
    readings: [u16; NUM_CHANNELS],
    generator: ReadingGenerator,
    simulate_startup_delay: bool,
    status_reads: u8,
}

impl Emulator {
    pub fn new() -> Self {
        Self::build(false)
    }

    /// An emulator that additionally holds the STATUS busy flag high for the
    /// first [`STARTUP_BUSY_READS`] STATUS reads after each reset, to
    /// exercise a driver's busy-poll loop.
    pub fn with_startup_delay() -> Self {
        Self::build(true)
    }

    fn build(simulate_startup_delay: bool) -> Self {
        let mut emulator = Self {
            state: State::Idle,
            reg_pointer: 0,
            registers: RegisterFile::new(),
            output: Deque::new(),
            readings: [0; NUM_CHANNELS],
            generator: ReadingGenerator::new(),
            simulate_startup_delay,
            status_reads: 0,
        };
        emulator.reset();
        emulator
    }

    /// Exchange one byte with the chip, equivalent to eight clocks of a
    /// full-duplex shift register.
    ///
    /// The returned byte reflects only state committed before this call;
    /// `input` is interpreted afterwards, once the shift has completed.
    pub fn clock(&mut self, input: u8) -> u8 {
        let output = self.shift_out();
        self.shift_in(input);
        output
    }

    /// Power-on reset.
    ///
    /// Clears the command state and any pending output, restores the register
    /// defaults and produces a fresh set of channel readings. The reading
    /// generator keeps its state across resets, so every reset sees new
    /// values.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.reg_pointer = 0;
        self.status_reads = 0;
        self.output.clear();
        self.registers.reset_to_defaults();
        for reading in &mut self.readings {
            *reading = self.generator.next();
        }
    }

    /// Reading held for `channel` since the most recent reset.
    ///
    /// Verification accessor for tests and harnesses; the driver's command
    /// path never uses it. Out-of-range channels read as zero.
    pub fn channel_reading(&self, channel: usize) -> u16 {
        self.readings.get(channel).copied().unwrap_or(0)
    }

    fn shift_out(&mut self) -> u8 {
        if let Some(byte) = self.output.pop_front() {
            return byte;
        }

        if let State::Reading { remaining } = self.state {
            self.state = match remaining.saturating_sub(1) {
                0 => State::Idle,
                remaining => State::Reading { remaining },
            };

            return match RegisterAddress::from_u8(self.reg_pointer) {
                Some(address) => {
                    if self.simulate_startup_delay && address == RegisterAddress::Status {
                        self.apply_startup_busy();
                    }
                    let value = self.registers.get(self.reg_pointer);
                    self.reg_pointer += 1;
                    value
                }
                // Walked past the last register: the pointer stays put and
                // the remainder of the read shifts out zeros.
                None => 0,
            };
        }

        0
    }

    fn shift_in(&mut self, input: u8) {
        match self.state {
            State::Writing { remaining } => {
                if self.registers.contains(self.reg_pointer) {
                    self.registers.set(self.reg_pointer, input);
                    self.reg_pointer += 1;
                }
                // A dropped write still consumes its slot in the stream.
                self.state = match remaining.saturating_sub(1) {
                    0 => State::Idle,
                    remaining => State::Writing { remaining },
                };
            }
            State::AwaitingCount { write } => {
                // Whatever arrives here is the count byte, never a new opcode.
                let remaining = (input & COUNT_MASK) + 1;
                self.state = if write {
                    State::Writing { remaining }
                } else {
                    State::Reading { remaining }
                };
            }
            State::Idle | State::Reading { .. } => self.decode(input),
        }
    }

    fn decode(&mut self, input: u8) {
        // The x in 0001 001x selects the status-byte framing variant, which
        // this single-ended emulation does not distinguish.
        if input & !0x01 == Command::Rdata.as_u8() {
            return self.load_conversion_data();
        }

        if input & !0x01 == Command::Nop.as_u8() {
            return;
        }

        match input & !ADDRESS_MASK {
            RREG_PREFIX => {
                self.reg_pointer = input & ADDRESS_MASK;
                self.state = State::AwaitingCount { write: false };
            }
            WREG_PREFIX => {
                self.reg_pointer = input & ADDRESS_MASK;
                self.state = State::AwaitingCount { write: true };
            }
            // Strobes and unknown bytes: a real peripheral has no way to
            // signal a protocol error, so they are absorbed.
            _ => trace!("absorbing unhandled command byte {}", input),
        }
    }

    fn load_conversion_data(&mut self) {
        let inpmux = Inpmux(self.registers.get(RegisterAddress::Inpmux as u8));
        let positive = inpmux.muxp();
        trace!(
            "conversion requested: IN+ = {}, IN- = {}",
            positive,
            inpmux.muxn()
        );

        // Single-ended emulation: the negative input is decoded above purely
        // for the log; common and reserved positive selections read as zero.
        let reading = match Channel::from_u8(positive) {
            Some(Channel::Common) | None => 0,
            Some(_) => self.channel_reading(positive as usize),
        };

        // MSB first; the queue drains oldest-first on the following clocks.
        let [msb, lsb] = reading.to_be_bytes();
        let _ = self.output.push_back(msb);
        let _ = self.output.push_back(lsb);
    }

    fn apply_startup_busy(&mut self) {
        let mut status = Status(self.registers.get(RegisterAddress::Status as u8));
        status.set_busy(self.status_reads < STARTUP_BUSY_READS);
        self.status_reads = self.status_reads.saturating_add(1);
        self.registers.set(RegisterAddress::Status as u8, status.value());
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}
