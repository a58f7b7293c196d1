/// Pseudo-random source for simulated conversion results.
///
/// A rotate-and-add walk over a 16-bit state: cheap, deterministic from the
/// fixed power-on seed, and varied enough to stand in for real samples.
pub struct ReadingGenerator {
    state: u16,
}

/// Power-on state of the generator.
const SEED: u16 = 0b1001_0110_1010_1001;

impl ReadingGenerator {
    pub const fn new() -> Self {
        Self { state: SEED }
    }

    /// Advance a state one step: rotate left one bit, then add 7.
    pub const fn step(state: u16) -> u16 {
        state.rotate_left(1).wrapping_add(7)
    }

    /// Produce the next reading, advancing the generator.
    pub fn next(&mut self) -> u16 {
        self.state = Self::step(self.state);
        self.state
    }
}

impl Default for ReadingGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_is_pure() {
        assert_eq!(ReadingGenerator::step(0x1234), ReadingGenerator::step(0x1234));
        assert_eq!(0x2D5A, ReadingGenerator::step(SEED));
    }

    #[test]
    fn first_values_from_the_seed_are_reproducible() {
        let mut generator = ReadingGenerator::new();
        assert_eq!(0x2D5A, generator.next());
        assert_eq!(0x5ABB, generator.next());
        assert_eq!(0xB57D, generator.next());
    }

    #[test]
    fn rotation_wraps_the_high_bit() {
        // 0x8000 rotates to 0x0001 before the increment.
        assert_eq!(0x0008, ReadingGenerator::step(0x8000));
    }
}
