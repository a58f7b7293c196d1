use num_traits::FromPrimitive;

use crate::regs::{RegisterAddress, REGISTER_COUNT};

/// The device register map: 18 byte-wide registers with fixed power-on
/// defaults.
///
/// Addresses outside the map read as zero and silently drop writes; a real
/// peripheral has no way to fault on a bad address.
pub struct RegisterFile {
    values: [u8; REGISTER_COUNT],
}

impl RegisterFile {
    pub fn new() -> Self {
        let mut file = Self {
            values: [0; REGISTER_COUNT],
        };
        file.reset_to_defaults();
        file
    }

    pub fn contains(&self, address: u8) -> bool {
        (address as usize) < REGISTER_COUNT
    }

    pub fn get(&self, address: u8) -> u8 {
        self.values.get(address as usize).copied().unwrap_or(0)
    }

    pub fn set(&mut self, address: u8, value: u8) {
        if let Some(slot) = self.values.get_mut(address as usize) {
            *slot = value;
        }
    }

    pub fn reset_to_defaults(&mut self) {
        for (index, value) in self.values.iter_mut().enumerate() {
            *value = match RegisterAddress::from_usize(index) {
                Some(address) => address.reset_value(),
                None => 0,
            };
        }
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}
