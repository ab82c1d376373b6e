//! ROHC CRC-8 (RFC 3095, Section 5.9.1) used to protect IR headers.
//!
//! Wraps the `crc` crate's `CRC_8_ROHC` algorithm in a reusable calculator.

use crc::{CRC_8_ROHC, Crc};
use std::fmt;

/// Pre-initialized CRC-8/ROHC calculator, owned by each engine half.
pub struct CrcCalculator {
    crc8_calculator: Crc<u8>,
}

impl fmt::Debug for CrcCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrcCalculator")
            .field("crc8_calculator", &format_args!("Crc<u8>(ROHC_CRC8_Algo)"))
            .finish()
    }
}

impl CrcCalculator {
    /// Creates a new calculator.
    pub fn new() -> Self {
        Self {
            crc8_calculator: Crc::<u8>::new(&CRC_8_ROHC),
        }
    }

    /// Calculates the ROHC 8-bit CRC over `input`.
    ///
    /// Polynomial `0x07`, initial value `0xFF`, no reflection, no final XOR.
    #[inline]
    pub fn crc8(&self, input: &[u8]) -> u8 {
        self.crc8_calculator.checksum(input)
    }
}

impl Default for CrcCalculator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rohc_crc8_standard_test_vector() {
        let calculator = CrcCalculator::new();
        assert_eq!(calculator.crc8(b"123456789"), 0xD0);
        assert_eq!(CRC_8_ROHC.check, 0xD0);
    }

    #[test]
    fn rohc_crc8_empty_input() {
        assert_eq!(CrcCalculator::new().crc8(b""), 0xFF);
    }

    #[test]
    fn crc_calculator_debug_format() {
        let debug_str = format!("{:?}", CrcCalculator::default());
        assert!(debug_str.contains("crc8_calculator: Crc<u8>(ROHC_CRC8_Algo)"));
    }
}
