//! Hexadecimal digit strings to explicit bit sequences and back.

use crate::errors::{DriverError, Result};

/// Bits of every hex digit value, most significant first.
const NIBBLES: [[bool; 4]; 16] = [
    [false, false, false, false], // 0
    [false, false, false, true],  // 1
    [false, false, true, false],  // 2
    [false, false, true, true],   // 3
    [false, true, false, false],  // 4
    [false, true, false, true],   // 5
    [false, true, true, false],   // 6
    [false, true, true, true],    // 7
    [true, false, false, false],  // 8
    [true, false, false, true],   // 9
    [true, false, true, false],   // A
    [true, false, true, true],    // B
    [true, true, false, false],   // C
    [true, true, false, true],    // D
    [true, true, true, false],    // E
    [true, true, true, true],     // F
];

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Expand a string of hex digits into `4 * len` bits.
///
/// Digit `i` occupies positions `4i..4i+3`, holding bit 3 down to bit 0 of its
/// value. Digits are case-insensitive. Any other character is an error and no
/// bits are returned.
pub fn hex_to_bits(hex: &str) -> Result<Vec<bool>> {
    let mut bits = Vec::with_capacity(hex.len() * 4);
    for (position, digit) in hex.chars().enumerate() {
        let value = digit
            .to_digit(16)
            .ok_or(DriverError::InvalidHexDigit { digit, position })?;
        bits.extend_from_slice(&NIBBLES[value as usize]);
    }
    Ok(bits)
}

/// Pack bits back into uppercase hex digits, four bits per digit.
pub fn bits_to_hex(bits: &[bool]) -> Result<String> {
    if bits.len() % 4 != 0 {
        return Err(DriverError::Protocol(format!(
            "{} bits do not fill whole hex digits",
            bits.len()
        )));
    }
    Ok(bits
        .chunks_exact(4)
        .map(|nibble| {
            let value = nibble
                .iter()
                .fold(0usize, |acc, &bit| (acc << 1) | usize::from(bit));
            HEX_DIGITS[value] as char
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_digit_values() {
        for (value, nibble) in NIBBLES.iter().enumerate() {
            for (i, &bit) in nibble.iter().enumerate() {
                assert_eq!(bit, (value >> (3 - i)) & 1 == 1, "digit {value:X} bit {i}");
            }
        }
    }

    #[test]
    fn single_digits() {
        assert_eq!(hex_to_bits("8").unwrap(), vec![true, false, false, false]);
        assert_eq!(hex_to_bits("1").unwrap(), vec![false, false, false, true]);
        assert_eq!(hex_to_bits("a").unwrap(), hex_to_bits("A").unwrap());
    }

    #[test]
    fn status_pair_is_eight_bits() {
        let bits = hex_to_bits("C1").unwrap();
        assert_eq!(
            bits,
            vec![true, true, false, false, false, false, false, true]
        );
    }

    #[test]
    fn length_is_four_per_digit() {
        for input in ["", "0", "FF", "0123", "DEADBEEF"] {
            assert_eq!(hex_to_bits(input).unwrap().len(), input.len() * 4);
        }
    }

    #[test]
    fn rejects_non_hex() {
        match hex_to_bits("8G") {
            Err(DriverError::InvalidHexDigit { digit, position }) => {
                assert_eq!(digit, 'G');
                assert_eq!(position, 1);
            }
            other => panic!("expected InvalidHexDigit, got {other:?}"),
        }
        assert!(hex_to_bits(" 8").is_err());
        assert!(hex_to_bits("-1").is_err());
    }

    #[test]
    fn reencodes_to_same_digits() {
        for input in ["0", "80", "7F", "0123456789ABCDEF"] {
            let bits = hex_to_bits(input).unwrap();
            assert_eq!(bits_to_hex(&bits).unwrap(), input);
        }
    }

    #[test]
    fn partial_nibble_cannot_be_encoded() {
        assert!(bits_to_hex(&[true, false, true]).is_err());
    }
}
