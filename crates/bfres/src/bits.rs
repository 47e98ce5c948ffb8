//! Helpers for packed bit fields inside fixed-width integers.
//!
//! All operations are pure and total. Bit positions are counted from the least significant bit;
//! keeping `first_bit + bits` within the width of the integer is the caller's responsibility.
//!
//! ```
//! use bfres::bits::BitField;
//!
//! let flags = 0u16.encode_bits(3, 4, 3);
//! assert_eq!(flags, 0b0011_0000);
//! assert_eq!(flags.decode_bits(4, 3), 3);
//! ```

/// The direction in which [`BitField::rotate_bits`] moves bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateDirection {
    /// Towards the most significant bit
    Left,
    /// Towards the least significant bit
    Right,
}

/// Bit-level accessors for the unsigned integer widths used by the format
pub trait BitField: Sized + Copy {
    /// Extract `bits` bits starting at `first_bit`.
    fn decode_bits(self, first_bit: u32, bits: u32) -> Self;

    /// Replace `bits` bits starting at `first_bit` with the low bits of `field`.
    ///
    /// The target range is cleared before `field` is OR'ed in; bits of `field` beyond `bits` are ignored.
    fn encode_bits(self, field: Self, first_bit: u32, bits: u32) -> Self;

    /// Whether the bit at `index` is set.
    fn get_bit(self, index: u32) -> bool;

    /// Set the bit at `index` to `enabled`.
    fn set_bit(self, index: u32, enabled: bool) -> Self;

    /// Set the bit at `index`.
    fn enable_bit(self, index: u32) -> Self {
        self.set_bit(index, true)
    }

    /// Clear the bit at `index`.
    fn disable_bit(self, index: u32) -> Self {
        self.set_bit(index, false)
    }

    /// Flip the bit at `index`.
    fn toggle_bit(self, index: u32) -> Self {
        self.set_bit(index, !self.get_bit(index))
    }

    /// Rotate all bits by `count` positions.
    fn rotate_bits(self, count: u32, direction: RotateDirection) -> Self;
}

macro_rules! impl_bit_field {
    ($($ty:ty),*) => {
        $(
            impl BitField for $ty {
                #[inline]
                fn decode_bits(self, first_bit: u32, bits: u32) -> Self {
                    let mask = if bits >= <$ty>::BITS { <$ty>::MAX } else { (1 << bits) - 1 };
                    (self >> first_bit) & mask
                }

                #[inline]
                fn encode_bits(self, field: Self, first_bit: u32, bits: u32) -> Self {
                    let mask = if bits >= <$ty>::BITS { <$ty>::MAX } else { (1 << bits) - 1 };
                    (self & !(mask << first_bit)) | ((field & mask) << first_bit)
                }

                #[inline]
                fn get_bit(self, index: u32) -> bool {
                    (self >> index) & 1 == 1
                }

                #[inline]
                fn set_bit(self, index: u32, enabled: bool) -> Self {
                    if enabled {
                        self | (1 << index)
                    } else {
                        self & !(1 << index)
                    }
                }

                #[inline]
                fn rotate_bits(self, count: u32, direction: RotateDirection) -> Self {
                    match direction {
                        RotateDirection::Left => self.rotate_left(count),
                        RotateDirection::Right => self.rotate_right(count),
                    }
                }
            }
        )*
    };
}

impl_bit_field!(u8, u16, u32, u64);

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{BitField, RotateDirection};

    #[test]
    fn field_round_trip_over_every_position() {
        for first_bit in 0..32u32 {
            for bits in 0..=(32 - first_bit) {
                let max = if bits == 32 { u32::MAX } else { (1u32 << bits) - 1 };
                for value in [0, 1, max / 2, max] {
                    let encoded = 0u32.encode_bits(value, first_bit, bits);
                    assert_eq!(encoded.decode_bits(first_bit, bits), value);
                }
            }
        }
    }

    #[test]
    fn encode_clears_previous_field() {
        let value = 0xFFFF_FFFFu32.encode_bits(0b0101, 8, 4);
        assert_eq!(value, 0xFFFF_F5FF);
        assert_eq!(0u32.encode_bits(0xFF, 0, 4), 0xF);
    }

    #[test]
    fn single_bits() {
        let value = 0u8.enable_bit(7).enable_bit(0);
        assert_eq!(value, 0x81);
        assert!(value.get_bit(7));
        assert!(!value.get_bit(3));
        assert_eq!(value.disable_bit(7), 0x01);
        assert_eq!(value.toggle_bit(1), 0x83);
        assert_eq!(value.set_bit(0, false), 0x80);
    }

    #[test]
    fn rotation() {
        assert_eq!(0x81u8.rotate_bits(1, RotateDirection::Left), 0x03);
        assert_eq!(0x81u8.rotate_bits(1, RotateDirection::Right), 0xC0);
        assert_eq!(0x8000_0001u32.rotate_bits(4, RotateDirection::Left), 0x0000_0018);
    }
}
