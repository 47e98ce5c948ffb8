//! Fixed-point frame values used by compact animation curves.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A signed 16-bit fixed point number with 10 integer and 5 fractional bits.
///
/// The represented value is `raw as i16 / 32`, covering `-1024.0..=1023.96875` in steps of `1/32`.
/// Converting from `f32` rounds to the nearest step and saturates at the range limits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Decimal10x5(u16);

impl Decimal10x5 {
    const SCALE: f32 = 32.0;

    /// Wrap a raw on-disk value.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// The raw on-disk value.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// The represented value.
    pub fn to_f32(self) -> f32 {
        self.0 as i16 as f32 / Self::SCALE
    }
}

impl fmt::Display for Decimal10x5 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f32())
    }
}

impl From<f32> for Decimal10x5 {
    fn from(value: f32) -> Self {
        let scaled = (value * Self::SCALE).round();
        Self(scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16 as u16)
    }
}

impl From<Decimal10x5> for f32 {
    fn from(value: Decimal10x5) -> Self {
        value.to_f32()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::Decimal10x5;

    #[test]
    fn converts_exact_steps() {
        assert_eq!(Decimal10x5::from(1.5).raw(), 48);
        assert_eq!(Decimal10x5::from_raw(48).to_f32(), 1.5);
        assert_eq!(Decimal10x5::from(-2.0).raw(), 0xFFC0);
        assert_eq!(Decimal10x5::from_raw(0xFFC0).to_f32(), -2.0);
    }

    #[test]
    fn rounds_and_saturates() {
        assert_eq!(Decimal10x5::from(0.02).raw(), 1);
        assert_eq!(Decimal10x5::from(5000.0).raw(), i16::MAX as u16);
        assert_eq!(Decimal10x5::from(-5000.0).to_f32(), -1024.0);
    }
}
