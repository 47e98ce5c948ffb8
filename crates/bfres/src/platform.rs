//! The two on-disk layouts of a BFRES file and the parameters that distinguish them.

use binrw::Endian;
use derive_more::derive::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The console a file was laid out for
#[derive(Debug, Display, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Platform {
    /// Big endian, 32-bit self-relative offsets
    #[display("WiiU")]
    WiiU,

    /// Little endian, 64-bit absolute offsets with a relocation table
    #[default]
    #[display("Switch")]
    Switch,
}

/// Size of the offset fields used by a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerWidth {
    /// 4 byte offsets
    U32,
    /// 8 byte offsets
    U64,
}

impl PointerWidth {
    /// Number of bytes occupied by one offset.
    pub const fn size(self) -> u64 {
        match self {
            PointerWidth::U32 => 4,
            PointerWidth::U64 => 8,
        }
    }
}

/// Parameters shared by the loader and saver that select one of the on-disk layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Which console the layout belongs to
    pub platform: Platform,
    /// Byte order of every multi-byte value
    pub endian: Endian,
    /// Width of offset fields
    pub pointer: PointerWidth,
    /// Offsets store `target - field position` instead of `target`
    pub relative_offsets: bool,
    /// Alignment of every queued block in the main region
    pub alignment: u64,
    /// Alignment of raw buffer data and of each buffer region
    pub buffer_alignment: u64,
    /// Strings may be shared between sections and are cached by offset while loading
    pub cache_strings: bool,
    /// The saver emits an `_RLT` relocation table
    pub relocation_table: bool,
}

impl Layout {
    /// The layout used by WiiU files.
    pub const WIIU: Layout = Layout {
        platform: Platform::WiiU,
        endian: Endian::Big,
        pointer: PointerWidth::U32,
        relative_offsets: true,
        alignment: 4,
        buffer_alignment: 0x20,
        cache_strings: false,
        relocation_table: false,
    };

    /// The layout used by Switch files.
    pub const SWITCH: Layout = Layout {
        platform: Platform::Switch,
        endian: Endian::Little,
        pointer: PointerWidth::U64,
        relative_offsets: false,
        alignment: 8,
        buffer_alignment: 8,
        cache_strings: true,
        relocation_table: true,
    };

    /// Look up the layout for a platform.
    pub const fn for_platform(platform: Platform) -> Layout {
        match platform {
            Platform::WiiU => Self::WIIU,
            Platform::Switch => Self::SWITCH,
        }
    }

    /// Whether this is the Switch layout.
    pub fn is_switch(&self) -> bool {
        self.platform == Platform::Switch
    }
}

/// Round `value` up to the next multiple of `alignment`.
pub const fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        value
    } else {
        value.div_ceil(alignment) * alignment
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{align_up, Layout, Platform};

    #[test]
    fn alignment() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(0x21, 0x20), 0x40);
        assert_eq!(align_up(7, 1), 7);
    }

    #[test]
    fn layouts_by_platform() {
        assert_eq!(Layout::for_platform(Platform::WiiU).pointer.size(), 4);
        assert!(Layout::for_platform(Platform::Switch).relocation_table);
        assert!(!Layout::WIIU.is_switch());
    }
}
