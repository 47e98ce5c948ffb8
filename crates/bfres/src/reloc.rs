//! The `_RLT` relocation table written at the end of Switch files.
//!
//! Switch files store absolute pointers. The relocation table lists the position of every pointer,
//! grouped by the memory region it refers to, so the runtime can rebase them once the file is mapped.
//!
//! | Offset (bytes) | Field         | Description                                              |
//! |----------------|---------------|----------------------------------------------------------|
//! | 0x0000         | Magic number  | 4 bytes: "_RLT"                                          |
//! | 0x0004         | Position      | 4 bytes: Absolute position of the table itself           |
//! | 0x0008         | Section count | 4 bytes: Always 5                                        |
//! | 0x000C         | Padding       | 4 bytes                                                  |
//! | 0x0010         | Sections      | 24 bytes each: pointer, position, size, index, count     |
//! | ...            | Entries       | 8 bytes each: position, struct, offset and padding count |
//!
//! An entry describes `struct_count` structs laid out back to back, each starting with
//! `offset_count` pointers followed by `padding_count` pointer-sized words that are not rebased.

use binrw::binrw;
use derive_more::derive::Display;
use tracing::trace;

/// Number of pointers a single entry can describe
pub const MAX_OFFSET_COUNT: u32 = u8::MAX as u32;

/// Memory regions that pointers are grouped by
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelocationSection {
    /// Header, records and the string pool
    #[display("main")]
    Main = 0,
    /// Raw index buffer data
    #[display("index buffer")]
    IndexBuffer = 1,
    /// Raw vertex buffer data
    #[display("vertex buffer")]
    VertexBuffer = 2,
    /// The runtime memory pool
    #[display("memory pool")]
    MemoryPool = 3,
    /// Embedded external files
    #[display("external file")]
    ExternalFile = 4,
}

impl RelocationSection {
    /// Every section, in table order.
    pub const ALL: [RelocationSection; 5] = [
        RelocationSection::Main,
        RelocationSection::IndexBuffer,
        RelocationSection::VertexBuffer,
        RelocationSection::MemoryPool,
        RelocationSection::ExternalFile,
    ];
}

/// A run of pointers to rebase
#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationEntry {
    /// Absolute position of the first pointer
    pub position: u32,
    /// Number of consecutive structs sharing this pattern
    pub struct_count: u16,
    /// Pointers at the start of each struct
    pub offset_count: u8,
    /// Pointer-sized words following the pointers in each struct
    pub padding_count: u8,
}

/// Region descriptor of the relocation table
#[binrw]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionInfo {
    /// Start of the region
    #[brw(pad_before = 8)]
    pub position: u32,
    /// Size of the region in bytes
    pub size: u32,
    /// Index of the first entry of this section in [`RelocationTable::entries`]
    pub entry_index: u32,
    /// Number of entries belonging to this section
    pub entry_count: u32,
}

/// Parsed or generated `_RLT` block
#[binrw]
#[brw(magic = b"_RLT", little)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocationTable {
    /// Absolute position of the table itself
    pub position: u32,

    #[br(temp)]
    #[bw(calc = sections.len() as u32)]
    #[brw(pad_after = 4)]
    section_count: u32,

    /// Region descriptors, in [`RelocationSection::ALL`] order
    #[br(count = section_count)]
    pub sections: Vec<SectionInfo>,

    /// Entries of all sections, concatenated in section order
    #[br(count = sections.iter().map(|s| s.entry_count as usize).sum::<usize>())]
    pub entries: Vec<RelocationEntry>,
}

impl RelocationTable {
    /// The entries belonging to one section.
    pub fn section_entries(&self, section: RelocationSection) -> &[RelocationEntry] {
        let Some(info) = self.sections.get(section as usize) else {
            return &[];
        };
        let start = info.entry_index as usize;
        let end = start + info.entry_count as usize;
        self.entries.get(start..end).unwrap_or(&[])
    }
}

/// Collects pointer runs while a file is saved
#[derive(Debug, Clone)]
pub struct RelocationTableBuilder {
    pointer_size: u64,
    entries: [Vec<RelocationEntry>; 5],
}

impl RelocationTableBuilder {
    /// Create an empty builder for pointers of `pointer_size` bytes.
    pub fn new(pointer_size: u64) -> Self {
        RelocationTableBuilder {
            pointer_size,
            entries: Default::default(),
        }
    }

    /// Register a run of pointers.
    ///
    /// Runs of more than [`MAX_OFFSET_COUNT`] pointers are split into consecutive entries.
    ///
    /// # Panics
    ///
    /// Panics if `struct_count` is zero.
    pub fn add(
        &mut self,
        section: RelocationSection,
        position: u64,
        offset_count: u32,
        struct_count: u16,
        padding_count: u8,
    ) {
        assert!(
            struct_count > 0,
            "relocation entry at {position:#x} must describe at least one struct"
        );
        trace!(%section, position, offset_count, struct_count, "relocation run");

        let mut position = position;
        let mut remaining = offset_count;
        while remaining > 0 {
            let count = remaining.min(MAX_OFFSET_COUNT);
            self.entries[section as usize].push(RelocationEntry {
                position: position as u32,
                struct_count,
                offset_count: count as u8,
                padding_count,
            });
            remaining -= count;
            position += MAX_OFFSET_COUNT as u64 * self.pointer_size;
        }
    }

    /// Number of entries registered so far.
    pub fn len(&self) -> usize {
        self.entries.iter().map(Vec::len).sum()
    }

    /// Whether no entries have been registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Produce the final table.
    ///
    /// `regions` holds the `(position, size)` of every section in [`RelocationSection::ALL`]
    /// order. A region with size zero is placed at the position of the previous non-empty region.
    pub fn build(mut self, position: u64, regions: [(u64, u64); 5]) -> RelocationTable {
        let mut sections = Vec::with_capacity(regions.len());
        let mut entries = Vec::with_capacity(self.len());
        let mut last_position = 0;

        for ((region_position, size), section_entries) in regions.into_iter().zip(&mut self.entries) {
            let region_position = if size == 0 {
                last_position
            } else {
                last_position = region_position;
                region_position
            };

            section_entries.sort_by_key(|entry| entry.position);
            sections.push(SectionInfo {
                position: region_position as u32,
                size: size as u32,
                entry_index: entries.len() as u32,
                entry_count: section_entries.len() as u32,
            });
            entries.append(section_entries);
        }

        RelocationTable {
            position: position as u32,
            sections,
            entries,
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::{BinRead, BinWrite};
    use pretty_assertions::{assert_eq, assert_str_eq};

    use crate::error::Result;

    use super::{RelocationEntry, RelocationSection, RelocationTable, RelocationTableBuilder};

    #[test]
    fn long_runs_are_split() {
        let mut builder = RelocationTableBuilder::new(8);
        builder.add(RelocationSection::Main, 0x100, 300, 1, 0);

        let table = builder.build(0x2000, [(0, 0x1000), (0, 0), (0, 0), (0, 0), (0, 0)]);
        assert_eq!(
            table.entries,
            vec![
                RelocationEntry {
                    position: 0x100,
                    struct_count: 1,
                    offset_count: 255,
                    padding_count: 0,
                },
                RelocationEntry {
                    position: 0x100 + 255 * 8,
                    struct_count: 1,
                    offset_count: 45,
                    padding_count: 0,
                },
            ]
        );
    }

    #[test]
    #[should_panic]
    fn zero_struct_count_is_a_fault() {
        RelocationTableBuilder::new(8).add(RelocationSection::Main, 0, 1, 0, 0);
    }

    #[test]
    fn empty_regions_take_previous_position() {
        let mut builder = RelocationTableBuilder::new(8);
        builder.add(RelocationSection::VertexBuffer, 0x408, 1, 1, 0);
        builder.add(RelocationSection::Main, 0x40, 2, 1, 0);
        builder.add(RelocationSection::Main, 0x20, 1, 1, 0);

        let table = builder.build(
            0x600,
            [(0, 0x400), (0x400, 0), (0x400, 0x100), (0x500, 0), (0x500, 0)],
        );

        let positions: Vec<_> = table.sections.iter().map(|s| (s.position, s.size)).collect();
        assert_eq!(
            positions,
            vec![(0, 0x400), (0, 0), (0x400, 0x100), (0x400, 0), (0x400, 0)]
        );

        let main = table.section_entries(RelocationSection::Main);
        assert_eq!(main.iter().map(|e| e.position).collect::<Vec<_>>(), vec![0x20, 0x40]);
        assert_eq!(table.sections[2].entry_index, 2);
        assert_eq!(table.section_entries(RelocationSection::VertexBuffer).len(), 1);
        assert!(table.section_entries(RelocationSection::ExternalFile).is_empty());
    }

    #[test]
    fn table_layout() -> Result<()> {
        let mut builder = RelocationTableBuilder::new(8);
        builder.add(RelocationSection::Main, 0x20, 3, 1, 0);
        let table = builder.build(0x80, [(0, 0x80), (0, 0), (0, 0), (0, 0), (0, 0)]);

        let mut writer = Cursor::new(Vec::new());
        table.write(&mut writer)?;
        let data = writer.into_inner();

        #[rustfmt::skip]
        let expected: Vec<u8> = vec![
            0x5F, 0x52, 0x4C, 0x54, 0x80, 0x00, 0x00, 0x00,
            0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            // main
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
        ];
        assert_str_eq!(
            format!("{:02X?}", &data[..expected.len()]),
            format!("{:02X?}", expected)
        );
        assert_eq!(data.len(), 16 + 5 * 24 + 8);
        assert_str_eq!(
            format!("{:02X?}", &data[data.len() - 8..]),
            format!("{:02X?}", [0x20u8, 0x00, 0x00, 0x00, 0x01, 0x00, 0x03, 0x00])
        );

        let parsed = RelocationTable::read(&mut Cursor::new(data))?;
        assert_eq!(parsed, table);
        Ok(())
    }
}
