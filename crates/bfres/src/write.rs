//! Types for writing BFRES files
//!
//! Records are written depth first: a record writes its fixed-size fields in place and reserves an
//! offset slot for everything it points to. The pointed-to data is queued and emitted once the
//! current record is complete, after which the reserved slots are patched. Strings, raw buffers and
//! the Switch relocation table are written last, once every other address is final.

use std::any::type_name;
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Debug;
use std::io::{Cursor, Seek, SeekFrom, Write};
use std::mem;

use binrw::BinWrite;
use bon::Builder;
use byteorder::WriteBytesExt;
use tracing::{debug, instrument, trace};
use widestring::U16String;

use crate::data::ResData;
use crate::dict::{build_nodes, DictNode, ResDict, DICT_MAGIC};
use crate::error::{Error, Result};
use crate::platform::{align_up, Layout, Platform, PointerWidth};
use crate::reloc::{RelocationSection, RelocationTableBuilder};
use crate::seek::Positioned;
use crate::strings::{StringPool, STRING_TABLE_MAGIC};

/// Size of the zeroed block reserved for the runtime memory pool
pub const MEMORY_POOL_SIZE: u64 = 0x120;

/// Options for how a BFRES file should be written
#[derive(Debug, Clone, Copy, Default, Builder)]
pub struct SaveOptions {
    /// Layout to write; defaults to the platform the file was loaded from
    pub platform: Option<Platform>,
}

/// Regions of raw data written after the string pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRegion {
    /// Index buffer data of shapes
    Index = 0,
    /// Vertex buffer data
    Vertex = 1,
    /// Embedded external files
    External = 2,
}

impl BufferRegion {
    /// The relocation section pointers into this region belong to.
    pub const fn section(self) -> RelocationSection {
        match self {
            BufferRegion::Index => RelocationSection::IndexBuffer,
            BufferRegion::Vertex => RelocationSection::VertexBuffer,
            BufferRegion::External => RelocationSection::ExternalFile,
        }
    }
}

/// Header fields whose values are only known once everything else has been written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    /// Total size of the file
    FileSize,
    /// Size of the WiiU string pool
    StringPoolSize,
    /// Position of the Switch `_STR` block
    StringTable,
    /// Position of the Switch `_RLT` block
    RelocationTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Identity {
    address: usize,
    kind: &'static str,
}

impl Identity {
    fn of<T>(value: &T) -> Self {
        Identity {
            address: value as *const T as usize,
            kind: type_name::<T>(),
        }
    }
}

enum Block<'a> {
    Item(&'a dyn ResData),
    Bytes(Cow<'a, [u8]>),
    Strings(&'a [String]),
    WideStrings(&'a [String]),
}

enum Emit<'a> {
    List {
        items: Vec<&'a dyn ResData>,
        item_offsets: Vec<u64>,
    },
    Dict {
        nodes: Vec<DictNode>,
        keys: Vec<&'a str>,
        values: Vec<&'a dyn ResData>,
    },
    Custom(Block<'a>),
}

impl Debug for Emit<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Emit::List { items, .. } => write!(f, "List({})", items.len()),
            Emit::Dict { keys, .. } => write!(f, "Dict({})", keys.len()),
            Emit::Custom(Block::Item(_)) => write!(f, "Item"),
            Emit::Custom(Block::Bytes(data)) => write!(f, "Bytes({})", data.len()),
            Emit::Custom(Block::Strings(strings)) => write!(f, "Strings({})", strings.len()),
            Emit::Custom(Block::WideStrings(strings)) => {
                write!(f, "WideStrings({})", strings.len())
            }
        }
    }
}

#[derive(Debug)]
struct Pending<'a> {
    identity: Option<Identity>,
    len: usize,
    offsets: Vec<u64>,
    alignment: u64,
    emit: Emit<'a>,
}

/// Writes records to an in-memory buffer, resolving offsets as their targets are emitted
///
/// ```
/// # fn doit() -> bfres::error::Result<()>
/// # {
/// use bfres::platform::Layout;
/// use bfres::write::ResFileSaver;
///
/// let name = String::from("Mt_Body");
///
/// let mut saver = ResFileSaver::new(Layout::WIIU);
/// saver.save_string(&name)?;
///
/// let data = saver.finish()?;
/// assert_eq!(&data[..4], &[0x00, 0x00, 0x00, 0x08]);
/// assert_eq!(&data[8..15], b"Mt_Body");
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct ResFileSaver<'a> {
    writer: Cursor<Vec<u8>>,
    layout: Layout,
    queue: Vec<Option<Pending<'a>>>,
    queued: HashMap<Identity, usize>,
    emitted: HashMap<Identity, (u64, usize)>,
    strings: StringPool<'a>,
    string_pool_offsets: Vec<u64>,
    buffers: [Vec<(Cow<'a, [u8]>, u64)>; 3],
    memory_pool_offsets: Vec<u64>,
    fields: Vec<(HeaderField, u64)>,
    relocations: RelocationTableBuilder,
    outstanding: BTreeSet<u64>,
}

impl Debug for ResFileSaver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResFileSaver")
            .field("layout", &self.layout)
            .field("position", &self.writer.position())
            .field("queue", &self.queue.len())
            .field("strings", &self.strings.len())
            .field("outstanding", &self.outstanding.len())
            .finish()
    }
}

impl<'a> ResFileSaver<'a> {
    /// Start an empty file laid out as `layout`.
    pub fn new(layout: Layout) -> ResFileSaver<'a> {
        ResFileSaver {
            writer: Cursor::new(Vec::new()),
            layout,
            queue: Vec::new(),
            queued: HashMap::new(),
            emitted: HashMap::new(),
            strings: StringPool::new(),
            string_pool_offsets: Vec::new(),
            buffers: Default::default(),
            memory_pool_offsets: Vec::new(),
            fields: Vec::new(),
            relocations: RelocationTableBuilder::new(layout.pointer.size()),
            outstanding: BTreeSet::new(),
        }
    }

    /// The layout being written.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Platform of the layout being written.
    pub fn platform(&self) -> Platform {
        self.layout.platform
    }

    /// Write a value in the layout's byte order.
    pub fn write<T>(&mut self, value: &T) -> Result<()>
    where
        T: for<'b> BinWrite<Args<'b> = ()>,
    {
        value.write_options(&mut self.writer, self.layout.endian, ())?;
        Ok(())
    }

    /// Write a collection length into a count field of type `T`, failing when it does not fit.
    pub fn write_count<T>(&mut self, len: usize, name: &str) -> Result<()>
    where
        T: TryFrom<usize> + for<'b> BinWrite<Args<'b> = ()>,
    {
        let count = T::try_from(len).map_err(|_| {
            Error::InvalidValue(format!("{len} {name} do not fit their count field"))
        })?;
        self.write(&count)
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        Ok(())
    }

    /// Write `count` zero bytes.
    pub fn write_zeros(&mut self, count: u64) -> Result<()> {
        for _ in 0..count {
            self.writer.write_u8(0)?;
        }
        Ok(())
    }

    /// Pad with zeros up to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: u64) -> Result<()> {
        let position = self.position()?;
        self.write_zeros(align_up(position, alignment) - position)
    }

    /// Encode a value in the layout's byte order without writing it.
    pub fn encode<T>(&self, value: &T) -> Result<Vec<u8>>
    where
        T: for<'b> BinWrite<Args<'b> = ()>,
    {
        let mut cursor = Cursor::new(Vec::new());
        value.write_options(&mut cursor, self.layout.endian, ())?;
        Ok(cursor.into_inner())
    }

    /// Write the signature starting a record; Switch records pad it to 8 bytes.
    pub fn write_signature(&mut self, signature: &[u8; 4]) -> Result<()> {
        self.write_bytes(signature)?;
        if self.layout.is_switch() {
            self.write(&0u32)?;
        }
        Ok(())
    }

    fn write_pointer(&mut self, value: u64) -> Result<()> {
        match self.layout.pointer {
            PointerWidth::U32 => self.write(&(value as u32)),
            PointerWidth::U64 => self.write(&value),
        }
    }

    /// Write an offset that points nowhere.
    pub fn write_null_offset(&mut self) -> Result<()> {
        self.write_pointer(0)
    }

    /// Reserve an offset slot at the current position and return its position.
    ///
    /// Every reserved slot must be satisfied with [`ResFileSaver::write_offset`] or
    /// [`ResFileSaver::patch_offset`] before the file is finished.
    pub fn save_offset(&mut self) -> Result<u64> {
        let slot = self.position()?;
        self.write_pointer(0)?;
        self.outstanding.insert(slot);
        Ok(slot)
    }

    /// Point the offset reserved at `slot` at `target`.
    pub fn patch_offset(&mut self, slot: u64, target: u64) -> Result<()> {
        let value = if self.layout.relative_offsets {
            (target as i64 - slot as i64) as i32 as u32 as u64
        } else {
            target
        };
        {
            let mut seek = self.temporary_seek(slot)?;
            seek.write_pointer(value)?;
        }
        self.outstanding.remove(&slot);
        Ok(())
    }

    /// Point the offset reserved at `slot` at the current position.
    pub fn write_offset(&mut self, slot: u64) -> Result<()> {
        let target = self.position()?;
        self.patch_offset(slot, target)
    }

    /// Reserve a 32-bit header field that is filled in when the file is finished.
    pub fn reserve_field(&mut self, field: HeaderField) -> Result<()> {
        let position = self.position()?;
        self.write(&0u32)?;
        self.fields.push((field, position));
        Ok(())
    }

    fn set_field(&mut self, field: HeaderField, value: u64) -> Result<()> {
        let positions: Vec<u64> = self
            .fields
            .iter()
            .filter(|(reserved, _)| *reserved == field)
            .map(|(_, position)| *position)
            .collect();
        for position in positions {
            let mut seek = self.temporary_seek(position)?;
            seek.write(&(value as u32))?;
        }
        Ok(())
    }

    /// Register a run of pointers with the relocation table; does nothing for WiiU files.
    pub fn relocate(
        &mut self,
        section: RelocationSection,
        position: u64,
        offset_count: u32,
        struct_count: u16,
        padding_count: u8,
    ) {
        if self.layout.relocation_table {
            self.relocations
                .add(section, position, offset_count, struct_count, padding_count);
        }
    }

    /// Register the pointers written since `start` as one run in the main section.
    pub fn relocate_run(&mut self, start: u64) -> Result<()> {
        let count = (self.position()? - start) / self.layout.pointer.size();
        if count > 0 {
            self.relocate(RelocationSection::Main, start, count as u32, 1, 0);
        }
        Ok(())
    }

    /// Write an offset to a pooled copy of `value`.
    pub fn save_string(&mut self, value: &'a str) -> Result<()> {
        let slot = self.save_offset()?;
        self.strings.add(value, slot);
        Ok(())
    }

    /// Write an offset to a pooled string, or a null offset.
    pub fn save_optional_string(&mut self, value: Option<&'a str>) -> Result<()> {
        match value {
            Some(value) => self.save_string(value),
            None => self.write_null_offset(),
        }
    }

    /// Write an offset to an array of string offsets.
    pub fn save_strings(&mut self, values: &'a [String]) -> Result<()> {
        if values.is_empty() {
            return self.write_null_offset();
        }
        let slot = self.save_offset()?;
        self.enqueue(None, values.len(), slot, Emit::Custom(Block::Strings(values)))
    }

    /// Write an offset to an array of offsets to zero terminated UTF-16 strings.
    pub fn save_wide_strings(&mut self, values: &'a [String]) -> Result<()> {
        if values.is_empty() {
            return self.write_null_offset();
        }
        let slot = self.save_offset()?;
        self.enqueue(None, values.len(), slot, Emit::Custom(Block::WideStrings(values)))
    }

    /// Write an offset to a block of raw bytes in the main region.
    pub fn save_bytes(&mut self, data: Cow<'a, [u8]>) -> Result<()> {
        if data.is_empty() {
            return self.write_null_offset();
        }
        let slot = self.save_offset()?;
        self.enqueue(None, 1, slot, Emit::Custom(Block::Bytes(data)))
    }

    /// Write an offset to a block holding `value` encoded in the layout's byte order.
    pub fn save_encoded<T>(&mut self, value: &T) -> Result<()>
    where
        T: for<'b> BinWrite<Args<'b> = ()>,
    {
        let data = self.encode(value)?;
        self.save_bytes(Cow::Owned(data))
    }

    /// Write an offset to a record.
    ///
    /// Saving the same record more than once emits it a single time.
    pub fn save_item<T: ResData>(&mut self, item: &'a T) -> Result<()> {
        let slot = self.save_offset()?;
        self.enqueue(
            Some(Identity::of(item)),
            1,
            slot,
            Emit::Custom(Block::Item(item)),
        )
    }

    /// Write an offset to a contiguous list of records, or a null offset for an empty list.
    ///
    /// A list starting with a record that already started an emitted list of at least the same
    /// length points at that list instead of being written again.
    pub fn save_list<T: ResData>(&mut self, items: &'a [T]) -> Result<()> {
        let Some(first) = items.first() else {
            return self.write_null_offset();
        };
        let slot = self.save_offset()?;
        self.enqueue(
            Some(Identity::of(first)),
            items.len(),
            slot,
            Emit::List {
                items: items.iter().map(|item| item as &dyn ResData).collect(),
                item_offsets: Vec::new(),
            },
        )
    }

    fn save_dict_entries<T: ResData>(
        &mut self,
        dict: &'a ResDict<T>,
        values: Vec<&'a dyn ResData>,
    ) -> Result<()> {
        let slot = self.save_offset()?;
        let nodes = build_nodes(dict.keys())?;
        self.enqueue(
            Some(Identity::of(dict)),
            1,
            slot,
            Emit::Dict {
                nodes,
                keys: dict.keys().collect(),
                values,
            },
        )
    }

    /// Write the offsets of a named collection.
    ///
    /// WiiU writes one offset to a dictionary holding the values inline, or a null offset when the
    /// collection is empty. Switch writes an offset to the value array followed by an offset to the
    /// `_DIC` key dictionary, which is emitted even when empty.
    pub fn save_dict_values<T: ResData>(&mut self, dict: &'a ResDict<T>) -> Result<()> {
        let values: Vec<&'a dyn ResData> = dict.values().map(|value| value as &dyn ResData).collect();
        match self.layout.platform {
            Platform::WiiU => {
                if dict.is_empty() {
                    return self.write_null_offset();
                }
                self.save_dict_entries(dict, values)
            }
            Platform::Switch => {
                match dict.values().next() {
                    Some(first) => {
                        let slot = self.save_offset()?;
                        self.enqueue(
                            Some(Identity::of(first)),
                            values.len(),
                            slot,
                            Emit::List {
                                items: values,
                                item_offsets: Vec::new(),
                            },
                        )?;
                    }
                    None => self.write_null_offset()?,
                }
                self.save_dict_entries(dict, Vec::new())
            }
        }
    }

    /// Write an offset to a blob in one of the raw data regions.
    pub fn save_buffer(&mut self, region: BufferRegion, data: Cow<'a, [u8]>) -> Result<()> {
        let slot = self.save_offset()?;
        self.buffers[region as usize].push((data, slot));
        Ok(())
    }

    /// Write an offset to the runtime memory pool, which is emitted when anything points to it.
    pub fn save_memory_pool(&mut self) -> Result<()> {
        let slot = self.save_offset()?;
        self.memory_pool_offsets.push(slot);
        Ok(())
    }

    /// Write an offset to the start of the WiiU string pool.
    pub fn save_string_pool_offset(&mut self) -> Result<()> {
        let slot = self.save_offset()?;
        self.string_pool_offsets.push(slot);
        Ok(())
    }

    fn enqueue(
        &mut self,
        identity: Option<Identity>,
        len: usize,
        offset: u64,
        emit: Emit<'a>,
    ) -> Result<()> {
        if let Some(identity) = identity {
            if let Some(&(position, emitted_len)) = self.emitted.get(&identity) {
                if emitted_len >= len {
                    trace!(?identity, position, "reusing emitted entry");
                    return self.patch_offset(offset, position);
                }
            }
            if let Some(&index) = self.queued.get(&identity) {
                if let Some(pending) = self.queue[index].as_mut() {
                    if pending.len >= len {
                        pending.offsets.push(offset);
                        return Ok(());
                    }
                }
            }
            self.queued.insert(identity, self.queue.len());
        }

        self.queue.push(Some(Pending {
            identity,
            len,
            offsets: vec![offset],
            alignment: self.layout.alignment,
            emit,
        }));
        Ok(())
    }

    /// Emit every queued entry, including entries queued while emitting.
    #[instrument(skip(self), err)]
    pub fn save_entries(&mut self) -> Result<()> {
        let mut index = 0;
        while index < self.queue.len() {
            if let Some(pending) = self.queue[index].take() {
                self.emit(index, pending)?;
            }
            index += 1;
        }
        debug!(count = index, "emitted queued entries");

        self.queue.clear();
        self.queued.clear();
        Ok(())
    }

    fn emit(&mut self, index: usize, pending: Pending<'a>) -> Result<()> {
        self.align(pending.alignment)?;
        let position = self.position()?;
        trace!(position, emit = ?pending.emit, "emitting");

        if let Some(identity) = pending.identity {
            if self.queued.get(&identity) == Some(&index) {
                self.queued.remove(&identity);
            }
            let longest = self.emitted.get(&identity).map_or(0, |(_, len)| *len);
            if pending.len > longest {
                self.emitted.insert(identity, (position, pending.len));
            }
        }
        for offset in pending.offsets {
            self.patch_offset(offset, position)?;
        }

        match pending.emit {
            Emit::List {
                items,
                item_offsets,
            } => {
                for (item_index, item) in items.into_iter().enumerate() {
                    if let Some(&slot) = item_offsets.get(item_index) {
                        self.write_offset(slot)?;
                    }
                    item.save(self)?;
                }
                Ok(())
            }
            Emit::Dict {
                nodes,
                keys,
                values,
            } => self.emit_dict(nodes, keys, values),
            Emit::Custom(block) => self.emit_block(block),
        }
    }

    fn write_node(&mut self, node: &DictNode) -> Result<()> {
        self.write(&node.reference)?;
        self.write(&node.left)?;
        self.write(&node.right)
    }

    fn emit_dict(
        &mut self,
        nodes: Vec<DictNode>,
        keys: Vec<&'a str>,
        values: Vec<&'a dyn ResData>,
    ) -> Result<()> {
        let count = keys.len();
        let node_count = u16::try_from(count + 1).map_err(|_| {
            Error::InvalidValue(format!("dictionary with {count} entries has too many nodes"))
        })?;
        match self.layout.platform {
            Platform::WiiU => {
                self.write(&(8 + 16 * u32::from(node_count)))?;
                self.write(&(i32::from(node_count) - 1))?;

                let mut data_offsets = Vec::with_capacity(count);
                for (index, node) in nodes.iter().enumerate() {
                    self.write_node(node)?;
                    if index == 0 {
                        self.write_null_offset()?;
                        self.write_null_offset()?;
                    } else {
                        self.save_string(keys[index - 1])?;
                        data_offsets.push(self.save_offset()?);
                    }
                }

                // values are stored as one list directly pointed to by the nodes
                if !values.is_empty() {
                    self.queue.push(Some(Pending {
                        identity: None,
                        len: values.len(),
                        offsets: Vec::new(),
                        alignment: self.layout.alignment,
                        emit: Emit::List {
                            items: values,
                            item_offsets: data_offsets,
                        },
                    }));
                }
            }
            Platform::Switch => {
                self.write_bytes(DICT_MAGIC)?;
                self.write(&(i32::from(node_count) - 1))?;

                let start = self.position()?;
                for (index, node) in nodes.iter().enumerate() {
                    self.write_node(node)?;
                    self.save_string(if index == 0 { "" } else { keys[index - 1] })?;
                }
                self.relocate(RelocationSection::Main, start + 8, 1, node_count, 1);
            }
        }
        Ok(())
    }

    fn emit_block(&mut self, block: Block<'a>) -> Result<()> {
        match block {
            Block::Item(item) => item.save(self),
            Block::Bytes(data) => self.write_bytes(&data),
            Block::Strings(values) => {
                let start = self.position()?;
                for value in values {
                    self.save_string(value)?;
                }
                self.relocate_run(start)
            }
            Block::WideStrings(values) => {
                let start = self.position()?;
                for value in values {
                    let slot = self.save_offset()?;
                    let mut units = U16String::from_str(value).into_vec();
                    units.push(0);
                    let data = self.encode(&units)?;
                    self.enqueue(None, 1, slot, Emit::Custom(Block::Bytes(Cow::Owned(data))))?;
                }
                self.relocate_run(start)
            }
        }
    }

    #[instrument(skip(self), err)]
    fn write_string_pool(&mut self) -> Result<()> {
        if self.layout.is_switch() {
            self.strings.ensure("");
        }
        let strings = self.strings.drain_sorted();
        debug!(count = strings.len(), "writing string pool");

        match self.layout.platform {
            Platform::WiiU => {
                self.align(self.layout.alignment)?;
                let start = self.position()?;
                for slot in mem::take(&mut self.string_pool_offsets) {
                    self.patch_offset(slot, start)?;
                }

                for (value, slots) in strings {
                    self.write(&(value.len() as u32))?;
                    for slot in slots {
                        self.write_offset(slot)?;
                    }
                    self.write_bytes(value.as_bytes())?;
                    self.write(&0u8)?;
                    self.align(4)?;
                }

                let size = self.position()? - start;
                self.set_field(HeaderField::StringPoolSize, size)
            }
            Platform::Switch => {
                self.align(self.layout.alignment)?;
                let start = self.position()?;
                self.set_field(HeaderField::StringTable, start)?;

                self.write_bytes(STRING_TABLE_MAGIC)?;
                let size_position = self.position()?;
                self.write(&0u32)?;
                self.write(&(strings.len().saturating_sub(1) as u64))?;

                for (value, slots) in strings {
                    for slot in slots {
                        self.write_offset(slot)?;
                    }
                    self.write_count::<u16>(value.len(), "string bytes")?;
                    self.write_bytes(value.as_bytes())?;
                    self.write(&0u8)?;
                    self.align(2)?;
                }

                let size = self.position()? - start;
                let mut seek = self.temporary_seek(size_position)?;
                seek.write(&(size as u32))
            }
        }
    }

    fn write_region(&mut self, region: BufferRegion) -> Result<(u64, u64)> {
        let blobs = mem::take(&mut self.buffers[region as usize]);
        if blobs.is_empty() {
            return Ok((self.position()?, 0));
        }

        let alignment = self.layout.buffer_alignment;
        self.align(alignment)?;
        let start = self.position()?;
        for (data, slot) in blobs {
            self.align(alignment)?;
            self.write_offset(slot)?;
            self.write_bytes(&data)?;
        }
        Ok((start, self.position()? - start))
    }

    fn write_memory_pool(&mut self) -> Result<(u64, u64)> {
        let slots = mem::take(&mut self.memory_pool_offsets);
        if slots.is_empty() {
            return Ok((self.position()?, 0));
        }

        self.align(self.layout.buffer_alignment)?;
        let start = self.position()?;
        for slot in slots {
            self.patch_offset(slot, start)?;
        }
        self.write_zeros(MEMORY_POOL_SIZE)?;
        Ok((start, MEMORY_POOL_SIZE))
    }

    /// Emit everything still queued, resolve the header fields and return the file contents.
    #[instrument(skip(self), err)]
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.save_entries()?;
        self.write_string_pool()?;
        let main = (0, self.position()?);

        let index = self.write_region(BufferRegion::Index)?;
        let vertex = self.write_region(BufferRegion::Vertex)?;
        let memory_pool = self.write_memory_pool()?;
        let external = self.write_region(BufferRegion::External)?;

        if self.layout.relocation_table {
            self.align(self.layout.alignment)?;
            let position = self.position()?;
            let builder = mem::replace(
                &mut self.relocations,
                RelocationTableBuilder::new(self.layout.pointer.size()),
            );
            let table = builder.build(position, [main, index, vertex, memory_pool, external]);
            debug!(entries = table.entries.len(), "writing relocation table");
            table.write(&mut self.writer)?;
            self.set_field(HeaderField::RelocationTable, position)?;
        }

        let size = self.position()?;
        self.set_field(HeaderField::FileSize, size)?;

        if !self.outstanding.is_empty() {
            return Err(Error::UnresolvedOffsets(self.outstanding.len()));
        }
        Ok(self.writer.into_inner())
    }
}

impl Positioned for ResFileSaver<'_> {
    fn position(&mut self) -> Result<u64> {
        Ok(self.writer.stream_position()?)
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        self.writer.seek(SeekFrom::Start(position))?;
        Ok(())
    }
}
