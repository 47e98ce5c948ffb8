//! Vertex buffers and the attributes describing their contents.
//!
//! Vertex data is kept as raw bytes in the layout it was loaded from; only the records around it
//! are converted between platforms.

use std::borrow::Cow;
use std::io::{Read, Seek};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::data::ResData;
use crate::dict::ResDict;
use crate::error::Result;
use crate::read::ResFileLoader;
use crate::reloc::RelocationSection;
use crate::seek::Positioned;
use crate::write::{BufferRegion, ResFileSaver};

res_enum! {
    /// GX2 vertex attribute formats
    #[derive(Default)]
    pub enum AttribFormat: u32 {
        /// 8-bit normalized unsigned
        #[default]
        UNorm8 = 0x000,
        /// Two 4-bit normalized unsigned
        UNorm4x2 = 0x001,
        /// 16-bit normalized unsigned
        UNorm16 = 0x002,
        /// 16-bit float
        Float16 = 0x003,
        /// Two 8-bit normalized unsigned
        UNorm8x2 = 0x004,
        /// 32-bit unsigned
        UInt32 = 0x005,
        /// 32-bit float
        Float32 = 0x006,
        /// Two 16-bit normalized unsigned
        UNorm16x2 = 0x007,
        /// Two 16-bit floats
        Float16x2 = 0x008,
        /// Packed 10-11-11 bit floats
        Float10x11x11 = 0x009,
        /// Four 8-bit normalized unsigned
        UNorm8x4 = 0x00A,
        /// Packed 10-10-10-2 bit normalized unsigned
        UNorm10x3x2 = 0x00B,
        /// Two 32-bit unsigned
        UInt32x2 = 0x00C,
        /// Two 32-bit floats
        Float32x2 = 0x00D,
        /// Four 16-bit normalized unsigned
        UNorm16x4 = 0x00E,
        /// Four 16-bit floats
        Float16x4 = 0x00F,
        /// Three 32-bit unsigned
        UInt32x3 = 0x011,
        /// Three 32-bit floats
        Float32x3 = 0x012,
        /// Four 32-bit unsigned
        UInt32x4 = 0x013,
        /// Four 32-bit floats
        Float32x4 = 0x014,
        /// 8-bit unsigned
        UInt8 = 0x100,
        /// Two 8-bit unsigned
        UInt8x2 = 0x104,
        /// Four 8-bit unsigned
        UInt8x4 = 0x10A,
        /// 8-bit normalized signed
        SNorm8 = 0x200,
        /// Two 8-bit normalized signed
        SNorm8x2 = 0x204,
        /// Four 8-bit normalized signed
        SNorm8x4 = 0x20A,
        /// Packed 10-10-10-2 bit normalized signed
        SNorm10x3x2 = 0x20B,
        /// 8-bit signed
        SInt8 = 0x300,
        /// Two 8-bit signed
        SInt8x2 = 0x304,
        /// Four 8-bit signed
        SInt8x4 = 0x30A,
        /// 32-bit float read as 8.8 fixed point
        Float32Fixed = 0x806,
    }
}

impl AttribFormat {
    /// Number of components of one element.
    pub const fn components(self) -> u32 {
        use AttribFormat::*;
        match self {
            UNorm8 | UNorm16 | Float16 | UInt32 | Float32 | UInt8 | SNorm8 | SInt8 | Float32Fixed => 1,
            UNorm4x2 | UNorm8x2 | UNorm16x2 | Float16x2 | UInt32x2 | Float32x2 | UInt8x2
            | SNorm8x2 | SInt8x2 => 2,
            Float10x11x11 | UInt32x3 | Float32x3 => 3,
            UNorm8x4 | UNorm10x3x2 | UNorm16x4 | Float16x4 | UInt32x4 | Float32x4 | UInt8x4
            | SNorm8x4 | SNorm10x3x2 | SInt8x4 => 4,
        }
    }

    /// Size of one element in bytes.
    pub const fn size(self) -> u32 {
        use AttribFormat::*;
        match self {
            UNorm8 | UNorm4x2 | UInt8 | SNorm8 | SInt8 => 1,
            UNorm16 | Float16 | UNorm8x2 | UInt8x2 | SNorm8x2 | SInt8x2 => 2,
            UInt32 | Float32 | UNorm16x2 | Float16x2 | Float10x11x11 | UNorm8x4 | UNorm10x3x2
            | UInt8x4 | SNorm8x4 | SNorm10x3x2 | SInt8x4 | Float32Fixed => 4,
            UInt32x2 | Float32x2 | UNorm16x4 | Float16x4 => 8,
            UInt32x3 | Float32x3 => 12,
            UInt32x4 | Float32x4 => 16,
        }
    }
}

/// Describes one attribute stored in a vertex buffer
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VertexAttrib {
    /// Attribute name such as `_p0` or `_u0`
    pub name: String,
    /// Element format
    pub format: AttribFormat,
    /// Byte offset of the attribute inside a vertex
    pub offset: u16,
    /// Index of the buffer holding the attribute
    pub buffer_index: u8,
}

impl ResData for VertexAttrib {
    fn load<R: Read + Seek>(loader: &mut ResFileLoader<R>) -> Result<Self> {
        let name = loader.load_string()?.unwrap_or_default();
        let format = AttribFormat::try_from(loader.read::<u32>()?)?;
        let offset = loader.read()?;
        let buffer_index = loader.read()?;
        loader.skip(1)?;
        Ok(VertexAttrib {
            name,
            format,
            offset,
            buffer_index,
        })
    }

    fn save<'a>(&'a self, saver: &mut ResFileSaver<'a>) -> Result<()> {
        let start = saver.position()?;
        saver.save_string(&self.name)?;
        saver.relocate_run(start)?;
        saver.write(&u32::from(self.format))?;
        saver.write(&self.offset)?;
        saver.write(&self.buffer_index)?;
        saver.write(&0u8)
    }
}

/// Raw vertex data
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Buffer {
    /// Bytes of every vertex, back to back
    pub data: Vec<u8>,
    /// Distance between two vertices in bytes
    pub stride: u32,
}

impl ResData for Buffer {
    fn load<R: Read + Seek>(loader: &mut ResFileLoader<R>) -> Result<Self> {
        let offset = loader.read_offset()?;
        let size: u32 = loader.read()?;
        let stride = loader.read()?;
        let data = loader
            .load_custom_at(offset, |loader| loader.read_bytes(size as usize))?
            .unwrap_or_default();
        Ok(Buffer { data, stride })
    }

    fn save<'a>(&'a self, saver: &mut ResFileSaver<'a>) -> Result<()> {
        let start = saver.position()?;
        saver.save_buffer(BufferRegion::Vertex, Cow::Borrowed(&self.data))?;
        saver.relocate(RelocationSection::VertexBuffer, start, 1, 1, 0);
        saver.write_count::<u32>(self.data.len(), "buffer bytes")?;
        saver.write(&self.stride)
    }
}

/// The vertices used by one or more shapes
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VertexBuffer {
    /// Attributes by name
    pub attributes: ResDict<VertexAttrib>,
    /// Buffers referenced by [`VertexAttrib::buffer_index`]
    pub buffers: Vec<Buffer>,
    /// Number of vertices
    pub vertex_count: u32,
    /// Maximum number of bones influencing a vertex
    pub skin_count: u8,
}

impl ResData for VertexBuffer {
    fn load<R: Read + Seek>(loader: &mut ResFileLoader<R>) -> Result<Self> {
        loader.read_signature(b"FVTX")?;
        let attributes = loader.load_dict_values()?;
        let buffers_offset = loader.read_offset()?;
        if loader.layout().is_switch() {
            // runtime memory pool
            loader.read_offset()?;
        }
        let vertex_count = loader.read()?;
        let _attribute_count: u16 = loader.read()?;
        let buffer_count: u8 = loader.read()?;
        let skin_count = loader.read()?;
        let buffers = loader.load_list_at(buffers_offset, buffer_count as usize)?;

        Ok(VertexBuffer {
            attributes,
            buffers,
            vertex_count,
            skin_count,
        })
    }

    fn save<'a>(&'a self, saver: &mut ResFileSaver<'a>) -> Result<()> {
        saver.write_signature(b"FVTX")?;
        let start = saver.position()?;
        saver.save_dict_values(&self.attributes)?;
        saver.save_list(&self.buffers)?;
        saver.relocate_run(start)?;
        if saver.layout().is_switch() {
            let pool = saver.position()?;
            saver.save_memory_pool()?;
            saver.relocate(RelocationSection::MemoryPool, pool, 1, 1, 0);
        }
        saver.write(&self.vertex_count)?;
        saver.write_count::<u16>(self.attributes.len(), "vertex attributes")?;
        saver.write_count::<u8>(self.buffers.len(), "vertex buffers")?;
        saver.write(&self.skin_count)
    }
}
