use std::borrow::Cow;
use std::io::{Read, Seek};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::data::ResData;
use crate::error::{Error, Result};
use crate::read::ResFileLoader;
use crate::reloc::RelocationSection;
use crate::seek::Positioned;
use crate::write::{BufferRegion, ResFileSaver};

res_enum! {
    /// Width of the stored indices
    #[derive(Default)]
    pub enum IndexFormat: u32 {
        /// 16-bit indices
        #[default]
        UInt16 = 4,
        /// 32-bit indices
        UInt32 = 9,
    }
}

res_enum! {
    /// How indices are assembled into primitives
    #[derive(Default)]
    pub enum PrimitiveType: u32 {
        /// Points
        Points = 0x01,
        /// Lines
        Lines = 0x02,
        /// Line strip
        LineStrip = 0x03,
        /// Triangles
        #[default]
        Triangles = 0x04,
        /// Triangle fan
        TriangleFan = 0x05,
        /// Triangle strip
        TriangleStrip = 0x06,
        /// Lines with adjacency
        LinesAdjacency = 0x0A,
        /// Line strip with adjacency
        LineStripAdjacency = 0x0B,
        /// Triangles with adjacency
        TrianglesAdjacency = 0x0C,
        /// Triangle strip with adjacency
        TriangleStripAdjacency = 0x0D,
        /// Rectangles
        Rects = 0x11,
        /// Line loop
        LineLoop = 0x12,
        /// Quads
        Quads = 0x13,
        /// Quad strip
        QuadStrip = 0x14,
    }
}

/// A mesh drawn with one material
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Shape {
    pub name: String,
    pub flags: u32,
    /// Index of the material in the owning model
    pub material_index: u16,
    /// Index of the vertex buffer in the owning model
    pub vertex_buffer_index: u16,
    pub index_format: IndexFormat,
    pub primitive_type: PrimitiveType,
    /// Decoded indices, re-encoded in the target byte order on save
    pub indices: Vec<u32>,
}

impl Shape {
    fn encode_indices(&self, saver: &ResFileSaver<'_>) -> Result<Vec<u8>> {
        match self.index_format {
            IndexFormat::UInt16 => {
                let indices = self
                    .indices
                    .iter()
                    .map(|&index| {
                        u16::try_from(index).map_err(|_| {
                            Error::InvalidValue(format!(
                                "index {index} of shape {:?} does not fit 16 bits",
                                self.name
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                saver.encode(&indices)
            }
            IndexFormat::UInt32 => saver.encode(&self.indices),
        }
    }
}

impl ResData for Shape {
    fn load<R: Read + Seek>(loader: &mut ResFileLoader<R>) -> Result<Self> {
        loader.read_signature(b"FSHP")?;
        let name = loader.load_string()?.unwrap_or_default();
        let indices_offset = loader.read_offset()?;
        let flags = loader.read()?;
        let material_index = loader.read()?;
        let vertex_buffer_index = loader.read()?;
        let index_format = IndexFormat::try_from(loader.read::<u32>()?)?;
        let primitive_type = PrimitiveType::try_from(loader.read::<u32>()?)?;
        let count: u32 = loader.read()?;
        loader.skip(4)?;

        let indices = loader
            .load_custom_at(indices_offset, |loader| match index_format {
                IndexFormat::UInt16 => Ok(loader
                    .read_vec::<u16>(count as usize)?
                    .into_iter()
                    .map(u32::from)
                    .collect()),
                IndexFormat::UInt32 => loader.read_vec::<u32>(count as usize),
            })?
            .unwrap_or_default();

        Ok(Shape {
            name,
            flags,
            material_index,
            vertex_buffer_index,
            index_format,
            primitive_type,
            indices,
        })
    }

    fn save<'a>(&'a self, saver: &mut ResFileSaver<'a>) -> Result<()> {
        saver.write_signature(b"FSHP")?;
        let start = saver.position()?;
        saver.save_string(&self.name)?;
        saver.relocate_run(start)?;

        let indices = saver.position()?;
        let data = self.encode_indices(saver)?;
        saver.save_buffer(BufferRegion::Index, Cow::Owned(data))?;
        saver.relocate(RelocationSection::IndexBuffer, indices, 1, 1, 0);

        saver.write(&self.flags)?;
        saver.write(&self.material_index)?;
        saver.write(&self.vertex_buffer_index)?;
        saver.write(&u32::from(self.index_format))?;
        saver.write(&u32::from(self.primitive_type))?;
        saver.write_count::<u32>(self.indices.len(), "indices")?;
        saver.write(&0u32)
    }
}
