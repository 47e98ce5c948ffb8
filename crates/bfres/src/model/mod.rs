//! Models and everything they own.
//!
//! | Record | Signature | Contents |
//! |--------|-----------|----------|
//! | [`Model`] | `FMDL` | vertex buffers, shapes, materials, user data |
//! | [`VertexBuffer`] | `FVTX` | attribute dictionary, raw vertex buffers |
//! | [`Shape`] | `FSHP` | index buffer, material and vertex buffer indices |
//! | [`Material`] | `FMAT` | render infos, samplers, shader params, texture names |

use std::io::{Read, Seek};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::data::ResData;
use crate::dict::ResDict;
use crate::error::Result;
use crate::read::ResFileLoader;
use crate::seek::Positioned;
use crate::write::ResFileSaver;

pub mod buffer;
pub mod material;
pub mod shape;
pub mod user_data;

pub use buffer::{AttribFormat, Buffer, VertexAttrib, VertexBuffer};
pub use material::{Material, RenderInfo, RenderInfoValue, Sampler, ShaderParam, ShaderParamValue};
pub use shape::{IndexFormat, PrimitiveType, Shape};
pub use user_data::{UserData, UserDataValue};

/// A renderable model
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Model {
    /// Name of the model
    pub name: String,
    /// Path of the source file the model was exported from
    pub path: String,
    /// Vertex data referenced by [`Shape::vertex_buffer_index`]
    pub vertex_buffers: Vec<VertexBuffer>,
    /// Meshes by name
    pub shapes: ResDict<Shape>,
    /// Materials by name, referenced by [`Shape::material_index`]
    pub materials: ResDict<Material>,
    /// Custom values attached by the authoring tool
    pub user_data: ResDict<UserData>,
}

impl Model {
    /// Number of vertices over every vertex buffer.
    pub fn total_vertex_count(&self) -> u32 {
        self.vertex_buffers
            .iter()
            .map(|buffer| buffer.vertex_count)
            .sum()
    }
}

impl ResData for Model {
    fn load<R: Read + Seek>(loader: &mut ResFileLoader<R>) -> Result<Self> {
        loader.read_signature(b"FMDL")?;
        let name = loader.load_string()?.unwrap_or_default();
        let path = loader.load_string()?.unwrap_or_default();
        let vertex_buffers_offset = loader.read_offset()?;
        let shapes = loader.load_dict_values()?;
        let materials = loader.load_dict_values()?;
        let user_data = loader.load_dict_values()?;
        let vertex_buffer_count: u16 = loader.read()?;
        let _shape_count: u16 = loader.read()?;
        let _material_count: u16 = loader.read()?;
        let _user_data_count: u16 = loader.read()?;
        let _total_vertex_count: u32 = loader.read()?;
        loader.skip(4)?;

        let vertex_buffers =
            loader.load_list_at(vertex_buffers_offset, vertex_buffer_count as usize)?;

        Ok(Model {
            name,
            path,
            vertex_buffers,
            shapes,
            materials,
            user_data,
        })
    }

    fn save<'a>(&'a self, saver: &mut ResFileSaver<'a>) -> Result<()> {
        saver.write_signature(b"FMDL")?;
        let start = saver.position()?;
        saver.save_string(&self.name)?;
        saver.save_string(&self.path)?;
        saver.save_list(&self.vertex_buffers)?;
        saver.save_dict_values(&self.shapes)?;
        saver.save_dict_values(&self.materials)?;
        saver.save_dict_values(&self.user_data)?;
        saver.relocate_run(start)?;

        saver.write_count::<u16>(self.vertex_buffers.len(), "vertex buffers")?;
        saver.write_count::<u16>(self.shapes.len(), "shapes")?;
        saver.write_count::<u16>(self.materials.len(), "materials")?;
        saver.write_count::<u16>(self.user_data.len(), "user data entries")?;
        saver.write(&self.total_vertex_count())?;
        saver.write(&0u32)
    }
}
