//! Materials and the parameters they hand to the shader.

use std::io::{Read, Seek};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bits::BitField;
use crate::data::ResData;
use crate::dict::ResDict;
use crate::error::{Error, Result};
use crate::model::UserData;
use crate::read::ResFileLoader;
use crate::seek::Positioned;
use crate::write::ResFileSaver;

/// Surface description of one or more shapes
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Material {
    /// Name of the material
    pub name: String,
    /// Visibility flags
    pub flags: u32,
    /// Values consumed by the runtime renderer
    pub render_infos: ResDict<RenderInfo>,
    /// Texture samplers by name
    pub samplers: ResDict<Sampler>,
    /// Uniform values by name
    pub shader_params: ResDict<ShaderParam>,
    /// Names of the textures bound to the samplers, in sampler order
    pub textures: Vec<String>,
    /// Custom values attached by the authoring tool
    pub user_data: ResDict<UserData>,
}

impl ResData for Material {
    fn load<R: Read + Seek>(loader: &mut ResFileLoader<R>) -> Result<Self> {
        loader.read_signature(b"FMAT")?;
        let name = loader.load_string()?.unwrap_or_default();
        let render_infos = loader.load_dict_values()?;
        let samplers = loader.load_dict_values()?;
        let shader_params = loader.load_dict_values()?;
        let textures_offset = loader.read_offset()?;
        let user_data = loader.load_dict_values()?;
        let flags = loader.read()?;
        let _render_info_count: u16 = loader.read()?;
        let _sampler_count: u16 = loader.read()?;
        let _shader_param_count: u16 = loader.read()?;
        let texture_count: u16 = loader.read()?;
        let _user_data_count: u16 = loader.read()?;
        loader.skip(2)?;

        let textures = loader
            .load_custom_at(textures_offset, |loader| {
                loader.load_strings(texture_count as usize)
            })?
            .unwrap_or_default();

        Ok(Material {
            name,
            flags,
            render_infos,
            samplers,
            shader_params,
            textures,
            user_data,
        })
    }

    fn save<'a>(&'a self, saver: &mut ResFileSaver<'a>) -> Result<()> {
        saver.write_signature(b"FMAT")?;
        let start = saver.position()?;
        saver.save_string(&self.name)?;
        saver.save_dict_values(&self.render_infos)?;
        saver.save_dict_values(&self.samplers)?;
        saver.save_dict_values(&self.shader_params)?;
        saver.save_strings(&self.textures)?;
        saver.save_dict_values(&self.user_data)?;
        saver.relocate_run(start)?;

        saver.write(&self.flags)?;
        saver.write_count::<u16>(self.render_infos.len(), "render infos")?;
        saver.write_count::<u16>(self.samplers.len(), "samplers")?;
        saver.write_count::<u16>(self.shader_params.len(), "shader parameters")?;
        saver.write_count::<u16>(self.textures.len(), "textures")?;
        saver.write_count::<u16>(self.user_data.len(), "user data entries")?;
        saver.write(&0u16)
    }
}

/// Typed values of a [`RenderInfo`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RenderInfoValue {
    Int32(Vec<i32>),
    Single(Vec<f32>),
    String(Vec<String>),
}

impl Default for RenderInfoValue {
    fn default() -> Self {
        RenderInfoValue::Int32(Vec::new())
    }
}

impl RenderInfoValue {
    fn type_tag(&self) -> u8 {
        match self {
            RenderInfoValue::Int32(_) => 0,
            RenderInfoValue::Single(_) => 1,
            RenderInfoValue::String(_) => 2,
        }
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            RenderInfoValue::Int32(values) => values.len(),
            RenderInfoValue::Single(values) => values.len(),
            RenderInfoValue::String(values) => values.len(),
        }
    }

    /// Whether there are no values
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named value list for the runtime renderer
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RenderInfo {
    pub name: String,
    pub value: RenderInfoValue,
}

impl ResData for RenderInfo {
    fn load<R: Read + Seek>(loader: &mut ResFileLoader<R>) -> Result<Self> {
        let name = loader.load_string()?.unwrap_or_default();
        let offset = loader.read_offset()?;
        let count = loader.read::<u16>()? as usize;
        let tag: u8 = loader.read()?;
        loader.skip(5)?;

        let value = match tag {
            0 => RenderInfoValue::Int32(
                loader
                    .load_custom_at(offset, |loader| loader.read_vec(count))?
                    .unwrap_or_default(),
            ),
            1 => RenderInfoValue::Single(
                loader
                    .load_custom_at(offset, |loader| loader.read_vec(count))?
                    .unwrap_or_default(),
            ),
            2 => RenderInfoValue::String(
                loader
                    .load_custom_at(offset, |loader| loader.load_strings(count))?
                    .unwrap_or_default(),
            ),
            tag => {
                return Err(Error::InvalidEnumValue {
                    name: "RenderInfoType",
                    value: tag as u32,
                })
            }
        };
        Ok(RenderInfo { name, value })
    }

    fn save<'a>(&'a self, saver: &mut ResFileSaver<'a>) -> Result<()> {
        let start = saver.position()?;
        saver.save_string(&self.name)?;
        match &self.value {
            RenderInfoValue::Int32(values) => saver.save_encoded(values)?,
            RenderInfoValue::Single(values) => saver.save_encoded(values)?,
            RenderInfoValue::String(values) => saver.save_strings(values)?,
        }
        saver.relocate_run(start)?;
        saver.write_count::<u16>(self.value.len(), "render info values")?;
        saver.write(&self.value.type_tag())?;
        saver.write_zeros(5)
    }
}

res_enum! {
    /// Texture coordinate wrapping
    #[derive(Default)]
    pub enum TexClamp: u32 {
        #[default]
        Wrap = 0,
        Mirror = 1,
        Clamp = 2,
        MirrorOnce = 3,
        ClampHalfBorder = 4,
        MirrorOnceHalfBorder = 5,
        ClampBorder = 6,
        MirrorOnceBorder = 7,
    }
}

res_enum! {
    /// Minification and magnification filter
    #[derive(Default)]
    pub enum TexFilter: u32 {
        #[default]
        Point = 0,
        Linear = 1,
    }
}

res_enum! {
    /// Filter between mipmap levels
    #[derive(Default)]
    pub enum MipFilter: u32 {
        #[default]
        None = 0,
        Point = 1,
        Linear = 2,
    }
}

res_enum! {
    /// Maximum anisotropic filtering ratio
    #[derive(Default)]
    pub enum MaxAnisotropy: u32 {
        #[default]
        Ratio1To1 = 0,
        Ratio2To1 = 1,
        Ratio4To1 = 2,
        Ratio8To1 = 3,
        Ratio16To1 = 4,
    }
}

macro_rules! sampler_field {
    ($get:ident, $set:ident, $ty:ty, $first_bit:expr, $bits:expr) => {
        #[doc = concat!("Decoded `", stringify!($get), "` field of the first sampler word.")]
        pub fn $get(&self) -> Result<$ty> {
            <$ty>::try_from(self.words[0].decode_bits($first_bit, $bits))
        }

        #[doc = concat!("Replace the `", stringify!($get), "` field of the first sampler word.")]
        pub fn $set(&mut self, value: $ty) {
            self.words[0] = self.words[0].encode_bits(u32::from(value), $first_bit, $bits);
        }
    };
}

/// A texture sampler, stored as the three GX2 sampler words
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sampler {
    pub name: String,
    pub words: [u32; 3],
}

impl Sampler {
    sampler_field!(clamp_x, set_clamp_x, TexClamp, 0, 3);
    sampler_field!(clamp_y, set_clamp_y, TexClamp, 3, 3);
    sampler_field!(clamp_z, set_clamp_z, TexClamp, 6, 3);
    sampler_field!(mag_filter, set_mag_filter, TexFilter, 9, 2);
    sampler_field!(min_filter, set_min_filter, TexFilter, 12, 2);
    sampler_field!(mip_filter, set_mip_filter, MipFilter, 17, 2);
    sampler_field!(max_anisotropy, set_max_anisotropy, MaxAnisotropy, 19, 3);
}

impl ResData for Sampler {
    fn load<R: Read + Seek>(loader: &mut ResFileLoader<R>) -> Result<Self> {
        let name = loader.load_string()?.unwrap_or_default();
        let words = loader.read()?;
        loader.skip(4)?;
        Ok(Sampler { name, words })
    }

    fn save<'a>(&'a self, saver: &mut ResFileSaver<'a>) -> Result<()> {
        let start = saver.position()?;
        saver.save_string(&self.name)?;
        saver.relocate_run(start)?;
        saver.write(&self.words)?;
        saver.write(&0u32)
    }
}

res_enum! {
    /// How a [`TexSrt`] is combined with texture coordinates
    #[derive(Default)]
    pub enum TexSrtMode: u32 {
        #[default]
        Maya = 0,
        Max = 1,
        Softimage = 2,
    }
}

/// 2D scale, rotate, translate transform
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Srt2D {
    pub scaling: [f32; 2],
    pub rotation: f32,
    pub translation: [f32; 2],
}

/// 3D scale, rotate, translate transform
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Srt3D {
    pub scaling: [f32; 3],
    pub rotation: [f32; 3],
    pub translation: [f32; 3],
}

/// Texture coordinate transform
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TexSrt {
    pub mode: TexSrtMode,
    pub scaling: [f32; 2],
    pub rotation: f32,
    pub translation: [f32; 2],
}

/// Value of a [`ShaderParam`]
///
/// Vectors hold one to four components. Every component is stored as a 32-bit word; booleans are
/// stored as 0 or 1.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShaderParamValue {
    Bool(Vec<bool>),
    Int(Vec<i32>),
    UInt(Vec<u32>),
    Float(Vec<f32>),
    Srt2D(Srt2D),
    Srt3D(Srt3D),
    TexSrt(TexSrt),
}

impl Default for ShaderParamValue {
    fn default() -> Self {
        ShaderParamValue::Float(vec![0.0])
    }
}

impl ShaderParamValue {
    const SRT_2D: u8 = 28;
    const SRT_3D: u8 = 29;
    const TEX_SRT: u8 = 30;

    fn vector_tag(base: u8, len: usize) -> Result<u8> {
        match len {
            1..=4 => Ok(base + len as u8 - 1),
            len => Err(Error::InvalidValue(format!(
                "shader parameter vectors hold 1 to 4 components, found {len}"
            ))),
        }
    }

    /// The on-disk type tag.
    pub fn type_tag(&self) -> Result<u8> {
        match self {
            ShaderParamValue::Bool(values) => Self::vector_tag(0, values.len()),
            ShaderParamValue::Int(values) => Self::vector_tag(4, values.len()),
            ShaderParamValue::UInt(values) => Self::vector_tag(8, values.len()),
            ShaderParamValue::Float(values) => Self::vector_tag(12, values.len()),
            ShaderParamValue::Srt2D(_) => Ok(Self::SRT_2D),
            ShaderParamValue::Srt3D(_) => Ok(Self::SRT_3D),
            ShaderParamValue::TexSrt(_) => Ok(Self::TEX_SRT),
        }
    }

    /// The value as the 32-bit words it is stored as.
    pub fn to_words(&self) -> Vec<u32> {
        match self {
            ShaderParamValue::Bool(values) => values.iter().map(|&v| v as u32).collect(),
            ShaderParamValue::Int(values) => values.iter().map(|&v| v as u32).collect(),
            ShaderParamValue::UInt(values) => values.clone(),
            ShaderParamValue::Float(values) => values.iter().map(|v| v.to_bits()).collect(),
            ShaderParamValue::Srt2D(srt) => [
                srt.scaling[0],
                srt.scaling[1],
                srt.rotation,
                srt.translation[0],
                srt.translation[1],
            ]
            .iter()
            .map(|v| v.to_bits())
            .collect(),
            ShaderParamValue::Srt3D(srt) => srt
                .scaling
                .iter()
                .chain(&srt.rotation)
                .chain(&srt.translation)
                .map(|v| v.to_bits())
                .collect(),
            ShaderParamValue::TexSrt(srt) => std::iter::once(u32::from(srt.mode))
                .chain(
                    [
                        srt.scaling[0],
                        srt.scaling[1],
                        srt.rotation,
                        srt.translation[0],
                        srt.translation[1],
                    ]
                    .iter()
                    .map(|v| v.to_bits()),
                )
                .collect(),
        }
    }

    /// Number of words stored for a type tag.
    pub fn word_count(tag: u8) -> Result<usize> {
        match tag {
            0..=15 => Ok((tag % 4) as usize + 1),
            Self::SRT_2D => Ok(5),
            Self::SRT_3D => Ok(9),
            Self::TEX_SRT => Ok(6),
            tag => Err(Error::InvalidEnumValue {
                name: "ShaderParamType",
                value: tag as u32,
            }),
        }
    }

    /// Rebuild a value from its type tag and stored words.
    pub fn from_words(tag: u8, words: &[u32]) -> Result<Self> {
        let expected = Self::word_count(tag)?;
        if words.len() != expected {
            return Err(Error::InvalidValue(format!(
                "shader parameter type {tag} needs {expected} words, found {}",
                words.len()
            )));
        }
        let float = |index: usize| f32::from_bits(words[index]);

        Ok(match tag {
            0..=3 => ShaderParamValue::Bool(words.iter().map(|&w| w != 0).collect()),
            4..=7 => ShaderParamValue::Int(words.iter().map(|&w| w as i32).collect()),
            8..=11 => ShaderParamValue::UInt(words.to_vec()),
            12..=15 => ShaderParamValue::Float(words.iter().map(|&w| f32::from_bits(w)).collect()),
            Self::SRT_2D => ShaderParamValue::Srt2D(Srt2D {
                scaling: [float(0), float(1)],
                rotation: float(2),
                translation: [float(3), float(4)],
            }),
            Self::SRT_3D => ShaderParamValue::Srt3D(Srt3D {
                scaling: [float(0), float(1), float(2)],
                rotation: [float(3), float(4), float(5)],
                translation: [float(6), float(7), float(8)],
            }),
            _ => ShaderParamValue::TexSrt(TexSrt {
                mode: TexSrtMode::try_from(words[0])?,
                scaling: [float(1), float(2)],
                rotation: float(3),
                translation: [float(4), float(5)],
            }),
        })
    }
}

/// A named uniform value
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShaderParam {
    pub name: String,
    pub value: ShaderParamValue,
}

impl ResData for ShaderParam {
    fn load<R: Read + Seek>(loader: &mut ResFileLoader<R>) -> Result<Self> {
        let name = loader.load_string()?.unwrap_or_default();
        let offset = loader.read_offset()?;
        let tag: u8 = loader.read()?;
        let _size: u8 = loader.read()?;
        loader.skip(6)?;

        let count = ShaderParamValue::word_count(tag)?;
        let value = loader
            .load_custom_at(offset, |loader| {
                let words = loader.read_vec::<u32>(count)?;
                ShaderParamValue::from_words(tag, &words)
            })?
            .ok_or_else(|| Error::InvalidValue(format!("shader parameter {name:?} has no value")))?;
        Ok(ShaderParam { name, value })
    }

    fn save<'a>(&'a self, saver: &mut ResFileSaver<'a>) -> Result<()> {
        let tag = self.value.type_tag()?;
        let words = self.value.to_words();

        let start = saver.position()?;
        saver.save_string(&self.name)?;
        saver.save_encoded(&words)?;
        saver.relocate_run(start)?;
        saver.write(&tag)?;
        saver.write(&((words.len() * 4) as u8))?;
        saver.write_zeros(6)
    }
}
