//! Material animations and the keyframe curves they consist of.
//!
//! A curve stores one frame value per key and `elements_per_key` key values per key. Curves are
//! kept as stored; evaluating them is left to the consumer.
//!
//! | Bits  | Curve flag field |
//! |-------|------------------|
//! | 0-1   | frame type       |
//! | 2-3   | key type         |
//! | 4-6   | curve type       |
//! | 8-9   | pre-wrap mode    |
//! | 12-13 | post-wrap mode   |

use std::io::{Read, Seek};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bits::BitField;
use crate::data::ResData;
use crate::decimal::Decimal10x5;
use crate::error::{Error, Result};
use crate::read::ResFileLoader;
use crate::seek::Positioned;
use crate::write::ResFileSaver;

res_enum! {
    /// Interpolation between keys
    #[derive(Default)]
    pub enum CurveType: u16 {
        #[default]
        Cubic = 0,
        Linear = 1,
        BakedFloat = 2,
        StepInt = 4,
        BakedInt = 5,
        StepBool = 6,
        BakedBool = 7,
    }
}

impl CurveType {
    /// Number of key values stored per frame.
    pub const fn elements_per_key(self) -> usize {
        match self {
            CurveType::Cubic => 4,
            CurveType::Linear => 2,
            _ => 1,
        }
    }
}

res_enum! {
    /// Behavior outside of the curve's frame range
    #[derive(Default)]
    pub enum WrapMode: u16 {
        #[default]
        Clamp = 0,
        Repeat = 1,
        Mirror = 2,
        Relative = 3,
    }
}

res_enum! {
    /// Storage of the frame array
    pub enum FrameType: u16 {
        Single = 0,
        Decimal10x5 = 1,
        Byte = 2,
    }
}

res_enum! {
    /// Storage of the key array
    pub enum KeyType: u16 {
        Single = 0,
        Int16 = 1,
        SByte = 2,
    }
}

/// Frame positions of the keys
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FrameData {
    Single(Vec<f32>),
    Decimal10x5(Vec<Decimal10x5>),
    Byte(Vec<u8>),
}

impl Default for FrameData {
    fn default() -> Self {
        FrameData::Single(Vec::new())
    }
}

impl FrameData {
    pub fn frame_type(&self) -> FrameType {
        match self {
            FrameData::Single(_) => FrameType::Single,
            FrameData::Decimal10x5(_) => FrameType::Decimal10x5,
            FrameData::Byte(_) => FrameType::Byte,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FrameData::Single(frames) => frames.len(),
            FrameData::Decimal10x5(frames) => frames.len(),
            FrameData::Byte(frames) => frames.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frame positions as floats.
    pub fn to_f32(&self) -> Vec<f32> {
        match self {
            FrameData::Single(frames) => frames.clone(),
            FrameData::Decimal10x5(frames) => frames.iter().map(|&frame| frame.into()).collect(),
            FrameData::Byte(frames) => frames.iter().map(|&frame| frame as f32).collect(),
        }
    }
}

/// Key values, `elements_per_key` per frame
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KeyData {
    Single(Vec<f32>),
    Int16(Vec<i16>),
    SByte(Vec<i8>),
}

impl Default for KeyData {
    fn default() -> Self {
        KeyData::Single(Vec::new())
    }
}

impl KeyData {
    pub fn key_type(&self) -> KeyType {
        match self {
            KeyData::Single(_) => KeyType::Single,
            KeyData::Int16(_) => KeyType::Int16,
            KeyData::SByte(_) => KeyType::SByte,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            KeyData::Single(keys) => keys.len(),
            KeyData::Int16(keys) => keys.len(),
            KeyData::SByte(keys) => keys.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Animates a single value of a material over time
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnimCurve {
    pub curve_type: CurveType,
    pub pre_wrap: WrapMode,
    pub post_wrap: WrapMode,
    /// Byte offset of the animated member inside its target
    pub target_offset: u32,
    pub start_frame: f32,
    pub end_frame: f32,
    /// Factor applied to stored keys
    pub scale: f32,
    /// Added to stored keys after scaling
    pub offset: f32,
    /// Difference between the last and first key value
    pub delta: f32,
    pub frames: FrameData,
    pub keys: KeyData,
}

impl AnimCurve {
    /// The packed flags describing this curve.
    pub fn flags(&self) -> u16 {
        0u16.encode_bits(self.frames.frame_type().into(), 0, 2)
            .encode_bits(self.keys.key_type().into(), 2, 2)
            .encode_bits(self.curve_type.into(), 4, 3)
            .encode_bits(self.pre_wrap.into(), 8, 2)
            .encode_bits(self.post_wrap.into(), 12, 2)
    }

    /// Check that the key array holds exactly one set of elements per frame.
    pub fn validate(&self) -> Result<()> {
        if self.frames.len() > u16::MAX as usize {
            return Err(Error::InvalidValue(format!(
                "curves hold at most {} keys, found {}",
                u16::MAX,
                self.frames.len()
            )));
        }
        let expected = self.frames.len() * self.curve_type.elements_per_key();
        if self.keys.len() != expected {
            return Err(Error::InvalidValue(format!(
                "{:?} curve with {} frames needs {expected} key values, found {}",
                self.curve_type,
                self.frames.len(),
                self.keys.len()
            )));
        }
        Ok(())
    }
}

impl ResData for AnimCurve {
    fn load<R: Read + Seek>(loader: &mut ResFileLoader<R>) -> Result<Self> {
        let frames_offset = loader.read_offset()?;
        let keys_offset = loader.read_offset()?;
        let flags: u16 = loader.read()?;
        let key_count = loader.read::<u16>()? as usize;
        let target_offset = loader.read()?;
        let start_frame = loader.read()?;
        let end_frame = loader.read()?;
        let scale = loader.read()?;
        let offset = loader.read()?;
        let delta = loader.read()?;
        loader.skip(4)?;

        let frame_type = FrameType::try_from(flags.decode_bits(0, 2))?;
        let key_type = KeyType::try_from(flags.decode_bits(2, 2))?;
        let curve_type = CurveType::try_from(flags.decode_bits(4, 3))?;
        let pre_wrap = WrapMode::try_from(flags.decode_bits(8, 2))?;
        let post_wrap = WrapMode::try_from(flags.decode_bits(12, 2))?;
        let value_count = key_count * curve_type.elements_per_key();

        let frames = match frame_type {
            FrameType::Single => FrameData::Single(
                loader
                    .load_custom_at(frames_offset, |loader| loader.read_vec(key_count))?
                    .unwrap_or_default(),
            ),
            FrameType::Decimal10x5 => FrameData::Decimal10x5(
                loader
                    .load_custom_at(frames_offset, |loader| loader.read_vec::<u16>(key_count))?
                    .unwrap_or_default()
                    .into_iter()
                    .map(Decimal10x5::from_raw)
                    .collect(),
            ),
            FrameType::Byte => FrameData::Byte(
                loader
                    .load_custom_at(frames_offset, |loader| loader.read_vec(key_count))?
                    .unwrap_or_default(),
            ),
        };
        let keys = match key_type {
            KeyType::Single => KeyData::Single(
                loader
                    .load_custom_at(keys_offset, |loader| loader.read_vec(value_count))?
                    .unwrap_or_default(),
            ),
            KeyType::Int16 => KeyData::Int16(
                loader
                    .load_custom_at(keys_offset, |loader| loader.read_vec(value_count))?
                    .unwrap_or_default(),
            ),
            KeyType::SByte => KeyData::SByte(
                loader
                    .load_custom_at(keys_offset, |loader| loader.read_vec(value_count))?
                    .unwrap_or_default(),
            ),
        };
        if frames.len() != key_count {
            warn!(key_count, "curve without frame data");
        }

        Ok(AnimCurve {
            curve_type,
            pre_wrap,
            post_wrap,
            target_offset,
            start_frame,
            end_frame,
            scale,
            offset,
            delta,
            frames,
            keys,
        })
    }

    fn save<'a>(&'a self, saver: &mut ResFileSaver<'a>) -> Result<()> {
        self.validate()?;

        let start = saver.position()?;
        match &self.frames {
            FrameData::Single(frames) => saver.save_encoded(frames)?,
            FrameData::Decimal10x5(frames) => {
                let raw: Vec<u16> = frames.iter().map(|frame| frame.raw()).collect();
                saver.save_encoded(&raw)?
            }
            FrameData::Byte(frames) => saver.save_encoded(frames)?,
        }
        match &self.keys {
            KeyData::Single(keys) => saver.save_encoded(keys)?,
            KeyData::Int16(keys) => saver.save_encoded(keys)?,
            KeyData::SByte(keys) => saver.save_encoded(keys)?,
        }
        saver.relocate_run(start)?;

        saver.write(&self.flags())?;
        saver.write_count::<u16>(self.frames.len(), "frames")?;
        saver.write(&self.target_offset)?;
        saver.write(&self.start_frame)?;
        saver.write(&self.end_frame)?;
        saver.write(&self.scale)?;
        saver.write(&self.offset)?;
        saver.write(&self.delta)?;
        saver.write(&0u32)
    }
}

/// Animates parameters of materials
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaterialAnim {
    pub name: String,
    pub path: String,
    pub flags: u32,
    pub frame_count: i32,
    /// Size of the baked curves in bytes
    pub baked_size: u32,
    pub curves: Vec<AnimCurve>,
}

impl ResData for MaterialAnim {
    fn load<R: Read + Seek>(loader: &mut ResFileLoader<R>) -> Result<Self> {
        loader.read_signature(b"FMAA")?;
        let name = loader.load_string()?.unwrap_or_default();
        let path = loader.load_string()?.unwrap_or_default();
        let curves_offset = loader.read_offset()?;
        let flags = loader.read()?;
        let frame_count = loader.read()?;
        let baked_size = loader.read()?;
        let curve_count: u16 = loader.read()?;
        loader.skip(2)?;

        let curves = loader.load_list_at(curves_offset, curve_count as usize)?;
        Ok(MaterialAnim {
            name,
            path,
            flags,
            frame_count,
            baked_size,
            curves,
        })
    }

    fn save<'a>(&'a self, saver: &mut ResFileSaver<'a>) -> Result<()> {
        saver.write_signature(b"FMAA")?;
        let start = saver.position()?;
        saver.save_string(&self.name)?;
        saver.save_string(&self.path)?;
        saver.save_list(&self.curves)?;
        saver.relocate_run(start)?;

        saver.write(&self.flags)?;
        saver.write(&self.frame_count)?;
        saver.write(&self.baked_size)?;
        saver.write_count::<u16>(self.curves.len(), "curves")?;
        saver.write(&0u16)
    }
}
