use std::borrow::Cow;
use std::io::{Read, Seek};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::data::ResData;
use crate::error::Result;
use crate::read::ResFileLoader;
use crate::seek::Positioned;
use crate::write::{BufferRegion, ResFileSaver};

/// An arbitrary file embedded in the container, such as a shader archive
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExternalFile {
    pub data: Vec<u8>,
}

impl ResData for ExternalFile {
    fn load<R: Read + Seek>(loader: &mut ResFileLoader<R>) -> Result<Self> {
        let offset = loader.read_offset()?;
        let size: u32 = loader.read()?;
        loader.skip(4)?;
        let data = loader
            .load_custom_at(offset, |loader| loader.read_bytes(size as usize))?
            .unwrap_or_default();
        Ok(ExternalFile { data })
    }

    fn save<'a>(&'a self, saver: &mut ResFileSaver<'a>) -> Result<()> {
        let start = saver.position()?;
        saver.save_buffer(BufferRegion::External, Cow::Borrowed(&self.data))?;
        saver.relocate(BufferRegion::External.section(), start, 1, 1, 0);
        saver.write_count::<u32>(self.data.len(), "external file bytes")?;
        saver.write(&0u32)
    }
}
