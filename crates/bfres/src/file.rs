//! The root record of a BFRES file and the entry points for reading and writing whole files.

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use binrw::BinRead;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::anim::MaterialAnim;
use crate::data::ResData;
use crate::dict::ResDict;
use crate::error::{Error, Result};
use crate::external::ExternalFile;
use crate::model::Model;
use crate::platform::{Layout, Platform};
use crate::read::{LoadOptions, ResFileLoader};
use crate::reloc::{RelocationSection, RelocationTable};
use crate::seek::Positioned;
use crate::write::{HeaderField, ResFileSaver, SaveOptions};

const WIIU_MAGIC: &[u8; 4] = b"FRES";
const SWITCH_MAGIC: &[u8; 8] = b"FRES    ";
const BYTE_ORDER_MARK: u16 = 0xFEFF;
const WIIU_HEADER_LENGTH: u16 = 0x10;
const RELOCATION_TABLE_FIELD: u64 = 0x14;

/// A BFRES container
///
/// ```no_run
/// # fn doit() -> bfres::error::Result<()>
/// # {
/// use std::fs::File;
/// use std::io::BufReader;
///
/// use bfres::platform::Platform;
/// use bfres::{LoadOptions, ResFile, SaveOptions};
///
/// let reader = BufReader::new(File::open("Link.bfres")?);
/// let file = ResFile::from_reader(reader, LoadOptions::default())?;
/// for (name, model) in &file.models {
///     println!("{name}: {} shapes", model.shapes.len());
/// }
///
/// let switch = file.to_bytes(SaveOptions::builder().platform(Platform::Switch).build())?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResFile {
    pub name: String,
    pub version: u32,
    /// Alignment requested for the file when loaded into memory
    pub alignment: u32,
    /// Layout the file was loaded from, used when saving without an explicit platform
    pub platform: Platform,
    pub models: ResDict<Model>,
    pub material_anims: ResDict<MaterialAnim>,
    pub external_files: ResDict<ExternalFile>,
}

impl Default for ResFile {
    fn default() -> Self {
        ResFile {
            name: String::new(),
            version: 0,
            alignment: 0x1000,
            platform: Platform::default(),
            models: ResDict::new(),
            material_anims: ResDict::new(),
            external_files: ResDict::new(),
        }
    }
}

fn read_platform<R: Read>(reader: &mut R) -> Result<Platform> {
    let mut magic = [0u8; 8];
    match reader.read_exact(&mut magic) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Err(Error::InvalidFile),
        Err(err) => return Err(err.into()),
    }

    if &magic == SWITCH_MAGIC {
        Ok(Platform::Switch)
    } else if &magic[..4] == WIIU_MAGIC {
        Ok(Platform::WiiU)
    } else {
        Err(Error::InvalidFile)
    }
}

impl ResFile {
    /// Load a whole file, detecting its layout from the signature.
    #[instrument(skip(reader), err)]
    pub fn from_reader<R: Read + Seek>(mut reader: R, options: LoadOptions) -> Result<ResFile> {
        reader.seek(SeekFrom::Start(0))?;
        let platform = read_platform(&mut reader)?;
        reader.seek(SeekFrom::Start(0))?;
        debug!(%platform, "detected layout");

        let mut loader = ResFileLoader::new(reader, Layout::for_platform(platform), options)?;
        let file = ResFile::load(&mut loader)?;
        info!(
            name = %file.name,
            models = file.models.len(),
            material_anims = file.material_anims.len(),
            external_files = file.external_files.len(),
            "loaded file"
        );
        Ok(file)
    }

    /// Load a whole file from memory.
    pub fn from_bytes(data: &[u8], options: LoadOptions) -> Result<ResFile> {
        ResFile::from_reader(std::io::Cursor::new(data), options)
    }

    /// Serialize the file, in the layout of [`SaveOptions::platform`] or the one it was loaded from.
    #[instrument(skip(self), err)]
    pub fn to_bytes(&self, options: SaveOptions) -> Result<Vec<u8>> {
        let platform = options.platform.unwrap_or(self.platform);
        let mut saver = ResFileSaver::new(Layout::for_platform(platform));
        self.save(&mut saver)?;
        let data = saver.finish()?;
        info!(%platform, size = data.len(), "saved file");
        Ok(data)
    }

    /// Serialize the file into `writer`.
    pub fn to_writer<W: Write>(&self, mut writer: W, options: SaveOptions) -> Result<()> {
        writer.write_all(&self.to_bytes(options)?)?;
        Ok(())
    }

    /// Read the `_RLT` block of a Switch file; WiiU files have none.
    pub fn read_relocation_table<R: Read + Seek>(mut reader: R) -> Result<Option<RelocationTable>> {
        reader.seek(SeekFrom::Start(0))?;
        if read_platform(&mut reader)? != Platform::Switch {
            return Ok(None);
        }

        reader.seek(SeekFrom::Start(RELOCATION_TABLE_FIELD))?;
        let position = u32::read_le(&mut reader)?;
        if position == 0 {
            return Ok(None);
        }
        reader.seek(SeekFrom::Start(position as u64))?;
        Ok(Some(RelocationTable::read(&mut reader)?))
    }

    /// Walk the stored trie of every dictionary in the file for each of its keys.
    ///
    /// Only loaded files, or dictionaries that have been rebuilt, carry a meaningful trie.
    pub fn validate_dicts(&self) -> Result<()> {
        fn check<T>(dict: &ResDict<T>) -> Result<()> {
            for key in dict.keys() {
                dict.traverse(key)?;
            }
            Ok(())
        }

        check(&self.models)?;
        check(&self.material_anims)?;
        check(&self.external_files)?;
        for model in self.models.values() {
            check(&model.shapes)?;
            check(&model.materials)?;
            check(&model.user_data)?;
            for buffer in &model.vertex_buffers {
                check(&buffer.attributes)?;
            }
            for material in model.materials.values() {
                check(&material.render_infos)?;
                check(&material.samplers)?;
                check(&material.shader_params)?;
                check(&material.user_data)?;
            }
        }
        Ok(())
    }

    /// Recompute the trie of every dictionary in the file from its keys.
    pub fn rebuild_dicts(&mut self) -> Result<()> {
        self.models.rebuild()?;
        self.material_anims.rebuild()?;
        self.external_files.rebuild()?;
        for model in self.models.values_mut() {
            model.shapes.rebuild()?;
            model.materials.rebuild()?;
            model.user_data.rebuild()?;
            for buffer in &mut model.vertex_buffers {
                buffer.attributes.rebuild()?;
            }
            for material in model.materials.values_mut() {
                material.render_infos.rebuild()?;
                material.samplers.rebuild()?;
                material.shader_params.rebuild()?;
                material.user_data.rebuild()?;
            }
        }
        Ok(())
    }

    fn load_wiiu<R: Read + Seek>(loader: &mut ResFileLoader<R>) -> Result<ResFile> {
        loader.read_magic(WIIU_MAGIC)?;
        let version = loader.read()?;
        if loader.read::<u16>()? != BYTE_ORDER_MARK {
            return Err(Error::InvalidFile);
        }
        let _header_length: u16 = loader.read()?;
        let _file_size: u32 = loader.read()?;
        let alignment = loader.read()?;
        let name = loader.load_string()?.unwrap_or_default();
        let _string_pool_size: u32 = loader.read()?;
        let _string_pool = loader.read_offset()?;
        let models = loader.load_dict_values()?;
        let material_anims = loader.load_dict_values()?;
        let external_files = loader.load_dict_values()?;
        loader.skip(8)?;
        // runtime user pointer
        loader.skip(4)?;

        Ok(ResFile {
            name,
            version,
            alignment,
            platform: Platform::WiiU,
            models,
            material_anims,
            external_files,
        })
    }

    fn load_switch<R: Read + Seek>(loader: &mut ResFileLoader<R>) -> Result<ResFile> {
        let magic = loader.read_bytes(SWITCH_MAGIC.len())?;
        if magic != SWITCH_MAGIC {
            return Err(Error::InvalidFile);
        }
        let version = loader.read()?;
        if loader.read::<u16>()? != BYTE_ORDER_MARK {
            return Err(Error::InvalidFile);
        }
        let alignment_shift: u8 = loader.read()?;
        loader.skip(1)?;
        let string_table: u32 = loader.read()?;
        let _relocation_table: u32 = loader.read()?;
        let _file_size: u32 = loader.read()?;
        loader.skip(4)?;

        if loader.options().preload_strings {
            loader.preload_string_table(string_table as u64)?;
        }

        let name = loader.load_string()?.unwrap_or_default();
        let models = loader.load_dict_values()?;
        let material_anims = loader.load_dict_values()?;
        let external_files = loader.load_dict_values()?;
        let _memory_pool = loader.read_offset()?;
        // runtime user pointer, then the counts
        loader.skip(8 + 8)?;

        Ok(ResFile {
            name,
            version,
            alignment: 1u32.checked_shl(alignment_shift as u32).unwrap_or(0),
            platform: Platform::Switch,
            models,
            material_anims,
            external_files,
        })
    }

    fn has_vertex_buffers(&self) -> bool {
        self.models
            .values()
            .any(|model| !model.vertex_buffers.is_empty())
    }

    fn save_counts(&self, saver: &mut ResFileSaver<'_>) -> Result<()> {
        saver.write_count::<u16>(self.models.len(), "models")?;
        saver.write_count::<u16>(self.material_anims.len(), "material animations")?;
        saver.write_count::<u16>(self.external_files.len(), "external files")?;
        saver.write(&0u16)
    }
}

impl ResData for ResFile {
    fn load<R: Read + Seek>(loader: &mut ResFileLoader<R>) -> Result<Self> {
        match loader.platform() {
            Platform::WiiU => ResFile::load_wiiu(loader),
            Platform::Switch => ResFile::load_switch(loader),
        }
    }

    fn save<'a>(&'a self, saver: &mut ResFileSaver<'a>) -> Result<()> {
        match saver.platform() {
            Platform::WiiU => {
                saver.write_bytes(WIIU_MAGIC)?;
                saver.write(&self.version)?;
                saver.write(&BYTE_ORDER_MARK)?;
                saver.write(&WIIU_HEADER_LENGTH)?;
                saver.reserve_field(HeaderField::FileSize)?;
                saver.write(&self.alignment)?;
                saver.save_string(&self.name)?;
                saver.reserve_field(HeaderField::StringPoolSize)?;
                saver.save_string_pool_offset()?;
                saver.save_dict_values(&self.models)?;
                saver.save_dict_values(&self.material_anims)?;
                saver.save_dict_values(&self.external_files)?;
                self.save_counts(saver)?;
                saver.write(&0u32)
            }
            Platform::Switch => {
                saver.write_bytes(SWITCH_MAGIC)?;
                saver.write(&self.version)?;
                saver.write(&BYTE_ORDER_MARK)?;
                saver.write(&(self.alignment.max(1).trailing_zeros() as u8))?;
                saver.write(&0u8)?;
                saver.reserve_field(HeaderField::StringTable)?;
                saver.reserve_field(HeaderField::RelocationTable)?;
                saver.reserve_field(HeaderField::FileSize)?;
                saver.write(&0u32)?;

                let start = saver.position()?;
                saver.save_string(&self.name)?;
                saver.save_dict_values(&self.models)?;
                saver.save_dict_values(&self.material_anims)?;
                saver.save_dict_values(&self.external_files)?;
                saver.relocate_run(start)?;

                if self.has_vertex_buffers() {
                    let pool = saver.position()?;
                    saver.save_memory_pool()?;
                    saver.relocate(RelocationSection::MemoryPool, pool, 1, 1, 0);
                } else {
                    saver.write_null_offset()?;
                }
                saver.write(&0u64)?;
                self.save_counts(saver)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use crate::error::{Error, Result};
    use crate::platform::Platform;
    use crate::read::LoadOptions;
    use crate::write::SaveOptions;

    use super::ResFile;

    #[test]
    fn unknown_signature_is_not_a_file() {
        for data in [&b"FRE"[..], b"BNTX\0\0\0\0", b"\0\0\0\0\0\0\0\0"] {
            assert!(matches!(
                ResFile::from_bytes(data, LoadOptions::default()),
                Err(Error::InvalidFile)
            ));
        }
    }

    #[test]
    fn empty_file_headers() -> Result<()> {
        let file = ResFile {
            name: "Empty".to_owned(),
            version: 0x0005_0003,
            ..Default::default()
        };

        let wiiu = file.to_bytes(SaveOptions::builder().platform(Platform::WiiU).build())?;
        assert_eq!(&wiiu[..4], b"FRES");
        assert_eq!(&wiiu[8..12], &[0xFE, 0xFF, 0x00, 0x10]);
        assert_eq!(&wiiu[0x0C..0x10], &(wiiu.len() as u32).to_be_bytes());

        let switch = file.to_bytes(SaveOptions::default())?;
        assert_eq!(&switch[..8], b"FRES    ");
        assert_eq!(&switch[0x0C..0x0F], &[0xFF, 0xFE, 12]);
        assert_eq!(&switch[0x18..0x1C], &(switch.len() as u32).to_le_bytes());

        for data in [wiiu, switch] {
            let loaded = ResFile::from_reader(Cursor::new(data), LoadOptions::default())?;
            assert_eq!(loaded.name, "Empty");
            assert_eq!(loaded.version, 0x0005_0003);
            assert_eq!(loaded.alignment, 0x1000);
        }
        Ok(())
    }

    #[test]
    fn byte_order_mark_is_checked() -> Result<()> {
        let mut data = ResFile::default().to_bytes(SaveOptions::default())?;
        data[0x0C] = 0xFE;
        data[0x0D] = 0xFF;
        assert!(matches!(
            ResFile::from_bytes(&data, LoadOptions::default()),
            Err(Error::InvalidFile)
        ));
        Ok(())
    }

    #[test]
    fn wiiu_files_have_no_relocation_table() -> Result<()> {
        let data = ResFile::default().to_bytes(SaveOptions::builder().platform(Platform::WiiU).build())?;
        assert_eq!(ResFile::read_relocation_table(Cursor::new(data))?, None);
        Ok(())
    }
}
