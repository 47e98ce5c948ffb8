//! Types for reading BFRES files
//!

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Debug;
use std::io::{Read, Seek, SeekFrom};

use binrw::BinRead;
use bon::Builder;
use byteorder::ReadBytesExt;
use indexmap::IndexMap;
use tracing::{debug, instrument, warn};
use widestring::U16String;

use crate::data::ResData;
use crate::dict::{DictNode, ResDict, DICT_MAGIC};
use crate::error::{Error, Result};
use crate::platform::{align_up, Layout, Platform, PointerWidth};
use crate::seek::Positioned;
use crate::strings::{StringCache, STRING_TABLE_MAGIC};

/// Options for how a BFRES file should be read
#[derive(Debug, Clone, Copy, Builder)]
pub struct LoadOptions {
    /// Read the whole Switch string table into the string cache before loading records
    #[builder(default = true)]
    pub preload_strings: bool,

    /// Reuse lists that are referenced from more than one place instead of reading them again
    #[builder(default = true)]
    pub cache_objects: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions::builder().build()
    }
}

/// Resolves offsets and reads records from a BFRES stream
pub struct ResFileLoader<R: Read + Seek> {
    reader: R,
    layout: Layout,
    options: LoadOptions,
    stream_len: u64,
    strings: StringCache,
    objects: HashMap<(u64, TypeId), Box<dyn Any>>,
}

impl<R: Read + Seek> Debug for ResFileLoader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResFileLoader")
            .field("layout", &self.layout)
            .field("stream_len", &self.stream_len)
            .field("strings", &self.strings.len())
            .field("objects", &self.objects.len())
            .finish()
    }
}

impl<R: Read + Seek> ResFileLoader<R> {
    /// Wrap a stream laid out as `layout`; the current position is kept.
    pub fn new(mut reader: R, layout: Layout, options: LoadOptions) -> Result<Self> {
        let position = reader.stream_position()?;
        let stream_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(position))?;

        Ok(ResFileLoader {
            reader,
            layout,
            options,
            stream_len,
            strings: StringCache::new(),
            objects: HashMap::new(),
        })
    }

    /// The layout offsets and values are decoded with.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Platform of the layout.
    pub fn platform(&self) -> Platform {
        self.layout.platform
    }

    /// The options this loader was created with.
    pub fn options(&self) -> LoadOptions {
        self.options
    }

    /// Length of the underlying stream.
    pub fn stream_len(&self) -> u64 {
        self.stream_len
    }

    /// Hand back the underlying stream.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read a value in the layout's byte order.
    pub fn read<T>(&mut self) -> Result<T>
    where
        T: for<'a> BinRead<Args<'a> = ()>,
    {
        Ok(T::read_options(&mut self.reader, self.layout.endian, ())?)
    }

    /// Read `count` consecutive values.
    pub fn read_vec<T>(&mut self, count: usize) -> Result<Vec<T>>
    where
        T: for<'a> BinRead<Args<'a> = ()>,
    {
        (0..count).map(|_| self.read()).collect()
    }

    /// Read `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut data = vec![0; len];
        self.reader.read_exact(&mut data)?;
        Ok(data)
    }

    /// Skip `count` bytes.
    pub fn skip(&mut self, count: u64) -> Result<()> {
        self.reader.seek(SeekFrom::Current(count as i64))?;
        Ok(())
    }

    /// Check a 4 byte magic value.
    pub fn read_magic(&mut self, expected: &[u8; 4]) -> Result<()> {
        let mut found = [0u8; 4];
        self.reader.read_exact(&mut found)?;
        if &found != expected {
            return Err(Error::InvalidSignature {
                expected: String::from_utf8_lossy(expected).into_owned(),
                found: String::from_utf8_lossy(&found).into_owned(),
            });
        }
        Ok(())
    }

    /// Check the signature starting a record; Switch records pad it to 8 bytes.
    pub fn read_signature(&mut self, expected: &[u8; 4]) -> Result<()> {
        self.read_magic(expected)?;
        if self.layout.is_switch() {
            self.skip(4)?;
        }
        Ok(())
    }

    /// Read an offset field and resolve it to an absolute position; zero means no target.
    pub fn read_offset(&mut self) -> Result<u64> {
        let position = self.position()?;
        let value = match self.layout.pointer {
            PointerWidth::U32 => {
                let value: u32 = self.read()?;
                if self.layout.relative_offsets {
                    value as i32 as i64
                } else {
                    value as i64
                }
            }
            PointerWidth::U64 => self.read::<u64>()? as i64,
        };

        Ok(match value {
            0 => 0,
            value if self.layout.relative_offsets => (position as i64 + value) as u64,
            value => value as u64,
        })
    }

    /// Run `load` at `offset`, restoring the current position afterwards.
    ///
    /// A zero offset yields `None` without seeking.
    pub fn load_custom_at<T>(
        &mut self,
        offset: u64,
        load: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<Option<T>> {
        if offset == 0 {
            return Ok(None);
        }
        let mut seek = self.temporary_seek(offset)?;
        load(&mut seek).map(Some)
    }

    /// Read an offset at the current position and run `load` at its target.
    pub fn load_custom<T>(&mut self, load: impl FnOnce(&mut Self) -> Result<T>) -> Result<Option<T>> {
        let offset = self.read_offset()?;
        self.load_custom_at(offset, load)
    }

    /// Read an offset to a record and load it.
    pub fn load<T: ResData>(&mut self) -> Result<Option<T>> {
        self.load_custom(T::load)
    }

    /// Load `count` consecutive records at `offset`.
    ///
    /// Lists are cached by position, so a list shared between several records is only read once.
    pub fn load_list_at<T>(&mut self, offset: u64, count: usize) -> Result<Vec<T>>
    where
        T: ResData + Clone + 'static,
    {
        if offset == 0 || count == 0 {
            return Ok(Vec::new());
        }

        let key = (offset, TypeId::of::<T>());
        if self.options.cache_objects {
            let cached = self
                .objects
                .get(&key)
                .and_then(|list| list.downcast_ref::<Vec<T>>())
                .filter(|list| list.len() >= count);
            if let Some(list) = cached {
                return Ok(list[..count].to_vec());
            }
        }

        let list = self
            .load_custom_at(offset, |loader| {
                (0..count).map(|_| T::load(loader)).collect::<Result<Vec<_>>>()
            })?
            .unwrap_or_default();

        if self.options.cache_objects {
            self.objects.insert(key, Box::new(list.clone()));
        }
        Ok(list)
    }

    /// Read an offset and load `count` records at its target.
    pub fn load_list<T>(&mut self, count: usize) -> Result<Vec<T>>
    where
        T: ResData + Clone + 'static,
    {
        let offset = self.read_offset()?;
        self.load_list_at(offset, count)
    }

    /// Read a string pointer and resolve it.
    pub fn load_string(&mut self) -> Result<Option<String>> {
        let offset = self.read_offset()?;
        self.load_string_at(offset)
    }

    /// Resolve the string stored at `offset`.
    ///
    /// Offsets beyond the end of the stream are tolerated and produce an empty string, as some
    /// shipped files contain them.
    pub fn load_string_at(&mut self, offset: u64) -> Result<Option<String>> {
        if offset == 0 {
            return Ok(None);
        }
        if let Some(value) = self.strings.get(offset) {
            return Ok(Some(value.to_owned()));
        }
        if offset >= self.stream_len {
            warn!(offset, stream_len = self.stream_len, "string offset outside of stream");
            return Ok(Some(String::new()));
        }

        let value = {
            let mut seek = self.temporary_seek(offset)?;
            seek.read_string()?
        };
        if self.layout.cache_strings {
            self.strings.insert(offset, value.clone());
        }
        Ok(Some(value))
    }

    /// Read `count` string pointers, then resolve each of them.
    pub fn load_strings(&mut self, count: usize) -> Result<Vec<String>> {
        let offsets = (0..count)
            .map(|_| self.read_offset())
            .collect::<Result<Vec<_>>>()?;
        offsets
            .into_iter()
            .map(|offset| Ok(self.load_string_at(offset)?.unwrap_or_default()))
            .collect()
    }

    /// Read `count` pointers to zero terminated UTF-16 strings, then decode each of them.
    pub fn load_wide_strings(&mut self, count: usize) -> Result<Vec<String>> {
        let offsets = (0..count)
            .map(|_| self.read_offset())
            .collect::<Result<Vec<_>>>()?;
        offsets
            .into_iter()
            .map(|offset| {
                Ok(self
                    .load_custom_at(offset, Self::read_wide_string)?
                    .unwrap_or_default())
            })
            .collect()
    }

    fn read_string(&mut self) -> Result<String> {
        let bytes = match self.layout.platform {
            Platform::Switch => {
                let len: u16 = self.read()?;
                self.read_bytes(len as usize)?
            }
            Platform::WiiU => {
                let mut bytes = Vec::new();
                loop {
                    match self.reader.read_u8()? {
                        0 => break,
                        byte => bytes.push(byte),
                    }
                }
                bytes
            }
        };
        Ok(String::from_utf8(bytes)?)
    }

    fn read_wide_string(&mut self) -> Result<String> {
        let mut units = Vec::new();
        loop {
            match self.read::<u16>()? {
                0 => break,
                unit => units.push(unit),
            }
        }
        Ok(U16String::from_vec(units).to_string_lossy())
    }

    /// Read every string of a Switch `_STR` block at `offset` into the string cache.
    #[instrument(skip(self), err)]
    pub fn preload_string_table(&mut self, offset: u64) -> Result<()> {
        if offset == 0 {
            return Ok(());
        }

        let mut seek = self.temporary_seek(offset)?;
        seek.read_magic(STRING_TABLE_MAGIC)?;
        let _size: u32 = seek.read()?;
        let count: u64 = seek.read()?;

        // the leading empty string is not counted
        for _ in 0..=count {
            let position = seek.position()?;
            let value = seek.read_string()?;
            seek.reader.read_u8()?;
            let next = align_up(seek.position()?, 2);
            seek.set_position(next)?;
            seek.strings.insert(position, value);
        }
        debug!(count, "preloaded string table");
        Ok(())
    }

    fn read_dict(&mut self) -> Result<(Vec<DictNode>, Vec<String>, Vec<u64>)> {
        let count = match self.layout.platform {
            Platform::WiiU => {
                let _size: u32 = self.read()?;
                self.read::<i32>()?
            }
            Platform::Switch => {
                self.read_magic(DICT_MAGIC)?;
                self.read::<i32>()?
            }
        };
        let count = usize::try_from(count)
            .map_err(|_| Error::InvalidValue(format!("negative dictionary count {count}")))?;

        let mut nodes = Vec::with_capacity(count + 1);
        let mut keys = Vec::with_capacity(count);
        let mut values = Vec::new();
        for index in 0..=count {
            nodes.push(DictNode {
                reference: self.read()?,
                left: self.read()?,
                right: self.read()?,
            });
            let key = self.load_string()?;
            if self.layout.platform == Platform::WiiU {
                let value = self.read_offset()?;
                if index > 0 {
                    values.push(value);
                }
            }
            if index > 0 {
                keys.push(key.unwrap_or_default());
            }
        }

        if let Some(node) = nodes
            .iter()
            .find(|node| usize::from(node.left.max(node.right)) > count)
        {
            return Err(Error::InvalidValue(format!(
                "dictionary node {node:?} points past its {} nodes",
                count + 1
            )));
        }
        Ok((nodes, keys, values))
    }

    /// Load a named collection.
    ///
    /// WiiU stores one offset to a dictionary holding the values inline. Switch stores an offset to
    /// the value array followed by an offset to the `_DIC` key dictionary.
    pub fn load_dict_values<T>(&mut self) -> Result<ResDict<T>>
    where
        T: ResData + Clone + 'static,
    {
        let (nodes, keys, values) = match self.layout.platform {
            Platform::WiiU => {
                let loaded = self.load_custom(|loader| {
                    let (nodes, keys, offsets) = loader.read_dict()?;
                    let values = offsets
                        .into_iter()
                        .map(|offset| {
                            loader.load_custom_at(offset, T::load)?.ok_or_else(|| {
                                Error::InvalidValue("dictionary entry without data".to_owned())
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Ok((nodes, keys, values))
                })?;
                match loaded {
                    Some(loaded) => loaded,
                    None => return Ok(ResDict::new()),
                }
            }
            Platform::Switch => {
                let values_offset = self.read_offset()?;
                let Some((nodes, keys, _)) = self.load_custom(Self::read_dict)? else {
                    return Ok(ResDict::new());
                };
                let values = self.load_list_at(values_offset, keys.len())?;
                (nodes, keys, values)
            }
        };

        if values.len() != keys.len() {
            return Err(Error::InvalidValue(format!(
                "dictionary has {} keys but {} values",
                keys.len(),
                values.len()
            )));
        }

        let mut entries = IndexMap::with_capacity(keys.len());
        for (key, value) in keys.into_iter().zip(values) {
            if entries.contains_key(&key) {
                return Err(Error::DuplicateKey(key));
            }
            entries.insert(key, value);
        }
        Ok(ResDict::from_parts(nodes, entries))
    }
}

impl<R: Read + Seek> Positioned for ResFileLoader<R> {
    fn position(&mut self) -> Result<u64> {
        Ok(self.reader.stream_position()?)
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        self.reader.seek(SeekFrom::Start(position))?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::error::{Error, Result};
    use crate::platform::Layout;
    use crate::seek::Positioned;

    use super::{LoadOptions, ResFileLoader};

    fn loader(layout: Layout, data: Vec<u8>) -> Result<ResFileLoader<Cursor<Vec<u8>>>> {
        ResFileLoader::new(Cursor::new(data), layout, LoadOptions::default())
    }

    #[test]
    fn relative_offsets() -> Result<()> {
        #[rustfmt::skip]
        let data = vec![
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x08,
            0xFF, 0xFF, 0xFF, 0xFC,
        ];
        let mut loader = loader(Layout::WIIU, data)?;
        assert_eq!(loader.read_offset()?, 0);
        assert_eq!(loader.read_offset()?, 4 + 8);
        assert_eq!(loader.read_offset()?, 8 - 4);
        Ok(())
    }

    #[test]
    fn absolute_offsets() -> Result<()> {
        let data = 0x1234u64.to_le_bytes().to_vec();
        let mut loader = loader(Layout::SWITCH, data)?;
        assert_eq!(loader.read_offset()?, 0x1234);
        Ok(())
    }

    #[test]
    fn load_custom_restores_position() -> Result<()> {
        #[rustfmt::skip]
        let data = vec![
            0x00, 0x00, 0x00, 0x08,
            0xAA, 0xBB, 0xCC, 0xDD,
            0x00, 0x00, 0x00, 0x2A,
        ];
        let mut loader = loader(Layout::WIIU, data)?;
        let value = loader.load_custom(|loader| loader.read::<u32>())?;
        assert_eq!(value, Some(0x2A));
        assert_eq!(loader.position()?, 4);

        let failed = loader.load_custom_at(8, |loader| {
            loader.read::<u32>()?;
            loader.read::<u32>()
        });
        assert!(failed.is_err());
        assert_eq!(loader.position()?, 4);
        Ok(())
    }

    #[test]
    fn null_offset_yields_none() -> Result<()> {
        let mut loader = loader(Layout::SWITCH, vec![0; 8])?;
        let value = loader.load_custom(|loader| loader.read::<u32>())?;
        assert_eq!(value, None);
        assert_eq!(loader.position()?, 8);
        Ok(())
    }

    #[traced_test]
    #[test]
    fn out_of_bounds_string_is_empty() -> Result<()> {
        let data = 0x4000u64.to_le_bytes().to_vec();
        let mut loader = loader(Layout::SWITCH, data)?;
        assert_eq!(loader.load_string()?, Some(String::new()));
        assert!(logs_contain("string offset outside of stream"));
        Ok(())
    }

    #[test]
    fn strings_keep_pointer_order() -> Result<()> {
        #[rustfmt::skip]
        let data = vec![
            // pointers
            0x00, 0x00, 0x00, 0x10,
            0x00, 0x00, 0x00, 0x14,
            0x00, 0x00, 0x00, 0x00,
            // "b"
            0x00, 0x00, 0x00, 0x01, 0x62, 0x00, 0x00, 0x00,
            // "a"
            0x00, 0x00, 0x00, 0x01, 0x61, 0x00, 0x00, 0x00,
        ];
        let mut loader = loader(Layout::WIIU, data)?;
        assert_eq!(loader.load_strings(3)?, vec!["b", "a", ""]);
        Ok(())
    }

    #[test]
    fn switch_strings_are_length_prefixed_and_cached() -> Result<()> {
        #[rustfmt::skip]
        let data = vec![
            0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x04, 0x00, 0x46, 0x4D, 0x41, 0x54, 0x00, 0x00,
        ];
        let mut loader = loader(Layout::SWITCH, data)?;
        assert_eq!(loader.load_strings(2)?, vec!["FMAT", "FMAT"]);
        assert_eq!(loader.strings.len(), 1);
        Ok(())
    }

    #[test]
    fn signatures_are_checked() -> Result<()> {
        let mut loader = loader(Layout::SWITCH, b"FMATxxxxFSHP".to_vec())?;
        loader.read_signature(b"FMAT")?;
        assert_eq!(loader.position()?, 8);
        assert!(matches!(
            loader.read_signature(b"FMDL"),
            Err(Error::InvalidSignature { .. })
        ));
        Ok(())
    }
}
