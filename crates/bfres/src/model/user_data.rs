use std::borrow::Cow;
use std::io::{Read, Seek};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::data::ResData;
use crate::error::{Error, Result};
use crate::read::ResFileLoader;
use crate::seek::Positioned;
use crate::write::ResFileSaver;

/// Values of a [`UserData`] entry
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UserDataValue {
    Int32(Vec<i32>),
    Single(Vec<f32>),
    String(Vec<String>),
    /// Strings stored as zero terminated UTF-16
    WString(Vec<String>),
    Byte(Vec<u8>),
}

impl Default for UserDataValue {
    fn default() -> Self {
        UserDataValue::Int32(Vec::new())
    }
}

impl UserDataValue {
    fn type_tag(&self) -> u8 {
        match self {
            UserDataValue::Int32(_) => 0,
            UserDataValue::Single(_) => 1,
            UserDataValue::String(_) => 2,
            UserDataValue::WString(_) => 3,
            UserDataValue::Byte(_) => 4,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            UserDataValue::Int32(values) => values.len(),
            UserDataValue::Single(values) => values.len(),
            UserDataValue::String(values) | UserDataValue::WString(values) => values.len(),
            UserDataValue::Byte(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Custom values attached to a model or material
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UserData {
    pub name: String,
    pub value: UserDataValue,
}

impl ResData for UserData {
    fn load<R: Read + Seek>(loader: &mut ResFileLoader<R>) -> Result<Self> {
        let name = loader.load_string()?.unwrap_or_default();
        let offset = loader.read_offset()?;
        let count = loader.read::<u32>()? as usize;
        let tag: u8 = loader.read()?;
        loader.skip(3)?;

        let value = match tag {
            0 => UserDataValue::Int32(
                loader
                    .load_custom_at(offset, |loader| loader.read_vec(count))?
                    .unwrap_or_default(),
            ),
            1 => UserDataValue::Single(
                loader
                    .load_custom_at(offset, |loader| loader.read_vec(count))?
                    .unwrap_or_default(),
            ),
            2 => UserDataValue::String(
                loader
                    .load_custom_at(offset, |loader| loader.load_strings(count))?
                    .unwrap_or_default(),
            ),
            3 => UserDataValue::WString(
                loader
                    .load_custom_at(offset, |loader| loader.load_wide_strings(count))?
                    .unwrap_or_default(),
            ),
            4 => UserDataValue::Byte(
                loader
                    .load_custom_at(offset, |loader| loader.read_bytes(count))?
                    .unwrap_or_default(),
            ),
            tag => {
                return Err(Error::InvalidEnumValue {
                    name: "UserDataType",
                    value: tag as u32,
                })
            }
        };
        Ok(UserData { name, value })
    }

    fn save<'a>(&'a self, saver: &mut ResFileSaver<'a>) -> Result<()> {
        let start = saver.position()?;
        saver.save_string(&self.name)?;
        match &self.value {
            UserDataValue::Int32(values) => saver.save_encoded(values)?,
            UserDataValue::Single(values) => saver.save_encoded(values)?,
            UserDataValue::String(values) => saver.save_strings(values)?,
            UserDataValue::WString(values) => saver.save_wide_strings(values)?,
            UserDataValue::Byte(values) => saver.save_bytes(Cow::Borrowed(values))?,
        }
        saver.relocate_run(start)?;
        saver.write_count::<u32>(self.value.len(), "user data values")?;
        saver.write(&self.value.type_tag())?;
        saver.write_zeros(3)
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use crate::data::ResData;
    use crate::error::Result;
    use crate::platform::Layout;
    use crate::read::{LoadOptions, ResFileLoader};
    use crate::seek::Positioned;
    use crate::write::ResFileSaver;

    use super::{UserData, UserDataValue};

    fn reload(layout: Layout, value: &UserData) -> Result<UserData> {
        let mut saver = ResFileSaver::new(layout);
        value.save(&mut saver)?;
        saver.save_entries()?;
        let data = saver.finish()?;

        let mut loader = ResFileLoader::new(Cursor::new(data), layout, LoadOptions::default())?;
        loader.set_position(0)?;
        UserData::load(&mut loader)
    }

    #[test]
    fn every_value_type_reloads() -> Result<()> {
        let values = [
            UserDataValue::Int32(vec![1, -2, 3]),
            UserDataValue::Single(vec![0.5]),
            UserDataValue::String(vec!["left".to_owned(), "right".to_owned()]),
            UserDataValue::WString(vec!["ノード".to_owned()]),
            UserDataValue::Byte(vec![0xFF, 0x00, 0x7F]),
        ];
        for layout in [Layout::WIIU, Layout::SWITCH] {
            for value in &values {
                let data = UserData {
                    name: "setting".to_owned(),
                    value: value.clone(),
                };
                assert_eq!(reload(layout, &data)?, data);
            }
        }
        Ok(())
    }
}
