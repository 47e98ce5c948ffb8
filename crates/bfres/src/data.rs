//! The contract every record of a BFRES file implements.

use std::io::{Read, Seek};

use crate::error::Result;
use crate::read::ResFileLoader;
use crate::write::ResFileSaver;

/// A record that can be read from and written to either layout.
///
/// `load` is called with the loader positioned at the start of the record and must leave it
/// directly after the record. `save` writes the record at the saver's current position; anything the
/// record points to is queued on the saver and emitted later, so only fixed-size data is written in
/// place.
pub trait ResData {
    /// Read the record at the loader's position.
    fn load<R: Read + Seek>(loader: &mut ResFileLoader<R>) -> Result<Self>
    where
        Self: Sized;

    /// Write the record at the saver's position.
    fn save<'a>(&'a self, saver: &mut ResFileSaver<'a>) -> Result<()>;
}
