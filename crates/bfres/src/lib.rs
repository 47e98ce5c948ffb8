//! This library handles reading from and creating **BFRES** files, the model and animation containers
//! used by games on the *WiiU* and *Nintendo Switch*.
//!
//! # BFRES Format Documentation
//!
//! A BFRES file is a graph of records linked by offsets. The same records exist in two layouts:
//!
//! | Layout | Byte order    | Offsets                        | Relocation table |
//! |--------|---------------|--------------------------------|------------------|
//! | WiiU   | Big-endian    | 4 bytes, relative to the field | No               |
//! | Switch | Little-endian | 8 bytes, absolute              | `_RLT`           |
//!
//! A null offset means the target is absent. [`ResFile::from_reader`] detects the layout from the file
//! signature and [`ResFile::to_bytes`] can write either layout, so loading a WiiU file and saving it as
//! Switch converts it.
//!
//! ## File Structure
//!
//! The file starts with the [`ResFile`] header, followed by the records in the order the saver reaches
//! them, the string pool, and the raw data regions.
//!
//! | Region              | Contents                                                        |
//! |---------------------|-----------------------------------------------------------------|
//! | Header              | `FRES` signature, version, byte order mark, root dictionaries   |
//! | Records             | Models, materials, animations and their arrays                  |
//! | String pool         | Every name, deduplicated and sorted ordinally                   |
//! | Index buffers       | Shape indices                                                   |
//! | Vertex buffers      | Raw vertex data                                                 |
//! | Memory pool         | Switch only: 0x120 zero bytes reserved for the runtime          |
//! | External files      | Embedded files                                                  |
//! | Relocation table    | Switch only: every pointer in the file, grouped by region       |
//!
//! ### Dictionaries
//!
//! Every named collection is stored as a binary Patricia trie, see [`dict`]. On WiiU the dictionary
//! nodes point at the values directly. On Switch a record stores an offset to the array of values
//! followed by an offset to a `_DIC` block holding only the keys.
//!
//! ### String Pool
//!
//! WiiU strings are stored as a 4 byte length followed by zero terminated characters, with offsets
//! pointing at the characters. Switch strings are collected in a `_STR` block and stored as a 2 byte
//! length followed by zero terminated characters, with offsets pointing at the length.
//!
//! ### Relocation Table
//!
//! A Switch file ends with an `_RLT` block listing the position of every offset so the runtime can
//! turn them into pointers in place, see [`reloc`].
//!
//! ## Additional Information
//!
//! - **File Extension**: `.bfres`
//! - **Alignment**: records are aligned to 4 bytes on WiiU and 8 bytes on Switch
//!

#[macro_use]
mod macros;

pub mod anim;
pub mod bits;
pub mod data;
pub mod decimal;
pub mod dict;
pub mod error;
pub mod external;
pub mod file;
pub mod model;
pub mod platform;
pub mod read;
pub mod reloc;
pub mod seek;
#[cfg(feature = "serde")]
mod serde;
pub mod strings;
pub mod write;

pub use data::ResData;
pub use dict::ResDict;
pub use file::ResFile;
pub use platform::Platform;
pub use read::{LoadOptions, ResFileLoader};
pub use write::{ResFileSaver, SaveOptions};
