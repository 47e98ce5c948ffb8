use bfres::error::Error;
use bfres::external::ExternalFile;
use bfres::platform::Platform;
use bfres::{LoadOptions, ResDict, ResFile, SaveOptions};
use miette::{miette, Result};
use pretty_assertions::assert_eq;
use tracing_test::traced_test;

fn external_files(platform: Platform, count: usize) -> Result<ResFile> {
    let mut external_files = ResDict::new();
    for index in 0..count {
        external_files.add(
            format!("file{index:05}.bin"),
            ExternalFile {
                data: vec![index as u8; 4],
            },
        )?;
    }
    Ok(ResFile {
        name: "Dicts".to_owned(),
        platform,
        external_files,
        ..Default::default()
    })
}

/// Save two external files on Switch and return the data with the position of their `_DIC`.
fn switch_dict() -> Result<(Vec<u8>, usize)> {
    let data = external_files(Platform::Switch, 2)?.to_bytes(SaveOptions::default())?;
    let position = data
        .windows(8)
        .position(|window| window == b"_DIC\x02\0\0\0")
        .ok_or_else(|| miette!("no dictionary with two entries"))?;
    Ok((data, position))
}

#[test]
fn untouched_dictionary_loads() -> Result<()> {
    let (data, _) = switch_dict()?;
    let file = ResFile::from_bytes(&data, LoadOptions::default())?;
    assert_eq!(file, external_files(Platform::Switch, 2)?);
    file.validate_dicts()?;
    Ok(())
}

#[test]
#[traced_test]
fn node_pointing_past_the_dictionary_fails_the_load() -> Result<()> {
    let (mut data, position) = switch_dict()?;
    // left child of the root node
    data[position + 12..position + 14].copy_from_slice(&0x40u16.to_le_bytes());

    let loaded = ResFile::from_bytes(&data, LoadOptions::default());
    assert!(matches!(loaded, Err(Error::InvalidValue(_))), "{loaded:?}");
    Ok(())
}

#[test]
fn negative_dictionary_count_fails_the_load() -> Result<()> {
    let (mut data, position) = switch_dict()?;
    data[position + 4..position + 8].copy_from_slice(&(-1i32).to_le_bytes());

    let loaded = ResFile::from_bytes(&data, LoadOptions::default());
    assert!(matches!(loaded, Err(Error::InvalidValue(_))), "{loaded:?}");
    Ok(())
}

#[test]
fn repeated_key_fails_the_load() -> Result<()> {
    let (mut data, position) = switch_dict()?;
    // nodes are 16 bytes after the 8 byte block header, with the key offset in their second half
    let first_key = position + 8 + 16 + 8;
    let second_key = first_key + 16;
    let offset: [u8; 8] = data[first_key..first_key + 8]
        .try_into()
        .map_err(|_| miette!("short key offset"))?;
    data[second_key..second_key + 8].copy_from_slice(&offset);

    for options in [
        LoadOptions::default(),
        LoadOptions::builder().preload_strings(false).build(),
    ] {
        let loaded = ResFile::from_bytes(&data, options);
        assert!(matches!(loaded, Err(Error::DuplicateKey(_))), "{loaded:?}");
    }
    Ok(())
}

#[test]
fn collections_over_the_node_limit_fail_to_save() -> Result<()> {
    for platform in [Platform::WiiU, Platform::Switch] {
        for count in [0xFFFF, 0x10000] {
            let saved = external_files(platform, count)?.to_bytes(SaveOptions::default());
            assert!(
                matches!(saved, Err(Error::InvalidValue(_))),
                "{count} entries on {platform}"
            );
        }
    }
    Ok(())
}
