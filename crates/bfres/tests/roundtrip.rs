use std::io::Cursor;

use bfres::anim::{AnimCurve, CurveType, FrameData, KeyData, MaterialAnim, WrapMode};
use bfres::decimal::Decimal10x5;
use bfres::external::ExternalFile;
use bfres::model::material::{Srt2D, TexClamp};
use bfres::model::{
    AttribFormat, Buffer, IndexFormat, Material, Model, RenderInfo, RenderInfoValue, Sampler,
    Shape, ShaderParam, ShaderParamValue, UserData, UserDataValue, VertexAttrib, VertexBuffer,
};
use bfres::platform::Platform;
use bfres::reloc::RelocationSection;
use bfres::{LoadOptions, ResDict, ResFile, SaveOptions};
use miette::{IntoDiagnostic, Result};
use pretty_assertions::{assert_eq, assert_str_eq};
use tracing::{info, instrument};
use tracing_test::traced_test;

fn dict<T>(entries: impl IntoIterator<Item = (&'static str, T)>) -> Result<ResDict<T>> {
    let mut dict = ResDict::new();
    for (key, value) in entries {
        dict.add(key, value)?;
    }
    Ok(dict)
}

fn sample_material(with_samplers: bool) -> Result<Material> {
    let mut sampler = Sampler {
        name: "_a0".to_owned(),
        ..Default::default()
    };
    sampler.set_clamp_x(TexClamp::Mirror);

    Ok(Material {
        name: "Mt_Body".to_owned(),
        flags: 1,
        render_infos: dict([
            (
                "gsys_render_state_mode",
                RenderInfo {
                    name: "gsys_render_state_mode".to_owned(),
                    value: RenderInfoValue::String(vec!["opaque".to_owned()]),
                },
            ),
            (
                "gsys_alpha_test_value",
                RenderInfo {
                    name: "gsys_alpha_test_value".to_owned(),
                    value: RenderInfoValue::Single(vec![0.5]),
                },
            ),
        ])?,
        samplers: if with_samplers {
            dict([("_a0", sampler)])?
        } else {
            ResDict::new()
        },
        shader_params: dict([
            (
                "tex_mtx0",
                ShaderParam {
                    name: "tex_mtx0".to_owned(),
                    value: ShaderParamValue::Srt2D(Srt2D {
                        scaling: [1.0, 1.0],
                        rotation: 0.0,
                        translation: [0.25, 0.0],
                    }),
                },
            ),
            (
                "albedo_tex_color",
                ShaderParam {
                    name: "albedo_tex_color".to_owned(),
                    value: ShaderParamValue::Float(vec![1.0, 0.5, 0.25]),
                },
            ),
        ])?,
        textures: if with_samplers {
            vec!["Body_Alb".to_owned()]
        } else {
            Vec::new()
        },
        user_data: dict([(
            "author",
            UserData {
                name: "author".to_owned(),
                value: UserDataValue::WString(vec!["tester".to_owned()]),
            },
        )])?,
    })
}

fn sample_file(platform: Platform) -> Result<ResFile> {
    let vertex_buffer = VertexBuffer {
        attributes: dict([(
            "_p0",
            VertexAttrib {
                name: "_p0".to_owned(),
                format: AttribFormat::Float32x3,
                offset: 0,
                buffer_index: 0,
            },
        )])?,
        buffers: vec![Buffer {
            data: (0..36).collect(),
            stride: 12,
        }],
        vertex_count: 3,
        skin_count: 0,
    };

    let model = Model {
        name: "Body".to_owned(),
        path: String::new(),
        vertex_buffers: vec![vertex_buffer],
        shapes: dict([(
            "Body__Mt_Body",
            Shape {
                name: "Body__Mt_Body".to_owned(),
                indices: vec![0, 1, 2],
                index_format: IndexFormat::UInt16,
                ..Default::default()
            },
        )])?,
        materials: dict([
            ("Mt_Body", sample_material(true)?),
            ("Mt_Eye", sample_material(false)?),
        ])?,
        user_data: ResDict::new(),
    };

    let anim = MaterialAnim {
        name: "Blink".to_owned(),
        path: String::new(),
        flags: 0,
        frame_count: 30,
        baked_size: 0,
        curves: vec![AnimCurve {
            curve_type: CurveType::Cubic,
            pre_wrap: WrapMode::Clamp,
            post_wrap: WrapMode::Repeat,
            target_offset: 4,
            end_frame: 30.0,
            scale: 1.0,
            frames: FrameData::Decimal10x5(vec![Decimal10x5::from(0.0), Decimal10x5::from(30.0)]),
            keys: KeyData::Single(vec![0.0; 8]),
            ..Default::default()
        }],
    };

    Ok(ResFile {
        name: "Sample".to_owned(),
        version: 0x0005_0003,
        alignment: 0x1000,
        platform,
        models: dict([("Body", model)])?,
        material_anims: dict([("Blink", anim)])?,
        external_files: dict([(
            "shader.bfsha",
            ExternalFile {
                data: b"BFSHA\0\0\0".to_vec(),
            },
        )])?,
    })
}

#[instrument(skip(file))]
fn resave(file: &ResFile, platform: Platform) -> Result<(Vec<u8>, ResFile, Vec<u8>)> {
    let options = SaveOptions::builder().platform(platform).build();
    let first = file.to_bytes(options)?;
    let loaded = ResFile::from_reader(Cursor::new(&first), LoadOptions::default())?;
    let second = loaded.to_bytes(options)?;
    info!(size = first.len(), "saved twice");
    Ok((first, loaded, second))
}

#[test]
#[traced_test]
fn wiiu_round_trip_is_stable() -> Result<()> {
    let file = sample_file(Platform::WiiU)?;
    let (first, loaded, second) = resave(&file, Platform::WiiU)?;

    assert_eq!(loaded, file);
    assert_str_eq!(format!("{:02X?}", first), format!("{:02X?}", second));
    loaded.validate_dicts()?;
    Ok(())
}

#[test]
#[traced_test]
fn switch_round_trip_is_stable() -> Result<()> {
    let file = sample_file(Platform::Switch)?;
    let (first, loaded, second) = resave(&file, Platform::Switch)?;

    assert_eq!(loaded, file);
    assert_str_eq!(format!("{:02X?}", first), format!("{:02X?}", second));
    loaded.validate_dicts()?;
    Ok(())
}

#[test]
fn loading_without_caches_gives_the_same_file() -> Result<()> {
    let data = sample_file(Platform::Switch)?.to_bytes(SaveOptions::default())?;
    let options = LoadOptions::builder()
        .preload_strings(false)
        .cache_objects(false)
        .build();

    assert_eq!(
        ResFile::from_bytes(&data, options)?,
        ResFile::from_bytes(&data, LoadOptions::default())?
    );
    Ok(())
}

#[test]
fn converting_between_platforms_keeps_the_graph() -> Result<()> {
    let file = sample_file(Platform::WiiU)?;
    let wiiu = file.to_bytes(SaveOptions::default())?;
    assert_eq!(&wiiu[..4], b"FRES");
    assert_eq!(&wiiu[4..8], &[0x00, 0x05, 0x00, 0x03]);

    let loaded = ResFile::from_bytes(&wiiu, LoadOptions::default())?;
    let switch = loaded.to_bytes(SaveOptions::builder().platform(Platform::Switch).build())?;
    assert_eq!(&switch[..8], b"FRES    ");

    let converted = ResFile::from_bytes(&switch, LoadOptions::default())?;
    assert_eq!(converted.platform, Platform::Switch);
    assert_eq!(
        ResFile {
            platform: Platform::WiiU,
            ..converted.clone()
        },
        file
    );

    let back = converted.to_bytes(SaveOptions::builder().platform(Platform::WiiU).build())?;
    assert_str_eq!(format!("{:02X?}", back), format!("{:02X?}", wiiu));
    Ok(())
}

#[test]
fn relocation_table_covers_every_region() -> Result<()> {
    let data = sample_file(Platform::Switch)?.to_bytes(SaveOptions::default())?;
    let table = ResFile::read_relocation_table(Cursor::new(&data))?
        .ok_or_else(|| miette::miette!("switch file without relocation table"))?;

    let position = u32::from_le_bytes(data[0x14..0x18].try_into().into_diagnostic()?);
    assert_eq!(table.position, position);
    assert_eq!(table.sections.len(), RelocationSection::ALL.len());
    assert_eq!(&data[position as usize..position as usize + 4], b"_RLT");

    for section in RelocationSection::ALL {
        let entries = table.section_entries(section);
        assert!(!entries.is_empty(), "no entries for {section}");
        assert!(entries
            .windows(2)
            .all(|pair| pair[0].position < pair[1].position));
    }

    // every registered pointer holds an address inside the file
    for entry in &table.entries {
        for index in 0..entry.offset_count as usize {
            let at = entry.position as usize + index * 8;
            let pointer = u64::from_le_bytes(data[at..at + 8].try_into().into_diagnostic()?);
            assert!(pointer < data.len() as u64, "pointer at {at:#x} out of range");
        }
    }
    Ok(())
}

#[test]
fn empty_switch_dictionaries_keep_their_root() -> Result<()> {
    let file = sample_file(Platform::Switch)?;
    let data = file.to_bytes(SaveOptions::default())?;
    let loaded = ResFile::from_bytes(&data, LoadOptions::default())?;

    let eye = loaded.models.by_key("Body")?.materials.by_key("Mt_Eye")?;
    assert!(eye.samplers.is_empty());
    assert_eq!(eye.samplers.nodes().len(), 1);
    assert!(eye.textures.is_empty());

    let empty_dict = b"_DIC\0\0\0\0";
    assert!(data.windows(empty_dict.len()).any(|window| window == empty_dict));
    Ok(())
}

#[test]
fn switch_strings_are_sorted_and_unique() -> Result<()> {
    let data = sample_file(Platform::Switch)?.to_bytes(SaveOptions::default())?;
    let start = u32::from_le_bytes(data[0x10..0x14].try_into().into_diagnostic()?) as usize;
    assert_eq!(&data[start..start + 4], b"_STR");

    let count = u64::from_le_bytes(data[start + 8..start + 16].try_into().into_diagnostic()?);
    let mut position = start + 16;
    let mut strings = Vec::new();
    for _ in 0..=count {
        let len = u16::from_le_bytes([data[position], data[position + 1]]) as usize;
        strings.push(String::from_utf8(data[position + 2..position + 2 + len].to_vec()).into_diagnostic()?);
        position += 2 + len + 1;
        position += position % 2;
    }

    assert_eq!(strings[0], "");
    let mut sorted = strings.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(strings, sorted);
    assert!(strings.iter().any(|value| value == "Mt_Body"));
    Ok(())
}

#[test]
fn files_survive_json() -> Result<()> {
    let file = sample_file(Platform::Switch)?;
    let json = serde_json::to_string_pretty(&file).into_diagnostic()?;
    let parsed: ResFile = serde_json::from_str(&json).into_diagnostic()?;
    assert_eq!(parsed, file);

    parsed.validate_dicts()?;
    assert_eq!(
        parsed.to_bytes(SaveOptions::default())?,
        file.to_bytes(SaveOptions::default())?
    );
    Ok(())
}
