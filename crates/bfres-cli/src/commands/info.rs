use std::io::BufReader;
use std::path::PathBuf;

use bfres::reloc::RelocationSection;
use bfres::{LoadOptions, ResFile};
use clap::Args;
use itertools::Itertools;
use miette::Result;
use owo_colors::OwoColorize;

use super::open;

#[derive(Args)]
pub struct InfoArgs {
    /// An input BFRES file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let mut reader = BufReader::new(open(&self.file)?);
        let file = ResFile::from_reader(&mut reader, LoadOptions::default())?;

        println!(
            "{} ({}, version {:#010x}, alignment {:#x})",
            file.name.bold(),
            file.platform.cyan(),
            file.version,
            file.alignment
        );

        for (name, model) in &file.models {
            println!("  model {}", name.green());
            for (index, buffer) in model.vertex_buffers.iter().enumerate() {
                println!(
                    "    vertex buffer {index}: {} vertices, attributes [{}]",
                    buffer.vertex_count,
                    buffer
                        .attributes
                        .iter()
                        .map(|(name, attrib)| format!("{name}: {:?}", attrib.format))
                        .join(", ")
                );
            }
            for (name, shape) in &model.shapes {
                println!(
                    "    shape {} -> material {}, {} indices",
                    name.yellow(),
                    shape.material_index,
                    shape.indices.len()
                );
            }
            for (name, material) in &model.materials {
                println!(
                    "    material {}: {} samplers, {} shader params, textures [{}]",
                    name.yellow(),
                    material.samplers.len(),
                    material.shader_params.len(),
                    material.textures.iter().join(", ")
                );
            }
        }

        for (name, anim) in &file.material_anims {
            println!(
                "  material anim {}: {} frames, {} curves",
                name.green(),
                anim.frame_count,
                anim.curves.len()
            );
        }

        for (name, external) in &file.external_files {
            println!("  external file {}: {} bytes", name.green(), external.data.len());
        }

        if let Some(table) = ResFile::read_relocation_table(&mut reader)? {
            println!("  relocation table at {:#x}", table.position);
            for section in RelocationSection::ALL {
                let info = table.sections.get(section as usize);
                println!(
                    "    {}: position {:#x}, size {:#x}, {} entries",
                    section.blue(),
                    info.map_or(0, |info| info.position),
                    info.map_or(0, |info| info.size),
                    table.section_entries(section).len()
                );
            }
        }

        Ok(())
    }
}
