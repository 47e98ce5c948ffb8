use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use bfres::platform::Platform;
use bfres::{LoadOptions, ResFile, SaveOptions};
use clap::{Args, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing::info;

use super::{create, open, PlatformArg};

#[derive(Subcommand)]
pub enum JsonCommands {
    /// Write a BFRES file as JSON
    Export(ExportArgs),
    /// Build a BFRES file from JSON
    Import(ImportArgs),
}

impl JsonCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            JsonCommands::Export(export) => export.handle(),
            JsonCommands::Import(import) => import.handle(),
        }
    }
}

#[derive(Args)]
pub struct ExportArgs {
    /// An input BFRES file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The JSON file to write
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExportArgs {
    pub fn handle(&self) -> Result<()> {
        let file = ResFile::from_reader(BufReader::new(open(&self.file)?), LoadOptions::default())?;

        let mut out = BufWriter::new(create(&self.output, self.overwrite)?);
        serde_json::to_writer_pretty(&mut out, &file).into_diagnostic()?;
        out.flush().into_diagnostic()?;

        info!("wrote {}", self.output.display());
        Ok(())
    }
}

#[derive(Args)]
pub struct ImportArgs {
    /// An input JSON file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The BFRES file to write
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Layout to write instead of the one recorded in the JSON
    #[arg(short, long, value_enum)]
    platform: Option<PlatformArg>,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ImportArgs {
    pub fn handle(&self) -> Result<()> {
        let file: ResFile =
            serde_json::from_reader(BufReader::new(open(&self.file)?)).into_diagnostic()?;

        let options = SaveOptions::builder()
            .maybe_platform(self.platform.map(Platform::from))
            .build();
        let mut out = BufWriter::new(create(&self.output, self.overwrite)?);
        file.to_writer(&mut out, options)?;
        out.flush().into_diagnostic()?;

        info!("wrote {}", self.output.display());
        Ok(())
    }
}
