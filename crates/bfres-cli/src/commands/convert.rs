use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use bfres::platform::Platform;
use bfres::{LoadOptions, ResFile, SaveOptions};
use clap::Args;
use miette::{IntoDiagnostic, Result};
use tracing::info;

use super::{create, open, PlatformArg};

#[derive(Args)]
pub struct ConvertArgs {
    /// An input BFRES file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The converted file
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Layout to write
    #[arg(short, long, value_enum)]
    platform: PlatformArg,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ConvertArgs {
    pub fn handle(&self) -> Result<()> {
        let file = ResFile::from_reader(BufReader::new(open(&self.file)?), LoadOptions::default())?;

        let platform: Platform = self.platform.into();
        info!(from = %file.platform, to = %platform, "converting {}", self.file.display());
        let mut out = BufWriter::new(create(&self.output, self.overwrite)?);
        file.to_writer(&mut out, SaveOptions::builder().platform(platform).build())?;
        out.flush().into_diagnostic()?;

        info!("wrote {}", self.output.display());
        Ok(())
    }
}
