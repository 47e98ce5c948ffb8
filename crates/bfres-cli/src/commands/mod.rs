use std::fs::File;
use std::path::Path;

use bfres::platform::Platform;
use clap::ValueEnum;
use miette::{Context, IntoDiagnostic, Result};

pub mod convert;
pub mod info;
pub mod json;
pub mod verify;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Print the contents of a BFRES file
    Info(info::InfoArgs),
    /// Check that files load, re-save identically and have consistent dictionaries
    Verify(verify::VerifyArgs),
    /// Rewrite a BFRES file for another platform
    Convert(convert::ConvertArgs),
    /// Move BFRES files to and from JSON
    Json {
        #[command(subcommand)]
        command: json::JsonCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> Result<()> {
        match self {
            Commands::Info(info) => info.handle(),
            Commands::Verify(verify) => verify.handle(),
            Commands::Convert(convert) => convert.handle(),
            Commands::Json { command } => command.handle(),
        }
    }
}

/// Target layout selectable on the command line
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    WiiU,
    Switch,
}

impl From<PlatformArg> for Platform {
    fn from(value: PlatformArg) -> Self {
        match value {
            PlatformArg::WiiU => Platform::WiiU,
            PlatformArg::Switch => Platform::Switch,
        }
    }
}

pub(crate) fn open(path: &Path) -> Result<File> {
    File::open(path)
        .into_diagnostic()
        .context(format!("path: {}", path.display()))
}

pub(crate) fn create(path: &Path, overwrite: bool) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .into_diagnostic()
            .context(format!("creating {}", parent.display()))?;
    }
    let file = if overwrite {
        File::create(path)
    } else {
        File::create_new(path)
    };
    file.into_diagnostic()
        .context(format!("creating {}", path.display()))
}
