use std::path::{Path, PathBuf};

use bfres::{LoadOptions, ResFile, SaveOptions};
use clap::Args;
use miette::{miette, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use tracing::{debug, error, instrument};
use walkdir::WalkDir;

#[derive(Args)]
pub struct VerifyArgs {
    /// A BFRES file or a directory searched for `.bfres` files
    #[arg(short, long, value_name = "PATH")]
    path: PathBuf,
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Identical,
    Changed { original: usize, saved: usize },
}

#[instrument(skip_all, fields(file = %path.display()))]
fn verify_file(path: &Path) -> Result<Outcome> {
    let original = std::fs::read(path).into_diagnostic()?;
    let file = ResFile::from_bytes(&original, LoadOptions::default())?;
    file.validate_dicts()?;

    let saved = file.to_bytes(SaveOptions::default())?;
    if saved == original {
        return Ok(Outcome::Identical);
    }

    // a second pass must reproduce the first one exactly
    let reloaded = ResFile::from_bytes(&saved, LoadOptions::default())?;
    if reloaded.to_bytes(SaveOptions::default())? != saved {
        return Err(miette!("re-saving a saved file changed its contents"));
    }
    debug!(original = original.len(), saved = saved.len(), "sizes");
    Ok(Outcome::Changed {
        original: original.len(),
        saved: saved.len(),
    })
}

impl VerifyArgs {
    pub fn handle(&self) -> Result<()> {
        let mut failures = 0;
        let mut total = 0;

        for entry in WalkDir::new(&self.path).sort_by_file_name() {
            let entry = entry.into_diagnostic()?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some("bfres")
            {
                continue;
            }

            total += 1;
            match verify_file(path) {
                Ok(Outcome::Identical) => println!("✅ {}", path.display().green()),
                Ok(Outcome::Changed { original, saved }) => println!(
                    "⚠️ {} re-saved with different bytes ({original} -> {saved})",
                    path.display().yellow()
                ),
                Err(err) => {
                    failures += 1;
                    error!("{err:?}");
                    println!("❌ {}", path.display().red());
                }
            }
        }

        if failures > 0 {
            return Err(miette!("{failures} of {total} files failed verification"));
        }
        println!("verified {total} files");
        Ok(())
    }
}
