//! Decode command - inspect an extracted manifest.

use std::path::PathBuf;

use clap::Args;
use nxfw::manifest::{self, Manifest, ManifestEntries};

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Path to a .cnmt file
    pub path: PathBuf,
}

/// Run the decode command.
pub fn run(args: DecodeArgs) -> Result<(), CliError> {
    let manifest = manifest::decode_file(&args.path).map_err(nxfw::FirmwareError::from)?;
    print!("{}", render(&manifest));
    Ok(())
}

fn render(manifest: &Manifest) -> String {
    let header = &manifest.header;
    let mut out = format!(
        "Title:   {}\nVersion: {} ({})\nType:    0x{:02X}{}\n",
        header.title_id,
        header.version.full(),
        header.version.raw(),
        header.meta_type,
        if header.is_system_update() {
            " (system update)"
        } else {
            ""
        },
    );

    match &manifest.entries {
        ManifestEntries::Titles(titles) => {
            out.push_str(&format!("\n{} title(s):\n", titles.len()));
            for title in titles {
                out.push_str(&format!(
                    "  {}  v{} ({})\n",
                    title.title_id,
                    title.version.raw(),
                    title.version.simple()
                ));
            }
        }
        ManifestEntries::Contents(contents) => {
            out.push_str(&format!("\n{} content(s):\n", contents.len()));
            for content in contents {
                out.push_str(&format!("  {}  sha256:{}\n", content.content_id, content.hash));
            }
        }
    }
    out
}
