//! Range command implementation

use anyhow::{Context, Result};
use std::fs;

use super::{SourceArgs, open_virtual_file};
use crate::utils::hex_dump;

pub fn run(source: SourceArgs, begin: u64, end: u64, output: Option<String>) -> Result<()> {
    let file = open_virtual_file(&source)?;
    let bytes = file
        .get_range(begin, end)
        .with_context(|| format!("Failed to produce range {begin}..={end}"))?;

    match output {
        Some(path) => {
            fs::write(&path, &bytes)
                .with_context(|| format!("Failed to write range to file: {path}"))?;
            println!("Wrote {} bytes to {}", bytes.len(), path);
        }
        None => print!("{}", hex_dump(&bytes, begin)),
    }
    Ok(())
}
