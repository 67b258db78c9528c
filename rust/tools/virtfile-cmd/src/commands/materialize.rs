//! Materialize command implementation

use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufWriter, Write},
};
use virtfile_io::ReadAdapter;

use super::{SourceArgs, open_virtual_file};
use crate::utils::format_size;

pub fn run(source: SourceArgs, output: String) -> Result<()> {
    let file = open_virtual_file(&source)?;
    let expected = file.predicted_size();

    let mut writer = BufWriter::new(
        File::create(&output).with_context(|| format!("Failed to create output file: {output}"))?,
    );
    // Reads are capped at the file's max_io_size.
    let mut reader = ReadAdapter::new(file).context("Failed to open virtual file")?;
    let written = std::io::copy(&mut reader, &mut writer)
        .with_context(|| format!("Failed to write virtual file to {output}"))?;
    writer.flush()?;

    if written != expected {
        anyhow::bail!("Wrote {written} bytes, expected {expected}");
    }
    println!("Wrote {} ({}) to {}", written, format_size(written), output);
    Ok(())
}
