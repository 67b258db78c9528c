//! Common utilities for virtfile-cmd

use anyhow::{Result, bail};
use std::fmt::Write;
use std::path::Path;

/// Fails unless `path` names an existing regular file.
pub fn validate_file_exists(path: &str) -> Result<()> {
    let path_ref = Path::new(path);
    if !path_ref.exists() {
        bail!("No such file: {path}");
    }
    if !path_ref.is_file() {
        bail!("Not a regular file: {path}");
    }
    Ok(())
}

/// Human-readable byte count, in binary units above 1 KB.
pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if size < 1024 {
        return format!("{size} B");
    }
    let mut value = size as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Renders `bytes` as 16-byte hex rows labeled with their file offsets, starting
/// at `base_offset`.
pub fn hex_dump(bytes: &[u8], base_offset: u64) -> String {
    let mut out = String::new();
    for (row, line) in bytes.chunks(16).enumerate() {
        let _ = write!(out, "{:08x} ", base_offset + row as u64 * 16);
        for i in 0..16 {
            match line.get(i) {
                Some(byte) => {
                    let _ = write!(out, " {byte:02x}");
                }
                None => out.push_str("   "),
            }
        }
        out.push_str("  |");
        out.extend(line.iter().map(|&byte| {
            if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '.'
            }
        }));
        out.push_str("|\n");
    }
    out
}
